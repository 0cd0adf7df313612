use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::models::SourceFile;

/// Collect all indexable files under `root`. If `root` is a `.zip` archive it
/// is extracted to a scratch directory first; the scratch directory is removed
/// when collection finishes, whether or not it succeeded.
pub fn collect_source_files(root: &Path, max_file_size: u64) -> Result<Vec<SourceFile>> {
    if root.extension().is_some_and(|e| e.eq_ignore_ascii_case("zip")) {
        let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
        extract_zip(root, scratch.path())?;
        let effective_root = unwrap_single_dir(scratch.path());
        let files = walk_source_files(&effective_root, max_file_size);
        // scratch dropped here, removing the extracted tree
        return Ok(files);
    }

    if !root.is_dir() {
        anyhow::bail!("Not a directory or zip archive: {}", root.display());
    }

    Ok(walk_source_files(root, max_file_size))
}

/// Extract a zip archive into `dest`.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;
    archive
        .extract(dest)
        .with_context(|| format!("Failed to extract {}", archive_path.display()))?;
    tracing::info!(
        "Extracted {} entries from {}",
        archive.len(),
        archive_path.display()
    );
    Ok(())
}

/// If the extracted tree contains exactly one directory entry (the usual
/// repo-name wrapper folder), treat that directory as the root.
fn unwrap_single_dir(extracted: &Path) -> std::path::PathBuf {
    let entries: Vec<_> = match std::fs::read_dir(extracted) {
        Ok(iter) => iter.filter_map(|e| e.ok()).collect(),
        Err(_) => return extracted.to_path_buf(),
    };
    if entries.len() == 1 && entries[0].path().is_dir() {
        return entries[0].path();
    }
    extracted.to_path_buf()
}

/// Walk all indexable text files under a directory and read their contents.
pub fn walk_source_files(root: &Path, max_file_size: u64) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();

        if !is_indexable_file(path) {
            continue;
        }

        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > max_file_size {
                continue;
            }
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        // macOS zip artifacts survive extraction as a top-level folder
        if relative.contains("__MACOSX") {
            continue;
        }

        // Permissive read: invalid UTF-8 is replaced, not fatal
        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("Could not read {relative}: {e}");
                continue;
            }
        };

        if content.trim().is_empty() {
            continue;
        }

        let language = detect_language(path);
        let line_count = content.lines().count();
        files.push(SourceFile {
            relative_path: relative,
            content,
            language,
            line_count,
        });
    }

    files
}

fn is_ignored(entry: &walkdir::DirEntry) -> bool {
    // The walk root itself is never filtered, whatever its name
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') && name != "." && name != ".." {
        return true;
    }
    // VCS metadata, OS artifacts, dependency caches, editor directories
    matches!(
        name.as_ref(),
        "node_modules"
            | "target"
            | "dist"
            | "build"
            | "__pycache__"
            | "__MACOSX"
            | "vendor"
            | "venv"
            | "env"
            | "Thumbs.db"
            | "Desktop.ini"
    )
}

fn is_indexable_file(path: &Path) -> bool {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    // Well-known config files without a useful extension
    if matches!(filename.as_ref(), "dockerfile" | "makefile" | "cmakelists.txt") {
        return true;
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    matches!(
        ext.as_str(),
        "py" | "js"
            | "ts"
            | "jsx"
            | "tsx"
            | "java"
            | "cpp"
            | "c"
            | "h"
            | "hpp"
            | "cs"
            | "php"
            | "rb"
            | "go"
            | "rs"
            | "swift"
            | "kt"
            | "scala"
            | "sh"
            | "bash"
            | "zsh"
            | "ps1"
            | "sql"
            | "html"
            | "css"
            | "scss"
            | "less"
            | "xml"
            | "json"
            | "yaml"
            | "yml"
            | "toml"
            | "ini"
            | "cfg"
            | "md"
            | "rst"
            | "txt"
            | "dockerfile"
            | "makefile"
            | "cmake"
    )
}

/// Map a path to a language tag used for prompt selection and classification.
pub fn detect_language(path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if filename == "dockerfile" {
        return "docker".to_string();
    }
    if filename == "makefile" {
        return "make".to_string();
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" | "zsh" => "bash",
        "ps1" => "powershell",
        "html" => "html",
        "css" | "scss" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" => "ini",
        "cfg" => "config",
        "xml" => "xml",
        "md" | "rst" => "markdown",
        "txt" => "text",
        "sql" => "sql",
        "dockerfile" => "docker",
        "makefile" | "cmake" => "make",
        _ => "text",
    }
    .to_string()
}
