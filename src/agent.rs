//! Read-only tool surface over the indexed codebase, and the escalated
//! tool-augmented conversation that uses it.
//!
//! Every tool is a pure request/response operation: search over stored
//! summaries, file content lookup, project tree rendering, and best-effort
//! definition explanations located by line scanning.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use crate::llm::tool_chat::{self, ChatTurn, ToolDef};
use crate::models::SummaryHit;
use crate::state::{AppState, FileCatalog};

/// Upper bound on tool-call/tool-response rounds in one escalated query.
const MAX_TOOL_ROUNDS: usize = 8;

/// Timeout for each conversational turn.
const TOOL_CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Lines of context captured after a located definition.
const SNIPPET_LINES: usize = 30;

// ─── Tool surface ────────────────────────────────────────

/// Search stored summaries and format the hits for display or for the model.
pub async fn search_code(state: &AppState, query: &str, max_results: usize) -> String {
    if state.store.count() == 0 {
        return "No codebase has been indexed yet. Please ingest a repository first.".to_string();
    }
    let llm = state.llm_config.read().clone();
    let hits = state
        .store
        .search(&state.http_client, &llm, query, max_results)
        .await;
    format_search_results(&hits)
}

fn format_search_results(hits: &[SummaryHit]) -> String {
    if hits.is_empty() {
        return "No relevant files found for the query.".to_string();
    }

    let mut out = String::from("Found relevant files:\n\n");
    for hit in hits {
        let _ = write!(
            out,
            "--- File: {} ---\n\
             Language: {}, Type: {}\n\
             Lines: {}, Complexity: {}\n\
             Purpose: {}\n\
             Summary: {}\n\n",
            hit.file_path,
            hit.language,
            hit.file_type,
            hit.line_count,
            hit.complexity_score,
            hit.purpose,
            hit.summary
        );
    }
    out
}

/// Return the full content of a file, or close-match suggestions when the
/// exact path is unknown.
pub fn get_file_content(catalog: &FileCatalog, file_path: &str) -> String {
    if let Some(content) = catalog.get(file_path) {
        let ext = std::path::Path::new(file_path)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        return format!("Content of {file_path}:\n\n```{ext}\n{content}\n```");
    }

    let needle = file_path.to_lowercase();
    let matches: Vec<String> = catalog
        .paths()
        .into_iter()
        .filter(|p| p.to_lowercase().contains(&needle))
        .take(5)
        .collect();

    if matches.is_empty() {
        format!("File '{file_path}' not found in the codebase.")
    } else {
        let mut out = format!("File '{file_path}' not found exactly. Did you mean one of these?\n\n");
        for m in matches {
            let _ = writeln!(out, "- {m}");
        }
        out
    }
}

/// Render the indexed file paths as a directory tree.
pub fn list_project_structure(catalog: &FileCatalog) -> String {
    let paths = catalog.paths();
    if paths.is_empty() {
        return "No files found in the codebase.".to_string();
    }

    #[derive(Default)]
    struct Node {
        dirs: BTreeMap<String, Node>,
        files: Vec<String>,
    }

    let mut root = Node::default();
    for path in &paths {
        let mut node = &mut root;
        let parts: Vec<&str> = path.split('/').collect();
        for part in &parts[..parts.len() - 1] {
            node = node.dirs.entry(part.to_string()).or_default();
        }
        node.files.push(parts[parts.len() - 1].to_string());
    }

    fn render(node: &Node, prefix: &str, out: &mut String) {
        let dir_count = node.dirs.len();
        for (i, (name, child)) in node.dirs.iter().enumerate() {
            let last = i + 1 == dir_count && node.files.is_empty();
            let (branch, next_prefix) = if last {
                ("└── ", format!("{prefix}    "))
            } else {
                ("├── ", format!("{prefix}│   "))
            };
            let _ = writeln!(out, "{prefix}{branch}{name}/");
            render(child, &next_prefix, out);
        }
        let file_count = node.files.len();
        for (i, file) in node.files.iter().enumerate() {
            let branch = if i + 1 == file_count { "└── " } else { "├── " };
            let _ = writeln!(out, "{prefix}{branch}{file}");
        }
    }

    let mut out = String::from("Project Structure:\n\n");
    render(&root, "", &mut out);
    out
}

/// Explain a function: locate its definition by line scanning, fall back to
/// the closest summary matches.
pub async fn explain_function(state: &AppState, function_name: &str) -> String {
    explain_definition(
        state,
        function_name,
        "Function",
        &["fn ", "def ", "function ", "func "],
    )
    .await
}

/// Explain a class or type: same lookup over class-like definition keywords.
pub async fn explain_class(state: &AppState, class_name: &str) -> String {
    explain_definition(
        state,
        class_name,
        "Class",
        &["class ", "struct ", "trait ", "interface ", "enum "],
    )
    .await
}

async fn explain_definition(
    state: &AppState,
    name: &str,
    label: &str,
    keywords: &[&str],
) -> String {
    if state.store.count() == 0 {
        return "No codebase has been indexed yet. Please ingest a repository first.".to_string();
    }

    let located = {
        let catalog = state.catalog.read();
        find_definition(&catalog, keywords, name)
    };

    if let Some(found) = located {
        return format!(
            "## {label}: {name}\n\n\
             **File:** {} (line {})\n\n\
             **Code:**\n```\n{}\n```",
            found.file_path, found.start_line, found.snippet
        );
    }

    // No exact definition: return the closest summary matches instead
    let llm = state.llm_config.read().clone();
    let hits = state.store.search(&state.http_client, &llm, name, 3).await;
    if hits.is_empty() {
        return format!(
            "{label} '{name}' not found in the codebase.",
        );
    }

    let mut out = format!(
        "Couldn't find an exact match for {} '{name}', but here are some potential matches:\n\n",
        label.to_lowercase()
    );
    for hit in hits {
        let _ = write!(out, "File: {}\nPurpose: {}\n\n", hit.file_path, hit.purpose);
    }
    out
}

struct Definition {
    file_path: String,
    start_line: usize,
    snippet: String,
}

/// Scan the catalog for a line that introduces `name` after one of the
/// definition keywords, and capture a snippet from there.
fn find_definition(catalog: &FileCatalog, keywords: &[&str], name: &str) -> Option<Definition> {
    for path in catalog.paths() {
        let content = catalog.get(&path)?.clone();
        for (idx, line) in content.lines().enumerate() {
            let is_definition = keywords.iter().any(|kw| {
                line.find(kw).is_some_and(|pos| {
                    let after = &line[pos + kw.len()..];
                    after.starts_with(name)
                        && !after[name.len()..]
                            .chars()
                            .next()
                            .is_some_and(|c| c.is_alphanumeric() || c == '_')
                })
            });
            if is_definition {
                let snippet: Vec<&str> = content.lines().skip(idx).take(SNIPPET_LINES).collect();
                return Some(Definition {
                    file_path: path,
                    start_line: idx + 1,
                    snippet: snippet.join("\n"),
                });
            }
        }
    }
    None
}

// ─── Escalated conversation ──────────────────────────────

fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "search_code",
            description: "Search for relevant files in the codebase using file summaries. \
                          Returns file metadata, purpose, and summary.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query to find relevant files"},
                    "max_results": {"type": "integer", "description": "Maximum number of results to return"}
                },
                "required": ["query"]
            }),
        },
        ToolDef {
            name: "get_file_content",
            description: "Get the complete content of a specific file",
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to read"}
                },
                "required": ["file_path"]
            }),
        },
        ToolDef {
            name: "list_project_structure",
            description: "Show the directory structure of the indexed project",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolDef {
            name: "explain_function",
            description: "Explain a specific function, including its location and code",
            parameters: json!({
                "type": "object",
                "properties": {
                    "function_name": {"type": "string", "description": "The name of the function to explain"}
                },
                "required": ["function_name"]
            }),
        },
        ToolDef {
            name: "explain_class",
            description: "Explain a class or type, including its location and code",
            parameters: json!({
                "type": "object",
                "properties": {
                    "class_name": {"type": "string", "description": "The name of the class to explain"}
                },
                "required": ["class_name"]
            }),
        },
    ]
}

const ESCALATION_SYSTEM_PROMPT: &str = "\
You are an expert code assistant that helps users understand codebases.

You have access to a file-summary based index where each file has been analyzed \
and summarized with its purpose, key classes and functions, dependencies, file \
type classification, and complexity metrics.

Use the search_code tool to find relevant files based on queries (this returns \
file summaries, not code chunks). Use get_file_content when you need to examine \
a specific file in detail. Use list_project_structure to understand the \
codebase organization, and explain_function/explain_class for specific code \
elements.

Provide comprehensive explanations that highlight the purpose, architecture \
patterns, and how files work together.";

async fn execute_tool(state: &AppState, name: &str, arguments: &Value) -> String {
    match name {
        "search_code" => {
            let query = arguments
                .get("query")
                .and_then(|q| q.as_str())
                .unwrap_or_default();
            let max_results = arguments
                .get("max_results")
                .and_then(|m| m.as_u64())
                .unwrap_or(10) as usize;
            search_code(state, query, max_results).await
        }
        "get_file_content" => {
            let file_path = arguments
                .get("file_path")
                .and_then(|p| p.as_str())
                .unwrap_or_default();
            let catalog = state.catalog.read();
            get_file_content(&catalog, file_path)
        }
        "list_project_structure" => {
            let catalog = state.catalog.read();
            list_project_structure(&catalog)
        }
        "explain_function" => {
            let name = arguments
                .get("function_name")
                .and_then(|n| n.as_str())
                .unwrap_or_default();
            explain_function(state, name).await
        }
        "explain_class" => {
            let name = arguments
                .get("class_name")
                .and_then(|n| n.as_str())
                .unwrap_or_default();
            explain_class(state, name).await
        }
        other => format!("Unknown tool: {other}"),
    }
}

/// Run the escalated conversation: iterate tool-call/tool-response turns with
/// the model until it produces a final plain-text answer.
pub async fn escalate(state: &AppState, query: &str) -> Result<String> {
    let llm = state.llm_config.read().clone();
    let tools = tool_defs();

    let mut messages: Vec<Value> = vec![
        json!({"role": "system", "content": ESCALATION_SYSTEM_PROMPT}),
        json!({"role": "user", "content": query}),
    ];

    for round in 0..MAX_TOOL_ROUNDS {
        let turn = tool_chat::chat_with_tools(
            &state.http_client,
            &llm,
            &messages,
            &tools,
            TOOL_CHAT_TIMEOUT,
        )
        .await
        .context("Tool-augmented conversation failed")?;

        match turn {
            ChatTurn::Content(answer) => {
                if answer.trim().is_empty() {
                    anyhow::bail!("Model returned an empty answer");
                }
                return Ok(answer);
            }
            ChatTurn::ToolCalls {
                assistant_message,
                calls,
            } => {
                tracing::debug!(
                    "Escalation round {}: {} tool call(s)",
                    round + 1,
                    calls.len()
                );
                messages.push(assistant_message);
                for call in &calls {
                    tracing::info!("Assistant called {} ({})", call.name, call.arguments);
                    let result = execute_tool(state, &call.name, &call.arguments).await;
                    messages.push(tool_chat::tool_result_message(&llm, call, &result));
                }
            }
        }
    }

    anyhow::bail!("Conversation exceeded {MAX_TOOL_ROUNDS} tool rounds without a final answer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;

    fn catalog_with(files: &[(&str, &str)]) -> FileCatalog {
        let mut catalog = FileCatalog::default();
        catalog.replace(
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string())),
        );
        catalog
    }

    #[test]
    fn test_format_search_results_empty() {
        let out = format_search_results(&[]);
        assert!(out.contains("No relevant files found"));
    }

    #[test]
    fn test_format_search_results_fields() {
        let hits = vec![SummaryHit {
            file_path: "src/db.py".to_string(),
            summary: "Database layer.".to_string(),
            language: "python".to_string(),
            file_type: FileKind::ClassBased,
            line_count: 120,
            complexity_score: 9,
            purpose: "Database layer.".to_string(),
            score: 0.8,
        }];
        let out = format_search_results(&hits);
        assert!(out.contains("--- File: src/db.py ---"));
        assert!(out.contains("Language: python, Type: class_based"));
        assert!(out.contains("Lines: 120, Complexity: 9"));
    }

    #[test]
    fn test_get_file_content_exact_match() {
        let catalog = catalog_with(&[("src/main.rs", "fn main() {}")]);
        let out = get_file_content(&catalog, "src/main.rs");
        assert!(out.contains("Content of src/main.rs"));
        assert!(out.contains("fn main() {}"));
        assert!(out.contains("```rs"));
    }

    #[test]
    fn test_get_file_content_suggests_partial_matches() {
        let catalog = catalog_with(&[("src/handlers/auth.py", "pass"), ("docs/auth.md", "# auth")]);
        let out = get_file_content(&catalog, "auth");
        assert!(out.contains("Did you mean one of these?"));
        assert!(out.contains("src/handlers/auth.py"));
        assert!(out.contains("docs/auth.md"));
    }

    #[test]
    fn test_get_file_content_not_found() {
        let catalog = catalog_with(&[("a.py", "pass")]);
        let out = get_file_content(&catalog, "zzz.py");
        assert!(out.contains("not found in the codebase"));
    }

    #[test]
    fn test_project_structure_tree() {
        let catalog = catalog_with(&[
            ("src/main.rs", ""),
            ("src/lib.rs", ""),
            ("README.md", ""),
        ]);
        let out = list_project_structure(&catalog);
        assert!(out.contains("Project Structure:"));
        assert!(out.contains("src/"));
        assert!(out.contains("main.rs"));
        assert!(out.contains("README.md"));
    }

    #[test]
    fn test_project_structure_empty() {
        let catalog = FileCatalog::default();
        let out = list_project_structure(&catalog);
        assert!(out.contains("No files found"));
    }

    #[test]
    fn test_find_definition_rust_fn() {
        let catalog = catalog_with(&[(
            "src/auth.rs",
            "use anyhow::Result;\n\npub fn login(user: &str) -> Result<()> {\n    Ok(())\n}\n",
        )]);
        let found = find_definition(&catalog, &["fn "], "login").unwrap();
        assert_eq!(found.file_path, "src/auth.rs");
        assert_eq!(found.start_line, 3);
        assert!(found.snippet.contains("pub fn login"));
    }

    #[test]
    fn test_find_definition_rejects_prefix_collision() {
        let catalog = catalog_with(&[("a.py", "def login_helper():\n    pass\n")]);
        assert!(find_definition(&catalog, &["def "], "login").is_none());
    }

    #[test]
    fn test_find_definition_python_class() {
        let catalog = catalog_with(&[("models.py", "class User(Base):\n    name: str\n")]);
        let found = find_definition(&catalog, &["class "], "User").unwrap();
        assert_eq!(found.start_line, 1);
    }

    #[test]
    fn test_tool_defs_cover_the_surface() {
        let names: Vec<&str> = tool_defs().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "search_code",
                "get_file_content",
                "list_project_structure",
                "explain_function",
                "explain_class"
            ]
        );
    }
}
