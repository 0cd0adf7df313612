//! Per-language analysis prompt templates.
//!
//! Template selection is an explicit match on the language tag; adding a
//! language means adding an arm. Each template names the fields the model
//! must report so the resulting summaries share a predictable structure
//! (Purpose / Methods / Dependencies / Use Case headers) that the query
//! router later recognizes.

/// Build the user prompt for a file, given its language tag, line count, and
/// (possibly truncated) content.
pub fn analysis_prompt(language: &str, line_count: usize, content: &str) -> String {
    let base = format!(
        "Analyze this {language} file ({line_count} lines) and provide a comprehensive, \
         detailed textual summary.\n\n{content}\n\n"
    );

    let instructions = match language {
        "python" | "ruby" => SOURCE_INSTRUCTIONS,
        "javascript" | "typescript" => FRONTEND_INSTRUCTIONS,
        "java" | "csharp" | "kotlin" | "scala" | "go" | "rust" | "c" | "cpp" | "swift"
        | "php" => SOURCE_INSTRUCTIONS,
        "json" | "yaml" | "toml" | "ini" | "config" | "xml" => CONFIG_INSTRUCTIONS,
        "markdown" => DOCUMENTATION_INSTRUCTIONS,
        "sql" => SQL_INSTRUCTIONS,
        _ => GENERIC_INSTRUCTIONS,
    };

    base + instructions
}

/// System message sent with every summarization request.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are an expert code analyst. Provide extremely \
    detailed, technical summaries of code files. Use structured formatting with clear \
    sections. Include all method signatures, class details, dependencies, and use cases. \
    Be comprehensive and thorough.";

const SOURCE_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

Summary of [FileName]

Purpose: [Detailed description of what this file does and its role in the system]

Classes:
[For EVERY class or type: name, base types, purpose, and ALL methods with
signatures and descriptions]

Functions:
[For EVERY standalone function: signature, parameters, return value, behavior]

Variables/Constants:
[ALL module-level variables and constants with descriptions]

Dependencies:
[ALL imports and what each is used for]

Use Case:
[How this file fits in the larger system]

Key Features:
[Design patterns, algorithms, notable logic]

Be EXTREMELY comprehensive. List every function, class, method, and import.";

const FRONTEND_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

Summary of [FileName]

Purpose: [What this file does and its role]

Exports:
[EVERYTHING this file exports with types and descriptions]

Functions:
[For EVERY function: signature, parameters, return value, behavior]

Classes/Components:
[For EVERY class or component: purpose, methods, props, state]

Variables/Constants:
[ALL module-level variables and constants]

Dependencies:
[ALL imports and what they are used for]

APIs/Endpoints:
[Any API calls, fetch requests, or endpoints defined]

Use Case:
[Role in the application]

Key Features:
[Patterns, algorithms, frameworks used]

List every function, class, variable, import, and export. Be extremely thorough.";

const CONFIG_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

Configuration File Summary

Purpose: [What system or application this configures and why]

Main Sections:
[For EVERY major section: its purpose and EVERY setting with value and effect]

Environment Variables:
[Any environment variables referenced]

Dependencies:
[External systems, services, or databases configured]

Use Case:
[When and how this configuration is used in deployment or at runtime]

Impact:
[How changing these settings affects the system]

Be extremely detailed. Explain every configuration option and its impact.";

const DOCUMENTATION_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

Documentation Summary

Purpose: [What this documentation covers and who it is for]

Sections:
[For EVERY section and subsection: what it covers and its key points]

Instructions/Tutorials:
[ALL step-by-step guides with steps, requirements, and outcome]

Code Examples:
[ALL code examples shown and what each demonstrates]

Links and References:
[ALL external links and what they point to]

Use Case:
[When to reference this documentation]

Be extremely thorough. Capture every section, example, link, and concept.";

const SQL_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

Database Script Summary

Purpose: [What this script accomplishes in the database]

Tables:
[For EVERY table: purpose, EVERY column with type and constraints, keys, indexes]

Views/Procedures/Functions/Triggers:
[EVERY one with parameters, returns, and logic]

Data Operations:
[ALL INSERT, UPDATE, DELETE operations and the data affected]

Dependencies:
[Other database objects referenced]

Use Case:
[When this script is executed and why]

Be extremely detailed about every table, column, procedure, and operation.";

const GENERIC_INSTRUCTIONS: &str = "\
Create a comprehensive textual summary following this EXACT format:

File Summary

Purpose: [Detailed description of what this file does]

Main Components:
[EVERY major component with its role]

Functions:
[For EVERY function: signature, parameters, returns, behavior]

Classes/Structures:
[For EVERY class or structure: purpose, methods, properties]

Dependencies:
[ALL external libraries, modules, or files used]

Input/Output:
[What this file reads from and writes to]

Use Case:
[Role in the larger application]

Be extremely comprehensive. List every function, class, variable, and dependency.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_language_and_content() {
        let prompt = analysis_prompt("python", 42, "def main(): pass");
        assert!(prompt.contains("python file (42 lines)"));
        assert!(prompt.contains("def main(): pass"));
    }

    #[test]
    fn test_config_languages_get_config_template() {
        for lang in ["json", "yaml", "toml", "ini", "config", "xml"] {
            let prompt = analysis_prompt(lang, 10, "key: value");
            assert!(
                prompt.contains("Configuration File Summary"),
                "{lang} should use the config template"
            );
        }
    }

    #[test]
    fn test_markdown_gets_documentation_template() {
        let prompt = analysis_prompt("markdown", 5, "# Title");
        assert!(prompt.contains("Documentation Summary"));
    }

    #[test]
    fn test_sql_gets_database_template() {
        let prompt = analysis_prompt("sql", 5, "CREATE TABLE t (id int);");
        assert!(prompt.contains("Database Script Summary"));
    }

    #[test]
    fn test_unknown_language_gets_generic_template() {
        let prompt = analysis_prompt("docker", 5, "FROM alpine");
        assert!(prompt.contains("File Summary"));
    }
}
