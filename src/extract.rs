use serde::{Deserialize, Serialize};

/// A block of source code recovered from a completion reply, in order of
/// appearance. `language` is `"text"` when nothing could be inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub language: String,
    pub source: String,
    pub suggested_filename: String,
    pub index: usize,
}

/// Scans a reply for triple-backtick fenced spans. Pure function: no
/// artifacts found is a valid, silent outcome. A trailing fence with no
/// closing marker yields nothing.
pub fn extract(reply: &str) -> Vec<CodeArtifact> {
    let mut artifacts = Vec::new();
    let mut open_tag: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in reply.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            match open_tag.take() {
                None => {
                    // Opening fence; the remainder is an optional language tag.
                    // Tags like `c++`, `c#` and `objective-c` keep their
                    // punctuation.
                    let tag: String = rest
                        .trim()
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-'))
                        .collect();
                    open_tag = Some(tag.to_lowercase());
                    body.clear();
                }
                Some(tag) => {
                    let source = body.join("\n").trim().to_string();
                    let language = if tag.is_empty() {
                        detect_language(&source).to_string()
                    } else {
                        tag
                    };
                    let suggested_filename = suggest_filename(&source, &language);
                    artifacts.push(CodeArtifact {
                        language,
                        source,
                        suggested_filename,
                        index: artifacts.len(),
                    });
                }
            }
        } else if open_tag.is_some() {
            body.push(line);
        }
    }

    artifacts
}

/// Ordered content heuristics for untagged spans, checked in fixed
/// priority order.
pub fn detect_language(source: &str) -> &'static str {
    let lower = source.to_lowercase();

    if source.contains("def ") || source.contains("import ") || source.contains("print(") {
        "python"
    } else if source.contains("function ")
        || source.contains("const ")
        || source.contains("console.log")
    {
        "javascript"
    } else if source.contains("#include") || source.contains("std::") {
        "cpp"
    } else if source.contains("public class") || source.contains("System.out") {
        "java"
    } else if source.contains("<html>") || lower.contains("<!doctype") {
        "html"
    } else if source.contains("color:") || source.contains("background:") || source.contains("margin:")
    {
        "css"
    } else {
        "text"
    }
}

/// Best-effort name from the first declared type or routine, lower-cased,
/// with the conventional extension. Collisions across artifacts are the
/// resolver's problem, not ours.
pub fn suggest_filename(source: &str, language: &str) -> String {
    match language {
        "python" => identifier_after(source, "class ")
            .or_else(|| identifier_after(source, "def "))
            .map(|name| format!("{}.py", name.to_lowercase()))
            .unwrap_or_else(|| "script.py".to_string()),
        "javascript" => identifier_after(source, "function ")
            .map(|name| format!("{}.js", name.to_lowercase()))
            .unwrap_or_else(|| "script.js".to_string()),
        "java" => identifier_after(source, "public class ")
            .map(|name| format!("{name}.java"))
            .unwrap_or_else(|| "Main.java".to_string()),
        "html" => "index.html".to_string(),
        "css" => "styles.css".to_string(),
        "cpp" => "main.cpp".to_string(),
        "text" => "code.txt".to_string(),
        other => format!("code.{other}"),
    }
}

fn identifier_after(source: &str, keyword: &str) -> Option<String> {
    let start = source.find(keyword)? + keyword.len();
    let ident: String = source[start..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match ident.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => Some(ident),
        _ => None,
    }
}
