use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One evaluation unit. Only `prompt` is required; the rest is carried into
/// each record as-is.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub expectation: Option<String>,
}

impl Task {
    /// Label used in progress lines and as the grouping key fallback.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("None")
    }
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading tasks: {}", path.display()))?;
    parse_tasks(&raw).with_context(|| format!("parsing tasks: {}", path.display()))
}

pub fn parse_tasks(raw: &str) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let task: Task = serde_json::from_str(line).with_context(|| format!("line {}", i + 1))?;
        tasks.push(task);
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_defaults_optional_fields() {
        let raw = "\n{\"prompt\":\"hi\"}\n   \n{\"id\":\"t2\",\"category\":\"math\",\"prompt\":\"1+1\",\"expectation\":\"2\",\"extra\":1}\n";
        let tasks = parse_tasks(raw).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, None);
        assert_eq!(tasks[0].label(), "None");
        assert_eq!(tasks[1].id.as_deref(), Some("t2"));
        assert_eq!(tasks[1].expectation.as_deref(), Some("2"));
    }

    #[test]
    fn missing_prompt_reports_line_number() {
        let raw = "{\"prompt\":\"ok\"}\n{\"id\":\"x\"}\n";
        let err = parse_tasks(raw).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
