use crate::{
    record::LogRow,
    stats::{fmt_num, mean, p95, success_rate},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NOTES: [&str; 3] = [
    "This report only covers automatically collected metrics.",
    "`score_quality` is not captured automatically; score runs by hand against the eval rubric.",
    "After changing the agent, rerun with the same task set and parameters before comparing.",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub overall: GroupStats,
    pub per_task: Vec<TaskRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRow {
    pub task_id: String,
    pub stats: GroupStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupStats {
    pub runs: usize,
    pub succeeded: usize,
    pub success_rate: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub avg_iterations: Option<f64>,
    pub avg_tool_calls: Option<f64>,
}

impl GroupStats {
    pub fn from_rows(rows: &[&LogRow]) -> Self {
        let succeeded = rows.iter().filter(|r| r.ok()).count();
        let latency: Vec<f64> = rows.iter().filter_map(|r| r.latency_ms()).collect();
        let iterations: Vec<f64> = rows.iter().filter_map(|r| r.iterations()).collect();
        let tool_calls: Vec<f64> = rows.iter().filter_map(|r| r.tool_calls()).collect();
        Self {
            runs: rows.len(),
            succeeded,
            success_rate: success_rate(succeeded, rows.len()),
            avg_latency_ms: mean(&latency),
            p95_latency_ms: p95(&latency),
            avg_iterations: mean(&iterations),
            avg_tool_calls: mean(&tool_calls),
        }
    }
}

/// Pure function of the log rows; input order does not matter.
pub fn summarize(rows: &[LogRow]) -> Summary {
    let all: Vec<&LogRow> = rows.iter().collect();

    let mut by_task: BTreeMap<String, Vec<&LogRow>> = BTreeMap::new();
    for row in rows {
        by_task.entry(row.task_id()).or_default().push(row);
    }

    Summary {
        overall: GroupStats::from_rows(&all),
        per_task: by_task
            .into_iter()
            .map(|(task_id, group)| TaskRow {
                stats: GroupStats::from_rows(&group),
                task_id,
            })
            .collect(),
    }
}

pub fn render_markdown(summary: &Summary) -> String {
    let o = &summary.overall;
    let mut lines: Vec<String> = vec![
        "# Baseline Eval Summary".into(),
        "".into(),
        "## Overall".into(),
        "".into(),
        format!("- Total runs: {}", o.runs),
        format!("- Success runs: {}", o.succeeded),
        format!("- Success rate: {}%", fmt_num(o.success_rate)),
        format!("- Avg latency: {} ms", fmt_num(o.avg_latency_ms)),
        format!("- P95 latency: {} ms", fmt_num(o.p95_latency_ms)),
        format!("- Avg iterations: {}", fmt_num(o.avg_iterations)),
        format!("- Avg tool calls: {}", fmt_num(o.avg_tool_calls)),
        "".into(),
        "## Per Task".into(),
        "".into(),
        "| Task ID | Runs | Success % | Avg Latency(ms) | Avg Iterations | Avg Tool Calls |".into(),
        "|---|---:|---:|---:|---:|---:|".into(),
    ];

    for row in &summary.per_task {
        let s = &row.stats;
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            row.task_id.replace('|', "\\|"),
            s.runs,
            fmt_num(s.success_rate),
            fmt_num(s.avg_latency_ms),
            fmt_num(s.avg_iterations),
            fmt_num(s.avg_tool_calls),
        ));
    }

    lines.push("".into());
    lines.push("## Notes".into());
    lines.push("".into());
    lines.extend(NOTES.iter().map(|n| format!("- {n}")));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
