use serde_json::json;
use webhook_eval::{
    record::{LogRow, parse_log},
    report::{render_markdown, summarize},
};

fn row(
    task: &str,
    ok: bool,
    latency: u64,
    iterations: Option<i64>,
    tools: Option<u64>,
) -> LogRow {
    LogRow::new(json!({
        "task_id": task,
        "run_index": 1,
        "result": {
            "ok": ok,
            "latency_ms": latency,
            "iterations": iterations,
            "tool_calls": tools,
        }
    }))
}

#[test]
fn empty_log_reports_not_available() {
    let summary = summarize(&[]);
    assert_eq!(summary.overall.runs, 0);
    assert_eq!(summary.overall.success_rate, None);
    assert_eq!(summary.overall.avg_latency_ms, None);
    assert_eq!(summary.overall.p95_latency_ms, None);

    let md = render_markdown(&summary);
    assert!(md.contains("- Total runs: 0\n"));
    assert!(md.contains("- Success rate: n/a%\n"));
    assert!(md.contains("- Avg latency: n/a ms\n"));
    assert!(md.contains("- P95 latency: n/a ms\n"));
}

#[test]
fn p95_uses_nearest_rank() {
    let rows = vec![
        row("a", true, 30, None, None),
        row("a", true, 10, None, None),
        row("a", true, 20, None, None),
    ];
    let summary = summarize(&rows);
    assert_eq!(summary.overall.p95_latency_ms, Some(20.0));
    assert_eq!(summary.overall.avg_latency_ms, Some(20.0));
}

#[test]
fn groups_are_sorted_and_order_independent() {
    let forward = vec![
        row("b", true, 10, Some(2), Some(1)),
        row("a", false, 40, None, None),
        row("c", true, 5, Some(1), Some(0)),
        row("a", true, 20, Some(4), Some(3)),
    ];
    let mut backward = forward.clone();
    backward.reverse();

    let s1 = summarize(&forward);
    let s2 = summarize(&backward);
    assert_eq!(render_markdown(&s1), render_markdown(&s2));

    let ids: Vec<&str> = s1.per_task.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let a = &s1.per_task[0].stats;
    assert_eq!(a.runs, 2);
    assert_eq!(a.succeeded, 1);
    assert_eq!(a.success_rate, Some(50.0));
    assert_eq!(a.avg_latency_ms, Some(30.0));
    // Nulls are skipped, not counted as zero.
    assert_eq!(a.avg_iterations, Some(4.0));
    assert_eq!(a.avg_tool_calls, Some(3.0));
}

#[test]
fn renders_fixed_layout() {
    let rows = vec![
        row("t1", true, 100, Some(3), Some(2)),
        row("t1", false, 300, None, None),
        row("t2", true, 200, Some(1), Some(0)),
    ];
    let md = render_markdown(&summarize(&rows));
    let expected = "\
# Baseline Eval Summary

## Overall

- Total runs: 3
- Success runs: 2
- Success rate: 66.67%
- Avg latency: 200.00 ms
- P95 latency: 200.00 ms
- Avg iterations: 2.00
- Avg tool calls: 1.00

## Per Task

| Task ID | Runs | Success % | Avg Latency(ms) | Avg Iterations | Avg Tool Calls |
|---|---:|---:|---:|---:|---:|
| t1 | 2 | 50.00 | 200.00 | 3.00 | 2.00 |
| t2 | 1 | 100.00 | 200.00 | 1.00 | 0.00 |

## Notes
";
    assert!(md.starts_with(expected), "got:\n{md}");
    assert!(md.ends_with('\n'));
    assert!(!md.ends_with("\n\n"));
}

#[test]
fn rerendering_is_byte_identical() {
    let raw = concat!(
        "{\"task_id\":\"x\",\"result\":{\"ok\":true,\"latency_ms\":12,\"iterations\":1,\"tool_calls\":0}}\n",
        "{\"task_id\":\"y\",\"result\":{\"ok\":false,\"latency_ms\":7,\"iterations\":null,\"tool_calls\":null}}\n",
    );
    let first = render_markdown(&summarize(&parse_log(raw, false).unwrap()));
    let second = render_markdown(&summarize(&parse_log(raw, false).unwrap()));
    assert_eq!(first, second);
}

#[test]
fn failed_runs_pull_tool_call_average_down() {
    let rows = vec![
        row("a", true, 10, Some(2), Some(4)),
        row("a", false, 30, None, Some(0)),
    ];
    let summary = summarize(&rows);
    assert_eq!(summary.overall.avg_tool_calls, Some(2.0));
    assert_eq!(summary.per_task[0].stats.avg_tool_calls, Some(2.0));
    // Iterations stay absent on failures and are skipped.
    assert_eq!(summary.overall.avg_iterations, Some(2.0));
    assert!(render_markdown(&summary).contains("- Avg tool calls: 2.00\n"));
}

#[test]
fn missing_task_id_groups_as_none() {
    let rows = vec![LogRow::new(json!({"result": {"ok": true, "latency_ms": 1}}))];
    let summary = summarize(&rows);
    assert_eq!(summary.per_task[0].task_id, "None");
    assert!(render_markdown(&summary).contains("| None | 1 | 100.00 | 1.00 | n/a | n/a |"));
}
