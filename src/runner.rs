use crate::{
    config::Config,
    extract,
    record::{RecordWriter, RequestInfo, ResultRecord, RunMeta, RunResult},
    task::Task,
    util::now_rfc3339,
    webhook::{Exchange, Reply, Webhook},
};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

pub const ERR_HTTP: &str = "http_error";
pub const ERR_INVALID_BODY: &str = "invalid_response_body";

pub struct Runner<W: Webhook> {
    cfg: Config,
    webhook: W,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunStats {
    pub tasks: usize,
    pub repeats: u32,
    pub records: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl<W: Webhook> Runner<W> {
    pub fn new(cfg: &Config, webhook: W) -> Self {
        Self {
            cfg: cfg.clone(),
            webhook,
        }
    }

    /// Replays every task `repeats` times, task-major, strictly one request
    /// at a time. Each record is on disk before the next request starts.
    pub fn run<O: Write>(
        &self,
        tasks: &[Task],
        repeats: u32,
        sink: &mut RecordWriter<O>,
    ) -> Result<RunStats> {
        if repeats == 0 {
            return Err(anyhow!("repeats must be at least 1"));
        }

        let mut stats = RunStats {
            tasks: tasks.len(),
            repeats,
            ..Default::default()
        };

        for task in tasks {
            for run_index in 1..=repeats {
                let exchange = self
                    .webhook
                    .post(&task.prompt)
                    .with_context(|| format!("task {} run {}", task.label(), run_index))?;
                let result = classify(exchange, self.cfg.run.strict_success_body)
                    .with_context(|| format!("task {} run {}", task.label(), run_index))?;

                if let Some(err) = result.error.as_deref() {
                    if err != ERR_HTTP {
                        warn!("[{}] run {}: {}", task.label(), run_index, err);
                    }
                }

                let record = self.record(task, run_index, result);
                sink.append(&record)?;

                stats.records += 1;
                if record.result.ok {
                    stats.succeeded += 1;
                } else {
                    stats.failed += 1;
                }

                info!(
                    "[{}] run {}/{} ok={} latency={}ms",
                    task.label(),
                    run_index,
                    repeats,
                    record.result.ok,
                    record.result.latency_ms
                );
            }
        }

        Ok(stats)
    }

    fn record(&self, task: &Task, run_index: u32, result: RunResult) -> ResultRecord {
        ResultRecord {
            timestamp: now_rfc3339(),
            task_id: task.id.clone(),
            category: task.category.clone(),
            expectation: task.expectation.clone(),
            run_index,
            request: RequestInfo {
                url: self.cfg.webhook.url.trim().to_string(),
                timeout_secs: self.cfg.webhook.timeout_seconds,
            },
            meta: RunMeta {
                provider: self.cfg.meta.provider.clone(),
                model: self.cfg.meta.model.clone(),
                temperature: self.cfg.meta.temperature.clone(),
            },
            result,
        }
    }
}

/// Turns one exchange into the `result` block of a record.
///
/// Failed attempts carry no reply to inspect and count as zero tool calls,
/// so they still weigh on the tool-call average.
///
/// A 2xx reply whose body is not JSON either becomes a failed attempt
/// (`invalid_response_body`) or, with `strict_success_body`, an error that
/// stops the run.
pub fn classify(exchange: Exchange, strict_success_body: bool) -> Result<RunResult> {
    let latency_ms = exchange.latency_ms;
    match exchange.reply {
        Reply::Success { status, body } => match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(parsed) => Ok(RunResult {
                ok: true,
                status_code: Some(status),
                latency_ms,
                response: extract::value_at(&parsed, &["response"]),
                iterations: extract::int_at(&parsed, &["trace", "iterations"]),
                tool_calls: extract::array_len_at(&parsed, &["tool_calls"]),
                ..Default::default()
            }),
            Err(err) if strict_success_body => Err(anyhow!(
                "webhook returned status {status} with a body that is not JSON: {err}"
            )),
            Err(_) => Ok(RunResult {
                ok: false,
                status_code: Some(status),
                latency_ms,
                error: Some(ERR_INVALID_BODY.to_string()),
                error_body: Some(body),
                tool_calls: Some(0),
                ..Default::default()
            }),
        },
        Reply::HttpError { status, body } => Ok(RunResult {
            ok: false,
            status_code: Some(status),
            latency_ms,
            error: Some(ERR_HTTP.to_string()),
            error_body: Some(body),
            tool_calls: Some(0),
            ..Default::default()
        }),
        Reply::Transport { error } => Ok(RunResult {
            ok: false,
            status_code: None,
            latency_ms,
            error: Some(error),
            tool_calls: Some(0),
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(body: &str) -> Exchange {
        Exchange {
            latency_ms: 42,
            reply: Reply::Success {
                status: 200,
                body: body.to_string(),
            },
        }
    }

    #[test]
    fn success_body_fields_are_extracted() {
        let r = classify(
            success(r#"{"response":"ok","trace":{"iterations":3},"tool_calls":[1,2]}"#),
            false,
        )
        .unwrap();
        assert!(r.ok);
        assert_eq!(r.status_code, Some(200));
        assert_eq!(r.latency_ms, 42);
        assert_eq!(r.response, Some(json!("ok")));
        assert_eq!(r.iterations, Some(3));
        assert_eq!(r.tool_calls, Some(2));
        assert_eq!(r.error, None);
        assert_eq!(r.token_input, None);
        assert_eq!(r.cost_estimate_usd, None);
    }

    #[test]
    fn bare_object_has_zero_tool_calls() {
        let r = classify(success("{}"), false).unwrap();
        assert!(r.ok);
        assert_eq!(r.response, None);
        assert_eq!(r.iterations, None);
        assert_eq!(r.tool_calls, Some(0));
    }

    #[test]
    fn non_object_success_body_degrades_to_absent() {
        let r = classify(success("[1,2,3]"), false).unwrap();
        assert!(r.ok);
        assert_eq!(r.response, None);
        assert_eq!(r.tool_calls, None);
    }

    #[test]
    fn http_error_keeps_raw_body() {
        let r = classify(
            Exchange {
                latency_ms: 7,
                reply: Reply::HttpError {
                    status: 500,
                    body: r#"{"msg":"bad"}"#.to_string(),
                },
            },
            false,
        )
        .unwrap();
        assert!(!r.ok);
        assert_eq!(r.status_code, Some(500));
        assert_eq!(r.error.as_deref(), Some(ERR_HTTP));
        assert_eq!(r.error_body.as_deref(), Some(r#"{"msg":"bad"}"#));
        assert_eq!(r.response, None);
        assert_eq!(r.tool_calls, Some(0));
        assert_eq!(r.iterations, None);
    }

    #[test]
    fn transport_failure_counts_zero_tool_calls() {
        let r = classify(
            Exchange {
                latency_ms: 3,
                reply: Reply::Transport {
                    error: "connection refused".into(),
                },
            },
            false,
        )
        .unwrap();
        assert!(!r.ok);
        assert_eq!(r.status_code, None);
        assert_eq!(r.error.as_deref(), Some("connection refused"));
        assert_eq!(r.tool_calls, Some(0));
        assert_eq!(r.iterations, None);
    }

    #[test]
    fn invalid_success_body_is_recorded_by_default() {
        let r = classify(success("<html>"), false).unwrap();
        assert!(!r.ok);
        assert_eq!(r.status_code, Some(200));
        assert_eq!(r.error.as_deref(), Some(ERR_INVALID_BODY));
        assert_eq!(r.error_body.as_deref(), Some("<html>"));
        assert_eq!(r.tool_calls, Some(0));
    }

    #[test]
    fn invalid_success_body_aborts_when_strict() {
        assert!(classify(success("<html>"), true).is_err());
    }
}
