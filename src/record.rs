use crate::{extract, util::ensure_parent};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// One line of the result log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    pub timestamp: String,
    pub task_id: Option<String>,
    pub category: Option<String>,
    pub expectation: Option<String>,
    pub run_index: u32,
    pub request: RequestInfo,
    pub meta: RunMeta,
    pub result: RunResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMeta {
    pub provider: String,
    pub model: String,
    pub temperature: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub ok: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
    /// Raw body of a rejected or unparseable reply.
    pub error_body: Option<String>,
    pub response: Option<Value>,
    pub iterations: Option<i64>,
    pub tool_calls: Option<u64>,
    // Not collected yet; always null.
    pub token_input: Option<u64>,
    pub token_output: Option<u64>,
    pub cost_estimate_usd: Option<f64>,
}

/// Append-only NDJSON sink. Every record is flushed before `append` returns,
/// so a crash loses at most the attempt in flight.
pub struct RecordWriter<W: Write> {
    inner: W,
    written: usize,
}

impl RecordWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = File::create(path)
            .with_context(|| format!("create result log: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn append(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.inner, record).with_context(|| "serializing record")?;
        self.inner.write_all(b"\n")?;
        self.inner.flush().with_context(|| "flushing result log")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Lenient read-side view of a log line. Fields may be missing or mistyped
/// in hand-edited or older logs; accessors return `None` in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow(Value);

impl LogRow {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Grouping key. A missing or null id groups under `None`.
    pub fn task_id(&self) -> String {
        match extract::field(&self.0, &["task_id"]) {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => "None".to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn ok(&self) -> bool {
        matches!(extract::field(&self.0, &["result", "ok"]), Some(Value::Bool(true)))
    }

    pub fn latency_ms(&self) -> Option<f64> {
        number_at(&self.0, &["result", "latency_ms"])
    }

    pub fn iterations(&self) -> Option<f64> {
        number_at(&self.0, &["result", "iterations"])
    }

    pub fn tool_calls(&self) -> Option<f64> {
        number_at(&self.0, &["result", "tool_calls"])
    }
}

fn number_at(value: &Value, path: &[&str]) -> Option<f64> {
    match extract::field(value, path)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub fn read_log(path: &Path, skip_invalid: bool) -> Result<Vec<LogRow>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading result log: {}", path.display()))?;
    parse_log(&raw, skip_invalid).with_context(|| format!("parsing result log: {}", path.display()))
}

/// Only newline-terminated lines are trusted; a trailing fragment is what a
/// crash mid-write leaves behind and is dropped.
pub fn parse_log(raw: &str, skip_invalid: bool) -> Result<Vec<LogRow>> {
    let mut rows = Vec::new();
    for (i, chunk) in raw.split_inclusive('\n').enumerate() {
        let line_no = i + 1;
        let line = chunk.trim();
        if line.is_empty() {
            continue;
        }
        if !chunk.ends_with('\n') {
            warn!("ignoring unterminated trailing line {line_no} (truncated write?)");
            continue;
        }
        match parse_line(line) {
            Ok(row) => rows.push(row),
            Err(err) if skip_invalid => warn!("skipping line {line_no}: {err:#}"),
            Err(err) => return Err(err.context(format!("line {line_no}"))),
        }
    }
    Ok(rows)
}

fn parse_line(line: &str) -> Result<LogRow> {
    let value: Value = serde_json::from_str(line).with_context(|| "invalid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("record is not a JSON object"));
    }
    Ok(LogRow::new(value))
}
