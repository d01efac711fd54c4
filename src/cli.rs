use crate::{
    config::Config,
    record::{RecordWriter, read_log},
    report::{render_markdown, summarize},
    runner::Runner,
    task::load_tasks,
    util::{ensure_parent, hash_file},
    webhook::HttpWebhook,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "webhook-eval")]
#[command(about = "Replay eval tasks against an agent webhook and summarize the results")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./webhook-eval.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every task against the webhook and write one JSON record per attempt.
    Run {
        /// Task list (one JSON object per line).
        #[arg(long)]
        tasks: PathBuf,
        /// Result log to create (overwritten if present).
        #[arg(long)]
        out: PathBuf,
        /// Attempts per task. Defaults to run.repeats from config.
        #[arg(long)]
        repeats: Option<u32>,
    },
    /// Aggregate a result log into a Markdown report.
    Summarize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write the computed statistics as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str())
        .to_string();
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&level, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Run {
            tasks,
            out,
            repeats,
        } => run(&cfg, tasks, out, *repeats),
        Command::Summarize {
            input,
            output,
            json,
        } => summarize_cmd(&cfg, input, output, json.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("webhook-eval.toml");
    default.exists().then_some(default)
}

/// Installs the global subscriber. When one is already installed (a host
/// process or a second dispatch in the same process) the existing one is kept.
fn init_logging(
    level: &str,
    cfg: &Config,
    file_path: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer().with_target(true);
    let console = if cfg.logging.json {
        console.json().boxed()
    } else {
        console.boxed()
    };

    let mut guard = None;
    let file_layer = match file_path {
        Some(path) => {
            ensure_parent(path)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("create log file: {}", path.display()))?;
            let (writer, g) = tracing_appender::non_blocking(file);
            guard = Some(g);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed(),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    match installed {
        Ok(()) => Ok(guard),
        // Lost a race with another caller; its subscriber stays in place.
        Err(_) if tracing::dispatcher::has_been_set() => Ok(None),
        Err(e) => Err(anyhow!("failed to init logging: {e}")),
    }
}

fn run(cfg: &Config, tasks_path: &Path, out: &Path, repeats: Option<u32>) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(r) = repeats {
        cfg.run.repeats = r;
    }
    cfg.validate()?;

    // Input problems must surface before the output file is truncated.
    let tasks = load_tasks(tasks_path)?;
    let tasks_sha256 = hash_file(tasks_path)
        .with_context(|| format!("hashing tasks: {}", tasks_path.display()))?;

    let webhook = HttpWebhook::new(&cfg)?;
    let mut writer = RecordWriter::create(out)?;

    info!(
        "running {} tasks x {} repeats against {} (timeout {}s)",
        tasks.len(),
        cfg.run.repeats,
        webhook.url(),
        cfg.webhook.timeout_seconds
    );

    let runner = Runner::new(&cfg, webhook);
    let stats = runner.run(&tasks, cfg.run.repeats, &mut writer)?;

    info!(
        "wrote {} records to {} ({} ok, {} failed)",
        stats.records,
        out.display(),
        stats.succeeded,
        stats.failed
    );

    if cfg.output.print_summary {
        let mut summary = serde_json::to_value(&stats)?;
        if let Some(obj) = summary.as_object_mut() {
            obj.insert("out".into(), serde_json::json!(out));
            obj.insert("tasks_sha256".into(), tasks_sha256.into());
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

fn summarize_cmd(cfg: &Config, input: &Path, output: &Path, json: Option<&Path>) -> Result<()> {
    let rows = read_log(input, cfg.summary.skip_invalid_lines)?;
    let summary = summarize(&rows);

    ensure_parent(output)?;
    std::fs::write(output, render_markdown(&summary))
        .with_context(|| format!("writing summary: {}", output.display()))?;

    if let Some(json_path) = json {
        ensure_parent(json_path)?;
        std::fs::write(json_path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("writing summary JSON: {}", json_path.display()))?;
    }

    info!("Wrote summary: {}", output.display());
    Ok(())
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("webhook-eval.log"))
}
