use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_WEBHOOK_URL: &str = "ZEROCLAW_WEBHOOK_URL";
pub const ENV_BEARER_TOKEN: &str = "ZEROCLAW_BEARER_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "ZEROCLAW_TIMEOUT_SECS";
pub const ENV_PROVIDER: &str = "EVAL_PROVIDER";
pub const ENV_MODEL: &str = "EVAL_MODEL";
pub const ENV_TEMPERATURE: &str = "EVAL_TEMPERATURE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub webhook: Webhook,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub run: Run,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub output: Output,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in the
    /// binary; tests pass a map so the process environment is never touched.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.webhook.url = url;
        }
        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            self.webhook.bearer_token = token;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.webhook.timeout_seconds = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} is not an integer: {raw:?}"))?;
        }
        if let Some(v) = lookup(ENV_PROVIDER) {
            self.meta.provider = v;
        }
        if let Some(v) = lookup(ENV_MODEL) {
            self.meta.model = v;
        }
        if let Some(v) = lookup(ENV_TEMPERATURE) {
            self.meta.temperature = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.webhook.url.trim().is_empty() {
            return Err(anyhow!("webhook.url must not be empty"));
        }
        if self.webhook.timeout_seconds == 0 {
            return Err(anyhow!("webhook.timeout_seconds must be positive"));
        }
        if self.run.repeats == 0 {
            return Err(anyhow!("run.repeats must be at least 1"));
        }
        Ok(())
    }

    /// Empty token means "no Authorization header".
    pub fn bearer_token(&self) -> Option<&str> {
        let t = self.webhook.bearer_token.trim();
        if t.is_empty() { None } else { Some(t) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub url: String,
    pub bearer_token: String,
    pub timeout_seconds: u64,
}
impl Default for Webhook {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/webhook".into(),
            bearer_token: "".into(),
            timeout_seconds: 120,
        }
    }
}

/// Opaque labels copied into every record; never interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub provider: String,
    pub model: String,
    pub temperature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    pub repeats: u32,
    pub strict_success_body: bool,
}
impl Default for Run {
    fn default() -> Self {
        Self {
            repeats: 3,
            strict_success_body: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub skip_invalid_lines: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}
