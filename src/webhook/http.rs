use super::{Webhook, types::*};
use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client as HttpClient;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct HttpWebhook {
    url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    client: HttpClient,
}

impl HttpWebhook {
    pub fn new(cfg: &Config) -> Result<Self> {
        let url = cfg.webhook.url.trim().to_string();
        if url.is_empty() {
            return Err(anyhow!("webhook url must not be empty"));
        }
        let timeout = Duration::from_secs(cfg.webhook.timeout_seconds);
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            url,
            bearer_token: cfg.bearer_token().map(str::to_string),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Webhook for HttpWebhook {
    fn post(&self, prompt: &str) -> Result<Exchange> {
        let payload = serde_json::json!({ "message": prompt });
        let mut builder = self.client.post(&self.url).timeout(self.timeout).json(&payload);
        if let Some(token) = self.bearer_token.as_ref() {
            builder = builder.bearer_auth(token);
        }

        let started = Instant::now();
        let reply = match builder.send() {
            Ok(response) => {
                let status = response.status();
                match response.text() {
                    Ok(body) if status.is_success() => Reply::Success {
                        status: status.as_u16(),
                        body,
                    },
                    Ok(body) => Reply::HttpError {
                        status: status.as_u16(),
                        body,
                    },
                    Err(err) => Reply::Transport {
                        error: describe(err),
                    },
                }
            }
            Err(err) => Reply::Transport {
                error: describe(err),
            },
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!("POST {} -> {:?} in {}ms", self.url, reply.status(), latency_ms);
        Ok(Exchange { latency_ms, reply })
    }
}

fn describe(err: reqwest::Error) -> String {
    format!("{:#}", anyhow::Error::from(err))
}
