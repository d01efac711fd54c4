pub mod http;
pub mod types;

use anyhow::Result;

pub use http::HttpWebhook;
pub use types::{Exchange, Reply};

/// The service under evaluation. One call is one attempt: implementations
/// report per-attempt failures inside the returned [`Exchange`] and reserve
/// `Err` for conditions that should stop the run.
pub trait Webhook {
    fn post(&self, prompt: &str) -> Result<Exchange>;
}
