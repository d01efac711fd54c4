/// Outcome of a single POST, as observed by the harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub latency_ms: u64,
    pub reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 2xx with the body still unparsed.
    Success { status: u16, body: String },
    /// Non-2xx; the body is kept verbatim.
    HttpError { status: u16, body: String },
    /// No usable response: timeout, refused connection, DNS, broken body stream.
    Transport { error: String },
}

impl Reply {
    pub fn status(&self) -> Option<u16> {
        match self {
            Reply::Success { status, .. } | Reply::HttpError { status, .. } => Some(*status),
            Reply::Transport { .. } => None,
        }
    }
}
