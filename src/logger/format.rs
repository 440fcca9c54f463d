//! Access log format module
//!
//! One line per request, rendered in one of:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format)
//! - `json` (one JSON object per line)
//! - a custom pattern with `$variable` placeholders

use chrono::{DateTime, Local};
use std::net::IpAddr;
use std::time::Duration;

/// Parsed `logging.access_log_format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogFormat {
    Combined,
    Common,
    Json,
    Custom(String),
}

impl From<&str> for AccessLogFormat {
    fn from(name: &str) -> Self {
        match name {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            pattern => Self::Custom(pattern.to_string()),
        }
    }
}

/// What the access log records about one request/response exchange
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_ip: IpAddr,
    pub time: DateTime<Local>,
    pub method: String,
    /// Path plus `?query` when present
    pub uri: String,
    /// `1.0`, `1.1`, `2`
    pub version: &'static str,
    pub status: u16,
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub latency: Duration,
}

impl AccessLogEntry {
    /// Entry stamped with the current local time; response fields start empty
    pub fn new(remote_ip: IpAddr, method: &str, uri: &str) -> Self {
        Self {
            remote_ip,
            time: Local::now(),
            method: method.to_string(),
            uri: uri.to_string(),
            version: "1.1",
            status: 0,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            latency: Duration::ZERO,
        }
    }

    pub fn render(&self, format: &AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.common(),
                self.var("http_referer"),
                self.var("http_user_agent")
            ),
            AccessLogFormat::Common => self.common(),
            AccessLogFormat::Json => self.json(),
            AccessLogFormat::Custom(pattern) => self.expand(pattern),
        }
    }

    fn common(&self) -> String {
        self.expand("$remote_addr - - [$time_local] \"$request\" $status $body_bytes_sent")
    }

    fn json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_ip.to_string(),
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "uri": self.uri,
            "http_version": self.version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": u64::try_from(self.latency.as_micros()).unwrap_or(u64::MAX),
        })
        .to_string()
    }

    /// Value of one `$variable`, or `None` when the name is unknown
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_ip.to_string(),
            "time_local" => self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => format!("{} {} HTTP/{}", self.method, self.uri, self.version),
            "request_method" => self.method.clone(),
            "request_uri" => self.uri.clone(),
            "request_time" => format!("{:.3}", self.latency.as_secs_f64()),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => self.referer.clone().unwrap_or_else(|| "-".to_string()),
            "http_user_agent" => self.user_agent.clone().unwrap_or_else(|| "-".to_string()),
            _ => return None,
        };
        Some(value)
    }

    fn var(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_default()
    }

    /// Substitute `$name` placeholders; unknown names are copied through
    fn expand(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 64);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];

            match self.lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }
}
