//! Access log format module
//!
//! Supports the usual access log layouts:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variable` placeholders

use chrono::{DateTime, Local};
use serde_json::json;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Access log layout selected by `logging.access_log_format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Combined,
    Common,
    Json,
    Custom(String),
}

impl LogFormat {
    pub fn parse(name: &str) -> Self {
        match name {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            pattern => Self::Custom(pattern.to_string()),
        }
    }
}

/// One served request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    /// Request path as received, before any normalization
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// New entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &LogFormat) -> String {
        match format {
            LogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                dash(self.referer.as_deref()),
                dash(self.user_agent.as_deref()),
            ),
            LogFormat::Common => self.common_line(),
            LogFormat::Json => json!({
                "remote_addr": self.remote_addr,
                "time": self.time.to_rfc3339(),
                "method": self.method,
                "path": self.path,
                "query": self.query,
                "http_version": self.http_version,
                "status": self.status,
                "body_bytes": self.body_bytes,
                "referer": self.referer,
                "user_agent": self.user_agent,
                "request_time_us": self.request_time_us,
            })
            .to_string(),
            LogFormat::Custom(pattern) => self.format_custom(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Value of a single `$variable`, `None` when the name is unknown
    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => self.request_line(),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let secs = self.request_time_us as f64 / 1_000_000.0;
                format!("{secs:.3}")
            }
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => dash(self.referer.as_deref()).to_string(),
            "http_user_agent" => dash(self.user_agent.as_deref()).to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Substitute `$name` placeholders; unknown names are left as written
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }
        out.push_str(rest);
        out
    }
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/wmap/pure-php/public/index.php/hello/index".to_string(),
        );
        entry.query = Some("x=1".to_string());
        entry.status = 200;
        entry.body_bytes = 11;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.request_time_us = 1600;
        entry
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!(LogFormat::parse("combined"), LogFormat::Combined);
        assert_eq!(LogFormat::parse("common"), LogFormat::Common);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(
            LogFormat::parse("$status"),
            LogFormat::Custom("$status".to_string())
        );
    }

    #[test]
    fn test_format_combined() {
        let log = hello_entry().format(&LogFormat::Combined);
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /wmap/pure-php/public/index.php/hello/index?x=1 HTTP/1.1\""));
        assert!(log.contains(" 200 11 "));
        assert!(log.ends_with("\"https://example.com\" \"curl/8.0\""));
    }

    #[test]
    fn test_format_common_omits_headers() {
        let log = hello_entry().format(&LogFormat::Common);
        assert!(log.ends_with("HTTP/1.1\" 200 11"));
        assert!(!log.contains("curl/8.0"));
    }

    #[test]
    fn test_format_combined_missing_headers() {
        let mut entry = hello_entry();
        entry.referer = None;
        entry.user_agent = None;
        assert!(entry.format(&LogFormat::Combined).ends_with("\"-\" \"-\""));
    }

    #[test]
    fn test_format_json() {
        let log = hello_entry().format(&LogFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&log).expect("valid json");
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 11);
        assert_eq!(value["query"], "x=1");
    }

    #[test]
    fn test_format_json_escapes() {
        let mut entry = hello_entry();
        entry.user_agent = Some("quote\" and \\ slash".to_string());
        let value: serde_json::Value =
            serde_json::from_str(&entry.format(&LogFormat::Json)).expect("valid json");
        assert_eq!(value["user_agent"], "quote\" and \\ slash");
        entry.referer = None;
        let value: serde_json::Value =
            serde_json::from_str(&entry.format(&LogFormat::Json)).expect("valid json");
        assert!(value["referer"].is_null());
    }

    #[test]
    fn test_format_custom() {
        let entry = hello_entry();
        let log = entry.format(&LogFormat::parse(
            "$remote_addr $request_method $status $request_time $unknown$",
        ));
        // 1600us rounds to 0.002s
        assert_eq!(log, "192.168.1.1 GET 200 0.002 $unknown$");
    }

    #[test]
    fn test_format_custom_request_vs_request_uri() {
        let entry = hello_entry();
        let log = entry.format(&LogFormat::parse("[$request] [$request_uri]"));
        assert_eq!(
            log,
            "[GET /wmap/pure-php/public/index.php/hello/index?x=1 HTTP/1.1] \
             [/wmap/pure-php/public/index.php/hello/index?x=1]"
        );
    }
}
