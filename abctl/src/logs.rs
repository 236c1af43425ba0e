//! Scanner for Airbyte pod logs
//!
//! Airbyte services log one JSON object per line, but startup banners and
//! stack traces from other subsystems are plain text. [`LogScanner`] handles
//! both, yielding a [`LogLine`] per input line.

use serde::Deserialize;
use std::io::{self, BufRead};

/// A single classified log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLine {
    /// Log level, empty for plain text lines.
    pub level: String,
    pub message: String,
}

impl LogLine {
    pub fn is_error(&self) -> bool {
        self.level.eq_ignore_ascii_case("ERROR")
    }

    pub fn is_warning(&self) -> bool {
        self.level.eq_ignore_ascii_case("WARN")
    }
}

/// Structured log event as emitted by the Java services. `null` and missing
/// fields both read as empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct JavaLogLine {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    log_source: Option<String>,
    #[serde(default)]
    caller: Option<JavaCaller>,
    #[serde(default)]
    throwable: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct JavaCaller {
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    method_name: Option<String>,
    #[serde(default)]
    line_number: Option<i64>,
    #[serde(default)]
    thread_name: Option<String>,
}

/// Pull-style log classifier.
///
/// ```
/// use abctl::logs::LogScanner;
///
/// let mut s = LogScanner::new("banner\n".as_bytes());
/// while s.scan() {
///     println!("{} {}", s.line().level, s.line().message);
/// }
/// assert!(s.err().is_none());
/// ```
pub struct LogScanner<R> {
    reader: R,
    buf: Vec<u8>,
    line: LogLine,
    err: Option<io::Error>,
}

impl<R: BufRead> LogScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: LogLine::default(),
            err: None,
        }
    }

    /// Advance to the next line. Returns `false` at the end of input or after a
    /// read failure, see [`LogScanner::err`].
    pub fn scan(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => false,
            Ok(_) => {
                self.line = parse_line(trim_newline(&self.buf));
                true
            }
            Err(err) => {
                self.err = Some(err);
                false
            }
        }
    }

    /// The most recently scanned line.
    pub fn line(&self) -> &LogLine {
        &self.line
    }

    /// The read failure that stopped scanning, if any. Lines that are not JSON
    /// or not UTF-8 are not errors.
    pub fn err(&self) -> Option<&io::Error> {
        self.err.as_ref()
    }
}

fn trim_newline(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

fn parse_line(raw: &[u8]) -> LogLine {
    match serde_json::from_slice::<JavaLogLine>(raw) {
        Ok(data) => LogLine {
            level: data.level.unwrap_or_default(),
            message: data.message.unwrap_or_default(),
        },
        Err(_) => LogLine {
            level: String::new(),
            message: String::from_utf8_lossy(raw).into_owned(),
        },
    }
}
