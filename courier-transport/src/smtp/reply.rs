//! SMTP reply parsing and representation.

use super::error::{ClientError, Result};

/// A single line of a (possibly multi-line) SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    /// `true` when the separator is a space (final line), `false` for the
    /// dash continuation marker.
    pub is_last: bool,
    pub message: String,
}

impl ReplyLine {
    /// Parse one reply line (without its trailing CRLF).
    ///
    /// # Errors
    /// `ClientError::Parse` when the line does not match SMTP reply format.
    pub fn parse(line: &str) -> Result<Self> {
        if line.len() < 3 {
            return Err(ClientError::Parse(format!("reply line too short: '{line}'")));
        }

        let code = line[..3]
            .parse::<u16>()
            .map_err(|_| ClientError::Parse(format!("invalid status code in '{line}'")))?;

        let is_last = match line.as_bytes().get(3) {
            Some(b' ') | None => true,
            Some(b'-') => false,
            Some(other) => {
                return Err(ClientError::Parse(format!(
                    "invalid separator '{}' in '{line}'",
                    char::from(*other)
                )));
            }
        };

        let message = if line.len() > 4 {
            line[4..].to_string()
        } else {
            String::new()
        };

        Ok(Self {
            code,
            is_last,
            message,
        })
    }
}

/// A complete SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// All reply lines joined with newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// 2xx reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// 3xx reply (e.g. 354 after DATA, 334 during AUTH).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// Whether an EHLO reply advertises the given extension keyword.
    #[must_use]
    pub fn advertises(&self, extension: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|keyword| keyword.eq_ignore_ascii_case(extension))
        })
    }
}
