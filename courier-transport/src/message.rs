//! The message handed to transport adapters.

/// A fully personalized outbound message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Envelope and header sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutboundMessage {
    /// Render the message as a MIME document for SMTP submission.
    #[must_use]
    pub fn mime(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}",
            self.from, self.to, self.subject, self.html_body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_carries_headers_and_body() {
        let message = OutboundMessage {
            from: "campaigns@example.com".to_string(),
            to: "user@example.org".to_string(),
            subject: "Spring launch".to_string(),
            html_body: "<p>Hello</p>".to_string(),
        };

        let mime = message.mime();
        assert!(mime.starts_with("From: campaigns@example.com\r\n"));
        assert!(mime.contains("Subject: Spring launch\r\n"));
        assert!(mime.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(mime.ends_with("\r\n\r\n<p>Hello</p>"));
    }
}
