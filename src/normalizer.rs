use mail_parser::MessageParser;
use regex::Regex;

use crate::error::PipelineError;

/// Turns a raw RFC 822 payload into plain `(subject, body)` text.
///
/// MIME structure and RFC 2047 encoded-word headers are handled by the
/// parser; malformed encoded words are decoded permissively rather than
/// rejected. The body is the first non-attachment `text/plain` part, falling
/// back to the first `text/html` part, with tags stripped and whitespace
/// collapsed either way.
pub struct EmailNormalizer {
    parser: MessageParser,
    tag_regex: Regex,
    whitespace_regex: Regex,
}

impl EmailNormalizer {
    pub fn new() -> Self {
        Self {
            parser: MessageParser::default(),
            tag_regex: Regex::new(r"<[^>]*>").unwrap(),
            whitespace_regex: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Never fails: a message that cannot be parsed is reported and recorded
    /// as an empty pair so the pipeline still produces a classification.
    pub fn normalize(&self, raw: &[u8]) -> (String, String) {
        match self.try_normalize(raw) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("error processing email, recording as empty: {e}");
                (String::new(), String::new())
            }
        }
    }

    pub fn try_normalize(&self, raw: &[u8]) -> Result<(String, String), PipelineError> {
        let message = self
            .parser
            .parse(raw)
            .ok_or_else(|| PipelineError::ParseFailure("not an RFC 822 message".to_string()))?;

        let subject = message.subject().unwrap_or_default().to_string();

        let body = if let Some(text) = message.body_text(0) {
            text.into_owned()
        } else if let Some(html) = message.body_html(0) {
            html.into_owned()
        } else {
            String::new()
        };

        Ok((subject, self.clean_body(&body)))
    }

    fn clean_body(&self, body: &str) -> String {
        let stripped = self.tag_regex.replace_all(body, "");
        let collapsed = self.whitespace_regex.replace_all(&stripped, " ");
        collapsed.trim().to_string()
    }
}

impl Default for EmailNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_message_round_trips() {
        let normalizer = EmailNormalizer::new();
        let raw = b"Subject: Team meeting\r\nFrom: alice@example.com\r\n\r\nSee you at 10 AM.";
        let (subject, body) = normalizer.normalize(raw);
        assert_eq!(subject, "Team meeting");
        assert_eq!(body, "See you at 10 AM.");
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let normalizer = EmailNormalizer::new();
        let raw = b"Subject: x\r\n\r\n  line one\r\n\r\n\tline   two  ";
        let (_, body) = normalizer.normalize(raw);
        assert_eq!(body, "line one line two");
    }

    #[test]
    fn multipart_prefers_plain_text_part() {
        let normalizer = EmailNormalizer::new();
        let raw = concat!(
            "Subject: alternative\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain part here\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html part</p>\r\n",
            "--b1--\r\n",
        );
        let (subject, body) = normalizer.normalize(raw.as_bytes());
        assert_eq!(subject, "alternative");
        assert_eq!(body, "plain part here");
    }

    #[test]
    fn html_only_message_is_stripped_of_tags() {
        let normalizer = EmailNormalizer::new();
        let raw = concat!(
            "Subject: html\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<html><body><b>click</b> here now</body></html>\r\n",
        );
        let (_, body) = normalizer.normalize(raw.as_bytes());
        assert!(!body.contains('<'), "tags left in {body:?}");
        assert!(body.contains("click"));
        assert!(body.contains("here now"));
    }

    #[test]
    fn decodes_encoded_word_subject() {
        let normalizer = EmailNormalizer::new();
        let raw = b"Subject: =?utf-8?q?Caf=C3=A9_update?=\r\n\r\nbody";
        let (subject, _) = normalizer.normalize(raw);
        assert_eq!(subject, "Caf\u{e9} update");
    }

    #[test]
    fn unparseable_input_yields_empty_pair() {
        let normalizer = EmailNormalizer::new();
        assert_eq!(normalizer.normalize(b""), (String::new(), String::new()));
    }
}
