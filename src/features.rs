use regex::Regex;
use serde::Serialize;

/// Fixed-shape numeric features computed from one message's combined text.
///
/// Every field is a pure function of the input text; two calls with the same
/// text always produce the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FeatureRecord {
    pub length: u32,
    pub num_links: u32,
    pub num_attachment_markers: u32,
    pub suspicious_word_count: u32,
    pub has_html: u8,
    pub special_char_count: u32,
    pub uppercase_ratio: f64,
    pub suspicious_sender_flag: u8,
    pub shortened_link_count: u32,
}

const ATTACHMENT_MARKER: &str = "Content-Disposition: attachment";

pub struct FeatureExtractor {
    link_regex: Regex,
    suspicious_word_regex: Regex,
    suspicious_sender_regex: Regex,
    shortened_link_regex: Regex,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            link_regex: Regex::new(r"https?://(?:%[0-9a-fA-F]{2}|[A-Za-z0-9$\-_@.&+!*(),/=?#:~])+")
                .unwrap(),
            suspicious_word_regex: Regex::new(
                r"(?i)urgent|verify|password|security|update|account|login|confirm|bank|paypal|suspend|limited|warning",
            )
            .unwrap(),
            suspicious_sender_regex: Regex::new(r"(?i)\d{5,}@|support@\w+\.\w+\.\w+").unwrap(),
            shortened_link_regex: Regex::new(r"(?i)bit\.ly|goo\.gl|tinyurl|t\.co").unwrap(),
        }
    }

    /// Extract features from combined message text. Total: empty input yields
    /// an all-zero record.
    pub fn extract(&self, text: &str) -> FeatureRecord {
        let char_count = text.chars().count();
        let uppercase_count = text.chars().filter(|c| c.is_uppercase()).count();

        FeatureRecord {
            length: char_count as u32,
            num_links: self.link_regex.find_iter(text).count() as u32,
            num_attachment_markers: text.matches(ATTACHMENT_MARKER).count() as u32,
            suspicious_word_count: self.suspicious_word_regex.find_iter(text).count() as u32,
            has_html: u8::from(text.to_lowercase().contains("<html")),
            special_char_count: text
                .chars()
                .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
                .count() as u32,
            // max(1) keeps the ratio defined for empty text
            uppercase_ratio: uppercase_count as f64 / char_count.max(1) as f64,
            suspicious_sender_flag: u8::from(self.suspicious_sender_regex.is_match(text)),
            shortened_link_count: self.shortened_link_regex.find_iter(text).count() as u32,
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
