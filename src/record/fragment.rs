//! Flat view of one XML fragment: the root element name and its text children.

use crate::error::{EmuError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn root_pattern() -> &'static Regex {
    static ROOT: OnceLock<Regex> = OnceLock::new();
    ROOT.get_or_init(|| {
        Regex::new(r"<(?<name>[A-Za-z_][\w.:-]*)[^>]*?(?<close>/?)>").expect("root pattern")
    })
}

fn child_pattern() -> &'static Regex {
    static CHILD: OnceLock<Regex> = OnceLock::new();
    CHILD.get_or_init(|| {
        Regex::new(
            r"<(?<open>[A-Za-z_][\w.:-]*)\s*>(?<text>[^<]*)</(?<close>[A-Za-z_][\w.:-]*)\s*>|<(?<empty>[A-Za-z_][\w.:-]*)\s*/>",
        )
        .expect("child pattern")
    })
}

/// Root element name plus `<Name>text</Name>` children, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    tag: String,
    fields: Vec<(String, String)>,
}

impl Fragment {
    /// Parse the text of one complete fragment.
    ///
    /// Only the first level of leaf elements is collected; nested containers
    /// are flattened into their leaves. Element text is trimmed and the five
    /// predefined XML entities are unescaped.
    pub fn parse(xml: &str) -> Result<Self> {
        let root = root_pattern()
            .captures(xml)
            .ok_or_else(|| EmuError::Decode("no root element".to_string()))?;
        let tag = root["name"].to_string();
        let body_start = root.get(0).map(|m| m.end()).unwrap_or(xml.len());

        let mut fields = Vec::new();
        if root["close"].is_empty() {
            for cap in child_pattern().captures_iter(&xml[body_start..]) {
                if let Some(empty) = cap.name("empty") {
                    fields.push((empty.as_str().to_string(), String::new()));
                    continue;
                }
                let (open, close) = (&cap["open"], &cap["close"]);
                if open != close {
                    continue;
                }
                fields.push((open.to_string(), unescape(cap["text"].trim())));
            }
        }

        Ok(Self { tag, fields })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Text of the first child named `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Required field, as text.
    pub fn text(&self, name: &str) -> Result<String> {
        self.field(name)
            .map(str::to_string)
            .ok_or_else(|| EmuError::Decode(format!("{} is missing {}", self.tag, name)))
    }

    /// Required field, as an unsigned integer.
    pub fn number(&self, name: &str) -> Result<u64> {
        let raw = self
            .field(name)
            .ok_or_else(|| EmuError::Decode(format!("{} is missing {}", self.tag, name)))?;
        parse_number(raw)
            .ok_or_else(|| EmuError::Decode(format!("{}.{} is not a number: {}", self.tag, name, raw)))
    }

    /// Optional numeric field; absent or malformed values yield `None`.
    pub fn number_opt(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(parse_number)
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => u64::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => raw.parse().ok(),
    }
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
