//! EMU-2 command envelope builder.
//!
//! Produces `<Command><Name>...</Name>...</Command>` strings that can be
//! written to a device through its source. The command vocabulary itself is
//! up to the caller:
//!
//! ```ignore
//! let cmd = Command::new("get_schedule")
//!     .meter("0x000781000028c07d")
//!     .field("Event", "demand")
//!     .to_string();
//! ```

use std::fmt;

/// One child element of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    tag: String,
    text: String,
}

fn write_element(f: &mut fmt::Formatter<'_>, tag: &str, text: &str) -> fmt::Result {
    if text.is_empty() {
        write!(f, "<{} />", tag)
    } else {
        write!(f, "<{}>{}</{}>", tag, escape(text), tag)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Builder for a single device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    children: Vec<Element>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Target a specific meter (`<MeterMacId>`). May be repeated.
    pub fn meter(self, id: impl Into<String>) -> Self {
        self.field("MeterMacId", id)
    }

    pub fn field(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.children.push(Element {
            tag: tag.into(),
            text: value.into(),
        });
        self
    }

    /// Numeric field in the device's `0x%X` notation.
    pub fn hex_field(self, tag: impl Into<String>, value: u64) -> Self {
        self.field(tag, format!("{:#X}", value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Command>")?;
        write_element(f, "Name", &self.name)?;
        for child in &self.children {
            write_element(f, &child.tag, &child.text)?;
        }
        write!(f, "</Command>")
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.to_string()
    }
}
