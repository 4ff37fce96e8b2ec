//! Stream framer (Coalescer).
//!
//! Turns an unbounded sequence of raw text chunks into complete
//! `<Name ...>...</Name>` fragments. Chunks need not line up with fragment
//! boundaries: a fragment may span many chunks, and one chunk may close a
//! fragment, hold several more, and start the next one.
//!
//! # States
//!
//! - `SeekingStart` - nothing buffered except, possibly, an incomplete start
//!   tag such as `<Inst` or a lone `<`. Text before the first start tag is
//!   discarded as noise.
//! - `Accumulating` - a start tag was seen; text is buffered until the first
//!   literal `</Name>` for the captured name. A same-named nested element
//!   therefore closes the fragment early.
//! - `Discarding` - the fragment outgrew `max_fragment_bytes`; text is dropped
//!   up to its closing tag, keeping only enough to recognise that tag.
//!
//! A `<` inside a would-be start tag abandons it, so a stray `<` in noise
//! never merges with the next real start tag. A fragment longer than the cap
//! is dropped whether it arrived whole or in pieces.
//!
//! Output does not depend on how the input was split into chunks.

use crate::error::Result;
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};

/// Default cap on a single partial fragment, in bytes
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 64 * 1024;

/// Framer mode, as observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerMode {
    SeekingStart,
    Accumulating,
    /// Skipping an oversized fragment up to its closing tag
    Discarding,
}

#[derive(Debug)]
enum Mode {
    SeekingStart,
    Accumulating {
        tag: String,
        /// `</tag>`
        closing: String,
        /// Buffer offset before which the closing tag cannot start
        scan_from: usize,
    },
    /// An oversized start tag is being skipped up to its `>`
    SkippingStartTag {
        tag: String,
        /// The text skipped so far ended with `/`
        slash_pending: bool,
    },
    /// An oversized fragment is being skipped up to its closing tag
    Discarding { closing: String },
}

enum StartTag {
    /// No start tag can begin anywhere in the text
    None,
    /// A start tag may begin at `start` but is not complete yet; `name_end`
    /// is known once the name is
    Partial {
        start: usize,
        name_end: Option<usize>,
    },
    Found {
        start: usize,
        name_end: usize,
        /// Offset just past the `>`
        end: usize,
        self_closing: bool,
    },
}

fn is_name_end(c: char) -> bool {
    c.is_whitespace() || matches!(c, '/' | '>' | '<')
}

/// Locate the first start tag: a `<` not followed by `/` and followed by a name.
///
/// A `<` inside a candidate's name or attributes abandons the candidate and the
/// search resumes there. With a non-zero `max_bytes`, a candidate whose `<name`
/// alone is longer than `max_bytes` is not a start tag.
fn find_start_tag(text: &str, max_bytes: usize) -> StartTag {
    let too_long = |len: usize| max_bytes > 0 && len > max_bytes;
    let mut from = 0;
    while let Some(rel) = text[from..].find('<') {
        let start = from + rel;
        let after = &text[start + 1..];
        let Some(first) = after.chars().next() else {
            return StartTag::Partial {
                start,
                name_end: None,
            };
        };
        if first == '/' || is_name_end(first) {
            from = start + 1;
            continue;
        }
        let Some(name_len) = after.find(is_name_end) else {
            if too_long(1 + after.len()) {
                break;
            }
            return StartTag::Partial {
                start,
                name_end: None,
            };
        };
        let name_end = start + 1 + name_len;
        if too_long(1 + name_len) {
            from = name_end;
            continue;
        }
        match text[name_end..].find(|c: char| c == '<' || c == '>') {
            Some(rel) if text.as_bytes()[name_end + rel] == b'<' => {
                from = name_end + rel;
            }
            Some(rel) => {
                let end = name_end + rel + 1;
                return StartTag::Found {
                    start,
                    name_end,
                    end,
                    self_closing: text[..end - 1].ends_with('/'),
                };
            }
            None => {
                return StartTag::Partial {
                    start,
                    name_end: Some(name_end),
                }
            }
        }
    }
    StartTag::None
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Stream framer stage: raw text in, complete fragments out.
pub struct Coalescer {
    mode: Mode,
    buffer: String,
    max_fragment_bytes: usize,
    output: Broadcaster<String>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::with_max_fragment_bytes(DEFAULT_MAX_FRAGMENT_BYTES)
    }

    /// `0` disables the cap.
    pub fn with_max_fragment_bytes(max_fragment_bytes: usize) -> Self {
        Self {
            mode: Mode::SeekingStart,
            buffer: String::new(),
            max_fragment_bytes,
            output: Broadcaster::new(),
        }
    }

    pub fn mode(&self) -> FramerMode {
        match self.mode {
            Mode::SeekingStart => FramerMode::SeekingStart,
            Mode::Accumulating { .. } => FramerMode::Accumulating,
            Mode::SkippingStartTag { .. } | Mode::Discarding { .. } => FramerMode::Discarding,
        }
    }

    /// Root name of the fragment being accumulated.
    pub fn tag(&self) -> Option<&str> {
        match &self.mode {
            Mode::Accumulating { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Text held for the next fragment.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.mode = Mode::SeekingStart;
        self.buffer.clear();
    }

    fn oversized(&self, len: usize) -> bool {
        self.max_fragment_bytes > 0 && len > self.max_fragment_bytes
    }

    /// Feed one chunk and return the fragments it completed, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut fragments = Vec::new();

        loop {
            match &mut self.mode {
                Mode::SeekingStart => match find_start_tag(&self.buffer, self.max_fragment_bytes) {
                    StartTag::None => {
                        self.buffer.clear();
                        break;
                    }
                    StartTag::Partial { start, name_end } => {
                        self.buffer.drain(..start);
                        if let Some(name_end) = name_end.filter(|_| self.oversized(self.buffer.len())) {
                            let tag = self.buffer[1..name_end - start].to_string();
                            tracing::warn!(
                                "Discarding {} fragment: start tag exceeds {} bytes",
                                tag,
                                self.max_fragment_bytes
                            );
                            let slash_pending = self.buffer.ends_with('/');
                            self.buffer.clear();
                            self.mode = Mode::SkippingStartTag { tag, slash_pending };
                        }
                        break;
                    }
                    StartTag::Found {
                        start,
                        name_end,
                        end,
                        self_closing,
                    } => {
                        let tag = self.buffer[start + 1..name_end].to_string();
                        if self_closing {
                            if self.oversized(end - start) {
                                tracing::warn!(
                                    "Discarding {} fragment: {} bytes exceeds {}",
                                    tag,
                                    end - start,
                                    self.max_fragment_bytes
                                );
                            } else {
                                fragments.push(self.buffer[start..end].to_string());
                            }
                            self.buffer.drain(..end);
                            continue;
                        }
                        self.buffer.drain(..start);
                        tracing::trace!("Fragment {} started", tag);
                        self.mode = Mode::Accumulating {
                            closing: format!("</{}>", tag),
                            tag,
                            scan_from: end - start,
                        };
                    }
                },
                Mode::Accumulating {
                    tag,
                    closing,
                    scan_from,
                } => {
                    let from = floor_char_boundary(&self.buffer, *scan_from);
                    if let Some(rel) = self.buffer[from..].find(closing.as_str()) {
                        let end = from + rel + closing.len();
                        if self.max_fragment_bytes > 0 && end > self.max_fragment_bytes {
                            tracing::warn!(
                                "Discarding {} fragment: {} bytes exceeds {}",
                                tag,
                                end,
                                self.max_fragment_bytes
                            );
                            self.buffer.drain(..end);
                        } else {
                            let rest = self.buffer.split_off(end);
                            fragments.push(std::mem::replace(&mut self.buffer, rest));
                        }
                        self.mode = Mode::SeekingStart;
                        continue;
                    }
                    if self.max_fragment_bytes > 0 && self.buffer.len() > self.max_fragment_bytes {
                        tracing::warn!(
                            "Discarding {} fragment: {} bytes without {}",
                            tag,
                            self.buffer.len(),
                            closing
                        );
                        let closing = std::mem::take(closing);
                        self.mode = Mode::Discarding { closing };
                        continue;
                    }
                    *scan_from = self.buffer.len().saturating_sub(closing.len() - 1);
                    break;
                }
                Mode::SkippingStartTag { tag, slash_pending } => {
                    match self.buffer.find(|c: char| c == '<' || c == '>') {
                        Some(i) if self.buffer.as_bytes()[i] == b'<' => {
                            self.buffer.drain(..i);
                            self.mode = Mode::SeekingStart;
                        }
                        Some(i) => {
                            let self_closing = if i == 0 {
                                *slash_pending
                            } else {
                                self.buffer[..i].ends_with('/')
                            };
                            self.buffer.drain(..=i);
                            self.mode = if self_closing {
                                Mode::SeekingStart
                            } else {
                                Mode::Discarding {
                                    closing: format!("</{}>", tag),
                                }
                            };
                        }
                        None => {
                            if !self.buffer.is_empty() {
                                *slash_pending = self.buffer.ends_with('/');
                            }
                            self.buffer.clear();
                            break;
                        }
                    }
                }
                Mode::Discarding { closing } => {
                    if let Some(rel) = self.buffer.find(closing.as_str()) {
                        self.buffer.drain(..rel + closing.len());
                        self.mode = Mode::SeekingStart;
                        continue;
                    }
                    let keep = self.buffer.len().saturating_sub(closing.len() - 1);
                    let keep = floor_char_boundary(&self.buffer, keep);
                    self.buffer.drain(..keep);
                    break;
                }
            }
        }

        fragments
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener<String> for Coalescer {
    fn receive(&mut self, chunk: &String) -> Result<()> {
        for fragment in self.feed(chunk) {
            self.output.broadcast(&fragment)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Coalescer"
    }
}

impl Producer<String> for Coalescer {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}
