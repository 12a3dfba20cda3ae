//! Typed filter-graph fragment templates.
//!
//! Effects describe their filter chains against symbolic inputs because the
//! real input indices are only known once assets have been drawn. A template
//! is parsed once into a sequence of segments:
//!
//! | Syntax          | Segment                                   |
//! |-----------------|-------------------------------------------|
//! | `{source:v}`    | video stream of the source (input 0)      |
//! | `{overlay:a}`   | audio stream of the overlay (input 1)     |
//! | `{asset2:v}`    | video stream of the effect's second asset |
//! | `{param:gain}`  | computed effect parameter                 |
//! | `[vtmp]`        | effect-local pad label                    |
//! | anything else   | literal filter text                       |

use std::fmt;
use thiserror::Error;

/// Which elementary stream of an input a reference addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Stream specifier used by FFmpeg (`v`/`a`).
    pub fn specifier(&self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "v" => Some(StreamKind::Video),
            "a" => Some(StreamKind::Audio),
            _ => None,
        }
    }
}

/// Symbolic input an effect refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// The primary video, always input 0
    Source,
    /// The user-supplied overlay, input 1 when present
    Overlay,
    /// The n-th asset drawn for the effect (1-based)
    Asset(usize),
}

impl Slot {
    /// Token name as written in templates (`source`, `asset2`, ...).
    pub fn token(&self) -> String {
        match self {
            Slot::Source => "source".to_string(),
            Slot::Overlay => "overlay".to_string(),
            Slot::Asset(n) => format!("asset{}", n),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "source" => Some(Slot::Source),
            "overlay" => Some(Slot::Overlay),
            _ => s
                .strip_prefix("asset")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n >= 1)
                .map(Slot::Asset),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// One parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Stream { slot: Slot, kind: StreamKind },
    Param(String),
    Label(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed '{open}' starting at byte {offset}")]
    Unclosed { open: char, offset: usize },

    #[error("unexpected '{0}' at byte {1}")]
    Unexpected(char, usize),

    #[error("invalid placeholder {{{0}}}")]
    InvalidPlaceholder(String),

    #[error("invalid label [{0}]")]
    InvalidLabel(String),
}

/// A parsed filter chain template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentTemplate {
    segments: Vec<Segment>,
}

impl FragmentTemplate {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' | '[' => {
                    let close = if c == '{' { '}' } else { ']' };
                    let mut inner = String::new();
                    let mut closed = false;
                    for (_, ic) in chars.by_ref() {
                        if ic == close {
                            closed = true;
                            break;
                        }
                        inner.push(ic);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed { open: c, offset });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(if c == '{' {
                        parse_placeholder(&inner)?
                    } else {
                        parse_label(&inner)?
                    });
                }
                '}' | ']' => return Err(TemplateError::Unexpected(c, offset)),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct input slots in order of first occurrence.
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots = Vec::new();
        for segment in &self.segments {
            if let Segment::Stream { slot, .. } = segment {
                if !slots.contains(slot) {
                    slots.push(*slot);
                }
            }
        }
        slots
    }

    /// Whether the template references the given slot at all.
    pub fn references(&self, slot: Slot) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Stream { slot: found, .. } if *found == slot))
    }

    /// Distinct labels in order of first occurrence.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Label(name) = segment {
                if !labels.contains(&name.as_str()) {
                    labels.push(name);
                }
            }
        }
        labels
    }
}

impl fmt::Display for FragmentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Stream { slot, kind } => write!(f, "{{{}:{}}}", slot, kind.specifier())?,
                Segment::Param(name) => write!(f, "{{param:{}}}", name)?,
                Segment::Label(name) => write!(f, "[{}]", name)?,
            }
        }
        Ok(())
    }
}

fn parse_placeholder(inner: &str) -> Result<Segment, TemplateError> {
    let invalid = || TemplateError::InvalidPlaceholder(inner.to_string());
    let (head, tail) = inner.split_once(':').ok_or_else(invalid)?;

    if head == "param" {
        if is_identifier(tail) {
            return Ok(Segment::Param(tail.to_string()));
        }
        return Err(invalid());
    }

    let slot = Slot::parse(head).ok_or_else(invalid)?;
    let kind = StreamKind::parse(tail).ok_or_else(invalid)?;
    Ok(Segment::Stream { slot, kind })
}

fn parse_label(inner: &str) -> Result<Segment, TemplateError> {
    if is_identifier(inner) {
        Ok(Segment::Label(inner.to_string()))
    } else {
        Err(TemplateError::InvalidLabel(inner.to_string()))
    }
}

/// Characters allowed in pad labels: ASCII letters, digits and `_`.
pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
