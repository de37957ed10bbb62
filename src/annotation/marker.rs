use std::fmt;
use std::str::FromStr;

use super::error::CommentError;

// -----------------------------------------------------------------------------
// EVENT KINDS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Stop,
    Kill,
    Error,
    Annotate,
    /// Anything else; the name is sent as-is in a white marker.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Kill => "kill",
            EventKind::Error => "error",
            EventKind::Annotate => "annotate",
            EventKind::Other(name) => name,
        }
    }

    /// Stop, kill and error end the session and close the NSP links.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Stop | EventKind::Kill | EventKind::Error)
    }

    /// Builds the marker for this event. `extra_text` is only used by
    /// `Annotate`, whose marker is the text verbatim.
    pub fn marker(&self, label: &str, extra_text: &str) -> EventMarker {
        let (code, color) = match self {
            EventKind::Start => (format!("$TASKSTART {}", label), MarkerColor::Green),
            EventKind::Stop => (format!("$TASKSTOP {}", label), MarkerColor::Pink),
            EventKind::Kill => (format!("$TASKKILL {}", label), MarkerColor::Red),
            EventKind::Error => (format!("$TASKERR {}", label), MarkerColor::Red),
            EventKind::Annotate => (extra_text.to_string(), MarkerColor::Blue),
            EventKind::Other(name) => (format!("{}-{}", name, label), MarkerColor::White),
        };
        EventMarker {
            code,
            color,
            close_after: self.is_terminal(),
        }
    }
}

impl FromStr for EventKind {
    type Err = CommentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "" => {
                return Err(CommentError::InvalidRequest(
                    "event must not be empty".to_string(),
                ))
            }
            "start" => EventKind::Start,
            "stop" => EventKind::Stop,
            "kill" => EventKind::Kill,
            "error" => EventKind::Error,
            "annotate" => EventKind::Annotate,
            other => EventKind::Other(other.to_string()),
        };
        Ok(kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// MARKER COLORS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    Green,
    Pink,
    Red,
    Blue,
    White,
}

impl MarkerColor {
    /// `(t, b, g, r)`, the tuple order the NSP comment call takes.
    pub fn tbgr(self) -> (u8, u8, u8, u8) {
        match self {
            MarkerColor::Green => (0, 0, 255, 0),
            MarkerColor::Pink => (0, 255, 0, 255),
            MarkerColor::Red => (0, 0, 0, 255),
            MarkerColor::Blue => (0, 255, 0, 0),
            MarkerColor::White => (0, 255, 255, 255),
        }
    }

    /// Packed `0xBBGGRR`.
    pub fn packed(self) -> u32 {
        let (_, b, g, r) = self.tbgr();
        (b as u32) << 16 | (g as u32) << 8 | r as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkerColor::Green => "green",
            MarkerColor::Pink => "pink",
            MarkerColor::Red => "red",
            MarkerColor::Blue => "blue",
            MarkerColor::White => "white",
        }
    }
}

// -----------------------------------------------------------------------------
// MARKERS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMarker {
    pub code: String,
    pub color: MarkerColor,
    pub close_after: bool,
}

impl EventMarker {
    /// Text sent to one NSP: the code with a `_NSP-{n}` suffix, n 1-based.
    pub fn comment_for(&self, device: usize) -> String {
        format!("{}_NSP-{}", self.code, device + 1)
    }
}
