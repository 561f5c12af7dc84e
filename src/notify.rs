// src/notify.rs

use std::fmt;
use std::io::{self, Write};

/* ---------------- MESSAGES ---------------- */

pub const MSG_EMPTY_LABEL: &str = "please enter a position name";
pub const MSG_NO_PENDING: &str = "no position to add, request a fix first";
pub const MSG_FIX_IN_FLIGHT: &str = "a location request is already running";
pub const MSG_INVALID_INDEX: &str = "invalid selection index";
pub const MSG_LOCATION_ERROR: &str = "location error";

/* ---------------- NOTICE ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

// A human-readable message for the user. Has no effect on state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            NoticeKind::Error => "error",
            NoticeKind::Success => "ok",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/* ---------------- SINKS ---------------- */

pub trait NotificationSink {
    fn notify(&mut self, notice: Notice);
}

// Keeps every notice, in order.
impl NotificationSink for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

// Writes one line per notice.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> NotificationSink for ConsoleSink<W> {
    fn notify(&mut self, notice: Notice) {
        if let Err(e) = writeln!(self.out, "{notice}") {
            tracing::warn!(error = %e, %notice, "notice could not be written");
        }
    }
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_format() {
        let mut buf = Vec::new();
        let mut sink = ConsoleSink::new(&mut buf);
        sink.notify(Notice::error(MSG_EMPTY_LABEL));
        sink.notify(Notice::success("added Home"));
        drop(sink);

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "[error] please enter a position name\n[ok] added Home\n");
    }

    #[test]
    fn test_vec_sink_records_in_order() {
        let mut sink: Vec<Notice> = Vec::new();
        sink.notify(Notice::error("a"));
        sink.notify(Notice::success("b"));
        assert_eq!(sink, vec![Notice::error("a"), Notice::success("b")]);
    }
}
