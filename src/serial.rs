// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Line framing for the serial console.
//!
//! Bytes accumulate until LF. CR is dropped so both `\n` and `\r\n`
//! terminals work. A line longer than [`LINE_MAX`] is discarded whole and
//! reported once its terminator arrives.

use heapless::{String, Vec};
use snafu::Snafu;

use crate::settings::LINE_MAX;

pub type Line = String<LINE_MAX>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum LineError {
    #[snafu(display("line too long (max {LINE_MAX} bytes)"))]
    Overflow,
    #[snafu(display("line is not valid UTF-8"))]
    Encoding,
}

#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8, LINE_MAX>,
    overflowed: bool,
    ready: Option<Result<Line, LineError>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte. Returns true when a line is complete and can
    /// be collected with [`take_line`](Self::take_line). A line that is not
    /// collected is replaced by the next one.
    pub fn push(&mut self, byte: u8) -> bool {
        match byte {
            b'\r' => false,
            b'\n' => {
                let result = if core::mem::take(&mut self.overflowed) {
                    Err(LineError::Overflow)
                } else {
                    let bytes = core::mem::take(&mut self.buf);
                    String::from_utf8(bytes).map_err(|_| LineError::Encoding)
                };
                self.buf.clear();
                self.ready = Some(result);
                true
            }
            b => {
                if !self.overflowed && self.buf.push(b).is_err() {
                    self.overflowed = true;
                    self.buf.clear();
                }
                false
            }
        }
    }

    pub fn take_line(&mut self) -> Option<Result<Line, LineError>> {
        self.ready.take()
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lb: &mut LineBuffer, bytes: &[u8]) -> Vec<Result<Line, LineError>, 8> {
        let mut out = Vec::new();
        for &b in bytes {
            if lb.push(b) {
                out.push(lb.take_line().unwrap()).unwrap();
            }
        }
        out
    }

    #[test]
    fn lf_completes_a_line() {
        let mut lb = LineBuffer::new();
        let lines = feed(&mut lb, b"HELP\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap().as_str(), "HELP");
        assert_eq!(lb.pending(), 0);
        assert!(lb.take_line().is_none());
    }

    #[test]
    fn cr_is_discarded() {
        let mut lb = LineBuffer::new();
        let lines = feed(&mut lb, b"SET\r_MODE\r\n");
        assert_eq!(lines[0].as_ref().unwrap().as_str(), "SET_MODE");
    }

    #[test]
    fn partial_line_waits() {
        let mut lb = LineBuffer::new();
        assert!(feed(&mut lb, b"SHOW_").is_empty());
        assert_eq!(lb.pending(), 5);
        let lines = feed(&mut lb, b"CONFIG\nHE");
        assert_eq!(lines[0].as_ref().unwrap().as_str(), "SHOW_CONFIG");
        assert_eq!(lb.pending(), 2);
    }

    #[test]
    fn empty_line_is_still_a_line() {
        let mut lb = LineBuffer::new();
        let lines = feed(&mut lb, b"\r\n");
        assert_eq!(lines[0].as_ref().unwrap().as_str(), "");
    }

    #[test]
    fn overflow_drops_the_whole_line() {
        let mut lb = LineBuffer::new();
        let long = [b'a'; LINE_MAX + 10];
        assert!(feed(&mut lb, &long).is_empty());
        let lines = feed(&mut lb, b"\nHELP\n");
        assert_eq!(lines[0], Err(LineError::Overflow));
        assert_eq!(lines[1].as_ref().unwrap().as_str(), "HELP");
    }

    #[test]
    fn exactly_max_fits() {
        let mut lb = LineBuffer::new();
        let mut bytes = [b'x'; LINE_MAX + 1];
        bytes[LINE_MAX] = b'\n';
        let lines = feed(&mut lb, &bytes);
        assert_eq!(lines[0].as_ref().unwrap().len(), LINE_MAX);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut lb = LineBuffer::new();
        let lines = feed(&mut lb, &[0xff, 0xfe, b'\n']);
        assert_eq!(lines[0], Err(LineError::Encoding));
    }
}
