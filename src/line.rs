//! Newline framing for inbound diagnostic text.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::constants::{MAX_PENDING_LINE, PARTIAL_LINE_TIMEOUT};

/// What to do with byte sequences that are not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Substitute U+FFFD
    Replace,
    /// Drop the offending bytes
    Ignore,
}

/// Decode one raw line and strip trailing whitespace, `\r` included.
pub fn decode_line(raw: &[u8], policy: DecodePolicy) -> String {
    let mut text = match policy {
        DecodePolicy::Replace => String::from_utf8_lossy(raw).into_owned(),
        DecodePolicy::Ignore => raw.utf8_chunks().map(|chunk| chunk.valid()).collect(),
    };
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text
}

/// Accumulates inbound bytes and hands out complete lines only.
///
/// A fragment that goes stale or grows past the pending limit is dropped,
/// and so is everything up to the next newline, so the tail of a broken line
/// is never reported as a line of its own. The cost is that the first line
/// after a long silence mid-line is lost as well.
#[derive(Debug)]
pub struct LineAssembler {
    pending: Vec<u8>,
    /// Skipping the remainder of a dropped line
    resyncing: bool,
    last_byte_at: Option<Instant>,
    policy: DecodePolicy,
    stale_after: Duration,
}

impl LineAssembler {
    pub fn new(policy: DecodePolicy) -> Self {
        Self::with_stale_after(policy, PARTIAL_LINE_TIMEOUT)
    }

    pub fn with_stale_after(policy: DecodePolicy, stale_after: Duration) -> Self {
        LineAssembler {
            pending: Vec::new(),
            resyncing: false,
            last_byte_at: None,
            policy,
            stale_after,
        }
    }

    /// Bytes received after the last newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append `bytes` and return every line they complete, in order.
    pub fn push(&mut self, bytes: &[u8], now: Instant) -> Vec<String> {
        if bytes.is_empty() {
            return Vec::new();
        }
        self.last_byte_at = Some(now);

        let mut bytes = bytes;
        if self.resyncing {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    debug!("Skipped {} byte(s) of a dropped line", end + 1);
                    bytes = &bytes[end + 1..];
                    self.resyncing = false;
                }
                None => return Vec::new(),
            }
        }
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&raw[..end], self.policy));
        }
        if !lines.is_empty() {
            debug!(
                "Framed {} line(s), {} byte(s) pending",
                lines.len(),
                self.pending.len()
            );
        }
        if self.pending.len() > MAX_PENDING_LINE {
            self.drop_fragment("oversized");
        }
        lines
    }

    /// Drop an unterminated fragment that has not grown for the staleness
    /// window. Returns the number of bytes discarded.
    pub fn discard_stale(&mut self, now: Instant) -> Option<usize> {
        let last = self.last_byte_at?;
        if self.pending.is_empty() || now.saturating_duration_since(last) < self.stale_after {
            return None;
        }

        Some(self.drop_fragment("stale"))
    }

    fn drop_fragment(&mut self, why: &str) -> usize {
        let discarded = self.pending.len();
        warn!(
            "Discarding {} byte(s) of {} unterminated input: {:?}",
            discarded,
            why,
            String::from_utf8_lossy(&self.pending[..discarded.min(64)])
        );
        self.pending.clear();
        self.resyncing = true;
        self.last_byte_at = None;
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_lines_are_held_back() {
        let mut assembler = LineAssembler::new(DecodePolicy::Replace);
        let now = Instant::now();

        assert!(assembler.push(b"Mouse rea", now).is_empty());
        assert_eq!(assembler.pending_len(), 9);
        assert_eq!(assembler.push(b"dy\r\nkm.p", now), vec!["Mouse ready"]);
        assert_eq!(assembler.push(b"os(1,2)\n\n", now), vec!["km.pos(1,2)", ""]);
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn trailing_whitespace_is_trimmed_leading_is_kept() {
        assert_eq!(decode_line(b"  boot ok \t ", DecodePolicy::Replace), "  boot ok");
    }

    #[test]
    fn invalid_utf8_never_fails() {
        let raw = b"temp \xff\xfe42";
        assert_eq!(decode_line(raw, DecodePolicy::Ignore), "temp 42");
        assert_eq!(
            decode_line(raw, DecodePolicy::Replace),
            "temp \u{FFFD}\u{FFFD}42"
        );
    }

    #[test]
    fn stale_fragments_are_discarded() {
        let mut assembler =
            LineAssembler::with_stale_after(DecodePolicy::Replace, Duration::from_millis(100));
        let start = Instant::now();

        assembler.push(b"garbage with no newl", start);
        assert_eq!(assembler.discard_stale(start + Duration::from_millis(50)), None);
        assert_eq!(
            assembler.discard_stale(start + Duration::from_millis(100)),
            Some(20)
        );
        assert_eq!(assembler.pending_len(), 0);

        // The tail of the dropped line is skipped, the next line is kept
        let later = start + Duration::from_millis(200);
        assert!(assembler.push(b"ine but", later).is_empty());
        assert_eq!(assembler.push(b" late\nfresh\n", later), vec!["fresh"]);
        assert_eq!(assembler.discard_stale(later + Duration::from_secs(1)), None);
    }

    #[test]
    fn oversized_fragments_are_dropped() {
        let mut assembler = LineAssembler::new(DecodePolicy::Replace);
        let now = Instant::now();

        let flood = vec![b'x'; MAX_PENDING_LINE + 1];
        assert!(assembler.push(&flood, now).is_empty());
        assert_eq!(assembler.pending_len(), 0);

        assert_eq!(assembler.push(b"xxx\nok\n", now), vec!["ok"]);
    }
}
