//! Recovery from corrupted or misaligned byte streams.
//!
//! After a header CRC-8 failure the declared `payload_size` is untrustworthy,
//! so the stream is never skipped by length. Instead the scanner walks
//! forward to the next preamble and accepts it only once a full header at
//! that offset passes its CRC-8.
//!
//! ```text
//!  Synced --crc-8 failure--> Searching --preamble--> CandidateFound
//!     ^                          ^                        |
//!     |                          +------ bad crc-8 --- Validating
//!     +-------------------- good crc-8 -------------------+
//! ```

use crate::header::{HEADER_SIZE, PREAMBLE_BYTES};
use crate::integrity::IntegrityEngine;
use crate::FrameCodec;

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Aligned on a frame boundary; normal parsing applies.
    Synced,
    /// Looking for the next preamble.
    Searching,
    /// A preamble sits at the start of the buffer; waiting for a full header.
    CandidateFound,
    /// Checking the candidate header's CRC-8.
    Validating,
}

/// Outcome of one [`Resynchronizer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// A validated header starts after `discard` bytes.
    Aligned { discard: usize },
    /// Drop `discard` bytes and call again once more input arrived.
    NeedMore { discard: usize },
}

impl SyncStep {
    /// Bytes the caller must drop from the front of its buffer.
    pub fn discard(self) -> usize {
        match self {
            SyncStep::Aligned { discard } | SyncStep::NeedMore { discard } => discard,
        }
    }
}

/// Resynchronization counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Times sync was lost.
    pub sync_losses: u64,
    /// Times a new frame boundary was recovered.
    pub resyncs: u64,
    /// Bytes dropped while searching.
    pub bytes_discarded: u64,
}

/// Preamble scanner for stream consumers.
///
/// Offsets are relative to the caller's buffer; the caller drops the
/// returned `discard` prefix after each poll.
#[derive(Debug, Clone)]
pub struct Resynchronizer {
    state: SyncState,
    // First offset not yet ruled out as a frame start.
    cursor: usize,
    stats: SyncStats,
}

impl Default for Resynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Resynchronizer {
    /// Start in [`SyncState::Synced`]: a stream is assumed to open on a boundary.
    pub fn new() -> Self {
        Self {
            state: SyncState::Synced,
            cursor: 0,
            stats: SyncStats::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Record that the frame at offset 0 failed validation.
    ///
    /// Scanning restarts at offset 1 so the rejected candidate is not retried.
    pub fn lose_sync(&mut self) {
        if self.is_synced() {
            self.stats.sync_losses += 1;
        }
        self.state = SyncState::Searching;
        self.cursor = 1;
    }

    /// Advance the state machine over `buf`.
    pub fn poll<E: IntegrityEngine>(&mut self, buf: &[u8], codec: &FrameCodec<'_, E>) -> SyncStep {
        let mut pos = self.cursor;
        loop {
            match self.state {
                SyncState::Synced => {
                    self.cursor = 0;
                    return SyncStep::Aligned { discard: 0 };
                }
                SyncState::Searching => match find_preamble(buf.get(pos..).unwrap_or(&[])) {
                    Some(offset) => {
                        pos += offset;
                        self.state = SyncState::CandidateFound;
                    }
                    None => {
                        // Keep a tail that may hold the start of a split preamble.
                        let keep = PREAMBLE_BYTES.len() - 1;
                        let discard = buf.len().saturating_sub(keep).max(pos).min(buf.len());
                        return self.need_more(discard);
                    }
                },
                SyncState::CandidateFound => {
                    if buf.len() - pos < HEADER_SIZE {
                        return self.need_more(pos);
                    }
                    self.state = SyncState::Validating;
                }
                SyncState::Validating => {
                    if codec.header_crc_matches(&buf[pos..]) {
                        self.state = SyncState::Synced;
                        self.stats.resyncs += 1;
                        self.cursor = 0;
                        self.stats.bytes_discarded += pos as u64;
                        tracing::info!(discarded = pos, "stream resynchronized");
                        return SyncStep::Aligned { discard: pos };
                    }
                    tracing::trace!(offset = pos, "preamble candidate failed CRC-8");
                    self.state = SyncState::Searching;
                    pos += 1;
                }
            }
        }
    }

    fn need_more(&mut self, discard: usize) -> SyncStep {
        self.cursor = 0;
        self.stats.bytes_discarded += discard as u64;
        SyncStep::NeedMore { discard }
    }
}

/// Offset of the first complete preamble in `buf`.
pub fn find_preamble(buf: &[u8]) -> Option<usize> {
    buf.windows(PREAMBLE_BYTES.len())
        .position(|window| window == PREAMBLE_BYTES)
}
