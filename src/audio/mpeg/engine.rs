//! Frame-level decode primitive the session drives.

use super::header::{FrameHeader, HEADER_LEN, MAX_SAMPLES_PER_FRAME};
use super::resync::starts_with_tag;
use std::ops::Range;

/// Most channels any MPEG audio frame decodes to
pub const MAX_CHANNELS: usize = 2;

/// Per-channel scratch block one compressed frame decodes into.
/// Allocated once per session and reused for every frame.
#[derive(Debug, Clone)]
pub struct FrameSamples {
    channels: Vec<Vec<f32>>,
}

impl FrameSamples {
    pub fn new() -> Self {
        Self {
            channels: vec![vec![0.0; MAX_SAMPLES_PER_FRAME]; MAX_CHANNELS],
        }
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.channels[ch]
    }
}

impl Default for FrameSamples {
    fn default() -> Self {
        Self::new()
    }
}

/// One successfully decoded compressed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    /// Input bytes the frame occupied, leading garbage included
    pub consumed: usize,
    /// Samples per channel written to the scratch block
    pub samples: usize,
    /// Ancillary (side-channel) byte range within the input slice
    pub ancillary: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Decoded(DecodedFrame),
    /// Not enough buffered bytes for a whole frame; refill and retry
    NeedMoreInput,
    /// Bitstream error the caller can step over. `at` is the offset within the
    /// input where the bad data starts and `skip` the bytes the engine
    /// suggests dropping.
    Recoverable {
        at: usize,
        skip: usize,
        reason: String,
    },
    Unrecoverable(String),
    EndOfStream,
}

/// Decodes one compressed frame at a time from the front of a byte slice
pub trait FrameDecodeEngine {
    /// Decode the first frame found in `input`. `at_eof` tells the engine no
    /// more bytes will follow, so a short tail is end of stream rather than a
    /// request for more input.
    fn decode_frame(&mut self, input: &[u8], at_eof: bool, out: &mut FrameSamples) -> FrameOutcome;

    /// Drop inter-frame state after the byte position moved
    fn reset(&mut self);
}

impl<E: FrameDecodeEngine + ?Sized> FrameDecodeEngine for Box<E> {
    fn decode_frame(&mut self, input: &[u8], at_eof: bool, out: &mut FrameSamples) -> FrameOutcome {
        (**self).decode_frame(input, at_eof, out)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Frame boundary detection shared by engines: locate the next header and
/// check that the whole frame is buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSlice {
    /// A whole frame starts at the front of the input
    Frame(FrameHeader),
    NeedMoreInput,
    /// No header at the front of the input; `skip` bytes of garbage precede the
    /// next candidate
    Desync { skip: usize },
    EndOfStream,
}

/// Find the next whole frame in `input`
pub fn slice_frame(input: &[u8], at_eof: bool) -> FrameSlice {
    if input.len() < HEADER_LEN {
        return if at_eof {
            FrameSlice::EndOfStream
        } else {
            FrameSlice::NeedMoreInput
        };
    }

    match FrameHeader::parse(input) {
        Some(header) => {
            let len = header.frame_len();
            if input.len() >= len {
                FrameSlice::Frame(header)
            } else if at_eof {
                FrameSlice::EndOfStream
            } else {
                FrameSlice::NeedMoreInput
            }
        }
        None => match super::header::find_sync(input) {
            Some(skip) => FrameSlice::Desync { skip },
            // Keep the last few bytes: a header may straddle the refill
            None if at_eof => FrameSlice::EndOfStream,
            None => FrameSlice::Desync {
                skip: input.len() - (HEADER_LEN - 1),
            },
        },
    }
}

/// Verdict on a header candidate at the front of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCheck {
    /// Hand the input to the engine
    Accept,
    /// The successor header is not buffered yet
    NeedMoreInput,
    /// Header-shaped bytes that do not start a frame of this stream
    Reject(&'static str),
}

/// Vet the header at the front of `input` before trusting it after a loss of
/// sync.
///
/// The candidate must be compatible with `reference` when one is known, and
/// the bytes at its frame length must open a compatible header or an embedded
/// tag. The last frame of the stream has no successor and is accepted at eof.
/// Input that does not start with a header is accepted and left to the engine.
pub fn confirm_sync(input: &[u8], at_eof: bool, reference: Option<&FrameHeader>) -> SyncCheck {
    let header = match FrameHeader::parse(input) {
        Some(header) => header,
        None => return SyncCheck::Accept,
    };
    if reference.map_or(false, |r| !r.is_compatible(&header)) {
        return SyncCheck::Reject("frame header incompatible with the stream");
    }

    let next = header.frame_len();
    if input.len() < next + HEADER_LEN {
        return if at_eof {
            SyncCheck::Accept
        } else {
            SyncCheck::NeedMoreInput
        };
    }

    let following = &input[next..];
    if starts_with_tag(following) {
        return SyncCheck::Accept;
    }
    match FrameHeader::parse(following) {
        Some(successor) if header.is_compatible(&successor) => SyncCheck::Accept,
        _ => SyncCheck::Reject("frame header not followed by another frame"),
    }
}
