pub mod buffer;
pub mod decoders;
pub mod gapless;
pub mod mpeg;
pub mod position;
pub mod session;
pub mod source;

#[cfg(test)]
pub mod tests;

use std::time::Duration;
use crate::error::SeekError;

// Re-export the decoding session and its collaborators
pub use session::DecoderSession;
pub use source::{ByteSource, FileSource, MemorySource, ReaderSource};
pub use mpeg::{FrameDecodeEngine, FrameOutcome, FrameSamples, VbrInfo};

// Re-export the production engine
pub use decoders::{open_mp3_file, Mp3FileSession, SymphoniaFrameEngine};

// Re-export staging and trimming
pub use buffer::{InputBuffer, StagingBuffer};
pub use gapless::GaplessTrimmer;
pub use position::{SeekStrategy, SeekTable};

// Re-export models for convenience
pub use crate::models::{AudioBuffer, Format, SeekMode, StreamInfo};

/// Pull-based PCM producer as seen by a playback host
pub trait PcmDecoder {
    /// Decode up to `max_samples` samples per channel, interleaved; `None` at end of stream
    fn decode_next(&mut self, max_samples: usize) -> Option<AudioBuffer>;

    /// Seek to a playback time, returning where decoding will resume
    fn seek(&mut self, position: Duration) -> Result<Duration, SeekError>;

    fn format(&self) -> Format;

    /// Get the total duration of the stream
    fn duration(&self) -> Duration;

    fn position(&self) -> Duration;
}
