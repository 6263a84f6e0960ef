use crate::audio::mpeg::{VbrInfo, SEEK_TABLE_LEN};
use crate::error::SeekError;
use crate::models::SeekMode;

/// Percentile to byte-offset table from the extended header.
///
/// Entry `i` is the byte position, on a 0..=255 scale, at which `i` percent
/// of the playback time has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekTable {
    entries: [u8; SEEK_TABLE_LEN],
}

impl SeekTable {
    /// Entries are made non-decreasing so that later targets never map to
    /// earlier bytes, even for a damaged table.
    pub fn new(mut entries: [u8; SEEK_TABLE_LEN]) -> Self {
        for i in 1..SEEK_TABLE_LEN {
            entries[i] = entries[i].max(entries[i - 1]);
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[u8; SEEK_TABLE_LEN] {
        &self.entries
    }

    /// Fraction of the compressed stream (0.0..=1.0) where playback
    /// `fraction` (0.0..=1.0) begins, interpolated between bracketing entries.
    pub fn byte_fraction(&self, fraction: f64) -> f64 {
        let percent = (fraction * 100.0).clamp(0.0, 100.0);
        let index = (percent.floor() as usize).min(SEEK_TABLE_LEN - 1);

        let fa = self.entries[index] as f64;
        let fb = if index + 1 < SEEK_TABLE_LEN {
            self.entries[index + 1] as f64
        } else {
            256.0
        };

        let fx = fa + (fb - fa) * (percent - index as f64);
        (fx / 256.0).clamp(0.0, 1.0)
    }
}

/// How a session repositions, fixed when the stream is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekStrategy {
    /// Jump to an estimated byte offset and report the requested sample
    Interpolated { toc: Option<SeekTable> },
    /// Decode forward from a known point until the exact sample is reached
    Accurate,
}

impl SeekStrategy {
    /// Accurate seeking needs the gapless header; everything else interpolates
    pub fn for_stream(info: &VbrInfo) -> Self {
        if info.found_gapless_header {
            SeekStrategy::Accurate
        } else {
            SeekStrategy::Interpolated {
                toc: info.seek_table.map(SeekTable::new),
            }
        }
    }

    pub fn mode(&self) -> SeekMode {
        match self {
            SeekStrategy::Interpolated { .. } => SeekMode::Interpolated,
            SeekStrategy::Accurate => SeekMode::Accurate,
        }
    }

    pub fn has_seek_table(&self) -> bool {
        matches!(self, SeekStrategy::Interpolated { toc: Some(_) })
    }
}

/// Byte offset for an interpolated seek to `target` of `total` samples in
/// audio data spanning `stream_start..stream_end`. Without a table the offset
/// is proportional.
pub fn interpolate_offset(
    toc: Option<&SeekTable>,
    target: u64,
    total: u64,
    stream_start: u64,
    stream_end: u64,
) -> u64 {
    if total == 0 || stream_end <= stream_start {
        return stream_start;
    }

    let fraction = target as f64 / total as f64;
    let byte_fraction = match toc {
        Some(table) => table.byte_fraction(fraction),
        None => fraction.clamp(0.0, 1.0),
    };

    let span = stream_end - stream_start;
    stream_start + ((byte_fraction * span as f64) as u64).min(span)
}

/// Reject targets outside `[0, total)` before anything moves
pub fn validate_target(target: u64, total: u64) -> Result<(), SeekError> {
    if target >= total {
        return Err(SeekError::OutOfRange { target, total });
    }
    Ok(())
}
