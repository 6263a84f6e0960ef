use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stream format, fixed by the first decoded compressed frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Format {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples_per_frame: u32,
}

impl Format {
    /// Convert a sample count into playback time
    pub fn samples_to_duration(&self, samples: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }

    /// Convert playback time into the nearest preceding sample index
    pub fn duration_to_samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.sample_rate as f64) as u64
    }
}

/// Audio buffer containing interleaved f32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: usize,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let frames = if channels > 0 {
            samples.len() / channels as usize
        } else {
            0
        };

        Self {
            samples,
            channels,
            sample_rate,
            frames,
        }
    }

    /// Get the duration of this buffer
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Largest absolute sample value in the buffer
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Seek strategy selected for a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeekMode {
    Interpolated,
    Accurate,
}

impl SeekMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeekMode::Interpolated => "interpolated",
            SeekMode::Accurate => "accurate",
        }
    }
}

/// Summary of an opened stream, suitable for reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamInfo {
    pub format: Format,
    pub total_samples: u64,
    pub exact_length: bool,
    pub duration_secs: f64,
    pub bitrate_kbps: u32,
    pub stream_start: u64,
    pub extended_header: bool,
    pub gapless_header: bool,
    pub has_seek_table: bool,
    pub declared_frames: Option<u32>,
    pub encoder_delay: u32,
    pub encoder_padding: u32,
    pub seek_mode: SeekMode,
}
