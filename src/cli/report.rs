use std::path::Path;
use std::time::Duration;

use crate::config::DecoderConfig;
use crate::error::{DecoderError, StreamEnd};
use crate::models::StreamInfo;

/// Outcome of decoding a stream to the end
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeSummary {
    pub start_sample: u64,
    pub samples: u64,
    pub peak: f32,
    pub end: Option<StreamEnd>,
    pub desyncs: u64,
    pub tags_skipped: u64,
}

/// Report formatter for the CLI
pub struct ReportDisplay;

impl ReportDisplay {
    pub fn display_stream_info(path: &Path, info: &StreamInfo) {
        println!("┌─ Stream ────────────────────────────────────────────────┐");
        println!("│ File: {}", Self::truncate(&path.display().to_string(), 50));
        println!(
            "│ Format: {} Hz, {} ({}), {} kbps",
            info.format.sample_rate,
            info.format.channels,
            Self::channel_description(info.format.channels),
            info.bitrate_kbps
        );
        println!("│ Samples per frame: {}", info.format.samples_per_frame);
        println!(
            "│ Length: {} samples ({}), {}",
            info.total_samples,
            if info.exact_length { "exact" } else { "estimated" },
            Self::format_duration(Duration::from_secs_f64(info.duration_secs))
        );
        println!("│ Audio starts at byte {}", info.stream_start);
        println!("│ Seek mode: {}", info.seek_mode.as_str());
        println!("│");
        println!("│ ┌─ Encoder Headers ───────────────────────────────────┐");
        println!("│ │ Extended header: {}", Self::yes_no(info.extended_header));
        if let Some(frames) = info.declared_frames {
            println!("│ │ Declared frames: {}", frames);
        }
        println!("│ │ Seek table: {}", Self::yes_no(info.has_seek_table));
        println!("│ │ Gapless header: {}", Self::yes_no(info.gapless_header));
        if info.gapless_header {
            println!("│ │ Encoder delay: {} samples", info.encoder_delay);
            println!("│ │ Encoder padding: {} samples", info.encoder_padding);
        }
        println!("│ └─────────────────────────────────────────────────────┘");
        println!("└─────────────────────────────────────────────────────────┘");
    }

    pub fn stream_info_json(info: &StreamInfo) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(info)
    }

    pub fn display_decode_summary(summary: &DecodeSummary, sample_rate: u32) {
        let duration = if sample_rate > 0 {
            Duration::from_secs_f64(summary.samples as f64 / sample_rate as f64)
        } else {
            Duration::ZERO
        };

        println!("Decoded {} samples ({}) from sample {}", summary.samples, Self::format_duration(duration), summary.start_sample);
        println!("Peak level: {:.1} dBFS", Self::to_dbfs(summary.peak));
        if summary.desyncs > 0 || summary.tags_skipped > 0 {
            println!("Resynchronized {} times, skipped {} tags", summary.desyncs, summary.tags_skipped);
        }
        match &summary.end {
            Some(StreamEnd::EndOfStream) | None => println!("Ended: {}", StreamEnd::EndOfStream),
            Some(reason @ StreamEnd::Failed(_)) => println!("Ended early: {}", reason),
        }
    }

    /// Print one line per sample instant, channels side by side
    pub fn display_samples(first_sample: u64, channels: &[Vec<f32>]) {
        let count = channels.iter().map(|ch| ch.len()).min().unwrap_or(0);
        for i in 0..count {
            let values: Vec<String> = channels.iter().map(|ch| format!("{:+.6}", ch[i])).collect();
            println!("{:>10}  {}", first_sample + i as u64, values.join("  "));
        }
    }

    pub fn display_config(config: &DecoderConfig, path: &Path) {
        println!("Configuration ({})", path.display());
        println!("  input_buffer_size      = {}", config.input_buffer_size);
        println!("  forward_scan           = {}", config.forward_scan);
        println!("  max_consecutive_errors = {}", config.max_consecutive_errors);
        println!("  log_level              = {}", config.log_level);
    }

    /// Display error with suggestions
    pub fn display_error(error: &DecoderError) {
        eprintln!("❌ [{}] {}", error.severity().as_str(), error.user_message());

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!();
            eprintln!("Suggestions:");
            for suggestion in suggestions {
                eprintln!("  • {}", suggestion);
            }
        }

        if !error.is_recoverable() {
            eprintln!();
            eprintln!("⚠  This error requires manual intervention to resolve.");
        }
    }

    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let millis = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
        }
    }

    pub fn channel_description(channels: u16) -> &'static str {
        match channels {
            1 => "Mono",
            2 => "Stereo",
            _ => "Multi-channel",
        }
    }

    pub fn to_dbfs(peak: f32) -> f32 {
        if peak <= 0.0 {
            f32::NEG_INFINITY
        } else {
            20.0 * peak.log10()
        }
    }

    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    fn yes_no(value: bool) -> &'static str {
        if value {
            "yes"
        } else {
            "no"
        }
    }
}
