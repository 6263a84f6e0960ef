use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub mod report;
pub use report::ReportDisplay;

/// Gapless MPEG audio decoder CLI
#[derive(Debug, Parser)]
#[command(name = "gadec")]
#[command(about = "Sample-exact MPEG audio decoding with encoder delay and padding removed")]
#[command(version = "0.1.0")]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show format, length and gapless information for a file
    Info {
        /// MPEG audio file
        #[arg(value_parser = CliApp::parse_path)]
        path: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a file to the end and summarise the output
    Decode {
        #[arg(value_parser = CliApp::parse_path)]
        path: PathBuf,
        /// Start decoding at this sample (or time, e.g. "1:30", "90s")
        #[arg(long, value_parser = CliApp::parse_position)]
        start: Option<Position>,
        /// Samples per channel requested per read
        #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u32).range(1..))]
        chunk: u32,
    },
    /// Seek and print the first samples after the reported position
    Seek {
        #[arg(value_parser = CliApp::parse_path)]
        path: PathBuf,
        /// Target sample (or time, e.g. "1:30", "90s")
        #[arg(value_parser = CliApp::parse_position)]
        position: Position,
        /// Samples per channel to print after seeking
        #[arg(long, default_value_t = 8)]
        show: usize,
    },
    /// Decoder configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Restore default settings
    Reset,
    /// Set the compressed input buffer size in bytes
    Buffer {
        bytes: usize,
    },
    /// Enable or disable the forward length scan
    Scan {
        #[arg(value_parser = CliApp::parse_switch, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// Seek or start target given either as a sample index or a playback time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Sample(u64),
    Time(Duration),
}

impl Position {
    /// Sample index at `sample_rate`
    pub fn to_sample(&self, sample_rate: u32) -> u64 {
        match self {
            Position::Sample(sample) => *sample,
            Position::Time(time) => (time.as_secs_f64() * sample_rate as f64) as u64,
        }
    }
}

impl CliApp {
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home_dir) => home_dir.join(rest),
                None => PathBuf::from(path),
            }
        } else if path == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }

    fn parse_path(input: &str) -> Result<PathBuf, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::MissingArgument {
                command: "file".to_string(),
                argument: "path".to_string(),
            });
        }
        Ok(Self::expand_path(input))
    }

    /// "on"/"off" style switches
    pub fn parse_switch(input: &str) -> Result<bool, ParseError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(ParseError::InvalidArgument {
                argument: "switch".to_string(),
                value: input.to_string(),
                expected: "on or off".to_string(),
            }),
        }
    }

    /// A bare integer is a sample index; anything with ':' or an 's' suffix is a time
    pub fn parse_position(input: &str) -> Result<Position, ParseError> {
        let trimmed = input.trim();
        if let Ok(sample) = trimmed.parse::<u64>() {
            return Ok(Position::Sample(sample));
        }
        Self::parse_time(trimmed).map(Position::Time)
    }

    /// Parse time string to Duration ("1:30", "90s", "1:30.5")
    pub fn parse_time(time_str: &str) -> Result<Duration, ParseError> {
        let trimmed = time_str.trim();
        let invalid = || ParseError::InvalidTimeFormat {
            input: time_str.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        if trimmed.contains(':') {
            let parts: Vec<&str> = trimmed.split(':').collect();
            if parts.len() != 2 {
                return Err(invalid());
            }

            let minutes: u64 = parts[0].parse().map_err(|_| invalid())?;
            let seconds: f64 = parts[1].parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }

            Ok(Duration::from_secs_f64(minutes as f64 * 60.0 + seconds))
        } else {
            let seconds_str = trimmed.strip_suffix('s').ok_or_else(invalid)?;
            let seconds: f64 = seconds_str.parse().map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }

            Ok(Duration::from_secs_f64(seconds))
        }
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },
}
