use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;

/// Environment variable selecting the log level for the `gadec` binary
pub const LOG_LEVEL_ENV: &str = "GADEC_LOG_LEVEL";

/// Decode event recorded by a session
#[derive(Debug, Clone)]
pub struct DecodeEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: DecodeEventType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEventType {
    SessionOpened,
    HeaderParsed,
    ForwardScan,
    LengthEstimated,
    Seek,
    TagSkipped,
    StreamDesync,
    StreamError,
    EndOfStream,
    SessionClosed,
}

impl DecodeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeEventType::SessionOpened => "SESSION_OPENED",
            DecodeEventType::HeaderParsed => "HEADER_PARSED",
            DecodeEventType::ForwardScan => "FORWARD_SCAN",
            DecodeEventType::LengthEstimated => "LENGTH_ESTIMATED",
            DecodeEventType::Seek => "SEEK",
            DecodeEventType::TagSkipped => "TAG_SKIPPED",
            DecodeEventType::StreamDesync => "STREAM_DESYNC",
            DecodeEventType::StreamError => "STREAM_ERROR",
            DecodeEventType::EndOfStream => "END_OF_STREAM",
            DecodeEventType::SessionClosed => "SESSION_CLOSED",
        }
    }
}

/// Bounded per-session event history, mirrored to the `log` facade
#[derive(Debug, Clone)]
pub struct DecodeLogger {
    events: VecDeque<DecodeEvent>,
    max_events: usize,
}

impl DecodeLogger {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events: max_events.max(1),
        }
    }

    /// Initialize logging system with appropriate log level
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        Self::init_with_level(&log_level)
    }

    pub fn init_with_level(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        builder.filter_level(parse_level(log_level));
        builder.try_init()?;

        info!("Decoder logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Record an event and forward it to the standard logger
    pub fn log_event(&mut self, event_type: DecodeEventType, details: String) {
        match event_type {
            DecodeEventType::SessionOpened | DecodeEventType::SessionClosed => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            DecodeEventType::HeaderParsed
            | DecodeEventType::ForwardScan
            | DecodeEventType::LengthEstimated
            | DecodeEventType::Seek
            | DecodeEventType::EndOfStream => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            DecodeEventType::TagSkipped | DecodeEventType::StreamDesync => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            DecodeEventType::StreamError => {
                error!("[{}] {}", event_type.as_str(), details);
            }
        }

        self.events.push_back(DecodeEvent {
            timestamp: Utc::now(),
            event_type,
            details,
        });
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &DecodeEvent> {
        self.events.iter()
    }

    pub fn count(&self, event_type: DecodeEventType) -> usize {
        self.events.iter().filter(|e| e.event_type == event_type).count()
    }

    pub fn last(&self, event_type: DecodeEventType) -> Option<&DecodeEvent> {
        self.events.iter().rev().find(|e| e.event_type == event_type)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for DecodeLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}
