use thiserror::Error;

/// Top-level error type for the decoder library and CLI
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Open error: {0}")]
    Open(#[from] OpenError),

    #[error("Seek error: {0}")]
    Seek(#[from] SeekError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),
}

impl DecoderError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            DecoderError::Open(err) => err.user_message(),
            DecoderError::Seek(err) => err.user_message(),
            DecoderError::Config(err) => err.user_message(),
            DecoderError::File(err) => Self::format_file_error(err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            DecoderError::Open(err) => err.recovery_suggestions(),
            DecoderError::Seek(err) => err.recovery_suggestions(),
            DecoderError::Config(err) => err.recovery_suggestions(),
            DecoderError::File(_) => vec![
                "Check that the file path is correct".to_string(),
                "Check file permissions".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            DecoderError::Open(err) => err.is_recoverable(),
            DecoderError::Seek(err) => err.is_recoverable(),
            DecoderError::Config(err) => err.is_recoverable(),
            DecoderError::File(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DecoderError::Open(OpenError::Io(_)) => ErrorSeverity::Error,
            DecoderError::Open(_) => ErrorSeverity::Critical,
            DecoderError::Seek(SeekError::OutOfRange { .. }) => ErrorSeverity::Info,
            DecoderError::Seek(_) => ErrorSeverity::Warning,
            DecoderError::Config(_) => ErrorSeverity::Warning,
            DecoderError::File(_) => ErrorSeverity::Error,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied - cannot access file".to_string(),
            std::io::ErrorKind::UnexpectedEof => "File appears to be truncated".to_string(),
            _ => format!("File system error: {}", err),
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Errors that prevent a decoder session from opening
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No decodable frame: {0}")]
    NoValidFrame(String),

    #[error("Frame decoder initialization failed: {0}")]
    EngineInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OpenError {
    pub fn user_message(&self) -> String {
        match self {
            OpenError::Io(err) => format!("Cannot read the audio stream: {}", err),
            OpenError::NoValidFrame(msg) => {
                format!("The stream does not contain any playable MPEG audio: {}", msg)
            }
            OpenError::EngineInit(msg) => format!("Failed to set up the MPEG audio decoder: {}", msg),
            OpenError::InvalidConfig(msg) => format!("Decoder settings are not usable: {}", msg),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            OpenError::Io(_) => vec![
                "Check that the file is readable and completely downloaded".to_string(),
            ],
            OpenError::NoValidFrame(_) => vec![
                "Check that the file really is an MP1/MP2/MP3 stream".to_string(),
                "Try re-encoding the file".to_string(),
            ],
            OpenError::EngineInit(_) => vec!["Try the operation again".to_string()],
            OpenError::InvalidConfig(_) => vec![
                "Reset the configuration with 'gadec config reset'".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            OpenError::Io(_) => true,
            OpenError::NoValidFrame(_) => false,
            OpenError::EngineInit(_) => false,
            OpenError::InvalidConfig(_) => true,
        }
    }
}

/// Seek failures
#[derive(Debug, Error)]
pub enum SeekError {
    #[error("Seek target {target} outside stream of {total} samples")]
    OutOfRange { target: u64, total: u64 },

    #[error("Session is closed")]
    Closed,

    #[error("Byte source does not support seeking")]
    Unsupported,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeekError {
    pub fn user_message(&self) -> String {
        match self {
            SeekError::OutOfRange { target, total } => {
                format!("Cannot seek to sample {} - the stream only has {} samples", target, total)
            }
            SeekError::Closed => "The decoder has already been closed".to_string(),
            SeekError::Unsupported => "This stream cannot be repositioned".to_string(),
            SeekError::Io(err) => format!("Seeking failed while reading the stream: {}", err),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            SeekError::OutOfRange { total, .. } => vec![
                format!("Use a sample position between 0 and {}", total.saturating_sub(1)),
            ],
            SeekError::Closed => vec!["Open the stream again".to_string()],
            SeekError::Unsupported => vec![
                "Decode from the beginning instead of seeking".to_string(),
            ],
            SeekError::Io(_) => vec!["Try the seek again".to_string()],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            SeekError::OutOfRange { .. } => true,
            SeekError::Closed => false,
            SeekError::Unsupported => false,
            SeekError::Io(_) => true,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/gapless-decoder/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Try resetting configuration to defaults".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Why a stream stopped producing samples.
///
/// Read never fails; this side channel keeps a clean end distinguishable from
/// a terminal decode or I/O failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    EndOfStream,
    Failed(String),
}

impl StreamEnd {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamEnd::Failed(_))
    }
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::EndOfStream => write!(f, "end of stream"),
            StreamEnd::Failed(reason) => write!(f, "stream error: {}", reason),
        }
    }
}
