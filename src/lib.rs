pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;


pub use audio::{open_mp3_file, DecoderSession, PcmDecoder};
pub use error::*;
pub use models::*;
