pub mod mp3;

pub use mp3::{open_mp3_file, Mp3FileSession, SymphoniaFrameEngine};
