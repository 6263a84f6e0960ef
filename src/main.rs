use gapless_audio_decoder::audio::{open_mp3_file, Mp3FileSession};
use gapless_audio_decoder::cli::report::DecodeSummary;
use gapless_audio_decoder::cli::{CliApp, Commands, ConfigAction, Position, ReportDisplay};
use gapless_audio_decoder::config::{ConfigManager, MIN_INPUT_BUFFER_SIZE};
use gapless_audio_decoder::error::DecoderError;
use gapless_audio_decoder::logging::{DecodeLogger, LOG_LEVEL_ENV};
use log::{error, info, warn};
use std::path::Path;

/// Main application controller: owns the configuration and runs one command
pub struct AppController {
    config_manager: ConfigManager,
}

impl AppController {
    pub fn new() -> Result<Self, DecoderError> {
        let config_manager = ConfigManager::new()?;

        // Environment overrides the configured level
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .unwrap_or_else(|_| config_manager.get_config().log_level.clone());
        if let Err(e) = DecodeLogger::init_with_level(&log_level) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        info!("Configuration loaded from {}", config_manager.config_path().display());
        Ok(Self { config_manager })
    }

    pub fn execute_command(&mut self, command: Commands) -> Result<(), DecoderError> {
        match command {
            Commands::Info { path, json } => {
                let session = self.open(&path)?;
                let info = session.stream_info();
                if json {
                    match ReportDisplay::stream_info_json(&info) {
                        Ok(text) => println!("{}", text),
                        Err(e) => {
                            warn!("JSON report failed, falling back to text: {}", e);
                            ReportDisplay::display_stream_info(&path, &info);
                        }
                    }
                } else {
                    ReportDisplay::display_stream_info(&path, &info);
                }
            }
            Commands::Decode { path, start, chunk } => {
                let mut session = self.open(&path)?;
                let start_sample = match start {
                    Some(position) => self.seek(&mut session, position)?,
                    None => 0,
                };

                let summary = Self::decode_to_end(&mut session, start_sample, chunk as usize);
                ReportDisplay::display_decode_summary(&summary, session.format().sample_rate);
                session.close();
            }
            Commands::Seek { path, position, show } => {
                let mut session = self.open(&path)?;
                let landed = self.seek(&mut session, position)?;

                println!(
                    "Positioned at sample {} of {} ({} seek, byte {})",
                    landed,
                    session.total_samples(),
                    session.seek_strategy().mode().as_str(),
                    session.last_seek_offset().unwrap_or(0)
                );

                let channels = Self::read_planar(&mut session, show);
                ReportDisplay::display_samples(landed, &channels);
                session.close();
            }
            Commands::Config { action } => match action {
                ConfigAction::Show => {
                    ReportDisplay::display_config(
                        self.config_manager.get_config(),
                        self.config_manager.config_path(),
                    );
                }
                ConfigAction::Reset => {
                    self.config_manager.reset_to_defaults()?;
                    println!("OK: Configuration reset to defaults");
                }
                ConfigAction::Buffer { bytes } => {
                    if bytes < MIN_INPUT_BUFFER_SIZE {
                        warn!("Input buffer of {} bytes raised to {}", bytes, MIN_INPUT_BUFFER_SIZE);
                    }
                    self.config_manager.set_input_buffer_size(bytes)?;
                    println!(
                        "OK: Input buffer {} bytes",
                        self.config_manager.get_config().input_buffer_size
                    );
                }
                ConfigAction::Scan { enabled } => {
                    self.config_manager.set_forward_scan(enabled)?;
                    println!("OK: Forward scan {}", if enabled { "on" } else { "off" });
                }
            },
        }

        Ok(())
    }

    fn open(&self, path: &Path) -> Result<Mp3FileSession, DecoderError> {
        let session = open_mp3_file(path, self.config_manager.get_config())?;
        info!(
            "Opened {}: {} samples at {} Hz",
            path.display(),
            session.total_samples(),
            session.format().sample_rate
        );
        Ok(session)
    }

    fn seek(&self, session: &mut Mp3FileSession, position: Position) -> Result<u64, DecoderError> {
        let target = position.to_sample(session.format().sample_rate);
        Ok(session.seek_to_sample(target)?)
    }

    fn decode_to_end(session: &mut Mp3FileSession, start_sample: u64, chunk: usize) -> DecodeSummary {
        let channels = session.format().channels.max(1) as usize;
        let mut buffers = vec![vec![0.0f32; chunk]; channels];
        let mut samples = 0u64;
        let mut peak = 0.0f32;

        loop {
            let n = {
                let mut out: Vec<&mut [f32]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
                session.read(&mut out, chunk)
            };
            if n == 0 {
                break;
            }
            for buffer in &buffers {
                peak = buffer[..n].iter().fold(peak, |p, s| p.max(s.abs()));
            }
            samples += n as u64;
        }

        let stats = session.resync_statistics();
        DecodeSummary {
            start_sample,
            samples,
            peak,
            end: session.end_reason().cloned(),
            desyncs: stats.total_recoveries.saturating_sub(stats.tags_skipped),
            tags_skipped: stats.tags_skipped,
        }
    }

    fn read_planar(session: &mut Mp3FileSession, count: usize) -> Vec<Vec<f32>> {
        let channels = session.format().channels.max(1) as usize;
        let mut buffers = vec![vec![0.0f32; count]; channels];
        let mut filled = 0;

        while filled < count {
            let n = {
                let mut out: Vec<&mut [f32]> =
                    buffers.iter_mut().map(|b| &mut b[filled..]).collect();
                session.read(&mut out, count - filled)
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        for buffer in &mut buffers {
            buffer.truncate(filled);
        }
        buffers
    }
}

fn main() {
    let cli = CliApp::parse();

    let mut app = match AppController::new() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            ReportDisplay::display_error(&e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.execute_command(cli.command) {
        error!("Command failed: {}", e);
        ReportDisplay::display_error(&e);
        std::process::exit(1);
    }

    info!("Application shutdown complete");
}
