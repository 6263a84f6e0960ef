use std::path::Path;

use log::{debug, warn};
use symphonia::core::audio::{AudioBufferRef, Channels, Signal};
use symphonia::core::codecs::{
    CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_MP1, CODEC_TYPE_MP2,
    CODEC_TYPE_MP3,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;

use crate::audio::mpeg::{
    slice_frame, DecodedFrame, FrameDecodeEngine, FrameHeader, FrameOutcome, FrameSamples,
    FrameSlice, MpegLayer, MAX_CHANNELS,
};
use crate::audio::session::DecoderSession;
use crate::audio::source::FileSource;
use crate::config::DecoderConfig;
use crate::error::OpenError;

/// Session type returned by [`open_mp3_file`]
pub type Mp3FileSession = DecoderSession<FileSource, SymphoniaFrameEngine>;

/// Open an MPEG audio file with the symphonia-backed engine
pub fn open_mp3_file<P: AsRef<Path>>(path: P, config: &DecoderConfig) -> Result<Mp3FileSession, OpenError> {
    if symphonia::default::get_codecs().get_codec(CODEC_TYPE_MP3).is_none() {
        return Err(OpenError::EngineInit(
            "symphonia was built without MPEG audio support".to_string(),
        ));
    }

    let source = FileSource::open(&path)?;
    debug!("Opening {}", path.as_ref().display());
    DecoderSession::open(source, SymphoniaFrameEngine::new(), config.clone())
}

/// Frame decode engine feeding one compressed frame per packet to symphonia's
/// MPEG audio decoder
pub struct SymphoniaFrameEngine {
    decoder: Option<Box<dyn Decoder>>,
    layer: Option<MpegLayer>,
    timestamp: u64,
}

impl SymphoniaFrameEngine {
    pub fn new() -> Self {
        Self {
            decoder: None,
            layer: None,
            timestamp: 0,
        }
    }

    fn codec_for(layer: MpegLayer) -> CodecType {
        match layer {
            MpegLayer::Layer1 => CODEC_TYPE_MP1,
            MpegLayer::Layer2 => CODEC_TYPE_MP2,
            MpegLayer::Layer3 => CODEC_TYPE_MP3,
        }
    }

    /// Create (or re-create on a layer change) the codec for `header`
    fn ensure_decoder(&mut self, header: &FrameHeader) -> Result<&mut Box<dyn Decoder>, String> {
        if self.decoder.is_none() || self.layer != Some(header.layer) {
            let channels = if header.channels() == 1 {
                Channels::FRONT_LEFT
            } else {
                Channels::FRONT_LEFT | Channels::FRONT_RIGHT
            };

            let mut params = CodecParameters::new();
            params
                .for_codec(Self::codec_for(header.layer))
                .with_sample_rate(header.sample_rate)
                .with_channels(channels);

            let decoder = symphonia::default::get_codecs()
                .make(&params, &DecoderOptions::default())
                .map_err(|e| format!("Failed to create MPEG audio decoder: {}", e))?;

            self.decoder = Some(decoder);
            self.layer = Some(header.layer);
        }

        self.decoder
            .as_mut()
            .ok_or_else(|| "MPEG audio decoder unavailable".to_string())
    }

    /// Copy decoded planes into the scratch block as f32, returning samples per channel
    fn copy_planes(audio_buf: AudioBufferRef, out: &mut FrameSamples) -> Result<usize, String> {
        let frames = audio_buf.frames();
        let channels = audio_buf.spec().channels.count().min(MAX_CHANNELS);
        if frames > out.channel(0).len() {
            return Err(format!("decoder produced {} samples for one frame", frames));
        }

        for ch in 0..channels {
            let dest = &mut out.channel_mut(ch)[..frames];
            match &audio_buf {
                AudioBufferRef::F32(buf) => dest.copy_from_slice(&buf.chan(ch)[..frames]),
                AudioBufferRef::F64(buf) => {
                    for (d, &s) in dest.iter_mut().zip(buf.chan(ch)) {
                        *d = s as f32;
                    }
                }
                AudioBufferRef::S16(buf) => {
                    for (d, &s) in dest.iter_mut().zip(buf.chan(ch)) {
                        *d = s as f32 / 32768.0;
                    }
                }
                AudioBufferRef::S32(buf) => {
                    for (d, &s) in dest.iter_mut().zip(buf.chan(ch)) {
                        *d = s as f32 / 2147483648.0;
                    }
                }
                _ => return Err("unsupported decoded sample format".to_string()),
            }
        }

        Ok(frames)
    }
}

impl Default for SymphoniaFrameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecodeEngine for SymphoniaFrameEngine {
    fn decode_frame(&mut self, input: &[u8], at_eof: bool, out: &mut FrameSamples) -> FrameOutcome {
        let header = match slice_frame(input, at_eof) {
            FrameSlice::Frame(header) => header,
            FrameSlice::NeedMoreInput => return FrameOutcome::NeedMoreInput,
            FrameSlice::EndOfStream => return FrameOutcome::EndOfStream,
            FrameSlice::Desync { skip } => {
                return FrameOutcome::Recoverable {
                    at: 0,
                    skip,
                    reason: "lost frame sync".to_string(),
                }
            }
        };

        let len = header.frame_len();
        let duration = header.samples_per_frame() as u64;
        let packet = Packet::new_from_slice(0, self.timestamp, duration, &input[..len]);
        self.timestamp += duration;

        let decoder = match self.ensure_decoder(&header) {
            Ok(decoder) => decoder,
            Err(msg) => return FrameOutcome::Unrecoverable(msg),
        };

        let samples = match decoder.decode(&packet) {
            Ok(decoded) => match Self::copy_planes(decoded, out) {
                Ok(samples) => samples,
                Err(msg) => return FrameOutcome::Unrecoverable(msg),
            },
            Err(SymphoniaError::DecodeError(msg)) => {
                // A well-formed frame whose payload fails to decode still
                // occupies its samples; conceal it with silence.
                warn!("Frame decode error, concealing with silence: {}", msg);
                let samples = duration as usize;
                for ch in 0..header.channels() as usize {
                    out.channel_mut(ch)[..samples].fill(0.0);
                }
                samples
            }
            Err(SymphoniaError::IoError(e)) => {
                return FrameOutcome::Recoverable {
                    at: 0,
                    skip: len,
                    reason: format!("truncated frame: {}", e),
                }
            }
            Err(e) => return FrameOutcome::Unrecoverable(format!("MPEG audio decoder failed: {}", e)),
        };

        FrameOutcome::Decoded(DecodedFrame {
            header,
            consumed: len,
            samples,
            ancillary: header.ancillary_offset().min(len)..len,
        })
    }

    fn reset(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
    }
}
