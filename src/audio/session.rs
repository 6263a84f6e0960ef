//! Open/Read/Seek/Close over one MPEG audio stream.

use std::io;
use std::time::Duration;

use log::info;

use crate::audio::buffer::{InputBuffer, StagingBuffer};
use crate::audio::gapless::GaplessTrimmer;
use crate::audio::mpeg::{
    confirm_sync, count_frames, DecodedFrame, FrameDecodeEngine, FrameHeader, FrameOutcome,
    FrameSamples, RecoveryResult, RecoveryStatistics, ResyncManager, SyncCheck, VbrInfo,
};
use crate::audio::position::{interpolate_offset, validate_target, SeekStrategy};
use crate::audio::source::ByteSource;
use crate::audio::PcmDecoder;
use crate::config::DecoderConfig;
use crate::error::{OpenError, SeekError, StreamEnd};
use crate::logging::{DecodeEventType, DecodeLogger};
use crate::models::{AudioBuffer, Format, StreamInfo};

// Bytes needed at an error position to recognise any embedded tag header
const TAG_PROBE_LEN: usize = 32;

enum FrameError {
    End(StreamEnd),
    Io(io::Error),
}

/// Decoding state for one open stream.
///
/// Sample positions count cross-channel sample instants of trimmed output.
/// Between calls `current_sample == decoded_samples - staging.len()`.
pub struct DecoderSession<S: ByteSource, E: FrameDecodeEngine> {
    source: S,
    engine: E,
    config: DecoderConfig,
    format: Format,
    first_header: Option<FrameHeader>,
    vbr_info: VbrInfo,
    strategy: SeekStrategy,
    trimmer: GaplessTrimmer,
    staging: StagingBuffer,
    scratch: FrameSamples,
    input: InputBuffer,
    resync: ResyncManager,
    logger: DecodeLogger,
    /// Byte offset of the first compressed frame
    stream_start: u64,
    total_samples: u64,
    exact_length: bool,
    /// Next sample a Read returns
    current_sample: u64,
    /// Compressed frames decoded since `stream_start`, header frame included
    frames_decoded: u64,
    /// Trimmed samples produced into staging since `stream_start`
    decoded_samples: u64,
    end: Option<StreamEnd>,
    open: bool,
    last_seek_offset: Option<u64>,
    /// The front of the input follows a decoded frame; cleared whenever the
    /// byte position jumps or bytes are skipped
    synced: bool,
}

impl<S: ByteSource, E: FrameDecodeEngine> DecoderSession<S, E> {
    /// Inspect the first frame, work out the stream length and get ready to read.
    pub fn open(source: S, engine: E, config: DecoderConfig) -> Result<Self, OpenError> {
        config.validate().map_err(OpenError::InvalidConfig)?;

        let start = source.position();
        let mut session = Self {
            input: InputBuffer::new(config.input_buffer_size),
            resync: ResyncManager::new(config.max_consecutive_errors),
            source,
            engine,
            config,
            format: Format {
                sample_rate: 0,
                channels: 0,
                samples_per_frame: 0,
            },
            first_header: None,
            vbr_info: VbrInfo::default(),
            strategy: SeekStrategy::Interpolated { toc: None },
            trimmer: GaplessTrimmer::new(&VbrInfo::default()),
            staging: StagingBuffer::new(2),
            scratch: FrameSamples::new(),
            logger: DecodeLogger::new(),
            stream_start: start,
            total_samples: 0,
            exact_length: false,
            current_sample: 0,
            frames_decoded: 0,
            decoded_samples: 0,
            end: None,
            open: false,
            last_seek_offset: None,
            synced: false,
        };
        session.input.reset_to(start);

        let mut ancillary = Vec::new();
        let frame = match session.next_frame(Some(&mut ancillary)) {
            Ok(frame) => frame,
            Err(FrameError::Io(e)) => return Err(OpenError::Io(e)),
            Err(FrameError::End(reason)) => {
                let detail = match reason {
                    StreamEnd::EndOfStream => "end of data before the first frame".to_string(),
                    StreamEnd::Failed(msg) => msg,
                };
                return Err(OpenError::NoValidFrame(detail));
            }
        };

        let header = frame.header;
        session.stream_start = session
            .input
            .position()
            .saturating_sub(header.frame_len() as u64);
        session.first_header = Some(header);
        session.format = Format {
            sample_rate: header.sample_rate,
            channels: header.channels(),
            samples_per_frame: header.samples_per_frame(),
        };
        session.vbr_info = VbrInfo::parse(&ancillary, header.samples_per_frame());
        session.strategy = SeekStrategy::for_stream(&session.vbr_info);
        session.trimmer = GaplessTrimmer::new(&session.vbr_info);
        session.staging = StagingBuffer::new(header.channels());

        session.logger.log_event(
            DecodeEventType::HeaderParsed,
            format!(
                "{:?} {:?} {} Hz, {} ch, {} kbps at byte {}; extended={} gapless={} delay={} padding={}",
                header.version,
                header.layer,
                header.sample_rate,
                header.channels(),
                header.bitrate_kbps,
                session.stream_start,
                session.vbr_info.found_extended_header,
                session.vbr_info.found_gapless_header,
                session.vbr_info.encoder_delay,
                session.vbr_info.encoder_padding,
            ),
        );

        session.stage_frame(&frame);
        session.determine_length(&header)?;
        session.open = true;

        session.logger.log_event(
            DecodeEventType::SessionOpened,
            format!(
                "{} samples ({}), {} seek",
                session.total_samples,
                if session.exact_length { "exact" } else { "estimated" },
                session.strategy.mode().as_str()
            ),
        );
        Ok(session)
    }

    fn determine_length(&mut self, header: &FrameHeader) -> Result<(), OpenError> {
        if let Some(declared) = self.vbr_info.declared_samples {
            self.total_samples = declared;
            self.exact_length = true;
            return Ok(());
        }

        if self.source.supports_seeking() && self.config.forward_scan {
            let scan = count_frames(
                &mut self.source,
                self.stream_start,
                header,
                self.config.input_buffer_size,
            )?;

            let audio_frames = scan.frames.saturating_sub(self.trimmer.first_audio_frame());
            let mut samples = audio_frames * self.format.samples_per_frame as u64;
            if self.vbr_info.found_gapless_header {
                samples = samples.saturating_sub(
                    self.vbr_info.encoder_delay as u64 + self.vbr_info.encoder_padding as u64,
                );
            }

            self.vbr_info.derive_declared_samples(samples);
            self.trimmer.set_declared_samples(Some(samples));
            self.total_samples = samples;
            self.exact_length = true;
            self.logger.log_event(
                DecodeEventType::ForwardScan,
                format!("{} frames, {} samples", scan.frames, samples),
            );

            self.rewind()?;
            return Ok(());
        }

        self.total_samples = match self.source.len() {
            Some(len) if header.bitrate_kbps > 0 => {
                let bytes = len.saturating_sub(self.stream_start);
                let bytes_per_second = header.bitrate_kbps as u64 * 1000 / 8;
                bytes * header.sample_rate as u64 / bytes_per_second
            }
            _ => 0,
        };
        self.exact_length = false;
        self.logger.log_event(
            DecodeEventType::LengthEstimated,
            format!("~{} samples from {} kbps", self.total_samples, header.bitrate_kbps),
        );
        Ok(())
    }

    /// Fill `out` (one slice per channel) with up to `count` samples per channel.
    /// Returns 0 only once the stream is exhausted.
    pub fn read(&mut self, out: &mut [&mut [f32]], count: usize) -> usize {
        if !self.open || out.is_empty() {
            return 0;
        }
        let capacity = out.iter().map(|ch| ch.len()).min().unwrap_or(0);
        let count = count.min(capacity);
        if count == 0 {
            return 0;
        }

        let mut written = 0;
        loop {
            written += self.staging.drain_into(out, written, count - written);
            if written == count || !self.produce_frame() {
                break;
            }
        }
        self.current_sample += written as u64;
        written
    }

    /// Fill an interleaved buffer; returns samples per channel written
    pub fn read_interleaved(&mut self, out: &mut [f32]) -> usize {
        if !self.open {
            return 0;
        }
        let count = out.len() / self.format.channels.max(1) as usize;
        if count == 0 {
            return 0;
        }

        let mut written = 0;
        loop {
            let channels = self.staging.channels();
            written += self
                .staging
                .drain_interleaved(&mut out[written * channels..], count - written);
            if written == count || !self.produce_frame() {
                break;
            }
        }
        self.current_sample += written as u64;
        written
    }

    /// Read up to `max_samples` per channel into a fresh interleaved buffer
    pub fn read_buffer(&mut self, max_samples: usize) -> Option<AudioBuffer> {
        let channels = self.format.channels.max(1);
        let mut samples = vec![0.0; max_samples * channels as usize];
        let written = self.read_interleaved(&mut samples);
        if written == 0 {
            return None;
        }
        samples.truncate(written * channels as usize);
        Some(AudioBuffer::new(samples, channels, self.format.sample_rate))
    }

    /// Reposition so the next Read starts at `target`.
    ///
    /// Accurate sessions land exactly on `target` (or on the end of the stream
    /// if it is shorter than estimated). Interpolated sessions jump to an
    /// estimated byte offset and report `target` itself.
    pub fn seek_to_sample(&mut self, target: u64) -> Result<u64, SeekError> {
        if !self.open {
            return Err(SeekError::Closed);
        }
        validate_target(target, self.total_samples)?;

        let result = match self.strategy {
            SeekStrategy::Accurate => self.seek_accurate(target),
            SeekStrategy::Interpolated { .. } => self.seek_interpolated(target),
        };

        match &result {
            Ok(position) => self.logger.log_event(
                DecodeEventType::Seek,
                format!(
                    "{} seek to {} -> {} at byte {}",
                    self.strategy.mode().as_str(),
                    target,
                    position,
                    self.last_seek_offset.unwrap_or(0)
                ),
            ),
            Err(e) => self
                .logger
                .log_event(DecodeEventType::StreamError, format!("seek to {} failed: {}", target, e)),
        }
        result
    }

    fn seek_interpolated(&mut self, target: u64) -> Result<u64, SeekError> {
        if !self.source.supports_seeking() {
            return Err(SeekError::Unsupported);
        }
        let stream_end = self.source.len().ok_or(SeekError::Unsupported)?;

        let offset = match &self.strategy {
            SeekStrategy::Interpolated { toc } => interpolate_offset(
                toc.as_ref(),
                target,
                self.total_samples,
                self.stream_start,
                stream_end,
            ),
            SeekStrategy::Accurate => return Err(SeekError::Unsupported),
        };

        self.source.seek(offset)?;
        self.input.reset_to(offset);
        self.staging.clear();
        self.engine.reset();
        self.trimmer.clear_carryover();
        self.resync.clear();
        self.synced = false;

        // Landing on the first frame means the header frame comes around again
        self.frames_decoded = if offset <= self.stream_start {
            0
        } else {
            target / self.format.samples_per_frame.max(1) as u64 + self.trimmer.first_audio_frame()
        };
        self.decoded_samples = target;
        self.current_sample = target;
        self.end = None;
        self.last_seek_offset = Some(offset);
        Ok(target)
    }

    fn seek_accurate(&mut self, target: u64) -> Result<u64, SeekError> {
        if target < self.current_sample {
            self.rewind()?;
        }

        while self.decoded_samples <= target {
            self.staging.clear();
            if !self.produce_frame() {
                break;
            }
        }

        let staged_start = self.decoded_samples - self.staging.len() as u64;
        if target > staged_start {
            self.staging.discard_front((target - staged_start) as usize);
        }
        self.current_sample = self.decoded_samples - self.staging.len() as u64;
        self.last_seek_offset = Some(self.input.position());
        Ok(self.current_sample)
    }

    /// Back to the first compressed frame with every counter cleared
    fn rewind(&mut self) -> io::Result<()> {
        self.source.seek(self.stream_start)?;
        self.input.reset_to(self.stream_start);
        self.engine.reset();
        self.staging.clear();
        self.trimmer.clear_carryover();
        self.resync.clear();
        self.synced = false;
        self.frames_decoded = 0;
        self.decoded_samples = 0;
        self.current_sample = 0;
        self.end = None;
        Ok(())
    }

    /// Whether no further samples may be produced
    fn stream_done(&self) -> bool {
        self.end.is_some()
            || self
                .trimmer
                .declared_samples()
                .map_or(false, |declared| self.decoded_samples >= declared)
    }

    /// Decode one more frame into staging. False once the stream is over.
    fn produce_frame(&mut self) -> bool {
        if self.stream_done() {
            if self.end.is_none() {
                self.finish(StreamEnd::EndOfStream);
            }
            return false;
        }

        match self.next_frame(None) {
            Ok(frame) => {
                self.stage_frame(&frame);
                true
            }
            Err(FrameError::End(reason)) => {
                self.finish(reason);
                false
            }
            Err(FrameError::Io(e)) => {
                self.finish(StreamEnd::Failed(format!("I/O error: {}", e)));
                false
            }
        }
    }

    fn stage_frame(&mut self, frame: &DecodedFrame) {
        let index = self.frames_decoded;
        self.frames_decoded += 1;
        let range = self.trimmer.trim(index, frame.samples, self.decoded_samples);
        let staged = self.staging.append(&self.scratch, range);
        self.decoded_samples += staged as u64;
    }

    fn finish(&mut self, reason: StreamEnd) {
        match &reason {
            StreamEnd::EndOfStream => self.logger.log_event(
                DecodeEventType::EndOfStream,
                format!("{} samples decoded", self.decoded_samples),
            ),
            StreamEnd::Failed(msg) => self.logger.log_event(
                DecodeEventType::StreamError,
                format!("stream terminated after {} samples: {}", self.decoded_samples, msg),
            ),
        }
        self.end = Some(reason);
    }

    /// Pull the next decodable frame, handling refills and resynchronization.
    /// When `ancillary` is given the frame's ancillary bytes are copied into it.
    fn next_frame(&mut self, mut ancillary: Option<&mut Vec<u8>>) -> Result<DecodedFrame, FrameError> {
        loop {
            match self.vet_front() {
                SyncCheck::Accept => {}
                SyncCheck::NeedMoreInput => {
                    self.refill()?;
                    continue;
                }
                SyncCheck::Reject(reason) => {
                    self.recover(0, 1, reason)?;
                    continue;
                }
            }

            let outcome =
                self.engine
                    .decode_frame(self.input.bytes(), self.input.at_eof(), &mut self.scratch);

            match outcome {
                FrameOutcome::Decoded(frame) => {
                    if let Some(out) = ancillary.take() {
                        let bytes = self.input.bytes();
                        let end = frame.ancillary.end.min(bytes.len());
                        let start = frame.ancillary.start.min(end);
                        out.clear();
                        out.extend_from_slice(&bytes[start..end]);
                    }
                    self.input.consume(frame.consumed);
                    self.resync.frame_decoded();
                    self.synced = true;
                    return Ok(frame);
                }
                FrameOutcome::NeedMoreInput => {
                    if self.input.at_eof() {
                        return Err(FrameError::End(StreamEnd::EndOfStream));
                    }
                    self.refill()?;
                }
                FrameOutcome::Recoverable { at, skip, reason } => {
                    self.recover(at, skip, &reason)?;
                }
                FrameOutcome::Unrecoverable(msg) => {
                    return Err(FrameError::End(StreamEnd::Failed(msg)));
                }
                FrameOutcome::EndOfStream => {
                    return Err(FrameError::End(StreamEnd::EndOfStream));
                }
            }
        }
    }

    /// Check the frame header at the front of the input before decoding it.
    /// Once synced only compatibility is checked; after a jump the candidate
    /// must also be followed by another frame.
    fn vet_front(&self) -> SyncCheck {
        let bytes = self.input.bytes();
        if !self.synced {
            return confirm_sync(bytes, self.input.at_eof(), self.first_header.as_ref());
        }
        match (FrameHeader::parse(bytes), self.first_header.as_ref()) {
            (Some(header), Some(reference)) if !reference.is_compatible(&header) => {
                SyncCheck::Reject("frame header incompatible with the stream")
            }
            _ => SyncCheck::Accept,
        }
    }

    /// Step over a bitstream error `at` bytes into the input, skipping a whole
    /// embedded tag when one starts there
    fn recover(&mut self, at: usize, skip: usize, reason: &str) -> Result<(), FrameError> {
        self.synced = false;

        let available = self.input.len().saturating_sub(at);
        if available < TAG_PROBE_LEN
            && !self.input.at_eof()
            && self.input.len() < self.input.capacity()
        {
            return self.refill();
        }

        let at_error = &self.input.bytes()[at.min(self.input.len())..];
        match self
            .resync
            .attempt_recovery(at_error, skip, reason, &mut self.logger)
        {
            RecoveryResult::Skip { bytes, .. } => {
                self.input.consume(at);
                self.input.skip(bytes);
                Ok(())
            }
            RecoveryResult::Failed(msg) => Err(FrameError::End(StreamEnd::Failed(msg))),
        }
    }

    fn refill(&mut self) -> Result<(), FrameError> {
        match self.input.refill(&mut self.source) {
            Ok(0) if !self.input.at_eof() => Err(FrameError::End(StreamEnd::Failed(
                "compressed frame larger than the input buffer".to_string(),
            ))),
            Ok(_) => Ok(()),
            Err(e) => Err(FrameError::Io(e)),
        }
    }

    /// Total trimmed samples in the stream; 0 if unknown
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn current_sample(&self) -> u64 {
        self.current_sample
    }

    /// Whether `total_samples` is exact rather than estimated
    pub fn is_exact_length(&self) -> bool {
        self.exact_length
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn vbr_info(&self) -> &VbrInfo {
        &self.vbr_info
    }

    pub fn seek_strategy(&self) -> &SeekStrategy {
        &self.strategy
    }

    pub fn stream_start(&self) -> u64 {
        self.stream_start
    }

    pub fn duration(&self) -> Duration {
        self.format.samples_to_duration(self.total_samples)
    }

    /// Why the stream stopped producing samples, once it has
    pub fn end_reason(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    pub fn events(&self) -> &DecodeLogger {
        &self.logger
    }

    /// Byte offset the last seek moved the source to
    pub fn last_seek_offset(&self) -> Option<u64> {
        self.last_seek_offset
    }

    pub fn resync_statistics(&self) -> RecoveryStatistics {
        self.resync.statistics()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            format: self.format,
            total_samples: self.total_samples,
            exact_length: self.exact_length,
            duration_secs: self.duration().as_secs_f64(),
            bitrate_kbps: self.first_header.map(|h| h.bitrate_kbps).unwrap_or(0),
            stream_start: self.stream_start,
            extended_header: self.vbr_info.found_extended_header,
            gapless_header: self.vbr_info.found_gapless_header,
            has_seek_table: self.vbr_info.seek_table.is_some(),
            declared_frames: self.vbr_info.declared_frames,
            encoder_delay: self.vbr_info.encoder_delay,
            encoder_padding: self.vbr_info.encoder_padding,
            seek_mode: self.strategy.mode(),
        }
    }

    /// Release staged data; later Reads return 0 and Seeks fail
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.staging.clear();
        self.input.reset_to(self.input.position());
        info!(
            "Closing decoder session at sample {} of {}",
            self.current_sample, self.total_samples
        );
        self.logger.log_event(
            DecodeEventType::SessionClosed,
            format!("closed at sample {}", self.current_sample),
        );
    }

    /// Close and hand back the byte source
    pub fn into_inner(mut self) -> S {
        self.close();
        self.source
    }
}

impl<S: ByteSource, E: FrameDecodeEngine> PcmDecoder for DecoderSession<S, E> {
    fn decode_next(&mut self, max_samples: usize) -> Option<AudioBuffer> {
        self.read_buffer(max_samples)
    }

    fn seek(&mut self, position: Duration) -> Result<Duration, SeekError> {
        let target = self.format.duration_to_samples(position);
        let landed = self.seek_to_sample(target)?;
        Ok(self.format.samples_to_duration(landed))
    }

    fn format(&self) -> Format {
        self.format
    }

    fn duration(&self) -> Duration {
        self.format.samples_to_duration(self.total_samples)
    }

    fn position(&self) -> Duration {
        self.format.samples_to_duration(self.current_sample)
    }
}
