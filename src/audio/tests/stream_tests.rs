use crate::audio::tests::synthetic::{
    expected_ramp, read_all, RampEngine, StreamBuilder, XingSpec, FRAME_LEN, SAMPLE_RATE, SPF,
};
use crate::audio::{DecoderSession, MemorySource, ReaderSource};
use crate::config::DecoderConfig;
use crate::error::{OpenError, StreamEnd};
use crate::logging::DecodeEventType;
use std::io::Cursor;

#[cfg(test)]
mod tests {
    use super::*;

    fn open_with(
        builder: &StreamBuilder,
        engine: RampEngine,
        config: DecoderConfig,
    ) -> DecoderSession<MemorySource, RampEngine> {
        DecoderSession::open(MemorySource::new(builder.build()), engine, config).unwrap()
    }

    fn no_scan() -> DecoderConfig {
        DecoderConfig {
            forward_scan: false,
            ..DecoderConfig::default()
        }
    }

    #[test]
    fn test_forward_scan_gives_exact_length() {
        let builder = StreamBuilder::new(30);
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

        assert!(session.is_exact_length());
        assert_eq!(session.total_samples(), (30 * SPF) as u64);
        assert_eq!(session.events().count(DecodeEventType::ForwardScan), 1);
        // Scan rewinds back to the first frame
        assert_eq!(session.engine().resets, 1);
        assert_eq!(session.current_sample(), 0);

        let samples = read_all(&mut session, 4096);
        assert_eq!(samples, expected_ramp(0, 30 * SPF));
        assert_eq!(session.end_reason(), Some(&StreamEnd::EndOfStream));
    }

    #[test]
    fn test_estimated_length_without_scan() {
        let builder = StreamBuilder::new(30);
        let mut session = open_with(&builder, RampEngine::new(), no_scan());

        let actual = (30 * SPF) as f64;
        let estimate = session.total_samples() as f64;
        assert!(!session.is_exact_length());
        assert!((estimate - actual).abs() / actual < 0.01);
        assert_eq!(session.events().count(DecodeEventType::LengthEstimated), 1);

        // The estimate never truncates output
        let samples = read_all(&mut session, 4096);
        assert_eq!(samples.len(), 30 * SPF);
    }

    #[test]
    fn test_declared_frame_count_wins_over_data() {
        let xing_spec = XingSpec {
            frames: Some(5),
            ..XingSpec::default()
        };
        let builder = StreamBuilder::new(8).xing(xing_spec);
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

        assert_eq!(session.total_samples(), (5 * SPF) as u64);
        assert_eq!(session.events().count(DecodeEventType::ForwardScan), 0);
        assert_eq!(read_all(&mut session, 4096).len(), 5 * SPF);
    }

    #[test]
    fn test_forward_only_source_reads_everything() {
        let bytes = StreamBuilder::new(4).build();
        let mut session = DecoderSession::open(
            ReaderSource::new(Cursor::new(bytes)),
            RampEngine::new(),
            DecoderConfig::default(),
        )
        .unwrap();

        assert_eq!(session.total_samples(), 0);
        assert!(!session.is_exact_length());

        let samples = read_all(&mut session, 1000);
        assert_eq!(samples, expected_ramp(0, 4 * SPF));
    }

    #[test]
    fn test_forward_only_source_with_length_hint() {
        let bytes = StreamBuilder::new(10).build();
        let len = bytes.len() as u64;
        let session = DecoderSession::open(
            ReaderSource::new(Cursor::new(bytes)).with_len_hint(len),
            RampEngine::new(),
            DecoderConfig::default(),
        )
        .unwrap();

        let expected = len * SAMPLE_RATE as u64 / 16_000;
        assert_eq!(session.total_samples(), expected);
    }

    #[test]
    fn test_leading_id3v2_tag_is_skipped() {
        let builder = StreamBuilder::new(6)
            .id3v2_prefix(200)
            .xing(XingSpec::gapless(6, 576, 1000));
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

        assert_eq!(session.stream_start(), 210);
        assert_eq!(session.stream_start(), builder.stream_start() as u64);
        assert_eq!(session.events().count(DecodeEventType::TagSkipped), 1);
        assert!(session.stream_info().gapless_header);

        let samples = read_all(&mut session, 2048);
        assert_eq!(samples, expected_ramp(1105, 6 * SPF - 1576));
    }

    #[test]
    fn test_leading_tag_with_forward_scan() {
        let builder = StreamBuilder::new(7).id3v2_prefix(300);
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

        assert_eq!(session.stream_start(), 310);
        assert_eq!(session.total_samples(), (7 * SPF) as u64);
        assert_eq!(read_all(&mut session, 4096), expected_ramp(0, 7 * SPF));
    }

    #[test]
    fn test_garbage_between_frames_resyncs() {
        let builder = StreamBuilder::new(10).garbage_after(4, vec![0x11; 50]);
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

        assert_eq!(session.total_samples(), (10 * SPF) as u64);

        let samples = read_all(&mut session, 4096);
        assert_eq!(samples, expected_ramp(0, 10 * SPF));
        assert_eq!(session.events().count(DecodeEventType::StreamDesync), 1);

        let stats = session.resync_statistics();
        assert_eq!(stats.bytes_skipped, 50);
        assert_eq!(stats.consecutive_errors, 0);
    }

    // Deterministic pseudo-random bytes
    fn junk(seed: u64, len: usize) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 56) as u8
            })
            .collect()
    }

    #[test]
    fn test_random_junk_does_not_add_frames() {
        let total = 8 * SPF - 1105 - 471;
        for seed in 1..=40u64 {
            let builder = StreamBuilder::new(8)
                .xing(XingSpec {
                    lame: Some((576, 1000)),
                    ..XingSpec::default()
                })
                .garbage_after(3, junk(seed, 4000));
            let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());

            assert_eq!(session.total_samples(), total as u64, "seed {}", seed);
            assert_eq!(read_all(&mut session, 4096), expected_ramp(1105, total), "seed {}", seed);
            assert_eq!(session.end_reason(), Some(&StreamEnd::EndOfStream), "seed {}", seed);

            // Positions past the junk still line up with the ramp
            session.seek_to_sample(6000).unwrap();
            assert_eq!(read_all(&mut session, 700), expected_ramp(1105 + 6000, total - 6000));
        }
    }

    #[test]
    fn test_incompatible_frame_mid_stream_is_skipped() {
        // A 48 kHz frame between 44.1 kHz frames
        let mut foreign = vec![0u8; 384];
        foreign[..4].copy_from_slice(&[0xFF, 0xFB, 0x94, 0x00]);
        let builder = StreamBuilder::new(10).garbage_after(4, foreign);

        let mut scanned = open_with(&builder, RampEngine::new(), DecoderConfig::default());
        assert_eq!(scanned.total_samples(), (10 * SPF) as u64);
        assert_eq!(read_all(&mut scanned, 4096), expected_ramp(0, 10 * SPF));
        assert_eq!(scanned.resync_statistics().bytes_skipped, 384);

        let mut unscanned = open_with(&builder, RampEngine::new(), no_scan());
        assert_eq!(read_all(&mut unscanned, 4096), expected_ramp(0, 10 * SPF));
    }

    #[test]
    fn test_trailing_id3v1_tag_ends_cleanly() {
        let builder = StreamBuilder::new(10).id3v1_suffix();

        let mut scanned = open_with(&builder, RampEngine::new(), DecoderConfig::default());
        assert_eq!(scanned.total_samples(), (10 * SPF) as u64);
        assert_eq!(read_all(&mut scanned, 4096).len(), 10 * SPF);
        assert_eq!(scanned.end_reason(), Some(&StreamEnd::EndOfStream));

        let mut unscanned = open_with(&builder, RampEngine::new(), no_scan());
        assert_eq!(read_all(&mut unscanned, 4096).len(), 10 * SPF);
        assert_eq!(unscanned.end_reason(), Some(&StreamEnd::EndOfStream));
    }

    #[test]
    fn test_truncated_final_frame_is_dropped() {
        let builder = StreamBuilder::new(10).truncate_last_frame(200);

        let mut scanned = open_with(&builder, RampEngine::new(), DecoderConfig::default());
        assert_eq!(scanned.total_samples(), (9 * SPF) as u64);
        assert_eq!(read_all(&mut scanned, 4096), expected_ramp(0, 9 * SPF));

        let mut unscanned = open_with(&builder, RampEngine::new(), no_scan());
        assert_eq!(read_all(&mut unscanned, 4096), expected_ramp(0, 9 * SPF));
        assert_eq!(unscanned.end_reason(), Some(&StreamEnd::EndOfStream));
    }

    #[test]
    fn test_unrecoverable_error_returns_partial_data() {
        let builder = StreamBuilder::new(10);
        let mut session = open_with(&builder, RampEngine::failing_at(5), DecoderConfig::default());

        let samples = read_all(&mut session, 1000);
        assert_eq!(samples, expected_ramp(0, 5 * SPF));
        assert!(matches!(session.end_reason(), Some(StreamEnd::Failed(_))));
        assert_eq!(session.events().count(DecodeEventType::StreamError), 1);
        let event = session.events().last(DecodeEventType::StreamError).unwrap();
        assert_eq!(
            event.details,
            format!("stream terminated after {} samples: frame 5 is corrupt", 5 * SPF)
        );

        let mut left = [0.0f32; 16];
        let mut right = [0.0f32; 16];
        let mut out: [&mut [f32]; 2] = [&mut left, &mut right];
        assert_eq!(session.read(&mut out, 16), 0);
    }

    #[test]
    fn test_zero_count_read() {
        let mut session = open_with(&StreamBuilder::new(2), RampEngine::new(), DecoderConfig::default());
        let mut left = [0.0f32; 8];
        let mut right = [0.0f32; 8];
        let mut out: [&mut [f32]; 2] = [&mut left, &mut right];

        assert_eq!(session.read(&mut out, 0), 0);
        assert_eq!(session.current_sample(), 0);
        assert!(session.end_reason().is_none());
    }

    #[test]
    fn test_small_input_buffer() {
        let config = DecoderConfig {
            input_buffer_size: 4096,
            ..DecoderConfig::default()
        };
        let builder = StreamBuilder::new(40).xing(XingSpec::gapless(40, 576, 1000));
        let mut session = open_with(&builder, RampEngine::new(), config);

        let samples = read_all(&mut session, 333);
        assert_eq!(samples, expected_ramp(1105, 40 * SPF - 1576));
    }

    #[test]
    fn test_open_rejects_data_without_frames() {
        let garbage = DecoderSession::open(
            MemorySource::new(vec![0x42; 5000]),
            RampEngine::new(),
            DecoderConfig::default(),
        );
        assert!(matches!(garbage, Err(OpenError::NoValidFrame(_))));

        let empty = DecoderSession::open(
            MemorySource::new(Vec::new()),
            RampEngine::new(),
            DecoderConfig::default(),
        );
        assert!(matches!(empty, Err(OpenError::NoValidFrame(_))));

        // A header whose frame is cut short is not a valid frame either
        let stub = StreamBuilder::new(1).build()[..FRAME_LEN / 2].to_vec();
        let truncated = DecoderSession::open(MemorySource::new(stub), RampEngine::new(), DecoderConfig::default());
        assert!(matches!(truncated, Err(OpenError::NoValidFrame(_))));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = DecoderConfig {
            input_buffer_size: 512,
            ..DecoderConfig::default()
        };
        let result = DecoderSession::open(
            MemorySource::new(StreamBuilder::new(2).build()),
            RampEngine::new(),
            config,
        );
        assert!(matches!(result, Err(OpenError::InvalidConfig(_))));
    }

    #[test]
    fn test_close_and_recover_source() {
        let builder = StreamBuilder::new(3);
        let mut session = open_with(&builder, RampEngine::new(), DecoderConfig::default());
        read_all(&mut session, 100);

        let source = session.into_inner();
        assert_eq!(source.into_inner(), builder.build());
    }
}
