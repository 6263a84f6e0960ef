//! Header-only pass over the whole stream to count compressed frames exactly.

use super::engine::{confirm_sync, SyncCheck};
use super::header::{find_sync, FrameHeader, HEADER_LEN};
use super::resync::detect_tag;
use crate::audio::buffer::InputBuffer;
use crate::audio::source::ByteSource;
use log::debug;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    /// Whole frames matching the reference header
    pub frames: u64,
    /// Bytes skipped as garbage or embedded tags
    pub skipped_bytes: u64,
}

/// Count frames from `start`, a known frame boundary, to the end of `source`
/// without decoding audio.
///
/// Only headers with the same version, layer and sample rate as `reference`
/// count; a truncated final frame does not. After skipped bytes a header is
/// only trusted when another frame or a tag follows it. The source is left
/// wherever the scan stopped.
pub fn count_frames<S: ByteSource + ?Sized>(
    source: &mut S,
    start: u64,
    reference: &FrameHeader,
    buffer_size: usize,
) -> io::Result<ScanResult> {
    source.seek(start)?;
    let mut input = InputBuffer::new(buffer_size);
    input.reset_to(start);

    let mut result = ScanResult {
        frames: 0,
        skipped_bytes: 0,
    };
    let mut synced = true;

    loop {
        fill(&mut input, source, HEADER_LEN)?;
        if input.len() < HEADER_LEN {
            break;
        }

        let header = FrameHeader::parse(input.bytes()).filter(|h| h.is_compatible(reference));
        if let Some(header) = header {
            let len = header.frame_len();
            fill(&mut input, source, len + HEADER_LEN)?;
            if input.len() < len {
                break;
            }
            let confirmed = synced
                || !matches!(
                    confirm_sync(input.bytes(), input.at_eof(), Some(reference)),
                    SyncCheck::Reject(_)
                );
            if confirmed {
                input.consume(len);
                result.frames += 1;
                synced = true;
                continue;
            }
        }
        synced = false;

        if let Some(span) = detect_tag(input.bytes()) {
            debug!("Scan skipping {} tag of {} bytes", span.tag.as_str(), span.len);
            input.skip(span.len);
            result.skipped_bytes += span.len;
            continue;
        }

        let bytes = input.bytes();
        let skip = match find_sync(&bytes[1..]) {
            Some(pos) => pos + 1,
            None => bytes.len() - (HEADER_LEN - 1),
        };
        input.consume(skip);
        result.skipped_bytes += skip as u64;
    }

    debug!(
        "Forward scan counted {} frames, skipped {} bytes",
        result.frames, result.skipped_bytes
    );
    Ok(result)
}

fn fill<S: ByteSource + ?Sized>(input: &mut InputBuffer, source: &mut S, want: usize) -> io::Result<()> {
    while input.len() < want && !input.at_eof() {
        if input.refill(source)? == 0 && !input.at_eof() {
            break;
        }
    }
    Ok(())
}
