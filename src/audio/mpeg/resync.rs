use crate::logging::{DecodeEventType, DecodeLogger};
use log::{debug, warn};

const ID3V2_HEADER_LEN: usize = 10;
const ID3V2_FOOTER_LEN: u64 = 10;
const ID3V1_LEN: u64 = 128;
const APE_HEADER_LEN: usize = 32;

/// Non-audio metadata blocks that show up inside MPEG audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedTag {
    Id3v2,
    Id3v1,
    Ape,
}

impl EmbeddedTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddedTag::Id3v2 => "ID3v2",
            EmbeddedTag::Id3v1 => "ID3v1",
            EmbeddedTag::Ape => "APEv2",
        }
    }
}

/// A tag found at the front of some bytes, with its full length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpan {
    pub tag: EmbeddedTag,
    pub len: u64,
}

/// Identify a metadata tag starting at `bytes[0]`.
///
/// The returned length covers the whole tag even when only its header is
/// available.
pub fn detect_tag(bytes: &[u8]) -> Option<TagSpan> {
    if bytes.starts_with(b"ID3") && bytes.len() >= ID3V2_HEADER_LEN {
        let size = syncsafe_u32(&bytes[6..10])?;
        let footer = if bytes[5] & 0x10 != 0 { ID3V2_FOOTER_LEN } else { 0 };
        return Some(TagSpan {
            tag: EmbeddedTag::Id3v2,
            len: ID3V2_HEADER_LEN as u64 + size as u64 + footer,
        });
    }

    if bytes.starts_with(b"APETAGEX") && bytes.len() >= APE_HEADER_LEN {
        let size = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        return Some(TagSpan {
            tag: EmbeddedTag::Ape,
            len: size as u64 + APE_HEADER_LEN as u64,
        });
    }

    if bytes.starts_with(b"TAG") {
        return Some(TagSpan {
            tag: EmbeddedTag::Id3v1,
            len: ID3V1_LEN,
        });
    }

    None
}

/// Whether `bytes` opens with the magic of a tag `detect_tag` recognises,
/// comparing only as much of the magic as is available.
pub fn starts_with_tag(bytes: &[u8]) -> bool {
    [&b"ID3"[..], &b"TAG"[..], &b"APETAGEX"[..]].iter().any(|magic| {
        let n = bytes.len().min(magic.len());
        n >= 3 && bytes[..n] == magic[..n]
    })
}

// 4 x 7-bit big-endian; any byte with the high bit set is not syncsafe
fn syncsafe_u32(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        if b & 0x80 != 0 {
            None
        } else {
            Some((acc << 7) | b as u32)
        }
    })
}

/// What to do about one recoverable bitstream error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryResult {
    /// Drop this many bytes from the error position and retry
    Skip { bytes: u64, tag: Option<EmbeddedTag> },
    /// Too many errors in a row; treat the stream as broken
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStatistics {
    pub consecutive_errors: u32,
    pub total_recoveries: u64,
    pub tags_skipped: u64,
    pub bytes_skipped: u64,
}

/// Resynchronization policy for recoverable desyncs
#[derive(Debug, Clone)]
pub struct ResyncManager {
    max_consecutive_errors: u32,
    stats: RecoveryStatistics,
}

impl ResyncManager {
    pub fn new(max_consecutive_errors: u32) -> Self {
        Self {
            max_consecutive_errors: max_consecutive_errors.max(1),
            stats: RecoveryStatistics::default(),
        }
    }

    /// Decide how to step over a bitstream error. `bytes` starts at the error
    /// position; `suggested_skip` is the engine's own estimate.
    pub fn attempt_recovery(
        &mut self,
        bytes: &[u8],
        suggested_skip: usize,
        reason: &str,
        logger: &mut DecodeLogger,
    ) -> RecoveryResult {
        self.stats.consecutive_errors += 1;
        if self.stats.consecutive_errors > self.max_consecutive_errors {
            warn!(
                "Maximum consecutive decode errors ({}) exceeded: {}",
                self.max_consecutive_errors, reason
            );
            return RecoveryResult::Failed(format!(
                "{} consecutive decode errors, last: {}",
                self.stats.consecutive_errors, reason
            ));
        }

        let result = match detect_tag(bytes) {
            Some(span) => {
                self.stats.tags_skipped += 1;
                logger.log_event(
                    DecodeEventType::TagSkipped,
                    format!("{} tag, {} bytes", span.tag.as_str(), span.len),
                );
                RecoveryResult::Skip {
                    bytes: span.len,
                    tag: Some(span.tag),
                }
            }
            None => {
                let bytes = suggested_skip.max(1) as u64;
                logger.log_event(
                    DecodeEventType::StreamDesync,
                    format!("{}; skipping {} bytes", reason, bytes),
                );
                RecoveryResult::Skip { bytes, tag: None }
            }
        };

        if let RecoveryResult::Skip { bytes, .. } = &result {
            self.stats.total_recoveries += 1;
            self.stats.bytes_skipped += bytes;
        }
        result
    }

    /// A frame decoded cleanly; the error run is over
    pub fn frame_decoded(&mut self) {
        if self.stats.consecutive_errors > 0 {
            debug!("Resynchronized after {} errors", self.stats.consecutive_errors);
            self.stats.consecutive_errors = 0;
        }
    }

    pub fn clear(&mut self) {
        self.stats.consecutive_errors = 0;
    }

    pub fn statistics(&self) -> RecoveryStatistics {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id3v2(body_len: u32, footer: bool) -> Vec<u8> {
        let mut tag = b"ID3\x04\x00".to_vec();
        tag.push(if footer { 0x10 } else { 0x00 });
        tag.extend_from_slice(&[
            ((body_len >> 21) & 0x7F) as u8,
            ((body_len >> 14) & 0x7F) as u8,
            ((body_len >> 7) & 0x7F) as u8,
            (body_len & 0x7F) as u8,
        ]);
        tag.extend(std::iter::repeat(0u8).take(body_len as usize));
        tag
    }

    #[test]
    fn test_detect_id3v2() {
        let tag = id3v2(300, false);
        assert_eq!(
            detect_tag(&tag),
            Some(TagSpan {
                tag: EmbeddedTag::Id3v2,
                len: 310
            })
        );

        let with_footer = id3v2(300, true);
        assert_eq!(detect_tag(&with_footer).unwrap().len, 320);
    }

    #[test]
    fn test_detect_id3v2_header_only() {
        // Length is known from the header even when the body is not buffered
        let tag = id3v2(5000, false);
        assert_eq!(detect_tag(&tag[..10]).unwrap().len, 5010);
        assert_eq!(detect_tag(&tag[..6]), None);
    }

    #[test]
    fn test_detect_id3v2_rejects_bad_size() {
        let mut tag = id3v2(10, false);
        tag[7] = 0x80;
        assert_eq!(detect_tag(&tag), None);
    }

    #[test]
    fn test_detect_id3v1_and_ape() {
        let mut v1 = b"TAG".to_vec();
        v1.resize(128, 0);
        assert_eq!(detect_tag(&v1).unwrap().tag, EmbeddedTag::Id3v1);
        assert_eq!(detect_tag(&v1).unwrap().len, 128);

        let mut ape = b"APETAGEX".to_vec();
        ape.extend_from_slice(&2000u32.to_le_bytes());
        ape.extend_from_slice(&200u32.to_le_bytes());
        ape.resize(32, 0);
        let span = detect_tag(&ape).unwrap();
        assert_eq!(span.tag, EmbeddedTag::Ape);
        assert_eq!(span.len, 232);

        assert_eq!(detect_tag(&[0xFF, 0xFB, 0x90, 0x40]), None);
    }

    #[test]
    fn test_recovery_skips_whole_tag() {
        let mut manager = ResyncManager::new(4);
        let mut logger = DecodeLogger::new();
        let tag = id3v2(1000, false);

        let result = manager.attempt_recovery(&tag[..64], 1, "lost sync", &mut logger);

        assert_eq!(
            result,
            RecoveryResult::Skip {
                bytes: 1010,
                tag: Some(EmbeddedTag::Id3v2)
            }
        );
        assert_eq!(logger.count(DecodeEventType::TagSkipped), 1);
        assert_eq!(manager.statistics().tags_skipped, 1);
    }

    #[test]
    fn test_recovery_uses_engine_skip_for_garbage() {
        let mut manager = ResyncManager::new(4);
        let mut logger = DecodeLogger::new();

        let result = manager.attempt_recovery(&[0x00; 16], 7, "lost sync", &mut logger);

        assert_eq!(result, RecoveryResult::Skip { bytes: 7, tag: None });
        assert_eq!(logger.count(DecodeEventType::StreamDesync), 1);
    }

    #[test]
    fn test_starts_with_tag() {
        assert!(starts_with_tag(b"TAG"));
        assert!(starts_with_tag(b"ID3\x04"));
        assert!(starts_with_tag(b"APET"));
        assert!(starts_with_tag(b"APETAGEX\xD0\x07"));
        assert!(!starts_with_tag(b"APEX"));
        assert!(!starts_with_tag(b"ID"));
        assert!(!starts_with_tag(&[0xFF, 0xFB, 0x90, 0x00]));
    }

    #[test]
    fn test_max_consecutive_errors() {
        let mut manager = ResyncManager::new(2);
        let mut logger = DecodeLogger::new();

        assert!(matches!(
            manager.attempt_recovery(&[0; 4], 1, "bad", &mut logger),
            RecoveryResult::Skip { .. }
        ));
        assert!(matches!(
            manager.attempt_recovery(&[0; 4], 1, "bad", &mut logger),
            RecoveryResult::Skip { .. }
        ));
        assert!(matches!(
            manager.attempt_recovery(&[0; 4], 1, "bad", &mut logger),
            RecoveryResult::Failed(_)
        ));
    }

    #[test]
    fn test_decoded_frame_resets_error_run() {
        let mut manager = ResyncManager::new(1);
        let mut logger = DecodeLogger::new();

        assert!(matches!(
            manager.attempt_recovery(&[0; 4], 1, "bad", &mut logger),
            RecoveryResult::Skip { .. }
        ));
        manager.frame_decoded();
        assert!(matches!(
            manager.attempt_recovery(&[0; 4], 1, "bad", &mut logger),
            RecoveryResult::Skip { .. }
        ));

        let stats = manager.statistics();
        assert_eq!(stats.total_recoveries, 2);
        assert_eq!(stats.bytes_skipped, 2);
        assert_eq!(stats.consecutive_errors, 1);
    }
}
