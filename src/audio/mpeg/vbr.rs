//! Extended (Xing/Info) and gapless (LAME) headers carried in the ancillary
//! bytes of the first compressed frame.

use super::bits::{BitCursor, Underrun};
use log::debug;

/// Fixed decoder latency folded into the encoder-reported delay and padding
pub const DECODER_DELAY: u32 = 529;

/// Number of entries in the percentile seek table
pub const SEEK_TABLE_LEN: usize = 100;

const FLAG_FRAMES: u32 = 0x0001;
const FLAG_BYTES: u32 = 0x0002;
const FLAG_TOC: u32 = 0x0004;
const FLAG_QUALITY: u32 = 0x0008;

// Bytes between the LAME magic and the packed delay/padding field: encoder
// version suffix, tag revision, lowpass, peak, two replay gains, flags, bitrate.
const LAME_PREFIX_LEN: usize = 17;
// Prefix plus the 24-bit delay/padding field
const LAME_RECORD_LEN: usize = LAME_PREFIX_LEN + 3;

type TagParser = fn(&mut BitCursor<'_>, &mut VbrInfo) -> Result<(), Underrun>;

/// Extended headers, tried in order against the first magic
const EXTENDED_TAGS: &[(&[u8; 4], TagParser)] = &[
    (b"Xing", parse_xing_fields),
    (b"Info", parse_xing_fields),
];

/// Gapless headers, tried in order against the magic following the extended header
const GAPLESS_TAGS: &[(&[u8; 4], TagParser)] = &[(b"LAME", parse_lame_record)];

/// Stream-level facts recovered from the first compressed frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VbrInfo {
    pub found_extended_header: bool,
    pub found_gapless_header: bool,
    /// Audio frames in the stream, not counting the header frame itself
    pub declared_frames: Option<u32>,
    pub declared_samples: Option<u64>,
    pub declared_bytes: Option<u32>,
    pub seek_table: Option<[u8; SEEK_TABLE_LEN]>,
    pub quality: Option<u32>,
    pub encoder_delay: u32,
    pub encoder_padding: u32,
}

impl VbrInfo {
    /// Inspect the ancillary bytes of the first frame.
    ///
    /// Never fails: a missing or truncated header just leaves the
    /// corresponding fields at their defaults.
    pub fn parse(ancillary: &[u8], samples_per_frame: u32) -> Self {
        let mut info = VbrInfo::default();
        let mut cursor = BitCursor::new(ancillary);

        let Some(parser) = next_tag(&mut cursor, EXTENDED_TAGS) else {
            return info;
        };
        info.found_extended_header = true;

        match parser(&mut cursor, &mut info) {
            Ok(()) => {
                if let Some(parser) = next_tag(&mut cursor, GAPLESS_TAGS) {
                    if let Err(e) = parser(&mut cursor, &mut info) {
                        debug!("Gapless header truncated: {}", e);
                    }
                }
            }
            Err(e) => debug!("Extended header truncated: {}", e),
        }

        info.declared_samples = info.declared_frames.map(|frames| {
            let samples = frames as u64 * samples_per_frame as u64;
            if info.found_gapless_header {
                samples.saturating_sub(info.encoder_delay as u64 + info.encoder_padding as u64)
            } else {
                samples
            }
        });

        info
    }

    /// Record an exact sample count obtained some other way (forward scan).
    /// A count already declared by the headers is never replaced.
    pub fn derive_declared_samples(&mut self, samples: u64) {
        if self.declared_samples.is_none() {
            self.declared_samples = Some(samples);
        }
    }
}

fn next_tag(cursor: &mut BitCursor<'_>, table: &[(&[u8; 4], TagParser)]) -> Option<TagParser> {
    let magic = cursor.read_bytes::<4>().ok()?;
    table
        .iter()
        .find(|(tag, _)| **tag == magic)
        .map(|(_, parser)| *parser)
}

fn parse_xing_fields(cursor: &mut BitCursor<'_>, info: &mut VbrInfo) -> Result<(), Underrun> {
    let flags = cursor.read_u32()?;

    if flags & FLAG_FRAMES != 0 {
        info.declared_frames = Some(cursor.read_u32()?);
    }
    if flags & FLAG_BYTES != 0 {
        info.declared_bytes = Some(cursor.read_u32()?);
    }
    if flags & FLAG_TOC != 0 {
        info.seek_table = Some(cursor.read_bytes::<SEEK_TABLE_LEN>()?);
    }
    if flags & FLAG_QUALITY != 0 {
        info.quality = Some(cursor.read_u32()?);
    }
    Ok(())
}

fn parse_lame_record(cursor: &mut BitCursor<'_>, info: &mut VbrInfo) -> Result<(), Underrun> {
    let available = cursor.bits_remaining();
    if available < LAME_RECORD_LEN * 8 {
        return Err(Underrun {
            needed: LAME_RECORD_LEN * 8,
            available,
        });
    }

    cursor.skip_bytes(LAME_PREFIX_LEN)?;
    let delay = cursor.read_bits(12)? as u32;
    let padding = cursor.read_bits(12)? as u32;

    info.encoder_delay = delay + DECODER_DELAY;
    info.encoder_padding = padding.saturating_sub(DECODER_DELAY);
    info.found_gapless_header = true;
    Ok(())
}
