//! MPEG-1/2/2.5 audio frame headers.
//!
//! Only what the streaming engine needs: enough of the 32-bit header to find
//! frame boundaries, size the side information and describe the output format.

/// Largest number of samples a single compressed frame can produce
pub const MAX_SAMPLES_PER_FRAME: usize = 1152;

/// Length of the fixed frame header, excluding the optional CRC
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    pub fn channels(&self) -> u16 {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

/// Decoded fixed header of one compressed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: MpegLayer,
    pub has_crc: bool,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub mode: ChannelMode,
}

// Bitrates in kbps, indexed by the 4-bit bitrate field; index 0 is free format.
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

impl FrameHeader {
    /// Parse a header from the first four bytes of `bytes`.
    ///
    /// Returns `None` for anything that is not a usable header: missing sync,
    /// reserved version/layer/sample-rate values, free-format or invalid bitrate.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };

        let layer = match (bytes[1] >> 1) & 0b11 {
            0b01 => MpegLayer::Layer3,
            0b10 => MpegLayer::Layer2,
            0b11 => MpegLayer::Layer1,
            _ => return None,
        };

        let has_crc = bytes[1] & 1 == 0;

        let bitrate_index = (bytes[2] >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let table = match (version, layer) {
            (MpegVersion::Mpeg1, MpegLayer::Layer1) => &BITRATES_V1_L1,
            (MpegVersion::Mpeg1, MpegLayer::Layer2) => &BITRATES_V1_L2,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => &BITRATES_V1_L3,
            (_, MpegLayer::Layer1) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        let bitrate_kbps = table[bitrate_index];

        let base_rate = match (bytes[2] >> 2) & 0b11 {
            0b00 => 44100,
            0b01 => 48000,
            0b10 => 32000,
            _ => return None,
        };
        let sample_rate = match version {
            MpegVersion::Mpeg1 => base_rate,
            MpegVersion::Mpeg2 => base_rate / 2,
            MpegVersion::Mpeg25 => base_rate / 4,
        };

        let padding = (bytes[2] >> 1) & 1 == 1;

        let mode = match bytes[3] >> 6 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Some(Self {
            version,
            layer,
            has_crc,
            bitrate_kbps,
            sample_rate,
            padding,
            mode,
        })
    }

    pub fn channels(&self) -> u16 {
        self.mode.channels()
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (MpegLayer::Layer1, _) => 384,
            (MpegLayer::Layer2, _) => 1152,
            (MpegLayer::Layer3, MpegVersion::Mpeg1) => 1152,
            (MpegLayer::Layer3, _) => 576,
        }
    }

    /// Total length of the frame in bytes, header included
    pub fn frame_len(&self) -> usize {
        let bitrate = self.bitrate_kbps as usize * 1000;
        let rate = self.sample_rate as usize;
        let pad = self.padding as usize;
        match (self.layer, self.version) {
            (MpegLayer::Layer1, _) => (12 * bitrate / rate + pad) * 4,
            (MpegLayer::Layer2, _) | (MpegLayer::Layer3, MpegVersion::Mpeg1) => {
                144 * bitrate / rate + pad
            }
            (MpegLayer::Layer3, _) => 72 * bitrate / rate + pad,
        }
    }

    /// Bytes of header plus optional CRC
    pub fn header_len(&self) -> usize {
        if self.has_crc {
            HEADER_LEN + 2
        } else {
            HEADER_LEN
        }
    }

    /// Layer III side information length; zero for the other layers
    pub fn side_info_len(&self) -> usize {
        match (self.layer, self.version, self.mode) {
            (MpegLayer::Layer3, MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (MpegLayer::Layer3, MpegVersion::Mpeg1, _) => 32,
            (MpegLayer::Layer3, _, ChannelMode::Mono) => 9,
            (MpegLayer::Layer3, _, _) => 17,
            _ => 0,
        }
    }

    /// Offset of the ancillary region (where extended headers live) within the frame
    pub fn ancillary_offset(&self) -> usize {
        self.header_len() + self.side_info_len()
    }

    /// Whether `other` belongs to the same stream: a stream may not change
    /// version, layer or sample rate mid-file.
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
    }
}

/// Offset of the next plausible frame header in `bytes`
pub fn find_sync(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEADER_LEN)
        .position(|window| FrameHeader::parse(window).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    // MPEG-1 Layer III, 128 kbps, 44.1 kHz, no CRC, joint stereo
    const MP3_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x40];

    #[test]
    fn test_parse_mpeg1_layer3() {
        let header = FrameHeader::parse(&MP3_128K).unwrap();

        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.layer, MpegLayer::Layer3);
        assert!(!header.has_crc);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.mode, ChannelMode::JointStereo);
        assert_eq!(header.channels(), 2);
        assert_eq!(header.samples_per_frame(), 1152);
        assert_eq!(header.frame_len(), 417);
        assert_eq!(header.side_info_len(), 32);
        assert_eq!(header.ancillary_offset(), 36);
    }

    #[test]
    fn test_padding_and_crc() {
        // Padding bit set, protection bit cleared (CRC present)
        let header = FrameHeader::parse(&[0xFF, 0xFA, 0x92, 0xC0]).unwrap();

        assert!(header.padding);
        assert!(header.has_crc);
        assert_eq!(header.mode, ChannelMode::Mono);
        assert_eq!(header.frame_len(), 418);
        assert_eq!(header.header_len(), 6);
        assert_eq!(header.ancillary_offset(), 6 + 17);
    }

    #[test]
    fn test_mpeg2_layer3_half_frame() {
        // MPEG-2 Layer III, 64 kbps, 22.05 kHz, mono
        let header = FrameHeader::parse(&[0xFF, 0xF3, 0x80, 0xC0]).unwrap();

        assert_eq!(header.version, MpegVersion::Mpeg2);
        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.bitrate_kbps, 64);
        assert_eq!(header.samples_per_frame(), 576);
        assert_eq!(header.frame_len(), 72 * 64000 / 22050);
        assert_eq!(header.side_info_len(), 9);
    }

    #[test]
    fn test_layer1_and_layer2_lengths() {
        // MPEG-1 Layer I, 384 kbps, 48 kHz
        let l1 = FrameHeader::parse(&[0xFF, 0xFF, 0xC4, 0x00]).unwrap();
        assert_eq!(l1.layer, MpegLayer::Layer1);
        assert_eq!(l1.bitrate_kbps, 384);
        assert_eq!(l1.samples_per_frame(), 384);
        assert_eq!(l1.frame_len(), (12 * 384000 / 48000) * 4);
        assert_eq!(l1.side_info_len(), 0);

        // MPEG-1 Layer II, 192 kbps, 48 kHz
        let l2 = FrameHeader::parse(&[0xFF, 0xFD, 0xA4, 0x00]).unwrap();
        assert_eq!(l2.layer, MpegLayer::Layer2);
        assert_eq!(l2.bitrate_kbps, 192);
        assert_eq!(l2.frame_len(), 144 * 192000 / 48000);
    }

    #[test]
    fn test_rejects_invalid_headers() {
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x90]).is_none());
        // no sync
        assert!(FrameHeader::parse(&[0xFE, 0xFB, 0x90, 0x40]).is_none());
        // reserved version
        assert!(FrameHeader::parse(&[0xFF, 0xEB, 0x90, 0x40]).is_none());
        // reserved layer
        assert!(FrameHeader::parse(&[0xFF, 0xF9, 0x90, 0x40]).is_none());
        // free format
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0x40]).is_none());
        // bad bitrate
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0xF0, 0x40]).is_none());
        // reserved sample rate
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x9C, 0x40]).is_none());
    }

    #[test]
    fn test_find_sync_skips_garbage() {
        let mut bytes = vec![0x00, 0x12, 0xFF, 0x00, 0x34];
        bytes.extend_from_slice(&MP3_128K);
        assert_eq!(find_sync(&bytes), Some(5));
        assert_eq!(find_sync(&[0u8; 16]), None);
    }

    #[test]
    fn test_compatibility() {
        let a = FrameHeader::parse(&MP3_128K).unwrap();
        let b = FrameHeader::parse(&[0xFF, 0xFB, 0xB0, 0xC0]).unwrap();
        let c = FrameHeader::parse(&[0xFF, 0xFB, 0x94, 0x40]).unwrap();

        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
    }
}
