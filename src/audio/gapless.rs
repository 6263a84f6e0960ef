use crate::audio::mpeg::VbrInfo;
use std::ops::Range;

/// Cuts encoder delay and padding out of decoded frames.
///
/// Frames are numbered by the session in decode order starting at 0 from the
/// beginning of the stream; the synthetic header frame, when present, is
/// frame 0.
#[derive(Debug, Clone)]
pub struct GaplessTrimmer {
    has_header_frame: bool,
    gapless: bool,
    encoder_delay: u64,
    declared_samples: Option<u64>,
    skip_carryover: u64,
}

impl GaplessTrimmer {
    pub fn new(info: &VbrInfo) -> Self {
        Self {
            has_header_frame: info.found_extended_header,
            gapless: info.found_gapless_header,
            encoder_delay: info.encoder_delay as u64,
            declared_samples: info.declared_samples,
            skip_carryover: 0,
        }
    }

    /// Exact sample count to clamp output to
    pub fn set_declared_samples(&mut self, declared: Option<u64>) {
        self.declared_samples = declared;
    }

    pub fn declared_samples(&self) -> Option<u64> {
        self.declared_samples
    }

    /// Index of the first frame carrying real audio
    pub fn first_audio_frame(&self) -> u64 {
        self.has_header_frame as u64
    }

    pub fn is_header_frame(&self, frame_index: u64) -> bool {
        self.has_header_frame && frame_index == 0
    }

    /// Delay still to be skipped from upcoming frames
    pub fn skip_carryover(&self) -> u64 {
        self.skip_carryover
    }

    /// Forget any pending delay, e.g. after jumping into the middle of the stream
    pub fn clear_carryover(&mut self) {
        self.skip_carryover = 0;
    }

    /// Range of a frame's `samples` decoded samples that is real audio.
    /// `emitted` is how many trimmed samples the stream produced before it.
    pub fn trim(&mut self, frame_index: u64, samples: usize, emitted: u64) -> Range<usize> {
        if self.is_header_frame(frame_index) {
            return 0..0;
        }

        if self.gapless && frame_index == self.first_audio_frame() {
            self.skip_carryover = self.encoder_delay;
        }

        let start = self.skip_carryover.min(samples as u64) as usize;
        self.skip_carryover -= start as u64;

        let mut end = samples;
        if let Some(declared) = self.declared_samples {
            let remaining = declared.saturating_sub(emitted);
            end = end.min(start + remaining.min(samples as u64) as usize);
        }

        start..end.max(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gapless_info(frames: u32, delay: u32, padding: u32) -> VbrInfo {
        VbrInfo {
            found_extended_header: true,
            found_gapless_header: true,
            declared_frames: Some(frames),
            declared_samples: Some(frames as u64 * 1152 - (delay + padding) as u64),
            encoder_delay: delay,
            encoder_padding: padding,
            ..VbrInfo::default()
        }
    }

    #[test]
    fn test_header_frame_emits_nothing() {
        let mut trimmer = GaplessTrimmer::new(&gapless_info(10, 529, 0));
        assert_eq!(trimmer.trim(0, 1152, 0), 0..0);
        assert_eq!(trimmer.first_audio_frame(), 1);
    }

    #[test]
    fn test_delay_within_first_frame() {
        let mut trimmer = GaplessTrimmer::new(&gapless_info(10, 529, 0));
        trimmer.trim(0, 1152, 0);

        assert_eq!(trimmer.trim(1, 1152, 0), 529..1152);
        assert_eq!(trimmer.trim(2, 1152, 623), 0..1152);
    }

    #[test]
    fn test_delay_spanning_frames() {
        let mut trimmer = GaplessTrimmer::new(&gapless_info(10, 1729, 0));
        trimmer.trim(0, 1152, 0);

        assert_eq!(trimmer.trim(1, 1152, 0), 1152..1152);
        assert_eq!(trimmer.skip_carryover(), 577);
        assert_eq!(trimmer.trim(2, 1152, 0), 577..1152);
        assert_eq!(trimmer.trim(3, 1152, 575), 0..1152);
    }

    #[test]
    fn test_padding_clamps_last_frame() {
        let info = gapless_info(3, 529, 471);
        let declared = info.declared_samples.unwrap();
        let mut trimmer = GaplessTrimmer::new(&info);

        trimmer.trim(0, 1152, 0);
        let first = trimmer.trim(1, 1152, 0);
        let second = trimmer.trim(2, 1152, first.len() as u64);
        let emitted = (first.len() + second.len()) as u64;
        let last = trimmer.trim(3, 1152, emitted);

        assert_eq!(last, 0..(1152 - 471));
        assert_eq!(emitted + last.len() as u64, declared);
        assert_eq!(trimmer.trim(4, 1152, declared), 0..0);
    }

    #[test]
    fn test_no_metadata_passes_frames_through() {
        let mut trimmer = GaplessTrimmer::new(&VbrInfo::default());

        assert_eq!(trimmer.first_audio_frame(), 0);
        assert_eq!(trimmer.trim(0, 1152, 0), 0..1152);
        assert_eq!(trimmer.trim(1, 576, 1152), 0..576);
    }

    #[test]
    fn test_extended_header_without_gapless() {
        let info = VbrInfo {
            found_extended_header: true,
            declared_frames: Some(2),
            declared_samples: Some(2304),
            ..VbrInfo::default()
        };
        let mut trimmer = GaplessTrimmer::new(&info);

        assert_eq!(trimmer.trim(0, 1152, 0), 0..0);
        assert_eq!(trimmer.trim(1, 1152, 0), 0..1152);
        assert_eq!(trimmer.trim(2, 1152, 1152), 0..1152);
        assert_eq!(trimmer.trim(3, 1152, 2304), 0..0);
    }

    #[test]
    fn test_derived_declared_count() {
        let mut trimmer = GaplessTrimmer::new(&VbrInfo::default());
        trimmer.set_declared_samples(Some(1000));

        assert_eq!(trimmer.declared_samples(), Some(1000));
        assert_eq!(trimmer.trim(0, 1152, 0), 0..1000);
    }

    #[test]
    fn test_clear_carryover() {
        let mut trimmer = GaplessTrimmer::new(&gapless_info(10, 2000, 0));
        trimmer.trim(0, 1152, 0);
        trimmer.trim(1, 1152, 0);
        assert_eq!(trimmer.skip_carryover(), 848);

        trimmer.clear_carryover();
        assert_eq!(trimmer.trim(2, 1152, 0), 0..1152);
    }
}
