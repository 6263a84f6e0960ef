//! MPEG audio bitstream plumbing: frame headers, the ancillary VBR/gapless
//! headers of the first frame, resynchronization and the frame decode seam.

pub mod bits;
pub mod engine;
pub mod header;
pub mod resync;
pub mod scan;
pub mod vbr;

pub use bits::{BitCursor, Underrun};
pub use engine::{
    confirm_sync, slice_frame, DecodedFrame, FrameDecodeEngine, FrameOutcome, FrameSamples,
    FrameSlice, SyncCheck, MAX_CHANNELS,
};
pub use header::{find_sync, ChannelMode, FrameHeader, MpegLayer, MpegVersion, MAX_SAMPLES_PER_FRAME};
pub use resync::{
    detect_tag, starts_with_tag, EmbeddedTag, RecoveryResult, RecoveryStatistics, ResyncManager,
    TagSpan,
};
pub use scan::{count_frames, ScanResult};
pub use vbr::{VbrInfo, DECODER_DELAY, SEEK_TABLE_LEN};
