pub mod loop_;
pub mod mixer;
pub mod normalizer;

pub use loop_::{spawn as spawn_loop, ClipProvider, CurrentClipInfo, OnClipEnd, OnClipStart, PlaybackLoopHandle};
pub use mixer::PriorityMixer;
pub use normalizer::{Normalizer, MAX_AMPLIFICATION, TARGET_MIN_RMS};
