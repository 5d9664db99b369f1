//! Picks the best still frames out of a video, either for a profile picture or for an
//! action shot.
//!
//! The flow is [`sampler::extract_frames`] followed by
//! [`selector::FrameSelector::select_best_frames`], or [`pipeline::pick`] for both at
//! once.

pub mod face;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod scoring;
pub mod selector;
pub mod writer;
