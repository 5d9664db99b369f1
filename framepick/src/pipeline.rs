use std::path::Path;

use crate::{
    face::FaceDetector,
    params::SelectionParameters,
    sampler::{ExtractError, FrameSampler},
    selector::{FrameSelector, ScoredCandidate},
};

#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("failed to extract frames")]
    Extract(#[from] ExtractError),
    #[error("no frames could be extracted from the video")]
    NoFramesExtracted,
    #[error("could not select any suitable frames")]
    NoSuitableFrames,
}

#[derive(Debug)]
pub struct Picked {
    /// How many frames were scored
    pub sampled: usize,
    /// Whether a face detector took part in the scoring
    pub face_detection: bool,
    /// Ordered by timestamp
    pub frames: Vec<ScoredCandidate>,
}

/// Extracts and selects in one go.
pub fn pick(
    video_path: impl AsRef<Path>,
    params: &SelectionParameters,
    face_detector: Option<Box<dyn FaceDetector>>,
) -> Result<Picked, PickError> {
    pick_until(video_path, params, face_detector, || false)
}

/// Like [`pick`], but stops decoding as soon as `should_stop` returns true.
pub fn pick_until(
    video_path: impl AsRef<Path>,
    params: &SelectionParameters,
    face_detector: Option<Box<dyn FaceDetector>>,
    should_stop: impl FnMut() -> bool,
) -> Result<Picked, PickError> {
    let selector =
        FrameSelector::with_face_detector(params.mode, params.quality, face_detector);

    let frames =
        FrameSampler::new(video_path, params.sample_rate)?.sample_until(should_stop)?;
    if frames.is_empty() {
        return Err(PickError::NoFramesExtracted);
    }

    let sampled = frames.len();
    let frames = selector.select_best_frames(frames, params.count, params.min_interval);
    if frames.is_empty() {
        return Err(PickError::NoSuitableFrames);
    }

    Ok(Picked {
        sampled,
        face_detection: selector.detects_faces(),
        frames,
    })
}
