//! Scores sampled frames and picks the best ones that are not too close in time.

use std::num::NonZeroUsize;

use rayon::prelude::*;

use crate::{
    face::FaceDetector,
    params::{Mode, Quality},
    sampler::SampledFrame,
    scoring::{FrameScorer, ScoreBreakdown},
};

/// A frame together with how good it is.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub frame: SampledFrame,
    pub score: f64,
    /// Same as `frame.timestamp`
    pub timestamp: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn new(frame: SampledFrame, breakdown: ScoreBreakdown) -> Self {
        Self {
            score: breakdown.total,
            timestamp: frame.timestamp,
            frame,
            breakdown,
        }
    }
}

pub struct FrameSelector {
    scorer: FrameScorer,
}

impl FrameSelector {
    /// A selector without a face detector, faces get a neutral score in profile mode.
    pub fn new(mode: Mode, quality: Quality) -> Self {
        Self::with_face_detector(mode, quality, None)
    }

    pub fn with_face_detector(
        mode: Mode,
        quality: Quality,
        face_detector: Option<Box<dyn FaceDetector>>,
    ) -> Self {
        Self {
            scorer: FrameScorer::new(mode, quality, face_detector),
        }
    }

    pub fn detects_faces(&self) -> bool {
        self.scorer.detects_faces()
    }

    /// Scores every frame, in parallel. The order of the frames is kept.
    pub fn score_frames(&self, frames: Vec<SampledFrame>) -> Vec<ScoredCandidate> {
        frames
            .into_par_iter()
            .map(|frame| {
                let breakdown = self.scorer.score(&frame.image);
                log::trace!(
                    "Frame {} at {:.2}s: {:?}",
                    frame.frame_number,
                    frame.timestamp,
                    breakdown
                );
                ScoredCandidate::new(frame, breakdown)
            })
            .collect()
    }

    /// The best `count` frames, at least `min_interval` seconds apart, ordered by time.
    /// Can return fewer than `count` if the interval doesn't allow more, but never
    /// nothing unless `frames` is empty.
    pub fn select_best_frames(
        &self,
        frames: Vec<SampledFrame>,
        count: NonZeroUsize,
        min_interval: f64,
    ) -> Vec<ScoredCandidate> {
        if frames.is_empty() {
            return Vec::new();
        }

        let total = frames.len();
        let scored = self.score_frames(frames);
        let selected = select_spaced(scored, count, min_interval);
        log::debug!(
            "Selected {} of {} frames in {} mode",
            selected.len(),
            total,
            self.scorer.mode()
        );
        selected
    }

    /// The single best frame, if there are any frames at all.
    pub fn select_best_frame(
        &self,
        frames: Vec<SampledFrame>,
    ) -> Option<ScoredCandidate> {
        self.select_best_frames(frames, NonZeroUsize::MIN, 0.0)
            .into_iter()
            .next()
    }
}

/// Greedily takes the highest scoring candidates as long as they are at least
/// `min_interval` seconds from everything taken so far. Equal scores are taken in the
/// order they come in. The result is sorted by timestamp.
pub fn select_spaced(
    mut candidates: Vec<ScoredCandidate>,
    count: NonZeroUsize,
    min_interval: f64,
) -> Vec<ScoredCandidate> {
    let count = count.get();

    if count == 1 {
        // strictly greater, so the first of equals wins
        return candidates
            .into_iter()
            .reduce(|best, c| if c.score > best.score { c } else { best })
            .into_iter()
            .collect();
    }

    // stable, keeps equal scores in their original order
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(count);
    for candidate in candidates {
        let far_enough = selected
            .iter()
            .all(|s| (s.timestamp - candidate.timestamp).abs() >= min_interval);
        if far_enough {
            selected.push(candidate);
            if selected.len() >= count {
                break;
            }
        }
    }

    selected.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    selected
}
