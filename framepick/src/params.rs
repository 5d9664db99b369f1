use std::{
    fmt,
    num::{NonZeroU32, NonZeroUsize},
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What kind of picture to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A single, well framed face
    Profile,
    /// Lots of activity spread over the picture
    Action,
}

/// How sensitive the metrics are. Does not change which metrics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Fast,
    Balanced,
    Best,
}

/// Where the interesting stuff is expected to be in a good picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The middle of a three by three grid
    Center,
    /// Spread over all four quadrants
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySettings {
    /// Laplacian variance that counts as perfectly sharp
    pub blur_threshold: f64,
    /// Smallest face side, in pixels, a detector should look for
    pub face_min_size: u32,
}

/// How much each metric contributes to the total score. Sums to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub sharpness: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// The face score in profile mode, the motion score in action mode
    pub subject: f64,
    pub composition: f64,
}

const PROFILE_WEIGHTS: Weights = Weights {
    sharpness: 0.30,
    brightness: 0.20,
    contrast: 0.20,
    subject: 0.20,
    composition: 0.10,
};

const ACTION_WEIGHTS: Weights = Weights {
    sharpness: 0.25,
    brightness: 0.15,
    contrast: 0.20,
    subject: 0.25,
    composition: 0.15,
};

impl Mode {
    pub const fn weights(self) -> &'static Weights {
        match self {
            Mode::Profile => &PROFILE_WEIGHTS,
            Mode::Action => &ACTION_WEIGHTS,
        }
    }

    pub const fn focus(self) -> Focus {
        match self {
            Mode::Profile => Focus::Center,
            Mode::Action => Focus::Dynamic,
        }
    }
}

impl Quality {
    pub const fn settings(self) -> QualitySettings {
        match self {
            Quality::Fast => QualitySettings {
                blur_threshold: 100.0,
                face_min_size: 50,
            },
            Quality::Balanced => QualitySettings {
                blur_threshold: 150.0,
                face_min_size: 30,
            },
            Quality::Best => QualitySettings {
                blur_threshold: 200.0,
                face_min_size: 20,
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Profile => "profile",
            Mode::Action => "action",
        })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quality::Fast => "fast",
            Quality::Balanced => "balanced",
            Quality::Best => "best",
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("the minimum interval must be finite and non-negative, got {0}")]
    MinInterval(f64),
}

/// Everything one extraction and selection run needs to know.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParameters {
    pub mode: Mode,
    pub quality: Quality,
    /// Keep every Nth decoded frame
    pub sample_rate: NonZeroU32,
    /// Return at most this many frames
    pub count: NonZeroUsize,
    /// Seconds that must separate any two returned frames
    pub min_interval: f64,
}

impl SelectionParameters {
    pub fn new(
        mode: Mode,
        quality: Quality,
        sample_rate: NonZeroU32,
        count: NonZeroUsize,
        min_interval: f64,
    ) -> Result<Self, ParamError> {
        if !min_interval.is_finite() || min_interval < 0.0 {
            return Err(ParamError::MinInterval(min_interval));
        }

        Ok(Self {
            mode,
            quality,
            sample_rate,
            count,
            min_interval,
        })
    }
}

impl Default for SelectionParameters {
    fn default() -> Self {
        Self {
            mode: Mode::Profile,
            quality: Quality::Balanced,
            sample_rate: NonZeroU32::new(30).expect("not zero"),
            count: NonZeroUsize::MIN,
            min_interval: 2.0,
        }
    }
}
