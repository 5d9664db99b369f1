//! Decodes a video once and keeps every Nth frame.

mod decoder;
pub mod probe;

use std::{num::NonZeroU32, path::Path};

use image::RgbImage;

use decoder::VideoDecoder;
pub use probe::{probe, VideoInfo};

/// A decoded frame and where in the video it came from.
#[derive(Clone)]
pub struct SampledFrame {
    pub image: RgbImage,
    /// Seconds from the start of the video
    pub timestamp: f64,
    /// Position among all decoded frames, not only the sampled ones
    pub frame_number: u64,
}

impl std::fmt::Debug for SampledFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampledFrame")
            .field("frame_number", &self.frame_number)
            .field("timestamp", &self.timestamp)
            .field(
                "image",
                &format_args!("{}x{}", self.image.width(), self.image.height()),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file is not something that can be decoded
    Open,
    /// Decoding stopped halfway through
    Decode,
    /// The caller asked to stop
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to initialize ffmpeg")]
    Init(#[source] ffmpeg_next::Error),
    #[error("could not open the file as a video")]
    Open(#[source] ffmpeg_next::Error),
    #[error("the file does not have a video stream")]
    NoVideoStream,
    #[error("no usable decoder for the video stream")]
    NoDecoder(#[source] ffmpeg_next::Error),
    #[error("the video stream does not have a pixel format")]
    NoPixelFormat,
    #[error("failed to decode frame {frame_number}")]
    Decode {
        frame_number: u64,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("cancelled before frame {frame_number}")]
    Cancelled { frame_number: u64 },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Init(_)
            | ExtractError::Open(_)
            | ExtractError::NoVideoStream
            | ExtractError::NoDecoder(_)
            | ExtractError::NoPixelFormat => ErrorKind::Open,
            ExtractError::Decode { .. } => ErrorKind::Decode,
            ExtractError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

/// Seconds since the start. Everything is at zero if the frame rate is unknown.
pub fn timestamp_of(frame_number: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        frame_number as f64 / fps
    } else {
        0.0
    }
}

/// One pass over a video, keeping every `sample_rate`th frame starting with the first.
pub struct FrameSampler {
    decoder: VideoDecoder,
    sample_rate: NonZeroU32,
}

impl FrameSampler {
    /// Opens the video. Fails with an [`ErrorKind::Open`] error if it can't be decoded.
    pub fn new(
        path: impl AsRef<Path>,
        sample_rate: NonZeroU32,
    ) -> Result<Self, ExtractError> {
        let decoder = VideoDecoder::new(path.as_ref())?;
        Ok(Self {
            decoder,
            sample_rate,
        })
    }

    /// The frame rate the timestamps are based on
    pub fn fps(&self) -> f64 {
        self.decoder.fps()
    }

    pub fn sample(self) -> Result<Vec<SampledFrame>, ExtractError> {
        self.sample_until(|| false)
    }

    /// Like [`FrameSampler::sample`], but checks `should_stop` before every decoded
    /// frame and gives up with [`ExtractError::Cancelled`] if it returns true.
    ///
    /// Nothing is returned if something goes wrong, not even the frames sampled so far.
    pub fn sample_until(
        mut self,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Vec<SampledFrame>, ExtractError> {
        let rate = u64::from(self.sample_rate.get());
        let fps = self.decoder.fps();
        let mut frames = Vec::new();
        let mut frame_number: u64 = 0;

        loop {
            if should_stop() {
                return Err(ExtractError::Cancelled { frame_number });
            }

            let decode_error = |source| ExtractError::Decode {
                frame_number,
                source,
            };
            let Some(frame) = self.decoder.next_frame().map_err(decode_error)? else {
                break;
            };

            if frame_number % rate == 0 {
                let image = self.decoder.to_rgb(&frame).map_err(decode_error)?;
                frames.push(SampledFrame {
                    image,
                    timestamp: timestamp_of(frame_number, fps),
                    frame_number,
                });
            }
            frame_number += 1;
        }

        log::debug!(
            "Kept {} of {} decoded frames at {:.3} fps",
            frames.len(),
            frame_number,
            fps
        );
        Ok(frames)
    }
}

/// Decodes the whole video and returns every `sample_rate`th frame, ordered by time.
pub fn extract_frames(
    video_path: impl AsRef<Path>,
    sample_rate: NonZeroU32,
) -> Result<Vec<SampledFrame>, ExtractError> {
    FrameSampler::new(video_path, sample_rate)?.sample()
}
