extern crate ffmpeg_next as ffmpeg;

use std::path::Path;

use ffmpeg::codec::Context as CodecContext;

use super::decoder::{self, Rotation};
use super::ExtractError;

/// What the container says about the video, without decoding anything.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoInfo {
    /// Zero if unknown
    pub fps: f64,
    /// Zero if unknown. Estimated from the duration if the container doesn't store it.
    pub frame_count: u64,
    /// Sides of the frames as they are displayed, i.e., after undoing any rotation
    pub width: u32,
    pub height: u32,
    /// Seconds
    pub duration: Option<f64>,
}

pub fn probe(path: impl AsRef<Path>) -> Result<VideoInfo, ExtractError> {
    let (ictx, index) = decoder::open(path.as_ref())?;
    let video = ictx
        .stream(index)
        .expect("the index came from the same context");

    let fps = decoder::stream_fps(&video);
    let codec = CodecContext::from_parameters(video.parameters())
        .and_then(|ctx| ctx.decoder().video())
        .map_err(ExtractError::NoDecoder)?;
    let (width, height) = if Rotation::of(&video).swaps_sides() {
        (codec.height(), codec.width())
    } else {
        (codec.width(), codec.height())
    };

    // AV_NOPTS_VALUE is negative
    let container_duration = (ictx.duration() > 0)
        .then(|| ictx.duration() as f64 / f64::from(ffmpeg_sys_next::AV_TIME_BASE));
    let frame_count = match video.frames() {
        n if n > 0 => n as u64,
        _ => match container_duration {
            Some(secs) if fps > 0.0 => (secs * fps).round() as u64,
            _ => 0,
        },
    };
    let duration = container_duration
        .or_else(|| (fps > 0.0).then(|| frame_count as f64 / fps));

    let info = VideoInfo {
        fps,
        frame_count,
        width,
        height,
        duration,
    };
    log::debug!("Probed {}: {info:?}", path.as_ref().display());
    Ok(info)
}
