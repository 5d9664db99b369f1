extern crate ffmpeg_next as ffmpeg;

use std::path::Path;
use std::sync::OnceLock;

use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as DecoderVideo;
use ffmpeg::format::context::Input as FormatContext;
use ffmpeg::format::{input_with_dictionary, Pixel};
use ffmpeg::frame::Video as FrameVideo;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::context::Context as ScalingContext;
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::{Dictionary, Packet, Rational};
use image::RgbImage;

use super::ExtractError;

static FFMPEG_INITIALIZED: OnceLock<Result<(), ffmpeg::Error>> = OnceLock::new();

pub(crate) fn init() -> Result<(), ExtractError> {
    FFMPEG_INITIALIZED
        .get_or_init(|| {
            ffmpeg::init()?;
            ffmpeglog::set_level(ffmpeglog::Level::Error);
            Ok(())
        })
        .clone()
        .map_err(ExtractError::Init)
}

/// Opens the container and finds the best video stream in it.
pub(crate) fn open(path: &Path) -> Result<(FormatContext, usize), ExtractError> {
    init()?;

    let options = {
        let mut options = Dictionary::new();
        options.set("analyzeduration", "10M");
        options.set("probesize", "5M");
        options
    };
    let ictx = input_with_dictionary(path, options).map_err(ExtractError::Open)?;
    let index = ictx
        .streams()
        .best(Type::Video)
        .ok_or(ExtractError::NoVideoStream)?
        .index();
    Ok((ictx, index))
}

/// Frames per second according to the container, zero if it doesn't know.
pub(crate) fn stream_fps(stream: &ffmpeg::Stream) -> f64 {
    let valid = |r: &Rational| r.numerator() > 0 && r.denominator() > 0;
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .find(valid)
        .map(f64::from)
        .unwrap_or(0.0)
}

/// Decodes every frame of one video stream, in order, exactly once.
pub(crate) struct VideoDecoder {
    ictx: FormatContext,
    decoder: DecoderVideo,
    converter: ScalingContext,
    video_stream_index: usize,
    rotation: Rotation,
    eof_sent: bool,
    fps: f64,
}

impl VideoDecoder {
    pub(crate) fn new(path: &Path) -> Result<Self, ExtractError> {
        let (mut ictx, video_stream_index) = open(path)?;

        let video = ictx
            .stream(video_stream_index)
            .expect("the index came from the same context");
        let fps = stream_fps(&video);
        let rotation = Rotation::of(&video);

        let decoder = CodecContext::from_parameters(video.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(ExtractError::NoDecoder)?;

        if decoder.format() == Pixel::None {
            return Err(ExtractError::NoPixelFormat);
        }
        let converter = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::FAST_BILINEAR,
        )
        .map_err(ExtractError::NoDecoder)?;

        ictx.streams_mut()
            .filter(|stream| stream.index() != video_stream_index)
            .for_each(|mut stream| stream_set_discard_all(&mut stream));

        Ok(Self {
            ictx,
            decoder,
            converter,
            video_stream_index,
            rotation,
            eof_sent: false,
            fps,
        })
    }

    pub(crate) fn fps(&self) -> f64 {
        self.fps
    }

    /// The next decoded frame, in whatever pixel format the codec produces. `None`
    /// when the stream is exhausted.
    pub(crate) fn next_frame(&mut self) -> Result<Option<FrameVideo>, ffmpeg::Error> {
        loop {
            let mut frame = FrameVideo::empty();
            // https://ffmpeg.org/doxygen/trunk/group__lavc__decoding.html#ga11e6542c4e66d3028668788a1a74217c
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => return Ok(Some(frame)),
                Err(ffmpeg::Error::Other {
                    errno: libc::EAGAIN,
                }) if !self.eof_sent => (),
                Err(ffmpeg::Error::Other {
                    errno: libc::EAGAIN,
                })
                | Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(e) => return Err(e),
            }

            self.send_next_packet()?;
        }
    }

    fn send_next_packet(&mut self) -> Result<(), ffmpeg::Error> {
        loop {
            // http://ffmpeg.org/doxygen/trunk/group__lavf__decoding.html#ga4fdb3084415a82e3810de6ee60e46a61
            let mut packet = Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) if packet.stream() == self.video_stream_index => {
                    return self.decoder.send_packet(&packet);
                }
                Ok(()) => continue,
                Err(ffmpeg::Error::Eof) => {
                    self.eof_sent = true;
                    return self.decoder.send_eof();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Converts a decoded frame to an upright RGB picture.
    pub(crate) fn to_rgb(
        &mut self,
        frame: &FrameVideo,
    ) -> Result<RgbImage, ffmpeg::Error> {
        let mut converted = FrameVideo::empty();
        self.converter.run(frame, &mut converted)?;
        let img = packed_rgb(&converted).ok_or(ffmpeg::Error::InvalidData)?;
        Ok(self.rotation.undo(img))
    }
}

/// Copies the RGB24 plane into an image, dropping any row padding.
fn packed_rgb(frame: &FrameVideo) -> Option<RgbImage> {
    if frame.format() != Pixel::RGB24 || frame.planes() != 1 {
        return None;
    }

    let (width, height) = (frame.width(), frame.height());
    let row_len = 3 * width as usize;
    let stride = frame.stride(0);
    if stride < row_len {
        return None;
    }

    let mut buf = Vec::with_capacity(row_len * height as usize);
    for row in frame.data(0).chunks(stride).take(height as usize) {
        buf.extend_from_slice(row.get(..row_len)?);
    }
    RgbImage::from_raw(width, height, buf)
}

/// How the stored picture has to be turned to be displayed upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rotation {
    Upright,
    Left,
    Right,
    Upside,
}

impl Rotation {
    pub(crate) fn of(video: &ffmpeg::Stream) -> Self {
        for data in video.side_data() {
            if data.kind() != ffmpeg::packet::side_data::Type::DisplayMatrix {
                continue;
            }
            let matrix = data.data().as_ptr() as *const i32;
            let degrees = unsafe { ffmpeg_sys_next::av_display_rotation_get(matrix) };
            if !degrees.is_finite() {
                continue;
            }

            return match degrees.round() as i32 {
                0 => Rotation::Upright,
                90 => Rotation::Left,
                -90 => Rotation::Right,
                180 | -180 => Rotation::Upside,
                other => {
                    log::warn!("Ignoring an unsupported rotation of {other} degrees");
                    Rotation::Upright
                }
            };
        }

        Rotation::Upright
    }

    pub(crate) fn swaps_sides(self) -> bool {
        matches!(self, Rotation::Left | Rotation::Right)
    }

    fn undo(self, img: RgbImage) -> RgbImage {
        match self {
            Rotation::Upright => img,
            Rotation::Right => image::imageops::rotate90(&img),
            Rotation::Left => image::imageops::rotate270(&img),
            Rotation::Upside => image::imageops::rotate180(&img),
        }
    }
}

fn stream_set_discard_all(stream: &mut ffmpeg::StreamMut<'_>) {
    // SAFETY: the pointer comes from a live stream owned by the format context
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}
