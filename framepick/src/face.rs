use image::GrayImage;

#[cfg(feature = "face-detection")]
pub mod seeta;

/// Score used when there is no detector to ask.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Faces covering this fraction of the picture make a good profile picture.
const GOOD_FACE_RATIO: std::ops::RangeInclusive<f64> = 0.05..=0.30;

/// Where a detector found a face, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Something that can find faces in a grayscale picture. With the `face-detection`
/// feature, [`seeta::SeetaFaceDetector`] is one.
///
/// Frames are scored in parallel, so a detector is shared between threads.
pub trait FaceDetector: Send + Sync {
    /// Find all faces whose sides are at least `min_size` pixels.
    fn detect(&self, gray: &GrayImage, min_size: u32) -> Vec<FaceBox>;
}

impl<F> FaceDetector for F
where
    F: Fn(&GrayImage, u32) -> Vec<FaceBox> + Send + Sync,
{
    fn detect(&self, gray: &GrayImage, min_size: u32) -> Vec<FaceBox> {
        self(gray, min_size)
    }
}

/// How good the detected faces are for a profile picture. One face of a reasonable size
/// is the best, no face at all is the worst.
pub fn face_score(faces: &[FaceBox], width: u32, height: u32) -> f64 {
    match faces {
        [] => 0.1,
        [face] => {
            let picture = width as u64 * height as u64;
            if picture == 0 {
                return 0.7;
            }
            let ratio = face.area() as f64 / picture as f64;
            if GOOD_FACE_RATIO.contains(&ratio) {
                1.0
            } else {
                0.7
            }
        }
        _ => 0.6,
    }
}

/// Runs the detector if there is one, otherwise returns [`NEUTRAL_SCORE`].
pub fn detect_and_score(
    detector: Option<&dyn FaceDetector>,
    gray: &GrayImage,
    min_size: u32,
) -> f64 {
    match detector {
        Some(detector) => {
            let faces = detector.detect(gray, min_size);
            log::trace!("Found {} faces", faces.len());
            face_score(&faces, gray.width(), gray.height())
        }
        None => NEUTRAL_SCORE,
    }
}
