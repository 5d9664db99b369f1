pub mod filters;

use framepick_common::utils::{
    imgutils::{self, center_third, gray_stats, quadrants, region_stats},
    math::{unit, Stats},
};
use image::{GrayImage, RgbImage};

use crate::{
    face::{self, FaceDetector},
    params::{Focus, Mode, Quality, QualitySettings},
};

/// Gray level that is considered perfectly exposed
const MID_GRAY: f64 = 127.0;
/// Standard deviation that counts as full contrast
const FULL_CONTRAST: f64 = 80.0;
/// Standard deviation of the center region that counts as a fully busy center
const FULL_CENTER_ACTIVITY: f64 = 50.0;
/// A quadrant with a larger standard deviation than this has something going on
const ACTIVE_QUADRANT: f64 = 20.0;
/// Hysteresis thresholds for the edge detector
const CANNY_LOW: i32 = 50;
const CANNY_HIGH: i32 = 150;
/// Edge density is multiplied by this before clamping
const EDGE_DENSITY_SCALE: f64 = 5.0;

/// Every metric that went into a score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreBreakdown {
    pub sharpness: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// Face score in profile mode, motion score in action mode
    pub subject: f64,
    pub composition: f64,
    /// The weighted sum of the above
    pub total: f64,
}

pub fn sharpness(gray: &GrayImage, blur_threshold: f64) -> f64 {
    unit(filters::laplacian_variance(gray) / blur_threshold)
}

pub fn brightness(stats: &Stats) -> f64 {
    unit(1.0 - (stats.mean() - MID_GRAY).abs() / MID_GRAY)
}

pub fn contrast(stats: &Stats) -> f64 {
    unit(stats.std_dev() / FULL_CONTRAST)
}

/// Lots of edges is taken as a sign of lots of action.
pub fn motion(gray: &GrayImage) -> f64 {
    unit(filters::edge_density(gray, CANNY_LOW, CANNY_HIGH) * EDGE_DENSITY_SCALE)
}

pub fn composition(gray: &GrayImage, focus: Focus) -> f64 {
    match focus {
        Focus::Center => {
            let center = center_third(gray.width(), gray.height());
            unit(region_stats(gray, center).std_dev() / FULL_CENTER_ACTIVITY)
        }
        Focus::Dynamic => {
            let active = quadrants(gray.width(), gray.height())
                .into_iter()
                .filter(|quad| region_stats(gray, *quad).std_dev() > ACTIVE_QUADRANT)
                .count();
            active as f64 / 4.0
        }
    }
}

/// Scores single frames. Holds no mutable state, so one scorer can be shared by any
/// number of threads.
pub struct FrameScorer {
    mode: Mode,
    settings: QualitySettings,
    face_detector: Option<Box<dyn FaceDetector>>,
}

impl FrameScorer {
    pub fn new(
        mode: Mode,
        quality: Quality,
        face_detector: Option<Box<dyn FaceDetector>>,
    ) -> Self {
        Self {
            mode,
            settings: quality.settings(),
            face_detector,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether scoring asks a face detector, which only happens in profile mode.
    pub fn detects_faces(&self) -> bool {
        self.mode == Mode::Profile && self.face_detector.is_some()
    }

    pub fn score(&self, image: &RgbImage) -> ScoreBreakdown {
        let gray = imgutils::luma(image);
        let stats = gray_stats(&gray);

        let sharpness = sharpness(&gray, self.settings.blur_threshold);
        let brightness = brightness(&stats);
        let contrast = contrast(&stats);
        let subject = match self.mode {
            Mode::Profile => face::detect_and_score(
                self.face_detector.as_deref(),
                &gray,
                self.settings.face_min_size,
            ),
            Mode::Action => motion(&gray),
        };
        let composition = composition(&gray, self.mode.focus());

        let weights = self.mode.weights();
        let total = sharpness * weights.sharpness
            + brightness * weights.brightness
            + contrast * weights.contrast
            + subject * weights.subject
            + composition * weights.composition;

        ScoreBreakdown {
            sharpness,
            brightness,
            contrast,
            subject,
            composition,
            total,
        }
    }
}

#[cfg(test)]
mod test {
    use framepick_common::utils::imgutils::{filled, BLACK, WHITE};
    use image::{Luma, Rgb};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;
    use crate::face::FaceBox;

    fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
        let mut rng = SmallRng::seed_from_u64(seed);
        RgbImage::from_fn(width, height, |_, _| {
            let v = if rng.gen::<bool>() { WHITE } else { BLACK };
            Rgb([v, v, v])
        })
    }

    fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if (x / cell + y / cell) % 2 == 0 { BLACK } else { WHITE }])
        })
    }

    fn in_unit(breakdown: &ScoreBreakdown) -> bool {
        [
            breakdown.sharpness,
            breakdown.brightness,
            breakdown.contrast,
            breakdown.subject,
            breakdown.composition,
            breakdown.total,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }

    #[test]
    fn uniform_mid_gray() {
        let img = filled(64, 48, 127, 127, 127);
        let score = FrameScorer::new(Mode::Profile, Quality::Balanced, None).score(&img);
        assert_eq!(1.0, score.brightness);
        assert_eq!(0.0, score.sharpness);
        assert_eq!(0.0, score.contrast);
        assert_eq!(0.0, score.composition);
        assert_eq!(face::NEUTRAL_SCORE, score.subject);
        assert!((score.total - (0.2 + 0.2 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn extremes_are_dark_and_bright() {
        let black = gray_stats(&imgutils::luma(&filled(8, 8, BLACK, BLACK, BLACK)));
        assert_eq!(0.0, brightness(&black));

        // the mean is 128 away from the middle, that would be slightly negative
        let white = gray_stats(&imgutils::luma(&filled(8, 8, WHITE, WHITE, WHITE)));
        assert_eq!(0.0, brightness(&white));
    }

    #[test]
    fn noise_is_sharp_and_contrasty() {
        let gray = imgutils::luma(&noise(64, 64, 1));
        assert_eq!(1.0, sharpness(&gray, 200.0));
        assert_eq!(1.0, contrast(&gray_stats(&gray)));
    }

    #[test]
    fn blurrier_is_less_sharp() {
        let gray = imgutils::luma(&noise(64, 64, 2));
        let blurred = image::imageops::blur(&gray, 3.0);
        assert!(
            filters::laplacian_variance(&blurred) < filters::laplacian_variance(&gray)
        );
    }

    #[test]
    fn busy_quadrants() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([127]));
        assert_eq!(0.0, composition(&img, Focus::Dynamic));

        let board = checkerboard(20, 20, 2);
        image::imageops::replace(&mut img, &board, 0, 0);
        assert_eq!(0.25, composition(&img, Focus::Dynamic));

        let img = checkerboard(40, 40, 2);
        assert_eq!(1.0, composition(&img, Focus::Dynamic));
    }

    #[test]
    fn busy_center() {
        let mut img = GrayImage::from_pixel(30, 30, Luma([127]));
        // a checkerboard outside of the center does not count
        image::imageops::replace(&mut img, &checkerboard(10, 10, 1), 0, 0);
        assert_eq!(0.0, composition(&img, Focus::Center));

        image::imageops::replace(&mut img, &checkerboard(10, 10, 1), 10, 10);
        assert_eq!(1.0, composition(&img, Focus::Center));
    }

    #[test]
    fn edges_mean_motion() {
        let flat = GrayImage::from_pixel(40, 40, Luma([60]));
        assert_eq!(0.0, motion(&flat));
        let busy = motion(&checkerboard(40, 40, 4));
        assert!(busy > 0.0 && busy <= 1.0);
    }

    #[test]
    fn action_mode_uses_motion() {
        let img = noise(48, 48, 3);
        let score = FrameScorer::new(Mode::Action, Quality::Fast, None).score(&img);
        assert!(in_unit(&score));
        assert_eq!(motion(&imgutils::luma(&img)), score.subject);
    }

    #[test]
    fn action_mode_never_asks_for_faces() {
        let detector = |_: &GrayImage, _: u32| -> Vec<FaceBox> {
            panic!("should not be called in action mode")
        };
        let scorer =
            FrameScorer::new(Mode::Action, Quality::Best, Some(Box::new(detector)));
        assert!(!scorer.detects_faces());
        scorer.score(&filled(16, 16, 10, 20, 30));
    }

    #[test]
    fn face_detector_is_used() {
        let detector = |gray: &GrayImage, _: u32| {
            vec![FaceBox {
                x: 0,
                y: 0,
                width: gray.width() / 3,
                height: gray.height() / 3,
            }]
        };
        let scorer =
            FrameScorer::new(Mode::Profile, Quality::Balanced, Some(Box::new(detector)));
        assert!(scorer.detects_faces());
        assert_eq!(1.0, scorer.score(&filled(60, 60, 1, 2, 3)).subject);
    }

    #[test]
    fn always_within_bounds() {
        for seed in 0..5 {
            let img = noise(32, 24, seed);
            for mode in [Mode::Profile, Mode::Action] {
                for quality in [Quality::Fast, Quality::Balanced, Quality::Best] {
                    let score = FrameScorer::new(mode, quality, None).score(&img);
                    assert!(in_unit(&score), "{score:?}");
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        let img = noise(40, 30, 9);
        let scorer = FrameScorer::new(Mode::Action, Quality::Balanced, None);
        assert_eq!(scorer.score(&img), scorer.score(&img));
    }
}
