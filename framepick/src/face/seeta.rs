//! Frontal face detection with the SeetaFace funnel-structured cascade, as implemented
//! by `rustface`. The model is not bundled, point [`SeetaFaceDetector::load`] at a
//! `seeta_fd_frontal_v1.0.bin`.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use image::GrayImage;
use rustface::{Detector, ImageData};

use super::{FaceBox, FaceDetector};

/// rustface can't look for smaller faces than this
const SMALLEST_FACE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE: f32 = 0.8;
const WINDOW_STEP: u32 = 4;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // rustface detectors are neither Send nor Sync, so each scoring thread loads its
    // own copy on first use
    static LOADED: RefCell<Option<(u64, Box<dyn Detector>)>> = RefCell::new(None);
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("the face model path is not UTF-8: {0:?}")]
    NotUtf8(PathBuf),
    #[error("failed to load the face model at {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },
}

pub struct SeetaFaceDetector {
    model: String,
    id: u64,
}

impl SeetaFaceDetector {
    /// Reads the model once to make sure it is usable.
    pub fn load(model: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = model.as_ref();
        let model = path
            .to_str()
            .ok_or_else(|| ModelError::NotUtf8(path.to_owned()))?
            .to_owned();

        load_detector(&model).map_err(|reason| ModelError::Load {
            path: path.to_owned(),
            reason,
        })?;
        log::debug!("Loaded face model {}", path.display());

        Ok(Self {
            model,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        })
    }
}

fn load_detector(model: &str) -> Result<Box<dyn Detector>, String> {
    let mut detector = rustface::create_detector(model).map_err(|e| e.to_string())?;
    detector.set_score_thresh(SCORE_THRESHOLD);
    detector.set_pyramid_scale_factor(PYRAMID_SCALE);
    detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);
    Ok(detector)
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&self, gray: &GrayImage, min_size: u32) -> Vec<FaceBox> {
        let (width, height) = gray.dimensions();
        let min_size = min_size.max(SMALLEST_FACE);
        if width < min_size || height < min_size {
            return Vec::new();
        }

        LOADED.with(|loaded| {
            let mut loaded = loaded.borrow_mut();
            if !matches!(&*loaded, Some((id, _)) if *id == self.id) {
                match load_detector(&self.model) {
                    Ok(detector) => *loaded = Some((self.id, detector)),
                    Err(reason) => {
                        let model = &self.model;
                        log::warn!("Could not load the face model {model}: {reason}");
                        return Vec::new();
                    }
                }
            }
            let Some((_, detector)) = loaded.as_mut() else {
                return Vec::new();
            };

            detector.set_min_face_size(min_size);
            let image = ImageData::new(gray.as_raw(), width, height);
            detector
                .detect(&image)
                .iter()
                .filter_map(|face| {
                    let bbox = face.bbox();
                    clip(bbox.x(), bbox.y(), bbox.width(), bbox.height(), width, height)
                })
                .collect()
        })
    }
}

/// Detections may reach outside the picture. Keeps the part that is inside.
fn clip(
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    pic_width: u32,
    pic_height: u32,
) -> Option<FaceBox> {
    let left = x.max(0) as i64;
    let top = y.max(0) as i64;
    let right = (x as i64 + w as i64).min(pic_width as i64);
    let bottom = (y as i64 + h as i64).min(pic_height as i64);
    if right <= left || bottom <= top {
        return None;
    }

    Some(FaceBox {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}
