use std::path::{Path, PathBuf};

use crate::{
    params::{Mode, Quality, SelectionParameters},
    sampler::VideoInfo,
    scoring::ScoreBreakdown,
    selector::ScoredCandidate,
};

/// One selected frame and where it was written
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportFrame {
    pub path: Option<PathBuf>,
    pub frame_number: u64,
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub score: ScoreBreakdown,
}

/// Everything about one run, for humans or other programs to look at afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub video: PathBuf,
    pub info: Option<VideoInfo>,
    pub mode: Mode,
    pub quality: Quality,
    pub sample_rate: u32,
    pub count: usize,
    pub min_interval: f64,
    pub face_detection: bool,
    pub sampled: usize,
    pub frames: Vec<ReportFrame>,
}

impl Report {
    pub fn new(video: &Path, params: &SelectionParameters, face_detection: bool) -> Self {
        Self {
            video: video.to_owned(),
            info: None,
            mode: params.mode,
            quality: params.quality,
            sample_rate: params.sample_rate.get(),
            count: params.count.get(),
            min_interval: params.min_interval,
            face_detection,
            sampled: 0,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, candidate: &ScoredCandidate, path: Option<PathBuf>) {
        self.frames.push(ReportFrame {
            path,
            frame_number: candidate.frame.frame_number,
            timestamp: candidate.timestamp,
            width: candidate.frame.image.width(),
            height: candidate.frame.image.height(),
            score: candidate.breakdown,
        });
    }
}

pub fn save_to(writer: impl std::io::Write, report: &Report) -> ron::Result<()> {
    let conf = ron::ser::PrettyConfig::new().struct_names(true);
    ron::ser::to_writer_pretty(writer, report, conf)
}

pub fn read_from(reader: impl std::io::Read) -> ron::error::SpannedResult<Report> {
    ron::de::from_reader(reader)
}
