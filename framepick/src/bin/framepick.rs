use std::{
    ffi::OsString,
    fs::File,
    io::BufWriter,
    num::{NonZeroU32, NonZeroUsize},
    path::{Path, PathBuf},
    time::Instant,
};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use framepick::{
    face::FaceDetector,
    params::{Mode, Quality, SelectionParameters},
    pipeline::{self, PickError},
    report::{self, Report},
    sampler::{self, ErrorKind, VideoInfo},
    writer::{self, DEFAULT_JPEG_QUALITY},
};
use framepick_common::{
    bin_common::{
        init::{init_eyre, init_logger, verbosity_level},
        termination,
    },
    utils::fsutils::{create_parent_dir, read_optional_file},
};

const ARGS_FILE: &str = ".framepickrc";

#[derive(Parser, Debug)]
#[command(args_override_self = true)]
/// Extract the best frame(s) from a video for profile pictures or action shots.
///
/// Flags in `.framepickrc` in the current directory are read before the ones on the
/// command line. Scoring uses rayon, so `RAYON_NUM_THREADS` might be of interest.
struct Cli {
    /// Where to write the selected frame, numbered if there are several. Defaults to
    /// next to the video
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Profile looks for a face, action for activity
    #[arg(long, short = 'm', ignore_case = true, default_value_t = Mode::Profile)]
    mode: Mode,

    /// Analyze every Nth frame
    #[arg(long, short = 's', default_value = "30")]
    sample_rate: NonZeroU32,

    /// Analysis quality vs speed trade-off
    #[arg(long, short = 'q', ignore_case = true, default_value_t = Quality::Balanced)]
    quality: Quality,

    /// Number of frames to extract
    #[arg(long, short = 'c', default_value = "1")]
    count: NonZeroUsize,

    /// Minimum number of seconds between selected frames
    #[arg(long, short = 'i', default_value_t = 2.0)]
    min_interval: f64,

    /// A SeetaFace frontal detection model (seeta_fd_frontal_v1.0.bin) used to score
    /// faces in profile mode
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Only print what the container says about the video
    #[arg(long)]
    info: bool,

    /// Also write a report of the selection to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Log more, can be repeated
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// The video to pick frames from
    videofile: PathBuf,
}

fn cli_arguments() -> eyre::Result<Cli> {
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if let Some(flags) = read_optional_file(ARGS_FILE)
        .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
    {
        let program = args.remove(0);
        args = std::iter::once(program)
            .chain(flags.split_whitespace().map(OsString::from))
            .chain(args)
            .collect();
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    init_logger(cli.logfile.as_deref(), verbosity_level(cli.verbose))?;

    log::debug!("CLI arguments: {cli:#?}");

    if cli.info {
        let info = sampler::probe(&cli.videofile).wrap_err_with(|| {
            format!("Failed to read {}", cli.videofile.display())
        })?;
        print_info(&cli.videofile, &info);
        return Ok(());
    }

    let params = SelectionParameters::new(
        cli.mode,
        cli.quality,
        cli.sample_rate,
        cli.count,
        cli.min_interval,
    )
    .wrap_err("Invalid parameters")?;

    log::info!("Processing video: {}", cli.videofile.display());
    log::info!(
        "Mode: {}, quality: {}, looking for {} frame(s) at least {}s apart",
        params.mode,
        params.quality,
        params.count,
        params.min_interval
    );
    let face_detector = match (params.mode, &cli.face_model) {
        (Mode::Profile, Some(model)) => Some(load_face_detector(model)?),
        (Mode::Profile, None) => {
            log::warn!("No face model given, every frame gets a neutral face score");
            None
        }
        (Mode::Action, Some(_)) => {
            log::debug!("Faces are not scored in action mode, ignoring the face model");
            None
        }
        (Mode::Action, None) => None,
    };

    let info = match sampler::probe(&cli.videofile) {
        Ok(info) => Some(info),
        Err(e) => {
            log::debug!("Could not probe the video: {e}");
            None
        }
    };

    let term_cookie =
        termination::Cookie::new().wrap_err("failed to create term cookie")?;

    let before = Instant::now();
    let picked = match pipeline::pick_until(&cli.videofile, &params, face_detector, || {
        term_cookie.is_terminating()
    }) {
        Err(PickError::Extract(e)) if e.kind() == ErrorKind::Cancelled => {
            log::warn!("Termination signal received, nothing was saved");
            return Ok(());
        }
        res => res.wrap_err_with(|| {
            format!("Failed to process {}", cli.videofile.display())
        })?,
    };
    log::info!(
        "Analyzed {} frames and selected {} in {}",
        picked.sampled,
        picked.frames.len(),
        humantime::format_duration(truncate_millis(before.elapsed()))
    );

    let paths = writer::output_paths(
        &cli.videofile,
        cli.output.as_deref(),
        params.count,
        picked.frames.len(),
    );

    let mut report = Report::new(&cli.videofile, &params, picked.face_detection);
    report.info = info;
    report.sampled = picked.sampled;

    let mut saved = 0;
    for (i, (candidate, path)) in picked.frames.iter().zip(paths).enumerate() {
        let res = create_parent_dir(&path)
            .map_err(eyre::Report::from)
            .and_then(|()| {
                writer::save_jpeg(&candidate.frame.image, &path, DEFAULT_JPEG_QUALITY)
                    .map_err(eyre::Report::from)
            });
        match res {
            Ok(()) => {
                saved += 1;
                println!(
                    "Frame {}: {} (score {:.3}, at {:.2}s)",
                    i + 1,
                    path.display(),
                    candidate.score,
                    candidate.timestamp
                );
                report.push(candidate, Some(path));
            }
            Err(e) => {
                log::error!("Failed to save frame {}: {e:?}", i + 1);
                report.push(candidate, None);
            }
        }
    }

    if let Some(report_path) = &cli.report {
        write_report(report_path, &report)?;
    }

    if saved == 0 {
        eyre::bail!("No frames were saved");
    }
    log::info!("Saved {saved} frame(s)");

    Ok(())
}

#[cfg(feature = "face-detection")]
fn load_face_detector(model: &Path) -> eyre::Result<Box<dyn FaceDetector>> {
    let detector = framepick::face::seeta::SeetaFaceDetector::load(model)
        .wrap_err("Failed to set up face detection")?;
    Ok(Box::new(detector))
}

#[cfg(not(feature = "face-detection"))]
fn load_face_detector(_model: &Path) -> eyre::Result<Box<dyn FaceDetector>> {
    eyre::bail!("Built without the face-detection feature, --face-model is not supported")
}

fn write_report(path: &Path, report: &Report) -> eyre::Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create report at {}", path.display()))?;
    report::save_to(BufWriter::new(file), report).wrap_err("Failed to write the report")?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}

fn print_info(path: &Path, info: &VideoInfo) {
    println!("File: {}", path.display());
    println!("Size: {}x{}", info.width, info.height);
    println!("Frame rate: {:.3} fps", info.fps);
    println!("Frames: {}", info.frame_count);
    match info.duration {
        Some(secs) => println!("Duration: {secs:.2}s"),
        None => println!("Duration: unknown"),
    }
}

fn truncate_millis(dur: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(dur.as_millis() as u64)
}
