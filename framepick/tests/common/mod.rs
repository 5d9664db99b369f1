// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Once,
};

use tempfile::{NamedTempFile, TempPath};

pub const TEST_VIDEO_SECS: u64 = 10;
pub const TEST_VIDEO_FPS: u64 = 30;
pub const TEST_VIDEO_FRAMES: usize = (TEST_VIDEO_SECS * TEST_VIDEO_FPS) as usize;

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// Returns a named temporary file inside cargo's tmpdir
pub fn tmp_file() -> TempPath {
    NamedTempFile::new_in(cargo_tmpdir())
        .expect("could not create temporary file")
        .into_temp_path()
}

fn ffmpeg(args: &[&str], output: &Path) {
    let status = std::process::Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error"])
        .args(args)
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status()
        .expect("failed to execute ffmpeg");
    assert!(status.success(), "ffmpeg failed to create {}", output.display());
}

/// A ten second, 30 fps test pattern with a moving gradient, created once per test
/// binary.
pub fn test_video() -> PathBuf {
    let video = cargo_tmpdir().join("framepick-testsrc.mkv");

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let src = format!("testsrc=duration={TEST_VIDEO_SECS}:rate={TEST_VIDEO_FPS}");
        ffmpeg(&["-f", "lavfi", "-i", &src], &video);
    });

    video
}

/// A file that is definitely not a video
pub fn not_a_video() -> TempPath {
    let path = tmp_file();
    std::fs::write(&path, "these are not the frames you are looking for")
        .expect("could not write the file");
    path
}

const Y4M_WIDTH: usize = 64;
const Y4M_HEIGHT: usize = 48;
/// Good frames in [`corrupt_video`] before the broken one
pub const CORRUPT_AFTER: u64 = 60;

const Y4M_HEADER: &str = "YUV4MPEG2 W64 H48 F30:1 Ip A1:1 C420jpeg\n";
const Y4M_FRAME_LEN: usize = Y4M_WIDTH * Y4M_HEIGHT * 3 / 2;

fn y4m_file() -> NamedTempFile {
    tempfile::Builder::new()
        .suffix(".y4m")
        .tempfile_in(cargo_tmpdir())
        .expect("could not create temporary file")
}

/// A gray gradient that moves one pixel per frame
fn y4m_frame(index: usize) -> Vec<u8> {
    let mut frame = vec![128; Y4M_FRAME_LEN];
    for (i, luma) in frame[..Y4M_WIDTH * Y4M_HEIGHT].iter_mut().enumerate() {
        *luma = ((i % Y4M_WIDTH + index) * 3 % 256) as u8;
    }
    frame
}

/// A valid video stream without a single frame in it
pub fn empty_video() -> TempPath {
    let mut file = y4m_file();
    file.write_all(Y4M_HEADER.as_bytes())
        .expect("could not write the file");
    file.into_temp_path()
}

/// [`CORRUPT_AFTER`] good frames, followed by a frame with a broken header and then
/// garbage without any line breaks.
pub fn corrupt_video() -> TempPath {
    let mut file = y4m_file();
    let mut write = |bytes: &[u8]| {
        file.write_all(bytes)
            .expect("could not write the file")
    };

    write(Y4M_HEADER.as_bytes());
    for i in 0..CORRUPT_AFTER as usize {
        write(b"FRAME\n");
        write(&y4m_frame(i));
    }
    write(b"GARBAGE\n");
    for _ in 0..10 {
        write(&[0x80; Y4M_FRAME_LEN]);
    }

    file.into_temp_path()
}
