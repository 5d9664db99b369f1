//! Writes chosen frames to disk.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use framepick_common::utils::fsutils::with_default_extension;
use image::{codecs::jpeg::JpegEncoder, RgbImage};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("could not write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode {} as jpeg", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), SaveError> {
    let io_error = |source| SaveError::Io {
        path: path.to_owned(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(image)
        .map_err(|source| SaveError::Encode {
            path: path.to_owned(),
            source,
        })?;
    writer.flush().map_err(io_error)?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Where to write `n` frames taken from `video` when `count` were asked for.
///
/// Asking for one frame gives `output` (with a ".jpg" extension if it has none) or
/// `<video stem>_best_frame.jpg` next to the video. Asking for more always numbers the
/// files from 01: `<output stem>_NN.jpg` or `<video stem>_frame_NN.jpg`.
pub fn output_paths(
    video: &Path,
    output: Option<&Path>,
    count: NonZeroUsize,
    n: usize,
) -> Vec<PathBuf> {
    let video_dir = video.parent().unwrap_or(Path::new(""));
    let video_stem = video.file_stem().unwrap_or(video.as_os_str()).to_string_lossy();

    if count.get() == 1 {
        let single = match output {
            Some(output) => with_default_extension(output, "jpg"),
            None => video_dir.join(format!("{video_stem}_best_frame.jpg")),
        };
        return std::iter::repeat(single).take(n.min(1)).collect();
    }

    (1..=n)
        .map(|i| match output {
            Some(output) => {
                let dir = output.parent().unwrap_or(Path::new(""));
                let stem = match output.extension() {
                    Some(_) => output.file_stem(),
                    None => output.file_name(),
                };
                let stem = stem.unwrap_or(output.as_os_str()).to_string_lossy();
                dir.join(format!("{stem}_{i:02}.jpg"))
            }
            None => video_dir.join(format!("{video_stem}_frame_{i:02}.jpg")),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use framepick_common::utils::imgutils::filled;

    use super::*;

    fn count(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn paths(strs: &[&str]) -> Vec<PathBuf> {
        strs.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn single_next_to_video() {
        assert_eq!(
            paths(&["vids/cat_best_frame.jpg"]),
            output_paths(Path::new("vids/cat.mp4"), None, count(1), 1)
        );
        assert_eq!(
            paths(&["cat_best_frame.jpg"]),
            output_paths(Path::new("cat.mp4"), None, count(1), 1)
        );
    }

    #[test]
    fn single_given_output() {
        assert_eq!(
            paths(&["out/me.jpg"]),
            output_paths(Path::new("cat.mp4"), Some(Path::new("out/me")), count(1), 1)
        );
        assert_eq!(
            paths(&["out/me.png"]),
            output_paths(
                Path::new("cat.mp4"),
                Some(Path::new("out/me.png")),
                count(1),
                1
            )
        );
    }

    #[test]
    fn nothing_to_name() {
        assert!(output_paths(Path::new("cat.mp4"), None, count(1), 0).is_empty());
        assert!(output_paths(Path::new("cat.mp4"), None, count(3), 0).is_empty());
    }

    #[test]
    fn many_next_to_video() {
        assert_eq!(
            paths(&["v/cat_frame_01.jpg", "v/cat_frame_02.jpg"]),
            output_paths(Path::new("v/cat.mkv"), None, count(5), 2)
        );
    }

    #[test]
    fn many_given_output() {
        assert_eq!(
            paths(&["out/shot_01.jpg", "out/shot_02.jpg", "out/shot_03.jpg"]),
            output_paths(
                Path::new("cat.mkv"),
                Some(Path::new("out/shot.jpg")),
                count(3),
                3
            )
        );
        assert_eq!(
            paths(&["out/shot_01.jpg"]),
            output_paths(Path::new("cat.mkv"), Some(Path::new("out/shot")), count(3), 1)
        );
    }

    #[test]
    fn numbering_is_padded() {
        let names = output_paths(Path::new("a.mp4"), None, count(12), 12);
        assert_eq!(PathBuf::from("a_frame_09.jpg"), names[8]);
        assert_eq!(PathBuf::from("a_frame_12.jpg"), names[11]);
    }

    #[test]
    fn writes_a_readable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let img = filled(32, 16, 200, 100, 50);

        save_jpeg(&img, &path, DEFAULT_JPEG_QUALITY).unwrap();

        let read = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), read.dimensions());
        let pixel = read.get_pixel(5, 5);
        assert!(pixel[0].abs_diff(200) < 8, "{pixel:?}");
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("frame.jpg");
        let res = save_jpeg(&filled(4, 4, 0, 0, 0), &path, 90);
        assert!(matches!(res, Err(SaveError::Io { .. })));
    }
}
