use image::math::Rect;
use image::{GenericImageView, GrayImage, ImageBuffer, Luma, RgbImage};

use super::math::Stats;

pub const WHITE: u8 = u8::MAX;
pub const BLACK: u8 = u8::MIN;

/// Converts to grayscale with the BT.601 weights (0.299, 0.587, 0.114), in the same
/// fixed point arithmetic as most video tools, so that equal channels stay exactly the
/// same. `image::imageops::grayscale` uses BT.709 instead.
pub fn luma(img: &RgbImage) -> GrayImage {
    const SHIFT: u32 = 14;
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const HALF: u32 = 1 << (SHIFT - 1);

    let mut gray = GrayImage::new(img.width(), img.height());
    gray.pixels_mut().zip(img.pixels()).for_each(|(g, rgb)| {
        let [r, gr, b] = rgb.0;
        let y = (r as u32 * R + gr as u32 * G + b as u32 * B + HALF) >> SHIFT;
        *g = Luma([y as u8]);
    });
    gray
}

pub fn filled(width: u32, height: u32, red: u8, green: u8, blue: u8) -> RgbImage {
    let mut buf = ImageBuffer::new(width, height);
    buf.pixels_mut()
        .for_each(|pixel| *pixel = image::Rgb([red, green, blue]));
    buf
}

pub fn construct_gray(raw: &[&[u8]]) -> GrayImage {
    assert!(raw.windows(2).all(|w| w[0].len() == w[1].len()));
    let height = raw.len() as u32;
    let width = raw.iter().next().map(|row| row.len()).unwrap_or(0) as u32;
    GrayImage::from_fn(width, height, |x, y| {
        image::Luma([raw[y as usize][x as usize]])
    })
}

/// Mean and spread of all gray levels
pub fn gray_stats<I>(img: &I) -> Stats
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    img.pixels().map(|(_, _, luma)| luma[0]).collect()
}

/// Same as [`gray_stats`] but only inside `rect`, which must be within the image.
pub fn region_stats(img: &GrayImage, rect: Rect) -> Stats {
    (rect.y..rect.y + rect.height)
        .flat_map(|y| (rect.x..rect.x + rect.width).map(move |x| (x, y)))
        .map(|(x, y)| img.get_pixel(x, y)[0])
        .collect()
}

/// The middle cell when splitting the image in a three by three grid. The cell bounds
/// are rounded down, so it can be empty for really tiny images.
pub fn center_third(width: u32, height: u32) -> Rect {
    let (left, top) = (width / 3, height / 3);
    let (right, bottom) = (2 * width / 3, 2 * height / 3);
    Rect {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    }
}

/// Top-left, top-right, bottom-left and bottom-right, in that order. Odd sizes give the
/// extra row and column to the right and bottom quadrants.
pub fn quadrants(width: u32, height: u32) -> [Rect; 4] {
    let (mw, mh) = (width / 2, height / 2);
    let rect = |x, y, width, height| Rect {
        x,
        y,
        width,
        height,
    };
    [
        rect(0, 0, mw, mh),
        rect(mw, 0, width - mw, mh),
        rect(0, mh, mw, height - mh),
        rect(mw, mh, width - mw, height - mh),
    ]
}
