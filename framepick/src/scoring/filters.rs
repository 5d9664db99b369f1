//! Edge filters on grayscale pictures.

use framepick_common::utils::math::Stats;
use image::GrayImage;

/// Mirrors an index that is at most one step outside `0..len`, without repeating the
/// edge pixel (gfedcb|abcdefgh|gfedcba).
fn reflect101(i: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    let i = if i < 0 {
        -i
    } else if i >= len {
        2 * len - 2 - i
    } else {
        i
    };
    i as u32
}

/// Clamps an index to `0..len` (aaaaaa|abcdefgh|hhhhhhh).
fn replicate(i: i64, len: i64) -> u32 {
    i.clamp(0, len - 1) as u32
}

fn at(img: &GrayImage, x: u32, y: u32) -> i32 {
    img.get_pixel(x, y)[0] as i32
}

/// Variance of the 4-neighbour Laplacian over every pixel. Blurry pictures have few
/// abrupt changes and therefore a low variance.
pub fn laplacian_variance(img: &GrayImage) -> f64 {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut stats = Stats::new();

    for y in 0..h {
        let up = reflect101(y - 1, h);
        let down = reflect101(y + 1, h);
        for x in 0..w {
            let left = reflect101(x - 1, w);
            let right = reflect101(x + 1, w);
            let (xu, yu) = (x as u32, y as u32);
            let lap = at(img, xu, up) + at(img, xu, down) + at(img, left, yu)
                + at(img, right, yu)
                - 4 * at(img, xu, yu);
            stats.add(lap);
        }
    }

    stats.variance()
}

/// Horizontal and vertical 3x3 Sobel responses, row major.
fn sobel(img: &GrayImage) -> (Vec<i32>, Vec<i32>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut dx = Vec::with_capacity((w * h) as usize);
    let mut dy = Vec::with_capacity((w * h) as usize);

    for y in 0..h {
        let (ym, yp) = (replicate(y - 1, h), replicate(y + 1, h));
        for x in 0..w {
            let (xm, xp) = (replicate(x - 1, w), replicate(x + 1, w));
            let (xc, yc) = (x as u32, y as u32);

            let gx = (at(img, xp, ym) + 2 * at(img, xp, yc) + at(img, xp, yp))
                - (at(img, xm, ym) + 2 * at(img, xm, yc) + at(img, xm, yp));
            let gy = (at(img, xm, yp) + 2 * at(img, xc, yp) + at(img, xp, yp))
                - (at(img, xm, ym) + 2 * at(img, xc, ym) + at(img, xp, ym));
            dx.push(gx);
            dy.push(gy);
        }
    }

    (dx, dy)
}

/// Canny edge detection with a 3x3 Sobel and the L1 gradient norm. Returns one flag per
/// pixel, row major, true where there is an edge.
pub fn canny(img: &GrayImage, low: i32, high: i32) -> Vec<bool> {
    // tan(22.5°) and tan(67.5°)
    const TAN_22: f64 = 0.414_213_562_373_095_1;
    const TAN_67: f64 = 2.414_213_562_373_095;

    let (w, h) = (img.width() as usize, img.height() as usize);
    let (dx, dy) = sobel(img);
    let mag: Vec<i32> = dx.iter().zip(&dy).map(|(x, y)| x.abs() + y.abs()).collect();
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    #[derive(Clone, Copy, PartialEq)]
    enum Class {
        None,
        Weak,
        Strong,
    }

    // non-maximum suppression along the quantized gradient direction
    let mut class = vec![Class::None; w * h];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let (gx, gy) = (dx[i] as f64, dy[i] as f64);
            let (ax, ay) = (gx.abs(), gy.abs());
            let (xi, yi) = (x as isize, y as isize);
            let is_max = if ay < ax * TAN_22 {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ay > ax * TAN_67 {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s: isize = if (gx < 0.0) != (gy < 0.0) { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };

            if is_max {
                if m > high {
                    class[i] = Class::Strong;
                    stack.push(i);
                } else {
                    class[i] = Class::Weak;
                }
            }
        }
    }

    // hysteresis: weak pixels connected to a strong one are promoted
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if class[n] == Class::Weak {
                    class[n] = Class::Strong;
                    stack.push(n);
                }
            }
        }
    }

    class.into_iter().map(|c| c == Class::Strong).collect()
}

/// Fraction of pixels that are on an edge.
pub fn edge_density(img: &GrayImage, low: i32, high: i32) -> f64 {
    let edges = canny(img, low, high);
    if edges.is_empty() {
        return 0.0;
    }
    edges.iter().filter(|e| **e).count() as f64 / edges.len() as f64
}
