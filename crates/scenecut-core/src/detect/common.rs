use image::{Rgb, RgbImage};

/// HSV representation. H in [0, 360), S and V in [0.0, 1.0].
#[derive(Debug, Clone, Copy)]
struct Hsv {
    h: f32,
    s: f32,
    v: f32,
}

fn rgb_to_hsv(pixel: Rgb<u8>) -> Hsv {
    let r = pixel[0] as f32 / 255.0;
    let g = pixel[1] as f32 / 255.0;
    let b = pixel[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r).abs() < 1e-6 {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < 1e-6 {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    Hsv { h, s, v }
}

/// Planar HSV image scaled to 8-bit ranges: H in [0, 180), S and V in [0, 255].
pub struct HsvPlanes {
    pub h: Vec<f32>,
    pub s: Vec<f32>,
    pub v: Vec<f32>,
}

impl HsvPlanes {
    pub fn from_image(image: &RgbImage) -> Self {
        let len = (image.width() * image.height()) as usize;
        let mut planes = HsvPlanes {
            h: Vec::with_capacity(len),
            s: Vec::with_capacity(len),
            v: Vec::with_capacity(len),
        };
        for pixel in image.pixels() {
            let hsv = rgb_to_hsv(*pixel);
            planes.h.push(hsv.h / 2.0);
            planes.s.push(hsv.s * 255.0);
            planes.v.push(hsv.v * 255.0);
        }
        planes
    }

    pub fn len(&self) -> usize {
        self.h.len()
    }

    pub fn is_empty(&self) -> bool {
        self.h.is_empty()
    }
}

/// Mean absolute difference between two equally sized planes.
pub fn mean_abs_diff(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(a.len(), b.len(), "plane sizes differ");
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs() as f64)
        .sum();
    sum / a.len() as f64
}
