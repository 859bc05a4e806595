//! Drop-shadow blur for silhouette layers.
//!
//! A shadow layer is mostly transparent, so the blur works on the bounding box
//! of the silhouette padded by the kernel radius and leaves the rest alone.

use crate::foundation::error::{CarouselError, CarouselResult};

/// Pixel rectangle, `x1`/`y1` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBox {
    pub fn width(self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(self) -> u32 {
        self.y1 - self.y0
    }

    fn padded(self, pad: u32, width: u32, height: u32) -> Self {
        Self {
            x0: self.x0.saturating_sub(pad),
            y0: self.y0.saturating_sub(pad),
            x1: self.x1.saturating_add(pad).min(width),
            y1: self.y1.saturating_add(pad).min(height),
        }
    }
}

/// Kernel radius and sigma approximating a canvas `shadowBlur` value.
pub fn shadow_blur_params(blur: f32) -> (u32, f32) {
    if !blur.is_finite() || blur <= 0.0 {
        return (0, 0.0);
    }
    let sigma = (blur / 2.0).max(0.5);
    ((sigma * 3.0).ceil() as u32, sigma)
}

/// Normalized 1-D gaussian for `blur`; empty when no blur applies.
pub fn shadow_kernel(blur: f32) -> Vec<f32> {
    let (radius, sigma) = shadow_blur_params(blur);
    if radius == 0 {
        return Vec::new();
    }
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| {
            let x = i as f32;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Bounding box of pixels with non-zero alpha in a premultiplied RGBA8 buffer.
pub fn alpha_bounds(rgba8_premul: &[u8], width: u32, height: u32) -> Option<PixelBox> {
    if width == 0 || height == 0 {
        return None;
    }
    let mut bounds: Option<PixelBox> = None;
    let rows = rgba8_premul
        .chunks_exact(width as usize * 4)
        .take(height as usize);
    for (y, row) in rows.enumerate() {
        let mut covered = row
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] != 0)
            .map(|(x, _)| x as u32);
        let Some(first) = covered.next() else {
            continue;
        };
        let last = covered.last().unwrap_or(first);
        let y = y as u32;
        bounds = Some(match bounds {
            None => PixelBox {
                x0: first,
                y0: y,
                x1: last + 1,
                y1: y + 1,
            },
            Some(b) => PixelBox {
                x0: b.x0.min(first),
                y0: b.y0,
                x1: b.x1.max(last + 1),
                y1: y + 1,
            },
        });
    }
    bounds
}

/// Blur the silhouette in `layer` (premultiplied RGBA8) in place.
///
/// Returns the region that may now hold shadow pixels, or `None` when the layer
/// is fully transparent. Samples beyond the surface edge count as transparent.
pub fn blur_shadow_in_place(
    layer: &mut [u8],
    width: u32,
    height: u32,
    blur: f32,
) -> CarouselResult<Option<PixelBox>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CarouselError::allocation("shadow layer size overflow"))?;
    if layer.len() != expected {
        return Err(CarouselError::validation(
            "shadow layer must be width*height*4 bytes",
        ));
    }

    let Some(bounds) = alpha_bounds(layer, width, height) else {
        return Ok(None);
    };
    let kernel = shadow_kernel(blur);
    if kernel.is_empty() {
        return Ok(Some(bounds));
    }

    let radius = kernel.len() / 2;
    let region = bounds.padded(radius as u32, width, height);
    let (rw, rh) = (region.width() as usize, region.height() as usize);
    let stride = width as usize * 4;
    let origin = |x: usize, y: usize| {
        (region.y0 as usize + y) * stride + (region.x0 as usize + x) * 4
    };

    let mut src = vec![0f32; rw * rh * 4];
    for y in 0..rh {
        let row = &layer[origin(0, y)..origin(0, y) + rw * 4];
        for (d, &s) in src[y * rw * 4..(y + 1) * rw * 4].iter_mut().zip(row) {
            *d = f32::from(s);
        }
    }

    let mut tmp = vec![0f32; src.len()];
    for y in 0..rh {
        for x in 0..rw {
            let mut acc = [0f32; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let Some(sx) = (x + ki).checked_sub(radius).filter(|&sx| sx < rw) else {
                    continue;
                };
                let i = (y * rw + sx) * 4;
                for (a, s) in acc.iter_mut().zip(&src[i..i + 4]) {
                    *a += kw * s;
                }
            }
            let o = (y * rw + x) * 4;
            tmp[o..o + 4].copy_from_slice(&acc);
        }
    }

    for y in 0..rh {
        for x in 0..rw {
            let mut acc = [0f32; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let Some(sy) = (y + ki).checked_sub(radius).filter(|&sy| sy < rh) else {
                    continue;
                };
                let i = (sy * rw + x) * 4;
                for (a, s) in acc.iter_mut().zip(&tmp[i..i + 4]) {
                    *a += kw * s;
                }
            }
            let alpha = acc[3].round().clamp(0.0, 255.0) as u8;
            let o = origin(x, y);
            for c in 0..3 {
                // Rounding must not break the premultiplied invariant.
                layer[o + c] = (acc[c].round().clamp(0.0, 255.0) as u8).min(alpha);
            }
            layer[o + 3] = alpha;
        }
    }

    Ok(Some(region))
}
