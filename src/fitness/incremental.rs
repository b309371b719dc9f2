//! Incremental scoring of a single candidate shape.
//!
//! Instead of compositing the shape and rescanning the whole image, the shape is
//! rasterized alone into a buffer the size of its bounding box. Only pixels that
//! raster covers (alpha > 0) and that land on the canvas take part, so a candidate
//! costs O(shape area) rather than O(image area).

use crate::geom::BoundingBox;
use crate::render::PixelView;

/// optimal flat color for a shape and the change in difference it would cause
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorFit {
    pub color: [u8; 3],
    /// sum over covered pixels of (target - blended)^2 - (target - current)^2
    pub difference_change: f64,
    /// pixels that took part (covered and on-canvas)
    pub covered: usize,
}

/// walk every covered, on-canvas pixel of `shape` (a raster of size bbox.width x bbox.height)
/// and hand (shape_idx, canvas_idx) to `f`
#[inline(always)]
fn for_each_covered<F: FnMut(usize, usize)>(
    bbox: BoundingBox,
    shape: PixelView<'_>,
    canvas_width: u32,
    canvas_height: u32,
    mut f: F,
) {
    let Some((x0, y0, x1, y1)) = bbox.clip(canvas_width, canvas_height) else {
        return;
    };
    let stride = canvas_width as usize;

    for fy in y0..y1 {
        let sy = (fy as i32 - bbox.top) as u32;
        if sy >= shape.height {
            continue;
        }
        for fx in x0..x1 {
            let sx = (fx as i32 - bbox.left) as u32;
            if sx >= shape.width {
                continue;
            }
            let si = shape.index(sx, sy);
            if shape.data[si + 3] == 0 {
                continue;
            }
            f(si, (fy as usize * stride + fx as usize) * 4);
        }
    }
}

/// Per channel: mean over covered pixels of (target - current) / alpha + current,
/// clamped to [0, 255] and rounded. This is the flat color that, blended at `alpha`,
/// minimizes squared error over the region. Black when nothing is covered.
pub fn compute_color(
    bbox: BoundingBox,
    shape: PixelView<'_>,
    current: PixelView<'_>,
    target: PixelView<'_>,
    alpha: f64,
) -> ([u8; 3], usize) {
    profiling::scope!("compute_color");
    let mut acc = [0.0f64; 3];
    let mut count = 0usize;

    for_each_covered(bbox, shape, current.width, current.height, |_, fi| {
        for c in 0..3 {
            let t = target.data[fi + c] as f64;
            let cur = current.data[fi + c] as f64;
            acc[c] += (t - cur) / alpha + cur;
        }
        count += 1;
    });

    if count == 0 {
        return ([0, 0, 0], 0);
    }
    let color = acc.map(|sum| (sum / count as f64).clamp(0.0, 255.0).round() as u8);
    (color, count)
}

/// Sum over covered pixels of (target - new)^2 - (target - current)^2 where
/// new = color * a + current * (1 - a) and a is the raster's coverage / 255.
pub fn compute_difference_change(
    bbox: BoundingBox,
    shape: PixelView<'_>,
    current: PixelView<'_>,
    target: PixelView<'_>,
    color: [u8; 3],
) -> f64 {
    profiling::scope!("compute_difference_change");
    let color = color.map(|c| c as f64);
    let mut sum = 0.0f64;

    for_each_covered(bbox, shape, current.width, current.height, |si, fi| {
        let a = shape.data[si + 3] as f64 / 255.0;
        let b = 1.0 - a;
        for c in 0..3 {
            let t = target.data[fi + c] as f64;
            let cur = current.data[fi + c] as f64;
            let before = t - cur;
            let after = t - (color[c] * a + cur * b);
            sum += after * after - before * before;
        }
    });

    sum
}

/// color and difference change in one call
pub fn color_and_difference_change(
    bbox: BoundingBox,
    shape: PixelView<'_>,
    current: PixelView<'_>,
    target: PixelView<'_>,
    alpha: f64,
) -> ColorFit {
    profiling::scope!("color_and_difference_change");
    let (color, covered) = compute_color(bbox, shape, current, target, alpha);
    let difference_change = if covered == 0 {
        0.0
    } else {
        compute_difference_change(bbox, shape, current, target, color)
    };
    ColorFit {
        color,
        difference_change,
        covered,
    }
}
