// integer geometry shared by shapes, rasterization and scoring
//
// - BoundingBox: integer extent of a shape, never smaller than 1x1
// - polar jitter used by shape creation and mutation

use rand::Rng;

/// maximum radius (pixels) of a polar vertex/center jitter
pub const JITTER_RADIUS: f32 = 20.0;

/// integer point in canvas pixel coordinates (may lie outside the canvas)
pub type Point = (i32, i32);

/// axis-aligned integer box. width/height are at least 1 even for zero-extent shapes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    #[inline]
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        BoundingBox {
            left,
            top,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// min/max box over a point set. an empty slice yields a 1x1 box at the origin
    pub fn from_points(points: &[Point]) -> Self {
        if points.is_empty() {
            return BoundingBox::new(0, 0, 1, 1);
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        BoundingBox::new(
            min_x,
            min_y,
            (max_x - min_x) as u32,
            (max_y - min_y) as u32,
        )
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.left + self.width as i32
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.top + self.height as i32
    }

    /// clip against a width x height surface.
    /// returns the visible half-open pixel range (x0, y0, x1, y1), or None when nothing overlaps.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.left.max(0);
        let y0 = self.top.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// uniformly random pixel inside a width x height canvas
#[inline]
pub fn random_point<R: Rng>(rng: &mut R, width: u32, height: u32) -> Point {
    (
        rng.random_range(0..width.max(1)) as i32,
        rng.random_range(0..height.max(1)) as i32,
    )
}

/// random polar offset: angle U(0, 2pi), radius U(0, JITTER_RADIUS), truncated toward zero
#[inline]
pub fn polar_jitter<R: Rng>(rng: &mut R) -> (i32, i32) {
    let angle = rng.random::<f32>() * std::f32::consts::TAU;
    let radius = rng.random::<f32>() * JITTER_RADIUS;
    ((radius * angle.cos()) as i32, (radius * angle.sin()) as i32)
}

/// symmetric integer offset U(-span, span), truncated toward zero
#[inline]
pub fn symmetric_offset<R: Rng>(rng: &mut R, span: f32) -> i32 {
    ((rng.random::<f32>() - 0.5) * 2.0 * span) as i32
}
