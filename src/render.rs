use tiny_skia as sk;

use crate::error::EngineError;
use crate::shape::Shape;

/// borrowed view of a surface's RGBA8 pixels (premultiplied; opaque canvases make that moot)
#[derive(Clone, Copy, Debug)]
pub struct PixelView<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl PixelView<'_> {
    /// byte offset of pixel (x, y)
    #[inline(always)]
    pub fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }
}

/// the raster surface: a width x height RGBA8 buffer with fill, alpha-composited shape
/// drawing, readback and deep cloning. every mutation bumps `version` so callers holding
/// a copy of an earlier readback can tell it is stale.
#[derive(Clone, Debug)]
pub struct Surface {
    pix: sk::Pixmap,
    anti_alias: bool,
    version: u64,
}

impl Surface {
    /// transparent-black surface
    pub fn new(width: u32, height: u32, anti_alias: bool) -> Result<Self, EngineError> {
        let pix = sk::Pixmap::new(width, height).ok_or_else(|| {
            EngineError::Surface(format!("cannot allocate a {width}x{height} surface"))
        })?;
        Ok(Self { pix, anti_alias, version: 0 })
    }

    /// surface from straight (un-premultiplied) RGBA8 bytes, e.g. a decoded image
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8], anti_alias: bool) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(EngineError::Surface(format!(
                "pixel buffer has {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        let size = sk::IntSize::from_wh(width, height)
            .ok_or_else(|| EngineError::Surface(format!("invalid size {width}x{height}")))?;
        let pix = sk::Pixmap::from_vec(premultiply(rgba), size)
            .ok_or_else(|| EngineError::Surface(format!("invalid size {width}x{height}")))?;
        Ok(Self { pix, anti_alias, version: 0 })
    }

    /// flat opaque surface
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], anti_alias: bool) -> Result<Self, EngineError> {
        let mut surface = Self::new(width, height, anti_alias)?;
        surface.fill(rgb);
        Ok(surface)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pix.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pix.height()
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn anti_alias(&self) -> bool {
        self.anti_alias
    }

    /// mutation counter, bumped by fill / draw
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn pixels(&self) -> PixelView<'_> {
        PixelView {
            width: self.width(),
            height: self.height(),
            data: self.pix.data(),
        }
    }

    /// straight-alpha RGBA8 copy (for encoding to image files)
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pix
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    pub fn fill(&mut self, rgb: [u8; 3]) {
        self.pix.fill(sk::Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255));
        self.version += 1;
    }

    /// alpha-composite a filled shape, clipped to the surface
    pub fn draw_shape(&mut self, shape: &Shape, rgb: [u8; 3], alpha: f32) {
        self.draw_shape_transformed(shape, rgb, alpha, sk::Transform::identity());
    }

    /// draw a shape given in scoring-canvas coordinates onto a surface `scale` times larger
    pub fn draw_shape_scaled(&mut self, shape: &Shape, rgb: [u8; 3], alpha: f32, scale: f32) {
        self.draw_shape_transformed(shape, rgb, alpha, sk::Transform::from_scale(scale, scale));
    }

    fn draw_shape_transformed(&mut self, shape: &Shape, rgb: [u8; 3], alpha: f32, transform: sk::Transform) {
        profiling::scope!("draw_shape");
        self.version += 1;

        // fully off-screen: skip tiny-skia work
        // (transforms here are only ever scale + translate)
        let bb = shape.bounding_box();
        let x0 = bb.left as f32 * transform.sx + transform.tx;
        let y0 = bb.top as f32 * transform.sy + transform.ty;
        let x1 = bb.right() as f32 * transform.sx + transform.tx;
        let y1 = bb.bottom() as f32 * transform.sy + transform.ty;
        if x1 < 0.0 || y1 < 0.0 || x0 >= self.width() as f32 || y0 >= self.height() as f32 {
            return;
        }

        let Some(path) = shape.path() else {
            return;
        };

        let mut paint = sk::Paint::default();
        paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], alpha_to_u8(alpha));
        paint.anti_alias = self.anti_alias;
        self.pix
            .fill_path(&path, &paint, sk::FillRule::Winding, transform, None);
    }

    /// render the shape alone (black, at `alpha`) into a buffer the size of its bounding box.
    /// the alpha channel of the result is the per-pixel coverage; uncovered pixels are 0.
    pub fn rasterize_shape(shape: &Shape, alpha: f32, anti_alias: bool) -> Result<Surface, EngineError> {
        profiling::scope!("rasterize_shape");
        let bb = shape.bounding_box();
        let mut raster = Surface::new(bb.width, bb.height, anti_alias)?;
        let transform = sk::Transform::from_translate(-bb.left as f32, -bb.top as f32);
        raster.draw_shape_transformed(shape, [0, 0, 0], alpha, transform);
        Ok(raster)
    }

    /// bicubic-resampled copy shrunk by `factor` (>1). factor <= 1 returns a plain clone
    pub fn downscaled(&self, factor: f32) -> Result<Surface, EngineError> {
        profiling::scope!("downscaled");
        if factor <= 1.0 {
            return Ok(self.clone());
        }
        let w = ((self.width() as f32 / factor).round() as u32).max(1);
        let h = ((self.height() as f32 / factor).round() as u32).max(1);
        let mut out = Surface::new(w, h, self.anti_alias)?;
        let paint = sk::PixmapPaint {
            quality: sk::FilterQuality::Bicubic,
            ..sk::PixmapPaint::default()
        };
        let transform = sk::Transform::from_scale(
            w as f32 / self.width() as f32,
            h as f32 / self.height() as f32,
        );
        out.pix
            .draw_pixmap(0, 0, self.pix.as_ref(), &paint, transform, None);
        out.version += 1;
        Ok(out)
    }
}

#[inline]
fn alpha_to_u8(alpha: f32) -> u8 {
    (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Premultiply RGBA - optimized scalar implementation (compiler will auto-vectorize)
#[inline(always)]
pub fn premultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("premultiply");

    let mut out = vec![0u8; p.len()];
    for (src, dst) in p.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let a = src[3] as u16;
        // (x * a + 127) / 255 is a fast rounded divide-by-255
        dst[0] = ((src[0] as u16 * a + 127) / 255) as u8;
        dst[1] = ((src[1] as u16 * a + 127) / 255) as u8;
        dst[2] = ((src[2] as u16 * a + 127) / 255) as u8;
        dst[3] = a as u8;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(s: &Surface, x: u32, y: u32) -> [u8; 4] {
        let v = s.pixels();
        let i = v.index(x, y);
        [v.data[i], v.data[i + 1], v.data[i + 2], v.data[i + 3]]
    }

    #[test]
    fn test_fill_and_version() {
        let mut s = Surface::new(4, 3, false).unwrap();
        assert_eq!(s.version(), 0);
        s.fill([10, 20, 30]);
        assert_eq!(s.version(), 1);
        assert_eq!(pixel(&s, 3, 2), [10, 20, 30, 255]);
        assert_eq!(s.pixels().data.len(), 4 * 4 * 3);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = Surface::filled(5, 5, [0, 0, 0], false).unwrap();
        let b = a.clone();
        a.draw_shape(&Shape::rectangle(0, 0, 5, 5), [255, 255, 255], 1.0);
        assert_eq!(pixel(&a, 2, 2), [255, 255, 255, 255]);
        assert_eq!(pixel(&b, 2, 2), [0, 0, 0, 255]);
        assert!(a.version() > b.version());
    }

    #[test]
    fn test_rectangle_covers_exact_pixels() {
        let mut s = Surface::filled(10, 10, [0, 0, 0], false).unwrap();
        s.draw_shape(&Shape::rectangle(2, 3, 5, 7), [200, 100, 50], 1.0);
        assert_eq!(pixel(&s, 2, 3), [200, 100, 50, 255]);
        assert_eq!(pixel(&s, 4, 6), [200, 100, 50, 255]);
        assert_eq!(pixel(&s, 5, 6), [0, 0, 0, 255]);
        assert_eq!(pixel(&s, 4, 7), [0, 0, 0, 255]);
    }

    #[test]
    fn test_rasterize_shape_coverage() {
        let shape = Shape::rectangle(-3, 4, 3, 6);
        let raster = Surface::rasterize_shape(&shape, 0.5, false).unwrap();
        assert_eq!((raster.width(), raster.height()), (6, 2));
        let view = raster.pixels();
        assert!(view.data.chunks_exact(4).all(|p| p == [0, 0, 0, 128]));
    }

    #[test]
    fn test_offscreen_draw_is_noop() {
        let mut s = Surface::filled(8, 8, [9, 9, 9], true).unwrap();
        let before = s.pixels().data.to_vec();
        s.draw_shape(&Shape::ellipse((-50, -50), 5, 5), [255, 0, 0], 1.0);
        assert_eq!(s.pixels().data, &before[..]);
    }

    #[test]
    fn test_scaled_draw() {
        let mut s = Surface::filled(20, 20, [0, 0, 0], false).unwrap();
        s.draw_shape_scaled(&Shape::rectangle(0, 0, 5, 5), [255, 255, 255], 1.0, 2.0);
        assert_eq!(pixel(&s, 9, 9), [255, 255, 255, 255]);
        assert_eq!(pixel(&s, 10, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn test_from_rgba8_premultiplies_and_round_trips_opaque() {
        let rgba = vec![10, 20, 30, 255, 200, 100, 0, 255];
        let s = Surface::from_rgba8(2, 1, &rgba, true).unwrap();
        assert_eq!(s.to_rgba8(), rgba);
        assert!(matches!(
            Surface::from_rgba8(2, 2, &rgba, true),
            Err(EngineError::Surface(msg)) if msg.contains("expected 16")
        ));
        assert_eq!(premultiply(&[255, 128, 0, 128]), vec![128, 64, 0, 128]);
    }

    #[test]
    fn test_downscale_flat_color() {
        let s = Surface::filled(40, 20, [50, 100, 150], true).unwrap();
        let d = s.downscaled(4.0).unwrap();
        assert_eq!((d.width(), d.height()), (10, 5));
        let p = pixel(&d, 5, 2);
        for (got, want) in p.iter().zip([50u8, 100, 150, 255]) {
            assert!((*got as i32 - want as i32).abs() <= 1, "{p:?}");
        }
    }

    #[test]
    fn test_zero_size_surface_is_error() {
        assert!(matches!(Surface::new(0, 5, true), Err(EngineError::Surface(_))));
    }
}
