use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tiny_skia as sk;

use crate::geom::{polar_jitter, random_point, symmetric_offset, BoundingBox, Point, JITTER_RADIUS};
use crate::settings::{Config, ShapeKind};

/// max edge / radius change (pixels) applied by a single rectangle or ellipse mutation
pub const RESIZE_SPAN: f32 = 10.0;

/// closed set of primitive geometries.
/// Rectangle keeps the same point-sequence representation as Polygon but is always
/// (left,top),(right,top),(right,bottom),(left,bottom).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Polygon { points: Vec<Point> },
    Rectangle { points: [Point; 4] },
    Ellipse { center: Point, rx: i32, ry: i32 },
}

/// an immutable primitive: geometry, its bounding box, and a lazily built tiny-skia path.
/// mutation returns a new Shape so parent and child can be scored side by side.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "Geometry", into = "Geometry")]
pub struct Shape {
    geometry: Geometry,
    bbox: BoundingBox,
    cached_path: OnceLock<Option<Arc<sk::Path>>>,
}

// a clone must not carry over a path built for the parent geometry
impl Clone for Shape {
    fn clone(&self) -> Self {
        Shape::from(self.geometry.clone())
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.geometry == other.geometry
    }
}

impl From<Geometry> for Shape {
    fn from(geometry: Geometry) -> Self {
        let bbox = compute_bbox(&geometry);
        Shape {
            geometry,
            bbox,
            cached_path: OnceLock::new(),
        }
    }
}

impl From<Shape> for Geometry {
    fn from(shape: Shape) -> Self {
        shape.geometry
    }
}

fn compute_bbox(geometry: &Geometry) -> BoundingBox {
    match geometry {
        Geometry::Polygon { points } => BoundingBox::from_points(points),
        Geometry::Rectangle { points } => BoundingBox::from_points(points),
        Geometry::Ellipse { center, rx, ry } => BoundingBox::new(
            center.0 - rx,
            center.1 - ry,
            (2 * rx) as u32,
            (2 * ry) as u32,
        ),
    }
}

fn rect_points(left: i32, top: i32, right: i32, bottom: i32) -> [Point; 4] {
    let (l, r) = (left.min(right), left.max(right));
    let (t, b) = (top.min(bottom), top.max(bottom));
    [(l, t), (r, t), (r, b), (l, b)]
}

/// anchor point plus count-1 polar-jittered neighbours
fn jittered_points<R: Rng>(rng: &mut R, width: u32, height: u32, count: usize) -> Vec<Point> {
    let first = random_point(rng, width, height);
    let mut points = Vec::with_capacity(count);
    points.push(first);
    for _ in 1..count {
        let (dx, dy) = polar_jitter(rng);
        points.push((first.0 + dx, first.1 + dy));
    }
    points
}

impl Shape {
    /// general polygon. None when fewer than 3 points are given
    pub fn polygon(points: Vec<Point>) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        Some(Shape::from(Geometry::Polygon { points }))
    }

    /// axis-aligned rectangle between two corners (in any order)
    pub fn rectangle(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Shape::from(Geometry::Rectangle {
            points: rect_points(left, top, right, bottom),
        })
    }

    /// ellipse; radii are floored at 1
    pub fn ellipse(center: Point, rx: i32, ry: i32) -> Self {
        Shape::from(Geometry::Ellipse {
            center,
            rx: rx.max(1),
            ry: ry.max(1),
        })
    }

    /// random shape of a kind picked uniformly from cfg.shape_kinds,
    /// anchored inside the cfg.canvas_width x cfg.canvas_height canvas
    pub fn create<R: Rng>(cfg: &Config, rng: &mut R) -> Self {
        profiling::scope!("Shape::create");
        let kind = if cfg.shape_kinds.is_empty() {
            ShapeKind::Triangle
        } else {
            cfg.shape_kinds[rng.random_range(0..cfg.shape_kinds.len())]
        };
        Shape::create_kind(kind, cfg, rng)
    }

    pub fn create_kind<R: Rng>(kind: ShapeKind, cfg: &Config, rng: &mut R) -> Self {
        let (w, h) = (cfg.canvas_width, cfg.canvas_height);
        let geometry = match kind {
            ShapeKind::Triangle => Geometry::Polygon {
                points: jittered_points(rng, w, h, 3),
            },
            ShapeKind::Polygon => {
                let min = cfg.min_vertices.max(3);
                let max = cfg.max_vertices.max(min);
                let count = rng.random_range(min..=max);
                Geometry::Polygon {
                    points: jittered_points(rng, w, h, count),
                }
            }
            ShapeKind::Rectangle => {
                let p1 = random_point(rng, w, h);
                let p2 = random_point(rng, w, h);
                Geometry::Rectangle {
                    points: rect_points(p1.0, p1.1, p2.0, p2.1),
                }
            }
            ShapeKind::Ellipse => Geometry::Ellipse {
                center: random_point(rng, w, h),
                rx: 1 + (rng.random::<f32>() * JITTER_RADIUS) as i32,
                ry: 1 + (rng.random::<f32>() * JITTER_RADIUS) as i32,
            },
        };
        Shape::from(geometry)
    }

    /// new shape with exactly one random perturbation; self is left untouched
    pub fn mutate<R: Rng>(&self, rng: &mut R) -> Self {
        profiling::scope!("Shape::mutate");
        let geometry = match &self.geometry {
            Geometry::Polygon { points } => {
                let mut points = points.clone();
                let idx = rng.random_range(0..points.len());
                let (dx, dy) = polar_jitter(rng);
                points[idx].0 += dx;
                points[idx].1 += dy;
                Geometry::Polygon { points }
            }
            Geometry::Rectangle { points } => {
                let (mut left, mut top) = points[0];
                let (mut right, mut bottom) = points[2];
                let amount = symmetric_offset(rng, RESIZE_SPAN);
                match rng.random_range(0..4) {
                    0 => left += amount,
                    1 => top += amount,
                    2 => right += amount,
                    _ => bottom += amount,
                }
                Geometry::Rectangle {
                    points: rect_points(left, top, right, bottom),
                }
            }
            Geometry::Ellipse { center, rx, ry } => {
                let (mut center, mut rx, mut ry) = (*center, *rx, *ry);
                match rng.random_range(0..3) {
                    0 => {
                        let (dx, dy) = polar_jitter(rng);
                        center.0 += dx;
                        center.1 += dy;
                    }
                    1 => rx = (rx + symmetric_offset(rng, RESIZE_SPAN)).max(1),
                    _ => ry = (ry + symmetric_offset(rng, RESIZE_SPAN)).max(1),
                }
                Geometry::Ellipse { center, rx, ry }
            }
        };
        Shape::from(geometry)
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kind(&self) -> ShapeKind {
        match &self.geometry {
            Geometry::Polygon { points } if points.len() == 3 => ShapeKind::Triangle,
            Geometry::Polygon { .. } => ShapeKind::Polygon,
            Geometry::Rectangle { .. } => ShapeKind::Rectangle,
            Geometry::Ellipse { .. } => ShapeKind::Ellipse,
        }
    }

    /// fill path in canvas coordinates. None for geometry tiny-skia cannot build,
    /// which then renders as nothing.
    pub fn path(&self) -> Option<Arc<sk::Path>> {
        self.cached_path
            .get_or_init(|| build_path(&self.geometry).map(Arc::new))
            .clone()
    }
}

fn build_path(geometry: &Geometry) -> Option<sk::Path> {
    match geometry {
        Geometry::Polygon { points } => polygon_path(points),
        Geometry::Rectangle { points } => polygon_path(points),
        Geometry::Ellipse { center, rx, ry } => {
            let rect = sk::Rect::from_xywh(
                (center.0 - rx) as f32,
                (center.1 - ry) as f32,
                (2 * rx) as f32,
                (2 * ry) as f32,
            )?;
            sk::PathBuilder::from_oval(rect)
        }
    }
}

fn polygon_path(points: &[Point]) -> Option<sk::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = sk::PathBuilder::new();
    pb.move_to(first.0 as f32, first.1 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn cfg(kinds: &[ShapeKind]) -> Config {
        Config::default().with_canvas(64, 48).with_shape_kinds(kinds)
    }

    fn is_axis_aligned(points: &[Point; 4]) -> bool {
        let [(l, t), (r, t2), (r2, b), (l2, b2)] = *points;
        t == t2 && r == r2 && b == b2 && l == l2 && l <= r && t <= b
    }

    #[test]
    fn test_create_respects_enabled_kinds() {
        let mut rng = Pcg32::seed_from_u64(3);
        let cfg = cfg(&[ShapeKind::Ellipse, ShapeKind::Rectangle]);
        for _ in 0..200 {
            let kind = Shape::create(&cfg, &mut rng).kind();
            assert!(kind == ShapeKind::Ellipse || kind == ShapeKind::Rectangle);
        }
    }

    #[test]
    fn test_polygon_vertex_count_range() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut cfg = cfg(&[ShapeKind::Polygon]);
        cfg.min_vertices = 4;
        cfg.max_vertices = 5;
        for _ in 0..200 {
            match Shape::create(&cfg, &mut rng).geometry() {
                Geometry::Polygon { points } => assert!((4..=5).contains(&points.len())),
                other => panic!("unexpected geometry {other:?}"),
            }
        }
    }

    #[test]
    fn test_rectangle_bbox() {
        let r = Shape::rectangle(8, 9, 2, 3);
        assert_eq!(r.bounding_box(), BoundingBox::new(2, 3, 6, 6));
        assert_eq!(r.kind(), ShapeKind::Rectangle);
    }

    #[test]
    fn test_ellipse_bbox_and_floor() {
        let e = Shape::ellipse((10, 10), 0, 4);
        assert_eq!(e.bounding_box(), BoundingBox::new(9, 6, 2, 8));
    }

    #[test]
    fn test_polygon_needs_three_points() {
        assert!(Shape::polygon(vec![(0, 0), (1, 1)]).is_none());
        assert!(Shape::polygon(vec![(0, 0), (1, 1), (2, 0)]).is_some());
    }

    #[test]
    fn test_polygon_mutation_moves_one_vertex() {
        let mut rng = Pcg32::seed_from_u64(5);
        let parent = Shape::polygon(vec![(10, 10), (20, 10), (15, 20), (12, 18)]).unwrap();
        for _ in 0..100 {
            let child = parent.mutate(&mut rng);
            let (Geometry::Polygon { points: a }, Geometry::Polygon { points: b }) =
                (parent.geometry(), child.geometry())
            else {
                panic!("kind changed");
            };
            let moved = a.iter().zip(b).filter(|(p, q)| p != q).count();
            assert!(moved <= 1);
        }
    }

    #[test]
    fn test_rectangle_mutation_moves_one_edge() {
        let mut rng = Pcg32::seed_from_u64(9);
        let parent = Shape::rectangle(10, 10, 30, 30);
        for _ in 0..200 {
            let child = parent.mutate(&mut rng);
            let Geometry::Rectangle { points } = child.geometry() else {
                panic!("kind changed");
            };
            assert!(is_axis_aligned(points));
            let pb = parent.bounding_box();
            let cb = child.bounding_box();
            let changed = [
                pb.left != cb.left,
                pb.top != cb.top,
                pb.right() != cb.right(),
                pb.bottom() != cb.bottom(),
            ];
            assert!(changed.iter().filter(|c| **c).count() <= 1);
        }
    }

    #[test]
    fn test_mutation_leaves_parent_untouched() {
        let mut rng = Pcg32::seed_from_u64(2);
        let parent = Shape::ellipse((20, 20), 5, 6);
        let snapshot = parent.clone();
        for _ in 0..50 {
            let _ = parent.mutate(&mut rng);
        }
        assert_eq!(parent, snapshot);
    }

    #[test]
    fn test_collapsed_polygon_keeps_unit_bbox() {
        let s = Shape::polygon(vec![(4, 4), (4, 4), (4, 4)]).unwrap();
        assert_eq!(s.bounding_box(), BoundingBox::new(4, 4, 1, 1));
    }

    #[test]
    fn test_serde_round_trip_rebuilds_bbox() {
        let s = Shape::rectangle(1, 2, 5, 9);
        let json = serde_json::to_string(&s).unwrap();
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.bounding_box(), s.bounding_box());
    }

    proptest! {
        #[test]
        fn bbox_always_valid_after_create_and_mutate(seed in any::<u64>(), rounds in 0usize..40) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let cfg = cfg(&[ShapeKind::Triangle, ShapeKind::Rectangle, ShapeKind::Ellipse, ShapeKind::Polygon]);
            let mut shape = Shape::create(&cfg, &mut rng);
            for _ in 0..rounds {
                shape = shape.mutate(&mut rng);
                let bb = shape.bounding_box();
                prop_assert!(bb.width >= 1 && bb.height >= 1);
                prop_assert_eq!(bb, compute_bbox(shape.geometry()));
                match shape.geometry() {
                    Geometry::Rectangle { points } => prop_assert!(is_axis_aligned(points)),
                    Geometry::Ellipse { rx, ry, .. } => prop_assert!(*rx >= 1 && *ry >= 1),
                    Geometry::Polygon { points } => prop_assert!(points.len() >= 3),
                }
            }
        }
    }
}
