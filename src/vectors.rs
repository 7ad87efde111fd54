//! Outward burst vectors computed from live layout.

use kurbo::{Point, Rect, Vec2};

use crate::{dom::StyleProps, random::RandomSource};

/// Target displacement of one tracked element at full progress.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ExplosionVector {
    pub offset: Vec2,
    pub rotation_deg: f64,
    pub scale: f64,
}

impl ExplosionVector {
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        rotation_deg: 0.0,
        scale: 1.0,
    };

    /// Visual state at eased progress `t`.
    pub fn at(&self, t: f64) -> StyleProps {
        StyleProps::new()
            .translate(self.offset * t)
            .rotation_deg(self.rotation_deg * t)
            .scale(1.0 + (self.scale - 1.0) * t)
            .opacity(1.0 - t)
    }
}

/// Randomization ranges for [`compute_vectors`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct VectorParams {
    pub min_distance: f64,
    pub max_extra: f64,
    pub rotation_range: f64,
    pub scale_min: f64,
    pub scale_max: f64,
}

impl VectorParams {
    fn sanitized(self) -> Self {
        let (lo, hi) = if self.scale_min <= self.scale_max {
            (self.scale_min, self.scale_max)
        } else {
            (self.scale_max, self.scale_min)
        };
        Self {
            min_distance: self.min_distance.max(0.0),
            max_extra: self.max_extra.max(0.0),
            rotation_range: self.rotation_range.abs(),
            scale_min: lo.max(0.0),
            scale_max: hi.max(0.0),
        }
    }
}

/// Compute one vector per rect, pointing away from `center`.
///
/// Draws per element, in order: an angle (only when the element center
/// coincides with `center`), distance in `[min, min + extra)`, rotation in
/// `[-range/2, range/2)`, scale in `[scale_min, scale_max)`.
pub fn compute_vectors(
    rects: &[Rect],
    center: Point,
    params: VectorParams,
    rng: &mut dyn RandomSource,
) -> Vec<ExplosionVector> {
    let p = params.sanitized();
    rects
        .iter()
        .map(|r| {
            let delta = r.center() - center;
            let len = delta.hypot();
            let dir = if len > 1e-6 {
                delta / len
            } else {
                let a = rng.next_f64() * std::f64::consts::TAU;
                Vec2::new(a.cos(), a.sin())
            };
            let distance = rng.range(p.min_distance, p.min_distance + p.max_extra);
            let rotation_deg = rng.range(-p.rotation_range / 2.0, p.rotation_range / 2.0);
            let scale = rng.range(p.scale_min, p.scale_max);
            ExplosionVector {
                offset: dir * distance,
                rotation_deg,
                scale,
            }
        })
        .collect()
}

/// Center of the union of `rects`, or `fallback` when there are none.
pub fn reference_center(rects: &[Rect], fallback: Point) -> Point {
    rects
        .iter()
        .copied()
        .reduce(|a, b| a.union(b))
        .map(|r| r.center())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    const PARAMS: VectorParams = VectorParams {
        min_distance: 100.0,
        max_extra: 200.0,
        rotation_range: 90.0,
        scale_min: 0.5,
        scale_max: 1.5,
    };

    #[test]
    fn vectors_point_outward_with_exact_values() {
        let rects = [
            Rect::new(-10.0, -5.0, 0.0, 5.0), // left of center
            Rect::new(0.0, 10.0, 10.0, 20.0), // below-right
        ];
        let mut rng = SequenceRandom::new(vec![0.5, 0.0, 0.5]);
        let v = compute_vectors(&rects, Point::ZERO, PARAMS, &mut rng);

        assert!((v[0].offset.x + 200.0).abs() < 1e-9);
        assert!(v[0].offset.y.abs() < 1e-9);
        assert_eq!(v[0].rotation_deg, -45.0);
        assert_eq!(v[0].scale, 1.0);

        // cursor wrapped: distance 0.5 -> 200, rotation 0.0 -> -45, scale 0.5 -> 1.0
        let dir = Vec2::new(5.0, 15.0) / Vec2::new(5.0, 15.0).hypot();
        assert!((v[1].offset - dir * 200.0).hypot() < 1e-9);
    }

    #[test]
    fn coincident_centers_draw_an_angle() {
        let rects = [Rect::new(-1.0, -1.0, 1.0, 1.0)];
        let mut rng = SequenceRandom::new(vec![0.25, 0.0, 0.5, 0.0]);
        let v = compute_vectors(&rects, Point::ZERO, PARAMS, &mut rng);
        // angle = TAU / 4 -> straight down
        assert!(v[0].offset.x.abs() < 1e-9);
        assert!((v[0].offset.y - 100.0).abs() < 1e-9);
        assert_eq!(v[0].rotation_deg, 0.0);
        assert_eq!(v[0].scale, 0.5);
    }

    #[test]
    fn mapping_interpolates_from_identity() {
        let v = ExplosionVector {
            offset: Vec2::new(100.0, -50.0),
            rotation_deg: 90.0,
            scale: 2.0,
        };
        assert_eq!(v.at(0.0), ExplosionVector::IDENTITY.at(0.0));
        let half = v.at(0.5);
        assert_eq!(half.translate, Some(Vec2::new(50.0, -25.0)));
        assert_eq!(half.rotation_deg, Some(45.0));
        assert_eq!(half.scale, Some(1.5));
        assert_eq!(half.opacity, Some(0.5));
    }

    #[test]
    fn reference_center_uses_union() {
        let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(90.0, 0.0, 100.0, 10.0)];
        assert_eq!(reference_center(&rects, Point::ZERO), Point::new(50.0, 5.0));
        assert_eq!(
            reference_center(&[], Point::new(1.0, 2.0)),
            Point::new(1.0, 2.0)
        );
    }
}
