//─────────────────────────────────────────────────────────────────────────────
// difference <-> distance conversions and derived, resolution-invariant metrics
//─────────────────────────────────────────────────────────────────────────────
//
// difference (D): sum over pixels and RGB channels of (target - current)^2.
//                 unnormalized and additive across disjoint regions.
// distance   (d): sqrt(D / (3P)) / 255, in [0, 1] and comparable across image sizes.

/// RGB only; alpha never contributes to the score
pub const FITNESS_CHANNELS_F64: f64 = 3.0;

/// D = (255 d)^2 * 3P
#[inline]
pub fn distance_to_difference(distance: f64, pixels: usize) -> f64 {
    (distance * 255.0).powi(2) * (FITNESS_CHANNELS_F64 * pixels as f64)
}

/// d = sqrt(D / 3P) / 255
#[inline]
pub fn difference_to_distance(difference: f64, pixels: usize) -> f64 {
    (difference / (FITNESS_CHANNELS_F64 * pixels as f64)).sqrt() / 255.0
}

/// user-facing "similar" percentage
#[inline]
pub fn similarity_percent(distance: f64) -> f64 {
    (100.0 * (1.0 - distance)).clamp(0.0, 100.0)
}

/// PSNR (dB) for 8-bit data. distance is the RMS error scaled by 1/255, so
/// MSE = (255 d)^2 and PSNR = -20 log10(d). capped for a perfect match.
#[inline]
pub fn psnr_from_distance(distance: f64) -> f64 {
    let mse = (distance * 255.0).powi(2).max(1e-12);
    10.0 * ((255.0 * 255.0) / mse).log10()
}

/// cached snapshot of the metrics reported alongside every step
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub distance: f64,
    pub similarity: f64,
    pub psnr: f64,
}

impl MetricsSnapshot {
    #[inline]
    pub fn from_distance(distance: f64) -> Self {
        Self {
            distance,
            similarity: similarity_percent(distance),
            psnr: psnr_from_distance(distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        // every channel of every pixel off by 255 -> distance 1
        let p = 10;
        let d = difference_to_distance(255.0 * 255.0 * 3.0 * p as f64, p);
        assert!((d - 1.0).abs() < 1e-12);
        assert_eq!(difference_to_distance(0.0, p), 0.0);
        assert_eq!(similarity_percent(0.25), 75.0);
    }

    #[test]
    fn test_psnr() {
        // RMS error of 1 level -> 48.13 dB
        let psnr = psnr_from_distance(1.0 / 255.0);
        assert!((psnr - 48.1308).abs() < 1e-3);
        assert!(psnr_from_distance(0.0) > 100.0);
        let snap = MetricsSnapshot::from_distance(0.5);
        assert_eq!(snap.similarity, 50.0);
    }

    proptest! {
        #[test]
        fn difference_distance_round_trip(diff in 0.0f64..1e12, pixels in 1usize..10_000_000) {
            let back = distance_to_difference(difference_to_distance(diff, pixels), pixels);
            prop_assert!((back - diff).abs() <= 1e-9 * diff.max(1.0));
        }

        #[test]
        fn distance_difference_round_trip(dist in 0.0f64..=1.0, pixels in 1usize..10_000_000) {
            let back = difference_to_distance(distance_to_difference(dist, pixels), pixels);
            prop_assert!((back - dist).abs() <= 1e-12);
        }
    }
}
