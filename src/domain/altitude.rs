//! Altitude correction for hemoglobin.
//!
//! Hemoglobin rises physiologically with altitude, so a measured value is
//! adjusted before it is compared with sea-level thresholds. The correction is
//! a piecewise-linear interpolation over the policy's breakpoint table.

use super::patient::Location;
use super::policy::{AltitudePolicy, Breakpoint};

/// Maps an altitude to a hemoglobin correction in g/dL.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeCorrector<'a> {
    policy: &'a AltitudePolicy,
}

impl<'a> AltitudeCorrector<'a> {
    #[must_use]
    pub fn new(policy: &'a AltitudePolicy) -> Self {
        Self { policy }
    }

    /// Altitude for a location, falling back to the configured default for
    /// unknown regions.
    #[must_use]
    pub fn altitude_for(&self, location: &Location) -> f64 {
        location.altitude_m(self.policy.default_altitude_m)
    }

    /// Non-negative correction for `altitude_m`.
    ///
    /// Below the first breakpoint the correction is zero. Inside a segment it
    /// is interpolated from the segment's start delta towards the next
    /// breakpoint's delta. Above the last breakpoint it grows by
    /// `per_1000m_above_last` for every additional 1000 m.
    #[must_use]
    pub fn correct(&self, altitude_m: f64) -> f64 {
        // NaN.max(0.0) is 0.0, so non-finite input lands at sea level.
        let altitude = altitude_m.max(0.0);
        let points = &self.policy.breakpoints;

        let Some(first) = points.first() else {
            return 0.0;
        };
        if altitude < first.altitude_m {
            return 0.0;
        }

        for pair in points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if altitude < hi.altitude_m {
                return interpolate(lo, hi, altitude);
            }
        }

        let last = points[points.len() - 1];
        let above = (altitude - last.altitude_m) / 1000.0;
        last.delta_g_dl + above * self.policy.per_1000m_above_last
    }
}

fn interpolate(lo: Breakpoint, hi: Breakpoint, altitude: f64) -> f64 {
    let span = hi.altitude_m - lo.altitude_m;
    let fraction = (altitude - lo.altitude_m) / span;
    lo.delta_g_dl + fraction * (hi.delta_g_dl - lo.delta_g_dl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::region::Region;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_table_points() {
        let policy = AltitudePolicy::default();
        let corrector = AltitudeCorrector::new(&policy);

        assert!(approx(corrector.correct(0.0), 0.0));
        assert!(approx(corrector.correct(999.0), 0.0));
        assert!(approx(corrector.correct(1000.0), 0.2));
        assert!(approx(corrector.correct(1500.0), 0.45));
        assert!(approx(corrector.correct(2000.0), 0.7));
        assert!(approx(corrector.correct(2500.0), 1.0));
        assert!(approx(corrector.correct(3000.0), 1.3));
        assert!(approx(corrector.correct(3800.0), 1.94));
        assert!(approx(corrector.correct(4000.0), 2.1));
        assert!(approx(corrector.correct(5000.0), 2.3));
    }

    #[test]
    fn test_negative_and_nan_clamped_to_sea_level() {
        let policy = AltitudePolicy::default();
        let corrector = AltitudeCorrector::new(&policy);
        assert!(approx(corrector.correct(-250.0), 0.0));
        assert!(approx(corrector.correct(f64::NAN), 0.0));
    }

    #[test]
    fn test_non_negative_and_non_decreasing() {
        let policy = AltitudePolicy::default();
        let corrector = AltitudeCorrector::new(&policy);

        let mut previous = corrector.correct(0.0);
        for meters in (0..10_000).step_by(7) {
            let current = corrector.correct(f64::from(meters));
            assert!(current >= 0.0, "negative correction at {meters} m");
            assert!(current >= previous, "correction decreased at {meters} m");
            previous = current;
        }
    }

    #[test]
    fn test_empty_table_means_no_correction() {
        let policy = AltitudePolicy {
            breakpoints: Vec::new(),
            ..AltitudePolicy::default()
        };
        assert!(approx(AltitudeCorrector::new(&policy).correct(4500.0), 0.0));
    }

    #[test]
    fn test_unknown_region_uses_default_altitude() {
        let policy = AltitudePolicy {
            default_altitude_m: 1500.0,
            ..AltitudePolicy::default()
        };
        let corrector = AltitudeCorrector::new(&policy);
        let altitude = corrector.altitude_for(&Location::Region(Region::Unspecified));
        assert!(approx(altitude, 1500.0));
        assert!(approx(corrector.correct(altitude), 0.45));
    }
}
