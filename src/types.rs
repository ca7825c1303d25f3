use serde::{Deserialize, Serialize};

pub use units::{Angle, Length, PerLength, Ratio, Time, Weight};
pub use geometry::{Point, Vector};

/// Index of a region within a tissue
pub type RegionIndex = usize;

/// Index of a photon within a simulation: `0..N`
pub type PhotonIndex = u64;

/// Evenly spaced bin *edges*: `count` edges delimit `count - 1` bins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    pub start: f64,
    pub stop : f64,
    pub count: usize,
}

impl Range {
    pub fn new(start: f64, stop: f64, count: usize) -> Self { Self { start, stop, count } }

    pub fn number_of_bins(&self) -> usize { self.count.saturating_sub(1) }

    pub fn delta(&self) -> f64 { (self.stop - self.start) / self.number_of_bins() as f64 }

    /// Centre of bin `i`
    pub fn midpoint(&self, i: usize) -> f64 { self.start + (i as f64 + 0.5) * self.delta() }

    pub fn midpoints(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.number_of_bins()).map(|i| self.midpoint(i))
    }

    pub fn edges(&self) -> impl Iterator<Item = f64> + '_ {
        let delta = self.delta();
        (0..self.count).map(move |i| self.start + i as f64 * delta)
    }

    pub fn is_valid(&self) -> bool {
        self.count >= 2 && self.start.is_finite() && self.stop.is_finite() && self.start < self.stop
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} .. {}; {} edges]", self.start, self.stop, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn edges_and_midpoints() {
        let r = Range::new(0.0, 10.0, 11);
        assert_eq!(r.number_of_bins(), 10);
        assert_float_eq!(r.delta(), 1.0, ulps <= 1);
        assert_float_eq!(r.midpoint(3), 3.5, ulps <= 1);
        assert_eq!(r.edges().count(), 11);
        assert_eq!(r.midpoints().count(), 10);
        assert!(r.is_valid());
        assert!(!Range::new(1.0, 1.0, 5).is_valid());
        assert!(!Range::new(0.0, 1.0, 1).is_valid());
    }
}
