use ndhistogram::axis::{Axis, Uniform};
use serde::{Deserialize, Serialize};
use units::TWOPI;

use crate::photon::PhotonDataPoint;
use crate::types::{Range, RegionIndex};
use super::DetectorError;

/// Highest dimensionality of any detector
pub const MAX_AXES: usize = 3;

/// Position of a bin; only the first `Binning::ndim()` entries are meaningful
pub type BinIndex = [usize; MAX_AXES];

/// The quantity along a binning axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coordinate {
    /// Radial distance from the z-axis
    Rho,
    /// Polar angle between the direction and the surface normal
    Angle,
    Time,
    X,
    Y,
    Z,
    /// Tissue region index
    Subregion,
    /// Dimensionless momentum transfer
    MomentumTransfer,
    /// Spatial frequency, in mm⁻¹
    Fx,
}

impl Coordinate {

    /// The value of a position/direction/time coordinate at a data point;
    /// `None` for coordinates which are not properties of a single point.
    pub fn of(self, dp: &PhotonDataPoint) -> Option<f64> {
        Some(match self {
            Self::Rho   => dp.position.rho(),
            Self::Angle => dp.direction.z.abs().min(1.0).acos(),
            Self::Time  => dp.total_time,
            Self::X     => dp.position.x,
            Self::Y     => dp.position.y,
            Self::Z     => dp.position.z,
            Self::Subregion | Self::MomentumTransfer | Self::Fx => return None,
        })
    }

    /// Size of bin `i` of `range` along this coordinate: an annulus area for
    /// `Rho`, a solid angle for `Angle`, a plain width otherwise.
    fn bin_measure(self, range: &Range, i: usize) -> f64 {
        match self {
            Self::Rho   => TWOPI * range.midpoint(i) * range.delta(),
            Self::Angle => TWOPI * range.midpoint(i).sin() * range.delta(),
            Self::Subregion | Self::Fx => 1.0,
            Self::Time | Self::X | Self::Y | Self::Z | Self::MomentumTransfer => range.delta(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BinAxis {
    pub coordinate: Coordinate,
    pub range: Range,
    axis: Uniform<f64>,
}

/// Uniform binning over up to `MAX_AXES` coordinates. A binning with no axes
/// has a single bin, for scalar detectors.
#[derive(Clone, Debug, Default)]
pub struct Binning {
    axes: Vec<BinAxis>,
}

impl Binning {

    pub fn new(axes: &[(Coordinate, Range)]) -> Result<Self, DetectorError> {
        if axes.len() > MAX_AXES { return Err(DetectorError::TooManyAxes(axes.len())) }
        let axes = axes.iter()
            .map(|&(coordinate, range)| {
                if !range.is_valid() { return Err(DetectorError::BadRange { coordinate, range }) }
                let axis = Uniform::new(range.number_of_bins(), range.start, range.stop);
                Ok(BinAxis { coordinate, range, axis })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { axes })
    }

    pub fn scalar() -> Self { Self::default() }

    /// One bin per region; region `r` is found at value `r + 0.5`
    pub fn subregion_range(number_of_regions: usize) -> Range {
        Range::new(0.0, number_of_regions as f64, number_of_regions + 1)
    }

    pub fn subregion_value(region: RegionIndex) -> f64 { region as f64 + 0.5 }

    pub fn ndim(&self) -> usize { self.axes.len() }

    pub fn axes(&self) -> &[BinAxis] { &self.axes }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.range.number_of_bins()).collect()
    }

    /// The bin containing `values`, one per axis. Values beyond either end of
    /// an axis are gathered into its first or last bin. `None` if any value
    /// is NaN.
    pub fn index(&self, values: &[f64]) -> Option<BinIndex> {
        let mut index = [0; MAX_AXES];
        for (slot, (axis, value)) in index.iter_mut().zip(self.axes.iter().zip(values)) {
            if value.is_nan() { return None }
            let last = axis.range.number_of_bins() - 1;
            // 0 is underflow, 1..=n in range, n+1 overflow
            *slot = axis.axis.index(value)?.saturating_sub(1).min(last);
        }
        Some(index)
    }

    /// Bin index along axis `axis` for `value`, with the same clamping as
    /// `index`
    pub fn axis_index(&self, axis: usize, value: f64) -> Option<usize> {
        let a = self.axes.get(axis)?;
        if value.is_nan() { return None }
        Some(a.axis.index(&value)?.saturating_sub(1).min(a.range.number_of_bins() - 1))
    }

    /// Product of the bin measures of every axis at `index`
    pub fn normalization_factor(&self, index: &[usize]) -> f64 {
        self.axes.iter().zip(index)
            .map(|(a, &i)| a.coordinate.bin_measure(&a.range, i))
            .product()
    }

    pub fn same_as(&self, other: &Self) -> bool {
        self.axes.len() == other.axes.len() &&
            self.axes.iter().zip(&other.axes)
                .all(|(a, b)| a.coordinate == b.coordinate && a.range == b.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/ value, expected,
             case(-1.0,  0),
             case( 0.0,  0),
             case( 0.5,  0),
             case( 1.5,  1),
             case( 9.99, 9),
             case(10.0,  9),
             case(1e6,   9),
    )]
    fn out_of_range_values_are_clamped(value: f64, expected: usize) {
        let b = Binning::new(&[(Coordinate::Rho, Range::new(0.0, 10.0, 11))]).unwrap();
        assert_eq!(b.index(&[value]).unwrap()[0], expected);
    }

    #[test]
    fn nan_has_no_bin() {
        let b = Binning::new(&[(Coordinate::Time, Range::new(0.0, 1.0, 3))]).unwrap();
        assert_eq!(b.index(&[f64::NAN]), None);
    }

    #[test]
    fn scalar_binning_has_one_bin() {
        let b = Binning::scalar();
        assert_eq!(b.shape(), Vec::<usize>::new());
        assert_eq!(b.index(&[]), Some([0; MAX_AXES]));
        assert_eq!(b.normalization_factor(&[]), 1.0);
    }

    #[test]
    fn rho_bins_are_annuli() {
        let b = Binning::new(&[(Coordinate::Rho, Range::new(0.0, 2.0, 3)),
                               (Coordinate::Z,   Range::new(0.0, 1.0, 5))]).unwrap();
        assert_eq!(b.shape(), vec![2, 4]);
        // Annulus 1..2 has area 3π; z bins are 0.25 wide
        assert_float_eq!(b.normalization_factor(&[1, 0]), 3.0 * std::f64::consts::PI * 0.25, rmax <= 1e-12);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let bad = Range::new(1.0, 0.0, 10);
        assert_eq!(Binning::new(&[(Coordinate::X, bad)]).unwrap_err(),
                   DetectorError::BadRange { coordinate: Coordinate::X, range: bad });
        let r = Range::new(0.0, 1.0, 2);
        assert!(matches!(Binning::new(&[(Coordinate::X, r); 4]), Err(DetectorError::TooManyAxes(4))));
    }

    #[test]
    fn subregions_have_unit_bins() {
        let b = Binning::new(&[(Coordinate::Subregion, Binning::subregion_range(4))]).unwrap();
        assert_eq!(b.shape(), vec![4]);
        assert_eq!(b.index(&[Binning::subregion_value(2)]).unwrap()[0], 2);
        assert_eq!(b.normalization_factor(&[3]), 1.0);
    }
}
