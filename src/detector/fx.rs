use units::TWOPI;

use crate::virtual_boundary::VirtualBoundaryType;
use super::{Binning, Detector, TallyData, TallyEvent, MAX_AXES};

/// Reflectance as a function of spatial frequency: the real part of the
/// Fourier transform along x, `Σ w cos(2π fx x)`. The frequencies sampled are
/// the centres of the fx bins.
#[derive(Clone, Debug)]
pub struct ROfFxDetector {
    name: String,
    frequencies: Vec<f64>,
    data: TallyData,
}

impl ROfFxDetector {
    pub fn new(name: String, binning: Binning) -> Self {
        let frequencies = binning.axes().first()
            .map(|a| a.range.midpoints().collect())
            .unwrap_or_default();
        Self { name, frequencies, data: TallyData::new(binning) }
    }
}

impl Detector for ROfFxDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { "ROfFx" }

    fn virtual_boundary(&self) -> VirtualBoundaryType { VirtualBoundaryType::DiffuseReflectance }

    fn tally(&mut self, event: &TallyEvent) {
        let TallyEvent { dp, .. } = event;
        for (i, fx) in self.frequencies.iter().enumerate() {
            let mut index = [0; MAX_AXES];
            index[0] = i;
            self.data.add(index, dp.weight * (TWOPI * fx * dp.position.x).cos());
        }
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Coordinate;
    use crate::photon::{CollisionInfo, PhotonDataPoint, PhotonHistory, PhotonStatus};
    use crate::types::{Point, Range, Vector};
    use float_eq::assert_float_eq;

    #[test]
    fn zero_frequency_is_total_reflectance() {
        // Bin centres at fx = 0 and 0.5
        let binning = Binning::new(&[(Coordinate::Fx, Range::new(-0.25, 0.75, 3))]).unwrap();
        let mut d = ROfFxDetector::new("ROfFx".into(), binning);
        let (ci, h) = (CollisionInfo::new(3), PhotonHistory::default());
        for x in [0.0, 1.0, 0.5] {
            let dp = PhotonDataPoint {
                position: Point::new(x, 0.0, 0.0), direction: -Vector::unit_z(), weight: 0.5,
                total_time: 0.0, region: 1, status: PhotonStatus::ExitedTop,
            };
            d.tally(&TallyEvent { dp: &dp, collision_info: &ci, history: &h });
            d.end_photon();
        }
        let mean = d.tally_data().mean().as_slice().unwrap();
        assert_float_eq!(mean[0], 1.5, ulps <= 1);
        // cos(0) + cos(π) + cos(π/2)
        assert_float_eq!(mean[1], 0.0, abs <= 1e-15);
    }
}
