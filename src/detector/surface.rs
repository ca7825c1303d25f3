use crate::types::Length;
use crate::virtual_boundary::VirtualBoundaryType;
use super::{Binning, Coordinate, Detector, TallyData, TallyEvent};

/// Weight of photons crossing a surface, binned by the position, direction
/// and time at which they cross it. Covers reflectance, transmittance,
/// specular, internal-surface and bounding-volume detectors.
#[derive(Clone, Debug)]
pub struct SurfaceDetector {
    name: String,
    type_name: &'static str,
    boundary: VirtualBoundaryType,
    coordinates: Vec<Coordinate>,
    /// Only crossings heading down (+z) are counted
    downward_only: bool,
    plane: Option<Length>,
    data: TallyData,
}

impl SurfaceDetector {

    pub fn new(name: String, type_name: &'static str, boundary: VirtualBoundaryType, binning: Binning) -> Self {
        let coordinates = binning.axes().iter().map(|a| a.coordinate).collect();
        Self { name, type_name, boundary, coordinates, downward_only: false, plane: None, data: TallyData::new(binning) }
    }

    /// Detector on the internal surface at depth `z`, counting photons which
    /// cross it heading deeper into the tissue
    pub fn internal(name: String, type_name: &'static str, z: Length, binning: Binning) -> Self {
        Self {
            downward_only: true,
            plane: Some(z),
            ..Self::new(name, type_name, VirtualBoundaryType::InternalSurface, binning)
        }
    }
}

impl Detector for SurfaceDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { self.type_name }

    fn virtual_boundary(&self) -> VirtualBoundaryType { self.boundary }

    fn internal_surface(&self) -> Option<Length> { self.plane }

    fn tally(&mut self, event: &TallyEvent) {
        let dp = event.dp;
        if self.downward_only && dp.direction.z <= 0.0 { return }
        let mut values = [0.0; super::MAX_AXES];
        for (v, c) in values.iter_mut().zip(&self.coordinates) {
            *v = c.of(dp).unwrap_or(f64::NAN);
        }
        self.data.tally(&values[..self.coordinates.len()], dp.weight);
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}
