use crate::absorption::AbsorptionWeightingType;
use crate::optics::OpticalProperties;
use crate::virtual_boundary::VirtualBoundaryType;
use super::{Binning, Coordinate, Detector, DetectorContext, TallyData, TallyEvent, MAX_AXES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeQuantity { Absorption, Fluence }

/// Absorbed energy or fluence inside the tissue, accumulated from the
/// segments of complete histories and binned by where each segment ends.
#[derive(Clone, Debug)]
pub struct VolumeDetector {
    name: String,
    type_name: &'static str,
    quantity: VolumeQuantity,
    coordinates: Vec<Coordinate>,
    absorption_weighting: AbsorptionWeightingType,
    optical_properties: Vec<OpticalProperties>,
    in_domain: Vec<bool>,
    data: TallyData,
}

impl VolumeDetector {
    pub fn new(
        name: String,
        type_name: &'static str,
        quantity: VolumeQuantity,
        binning: Binning,
        ctx: &DetectorContext,
    ) -> Self {
        Self {
            name, type_name, quantity,
            coordinates: binning.axes().iter().map(|a| a.coordinate).collect(),
            absorption_weighting: ctx.absorption_weighting,
            optical_properties: ctx.optical_properties.clone(),
            in_domain: ctx.in_domain.clone(),
            data: TallyData::new(binning),
        }
    }
}

impl Detector for VolumeDetector {
    fn name(&self) -> &str { &self.name }

    fn type_name(&self) -> &'static str { self.type_name }

    fn virtual_boundary(&self) -> VirtualBoundaryType { VirtualBoundaryType::GenericVolume }

    fn needs_history(&self) -> bool { true }

    fn tally(&mut self, event: &TallyEvent) {
        let awt = self.absorption_weighting;
        for (previous, current) in event.history.segments() {
            let region = current.region;
            if !self.in_domain.get(region).copied().unwrap_or(false) { continue }
            let op = &self.optical_properties[region];
            let weight = match self.quantity {
                VolumeQuantity::Absorption => awt.absorbed_weight(previous, current, op),
                VolumeQuantity::Fluence    => awt.fluence_weight (previous, current, op),
            };
            if weight == 0.0 { continue }
            let mut values = [0.0; MAX_AXES];
            for (v, c) in values.iter_mut().zip(&self.coordinates) {
                *v = c.of(current).unwrap_or(f64::NAN);
            }
            self.data.tally(&values[..self.coordinates.len()], weight);
        }
    }

    fn tally_data(&self) -> &TallyData { &self.data }

    fn tally_data_mut(&mut self) -> &mut TallyData { &mut self.data }
}
