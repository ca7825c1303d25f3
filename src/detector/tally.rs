use itertools::Itertools;
use ndarray::{ArrayD, Dimension, IxDyn, Zip};

use super::binning::{BinIndex, Binning};
use super::DetectorError;

/// Mean and second moment of a detector's quantity in each bin.
///
/// Contributions are buffered for the photon currently being tallied; at the
/// end of the photon's history they are summed per bin, so the second moment
/// receives the square of each photon's total contribution to a bin.
#[derive(Clone, Debug)]
pub struct TallyData {
    binning: Binning,
    mean: ArrayD<f64>,
    second_moment: ArrayD<f64>,
    current: Vec<(BinIndex, f64)>,
    tally_count: u64,
    normalized: bool,
}

impl TallyData {

    pub fn new(binning: Binning) -> Self {
        let shape = IxDyn(&binning.shape());
        Self {
            mean: ArrayD::zeros(shape.clone()),
            second_moment: ArrayD::zeros(shape),
            binning,
            current: vec![],
            tally_count: 0,
            normalized: false,
        }
    }

    pub fn binning(&self) -> &Binning { &self.binning }

    pub fn mean(&self) -> &ArrayD<f64> { &self.mean }

    pub fn second_moment(&self) -> &ArrayD<f64> { &self.second_moment }

    /// Number of individual contributions received
    pub fn tally_count(&self) -> u64 { self.tally_count }

    pub fn is_normalized(&self) -> bool { self.normalized }

    /// Add `weight` to the bin containing `values`. Returns whether a bin was
    /// found.
    pub fn tally(&mut self, values: &[f64], weight: f64) -> bool {
        match self.binning.index(values) {
            Some(index) => { self.add(index, weight); true }
            None        => false,
        }
    }

    pub fn add(&mut self, index: BinIndex, weight: f64) {
        self.current.push((index, weight));
        self.tally_count += 1;
    }

    /// Fold the current photon's contributions into the moments
    pub fn end_photon(&mut self) {
        if self.current.is_empty() { return }
        let Self { binning, mean, second_moment, current, .. } = self;
        let ndim = binning.ndim();
        current.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (index, group) in &current.iter().group_by(|(index, _)| *index) {
            let sum: f64 = group.map(|(_, w)| w).sum();
            let index = &index[..ndim];
            mean[index] += sum;
            second_moment[index] += sum * sum;
        }
        current.clear();
    }

    /// Drop the current photon's contributions without recording them
    pub fn discard_photon(&mut self) {
        self.tally_count -= self.current.len() as u64;
        self.current.clear();
    }

    /// Divide by the number of photons launched and by each bin's measure
    pub(super) fn normalize(&mut self, n: u64) -> Result<(), DetectorError> {
        if self.normalized { return Err(DetectorError::AlreadyNormalized) }
        if n == 0 { return Err(DetectorError::NoPhotons) }
        self.end_photon();
        let Self { binning, mean, second_moment, .. } = self;
        let n = n as f64;
        Zip::indexed(mean).and(second_moment).for_each(|index, m, s| {
            let f = binning.normalization_factor(index.slice());
            *m /= n * f;
            *s /= n * f * f;
        });
        self.normalized = true;
        Ok(())
    }

    /// Accumulate the un-normalized sums of another partition
    pub fn merge(&mut self, other: &Self) -> Result<(), DetectorError> {
        if self.normalized || other.normalized { return Err(DetectorError::AlreadyNormalized) }
        if !self.binning.same_as(&other.binning) { return Err(DetectorError::IncompatibleBinning) }
        self.mean          += &other.mean;
        self.second_moment += &other.second_moment;
        self.tally_count   += other.tally_count;
        Ok(())
    }
}
