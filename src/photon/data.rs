use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::types::{Length, Point, RegionIndex, Time, Vector, Weight};

/// Where a photon is in its life cycle. The `Pseudo*` states mark events at
/// which the photon is tallied but carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhotonStatus {
    /// Freshly launched, or has just scattered
    Alive,
    /// Reflected at, or crossed, an interface between tissue regions
    PseudoTissueBoundary,
    /// Crossed an internal-surface virtual boundary
    PseudoInternalSurface,
    /// Weight reflected specularly at launch
    PseudoSpecular,
    ExitedTop,
    ExitedBottom,
    ExitedBoundingVolume,
    Absorbed,
    KilledRussianRoulette,
    KilledOverMaximumCollisions,
    KilledOverMaximumPathLength,
}

impl PhotonStatus {

    pub const TERMINAL: [Self; 7] = [
        Self::ExitedTop, Self::ExitedBottom, Self::ExitedBoundingVolume, Self::Absorbed,
        Self::KilledRussianRoulette, Self::KilledOverMaximumCollisions, Self::KilledOverMaximumPathLength,
    ];

    pub fn is_terminal(self) -> bool { Self::TERMINAL.contains(&self) }

    pub fn is_exit(self) -> bool {
        matches!(self, Self::ExitedTop | Self::ExitedBottom | Self::ExitedBoundingVolume)
    }

    /// The photon interacted with the medium at this point
    pub fn is_collision(self) -> bool { matches!(self, Self::Alive | Self::Absorbed) }
}

/// Snapshot of a photon's state at one event
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotonDataPoint {
    pub position  : Point,
    pub direction : Vector,
    pub weight    : Weight,
    /// Time of flight since launch, in ps
    pub total_time: Time,
    /// In a history, the region traversed to reach this point; otherwise the
    /// region the photon is currently in
    pub region    : RegionIndex,
    pub status    : PhotonStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubRegionCollisionInfo {
    pub path_length: Length,
    pub collisions : u64,
}

/// Per-region path lengths and collision counts accumulated over one history
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionInfo(pub Vec<SubRegionCollisionInfo>);

impl CollisionInfo {

    pub fn new(number_of_regions: usize) -> Self {
        Self(vec![SubRegionCollisionInfo::default(); number_of_regions])
    }

    pub fn add_path(&mut self, region: RegionIndex, length: Length) { self.0[region].path_length += length }

    pub fn add_collision(&mut self, region: RegionIndex) { self.0[region].collisions += 1 }

    pub fn reset(&mut self) { self.0.iter_mut().for_each(|s| *s = SubRegionCollisionInfo::default()) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &SubRegionCollisionInfo> { self.0.iter() }

    pub fn total_path_length(&self) -> Length { self.0.iter().map(|s| s.path_length).sum() }

    pub fn total_collisions(&self) -> u64 { self.0.iter().map(|s| s.collisions).sum() }
}

impl std::ops::Index<RegionIndex> for CollisionInfo {
    type Output = SubRegionCollisionInfo;
    fn index(&self, region: RegionIndex) -> &Self::Output { &self.0[region] }
}

/// Ordered record of a photon's events, from launch to termination
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhotonHistory {
    pub points: Vec<PhotonDataPoint>,
}

impl PhotonHistory {

    pub fn push(&mut self, dp: PhotonDataPoint) { self.points.push(dp) }

    pub fn clear(&mut self) { self.points.clear() }

    /// Consecutive `(previous, current)` pairs
    pub fn segments(&self) -> impl Iterator<Item = (&PhotonDataPoint, &PhotonDataPoint)> {
        self.points.iter().tuple_windows()
    }
}
