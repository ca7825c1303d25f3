use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::optics::OpticalProperties;
use crate::types::{Length, Range, RegionIndex};
use crate::virtual_boundary::VirtualBoundaryType;
use super::{
    Binning, Coordinate, Detector, DetectorContext, DetectorError,
    PmcDetector, PmcQuantity, ROfFxDetector, ReflectedMTDetector, ReflectedTimeDetector,
    SurfaceDetector, VolumeDetector, VolumeQuantity,
};

/// A detector as written in input files: an optional name (defaulting to the
/// type tag) and the detector's type and binning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: DetectorKind,
}

/// Perturbed optical properties for perturbation Monte Carlo detectors: one
/// entry per tissue region, of which only those in `regions` differ from the
/// simulated tissue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Perturbation {
    pub regions: Vec<RegionIndex>,
    pub optical_properties: Vec<OpticalProperties>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DetectorKind {
    RDiffuse,
    ROfRho { rho: Range },
    ROfAngle { angle: Range },
    ROfRhoAndTime { rho: Range, time: Range },
    ROfRhoAndAngle { rho: Range, angle: Range },
    ROfXAndY { x: Range, y: Range },
    ROfFx { fx: Range },
    TDiffuse,
    TOfRho { rho: Range },
    TOfAngle { angle: Range },
    TOfRhoAndAngle { rho: Range, angle: Range },
    TOfXAndY { x: Range, y: Range },
    RSpecular,
    RadianceOfRhoAtZ {
        rho: Range,
        #[serde(deserialize_with = "crate::config::deserialize_length")]
        z: Length,
    },
    ATotal,
    AOfRhoAndZ { rho: Range, z: Range },
    AOfXAndYAndZ { x: Range, y: Range, z: Range },
    FluenceOfRhoAndZ { rho: Range, z: Range },
    FluenceOfXAndYAndZ { x: Range, y: Range, z: Range },
    FluenceOfRhoAndZAndTime { rho: Range, z: Range, time: Range },
    ATotalBoundingVolume,
    ReflectedTimeOfRhoAndSubregionHist { rho: Range, time: Range },
    ReflectedMTOfRhoAndSubregionHist { rho: Range, mt: Range, blood_volume_fractions: Vec<f64> },
    #[serde(rename = "pMCROfRho")]
    PmcROfRho { rho: Range, perturbation: Perturbation },
    #[serde(rename = "pMCROfRhoAndTime")]
    PmcROfRhoAndTime { rho: Range, time: Range, perturbation: Perturbation },
    #[serde(rename = "pMCROfXAndY")]
    PmcROfXAndY { x: Range, y: Range, perturbation: Perturbation },
    #[serde(rename = "dMCdROfRhodMua")]
    DmcdROfRhodMua { rho: Range, perturbation: Perturbation },
    #[serde(rename = "dMCdROfRhodMus")]
    DmcdROfRhodMus { rho: Range, perturbation: Perturbation },
}

impl DetectorKind {

    pub fn type_name(&self) -> &'static str {
        use DetectorKind::*;
        match self {
            RDiffuse                                => "RDiffuse",
            ROfRho { .. }                           => "ROfRho",
            ROfAngle { .. }                         => "ROfAngle",
            ROfRhoAndTime { .. }                    => "ROfRhoAndTime",
            ROfRhoAndAngle { .. }                   => "ROfRhoAndAngle",
            ROfXAndY { .. }                         => "ROfXAndY",
            ROfFx { .. }                            => "ROfFx",
            TDiffuse                                => "TDiffuse",
            TOfRho { .. }                           => "TOfRho",
            TOfAngle { .. }                         => "TOfAngle",
            TOfRhoAndAngle { .. }                   => "TOfRhoAndAngle",
            TOfXAndY { .. }                         => "TOfXAndY",
            RSpecular                               => "RSpecular",
            RadianceOfRhoAtZ { .. }                 => "RadianceOfRhoAtZ",
            ATotal                                  => "ATotal",
            AOfRhoAndZ { .. }                       => "AOfRhoAndZ",
            AOfXAndYAndZ { .. }                     => "AOfXAndYAndZ",
            FluenceOfRhoAndZ { .. }                 => "FluenceOfRhoAndZ",
            FluenceOfXAndYAndZ { .. }               => "FluenceOfXAndYAndZ",
            FluenceOfRhoAndZAndTime { .. }          => "FluenceOfRhoAndZAndTime",
            ATotalBoundingVolume                    => "ATotalBoundingVolume",
            ReflectedTimeOfRhoAndSubregionHist { .. } => "ReflectedTimeOfRhoAndSubregionHist",
            ReflectedMTOfRhoAndSubregionHist { .. } => "ReflectedMTOfRhoAndSubregionHist",
            PmcROfRho { .. }                        => "pMCROfRho",
            PmcROfRhoAndTime { .. }                 => "pMCROfRhoAndTime",
            PmcROfXAndY { .. }                      => "pMCROfXAndY",
            DmcdROfRhodMua { .. }                   => "dMCdROfRhodMua",
            DmcdROfRhodMus { .. }                   => "dMCdROfRhodMus",
        }
    }

    pub fn virtual_boundary(&self) -> VirtualBoundaryType {
        use DetectorKind::*;
        use VirtualBoundaryType as VB;
        match self {
            RDiffuse | ROfRho { .. } | ROfAngle { .. } | ROfRhoAndTime { .. } | ROfRhoAndAngle { .. } |
            ROfXAndY { .. } | ROfFx { .. } |
            ReflectedTimeOfRhoAndSubregionHist { .. } | ReflectedMTOfRhoAndSubregionHist { .. } => VB::DiffuseReflectance,
            TDiffuse | TOfRho { .. } | TOfAngle { .. } | TOfRhoAndAngle { .. } | TOfXAndY { .. } => VB::DiffuseTransmittance,
            RSpecular => VB::Specular,
            RadianceOfRhoAtZ { .. } => VB::InternalSurface,
            ATotal | AOfRhoAndZ { .. } | AOfXAndYAndZ { .. } |
            FluenceOfRhoAndZ { .. } | FluenceOfXAndYAndZ { .. } | FluenceOfRhoAndZAndTime { .. } => VB::GenericVolume,
            ATotalBoundingVolume => VB::BoundingVolume,
            PmcROfRho { .. } | PmcROfRhoAndTime { .. } | PmcROfXAndY { .. } |
            DmcdROfRhodMua { .. } | DmcdROfRhodMus { .. } => VB::PmcDiffuseReflectance,
        }
    }

    /// The binning axes given in the input. Subregion axes, whose size
    /// depends on the tissue, are not included.
    pub fn axes(&self) -> Vec<(Coordinate, Range)> {
        use Coordinate as C;
        use DetectorKind::*;
        match self {
            RDiffuse | TDiffuse | RSpecular | ATotal | ATotalBoundingVolume => vec![],
            ROfRho { rho } | TOfRho { rho } | RadianceOfRhoAtZ { rho, .. } |
            PmcROfRho { rho, .. } | DmcdROfRhodMua { rho, .. } | DmcdROfRhodMus { rho, .. } => vec![(C::Rho, *rho)],
            ROfAngle { angle } | TOfAngle { angle } => vec![(C::Angle, *angle)],
            ROfRhoAndTime { rho, time } | PmcROfRhoAndTime { rho, time, .. } => vec![(C::Rho, *rho), (C::Time, *time)],
            ROfRhoAndAngle { rho, angle } | TOfRhoAndAngle { rho, angle } => vec![(C::Rho, *rho), (C::Angle, *angle)],
            ROfXAndY { x, y } | TOfXAndY { x, y } | PmcROfXAndY { x, y, .. } => vec![(C::X, *x), (C::Y, *y)],
            ROfFx { fx } => vec![(C::Fx, *fx)],
            AOfRhoAndZ { rho, z } | FluenceOfRhoAndZ { rho, z } => vec![(C::Rho, *rho), (C::Z, *z)],
            AOfXAndYAndZ { x, y, z } | FluenceOfXAndYAndZ { x, y, z } => vec![(C::X, *x), (C::Y, *y), (C::Z, *z)],
            FluenceOfRhoAndZAndTime { rho, z, time } => vec![(C::Rho, *rho), (C::Z, *z), (C::Time, *time)],
            ReflectedTimeOfRhoAndSubregionHist { rho, time } => vec![(C::Rho, *rho), (C::Time, *time)],
            ReflectedMTOfRhoAndSubregionHist { rho, mt, .. } => vec![(C::Rho, *rho), (C::MomentumTransfer, *mt)],
        }
    }

    pub fn perturbation(&self) -> Option<&Perturbation> {
        use DetectorKind::*;
        match self {
            PmcROfRho { perturbation, .. } | PmcROfRhoAndTime { perturbation, .. } | PmcROfXAndY { perturbation, .. } |
            DmcdROfRhodMua { perturbation, .. } | DmcdROfRhodMus { perturbation, .. } => Some(perturbation),
            _ => None,
        }
    }

    pub fn is_path_length_history(&self) -> bool {
        matches!(self, Self::ReflectedTimeOfRhoAndSubregionHist { .. } | Self::ReflectedMTOfRhoAndSubregionHist { .. })
    }

    /// Binned by distance from the z-axis
    pub fn is_cylindrical(&self) -> bool { self.axes().iter().any(|(c, _)| *c == Coordinate::Rho) }
}

impl DetectorInput {

    pub fn new(kind: DetectorKind) -> Self { Self { name: None, kind } }

    pub fn named(name: impl Into<String>, kind: DetectorKind) -> Self { Self { name: Some(name.into()), kind } }

    pub fn name(&self) -> &str { self.name.as_deref().unwrap_or_else(|| self.kind.type_name()) }

    /// Create the detector described by this input, for the tissue described
    /// by `ctx`
    pub fn build(&self, ctx: &DetectorContext) -> Result<Box<dyn Detector>, DetectorError> {
        use DetectorKind::*;
        let name = self.name().to_string();
        let type_name = self.kind.type_name();
        let mut axes = self.kind.axes();
        if self.kind.is_path_length_history() {
            axes.insert(1, (Coordinate::Subregion, Binning::subregion_range(ctx.number_of_regions())));
        }
        let binning = Binning::new(&axes)?;
        let surface = |vb| -> Box<dyn Detector> {
            Box::new(SurfaceDetector::new(name.clone(), type_name, vb, binning.clone()))
        };
        let volume = |quantity| -> Box<dyn Detector> {
            Box::new(VolumeDetector::new(name.clone(), type_name, quantity, binning.clone(), ctx))
        };
        let pmc = |quantity, p: &Perturbation| -> Result<Box<dyn Detector>, DetectorError> {
            Ok(Box::new(PmcDetector::new(name.clone(), type_name, quantity, binning.clone(),
                                         &p.optical_properties, &p.regions, ctx)?))
        };
        let detector: Box<dyn Detector> = match &self.kind {
            RDiffuse | ROfRho { .. } | ROfAngle { .. } | ROfRhoAndTime { .. } | ROfRhoAndAngle { .. } | ROfXAndY { .. } |
            TDiffuse | TOfRho { .. } | TOfAngle { .. } | TOfRhoAndAngle { .. } | TOfXAndY { .. } |
            RSpecular | ATotalBoundingVolume => surface(self.kind.virtual_boundary()),
            &RadianceOfRhoAtZ { z, .. } => Box::new(SurfaceDetector::internal(name.clone(), type_name, z, binning.clone())),
            ROfFx { .. } => Box::new(ROfFxDetector::new(name.clone(), binning.clone())),
            ATotal | AOfRhoAndZ { .. } | AOfXAndYAndZ { .. } => volume(VolumeQuantity::Absorption),
            FluenceOfRhoAndZ { .. } | FluenceOfXAndYAndZ { .. } | FluenceOfRhoAndZAndTime { .. } => volume(VolumeQuantity::Fluence),
            ReflectedTimeOfRhoAndSubregionHist { .. } =>
                Box::new(ReflectedTimeDetector::new(name.clone(), binning.clone(), ctx)),
            ReflectedMTOfRhoAndSubregionHist { blood_volume_fractions, .. } =>
                Box::new(ReflectedMTDetector::new(name.clone(), binning.clone(), blood_volume_fractions, ctx)?),
            PmcROfRho { perturbation, .. } | PmcROfRhoAndTime { perturbation, .. } | PmcROfXAndY { perturbation, .. } =>
                pmc(PmcQuantity::Reflectance, perturbation)?,
            DmcdROfRhodMua { perturbation, .. } => pmc(PmcQuantity::DerivativeMua, perturbation)?,
            DmcdROfRhodMus { perturbation, .. } => pmc(PmcQuantity::DerivativeMus, perturbation)?,
        };
        Ok(detector)
    }
}

/// Give every detector a distinct name by appending `-2`, `-3`, ... to
/// repeats. Returns the names which were changed, as `(old, new)`.
pub fn unique_names(detectors: &mut [DetectorInput]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut renamed = vec![];
    for d in detectors.iter_mut() {
        let original = d.name().to_string();
        let mut name = original.clone();
        let mut k = 2;
        while !seen.insert(name.clone()) {
            name = format!("{original}-{k}");
            k += 1;
        }
        if name != original {
            renamed.push((original, name.clone()));
            d.name = Some(name);
        }
    }
    renamed
}
