//! Photon databases: the exit states of photons leaving the tissue, stored so
//! that detectors can be filled again later without re-running transport.
//!
//! A database file starts with a short header and continues with one record
//! per photon, in launch order. Databases kept for perturbation Monte Carlo
//! also store each photon's collision info.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use binrw::{binrw, BinRead, BinWrite};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photon::{CollisionInfo, PhotonDataPoint, PhotonStatus, SubRegionCollisionInfo};
use crate::types::{Point, Vector};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatabaseType {
    DiffuseReflectance,
    DiffuseTransmittance,
    #[serde(rename = "pMCDiffuseReflectance")]
    PmcDiffuseReflectance,
    #[serde(rename = "pMCDiffuseTransmittance")]
    PmcDiffuseTransmittance,
}

impl DatabaseType {

    pub const ALL: [Self; 4] = [
        Self::DiffuseReflectance, Self::DiffuseTransmittance,
        Self::PmcDiffuseReflectance, Self::PmcDiffuseTransmittance,
    ];

    pub fn accepts(self, status: PhotonStatus) -> bool {
        match self {
            Self::DiffuseReflectance   | Self::PmcDiffuseReflectance   => status == PhotonStatus::ExitedTop,
            Self::DiffuseTransmittance | Self::PmcDiffuseTransmittance => status == PhotonStatus::ExitedBottom,
        }
    }

    pub fn has_collision_info(self) -> bool {
        matches!(self, Self::PmcDiffuseReflectance | Self::PmcDiffuseTransmittance)
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::DiffuseReflectance      => "DiffuseReflectanceDatabase",
            Self::DiffuseTransmittance    => "DiffuseTransmittanceDatabase",
            Self::PmcDiffuseReflectance   => "pMCDiffuseReflectanceDatabase",
            Self::PmcDiffuseTransmittance => "pMCDiffuseTransmittanceDatabase",
        }
    }

    pub fn path(self, dir: &Path) -> PathBuf { dir.join(self.file_name()) }

    fn part_path(self, dir: &Path, partition: usize) -> PathBuf {
        dir.join(format!("{}.part{partition}", self.file_name()))
    }

    fn code(self) -> u8 {
        match self {
            Self::DiffuseReflectance      => 0,
            Self::DiffuseTransmittance    => 1,
            Self::PmcDiffuseReflectance   => 2,
            Self::PmcDiffuseTransmittance => 3,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name().trim_end_matches("Database"))
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{path}: {source}")]
    Format { path: PathBuf, source: binrw::Error },
    #[error("{path}: not a photon database")]
    NotADatabase { path: PathBuf },
    #[error("{path}: unknown photon status code {code}")]
    BadStatus { path: PathBuf, code: u8 },
}

const MAGIC: &[u8; 4] = b"MCPD";

#[binrw]
#[brw(little, magic = b"MCPD")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    kind_code: u8,
    pub number_of_regions: u32,
}

impl Header {
    pub fn kind(&self) -> Option<DatabaseType> {
        DatabaseType::ALL.into_iter().find(|k| k.code() == self.kind_code)
    }
}

#[binrw]
#[brw(little)]
#[derive(Clone, Debug, PartialEq)]
struct Record {
    position: [f64; 3],
    direction: [f64; 3],
    weight: f64,
    total_time: f64,
    region: u32,
    status: u8,
    #[bw(try_calc(u32::try_from(collisions.len())))]
    count: u32,
    #[br(count = count)]
    collisions: Vec<(f64, u64)>,
}

impl Record {

    fn new(dp: &PhotonDataPoint, collision_info: Option<&CollisionInfo>) -> Self {
        let PhotonDataPoint { position: p, direction: d, .. } = dp;
        Self {
            position: [p.x, p.y, p.z],
            direction: [d.x, d.y, d.z],
            weight: dp.weight,
            total_time: dp.total_time,
            region: dp.region as u32,
            status: status_code(dp.status),
            collisions: collision_info.map_or_else(Vec::new, |ci| ci.iter().map(|s| (s.path_length, s.collisions)).collect()),
        }
    }

    fn into_parts(self, path: &Path) -> Result<(PhotonDataPoint, CollisionInfo), DatabaseError> {
        let [x, y, z] = self.position;
        let [ux, uy, uz] = self.direction;
        let status = status_from_code(self.status)
            .ok_or(DatabaseError::BadStatus { path: path.into(), code: self.status })?;
        let dp = PhotonDataPoint {
            position: Point::new(x, y, z),
            direction: Vector::new(ux, uy, uz),
            weight: self.weight,
            total_time: self.total_time,
            region: self.region as usize,
            status,
        };
        let ci = CollisionInfo(self.collisions.into_iter()
            .map(|(path_length, collisions)| SubRegionCollisionInfo { path_length, collisions })
            .collect());
        Ok((dp, ci))
    }
}

const STATUSES: [PhotonStatus; 11] = {
    use PhotonStatus::*;
    [Alive, PseudoTissueBoundary, PseudoInternalSurface, PseudoSpecular,
     ExitedTop, ExitedBottom, ExitedBoundingVolume, Absorbed,
     KilledRussianRoulette, KilledOverMaximumCollisions, KilledOverMaximumPathLength]
};

fn status_code(status: PhotonStatus) -> u8 {
    STATUSES.iter().position(|&s| s == status).unwrap_or(0) as u8
}

fn status_from_code(code: u8) -> Option<PhotonStatus> { STATUSES.get(code as usize).copied() }

/// Appends the records of one partition of a run to a part file.
/// `assemble` joins the parts once every partition has finished.
pub struct DatabaseWriter {
    kind: DatabaseType,
    path: PathBuf,
    writer: BufWriter<File>,
    count: u64,
}

impl DatabaseWriter {

    pub fn create_part(dir: &Path, kind: DatabaseType, partition: usize) -> Result<Self, DatabaseError> {
        let path = kind.part_path(dir, partition);
        let file = File::create(&path).map_err(|source| DatabaseError::Io { path: path.clone(), source })?;
        Ok(Self { kind, path, writer: BufWriter::new(file), count: 0 })
    }

    pub fn kind(&self) -> DatabaseType { self.kind }

    /// Store `dp` if it belongs in this database
    pub fn write(&mut self, dp: &PhotonDataPoint, collision_info: &CollisionInfo) -> Result<(), DatabaseError> {
        if !self.kind.accepts(dp.status) { return Ok(()) }
        let ci = self.kind.has_collision_info().then_some(collision_info);
        Record::new(dp, ci).write(&mut self.writer)
            .map_err(|source| DatabaseError::Format { path: self.path.clone(), source })?;
        self.count += 1;
        Ok(())
    }

    /// Number of records written
    pub fn finish(mut self) -> Result<u64, DatabaseError> {
        self.writer.flush().map_err(|source| DatabaseError::Io { path: self.path.clone(), source })?;
        Ok(self.count)
    }
}

/// Join the part files of partitions `0..partitions` into the database of
/// kind `kind` in `dir`, in partition order, and remove the parts.
pub fn assemble(dir: &Path, kind: DatabaseType, number_of_regions: usize, partitions: usize) -> Result<PathBuf, DatabaseError> {
    let path = kind.path(dir);
    let io = |p: &Path| { let p = p.to_path_buf(); move |source| DatabaseError::Io { path: p, source } };
    let file = File::create(&path).map_err(io(&path))?;
    let mut out = BufWriter::new(file);
    Header { kind_code: kind.code(), number_of_regions: number_of_regions as u32 }
        .write(&mut out)
        .map_err(|source| DatabaseError::Format { path: path.clone(), source })?;
    for partition in 0..partitions {
        let part = kind.part_path(dir, partition);
        let mut input = File::open(&part).map_err(io(&part))?;
        std::io::copy(&mut input, &mut out).map_err(io(&path))?;
        fs::remove_file(&part).map_err(io(&part))?;
    }
    out.flush().map_err(io(&path))?;
    Ok(path)
}

/// Remove whatever part files of partitions `0..partitions` a failed or
/// cancelled run left behind in `dir`
pub fn remove_parts(dir: &Path, kind: DatabaseType, partitions: usize) {
    for partition in 0..partitions {
        let part = kind.part_path(dir, partition);
        match fs::remove_file(&part) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound =>
                log::warn!("Could not remove {}: {e}", part.display()),
            _ => {}
        }
    }
}

/// Write a complete database in one go
pub fn write_database<'a>(
    path: &Path,
    kind: DatabaseType,
    number_of_regions: usize,
    records: impl IntoIterator<Item = (&'a PhotonDataPoint, &'a CollisionInfo)>,
) -> Result<u64, DatabaseError> {
    let format = |source| DatabaseError::Format { path: path.into(), source };
    let file = File::create(path).map_err(|source| DatabaseError::Io { path: path.into(), source })?;
    let mut out = BufWriter::new(file);
    Header { kind_code: kind.code(), number_of_regions: number_of_regions as u32 }.write(&mut out).map_err(format)?;
    let mut count = 0;
    for (dp, ci) in records {
        if !kind.accepts(dp.status) { continue }
        Record::new(dp, kind.has_collision_info().then_some(ci)).write(&mut out).map_err(format)?;
        count += 1;
    }
    out.flush().map_err(|source| DatabaseError::Io { path: path.into(), source })?;
    Ok(count)
}

type DbRes<T> = Result<T, DatabaseError>;

/// Open a database: its header, and an iterator over its records
pub fn read_database(path: &Path) -> DbRes<(Header, impl Iterator<Item = DbRes<(PhotonDataPoint, CollisionInfo)>>)> {
    let file = File::open(path).map_err(|source| DatabaseError::Io { path: path.into(), source })?;
    let mut reader = BufReader::new(file);
    let header = Header::read(&mut reader).map_err(|source| match source {
        binrw::Error::BadMagic { .. } => DatabaseError::NotADatabase { path: path.into() },
        source                        => DatabaseError::Format { path: path.into(), source },
    })?;
    let path = path.to_path_buf();
    let mut failed = false;
    let records = std::iter::from_fn(move || {
        if failed { return None }
        match reader.fill_buf() {
            Ok([]) => return None,
            Ok(_)  => {}
            Err(source) => { failed = true; return Some(Err(DatabaseError::Io { path: path.clone(), source })) }
        }
        let record = Record::read(&mut reader)
            .map_err(|source| DatabaseError::Format { path: path.clone(), source })
            .and_then(|r| r.into_parts(&path));
        failed = record.is_err();
        Some(record)
    });
    Ok((header, records))
}

/// Whether `path` starts like a photon database
pub fn is_database(path: &Path) -> bool {
    let mut magic = [0; 4];
    File::open(path)
        .and_then(|mut f| std::io::Read::read_exact(&mut f, &mut magic))
        .map_or(false, |_| &magic == MAGIC)
}
