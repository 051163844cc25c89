//! # GapNet Core
//!
//! Shared types for the gap junction miniapp.
//!
//! ## Contents
//!
//! | Item | Purpose |
//! |------|---------|
//! | `GapError` | Error type shared by every crate in the workspace |
//! | `CellMember`, `SegmentLocation` | Addressing cells, sites and points on a cell |
//! | `Recipe` | Callback interface an engine queries to learn a network |
//! | `Trace` | Sampled (time, voltage) pairs |
//!
//! ## Units
//!
//! Time in ms, voltage in mV, current in nA, gap junction conductance in uS,
//! lengths and radii in um.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum GapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GapError>;

/// Time point (ms)
pub type Time = f64;

/// Voltage (mV)
pub type Voltage = f64;

/// Current (nA)
pub type Current = f64;

/// Gap junction conductance (uS)
pub type Conductance = f64;

/// Global cell identifier
pub type CellGid = u32;

/// Index of an item (probe, gap junction site) local to one cell
pub type CellLid = u32;

/// Counts of cells, probes, sources and targets
pub type CellSize = u32;

// =============================================================================
// IDENTIFIERS AND LOCATIONS
// =============================================================================

/// An item local to a cell, addressed by the cell's gid and a local index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellMember {
    pub gid: CellGid,
    pub index: CellLid,
}

impl CellMember {
    pub fn new(gid: CellGid, index: CellLid) -> Self {
        Self { gid, index }
    }
}

impl std::fmt::Display for CellMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.gid, self.index)
    }
}

/// A point on a cell: segment index plus relative position in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentLocation {
    pub segment: usize,
    pub position: f64,
}

impl SegmentLocation {
    pub fn new(segment: usize, position: f64) -> Self {
        Self { segment, position }
    }
}

// =============================================================================
// RECIPE CONTRACT
// =============================================================================

/// Kinds of cell an engine knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CellKind {
    /// Multi-compartment cable cell
    Cable,
}

/// Quantity measured by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    MembraneVoltage,
}

/// Probe descriptor returned by a recipe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub id: CellMember,
    pub kind: ProbeKind,
    pub location: SegmentLocation,
}

/// Electrical coupling between a site on this cell and a site on a peer cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapJunctionConnection {
    pub local: CellMember,
    pub peer: CellMember,
    pub conductance: Conductance,
}

impl GapJunctionConnection {
    pub fn new(local: CellMember, peer: CellMember, conductance: Conductance) -> Self {
        Self { local, peer, conductance }
    }
}

/// Operating point shared by every cell of one kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalProperties {
    /// Temperature (K)
    pub temperature_k: f64,
    /// Resting potential every compartment starts from (mV)
    pub init_membrane_potential: Voltage,
}

impl Default for GlobalProperties {
    fn default() -> Self {
        Self {
            temperature_k: 279.45,
            init_membrane_potential: -65.0,
        }
    }
}

/// Description of a network, queried per cell by a simulation engine.
///
/// Implementations must be pure: the same gid always yields the same
/// description, and calls for different gids may run concurrently.
pub trait Recipe: Sync {
    /// Cell description type produced for each gid
    type Cell;

    fn num_cells(&self) -> CellSize;

    fn cell_kind(&self, gid: CellGid) -> CellKind;

    fn cell_description(&self, gid: CellGid) -> Self::Cell;

    /// Spike sources on the cell
    fn num_sources(&self, _gid: CellGid) -> CellSize {
        0
    }

    /// Synaptic targets on the cell
    fn num_targets(&self, _gid: CellGid) -> CellSize {
        0
    }

    fn num_probes(&self, _gid: CellGid) -> CellSize {
        0
    }

    fn probe(&self, id: CellMember) -> ProbeInfo;

    fn global_properties(&self, kind: CellKind) -> GlobalProperties;

    /// Gap junctions whose local endpoint is on `gid`
    fn gap_junctions(&self, _gid: CellGid) -> Vec<GapJunctionConnection> {
        Vec::new()
    }
}

// =============================================================================
// TRACES
// =============================================================================

/// Voltage samples recorded from one probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Sample times
    pub time: Vec<Time>,
    /// Sampled values
    pub voltage: Vec<Voltage>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, t: Time, v: Voltage) {
        self.time.push(t);
        self.voltage.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// (time, value) pairs in recording order
    pub fn iter(&self) -> impl Iterator<Item = (Time, Voltage)> + '_ {
        self.time.iter().copied().zip(self.voltage.iter().copied())
    }

    pub fn last(&self) -> Option<(Time, Voltage)> {
        self.time.last().copied().zip(self.voltage.last().copied())
    }
}
