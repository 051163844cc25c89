//! # Cable-RS
//!
//! Cable cell descriptions for the gap junction miniapp.
//!
//! ## Components
//!
//! 1. **Cell model**: segments, density mechanisms, current clamps and gap
//!    junction sites
//! 2. **Presets**: the two fixed parameter sets ("regular" and "axon")
//! 3. **Builder**: `branch_cell`, the branching cell used by every gid of the
//!    network
//!
//! ## Morphology of `branch_cell`
//!
//! ```text
//!                 tuft 6 .. tuft 6+N-1
//!                        \ | /
//!   dend_min0 (2)    dend (1)    dend_min1 (3)
//!              \       |        /
//!               +---- soma (0) ----+
//!                                  |
//!                            hillock (4) -- axon initial segment (5)
//! ```
//!
//! Every tuft carries one gap junction site at 0.95 along its length.

use gapnet_core::{Current, GapError, Result, SegmentLocation, Time};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// CELL MODEL
// =============================================================================

/// Role of a segment in the morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Soma,
    Dendrite,
    Axon,
}

/// A density mechanism with its parameter overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismDesc {
    pub name: String,
    pub parameters: HashMap<String, f64>,
}

impl MechanismDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: HashMap::new(),
        }
    }

    /// Set a parameter, returning the updated description
    pub fn set(mut self, parameter: &str, value: f64) -> Self {
        self.parameters.insert(parameter.to_string(), value);
        self
    }

    pub fn get(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).copied()
    }
}

/// A cylindrical (or conical) piece of the cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SectionKind,
    /// Parent segment index, `None` for the soma
    pub parent: Option<usize>,
    /// Length (um), zero for the soma
    pub length: f64,
    /// Radius at the proximal end (um)
    pub radius_proximal: f64,
    /// Radius at the distal end (um)
    pub radius_distal: f64,
    /// Number of discretization compartments
    pub compartments: usize,
    /// Axial resistivity (ohm-cm)
    pub axial_resistivity: f64,
    /// Membrane capacitance (F/m^2)
    pub membrane_capacitance: f64,
    pub mechanisms: Vec<MechanismDesc>,
}

impl Segment {
    /// Spherical soma of the given radius
    pub fn soma(radius: f64) -> Self {
        Self {
            kind: SectionKind::Soma,
            parent: None,
            length: 0.0,
            radius_proximal: radius,
            radius_distal: radius,
            compartments: 1,
            axial_resistivity: 100.0,
            membrane_capacitance: 0.01,
            mechanisms: Vec::new(),
        }
    }

    /// Cable attached to the distal end of `parent`
    pub fn cable(
        parent: usize,
        kind: SectionKind,
        radius_proximal: f64,
        radius_distal: f64,
        length: f64,
        compartments: usize,
    ) -> Self {
        Self {
            kind,
            parent: Some(parent),
            length,
            radius_proximal,
            radius_distal,
            compartments,
            axial_resistivity: 100.0,
            membrane_capacitance: 0.01,
            mechanisms: Vec::new(),
        }
    }

    pub fn mechanism(&self, name: &str) -> Option<&MechanismDesc> {
        self.mechanisms.iter().find(|m| m.name == name)
    }

    /// Membrane surface area (um^2)
    pub fn membrane_area(&self) -> f64 {
        use std::f64::consts::PI;
        match self.kind {
            SectionKind::Soma => 4.0 * PI * self.radius_proximal * self.radius_proximal,
            _ => {
                let dr = self.radius_proximal - self.radius_distal;
                let slant = (self.length * self.length + dr * dr).sqrt();
                PI * (self.radius_proximal + self.radius_distal) * slant
            }
        }
    }
}

/// Current clamp (IClamp)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IClamp {
    /// Onset (ms)
    pub delay: Time,
    /// Duration (ms)
    pub duration: Time,
    /// Amplitude (nA)
    pub amplitude: Current,
}

impl IClamp {
    pub fn new(delay: Time, duration: Time, amplitude: Current) -> Self {
        Self { delay, duration, amplitude }
    }

    /// Injected current at time `t`
    pub fn current_at(&self, t: Time) -> Current {
        if t >= self.delay && t < self.delay + self.duration {
            self.amplitude
        } else {
            0.0
        }
    }
}

/// A current clamp placed on the cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub location: SegmentLocation,
    pub clamp: IClamp,
}

/// Complete description of one cable cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CableCell {
    pub segments: Vec<Segment>,
    pub stimuli: Vec<Stimulus>,
    /// Gap junction sites, indexed by their local id
    pub gap_junction_sites: Vec<SegmentLocation>,
}

impl CableCell {
    pub fn new(
        segments: Vec<Segment>,
        stimuli: Vec<Stimulus>,
        gap_junction_sites: Vec<SegmentLocation>,
    ) -> Self {
        Self {
            segments,
            stimuli,
            gap_junction_sites,
        }
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn num_gap_junction_sites(&self) -> usize {
        self.gap_junction_sites.len()
    }

    /// Indices of the dendritic branches hanging off the long dendrite
    pub fn tufts(&self) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == SectionKind::Dendrite && s.parent == Some(LONG_DENDRITE))
            .map(|(i, _)| i)
            .collect()
    }

    /// Total membrane area (um^2)
    pub fn membrane_area(&self) -> f64 {
        self.segments.iter().map(Segment::membrane_area).sum()
    }

    /// Check that the segment tree and every location on it are well formed
    pub fn validate(&self) -> Result<()> {
        for (i, seg) in self.segments.iter().enumerate() {
            match (i, seg.parent) {
                (0, None) if seg.kind == SectionKind::Soma => {}
                (0, _) => {
                    return Err(GapError::InvalidRecipe(
                        "segment 0 must be a soma without parent".to_string(),
                    ))
                }
                (_, Some(p)) if p < i => {}
                (_, parent) => {
                    return Err(GapError::InvalidRecipe(format!(
                        "segment {} has invalid parent {:?}",
                        i, parent
                    )))
                }
            }
        }

        let locations = self
            .stimuli
            .iter()
            .map(|s| &s.location)
            .chain(self.gap_junction_sites.iter());
        for loc in locations {
            self.check_location(loc)?;
        }
        Ok(())
    }

    fn check_location(&self, loc: &SegmentLocation) -> Result<()> {
        if loc.segment >= self.segments.len() {
            return Err(GapError::InvalidRecipe(format!(
                "location on segment {} but cell has {} segments",
                loc.segment,
                self.segments.len()
            )));
        }
        if !(0.0..=1.0).contains(&loc.position) {
            return Err(GapError::InvalidRecipe(format!(
                "relative position {} outside [0, 1]",
                loc.position
            )));
        }
        Ok(())
    }
}

// =============================================================================
// MECHANISMS AND PRESETS
// =============================================================================

/// Mechanisms inserted by the presets
pub mod mechanisms {
    use super::*;

    /// Axonal sodium channel; `sh` shifts its voltage dependence (mV)
    pub fn nax(gbar: f64, sh: f64) -> MechanismDesc {
        MechanismDesc::new("nax").set("gbar", gbar).set("sh", sh)
    }

    /// Delayed rectifier potassium channel
    pub fn kdrmt(gbar: f64) -> MechanismDesc {
        MechanismDesc::new("kdrmt").set("gbar", gbar)
    }

    /// A-type potassium channel
    pub fn kamt(gbar: f64) -> MechanismDesc {
        MechanismDesc::new("kamt").set("gbar", gbar)
    }

    /// Passive (leak) channel
    pub fn pas(g: f64, e: f64) -> MechanismDesc {
        MechanismDesc::new("pas").set("g", g).set("e", e)
    }
}

/// Axial resistivity of every segment (ohm-cm)
pub const AXIAL_RESISTIVITY: f64 = 150.0;

/// Membrane capacitance of every segment (F/m^2)
pub const MEMBRANE_CAPACITANCE: f64 = 0.018;

/// Leak reversal potential of soma and dendrites (mV)
pub const REGULAR_PAS_E: f64 = -61.772335;

/// Leak reversal potential of tweaked tufts (mV)
pub const TWEAKED_PAS_E: f64 = -61.759276;

/// Leak reversal potential of the axon initial segment (mV)
pub const AXON_PAS_E: f64 = -62.953635;

/// Soma and dendrite parameters. `tweak` removes sodium and shifts the leak
/// reversal potential.
pub fn apply_regular_preset(mut segment: Segment, tweak: bool) -> Segment {
    segment.axial_resistivity = AXIAL_RESISTIVITY;
    segment.membrane_capacitance = MEMBRANE_CAPACITANCE;
    segment.mechanisms = vec![
        mechanisms::nax(if tweak { 0.0 } else { 0.04 }, 10.0),
        mechanisms::kdrmt(0.0001),
        mechanisms::kamt(0.004),
        mechanisms::pas(1.0 / 12000.0, if tweak { TWEAKED_PAS_E } else { REGULAR_PAS_E }),
    ];
    segment
}

/// Axon initial segment parameters
pub fn apply_axon_preset(mut segment: Segment) -> Segment {
    segment.axial_resistivity = AXIAL_RESISTIVITY;
    segment.membrane_capacitance = MEMBRANE_CAPACITANCE;
    segment.mechanisms = vec![
        mechanisms::nax(0.4, 0.0),
        mechanisms::kdrmt(0.0001),
        mechanisms::kamt(0.04),
        mechanisms::pas(1.0 / 1000.0, AXON_PAS_E),
    ];
    segment
}

// =============================================================================
// BUILDER
// =============================================================================

/// Index of the long (apical) dendrite that carries the tufts
pub const LONG_DENDRITE: usize = 1;

/// Index of the first tuft
pub const FIRST_TUFT: usize = 6;

/// Soma clamp amplitude (nA)
pub const SOMA_STIM_AMPLITUDE: Current = 0.2;

/// Per-tuft clamp amplitude (nA)
pub const TUFT_STIM_AMPLITUDE: Current = 0.02;

/// Relative position of clamps on their segment
pub const STIM_POSITION: f64 = 0.25;

/// Relative position of gap junction sites on their tuft
pub const GAP_JUNCTION_POSITION: f64 = 0.95;

const SOMA_DIAMETER: f64 = 22.360679775;
const HILLOCK: usize = 4;

/// Build the branching cell.
///
/// One tuft is added per gap junction; `num_gj == 0` gives a cell without
/// tufts or gap junction sites. Clamps go on the soma unless `stim_tuft` is
/// set, in which case every tuft gets a weaker one. `tweak` only changes the
/// tufts.
pub fn branch_cell(
    num_gj: u32,
    delay: Time,
    duration: Time,
    stim_tuft: bool,
    tweak: bool,
) -> CableCell {
    use SectionKind::{Axon, Dendrite};

    let mut segments = vec![
        apply_regular_preset(Segment::soma(SOMA_DIAMETER / 2.0), false),
        apply_regular_preset(Segment::cable(0, Dendrite, 1.5, 1.5, 300.0, 5), false),
        apply_regular_preset(Segment::cable(0, Dendrite, 1.0, 1.0, 100.0, 4), false),
        apply_regular_preset(Segment::cable(0, Dendrite, 1.0, 1.0, 100.0, 4), false),
        apply_regular_preset(Segment::cable(0, Dendrite, 10.0, 10.0, 5.0, 300), false),
        apply_axon_preset(Segment::cable(HILLOCK, Axon, 0.75, 0.75, 30.0, 300)),
    ];

    let tufts: Vec<usize> = (0..num_gj as usize).map(|i| FIRST_TUFT + i).collect();
    segments.extend(tufts.iter().map(|_| {
        apply_regular_preset(Segment::cable(LONG_DENDRITE, Dendrite, 0.2, 0.2, 300.0, 30), tweak)
    }));

    let stimuli = if stim_tuft {
        tufts
            .iter()
            .map(|&seg| Stimulus {
                location: SegmentLocation::new(seg, STIM_POSITION),
                clamp: IClamp::new(delay, duration, TUFT_STIM_AMPLITUDE),
            })
            .collect()
    } else {
        vec![Stimulus {
            location: SegmentLocation::new(0, STIM_POSITION),
            clamp: IClamp::new(delay, duration, SOMA_STIM_AMPLITUDE),
        }]
    };

    let gap_junction_sites = tufts
        .iter()
        .map(|&seg| SegmentLocation::new(seg, GAP_JUNCTION_POSITION))
        .collect();

    debug!(num_gj, delay, stim_tuft, tweak, "built branch cell");

    CableCell::new(segments, stimuli, gap_junction_sites)
}

// =============================================================================
// TESTS
// =============================================================================
