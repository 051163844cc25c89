//! # GapNet
//!
//! A miniapp that builds a small network of branching cells coupled through
//! gap junctions, runs it and writes the soma voltage of every cell as JSON.
//!
//! ## Pieces
//!
//! 1. **Parameters**: `GapParams`, defaults or a JSON file
//! 2. **Recipe**: `GjRecipe`, cells in a directed ring, tuft `i` of cell
//!    `gid` coupled to tuft `i` of cell `(gid + 1) % num_cells`
//! 3. **Driver**: `simulate`, build / run / sample on a `gapnet_sim` engine
//! 4. **Output**: `write_trace_json`, one `arb_cell<i>_v.json` per cell
//! 5. **Reference traces**: `jsonify`, NEURON time/voltage dumps converted
//!    to JSON for side-by-side comparison

use gapnet_cable::{branch_cell, CableCell};
use gapnet_core::{
    CellGid, CellKind, CellMember, CellSize, Conductance, GapError, GapJunctionConnection,
    GlobalProperties, ProbeInfo, ProbeKind, Recipe, Result, SegmentLocation, Time, Trace,
};
use gapnet_sim::{partition_load_balance, regular_schedule, Context, MeterManager, Simulation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Integration time step (ms)
pub const DT: Time = 0.025;

/// Interval between voltage samples (ms)
pub const SAMPLE_INTERVAL: Time = 0.025;

/// Stimulus onset for every cell except gid 0 (ms)
pub const STIM_DELAY: Time = 10.0;

/// Conductance of one gap junction per unit of the `gj` coefficient (uS)
pub const GJ_CONDUCTANCE: Conductance = 0.00037;

/// Temperature of the network (K)
pub const TEMPERATURE_K: f64 = 308.15;

// =============================================================================
// PARAMETERS
// =============================================================================

/// Run configuration, fixed once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapParams {
    pub name: String,
    pub num_cells: u32,
    /// Stimulate every tuft instead of the soma
    pub stim_tuft: bool,
    /// Simulated time and stimulus duration (ms)
    pub duration: Time,
    /// Gap junctions (and tufts) per cell
    pub num_gj: u32,
    /// Remove sodium from the tufts of every cell but gid 0
    pub tweak: bool,
    /// Gap junctions conduct when set
    pub gj: bool,
}

impl Default for GapParams {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            num_cells: 2,
            stim_tuft: false,
            duration: 300.0,
            num_gj: 20,
            tweak: false,
            gj: false,
        }
    }
}

/// Move `key` out of `json` into `target` if present
fn param_from_json<T: DeserializeOwned>(
    target: &mut T,
    key: &str,
    json: &mut Map<String, Value>,
) -> Result<()> {
    if let Some(value) = json.remove(key) {
        *target = serde_json::from_value(value)
            .map_err(|e| GapError::Config(format!("parameter \"{}\": {}", key, e)))?;
    }
    Ok(())
}

impl GapParams {
    /// Multiplier applied to [`GJ_CONDUCTANCE`]
    pub fn gj_coefficient(&self) -> f64 {
        if self.gj {
            1.0
        } else {
            0.0
        }
    }

    /// Overwrite the fields found in `json`, returning the keys left unused
    pub fn apply_json(&mut self, json: Value) -> Result<Vec<String>> {
        let mut json = match json {
            Value::Object(map) => map,
            other => {
                return Err(GapError::Config(format!(
                    "parameter file must hold a JSON object, found {}",
                    other
                )))
            }
        };

        param_from_json(&mut self.name, "name", &mut json)?;
        param_from_json(&mut self.stim_tuft, "stim-tuft", &mut json)?;
        param_from_json(&mut self.duration, "duration", &mut json)?;
        param_from_json(&mut self.tweak, "tweak", &mut json)?;
        param_from_json(&mut self.gj, "gap-junctions", &mut json)?;

        Ok(json.keys().cloned().collect())
    }

    /// Defaults overridden by a JSON document. Unused keys are logged.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut params = Self::default();
        let unused = params.apply_json(serde_json::from_str(text)?)?;
        for key in &unused {
            warn!("unused input parameter: \"{}\"", key);
        }
        Ok(params)
    }
}

/// Parameters from the positional command line arguments: none for the
/// defaults, one for a JSON file.
pub fn read_options(args: &[PathBuf]) -> Result<GapParams> {
    match args {
        [] => {
            info!("Using default parameters.");
            Ok(GapParams::default())
        }
        [fname] => {
            info!("Loading parameters from file: {}", fname.display());
            let text = std::fs::read_to_string(fname).map_err(|e| {
                GapError::Config(format!(
                    "Unable to open input parameter file: {}: {}",
                    fname.display(),
                    e
                ))
            })?;
            GapParams::from_json_str(&text)
        }
        _ => Err(GapError::Config(
            "More than one command line option not permitted.".to_string(),
        )),
    }
}

// =============================================================================
// RECIPE
// =============================================================================

/// Identical branching cells in a directed ring of gap junctions
#[derive(Debug, Clone)]
pub struct GjRecipe {
    params: GapParams,
}

impl GjRecipe {
    pub fn new(params: GapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GapParams {
        &self.params
    }
}

impl Recipe for GjRecipe {
    type Cell = CableCell;

    fn num_cells(&self) -> CellSize {
        self.params.num_cells
    }

    fn cell_kind(&self, _gid: CellGid) -> CellKind {
        CellKind::Cable
    }

    fn cell_description(&self, gid: CellGid) -> CableCell {
        let p = &self.params;
        if gid == 0 {
            branch_cell(p.num_gj, 0.0, p.duration, p.stim_tuft, false)
        } else {
            branch_cell(p.num_gj, STIM_DELAY, p.duration, p.stim_tuft, p.tweak)
        }
    }

    // One probe per cell: the soma voltage.
    fn num_probes(&self, _gid: CellGid) -> CellSize {
        1
    }

    fn probe(&self, id: CellMember) -> ProbeInfo {
        ProbeInfo {
            id,
            kind: ProbeKind::MembraneVoltage,
            location: SegmentLocation::new(0, 0.5),
        }
    }

    fn global_properties(&self, _kind: CellKind) -> GlobalProperties {
        GlobalProperties {
            temperature_k: TEMPERATURE_K,
            ..GlobalProperties::default()
        }
    }

    fn gap_junctions(&self, gid: CellGid) -> Vec<GapJunctionConnection> {
        let p = &self.params;
        let peer = (gid + 1) % p.num_cells;
        let conductance = p.gj_coefficient() * GJ_CONDUCTANCE;
        (0..p.num_gj)
            .map(|i| {
                GapJunctionConnection::new(
                    CellMember::new(gid, i),
                    CellMember::new(peer, i),
                    conductance,
                )
            })
            .collect()
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Build, run and sample the network described by `params`.
///
/// Meters get a "model-init" and a "model-run" checkpoint. Traces are
/// returned in gid order.
pub fn simulate(
    params: &GapParams,
    ctx: &Context,
    meters: &mut MeterManager,
) -> Result<Vec<Trace>> {
    meters.start(ctx);

    let recipe = GjRecipe::new(params.clone());
    let decomp = partition_load_balance(&recipe, ctx)?;
    let mut sim = Simulation::new(&recipe, &decomp, ctx)?;

    let sched = regular_schedule(SAMPLE_INTERVAL);
    for gid in 0..recipe.num_cells() {
        let probe = recipe.probe(CellMember::new(gid, 0));
        sim.add_sampler(probe.id, sched)?;
    }

    meters.checkpoint("model-init", ctx)?;

    info!("running simulation");
    sim.run(params.duration, DT)?;

    meters.checkpoint("model-run", ctx)?;

    Ok(sim.into_traces())
}

// =============================================================================
// OUTPUT
// =============================================================================

#[derive(Serialize)]
struct TraceFile<'a> {
    name: &'static str,
    units: &'static str,
    cell: String,
    probe: String,
    data: &'a Trace,
}

fn write_pretty<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, doc)?;
    writeln!(file)?;
    file.flush()?;
    Ok(())
}

/// Path of the trace file for `gid` inside `dir`
pub fn trace_path(dir: &Path, gid: usize) -> PathBuf {
    dir.join(format!("arb_cell{}_v.json", gid))
}

/// Write one JSON file per trace, returning the paths written
pub fn write_trace_json(traces: &[Trace], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(traces.len());
    for (i, trace) in traces.iter().enumerate() {
        let path = trace_path(dir, i);
        let doc = TraceFile {
            name: "arbor",
            units: "mV",
            cell: i.to_string(),
            probe: "0".to_string(),
            data: trace,
        };

        write_pretty(&path, &doc)?;

        info!(path = %path.display(), samples = trace.len(), "wrote trace");
        written.push(path);
    }
    Ok(written)
}

// =============================================================================
// NEURON TRACE CONVERSION
// =============================================================================

/// Reference trace recorded by NEURON, in the layout the comparison scripts
/// expect next to `arb_cell<i>_v.json`
#[derive(Serialize)]
struct NeuronTraceFile<'a> {
    mitral_neuron_cell: &'static str,
    data: &'a Trace,
    units: &'static str,
    name: &'static str,
}

/// Read one number per line, skipping blank lines
pub fn read_column(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        GapError::Config(format!("Unable to open {}: {}", path.display(), e))
    })?;

    text.lines()
        .enumerate()
        .map(|(n, line)| (n, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(n, line)| {
            line.parse::<f64>().map_err(|e| {
                GapError::Config(format!("{}:{}: \"{}\": {}", path.display(), n + 1, line, e))
            })
        })
        .collect()
}

/// Pair a NEURON time dump with its voltage dump and write them as JSON
pub fn jsonify(time: &Path, voltage: &Path, out: &Path) -> Result<Trace> {
    let trace = Trace {
        time: read_column(time)?,
        voltage: read_column(voltage)?,
    };
    if trace.time.len() != trace.voltage.len() {
        return Err(GapError::Config(format!(
            "{} holds {} samples but {} holds {}",
            time.display(),
            trace.time.len(),
            voltage.display(),
            trace.voltage.len()
        )));
    }

    let doc = NeuronTraceFile {
        mitral_neuron_cell: "0",
        data: &trace,
        units: "mV",
        name: "neuron",
    };
    write_pretty(out, &doc)?;

    info!(path = %out.display(), samples = trace.len(), "wrote neuron trace");
    Ok(trace)
}

// =============================================================================
// TESTS
// =============================================================================
