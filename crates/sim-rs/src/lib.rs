//! # Sim-RS
//!
//! Execution side of the gap junction miniapp: everything a driver needs to
//! turn a [`Recipe`] into voltage traces.
//!
//! ## Components
//!
//! 1. **Context**: the thread pool cell descriptions are built on
//! 2. **Load balancing**: groups of cells that share gap junctions
//! 3. **Meters**: wall-clock checkpoints and a printable report
//! 4. **Simulation**: a lumped passive engine with regular samplers
//!
//! ## The lumped model
//!
//! Each cell is reduced to a single isopotential compartment. Capacitance and
//! leak are summed over the membrane area of every segment using its `cm` and
//! `pas` parameters; active channels are carried in the descriptions but not
//! integrated. Every gap junction connection adds a current
//! `g * (v_peer - v_local)` to its local cell, so a symmetric junction must be
//! listed by both cells. The system is advanced with backward Euler.
//!
//! Units: mV, ms, nA, uS, nF.

use gapnet_cable::{CableCell, IClamp};
use gapnet_core::{
    CellGid, CellKind, CellMember, GapError, GapJunctionConnection, Recipe, Result, Time, Trace,
    Voltage,
};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// =============================================================================
// CONTEXT
// =============================================================================

/// Execution resources handed to the engine by the driver
pub struct Context {
    pool: rayon::ThreadPool,
}

impl Context {
    /// Context with a fixed number of worker threads
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| GapError::Simulation(format!("unable to start thread pool: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the context's thread pool
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }
}

/// Context using all available cores
pub fn make_context() -> Result<Context> {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Context::new(threads)
}

// =============================================================================
// LOAD BALANCING
// =============================================================================

/// Cells simulated together
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDescription {
    pub kind: CellKind,
    /// Sorted gids
    pub gids: Vec<CellGid>,
}

/// Assignment of every cell to exactly one group
#[derive(Debug, Clone, PartialEq)]
pub struct DomainDecomposition {
    pub num_cells: usize,
    pub groups: Vec<GroupDescription>,
}

impl DomainDecomposition {
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Index of the group holding `gid`
    pub fn group_of(&self, gid: CellGid) -> Option<usize> {
        self.groups.iter().position(|g| g.gids.binary_search(&gid).is_ok())
    }
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Partition cells so that every gap junction stays within one group.
///
/// Groups are ordered by their smallest gid.
pub fn partition_load_balance<R>(recipe: &R, ctx: &Context) -> Result<DomainDecomposition>
where
    R: Recipe + ?Sized,
{
    let n = recipe.num_cells() as usize;

    let connections: Vec<Vec<GapJunctionConnection>> = ctx.install(|| {
        (0..n as CellGid)
            .into_par_iter()
            .map(|gid| recipe.gap_junctions(gid))
            .collect()
    });

    let mut parent: Vec<usize> = (0..n).collect();
    for (gid, conns) in connections.iter().enumerate() {
        for conn in conns {
            let peer = conn.peer.gid as usize;
            if peer >= n {
                return Err(GapError::InvalidRecipe(format!(
                    "gap junction {} -> {} targets a cell outside [0, {})",
                    conn.local, conn.peer, n
                )));
            }
            let a = find_root(&mut parent, gid);
            let b = find_root(&mut parent, peer);
            parent[a.max(b)] = a.min(b);
        }
    }

    // Roots are the smallest gid of their set, so visiting gids in order
    // creates groups in order of their smallest member.
    let mut groups: Vec<GroupDescription> = Vec::new();
    let mut group_of_root = vec![usize::MAX; n];
    for gid in 0..n {
        let root = find_root(&mut parent, gid);
        let kind = recipe.cell_kind(gid as CellGid);
        if group_of_root[root] == usize::MAX {
            group_of_root[root] = groups.len();
            groups.push(GroupDescription { kind, gids: Vec::new() });
        }
        let group = &mut groups[group_of_root[root]];
        if group.kind != kind {
            return Err(GapError::InvalidRecipe(format!(
                "cell {} is coupled to cells of a different kind",
                gid
            )));
        }
        group.gids.push(gid as CellGid);
    }

    debug!(num_cells = n, num_groups = groups.len(), "partitioned cells");

    Ok(DomainDecomposition { num_cells: n, groups })
}

// =============================================================================
// METERS
// =============================================================================

/// Records wall-clock time between named checkpoints
#[derive(Debug, Default)]
pub struct MeterManager {
    last: Option<Instant>,
    threads: usize,
    checkpoints: Vec<(String, Duration)>,
}

impl MeterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, ctx: &Context) {
        self.threads = ctx.num_threads();
        self.checkpoints.clear();
        self.last = Some(Instant::now());
    }

    /// Close the interval since the previous checkpoint (or `start`)
    pub fn checkpoint(&mut self, name: &str, ctx: &Context) -> Result<()> {
        let last = self.last.ok_or_else(|| {
            GapError::Simulation(format!("checkpoint \"{}\" before meters were started", name))
        })?;
        let now = Instant::now();
        self.threads = ctx.num_threads();
        self.checkpoints.push((name.to_string(), now - last));
        self.last = Some(now);
        debug!(checkpoint = name, elapsed = ?(now - last), "meter checkpoint");
        Ok(())
    }

    pub fn report(&self) -> MeterReport {
        MeterReport {
            threads: self.threads,
            checkpoints: self
                .checkpoints
                .iter()
                .map(|(name, d)| (name.clone(), d.as_secs_f64()))
                .collect(),
        }
    }
}

/// Checkpoint timings in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReport {
    pub threads: usize,
    pub checkpoints: Vec<(String, f64)>,
}

impl MeterReport {
    pub fn total(&self) -> f64 {
        self.checkpoints.iter().map(|(_, t)| t).sum()
    }
}

impl fmt::Display for MeterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- meters ({} threads) ----", self.threads)?;
        writeln!(f, "{:<21}{:>12}", "meter", "time(s)")?;
        for (name, secs) in &self.checkpoints {
            writeln!(f, "{:<21}{:>12.3}", name, secs)?;
        }
        writeln!(f, "{:<21}{:>12.3}", "total", self.total())
    }
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Sample every `interval` ms starting at t = 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularSchedule {
    pub interval: Time,
}

/// Regular sampling schedule
pub fn regular_schedule(interval: Time) -> RegularSchedule {
    RegularSchedule { interval }
}

/// Handle returned by [`Simulation::add_sampler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerHandle(usize);

struct Sampler {
    gid: usize,
    interval: Time,
    next: Time,
    trace: Trace,
}

/// One cell reduced to a single compartment
#[derive(Debug, Clone)]
struct LumpedCell {
    /// nF
    capacitance: f64,
    /// uS
    leak: f64,
    /// Sum of leak conductance times reversal potential (nA)
    leak_current: f64,
    stimuli: Vec<IClamp>,
}

impl LumpedCell {
    fn from_description(cell: &CableCell) -> Self {
        let mut capacitance = 0.0;
        let mut leak = 0.0;
        let mut leak_current = 0.0;
        for seg in &cell.segments {
            let area = seg.membrane_area();
            // F/m^2 * um^2 -> nF
            capacitance += seg.membrane_capacitance * area * 1e-3;
            if let Some(pas) = seg.mechanism("pas") {
                // S/cm^2 * um^2 -> uS
                let g = pas.get("g").unwrap_or(0.0) * area * 1e-2;
                leak += g;
                leak_current += g * pas.get("e").unwrap_or(0.0);
            }
        }
        Self {
            capacitance,
            leak,
            leak_current,
            stimuli: cell.stimuli.iter().map(|s| s.clamp).collect(),
        }
    }

    fn stimulus_at(&self, t: Time) -> f64 {
        self.stimuli.iter().map(|c| c.current_at(t)).sum()
    }
}

/// A network built from a recipe, ready to run
pub struct Simulation {
    cells: Vec<LumpedCell>,
    /// (local gid, peer gid, conductance)
    junctions: Vec<(usize, usize, f64)>,
    num_probes: Vec<u32>,
    v: Array1<f64>,
    t: Time,
    temperature_k: f64,
    samplers: Vec<Sampler>,
}

impl Simulation {
    /// Build every cell of `decomp` and check the gap junctions between them
    pub fn new<R>(recipe: &R, decomp: &DomainDecomposition, ctx: &Context) -> Result<Self>
    where
        R: Recipe<Cell = CableCell> + ?Sized,
    {
        let n = recipe.num_cells() as usize;
        if decomp.num_cells != n {
            return Err(GapError::InvalidRecipe(format!(
                "decomposition covers {} cells but recipe has {}",
                decomp.num_cells, n
            )));
        }

        let mut gids: Vec<CellGid> = decomp
            .groups
            .iter()
            .flat_map(|g| g.gids.iter().copied())
            .collect();
        gids.sort_unstable();
        if gids.len() != n || gids.iter().enumerate().any(|(i, &gid)| gid as usize != i) {
            return Err(GapError::InvalidRecipe(
                "decomposition must assign every gid exactly once".to_string(),
            ));
        }

        let built: Vec<(CableCell, Vec<GapJunctionConnection>)> = ctx.install(|| {
            gids.par_iter()
                .map(|&gid| (recipe.cell_description(gid), recipe.gap_junctions(gid)))
                .collect()
        });

        for (gid, (cell, _)) in built.iter().enumerate() {
            cell.validate()
                .map_err(|e| GapError::InvalidRecipe(format!("cell {}: {}", gid, e)))?;
        }

        let mut junctions = Vec::new();
        for (gid, (cell, conns)) in built.iter().enumerate() {
            for conn in conns {
                let peer = conn.peer.gid as usize;
                if conn.local.gid as usize != gid {
                    return Err(GapError::InvalidRecipe(format!(
                        "gap junction {} listed on cell {}",
                        conn.local, gid
                    )));
                }
                if conn.local.index as usize >= cell.num_gap_junction_sites() {
                    return Err(GapError::InvalidRecipe(format!(
                        "cell {} has no gap junction site {}",
                        gid, conn.local.index
                    )));
                }
                if peer >= n || conn.peer.index as usize >= built[peer].0.num_gap_junction_sites() {
                    return Err(GapError::InvalidRecipe(format!(
                        "gap junction {} -> {} has no matching peer site",
                        conn.local, conn.peer
                    )));
                }
                if !(conn.conductance.is_finite() && conn.conductance >= 0.0) {
                    return Err(GapError::InvalidRecipe(format!(
                        "gap junction {} -> {} has conductance {}",
                        conn.local, conn.peer, conn.conductance
                    )));
                }
                junctions.push((gid, peer, conn.conductance));
            }
        }

        let props = recipe.global_properties(CellKind::Cable);
        let cells: Vec<LumpedCell> = built
            .iter()
            .map(|(c, _)| LumpedCell::from_description(c))
            .collect();
        let num_probes = (0..n as CellGid).map(|gid| recipe.num_probes(gid)).collect();

        info!(
            num_cells = n,
            num_gap_junctions = junctions.len(),
            temperature_k = props.temperature_k,
            "simulation built"
        );

        Ok(Self {
            cells,
            junctions,
            num_probes,
            v: Array1::from_elem(n, props.init_membrane_potential),
            t: 0.0,
            temperature_k: props.temperature_k,
            samplers: Vec::new(),
        })
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn time(&self) -> Time {
        self.t
    }

    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    /// Membrane potential of a cell
    pub fn voltage(&self, gid: CellGid) -> Option<Voltage> {
        self.v.get(gid as usize).copied()
    }

    /// Record a probe on a regular schedule
    pub fn add_sampler(
        &mut self,
        probe: CellMember,
        schedule: RegularSchedule,
    ) -> Result<SamplerHandle> {
        let gid = probe.gid as usize;
        if gid >= self.cells.len() || probe.index >= self.num_probes[gid] {
            return Err(GapError::Simulation(format!("no probe {}", probe)));
        }
        if !(schedule.interval > 0.0) {
            return Err(GapError::Simulation(format!(
                "sampling interval must be positive, got {}",
                schedule.interval
            )));
        }
        self.samplers.push(Sampler {
            gid,
            interval: schedule.interval,
            next: self.t,
            trace: Trace::new(),
        });
        Ok(SamplerHandle(self.samplers.len() - 1))
    }

    pub fn samples(&self, handle: SamplerHandle) -> &Trace {
        &self.samplers[handle.0].trace
    }

    /// Consume the samplers' traces in the order they were added
    pub fn into_traces(self) -> Vec<Trace> {
        self.samplers.into_iter().map(|s| s.trace).collect()
    }

    /// Advance to `t_final` with step `dt`, returning the time reached
    pub fn run(&mut self, t_final: Time, dt: Time) -> Result<Time> {
        if !(dt > 0.0) {
            return Err(GapError::Simulation(format!("time step must be positive, got {}", dt)));
        }

        let matrix = self.system_matrix(dt);
        let eps = dt * 1e-6;
        while self.t < t_final - eps {
            self.sample(eps);
            let step = dt.min(t_final - self.t);
            let matrix = if step < dt { self.system_matrix(step) } else { matrix.clone() };
            let rhs = self.rhs(step);
            self.v = solve_dense(matrix, rhs)?;
            self.t += step;
            if (t_final - self.t).abs() < eps {
                self.t = t_final;
            }
        }

        debug!(t = self.t, "run finished");
        Ok(self.t)
    }

    fn sample(&mut self, eps: Time) {
        for s in &mut self.samplers {
            if self.t >= s.next - eps {
                s.trace.push(self.t, self.v[s.gid]);
                s.next += s.interval;
            }
        }
    }

    fn system_matrix(&self, dt: Time) -> Array2<f64> {
        let n = self.cells.len();
        let mut a = Array2::zeros((n, n));
        for (i, cell) in self.cells.iter().enumerate() {
            a[[i, i]] = cell.capacitance / dt + cell.leak;
        }
        for &(local, peer, g) in &self.junctions {
            a[[local, local]] += g;
            a[[local, peer]] -= g;
        }
        a
    }

    fn rhs(&self, dt: Time) -> Array1<f64> {
        let t_next = self.t + dt;
        Array1::from_iter(self.cells.iter().enumerate().map(|(i, cell)| {
            cell.capacitance / dt * self.v[i] + cell.leak_current + cell.stimulus_at(t_next)
        }))
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting
fn solve_dense(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-300 {
            return Err(GapError::Simulation("singular system matrix".to_string()));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor != 0.0 {
                for k in col..n {
                    a[[row, k]] -= factor * a[[col, k]];
                }
                b[row] -= factor * b[col];
            }
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in row + 1..n {
            sum -= a[[row, k]] * x[k];
        }
        x[row] = sum / a[[row, row]];
    }
    Ok(x)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gapnet_cable::{apply_regular_preset, SectionKind, Segment, Stimulus};
    use gapnet_core::{GlobalProperties, ProbeInfo, ProbeKind, SegmentLocation};

    /// Point cells; `links` lists (gid, peer) pairs, each on one site
    struct Points {
        n: u32,
        links: Vec<(u32, u32)>,
        g: f64,
        stim: Option<IClamp>,
    }

    impl Recipe for Points {
        type Cell = CableCell;

        fn num_cells(&self) -> u32 {
            self.n
        }

        fn cell_kind(&self, _gid: CellGid) -> CellKind {
            CellKind::Cable
        }

        fn cell_description(&self, gid: CellGid) -> CableCell {
            let soma = apply_regular_preset(Segment::soma(10.0), false);
            let stimuli = match (gid, self.stim) {
                (0, Some(clamp)) => vec![Stimulus {
                    location: SegmentLocation::new(0, 0.5),
                    clamp,
                }],
                _ => Vec::new(),
            };
            CableCell::new(vec![soma], stimuli, vec![SegmentLocation::new(0, 0.5)])
        }

        fn num_probes(&self, _gid: CellGid) -> u32 {
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
                temperature_k: 308.15,
                init_membrane_potential: -65.0,
            }
        }

        fn gap_junctions(&self, gid: CellGid) -> Vec<GapJunctionConnection> {
            self.links
                .iter()
                .filter(|(a, _)| *a == gid)
                .map(|&(a, b)| {
                    GapJunctionConnection::new(CellMember::new(a, 0), CellMember::new(b, 0), self.g)
                })
                .collect()
        }
    }

    fn context() -> Context {
        Context::new(2).unwrap()
    }

    #[test]
    fn test_partition_groups_coupled_cells() {
        let recipe = Points { n: 5, links: vec![(0, 3), (3, 0), (4, 2)], g: 0.1, stim: None };
        let decomp = partition_load_balance(&recipe, &context()).unwrap();

        assert_eq!(decomp.num_groups(), 3);
        assert_eq!(decomp.groups[0].gids, vec![0, 3]);
        assert_eq!(decomp.groups[1].gids, vec![1]);
        assert_eq!(decomp.groups[2].gids, vec![2, 4]);
        assert_eq!(decomp.group_of(4), Some(2));
        assert_eq!(decomp.group_of(9), None);
    }

    #[test]
    fn test_partition_rejects_unknown_peer() {
        let recipe = Points { n: 2, links: vec![(0, 7)], g: 0.1, stim: None };
        assert!(partition_load_balance(&recipe, &context()).is_err());
    }

    #[test]
    fn test_resting_cell_relaxes_to_leak_reversal() {
        let recipe = Points { n: 1, links: vec![], g: 0.0, stim: None };
        let ctx = context();
        let decomp = partition_load_balance(&recipe, &ctx).unwrap();
        let mut sim = Simulation::new(&recipe, &decomp, &ctx).unwrap();

        // tau = cm / g = 0.018 F/m^2 * 12000 ohm cm^2 = 21.6 ms
        sim.run(500.0, 0.025).unwrap();
        let v = sim.voltage(0).unwrap();
        assert!((v - gapnet_cable::REGULAR_PAS_E).abs() < 1e-3, "v = {}", v);
    }

    #[test]
    fn test_stimulus_spreads_through_gap_junction() {
        let clamp = IClamp::new(0.0, 1000.0, 0.1);
        let coupled = Points { n: 2, links: vec![(0, 1), (1, 0)], g: 0.01, stim: Some(clamp) };
        let isolated = Points { n: 2, links: vec![], g: 0.0, stim: Some(clamp) };
        let ctx = context();

        let run = |recipe: &Points| {
            let decomp = partition_load_balance(recipe, &ctx).unwrap();
            let mut sim = Simulation::new(recipe, &decomp, &ctx).unwrap();
            sim.run(200.0, 0.025).unwrap();
            (sim.voltage(0).unwrap(), sim.voltage(1).unwrap())
        };

        let (c0, c1) = run(&coupled);
        let (i0, i1) = run(&isolated);
        assert!(c1 > i1 + 1.0);
        assert!(c0 < i0);
        assert!(c0 > c1);
    }

    #[test]
    fn test_sampler_records_regular_schedule() {
        let recipe = Points { n: 2, links: vec![], g: 0.0, stim: None };
        let ctx = context();
        let decomp = partition_load_balance(&recipe, &ctx).unwrap();
        let mut sim = Simulation::new(&recipe, &decomp, &ctx).unwrap();

        let handle = sim.add_sampler(CellMember::new(1, 0), regular_schedule(0.1)).unwrap();
        assert_eq!(sim.run(10.0, 0.025).unwrap(), 10.0);

        let trace = sim.samples(handle);
        assert_eq!(trace.len(), 100);
        assert_eq!(trace.time[0], 0.0);
        assert_eq!(trace.voltage[0], -65.0);
        assert!(trace.time.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_invalid_sampler_and_step() {
        let recipe = Points { n: 1, links: vec![], g: 0.0, stim: None };
        let ctx = context();
        let decomp = partition_load_balance(&recipe, &ctx).unwrap();
        let mut sim = Simulation::new(&recipe, &decomp, &ctx).unwrap();

        assert!(sim.add_sampler(CellMember::new(3, 0), regular_schedule(0.1)).is_err());
        assert!(sim.add_sampler(CellMember::new(0, 1), regular_schedule(0.1)).is_err());
        assert!(sim.run(1.0, 0.0).is_err());
    }

    #[test]
    fn test_missing_peer_site_rejected() {
        struct TwoSites(Points);

        impl Recipe for TwoSites {
            type Cell = CableCell;
            fn num_cells(&self) -> u32 {
                self.0.num_cells()
            }
            fn cell_kind(&self, gid: CellGid) -> CellKind {
                self.0.cell_kind(gid)
            }
            fn cell_description(&self, gid: CellGid) -> CableCell {
                self.0.cell_description(gid)
            }
            fn probe(&self, id: CellMember) -> ProbeInfo {
                self.0.probe(id)
            }
            fn global_properties(&self, kind: CellKind) -> GlobalProperties {
                self.0.global_properties(kind)
            }
            fn gap_junctions(&self, gid: CellGid) -> Vec<GapJunctionConnection> {
                vec![GapJunctionConnection::new(
                    CellMember::new(gid, 0),
                    CellMember::new((gid + 1) % 2, 1),
                    0.1,
                )]
            }
        }

        let recipe = TwoSites(Points { n: 2, links: vec![], g: 0.0, stim: None });
        let ctx = context();
        let decomp = partition_load_balance(&recipe, &ctx).unwrap();
        assert!(Simulation::new(&recipe, &decomp, &ctx).is_err());
    }

    #[test]
    fn test_solve_dense() {
        let a = ndarray::arr2(&[[0.0, 2.0], [4.0, 1.0]]);
        let b = ndarray::arr1(&[4.0, 6.0]);
        let x = solve_dense(a, b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);

        let singular = ndarray::arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        assert!(solve_dense(singular, ndarray::arr1(&[1.0, 1.0])).is_err());
    }

    #[test]
    fn test_meter_report() {
        let ctx = context();
        let mut meters = MeterManager::new();
        assert!(meters.checkpoint("early", &ctx).is_err());

        meters.start(&ctx);
        meters.checkpoint("model-init", &ctx).unwrap();
        meters.checkpoint("model-run", &ctx).unwrap();

        let report = meters.report();
        assert_eq!(report.threads, 2);
        let names: Vec<_> = report.checkpoints.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["model-init", "model-run"]);
        assert!(report.to_string().contains("model-run"));
    }

    #[test]
    fn test_lumped_cell_from_description() {
        let seg = apply_regular_preset(
            Segment::cable(0, SectionKind::Dendrite, 1.0, 1.0, 100.0, 1),
            false,
        );
        let area = seg.membrane_area();
        let cell = CableCell::new(vec![Segment::soma(0.0), seg], Vec::new(), Vec::new());
        let lumped = LumpedCell::from_description(&cell);
        assert!((lumped.capacitance - 0.018 * area * 1e-3).abs() < 1e-15);
        assert!((lumped.leak - area * 1e-2 / 12000.0).abs() < 1e-15);
    }
}
