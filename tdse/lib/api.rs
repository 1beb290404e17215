//! Request and response models for complete solves, and the pipelines that
//! connect them.
//!
//! Each pipeline validates its request in a fixed order (grid first, then
//! every formula is parsed, then formulas are evaluated, then the numerical
//! work runs) and stops at the first error. Complex values are serialized as
//! `[re, im]` pairs; two-dimensional arrays are nested row-major with shape
//! `(num_y, num_x)`.

use std::time::Instant;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ ParamError, SolveError },
    expr::{ Formula, Scope },
    grid::{ Axis, Grid, Grid1, Grid2 },
    hamiltonian::{ Boundary, Hamiltonian, Params },
    limits::Limits,
    observables,
    solve::{ self, Solution },
    timedep::{ self, Evolution, Method },
    utils::renormalize,
};

pub type SolveResult<T> = Result<T, SolveError>;

fn pair(z: C64) -> [f64; 2] { [z.re, z.im] }

fn pairs_1d(a: &nd::Array1<C64>) -> Vec<[f64; 2]> {
    a.iter().copied().map(pair).collect()
}

fn pairs_2d(a: &nd::Array2<C64>) -> Vec<Vec<[f64; 2]>> {
    a.rows().into_iter()
        .map(|row| row.iter().copied().map(pair).collect())
        .collect()
}

fn nested_2d(a: &nd::Array2<f64>) -> Vec<Vec<f64>> {
    a.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Optional physical parameters shared by all solve requests.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PhysicsOptions {
    /// Particle mass.
    #[serde(default = "PhysicsOptions::default_mass")]
    pub mass: f64,
    /// Reduced Planck constant.
    #[serde(default = "PhysicsOptions::default_hbar")]
    pub hbar: f64,
    /// Boundary condition.
    #[serde(default)]
    pub boundary: Boundary,
}

impl Default for PhysicsOptions {
    fn default() -> Self {
        Self {
            mass: Self::default_mass(),
            hbar: Self::default_hbar(),
            boundary: Boundary::default(),
        }
    }
}

impl PhysicsOptions {
    fn default_mass() -> f64 { 1.0 }

    fn default_hbar() -> f64 { 1.0 }

    /// Convert to Hamiltonian parameters.
    pub fn params(&self) -> Params {
        Params { mass: self.mass, hbar: self.hbar, boundary: self.boundary }
    }
}

/// 1D time-dependent solve request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeDep1DRequest {
    pub xmin: f64,
    pub xmax: f64,
    pub num_points: usize,
    /// Real-valued formula in `x`.
    pub potential_expr: String,
    /// Formula in `x` for the (unnormalized) initial state.
    pub psi0_expr: String,
    /// Output times, in any order.
    pub times: Vec<f64>,
    #[serde(flatten)]
    pub physics: PhysicsOptions,
    #[serde(default)]
    pub method: Method,
}

/// 1D time-dependent solve response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeDep1DResponse {
    pub x: Vec<f64>,
    pub times: Vec<f64>,
    pub psi_t: Vec<Vec<[f64; 2]>>,
    #[serde(rename = "V")]
    pub V: Vec<f64>,
    pub norms: Vec<f64>,
    pub method: Method,
}

/// 2D time-dependent solve request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeDep2DRequest {
    pub xmin: f64,
    pub xmax: f64,
    pub num_x: usize,
    pub ymin: f64,
    pub ymax: f64,
    pub num_y: usize,
    /// Real-valued formula in `X` and `Y`.
    pub potential_expr: String,
    /// Formula in `X` and `Y` for the (unnormalized) initial state.
    pub psi0_expr: String,
    /// Output times, in any order.
    pub times: Vec<f64>,
    #[serde(flatten)]
    pub physics: PhysicsOptions,
    #[serde(default)]
    pub method: Method,
}

/// 2D time-dependent solve response; all arrays have shape `(num_y, num_x)`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeDep2DResponse {
    #[serde(rename = "X")]
    pub X: Vec<Vec<f64>>,
    #[serde(rename = "Y")]
    pub Y: Vec<Vec<f64>>,
    pub times: Vec<f64>,
    pub psi_t: Vec<Vec<Vec<[f64; 2]>>>,
    #[serde(rename = "V")]
    pub V: Vec<Vec<f64>>,
    pub norms: Vec<f64>,
    pub method: Method,
}

/// 1D time-independent solve request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeIndep1DRequest {
    pub xmin: f64,
    pub xmax: f64,
    pub num_points: usize,
    /// Real-valued formula in `x`.
    pub potential_expr: String,
    /// Number of eigenstates to find.
    #[serde(default = "default_num_eigen")]
    pub num_eigen: usize,
    #[serde(flatten)]
    pub physics: PhysicsOptions,
}

/// 1D time-independent solve response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeIndep1DResponse {
    pub x: Vec<f64>,
    #[serde(rename = "V")]
    pub V: Vec<f64>,
    /// Ascending eigenvalues.
    pub energies: Vec<f64>,
    /// Normalized real eigenfunctions, one per energy.
    pub wavefuncs: Vec<Vec<f64>>,
}

/// 2D time-independent solve request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeIndep2DRequest {
    pub xmin: f64,
    pub xmax: f64,
    pub num_x: usize,
    pub ymin: f64,
    pub ymax: f64,
    pub num_y: usize,
    /// Real-valued formula in `X` and `Y`.
    pub potential_expr: String,
    /// Number of eigenstates to find.
    #[serde(default = "default_num_eigen")]
    pub num_eigen: usize,
    #[serde(flatten)]
    pub physics: PhysicsOptions,
}

/// 2D time-independent solve response; all arrays have shape
/// `(num_y, num_x)`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TimeIndep2DResponse {
    #[serde(rename = "X")]
    pub X: Vec<Vec<f64>>,
    #[serde(rename = "Y")]
    pub Y: Vec<Vec<f64>>,
    #[serde(rename = "V")]
    pub V: Vec<Vec<f64>>,
    /// Ascending eigenvalues.
    pub energies: Vec<f64>,
    /// Normalized real eigenfunctions, one per energy.
    pub wavefuncs: Vec<Vec<Vec<f64>>>,
}

fn default_num_eigen() -> usize { 5 }

/// A wavefunction amplitude on the wire: either a bare real number or an
/// `[re, im]` pair.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Amplitude {
    Real(f64),
    Complex([f64; 2]),
}

impl From<Amplitude> for C64 {
    fn from(a: Amplitude) -> Self {
        match a {
            Amplitude::Real(re) => C64::new(re, 0.0),
            Amplitude::Complex([re, im]) => C64::new(re, im),
        }
    }
}

/// Observable evaluation request.
///
/// Exactly one of the 1D (`x`, `psi`) or 2D (`X`, `Y`, `psi2d`) field groups
/// must be present. Coordinates must be uniformly spaced and, in 2D, form a
/// meshgrid with shape `(num_y, num_x)`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObservableRequest {
    /// Formula in the grid variables and `psi`.
    pub expr: String,
    #[serde(default)]
    pub x: Option<Vec<f64>>,
    #[serde(default)]
    pub psi: Option<Vec<Amplitude>>,
    #[serde(default, rename = "X")]
    pub X: Option<Vec<Vec<f64>>>,
    #[serde(default, rename = "Y")]
    pub Y: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub psi2d: Option<Vec<Vec<Amplitude>>>,
    /// Reduced Planck constant used for momentum.
    #[serde(default = "PhysicsOptions::default_hbar")]
    pub hbar: f64,
}

/// Observable evaluation response. Per-axis quantities are ordered `x`, then
/// `y`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObservableResponse {
    /// `Σ O ΔV / Σ |ψ|² ΔV`.
    pub value: [f64; 2],
    /// `Σ |ψ|² ΔV`.
    pub norm: f64,
    /// Position expectation value along each axis.
    pub position: Vec<f64>,
    /// Momentum expectation value along each axis.
    pub momentum: Vec<f64>,
}

fn parse(src: &str, field: &'static str, scope: &Scope, limits: &Limits)
    -> SolveResult<Formula>
{
    Formula::parse(src, scope, limits).map_err(SolveError::expr(field))
}

// evaluate the potential and initial state concurrently, then normalize the
// initial state
fn sample_fields<G>(
    grid: &G,
    potential: &Formula,
    psi0: &Formula,
    limits: &Limits,
) -> SolveResult<(nd::Array<f64, G::Dim>, nd::Array<C64, G::Dim>)>
where G: Grid + Sync
{
    let (V, psi0)
        = rayon::join(
            || potential.sample_real(grid, limits),
            || psi0.sample_complex(grid, limits),
        );
    let V = V.map_err(SolveError::expr("potential_expr"))?;
    let mut psi0 = psi0.map_err(SolveError::expr("psi0_expr"))?;
    let norm = renormalize(&mut psi0, grid.cell_volume());
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(SolveError::ZeroState("psi0_expr"));
    }
    Ok((V, psi0))
}

fn run_timedep<G>(
    grid: &G,
    potential_expr: &str,
    psi0_expr: &str,
    times: &[f64],
    physics: &PhysicsOptions,
    method: Method,
    limits: &Limits,
) -> SolveResult<(Hamiltonian<G::Dim>, Evolution<G::Dim>)>
where G: Grid + Sync
{
    limits.check_grid(grid)?;
    limits.check_times(times.len())?;
    let scope = Scope::for_grid(grid);
    let potential = parse(potential_expr, "potential_expr", &scope, limits)?;
    let psi0 = parse(psi0_expr, "psi0_expr", &scope, limits)?;
    let start = Instant::now();
    let (V, psi0) = sample_fields(grid, &potential, &psi0, limits)?;
    log::debug!("sampled fields in {:.3?}", start.elapsed());
    let ham = Hamiltonian::new(grid, V, physics.params())?;
    let evolution = timedep::evolve(&ham, &psi0, times, method, limits)?;
    Ok((ham, evolution))
}

/// Run a 1D time-dependent solve.
pub fn solve_timedep_1d(req: &TimeDep1DRequest, limits: &Limits)
    -> SolveResult<TimeDep1DResponse>
{
    limits.check_axes(&[req.num_points])?;
    let grid = Grid1::new(req.xmin, req.xmax, req.num_points)?;
    let (ham, evolution)
        = run_timedep(
            &grid,
            &req.potential_expr,
            &req.psi0_expr,
            &req.times,
            &req.physics,
            req.method,
            limits,
        )?;
    Ok(TimeDep1DResponse {
        x: grid.x().coords().to_vec(),
        times: req.times.clone(),
        psi_t: evolution.states.iter().map(pairs_1d).collect(),
        V: ham.potential().to_vec(),
        norms: evolution.norms,
        method: evolution.method,
    })
}

/// Run a 2D time-dependent solve.
pub fn solve_timedep_2d(req: &TimeDep2DRequest, limits: &Limits)
    -> SolveResult<TimeDep2DResponse>
{
    limits.check_axes(&[req.num_y, req.num_x])?;
    let grid
        = Grid2::new(
            (req.xmin, req.xmax, req.num_x),
            (req.ymin, req.ymax, req.num_y),
        )?;
    let (ham, evolution)
        = run_timedep(
            &grid,
            &req.potential_expr,
            &req.psi0_expr,
            &req.times,
            &req.physics,
            req.method,
            limits,
        )?;
    let (X, Y) = grid.meshgrid();
    Ok(TimeDep2DResponse {
        X: nested_2d(&X),
        Y: nested_2d(&Y),
        times: req.times.clone(),
        psi_t: evolution.states.iter().map(pairs_2d).collect(),
        V: nested_2d(ham.potential()),
        norms: evolution.norms,
        method: evolution.method,
    })
}

fn run_timeindep<G>(
    grid: &G,
    potential_expr: &str,
    num_eigen: usize,
    physics: &PhysicsOptions,
    limits: &Limits,
) -> SolveResult<(Hamiltonian<G::Dim>, Vec<Solution<G::Dim>>)>
where G: Grid
{
    limits.check_grid(grid)?;
    let scope = Scope::for_grid(grid);
    let potential = parse(potential_expr, "potential_expr", &scope, limits)?;
    let V
        = potential.sample_real(grid, limits)
        .map_err(SolveError::expr("potential_expr"))?;
    let ham = Hamiltonian::new(grid, V, physics.params())?;
    let (solutions, _) = solve::solve(&ham, num_eigen, limits)?;
    Ok((ham, solutions))
}

/// Run a 1D time-independent solve.
pub fn solve_timeindep_1d(req: &TimeIndep1DRequest, limits: &Limits)
    -> SolveResult<TimeIndep1DResponse>
{
    limits.check_axes(&[req.num_points])?;
    let grid = Grid1::new(req.xmin, req.xmax, req.num_points)?;
    let (ham, solutions)
        = run_timeindep(
            &grid, &req.potential_expr, req.num_eigen, &req.physics, limits)?;
    Ok(TimeIndep1DResponse {
        x: grid.x().coords().to_vec(),
        V: ham.potential().to_vec(),
        energies: solutions.iter().map(|s| s.e).collect(),
        wavefuncs: solutions.iter().map(|s| s.wf.to_vec()).collect(),
    })
}

/// Run a 2D time-independent solve.
pub fn solve_timeindep_2d(req: &TimeIndep2DRequest, limits: &Limits)
    -> SolveResult<TimeIndep2DResponse>
{
    limits.check_axes(&[req.num_y, req.num_x])?;
    let grid
        = Grid2::new(
            (req.xmin, req.xmax, req.num_x),
            (req.ymin, req.ymax, req.num_y),
        )?;
    let (ham, solutions)
        = run_timeindep(
            &grid, &req.potential_expr, req.num_eigen, &req.physics, limits)?;
    let (X, Y) = grid.meshgrid();
    Ok(TimeIndep2DResponse {
        X: nested_2d(&X),
        Y: nested_2d(&Y),
        V: nested_2d(ham.potential()),
        energies: solutions.iter().map(|s| s.e).collect(),
        wavefuncs: solutions.iter().map(|s| nested_2d(&s.wf)).collect(),
    })
}

// convert nested rows into a rectangular array
fn rectangular<T, U>(name: &str, rows: &[Vec<T>], f: impl Fn(&T) -> U)
    -> SolveResult<nd::Array2<U>>
{
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if nrows == 0 || ncols == 0 {
        return Err(SolveError::Observable(format!("`{name}` is empty")));
    }
    if let Some(j) = rows.iter().position(|r| r.len() != ncols) {
        return Err(SolveError::Observable(format!(
            "`{name}` is not rectangular: row {j} has length {}, expected {ncols}",
            rows[j].len(),
        )));
    }
    let flat: Vec<U> = rows.iter().flat_map(|r| r.iter().map(&f)).collect();
    nd::Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| SolveError::Observable(format!("`{name}`: {e}")))
}

fn observable_on<G, S>(
    grid: &G,
    psi: &nd::ArrayBase<S, G::Dim>,
    expr: &str,
    hbar: f64,
    limits: &Limits,
) -> SolveResult<ObservableResponse>
where
    G: Grid,
    S: nd::Data<Elem = C64>,
{
    limits.check_grid(grid)?;
    ParamError::check("hbar", hbar)?;
    let formula
        = parse(expr, "expr", &observables::observable_scope(grid), limits)?;
    let norm = observables::norm(psi, grid.cell_volume());
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(SolveError::ZeroState("psi"));
    }
    let value
        = observables::expectation_expr(grid, psi, &formula, limits)
        .map_err(SolveError::expr("expr"))?;
    let mut position = observables::expectation_position(grid, psi);
    let mut momentum = observables::expectation_momentum(grid, psi, hbar);
    position.reverse();
    momentum.reverse();
    Ok(ObservableResponse { value: pair(value), norm, position, momentum })
}

/// Evaluate an observable formula and basic moments for a supplied
/// wavefunction.
pub fn eval_observable(req: &ObservableRequest, limits: &Limits)
    -> SolveResult<ObservableResponse>
{
    match (&req.x, &req.psi, &req.X, &req.Y, &req.psi2d) {
        (Some(x), Some(psi), None, None, None) => {
            if x.len() != psi.len() {
                return Err(SolveError::Observable(format!(
                    "`psi` has length {} but `x` has length {}",
                    psi.len(), x.len(),
                )));
            }
            limits.check_axes(&[x.len()])?;
            let grid
                = Grid1::from_axis(Axis::from_coords("x", nd::Array1::from(x.clone()))?);
            let psi: nd::Array1<C64> = psi.iter().map(|a| C64::from(*a)).collect();
            observable_on(&grid, &psi, &req.expr, req.hbar, limits)
        },
        (None, None, Some(X), Some(Y), Some(psi)) => {
            let X = rectangular("X", X, |v| *v)?;
            limits.check_axes(&[X.nrows(), X.ncols()])?;
            let Y = rectangular("Y", Y, |v| *v)?;
            let psi = rectangular("psi2d", psi, |a| C64::from(*a))?;
            if X.shape() != Y.shape() || X.shape() != psi.shape() {
                return Err(SolveError::Observable(format!(
                    "`X`, `Y`, and `psi2d` must have equal shapes; got {:?}, {:?}, and {:?}",
                    X.shape(), Y.shape(), psi.shape(),
                )));
            }
            let x = X.row(0).to_owned();
            let y = Y.column(0).to_owned();
            let meshgrid
                = nd::Zip::indexed(&X).and(&Y)
                .all(|(j, i), Xji, Yji| *Xji == x[i] && *Yji == y[j]);
            if !meshgrid {
                return Err(SolveError::Observable(
                    "`X` and `Y` do not form a meshgrid".to_string()));
            }
            let grid
                = Grid2::from_axes(
                    Axis::from_coords("x", x)?,
                    Axis::from_coords("y", y)?,
                );
            observable_on(&grid, &psi, &req.expr, req.hbar, limits)
        },
        _ => Err(SolveError::Observable(
            "expected either `x` and `psi`, or `X`, `Y`, and `psi2d`".to_string())),
    }
}
