//! Solutions to the time-dependent Schrödinger equation (TDSE) for a
//! time-independent potential, `ψ(t) = exp(-iHt/ħ) ψ(0)`.
//!
//! Two schemes are provided, both exactly unitary up to round-off in the
//! discretization of [`Hamiltonian`]:
//! - **Eigen**: diagonalize `H` once, then evaluate every requested time
//!   independently as `U exp(-iEt/ħ) Uᵀ ψ(0)`. Cost is dominated by the
//!   `O(N³)` decomposition, so this is only used for small grids.
//! - **Split-step**: second-order Strang splitting,
//!   `exp(-iVdt/2ħ) exp(-iTdt/ħ) exp(-iVdt/2ħ)`, with the kinetic factor applied
//!   in the transform basis. Requested times are visited in order of
//!   increasing `|t|` on each side of zero, so each stretch of time is
//!   propagated only once regardless of the order of the request.
//!
//! The requested times may be unsorted, contain duplicates, or be negative;
//! snapshots are always returned in request order.

use std::{ collections::HashMap, time::Instant };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ LimitError, TError },
    hamiltonian::Hamiltonian,
    limits::Limits,
    utils::norm_sq,
};

pub type TResult<T> = Result<T, TError>;

/// Propagation scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Use [`Self::Eigen`] if the grid has at most
    /// [`Limits::eigen_max_points`] points, and [`Self::SplitStep`]
    /// otherwise.
    #[default]
    #[serde(alias = "crank-nicolson")]
    Auto,
    /// Exact propagation in the eigenbasis of the dense Hamiltonian.
    Eigen,
    /// Fixed-step split-operator propagation.
    SplitStep,
}

impl Method {
    /// Resolve `Auto` to a concrete scheme for a grid of `n` points.
    ///
    /// Fails if `Eigen` is requested explicitly for a grid larger than
    /// [`Limits::eigen_max_points`].
    pub fn resolve(self, n: usize, limits: &Limits) -> TResult<Self> {
        match self {
            Self::Auto if n <= limits.eigen_max_points => Ok(Self::Eigen),
            Self::Auto => Ok(Self::SplitStep),
            Self::Eigen => {
                LimitError::check(
                    "grid points for eigen propagation", n, limits.eigen_max_points)?;
                Ok(Self::Eigen)
            },
            Self::SplitStep => Ok(Self::SplitStep),
        }
    }
}

/// Wavefunction snapshots at a series of requested times.
#[derive(Clone, Debug)]
pub struct Evolution<D>
where D: nd::Dimension
{
    /// One snapshot per requested time, in request order.
    pub states: Vec<nd::Array<C64, D>>,
    /// `Σ |ψ(t)|² ΔV` for each snapshot.
    pub norms: Vec<f64>,
    /// The concrete scheme used.
    pub method: Method,
}

// map key for a time value; collapses -0.0 onto 0.0
fn time_key(t: f64) -> u64 { (t + 0.0).to_bits() }

// distinct nonzero times, split by sign and ordered by increasing magnitude
fn schedule(times: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pos: Vec<f64> = times.iter().copied().filter(|t| *t > 0.0).collect();
    pos.sort_by(|a, b| a.total_cmp(b));
    pos.dedup();
    let mut neg: Vec<f64> = times.iter().copied().filter(|t| *t < 0.0).collect();
    neg.sort_by(|a, b| b.total_cmp(a));
    neg.dedup();
    (pos, neg)
}

fn num_steps(dt: f64, max_dt: f64) -> usize {
    (dt.abs() / max_dt).ceil() as usize
}

/// Compute wavefunction snapshots `ψ(t)` for each of `times`.
///
/// `psi0` is used as given; callers are expected to normalize it. Fails if any
/// time is non-finite, `psi0` does not have the Hamiltonian's shape, any
/// [`Limits`] ceiling would be exceeded, or any snapshot contains non-finite
/// values.
pub fn evolve<S, D>(
    ham: &Hamiltonian<D>,
    psi0: &nd::ArrayBase<S, D>,
    times: &[f64],
    method: Method,
    limits: &Limits,
) -> TResult<Evolution<D>>
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    limits.check_times(times.len())?;
    if let Some((index, value))
        = times.iter().copied().enumerate().find(|(_, t)| !t.is_finite())
    {
        return Err(TError::BadTime { index, value });
    }
    if psi0.raw_dim() != ham.dim() {
        return Err(TError::Shape(psi0.shape().to_vec(), ham.dim().slice().to_vec()));
    }
    let method = method.resolve(ham.len(), limits)?;
    log::debug!(
        "propagating {} points to {} times with {:?}", ham.len(), times.len(), method);
    let start = Instant::now();
    let psi0: nd::Array<C64, D> = psi0.to_owned();
    let snapshots
        = match method {
            Method::Eigen => eigen_snapshots(ham, &psi0, times)?,
            _ => split_step_snapshots(ham, &psi0, times, limits)?,
        };
    let cell = ham.cell_volume();
    let mut states: Vec<nd::Array<C64, D>> = Vec::with_capacity(times.len());
    let mut norms: Vec<f64> = Vec::with_capacity(times.len());
    for &t in times.iter() {
        let state
            = if t == 0.0 {
                psi0.clone()
            } else {
                snapshots.get(&time_key(t))
                    .cloned()
                    .ok_or(TError::MissingSnapshot(t))?
            };
        let norm = norm_sq(&state, cell);
        if (norm - 1.0).abs() > limits.norm_tolerance {
            log::warn!("norm drifted to {norm:.9} at t = {t}");
        }
        norms.push(norm);
        states.push(state);
    }
    log::debug!("propagation finished in {:.3?}", start.elapsed());
    Ok(Evolution { states, norms, method })
}

fn check_finite<D>(psi: &nd::Array<C64, D>, t: f64) -> TResult<()>
where D: nd::Dimension
{
    psi.iter().all(|z| z.re.is_finite() && z.im.is_finite())
        .then_some(())
        .ok_or(TError::NonFinite(t))
}

fn eigen_snapshots<D>(
    ham: &Hamiltonian<D>,
    psi0: &nd::Array<C64, D>,
    times: &[f64],
) -> TResult<HashMap<u64, nd::Array<C64, D>>>
where D: nd::Dimension
{
    let eigen = ham.eigen()?;
    let U = &eigen.vectors;
    let hbar = ham.params().hbar;
    // project real and imaginary parts separately to stay in real arithmetic
    let re: nd::Array1<f64> = psi0.iter().map(|z| z.re).collect();
    let im: nd::Array1<f64> = psi0.iter().map(|z| z.im).collect();
    let c_re = U.t().dot(&re);
    let c_im = U.t().dot(&im);
    let mut snapshots: HashMap<u64, nd::Array<C64, D>> = HashMap::new();
    for &t in times.iter().filter(|t| **t != 0.0) {
        let key = time_key(t);
        if snapshots.contains_key(&key) { continue; }
        let mut a: nd::Array1<f64> = nd::Array1::zeros(c_re.len());
        let mut b: nd::Array1<f64> = nd::Array1::zeros(c_re.len());
        nd::Zip::from(&mut a).and(&mut b).and(&c_re).and(&c_im).and(&eigen.energies)
            .for_each(|ak, bk, cr, ci, e| {
                let z = C64::new(*cr, *ci) * C64::cis(-e * t / hbar);
                *ak = z.re;
                *bk = z.im;
            });
        let psi_re = U.dot(&a);
        let psi_im = U.dot(&b);
        let flat: Vec<C64>
            = psi_re.iter().zip(psi_im.iter())
            .map(|(r, i)| C64::new(*r, *i))
            .collect();
        let psi: nd::Array<C64, D>
            = nd::Array::from_shape_vec(ham.dim(), flat)
            .map_err(|_| {
                TError::Shape(vec![ham.len()], ham.dim().slice().to_vec())
            })?;
        check_finite(&psi, t)?;
        snapshots.insert(key, psi);
    }
    Ok(snapshots)
}

// advance `psi` by `dt` in `n` equal Strang steps, merging adjacent potential
// half-steps
fn strang<D>(ham: &Hamiltonian<D>, psi: &mut nd::Array<C64, D>, dt: f64, n: usize)
where D: nd::Dimension
{
    if n == 0 { return; }
    let h = dt / n as f64;
    ham.potential_phase(psi, h / 2.0);
    for step in 0..n {
        ham.kinetic_phase(psi, h);
        if step + 1 < n { ham.potential_phase(psi, h); }
    }
    ham.potential_phase(psi, h / 2.0);
}

fn split_step_snapshots<D>(
    ham: &Hamiltonian<D>,
    psi0: &nd::Array<C64, D>,
    times: &[f64],
    limits: &Limits,
) -> TResult<HashMap<u64, nd::Array<C64, D>>>
where D: nd::Dimension
{
    let (pos, neg) = schedule(times);
    let max_dt = limits.max_time_step;
    let segments = |ts: &[f64]| -> Vec<(f64, f64)> {
        let mut prev = 0.0;
        ts.iter()
            .map(|&t| { let seg = (t, t - prev); prev = t; seg })
            .collect()
    };
    let pos = segments(&pos);
    let neg = segments(&neg);
    let total: usize
        = pos.iter().chain(neg.iter())
        .map(|(_, dt)| num_steps(*dt, max_dt))
        .fold(0_usize, usize::saturating_add);
    LimitError::check("split-step steps", total, limits.max_steps)?;
    limits.check_step_work("split-step steps × grid points", total, ham.len())?;
    log::debug!("split-step: {total} steps of at most {max_dt}");
    let mut snapshots: HashMap<u64, nd::Array<C64, D>> = HashMap::new();
    for branch in [pos, neg] {
        let mut psi = psi0.clone();
        for (t, dt) in branch {
            strang(ham, &mut psi, dt, num_steps(dt, max_dt));
            check_finite(&psi, t)?;
            snapshots.insert(time_key(t), psi.clone());
        }
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::{ Grid, Grid1 },
        hamiltonian::Params,
        utils::normalized,
    };

    fn gaussian(grid: &Grid1, x0: f64, sigma: f64, k0: f64) -> nd::Array1<C64> {
        let psi: nd::Array1<C64>
            = grid.x().coords().mapv(|x| {
                let g = (-(x - x0).powi(2) / (4.0 * sigma * sigma)).exp();
                C64::cis(k0 * x) * g
            });
        normalized(&psi, grid.cell_volume())
    }

    fn max_diff(a: &nd::Array1<C64>, b: &nd::Array1<C64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
    }

    #[test]
    fn method_resolution() {
        let limits = Limits { eigen_max_points: 100, ..Limits::default() };
        assert_eq!(Method::Auto.resolve(100, &limits).unwrap(), Method::Eigen);
        assert_eq!(Method::Auto.resolve(101, &limits).unwrap(), Method::SplitStep);
        assert!(matches!(
            Method::Eigen.resolve(101, &limits),
            Err(TError::Limit(_)),
        ));
        let m: Method = serde_json::from_str("\"crank-nicolson\"").unwrap();
        assert_eq!(m, Method::Auto);
        let m: Method = serde_json::from_str("\"split-step\"").unwrap();
        assert_eq!(m, Method::SplitStep);
    }

    #[test]
    fn schedule_orders_by_magnitude() {
        let (pos, neg) = schedule(&[0.3, -0.1, 0.0, 0.1, 0.3, -0.2, -0.0]);
        assert_eq!(pos, vec![0.1, 0.3]);
        assert_eq!(neg, vec![-0.1, -0.2]);
        assert_eq!(time_key(-0.0), time_key(0.0));
    }

    #[test]
    fn schemes_agree() {
        let grid = Grid1::new(-10.0, 10.0, 128).unwrap();
        let V = grid.x().coords().mapv(|x| 0.5 * x * x);
        let ham = Hamiltonian::new(&grid, V, Params::default()).unwrap();
        let psi0 = gaussian(&grid, 1.0, 0.8, 0.5);
        let times = [0.5, -0.25, 0.0, 0.5, 0.1];
        let limits = Limits { max_time_step: 1e-4, ..Limits::default() };
        let exact = evolve(&ham, &psi0, &times, Method::Eigen, &limits).unwrap();
        let split = evolve(&ham, &psi0, &times, Method::SplitStep, &limits).unwrap();
        assert_eq!(exact.method, Method::Eigen);
        assert_eq!(split.method, Method::SplitStep);
        for (a, b) in exact.states.iter().zip(split.states.iter()) {
            assert!(max_diff(a, b) < 1e-4);
        }
        // duplicates are identical
        assert_eq!(exact.states[0], exact.states[3]);
        assert_eq!(split.states[0], split.states[3]);
        // t = 0 is the input
        assert_eq!(exact.states[2], psi0);
        for norm in exact.norms.iter().chain(split.norms.iter()) {
            assert!((norm - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn backward_undoes_forward() {
        let grid = Grid1::new(-8.0, 8.0, 64).unwrap();
        let V = grid.x().coords().mapv(|x| 0.1 * x.powi(4));
        let params = Params { boundary: crate::hamiltonian::Boundary::Dirichlet, ..Params::default() };
        let ham = Hamiltonian::new(&grid, V, params).unwrap();
        let psi0 = gaussian(&grid, -1.0, 0.7, 1.0);
        let limits = Limits::default();
        let fwd = evolve(&ham, &psi0, &[0.3], Method::Eigen, &limits).unwrap();
        let back = evolve(&ham, &fwd.states[0], &[-0.3], Method::Eigen, &limits)
            .unwrap();
        assert!(max_diff(&back.states[0], &psi0) < 1e-10);
    }

    #[test]
    fn bad_inputs() {
        let grid = Grid1::new(-1.0, 1.0, 16).unwrap();
        let ham = Hamiltonian::new(&grid, nd::Array1::zeros(16), Params::default())
            .unwrap();
        let psi0 = gaussian(&grid, 0.0, 0.3, 0.0);
        let limits = Limits { max_times: 2, max_steps: 10, ..Limits::default() };
        assert!(matches!(
            evolve(&ham, &psi0, &[0.0, f64::NAN], Method::Auto, &limits),
            Err(TError::BadTime { index: 1, .. }),
        ));
        assert!(matches!(
            evolve(&ham, &psi0, &[0.0, 1.0, 2.0], Method::Auto, &limits),
            Err(TError::Limit(_)),
        ));
        assert!(matches!(
            evolve(&ham, &psi0, &[1.0], Method::SplitStep, &limits),
            Err(TError::Limit(_)),
        ));
        // four steps over sixteen points
        let limits = Limits { max_time_step: 0.25, max_step_work: 63, ..Limits::default() };
        assert!(matches!(
            evolve(&ham, &psi0, &[1.0], Method::SplitStep, &limits),
            Err(TError::Limit(_)),
        ));
        let limits = Limits { max_step_work: 64, ..limits };
        assert!(evolve(&ham, &psi0, &[1.0], Method::SplitStep, &limits).is_ok());
        let limits = Limits { max_times: 2, max_steps: 10, ..Limits::default() };
        let wrong = nd::Array1::<C64>::zeros(15);
        assert!(matches!(
            evolve(&ham, &wrong, &[1.0], Method::Auto, &limits),
            Err(TError::Shape(..)),
        ));
        let empty = evolve(&ham, &psi0, &[], Method::Auto, &limits).unwrap();
        assert!(empty.states.is_empty());
    }
}
