//! Functions to compute low-lying eigenstates of the time-independent
//! Schrödinger equation (TISE) for conservative potentials.
//!
//! Small grids are handled by dense diagonalization of
//! [`Hamiltonian::matrix`]; larger ones by imaginary-time split-step
//! relaxation, finding one state at a time and projecting out every state
//! already found after each step.

use std::{ cmp, time::Instant };
use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::{ prelude as rnd, Rng, SeedableRng };
use crate::{
    error::{ HamiltonianError, LimitError, XError },
    hamiltonian::Hamiltonian,
    limits::Limits,
    utils::{ inner, renormalize },
};

pub type XResult<T> = Result<T, XError>;

// base seed for the imaginary-time initial guesses; fixed so that solves are
// reproducible
const IMAG_TIME_SEED: u64 = 10546;

/// A single solution to the TISE.
///
/// The wavefunction is real and normalized so that `Σ |wf|² ΔV = 1`, with the
/// sign chosen so that its largest-magnitude element is positive.
#[derive(Clone, Debug)]
pub struct Solution<D>
where D: nd::Dimension
{
    /// Energy
    pub e: f64,
    /// Wavefunction
    pub wf: nd::Array<f64, D>,
}

impl<D> Solution<D>
where D: nd::Dimension
{
    /// Compare two `Solution`s by their energy.
    pub fn cmp_energy(&self, other: &Self) -> Option<cmp::Ordering> {
        self.e.partial_cmp(&other.e)
    }
}

fn fix_sign<D>(wf: &mut nd::Array<f64, D>)
where D: nd::Dimension
{
    let peak
        = wf.iter().copied()
        .fold(0.0_f64, |acc, w| if w.abs() > acc.abs() { w } else { acc });
    if peak < 0.0 { wf.map_inplace(|w| { *w = -*w; }); }
}

/// Eigensolver used for a time-independent solve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    /// Dense diagonalization.
    Dense,
    /// Imaginary-time relaxation with deflation.
    ImagTime,
}

impl Method {
    /// Return `true` if `self` is `Dense`.
    pub fn is_dense(&self) -> bool { matches!(self, Self::Dense) }

    /// Return `true` if `self` is `ImagTime`.
    pub fn is_imag_time(&self) -> bool { matches!(self, Self::ImagTime) }
}

fn check_num(num: usize, n: usize, limits: &Limits) -> XResult<()> {
    let max = limits.max_eigen_states.min(n);
    (1..=max).contains(&num).then_some(())
        .ok_or(XError::BadNumEigen { got: num, max })
}

/// Find the `num` lowest eigenstates by dense diagonalization.
///
/// Fails if the grid is larger than [`Limits::eigen_max_points`].
pub fn solve_dense<D>(ham: &Hamiltonian<D>, num: usize, limits: &Limits)
    -> XResult<Vec<Solution<D>>>
where D: nd::Dimension
{
    check_num(num, ham.len(), limits)?;
    LimitError::check(
        "grid points for dense diagonalization",
        ham.len(),
        limits.eigen_max_points,
    )?;
    let eigen = ham.eigen()?;
    let scale = ham.cell_volume().sqrt().recip();
    eigen.energies.iter().zip(eigen.vectors.columns())
        .take(num)
        .map(|(e, v)| {
            let mut wf: nd::Array<f64, D>
                = nd::Array::from_shape_fn(ham.len(), |p| v[p] * scale)
                .into_shape(ham.dim())
                .map_err(|_| {
                    HamiltonianError::Shape(vec![ham.len()], ham.dim().slice().to_vec())
                })?;
            fix_sign(&mut wf);
            Ok(Solution { e: *e, wf })
        })
        .collect()
}

// remove the components of `psi` along each (normalized) state in `found`
fn deflate<D>(psi: &mut nd::Array<C64, D>, found: &[nd::Array<C64, D>], cell: f64)
where D: nd::Dimension
{
    for phi in found.iter() {
        let c = inner(phi, psi, cell);
        nd::Zip::from(&mut *psi).and(phi)
            .for_each(|p, f| { *p -= c * f; });
    }
}

/// Find the `num` lowest eigenstates by imaginary-time split-step relaxation.
///
/// Each state starts from a fixed pseudo-random guess and is relaxed with
/// steps of [`Limits::imag_time_step`] until the energy changes by less than
/// [`Limits::imag_time_tolerance`] (relative to `max(1, |E|)`) over one step.
/// Fails with [`XError::NotConverged`] if this takes more than
/// [`Limits::imag_time_max_steps`] steps, and up front if `num` states of that
/// many steps each would exceed [`Limits::max_step_work`].
pub fn solve_imag_time<D>(ham: &Hamiltonian<D>, num: usize, limits: &Limits)
    -> XResult<Vec<Solution<D>>>
where D: nd::Dimension
{
    check_num(num, ham.len(), limits)?;
    limits.check_step_work(
        "imaginary-time steps × grid points",
        num.saturating_mul(limits.imag_time_max_steps),
        ham.len(),
    )?;
    let cell = ham.cell_volume();
    let tau = limits.imag_time_step;
    let mut found: Vec<nd::Array<C64, D>> = Vec::with_capacity(num);
    let mut solutions: Vec<Solution<D>> = Vec::with_capacity(num);
    for s in 0..num {
        let mut rng = rnd::StdRng::seed_from_u64(IMAG_TIME_SEED + s as u64);
        let mut psi: nd::Array<C64, D>
            = nd::Array::from_shape_simple_fn(ham.dim(), || {
                C64::new(rng.gen_range(-1.0..1.0), 0.0)
            });
        deflate(&mut psi, &found, cell);
        renormalize(&mut psi, cell);
        let mut e_prev = ham.expectation_energy(&psi);
        let mut converged = false;
        for _ in 0..limits.imag_time_max_steps {
            ham.potential_decay(&mut psi, tau / 2.0);
            ham.kinetic_decay(&mut psi, tau);
            ham.potential_decay(&mut psi, tau / 2.0);
            deflate(&mut psi, &found, cell);
            renormalize(&mut psi, cell);
            let e = ham.expectation_energy(&psi);
            if (e - e_prev).abs() <= limits.imag_time_tolerance * e.abs().max(1.0) {
                e_prev = e;
                converged = true;
                break;
            }
            e_prev = e;
        }
        if !converged || !e_prev.is_finite() {
            return Err(XError::NotConverged(s));
        }
        let mut wf = psi.mapv(|z| z.re);
        let norm = (wf.iter().map(|w| w * w).sum::<f64>() * cell).sqrt();
        wf.map_inplace(|w| { *w /= norm; });
        fix_sign(&mut wf);
        log::debug!("imaginary-time state {s} converged at E = {e_prev}");
        solutions.push(Solution { e: e_prev, wf });
        found.push(psi);
    }
    Ok(solutions)
}

/// Find the `num` lowest eigenstates, using [`solve_dense`] if the grid has
/// at most [`Limits::eigen_max_points`] points and [`solve_imag_time`]
/// otherwise.
pub fn solve<D>(ham: &Hamiltonian<D>, num: usize, limits: &Limits)
    -> XResult<(Vec<Solution<D>>, Method)>
where D: nd::Dimension
{
    let start = Instant::now();
    let method
        = if ham.len() <= limits.eigen_max_points {
            Method::Dense
        } else {
            Method::ImagTime
        };
    let solutions
        = match method {
            Method::Dense => solve_dense(ham, num, limits)?,
            Method::ImagTime => solve_imag_time(ham, num, limits)?,
        };
    log::debug!(
        "found {} eigenstates with {:?} in {:.3?}",
        solutions.len(), method, start.elapsed(),
    );
    Ok((solutions, method))
}
