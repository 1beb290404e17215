//! Discretized Hamiltonians `H = -(ħ²/2m)∇² + V` on uniform grids.
//!
//! The kinetic operator is diagonal in a per-axis transform basis that depends
//! on the [`Boundary`] condition:
//! - **Periodic**: the Fourier basis, giving the spectral Laplacian with
//!   period `n d` along each axis. Energies are `(ħ²/2m) k²` for the standard
//!   FFT wavenumbers.
//! - **Dirichlet**: the type-I sine basis, which diagonalizes the three-point
//!   finite-difference Laplacian with the wavefunction taken to vanish one
//!   spacing beyond each end of the grid. Energies are
//!   `(ħ²/2m) (4/d²) sin²(π k / 2(n + 1))` for `k = 1, ..., n`.
//!
//! Because the dense matrix returned by [`Hamiltonian::matrix`] is built from
//! exactly the same one-dimensional operators, eigendecomposition and
//! split-step propagation discretize the same operator.

use ndarray as nd;
use ndarray_linalg::{ self as la, EighInto };
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use std::f64::consts::{ PI, TAU };
use crate::{
    error::{ HamiltonianError, ParamError },
    grid::Grid,
    utils::{ LaneDst, LaneFft, inner, norm_sq, wavenumbers },
};

pub type HResult<T> = Result<T, HamiltonianError>;

/// Boundary condition applied to every axis of a grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Wavefunctions wrap around with period `n d`.
    #[default]
    Periodic,
    /// Wavefunctions vanish just outside the grid.
    Dirichlet,
}

/// Physical parameters of a Hamiltonian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Params {
    /// Particle mass.
    pub mass: f64,
    /// Reduced Planck constant.
    pub hbar: f64,
    /// Boundary condition.
    pub boundary: Boundary,
}

impl Default for Params {
    fn default() -> Self {
        Self { mass: 1.0, hbar: 1.0, boundary: Boundary::Periodic }
    }
}

impl Params {
    /// Check that `mass` and `hbar` are positive and finite.
    pub fn check(&self) -> Result<(), ParamError> {
        ParamError::check("mass", self.mass)?;
        ParamError::check("hbar", self.hbar)
    }

    /// Return the prefactor `ħ²/2m` of the Laplacian.
    pub fn kinetic_scale(&self) -> f64 {
        self.hbar.powi(2) / (2.0 * self.mass)
    }
}

#[derive(Clone, Debug)]
enum Transform {
    Fourier(LaneFft),
    Sine(LaneDst),
}

// the kinetic operator along a single axis
#[derive(Clone, Debug)]
struct AxisKinetic {
    transform: Transform,
    energies: nd::Array1<f64>,
    d: f64,
    scale: f64,
}

impl AxisKinetic {
    fn new(n: usize, d: f64, params: &Params) -> Self {
        let scale = params.kinetic_scale();
        match params.boundary {
            Boundary::Periodic => {
                let energies = wavenumbers(n, d).mapv(|k| scale * k * k);
                Self { transform: Transform::Fourier(LaneFft::new(n)), energies, d, scale }
            },
            Boundary::Dirichlet => {
                let q = PI / (2 * (n + 1)) as f64;
                let energies: nd::Array1<f64>
                    = (1..=n)
                    .map(|k| 4.0 * scale / d.powi(2) * (q * k as f64).sin().powi(2))
                    .collect();
                Self { transform: Transform::Sine(LaneDst::new(n)), energies, d, scale }
            },
        }
    }

    fn len(&self) -> usize { self.energies.len() }

    fn forward<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        match &self.transform {
            Transform::Fourier(plan) => plan.forward(x, axis),
            Transform::Sine(plan) => plan.forward(x, axis),
        }
    }

    fn inverse<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        match &self.transform {
            Transform::Fourier(plan) => plan.inverse(x, axis),
            Transform::Sine(plan) => plan.inverse(x, axis),
        }
    }

    // dense position-space matrix of the operator
    fn matrix(&self) -> nd::Array2<f64> {
        let n = self.len();
        match self.transform {
            Transform::Fourier(_) => {
                // circulant; T[i, j] depends only on (i - j) mod n
                let c: nd::Array1<f64>
                    = (0..n)
                    .map(|delta| {
                        self.energies.iter().enumerate()
                            .map(|(m, e)| {
                                let arg = TAU * ((m * delta) % n) as f64 / n as f64;
                                e * arg.cos()
                            })
                            .sum::<f64>() / n as f64
                    })
                    .collect();
                nd::Array2::from_shape_fn((n, n), |(i, j)| c[(i + n - j) % n])
            },
            Transform::Sine(_) => {
                let off = -self.scale / self.d.powi(2);
                let mut T: nd::Array2<f64>
                    = nd::Array2::from_diag_elem(n, -2.0 * off);
                T.slice_mut(nd::s![1..n, 0..n - 1]).diag_mut().fill(off);
                T.slice_mut(nd::s![0..n - 1, 1..n]).diag_mut().fill(off);
                T
            },
        }
    }
}

/// Eigendecomposition of a dense Hamiltonian matrix.
///
/// Eigenvalues are in ascending order and eigenvectors are the columns of
/// `vectors`, orthonormal under the plain Euclidean inner product over flat
/// (row-major) grid indices.
#[derive(Clone, Debug)]
pub struct Eigen {
    /// Eigenvalues.
    pub energies: nd::Array1<f64>,
    /// Eigenvectors, one per column.
    pub vectors: nd::Array2<f64>,
}

/// A Hamiltonian for a fixed, real potential sampled on a grid.
///
/// All arrays passed to or returned from methods have the grid's shape.
#[derive(Clone, Debug)]
pub struct Hamiltonian<D>
where D: nd::Dimension
{
    params: Params,
    potential: nd::Array<f64, D>,
    kinetic: nd::Array<f64, D>,
    axes: Vec<AxisKinetic>,
    cell: f64,
    v_min: f64,
}

impl<D> Hamiltonian<D>
where D: nd::Dimension
{
    /// Assemble the Hamiltonian for a potential sampled on `grid`.
    ///
    /// Fails if `params` are invalid or `potential` does not have the grid's
    /// shape.
    pub fn new<G>(grid: &G, potential: nd::Array<f64, D>, params: Params)
        -> HResult<Self>
    where G: Grid<Dim = D>
    {
        params.check()?;
        if potential.raw_dim() != grid.dim() {
            return Err(HamiltonianError::Shape(
                potential.shape().to_vec(), grid.dim().slice().to_vec()));
        }
        let axes: Vec<AxisKinetic>
            = grid.axes().iter()
            .map(|a| AxisKinetic::new(a.len(), a.spacing(), &params))
            .collect();
        let mut kinetic: nd::Array<f64, D> = nd::Array::zeros(potential.raw_dim());
        for (k, axis) in axes.iter().enumerate() {
            kinetic.lanes_mut(nd::Axis(k)).into_iter()
                .for_each(|mut lane| { lane += &axis.energies; });
        }
        let v_min = potential.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(Self { params, potential, kinetic, axes, cell: grid.cell_volume(), v_min })
    }

    /// Get the physical parameters.
    pub fn params(&self) -> &Params { &self.params }

    /// Get the sampled potential.
    pub fn potential(&self) -> &nd::Array<f64, D> { &self.potential }

    /// Get the kinetic energy of each transform-basis mode.
    pub fn kinetic_energies(&self) -> &nd::Array<f64, D> { &self.kinetic }

    /// Get the grid shape.
    pub fn dim(&self) -> D { self.potential.raw_dim() }

    /// Get the total number of grid points.
    pub fn len(&self) -> usize { self.potential.len() }

    /// Return `false`; Hamiltonians are only built on non-empty grids.
    pub fn is_empty(&self) -> bool { self.potential.is_empty() }

    /// Get the grid cell volume.
    pub fn cell_volume(&self) -> f64 { self.cell }

    /// Transform a wavefunction in place into the basis in which the kinetic
    /// operator is diagonal.
    pub fn to_kinetic_basis(&self, psi: &mut nd::Array<C64, D>) {
        self.axes.iter().enumerate()
            .for_each(|(k, axis)| axis.forward(psi, k));
    }

    /// Inverse of [`Self::to_kinetic_basis`].
    pub fn from_kinetic_basis(&self, psi: &mut nd::Array<C64, D>) {
        self.axes.iter().enumerate()
            .for_each(|(k, axis)| axis.inverse(psi, k));
    }

    /// Compute `H ψ`.
    pub fn apply<S>(&self, psi: &nd::ArrayBase<S, D>) -> nd::Array<C64, D>
    where S: nd::Data<Elem = C64>
    {
        let mut out: nd::Array<C64, D> = psi.to_owned();
        self.to_kinetic_basis(&mut out);
        nd::Zip::from(&mut out).and(&self.kinetic)
            .for_each(|o, e| { *o *= *e; });
        self.from_kinetic_basis(&mut out);
        nd::Zip::from(&mut out).and(&self.potential).and(psi)
            .for_each(|o, v, p| { *o += *v * *p; });
        out
    }

    /// Compute the energy expectation value `<ψ|H|ψ> / <ψ|ψ>`.
    pub fn expectation_energy<S>(&self, psi: &nd::ArrayBase<S, D>) -> f64
    where S: nd::Data<Elem = C64>
    {
        let hpsi = self.apply(psi);
        inner(psi, &hpsi, self.cell).re / norm_sq(psi, self.cell)
    }

    /// Multiply by `exp(-i T dt / ħ)`.
    pub fn kinetic_phase(&self, psi: &mut nd::Array<C64, D>, dt: f64) {
        let w = -dt / self.params.hbar;
        self.to_kinetic_basis(psi);
        nd::Zip::from(&mut *psi).and(&self.kinetic)
            .for_each(|p, e| { *p *= C64::cis(*e * w); });
        self.from_kinetic_basis(psi);
    }

    /// Multiply by `exp(-i V dt / ħ)`.
    pub fn potential_phase(&self, psi: &mut nd::Array<C64, D>, dt: f64) {
        let w = -dt / self.params.hbar;
        nd::Zip::from(psi).and(&self.potential)
            .for_each(|p, v| { *p *= C64::cis(*v * w); });
    }

    /// Multiply by `exp(-T tau / ħ)`.
    pub fn kinetic_decay(&self, psi: &mut nd::Array<C64, D>, tau: f64) {
        let w = -tau / self.params.hbar;
        self.to_kinetic_basis(psi);
        nd::Zip::from(&mut *psi).and(&self.kinetic)
            .for_each(|p, e| { *p *= (*e * w).exp(); });
        self.from_kinetic_basis(psi);
    }

    /// Multiply by `exp(-(V - V_min) tau / ħ)`.
    ///
    /// The constant offset keeps every factor at most 1 and only changes the
    /// overall normalization.
    pub fn potential_decay(&self, psi: &mut nd::Array<C64, D>, tau: f64) {
        let w = -tau / self.params.hbar;
        let v_min = self.v_min;
        nd::Zip::from(psi).and(&self.potential)
            .for_each(|p, v| { *p *= ((*v - v_min) * w).exp(); });
    }

    /// Return the dense one-dimensional kinetic matrix for array axis `axis`.
    ///
    /// *Panics if `axis` is out of bounds*.
    pub fn kinetic_matrix_1d(&self, axis: usize) -> nd::Array2<f64> {
        self.axes[axis].matrix()
    }

    /// Return the full dense Hamiltonian over flat row-major grid indices.
    ///
    /// The result has `len()²` elements; callers are responsible for bounding
    /// the grid size.
    pub fn matrix(&self) -> nd::Array2<f64> {
        let shape: Vec<usize> = self.potential.shape().to_vec();
        let n = self.len();
        let mut H: nd::Array2<f64> = nd::Array2::zeros((n, n));
        let mut stride: usize = 1;
        for (k, axis) in self.axes.iter().enumerate().rev() {
            let nk = shape[k];
            let T = axis.matrix();
            for p in 0..n {
                let ik = (p / stride) % nk;
                let base = p - ik * stride;
                T.row(ik).iter().enumerate()
                    .for_each(|(j, t)| { H[[p, base + j * stride]] += t; });
            }
            stride *= nk;
        }
        H.diag_mut().iter_mut().zip(self.potential.iter())
            .for_each(|(h, v)| { *h += v; });
        H
    }

    /// Diagonalize the dense Hamiltonian.
    pub fn eigen(&self) -> HResult<Eigen> {
        let (energies, vectors): (nd::Array1<f64>, nd::Array2<f64>)
            = self.matrix().eigh_into(la::UPLO::Lower)?;
        Ok(Eigen { energies, vectors })
    }
}
