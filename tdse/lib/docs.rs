//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Discretization](#discretization)
//! - [Time dependence](#time-dependence)
//! - [Eigenstates](#eigenstates)
//! - [Formulas](#formulas)
//!
//! # Background
//! The time-dependent Schrödinger equation (TDSE) for a particle of mass *m*
//! moving in a static, real potential *V*(**r**) reads
//! ```text
//!    ∂ψ          ħ²
//! iħ -- = H ψ = - --- ∇²ψ + V ψ
//!    ∂t          2 m
//! ```
//! Since *H* does not depend on time, the solution for any initial state is
//! formally
//! ```text
//! ψ(t) = exp(-i H t / ħ) ψ(0)
//! ```
//! and, *H* being Hermitian, the propagator is unitary: the total probability
//! `∫ |ψ|² dV` is conserved for all *t*, positive or negative.
//!
//! # Discretization
//! Wavefunctions are sampled on a uniform grid
//! ```text
//! x[i] = x_min + i δx, i ∊ {0, ..., N - 1}
//! ```
//! (in two dimensions, the product of two such axes, stored with the *y* index
//! first), and integrals are replaced by Riemann sums `Σ f ΔV` with `ΔV` the
//! volume of a single grid cell. The Laplacian is replaced by a discrete
//! operator diagonal in some orthogonal transform basis along each axis:
//! - With periodic boundaries, the transform is the discrete Fourier
//!   transform and each mode with wavenumber *k* has kinetic energy
//!   `ħ² k² / 2m`. This is the spectrally accurate choice for states that
//!   decay well within the grid.
//! - With Dirichlet boundaries, the three-point stencil
//!   `(f[i - 1] - 2 f[i] + f[i + 1]) / δx²` is used with `f[-1] = f[N] = 0`,
//!   and the transform is the type-I discrete sine transform. Mode *k* has
//!   energy `(ħ²/2m) (4/δx²) sin²(π k / 2(N + 1))`.
//!
//! In both cases the discrete Laplacian is a real symmetric matrix, so the
//! discrete propagator is exactly unitary with respect to the Riemann-sum
//! inner product.
//!
//! # Time dependence
//! For small grids, *H* is formed as a dense `N × N` matrix and diagonalized
//! once, `H = U diag(E) Uᵀ`, after which
//! ```text
//! ψ(t) = U diag(exp(-i E t / ħ)) Uᵀ ψ(0)
//! ```
//! for any number of times at the cost of two matrix-vector products each.
//!
//! For larger grids, the second-order (Strang) split-operator approximation
//! ```text
//! exp(-i H δt / ħ) ≈ exp(-i V δt / 2ħ) exp(-i T δt / ħ) exp(-i V δt / 2ħ)
//! ```
//! is used, with the kinetic factor `T` applied by multiplication in the
//! transform basis. Each factor is unitary on its own, so the norm is
//! preserved to round-off regardless of step size; the phase error after a
//! total time *t* is `O(t δt²)`.
//!
//! # Eigenstates
//! Low-lying eigenstates of *H* are found either from the same dense
//! decomposition or, for large grids, by propagation in imaginary time
//! `t → -iτ`, under which
//! ```text
//! ψ(τ) = Σ_n c_n exp(-E_n τ / ħ) φ_n
//! ```
//! relaxes (after renormalization) onto the lowest state with `c_n ≠ 0`.
//! Excited states are found one at a time by projecting out every state
//! already found after each step.
//!
//! # Formulas
//! Potentials, initial states, and observables are given as arithmetic
//! formulas in the grid coordinates (`x` in 1D; `X` and `Y` in 2D), following
//! Python operator precedence. See [`expr`][crate::expr] for the full grammar.
