#![allow(dead_code, non_snake_case)]

//! Provides a numerical solver for the time-dependent Schrödinger equation on
//! uniform one- and two-dimensional grids, driven by potentials and initial
//! states given as user-supplied formulas.
//!
//! Provides implementations for the following numerical routines:
//! - Safe, vectorized evaluation of restricted arithmetic formulas
//! - Spectral (periodic) and finite-difference (Dirichlet) Hamiltonians
//! - Time-dependent:
//!     - Exact propagation via dense eigendecomposition
//!     - Pseudo-spectral split-step operator
//! - Time-independent:
//!     - Dense eigendecomposition
//!     - Imaginary-time relaxation with deflation
//! - Expectation values of position, momentum, energy, and arbitrary formulas
//!
//! The [`api`] module collects these into complete request/response
//! pipelines. See [`docs`] for theoretical background.

pub mod error;
pub mod limits;
pub mod grid;
pub mod expr;
pub mod hamiltonian;
pub mod timedep;
pub mod solve;
pub mod observables;
pub mod utils;
pub mod api;

pub mod docs;
