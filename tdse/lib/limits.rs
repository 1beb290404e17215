//! Hard ceilings on the work a single request may ask for.
//!
//! Every solve is bounded in memory and time by these values; exceeding any of
//! them is reported as a [`LimitError`][crate::error::LimitError] before the
//! corresponding work begins.

use serde::Deserialize;
use crate::{
    error::LimitError,
    grid::Grid,
};

/// Configurable resource ceilings and numerical tolerances.
///
/// Deserializable from a table in which every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Maximum total number of grid points.
    pub max_grid_points: usize,
    /// Maximum number of points along any single axis.
    pub max_points_per_axis: usize,
    /// Maximum length of a formula, in bytes.
    pub max_expr_len: usize,
    /// Maximum number of nodes in a parsed formula.
    pub max_expr_nodes: usize,
    /// Maximum nesting depth of a formula.
    pub max_expr_depth: usize,
    /// Maximum of (formula nodes) × (grid points) for one evaluation.
    pub max_eval_work: usize,
    /// Maximum number of requested output times.
    pub max_times: usize,
    /// Largest grid (total points) for which dense diagonalization is used.
    pub eigen_max_points: usize,
    /// Largest split-step time step.
    pub max_time_step: f64,
    /// Maximum total number of split-step steps for one request.
    pub max_steps: usize,
    /// Maximum of (steps) × (grid points) for one split-step propagation or
    /// imaginary-time solve.
    pub max_step_work: usize,
    /// Norm drift above which a warning is logged.
    pub norm_tolerance: f64,
    /// Maximum number of eigenstates in a time-independent solve.
    pub max_eigen_states: usize,
    /// Imaginary-time step used for large time-independent solves.
    pub imag_time_step: f64,
    /// Maximum number of imaginary-time steps per eigenstate.
    pub imag_time_max_steps: usize,
    /// Relative energy change below which imaginary-time relaxation stops.
    pub imag_time_tolerance: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_grid_points: 262_144,
            max_points_per_axis: 4096,
            max_expr_len: 1024,
            max_expr_nodes: 512,
            max_expr_depth: 64,
            max_eval_work: 500_000_000,
            max_times: 1000,
            eigen_max_points: 1024,
            max_time_step: 1e-3,
            max_steps: 2_000_000,
            max_step_work: 2_000_000_000,
            norm_tolerance: 1e-6,
            max_eigen_states: 64,
            imag_time_step: 1e-3,
            imag_time_max_steps: 50_000,
            imag_time_tolerance: 1e-10,
        }
    }
}

impl Limits {
    /// Check per-axis point counts against `max_points_per_axis` and their
    /// product against `max_grid_points`.
    ///
    /// Needs only the requested counts, so it can run before any grid is
    /// allocated.
    pub fn check_axes(&self, counts: &[usize]) -> Result<(), LimitError> {
        for &n in counts.iter() {
            LimitError::check("points per axis", n, self.max_points_per_axis)?;
        }
        let total
            = counts.iter().copied().fold(1_usize, usize::saturating_mul);
        LimitError::check("total grid points", total, self.max_grid_points)
    }

    /// Check the size of a grid against `max_grid_points` and
    /// `max_points_per_axis`.
    pub fn check_grid<G: Grid>(&self, grid: &G) -> Result<(), LimitError> {
        let counts: Vec<usize> = grid.axes().iter().map(|a| a.len()).collect();
        self.check_axes(&counts)
    }

    /// Check `steps` steps over a grid of `points` points against
    /// `max_step_work`.
    pub fn check_step_work(&self, what: &'static str, steps: usize, points: usize)
        -> Result<(), LimitError>
    {
        LimitError::check(what, steps.saturating_mul(points), self.max_step_work)
    }

    /// Check the number of requested output times against `max_times`.
    pub fn check_times(&self, n: usize) -> Result<(), LimitError> {
        LimitError::check("number of requested times", n, self.max_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{ Grid1, Grid2 };

    #[test]
    fn partial_table_keeps_defaults() {
        let limits: Limits
            = serde_json::from_str(r#"{ "max_times": 5 }"#).unwrap();
        assert_eq!(limits.max_times, 5);
        assert_eq!(limits.eigen_max_points, Limits::default().eigen_max_points);
    }

    #[test]
    fn unknown_fields_rejected() {
        let res: Result<Limits, _>
            = serde_json::from_str(r#"{ "max_tims": 5 }"#);
        assert!(res.is_err());
    }

    #[test]
    fn grid_ceilings() {
        let limits = Limits {
            max_grid_points: 100,
            max_points_per_axis: 20,
            ..Limits::default()
        };
        let ok = Grid1::new(-1.0, 1.0, 20).unwrap();
        assert!(limits.check_grid(&ok).is_ok());
        let long = Grid1::new(-1.0, 1.0, 21).unwrap();
        assert!(limits.check_grid(&long).is_err());
        let big = Grid2::new((-1.0, 1.0, 11), (-1.0, 1.0, 10)).unwrap();
        assert_eq!(limits.check_grid(&big).unwrap_err().value, 110);
        assert!(limits.check_times(1000).is_ok());
        assert!(limits.check_times(1001).is_err());
    }

    #[test]
    fn axis_counts_checked_without_a_grid() {
        let limits = Limits::default();
        assert!(limits.check_axes(&[4096]).is_ok());
        assert_eq!(limits.check_axes(&[1 << 40]).unwrap_err().value, 1 << 40);
        assert_eq!(
            limits.check_axes(&[usize::MAX]).unwrap_err().what, "points per axis");
        // each axis fits but the product does not
        let err = limits.check_axes(&[4096, 4096]).unwrap_err();
        assert_eq!(err.what, "total grid points");
        assert_eq!(err.value, 4096 * 4096);
        let limits = Limits { max_points_per_axis: usize::MAX, ..limits };
        let err = limits.check_axes(&[usize::MAX, 2]).unwrap_err();
        assert_eq!(err.value, usize::MAX);
    }

    #[test]
    fn step_work() {
        let limits = Limits { max_step_work: 1000, ..Limits::default() };
        assert!(limits.check_step_work("steps", 10, 100).is_ok());
        assert_eq!(limits.check_step_work("steps", 11, 100).unwrap_err().value, 1100);
        assert_eq!(
            limits.check_step_work("steps", usize::MAX, 2).unwrap_err().value,
            usize::MAX,
        );
    }
}
