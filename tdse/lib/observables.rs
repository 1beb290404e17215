//! Expectation values of wavefunctions sampled on a grid.
//!
//! All expectation values are normalized by `Σ |ψ|² ΔV`, so `psi` need not be
//! normalized, but must not vanish identically. Per-axis results are returned
//! in array-axis order (for two-dimensional grids, `y` first).

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::ExprError,
    expr::{ Field, Formula, Scope },
    grid::Grid,
    hamiltonian::Hamiltonian,
    limits::Limits,
    utils::{ gradient, inner, norm_sq },
};

/// Name under which the wavefunction is bound in observable formulas.
pub const PSI_VAR: &str = "psi";

/// Calculate `Σ |ψ|² ΔV`.
pub fn norm<S, D>(psi: &nd::ArrayBase<S, D>, cell: f64) -> f64
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    norm_sq(psi, cell)
}

fn density<S, D>(psi: &nd::ArrayBase<S, D>) -> (nd::Array<f64, D>, f64)
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    let rho = psi.mapv(|z| z.norm_sqr());
    let total = rho.sum();
    (rho, total)
}

// Σ f(r_k) ρ / Σ ρ along array axis k
fn axis_moment<D, F>(
    rho: &nd::Array<f64, D>,
    total: f64,
    k: usize,
    coords: &nd::Array1<f64>,
    f: F,
) -> f64
where
    D: nd::Dimension,
    F: Fn(f64) -> f64,
{
    let weights = coords.mapv(f);
    rho.lanes(nd::Axis(k)).into_iter()
        .map(|lane| lane.dot(&weights))
        .sum::<f64>() / total
}

/// Calculate `<r_k>` along each axis.
pub fn expectation_position<G, S>(grid: &G, psi: &nd::ArrayBase<S, G::Dim>)
    -> Vec<f64>
where
    G: Grid,
    S: nd::Data<Elem = C64>,
{
    let (rho, total) = density(psi);
    grid.axes().iter().enumerate()
        .map(|(k, axis)| axis_moment(&rho, total, k, axis.coords(), |r| r))
        .collect()
}

/// Calculate `<r_k²> - <r_k>²` along each axis.
pub fn variance_position<G, S>(grid: &G, psi: &nd::ArrayBase<S, G::Dim>)
    -> Vec<f64>
where
    G: Grid,
    S: nd::Data<Elem = C64>,
{
    let (rho, total) = density(psi);
    grid.axes().iter().enumerate()
        .map(|(k, axis)| {
            let mean = axis_moment(&rho, total, k, axis.coords(), |r| r);
            let sq = axis_moment(&rho, total, k, axis.coords(), |r| r * r);
            sq - mean * mean
        })
        .collect()
}

/// Calculate `<p_k> = Re <ψ| -iħ ∂_k |ψ> / <ψ|ψ>` along each axis, with the
/// derivative taken by central differences.
pub fn expectation_momentum<G, S>(
    grid: &G,
    psi: &nd::ArrayBase<S, G::Dim>,
    hbar: f64,
) -> Vec<f64>
where
    G: Grid,
    S: nd::Data<Elem = C64>,
{
    let cell = grid.cell_volume();
    let total = norm_sq(psi, cell);
    grid.axes().iter().enumerate()
        .map(|(k, axis)| {
            let dpsi = gradient(psi, k, axis.spacing());
            let p = inner(psi, &dpsi, cell) * C64::new(0.0, -hbar);
            p.re / total
        })
        .collect()
}

/// Calculate `<H>`.
pub fn expectation_energy<S, D>(ham: &Hamiltonian<D>, psi: &nd::ArrayBase<S, D>)
    -> f64
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    ham.expectation_energy(psi)
}

/// Return the scope for observable formulas on `grid`: the grid's coordinate
/// variables, then `psi`, with `real`, `imag`, and `conj` allowed.
pub fn observable_scope<G: Grid>(grid: &G) -> Scope {
    Scope::for_grid(grid).with_var(PSI_VAR).with_complex_parts()
}

/// Calculate `Σ O ΔV / Σ |ψ|² ΔV` for a formula `O` parsed in
/// [`observable_scope`], e.g. `conj(psi) * x**2 * psi`.
pub fn expectation_expr<G, S>(
    grid: &G,
    psi: &nd::ArrayBase<S, G::Dim>,
    formula: &Formula,
    limits: &Limits,
) -> Result<C64, ExprError>
where
    G: Grid,
    S: nd::Data<Elem = C64>,
{
    let vars = grid.variables();
    let mut fields: Vec<Field<'_, G::Dim>>
        = vars.iter().map(|(_, a)| Field::Real(a.view())).collect();
    fields.push(Field::Complex(psi.view()));
    let values = formula.eval_complex(&fields, grid.dim(), limits)?;
    let total: f64 = psi.iter().map(|z| z.norm_sqr()).sum();
    Ok(values.sum() / total)
}
