//! Miscellaneous tools.
//!
//! Wavefunction norms and inner products here are plain Riemann sums over grid
//! cells, `Σ |ψ|² ΔV`, which is the quadrature under which the discrete
//! propagators in this crate are exactly unitary.

use std::{ f64::consts::PI, sync::Arc };
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use rustfft as fft;

/// Calculate the squared norm `Σ |ψ|² ΔV` of a wavefunction.
pub fn norm_sq<S, D>(psi: &nd::ArrayBase<S, D>, cell: f64) -> f64
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    psi.iter().map(|q| q.norm_sqr()).sum::<f64>() * cell
}

/// Calculate the inner product `Σ conj(q) p ΔV` of two wavefunctions.
///
/// *Panics if the arrays have different shapes*.
pub fn inner<S, T, D>(
    q: &nd::ArrayBase<S, D>,
    p: &nd::ArrayBase<T, D>,
    cell: f64,
) -> C64
where
    S: nd::Data<Elem = C64>,
    T: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    nd::Zip::from(q).and(p)
        .fold(C64::zero(), |acc, qk, pk| acc + qk.conj() * pk)
        * cell
}

/// Renormalize a wavefunction in place and return its original norm (not
/// squared).
///
/// A zero wavefunction is left untouched.
pub fn renormalize<S, D>(psi: &mut nd::ArrayBase<S, D>, cell: f64) -> f64
where
    S: nd::DataMut<Elem = C64>,
    D: nd::Dimension,
{
    let norm = norm_sq(psi, cell).sqrt();
    if norm > 0.0 {
        psi.map_inplace(|q| { *q /= norm; });
    }
    norm
}

/// Return a normalized copy of a wavefunction.
pub fn normalized<S, D>(psi: &nd::ArrayBase<S, D>, cell: f64)
    -> nd::Array<C64, D>
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    let mut out = psi.to_owned();
    renormalize(&mut out, cell);
    out
}

/// Generate an array of frequency-space coordinates to accompany a FFT of `n`
/// points for sampling interval `d`.
pub fn fft_freq(n: usize, d: f64) -> nd::Array1<f64> {
    let span = n as f64 * d;
    let npos = (n + 1) / 2;
    (0..n)
        .map(|k| {
            if k < npos { k as f64 / span } else { -((n - k) as f64) / span }
        })
        .collect()
}

/// Generate angular wavenumbers `2π f` to accompany a FFT of `n` points with
/// spacing `d`.
pub fn wavenumbers(n: usize, d: f64) -> nd::Array1<f64> {
    fft_freq(n, d) * (2.0 * PI)
}

/// Approximate the derivative of an array along one axis, using second-order
/// central differences in the interior and first-order one-sided differences
/// at the two ends.
///
/// *Panics if the axis has fewer than 2 points*.
pub fn gradient<S, D>(f: &nd::ArrayBase<S, D>, axis: usize, d: f64)
    -> nd::Array<C64, D>
where
    S: nd::Data<Elem = C64>,
    D: nd::Dimension,
{
    let ax = nd::Axis(axis);
    let mut out: nd::Array<C64, D> = nd::Array::zeros(f.raw_dim());
    nd::Zip::from(out.lanes_mut(ax)).and(f.lanes(ax))
        .for_each(|mut o, f| {
            let n = f.len();
            o[0] = (f[1] - f[0]) / d;
            o[n - 1] = (f[n - 1] - f[n - 2]) / d;
            (1..n - 1).for_each(|k| { o[k] = (f[k + 1] - f[k - 1]) / (2.0 * d); });
        });
    out
}

/// Planned complex FFT applied lane-by-lane along one axis of an array.
#[derive(Clone)]
pub struct LaneFft {
    n: usize,
    forward: Arc<dyn fft::Fft<f64>>,
    inverse: Arc<dyn fft::Fft<f64>>,
}

impl std::fmt::Debug for LaneFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LaneFft {{ n: {} }}", self.n)
    }
}

impl LaneFft {
    /// Plan forward and inverse transforms of length `n`.
    pub fn new(n: usize) -> Self {
        let mut planner = fft::FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        Self { n, forward, inverse }
    }

    /// Get the transform length.
    pub fn len(&self) -> usize { self.n }

    /// Return `true` if the transform has zero length.
    pub fn is_empty(&self) -> bool { self.n == 0 }

    /// Apply the unnormalized forward FFT along `axis` in place.
    ///
    /// *Panics if the axis length does not match the plan*.
    pub fn forward<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        run_lanes(self.forward.as_ref(), x, axis, 1.0);
    }

    /// Apply the inverse FFT along `axis` in place, scaled by `1 / n` so that
    /// it exactly undoes [`Self::forward`].
    ///
    /// *Panics if the axis length does not match the plan*.
    pub fn inverse<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        run_lanes(self.inverse.as_ref(), x, axis, (self.n as f64).recip());
    }
}

fn run_lanes<D>(
    plan: &dyn fft::Fft<f64>,
    x: &mut nd::Array<C64, D>,
    axis: usize,
    scale: f64,
)
where D: nd::Dimension
{
    let n = plan.len();
    assert_eq!(x.len_of(nd::Axis(axis)), n, "lane length does not match plan");
    let mut buf: Vec<C64> = vec![C64::zero(); n];
    let mut scratch: Vec<C64>
        = vec![C64::zero(); plan.get_inplace_scratch_len()];
    for mut lane in x.lanes_mut(nd::Axis(axis)) {
        buf.iter_mut().zip(lane.iter()).for_each(|(b, l)| { *b = *l; });
        plan.process_with_scratch(&mut buf, &mut scratch);
        lane.iter_mut().zip(buf.iter()).for_each(|(l, b)| { *l = *b * scale; });
    }
}

/// Planned type-I discrete sine transform applied lane-by-lane along one axis
/// of an array.
///
/// For a lane `a` of length `n`, the forward transform is
/// ```text
/// S[k] = Σ_j a[j] sin(π (j + 1) (k + 1) / (n + 1))
/// ```
/// computed via a complex FFT of the odd extension of length `2 (n + 1)`. The
/// transform is its own inverse up to a factor `2 / (n + 1)`. Its basis
/// vectors are the eigenvectors of the second-difference operator with zero
/// boundary values.
#[derive(Clone)]
pub struct LaneDst {
    n: usize,
    plan: Arc<dyn fft::Fft<f64>>,
}

impl std::fmt::Debug for LaneDst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LaneDst {{ n: {} }}", self.n)
    }
}

impl LaneDst {
    /// Plan a transform of length `n`.
    pub fn new(n: usize) -> Self {
        let mut planner = fft::FftPlanner::new();
        let plan = planner.plan_fft_forward(2 * (n + 1));
        Self { n, plan }
    }

    /// Get the transform length.
    pub fn len(&self) -> usize { self.n }

    /// Return `true` if the transform has zero length.
    pub fn is_empty(&self) -> bool { self.n == 0 }

    /// Apply the unnormalized transform along `axis` in place.
    ///
    /// *Panics if the axis length does not match the plan*.
    pub fn forward<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        self.run(x, axis, 1.0);
    }

    /// Apply the inverse transform along `axis` in place.
    ///
    /// *Panics if the axis length does not match the plan*.
    pub fn inverse<D>(&self, x: &mut nd::Array<C64, D>, axis: usize)
    where D: nd::Dimension
    {
        self.run(x, axis, 2.0 / (self.n + 1) as f64);
    }

    fn run<D>(&self, x: &mut nd::Array<C64, D>, axis: usize, scale: f64)
    where D: nd::Dimension
    {
        let n = self.n;
        let l = 2 * (n + 1);
        assert_eq!(x.len_of(nd::Axis(axis)), n, "lane length does not match plan");
        let zero = C64::zero();
        let half_i = C64::new(0.0, 0.5 * scale);
        let mut ext: Vec<C64> = vec![zero; l];
        let mut scratch: Vec<C64>
            = vec![zero; self.plan.get_inplace_scratch_len()];
        for mut lane in x.lanes_mut(nd::Axis(axis)) {
            ext[0] = zero;
            ext[n + 1] = zero;
            for (j, a) in lane.iter().enumerate() {
                ext[j + 1] = *a;
                ext[l - 1 - j] = -*a;
            }
            self.plan.process_with_scratch(&mut ext, &mut scratch);
            lane.iter_mut().zip(ext[1..=n].iter())
                .for_each(|(s, y)| { *s = half_i * *y; });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: C64, b: C64, tol: f64) -> bool { (a - b).norm() < tol }

    #[test]
    fn fft_freq_layout() {
        let f = fft_freq(4, 0.5);
        assert_eq!(f.to_vec(), vec![0.0, 0.5, -1.0, -0.5]);
        let f = fft_freq(5, 1.0);
        assert_eq!(f.to_vec(), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn riemann_norm() {
        let psi = nd::array![C64::new(1.0, 0.0), C64::new(0.0, 1.0), C64::new(1.0, 1.0)];
        assert!((norm_sq(&psi, 0.5) - 2.0).abs() < 1e-15);
        let psi = normalized(&psi, 0.5);
        assert!((norm_sq(&psi, 0.5) - 1.0).abs() < 1e-14);
        assert!(close(inner(&psi, &psi, 0.5), C64::new(1.0, 0.0), 1e-14));
        let mut zero = nd::Array1::<C64>::zeros(3);
        assert_eq!(renormalize(&mut zero, 0.5), 0.0);
        assert!(zero.iter().all(|q| *q == C64::zero()));
    }

    #[test]
    fn fft_roundtrip_along_axis() {
        let x: nd::Array2<C64>
            = nd::Array2::from_shape_fn((3, 8), |(j, i)| {
                C64::new((i * j) as f64, i as f64 - j as f64)
            });
        let plan = LaneFft::new(8);
        let mut y = x.clone();
        plan.forward(&mut y, 1);
        // zero-frequency component is the lane sum
        assert!(close(y[[2, 0]], x.row(2).sum(), 1e-12));
        plan.inverse(&mut y, 1);
        assert!(x.iter().zip(y.iter()).all(|(a, b)| close(*a, *b, 1e-12)));
    }

    #[test]
    fn transforms_along_leading_axis() {
        let x: nd::Array2<C64>
            = nd::Array2::from_shape_fn((6, 4), |(j, i)| {
                C64::new((j * j) as f64 - i as f64, (i + 2 * j) as f64)
            });
        let fft = LaneFft::new(6);
        let mut y = x.clone();
        fft.forward(&mut y, 0);
        // each column is transformed on its own
        for i in 0..4 {
            assert!(close(y[[0, i]], x.column(i).sum(), 1e-12));
        }
        fft.inverse(&mut y, 0);
        assert!(x.iter().zip(y.iter()).all(|(a, b)| close(*a, *b, 1e-12)));

        let dst = LaneDst::new(6);
        let mut s = x.clone();
        dst.forward(&mut s, 0);
        for i in 0..4 {
            let expected: C64
                = x.column(i).iter().enumerate()
                .map(|(j, xj)| xj * (PI * (j + 1) as f64 / 7.0).sin())
                .sum();
            assert!(close(s[[0, i]], expected, 1e-12));
        }
        dst.inverse(&mut s, 0);
        assert!(x.iter().zip(s.iter()).all(|(a, b)| close(*a, *b, 1e-12)));
    }

    #[test]
    fn dst_matches_definition() {
        let n = 5;
        let a: nd::Array1<C64>
            = (0..n).map(|j| C64::new(j as f64 + 1.0, 0.5 * j as f64)).collect();
        let mut s = a.clone();
        let dst = LaneDst::new(n);
        dst.forward(&mut s, 0);
        for k in 0..n {
            let expected: C64
                = a.iter().enumerate()
                .map(|(j, aj)| {
                    let arg = PI * ((j + 1) * (k + 1)) as f64 / (n + 1) as f64;
                    aj * arg.sin()
                })
                .sum();
            assert!(close(s[k], expected, 1e-12));
        }
        dst.inverse(&mut s, 0);
        assert!(a.iter().zip(s.iter()).all(|(x, y)| close(*x, *y, 1e-12)));
    }

    #[test]
    fn gradient_of_quadratic() {
        let d = 0.1;
        let f: nd::Array1<C64>
            = (0..6).map(|k| C64::new((k as f64 * d).powi(2), 0.0)).collect();
        let g = gradient(&f, 0, d);
        // central differences are exact for a quadratic
        for k in 1..5 {
            assert!((g[k].re - 2.0 * k as f64 * d).abs() < 1e-12);
        }
        assert!((g[0].re - 0.1).abs() < 1e-12);
        assert!((g[5].re - 0.9).abs() < 1e-12);
    }
}
