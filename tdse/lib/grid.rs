//! Uniform one- and two-dimensional coordinate grids.
//!
//! Two-dimensional arrays are always laid out with shape `(num_y, num_x)`:
//! the first (zero-th) axis indexes *y* and the second indexes *x*, so that
//! `X[[j, i]] == x[i]` and `Y[[j, i]] == y[j]`. All dense operators built over
//! a grid use the corresponding row-major flat index `p = j * num_x + i`.

use ndarray as nd;
use crate::error::GridError;

pub type GridResult<T> = Result<T, GridError>;

// relative tolerance on spacing deviations for caller-supplied coordinates
const UNIFORM_RTOL: f64 = 1e-6;

/// A single uniformly spaced coordinate axis, inclusive of both endpoints.
///
/// The spacing is derived from the bounds and the number of points and cannot
/// be set independently.
#[derive(Clone, Debug)]
pub struct Axis {
    name: &'static str,
    coords: nd::Array1<f64>,
    d: f64,
}

impl Axis {
    /// Create a new axis from "linspace-style" arguments (start, inclusive
    /// end, and a number of points).
    pub fn new(name: &'static str, min: f64, max: f64, n: usize)
        -> GridResult<Self>
    {
        if n < 2 {
            return Err(GridError::TooFewPoints { axis: name, n });
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(GridError::NonFiniteBounds { axis: name, min, max });
        }
        if max <= min {
            return Err(GridError::EmptyRange { axis: name, min, max });
        }
        let d = (max - min) / (n - 1) as f64;
        if !d.is_normal() {
            return Err(GridError::BadSpacing { axis: name, d });
        }
        let mut coords: nd::Array1<f64> = nd::Array1::linspace(min, max, n);
        coords[n - 1] = max;
        Ok(Self { name, coords, d })
    }

    /// Validate a caller-supplied coordinate array and wrap it as an axis.
    ///
    /// The array must be ascending and uniformly spaced to within a small
    /// relative tolerance; the spacing is taken from the endpoints.
    pub fn from_coords(name: &'static str, coords: nd::Array1<f64>)
        -> GridResult<Self>
    {
        let n = coords.len();
        if n < 2 {
            return Err(GridError::TooFewPoints { axis: name, n });
        }
        let axis = Self::new(name, coords[0], coords[n - 1], n)?;
        let tol = UNIFORM_RTOL * axis.d;
        let bad
            = coords.iter().zip(axis.coords.iter())
            .position(|(c, expected)| !((c - expected).abs() <= tol));
        match bad {
            Some(index) => Err(GridError::NonUniform { axis: name, index }),
            None => Ok(axis),
        }
    }

    /// Get the name of the axis.
    pub fn name(&self) -> &'static str { self.name }

    /// Get a reference to the coordinate array.
    pub fn coords(&self) -> &nd::Array1<f64> { &self.coords }

    /// Get the grid spacing.
    pub fn spacing(&self) -> f64 { self.d }

    /// Get the number of points.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.coords.len() }

    /// Get the lower bound.
    pub fn min(&self) -> f64 { self.coords[0] }

    /// Get the upper bound.
    pub fn max(&self) -> f64 { self.coords[self.coords.len() - 1] }
}

/// Common interface to grids of any dimension.
pub trait Grid {
    /// Array dimension type of fields sampled on the grid.
    type Dim: nd::Dimension;

    /// Return the axes in array-axis order.
    fn axes(&self) -> Vec<&Axis>;

    /// Return the shape of fields sampled on the grid.
    fn dim(&self) -> Self::Dim;

    /// Return the named coordinate arrays bound to formula variables, each of
    /// grid shape.
    fn variables(&self) -> Vec<(&'static str, nd::Array<f64, Self::Dim>)>;

    /// Return the names of the formula variables in the order returned by
    /// [`Self::variables`].
    fn variable_names(&self) -> Vec<&'static str>;

    /// Return the total number of grid points.
    fn len(&self) -> usize { self.axes().iter().map(|a| a.len()).product() }

    /// Return `false`; grids always hold at least two points per axis.
    fn is_empty(&self) -> bool { false }

    /// Return the grid spacings in array-axis order.
    fn spacings(&self) -> Vec<f64> {
        self.axes().iter().map(|a| a.spacing()).collect()
    }

    /// Return the volume (length, area) of a single grid cell.
    fn cell_volume(&self) -> f64 { self.spacings().into_iter().product() }
}

/// One-dimensional grid with coordinate variable `x`.
#[derive(Clone, Debug)]
pub struct Grid1 {
    x: Axis,
}

impl Grid1 {
    /// Create a new grid from "linspace-style" arguments.
    pub fn new(xmin: f64, xmax: f64, num_x: usize) -> GridResult<Self> {
        Ok(Self { x: Axis::new("x", xmin, xmax, num_x)? })
    }

    /// Wrap an already validated axis.
    pub fn from_axis(x: Axis) -> Self { Self { x } }

    /// Get the `x` axis.
    pub fn x(&self) -> &Axis { &self.x }
}

impl Grid for Grid1 {
    type Dim = nd::Ix1;

    fn axes(&self) -> Vec<&Axis> { vec![&self.x] }

    fn dim(&self) -> nd::Ix1 { nd::Ix1(self.x.len()) }

    fn variables(&self) -> Vec<(&'static str, nd::Array1<f64>)> {
        vec![("x", self.x.coords.clone())]
    }

    fn variable_names(&self) -> Vec<&'static str> { vec!["x"] }
}

/// Two-dimensional grid with meshgrid variables `X` and `Y`.
///
/// Fields have shape `(num_y, num_x)`.
#[derive(Clone, Debug)]
pub struct Grid2 {
    x: Axis,
    y: Axis,
}

impl Grid2 {
    /// Create a new grid from "linspace-style" arguments for each axis.
    pub fn new(xargs: (f64, f64, usize), yargs: (f64, f64, usize))
        -> GridResult<Self>
    {
        let x = Axis::new("x", xargs.0, xargs.1, xargs.2)?;
        let y = Axis::new("y", yargs.0, yargs.1, yargs.2)?;
        Ok(Self { x, y })
    }

    /// Wrap already validated axes.
    pub fn from_axes(x: Axis, y: Axis) -> Self { Self { x, y } }

    /// Get the `x` axis.
    pub fn x(&self) -> &Axis { &self.x }

    /// Get the `y` axis.
    pub fn y(&self) -> &Axis { &self.y }

    /// Return the full `(X, Y)` meshgrid pair, each of shape `(num_y, num_x)`.
    pub fn meshgrid(&self) -> (nd::Array2<f64>, nd::Array2<f64>) {
        let dim = (self.y.len(), self.x.len());
        let X = nd::Array2::from_shape_fn(dim, |(_, i)| self.x.coords[i]);
        let Y = nd::Array2::from_shape_fn(dim, |(j, _)| self.y.coords[j]);
        (X, Y)
    }
}

impl Grid for Grid2 {
    type Dim = nd::Ix2;

    fn axes(&self) -> Vec<&Axis> { vec![&self.y, &self.x] }

    fn dim(&self) -> nd::Ix2 { nd::Ix2(self.y.len(), self.x.len()) }

    fn variables(&self) -> Vec<(&'static str, nd::Array2<f64>)> {
        let (X, Y) = self.meshgrid();
        vec![("X", X), ("Y", Y)]
    }

    fn variable_names(&self) -> Vec<&'static str> { vec!["X", "Y"] }
}
