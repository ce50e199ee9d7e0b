//! Bounded derivative-free refinement of decoded car positions.
//!
//! The regressed position of a detection is only as good as the network; the
//! cell it was read from is a second, independent observation. The
//! [`PositionRefiner`] moves the position so that it projects into that cell
//! while staying close to the road surface given by a [`SlopePrior`].

use carpose_3d::CameraIntrinsic;
use carpose_pose::Position;
use carpose_target::FrameGeometry;
use serde::{Deserialize, Serialize};

use crate::{error::RefineError, slope::SlopePrior};

/// A minimization result.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// The point with the lowest objective value found.
    pub point: Vec<f64>,
    /// The objective value at `point`.
    pub value: f64,
    /// Number of outer iterations performed.
    pub iterations: usize,
}

/// A bounded minimizer of a scalar function.
pub trait Minimizer: Send + Sync {
    /// Minimize `objective` starting from `start`, keeping every coordinate
    /// inside its `(lower, upper)` bound.
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        start: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<Minimum, RefineError>;
}

/// Powell's conjugate direction method.
///
/// Each iteration runs a line search along every direction of the set, then
/// replaces the direction of largest decrease by the overall displacement when
/// that keeps the set conjugate. Line searches bracket the minimum inside the
/// feasible interval and polish it with Brent's method, so no gradient is
/// needed and the objective may be non-smooth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Powell {
    /// Maximum number of outer iterations.
    pub max_iterations: usize,
    /// Relative decrease of the objective below which the search stops.
    pub function_tolerance: f64,
    /// Relative tolerance of the line searches.
    pub line_tolerance: f64,
    /// Maximum number of Brent iterations per line search.
    pub max_line_iterations: usize,
}

impl Default for Powell {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            function_tolerance: 1e-6,
            line_tolerance: 1e-4,
            max_line_iterations: 100,
        }
    }
}

impl Powell {
    /// Create a minimizer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of outer iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the function tolerance.
    pub fn with_function_tolerance(mut self, tol: f64) -> Self {
        self.function_tolerance = tol;
        self
    }

    /// Set the line search tolerance.
    pub fn with_line_tolerance(mut self, tol: f64) -> Self {
        self.line_tolerance = tol;
        self
    }

    fn line_search(
        &self,
        f: &dyn Fn(&[f64]) -> f64,
        x: &[f64],
        fx: f64,
        direction: &[f64],
        bounds: &[(f64, f64)],
    ) -> (Vec<f64>, f64) {
        if direction.iter().all(|d| *d == 0.0) {
            return (x.to_vec(), fx);
        }
        let (tmin, tmax) = feasible_interval(x, direction, bounds);
        if tmax - tmin <= 0.0 {
            return (x.to_vec(), fx);
        }

        let along = |t: f64| -> Vec<f64> {
            x.iter()
                .zip(direction)
                .zip(bounds)
                .map(|((xi, di), (lo, hi))| (xi + t * di).clamp(*lo, *hi))
                .collect()
        };
        let phi = |t: f64| f(along(t).as_slice());

        let (lo, hi) = bracket(&phi, fx, tmin, tmax);
        let (t, ft) = brent(&phi, lo, hi, self.line_tolerance, self.max_line_iterations);
        // only move on a strict decrease, flat regions keep the current point
        if ft < fx {
            (along(t), ft)
        } else {
            (x.to_vec(), fx)
        }
    }
}

impl Minimizer for Powell {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        start: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<Minimum, RefineError> {
        let n = start.len();
        if bounds.len() != n {
            return Err(RefineError::DimensionMismatch {
                start: n,
                bounds: bounds.len(),
            });
        }
        check_bounds(bounds)?;

        // NaN compares false everywhere, treat it as +inf
        let f = |p: &[f64]| -> f64 {
            let value = objective(p);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        let mut x = start
            .iter()
            .zip(bounds)
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect::<Vec<_>>();
        let mut fx = f(x.as_slice());
        let mut directions = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect::<Vec<f64>>())
            .collect::<Vec<_>>();

        for iteration in 0..self.max_iterations {
            let (x_start, f_start) = (x.clone(), fx);
            let mut biggest_drop = 0.0;
            let mut biggest_index = 0;

            for (i, direction) in directions.iter().enumerate() {
                let f_before = fx;
                (x, fx) = self.line_search(&f, &x, fx, direction, bounds);
                if f_before - fx > biggest_drop {
                    biggest_drop = f_before - fx;
                    biggest_index = i;
                }
            }

            let converged = fx >= f_start
                || 2.0 * (f_start - fx)
                    <= self.function_tolerance * (f_start.abs() + fx.abs()) + 1e-20;
            if converged {
                if !fx.is_finite() || x.iter().any(|v| !v.is_finite()) {
                    return Err(RefineError::NonFinite {
                        value: fx,
                        point: x,
                    });
                }
                return Ok(Minimum {
                    point: x,
                    value: fx,
                    iterations: iteration + 1,
                });
            }

            let displacement = x.iter().zip(&x_start).map(|(a, b)| a - b).collect::<Vec<_>>();
            let extrapolated = x
                .iter()
                .zip(&x_start)
                .zip(bounds)
                .map(|((a, b), (lo, hi))| (2.0 * a - b).clamp(*lo, *hi))
                .collect::<Vec<_>>();
            let f_extrapolated = f(extrapolated.as_slice());

            if f_extrapolated < f_start {
                let t = 2.0 * (f_start - 2.0 * fx + f_extrapolated)
                    * (f_start - fx - biggest_drop).powi(2)
                    - biggest_drop * (f_start - f_extrapolated).powi(2);
                if t < 0.0 {
                    (x, fx) = self.line_search(&f, &x, fx, &displacement, bounds);
                    directions.swap(biggest_index, n - 1);
                    directions[n - 1] = displacement;
                }
            }
        }

        Err(RefineError::NotConverged(self.max_iterations))
    }
}

/// Every bound must satisfy `lower <= upper`, NaN failing the comparison.
pub fn check_bounds(bounds: &[(f64, f64)]) -> Result<(), RefineError> {
    match bounds.iter().position(|(lo, hi)| !(lo <= hi)) {
        Some(index) => Err(RefineError::InvalidBounds {
            index,
            lower: bounds[index].0,
            upper: bounds[index].1,
        }),
        None => Ok(()),
    }
}

/// Range of steps `t` along `direction` that keep `x + t * direction` inside the bounds.
fn feasible_interval(x: &[f64], direction: &[f64], bounds: &[(f64, f64)]) -> (f64, f64) {
    let mut tmin = f64::NEG_INFINITY;
    let mut tmax = f64::INFINITY;
    for ((xi, di), (lo, hi)) in x.iter().zip(direction).zip(bounds) {
        if *di == 0.0 {
            continue;
        }
        let (a, b) = ((lo - xi) / di, (hi - xi) / di);
        tmin = tmin.max(a.min(b));
        tmax = tmax.min(a.max(b));
    }
    (tmin.min(0.0), tmax.max(0.0))
}

const GOLDEN_RATIO: f64 = 1.618034;
const GOLDEN_SECTION: f64 = 0.381_966_0;
const MAX_BRACKET_STEPS: usize = 64;

/// Find an interval around `t = 0` that contains a local minimum of `phi`.
fn bracket(phi: &dyn Fn(f64) -> f64, f0: f64, tmin: f64, tmax: f64) -> (f64, f64) {
    let (mut a, mut b) = (0.0, 1.0f64.min(tmax));
    let mut fb = if b != a { phi(b) } else { f64::INFINITY };

    if !(fb <= f0) {
        let c = (-1.0f64).max(tmin);
        let fc = if c != a { phi(c) } else { f64::INFINITY };
        if !(fc <= f0) {
            return (c, b);
        }
        (b, fb) = (c, fc);
    }

    for _ in 0..MAX_BRACKET_STEPS {
        let c = (b + GOLDEN_RATIO * (b - a)).clamp(tmin, tmax);
        if c == b {
            return (a.min(b), a.max(b));
        }
        let fc = phi(c);
        if !(fc <= fb) {
            return (a.min(c), a.max(c));
        }
        (a, b, fb) = (b, c, fc);
    }
    (a.min(b), a.max(b))
}

/// Brent's minimization of `phi` on `[a, b]`.
fn brent(phi: &dyn Fn(f64) -> f64, a: f64, b: f64, tol: f64, max_iterations: usize) -> (f64, f64) {
    let (mut a, mut b) = (a, b);
    let mut x = a + GOLDEN_SECTION * (b - a);
    let (mut w, mut v) = (x, x);
    let mut fx = phi(x);
    let (mut fw, mut fv) = (fx, fx);
    let (mut d, mut e) = (0.0f64, 0.0f64);

    for _ in 0..max_iterations {
        let xm = 0.5 * (a + b);
        let tol1 = tol * x.abs() + 1e-10;
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        let mut golden = true;
        if e.abs() > tol1 {
            // parabolic fit through x, w, v
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let e_prev = e;
            e = d;
            let acceptable =
                p.abs() < (0.5 * q * e_prev).abs() && p > q * (a - x) && p < q * (b - x);
            if acceptable {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = tol1.copysign(xm - x);
                }
                golden = false;
            }
        }
        if golden {
            e = if x >= xm { a - x } else { b - x };
            d = GOLDEN_SECTION * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else {
            x + tol1.copysign(d)
        };
        let fu = phi(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            (v, fv) = (w, fw);
            (w, fw) = (x, fx);
            (x, fx) = (u, fu);
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                (v, fv) = (w, fw);
                (w, fw) = (u, fu);
            } else if fu <= fv || v == x || v == w {
                (v, fv) = (u, fu);
            }
        }
    }
    (x, fx)
}

/// Parameters of the position refinement objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefineParams {
    /// Floor of the squared grid distance term, in cells squared.
    pub grid_floor: f64,
    /// Floor of the squared slope residual term, in meters squared.
    pub slope_floor: f64,
    /// Bounds of `x`, `y` and `z` in meters.
    pub bounds: [(f64, f64); 3],
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            grid_floor: 0.2,
            slope_floor: 0.4,
            bounds: [(-500.0, 500.0), (-500.0, 500.0), (0.1, 500.0)],
        }
    }
}

impl RefineParams {
    /// Create default refinement parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the floor of the grid distance term.
    pub fn with_grid_floor(mut self, floor: f64) -> Self {
        self.grid_floor = floor;
        self
    }

    /// Set the floor of the slope term.
    pub fn with_slope_floor(mut self, floor: f64) -> Self {
        self.slope_floor = floor;
        self
    }

    /// Set the position bounds.
    pub fn with_bounds(mut self, bounds: [(f64, f64); 3]) -> Self {
        self.bounds = bounds;
        self
    }

    /// Check that every bound is ordered and not NaN.
    pub fn validate(&self) -> Result<(), RefineError> {
        check_bounds(&self.bounds)
    }
}

/// Refines decoded positions against their grid cell and a road prior.
///
/// The objective for a detection read at cell `(r, c)` is
///
/// `max(grid_floor, (row - r)^2 + (col - c)^2) + max(slope_floor, (prior(x', z) - y)^2)`
///
/// where `(row, col)` is the grid position `(x, y, z)` projects to and `x'` is
/// `-x` for flipped images, the prior being fitted on unflipped data.
pub struct PositionRefiner<'a, P: SlopePrior + ?Sized> {
    camera: &'a CameraIntrinsic,
    geometry: &'a FrameGeometry,
    prior: &'a P,
    params: &'a RefineParams,
}

impl<'a, P: SlopePrior + ?Sized> PositionRefiner<'a, P> {
    /// Creates a refiner borrowing its configuration.
    pub fn new(
        camera: &'a CameraIntrinsic,
        geometry: &'a FrameGeometry,
        prior: &'a P,
        params: &'a RefineParams,
    ) -> Self {
        Self {
            camera,
            geometry,
            prior,
            params,
        }
    }

    /// Evaluate the objective at `position` for a detection read at `cell`.
    ///
    /// Positions that cannot be projected evaluate to `+inf`.
    pub fn objective(&self, position: &[f64; 3], cell: [usize; 2], flipped: bool) -> f64 {
        let [x, y, z] = *position;
        let Ok(pixel) = self.camera.project(position) else {
            return f64::INFINITY;
        };
        let [row, col] = self.geometry.pixel_to_grid(&pixel);
        let grid_error = (row - cell[0] as f64).powi(2) + (col - cell[1] as f64).powi(2);

        let prior_x = if flipped { -x } else { x };
        let slope_error = (self.prior.predict(prior_x, z) - y).powi(2);

        grid_error.max(self.params.grid_floor) + slope_error.max(self.params.slope_floor)
    }

    /// Refine a position with the given minimizer.
    ///
    /// # Errors
    ///
    /// Whatever the minimizer reports; the caller decides on a fallback.
    pub fn refine<M: Minimizer + ?Sized>(
        &self,
        minimizer: &M,
        cell: [usize; 2],
        start: &Position,
        flipped: bool,
    ) -> Result<Position, RefineError> {
        let objective = |p: &[f64]| -> f64 {
            match p {
                [x, y, z] => self.objective(&[*x, *y, *z], cell, flipped),
                _ => f64::INFINITY,
            }
        };
        let minimum = minimizer.minimize(&objective, &start.to_array(), &self.params.bounds)?;
        match minimum.point.as_slice() {
            [x, y, z] => Ok(Position::new(*x, *y, *z)),
            _ => Err(RefineError::DimensionMismatch {
                start: minimum.point.len(),
                bounds: 3,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slope::LinearSlopePrior;
    use approx::assert_relative_eq;

    const WIDE: [(f64, f64); 3] = [(-500.0, 500.0), (-500.0, 500.0), (0.1, 500.0)];

    #[test]
    fn test_powell_quadratic() -> Result<(), RefineError> {
        let f = |p: &[f64]| {
            (p[0] - 1.0).powi(2)
                + 10.0 * (p[1] + 2.0).powi(2)
                + (p[2] - 3.0).powi(2)
                + (p[0] - 1.0) * (p[2] - 3.0)
        };
        let minimum = Powell::new().minimize(&f, &[10.0, 10.0, 10.0], &WIDE)?;
        assert_relative_eq!(minimum.point[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(minimum.point[1], -2.0, epsilon = 1e-4);
        assert_relative_eq!(minimum.point[2], 3.0, epsilon = 1e-4);
        assert!(minimum.value < 1e-8);
        Ok(())
    }

    #[test]
    fn test_powell_rosenbrock() -> Result<(), RefineError> {
        let f = |p: &[f64]| 100.0 * (p[1] - p[0] * p[0]).powi(2) + (1.0 - p[0]).powi(2);
        let powell = Powell::new().with_max_iterations(1000);
        let minimum = powell.minimize(&f, &[-1.2, 1.0], &[(-5.0, 5.0), (-5.0, 5.0)])?;
        assert_relative_eq!(minimum.point[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(minimum.point[1], 1.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_powell_respects_bounds() -> Result<(), RefineError> {
        let f = |p: &[f64]| (p[0] - 5.0).powi(2) + p[1] * p[1];
        let minimum = Powell::new().minimize(&f, &[0.5, 1.0], &[(0.0, 2.0), (-1.0, 1.0)])?;
        assert_relative_eq!(minimum.point[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(minimum.point[1], 0.0, epsilon = 1e-4);
        assert_relative_eq!(minimum.value, 9.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_powell_errors() {
        let f = |_: &[f64]| f64::NAN;
        assert!(matches!(
            Powell::new().minimize(&f, &[1.0, 2.0], &[(0.0, 3.0), (0.0, 3.0)]),
            Err(RefineError::NonFinite { .. })
        ));

        let g = |p: &[f64]| p[0] * p[0];
        assert_eq!(
            Powell::new().minimize(&g, &[1.0, 2.0], &[(0.0, 3.0)]),
            Err(RefineError::DimensionMismatch {
                start: 2,
                bounds: 1
            })
        );

        let rosenbrock = |p: &[f64]| 100.0 * (p[1] - p[0] * p[0]).powi(2) + (1.0 - p[0]).powi(2);
        assert_eq!(
            Powell::new().with_max_iterations(1).minimize(
                &rosenbrock,
                &[-1.2, 1.0],
                &[(-5.0, 5.0), (-5.0, 5.0)]
            ),
            Err(RefineError::NotConverged(1))
        );
    }

    #[test]
    fn test_invalid_bounds() {
        let f = |p: &[f64]| p[0] * p[0] + p[1] * p[1];
        assert_eq!(
            Powell::new().minimize(&f, &[1.0, 1.0], &[(-1.0, 1.0), (500.0, 0.1)]),
            Err(RefineError::InvalidBounds {
                index: 1,
                lower: 500.0,
                upper: 0.1
            })
        );
        assert!(matches!(
            Powell::new().minimize(&f, &[1.0, 1.0], &[(f64::NAN, 1.0), (0.0, 1.0)]),
            Err(RefineError::InvalidBounds { index: 0, .. })
        ));

        assert_eq!(RefineParams::default().validate(), Ok(()));
        let params = RefineParams::default().with_bounds([
            (-500.0, 500.0),
            (-500.0, 500.0),
            (500.0, 0.1),
        ]);
        assert!(matches!(
            params.validate(),
            Err(RefineError::InvalidBounds { index: 2, .. })
        ));
        // a single point is a valid box
        assert_eq!(check_bounds(&[(2.0, 2.0)]), Ok(()));
    }

    #[test]
    fn test_objective_floors() {
        let camera = CameraIntrinsic::default();
        let geometry = FrameGeometry::default();
        let prior = LinearSlopePrior::new(0.0, 0.0, 5.0);
        let params = RefineParams::default();
        let refiner = PositionRefiner::new(&camera, &geometry, &prior, &params);

        // projects to (17.02, 73.64), on the prior
        assert_relative_eq!(refiner.objective(&[3.0, 5.0, 20.0], [17, 74], false), 0.6);
        assert_eq!(refiner.objective(&[3.0, 5.0, -1.0], [17, 74], false), f64::INFINITY);
        assert!(refiner.objective(&[3.0, 5.0, 30.0], [17, 74], false) > 40.0);

        let tilted = LinearSlopePrior::new(1.0, 0.0, 0.0);
        let refiner = PositionRefiner::new(&camera, &geometry, &tilted, &params);
        let plain = refiner.objective(&[3.0, 3.0, 20.0], [17, 74], false);
        let flipped = refiner.objective(&[3.0, 3.0, 20.0], [17, 74], true);
        // the prior sees x = 3 unflipped and x = -3 flipped
        assert!(flipped - plain > 30.0);
    }

    #[test]
    fn test_refine_pulls_towards_cell() -> Result<(), RefineError> {
        let camera = CameraIntrinsic::default();
        let geometry = FrameGeometry::default();
        let prior = LinearSlopePrior::new(0.0, 0.0, 5.0);
        let params = RefineParams::default();
        let refiner = PositionRefiner::new(&camera, &geometry, &prior, &params);

        let start = Position::new(3.0, 5.0, 30.0);
        let refined = refiner.refine(&Powell::new(), [17, 74], &start, false)?;
        let before = refiner.objective(&start.to_array(), [17, 74], false);
        let after = refiner.objective(&refined.to_array(), [17, 74], false);
        assert!(before > 40.0);
        assert!(after < 0.65, "objective after refinement: {after}");
        Ok(())
    }

    #[test]
    fn test_refine_keeps_optimal_start() -> Result<(), RefineError> {
        let camera = CameraIntrinsic::default();
        let geometry = FrameGeometry::default();
        let prior = LinearSlopePrior::new(0.0, 0.0, 5.0);
        let params = RefineParams::default();
        let refiner = PositionRefiner::new(&camera, &geometry, &prior, &params);

        let start = Position::new(3.0, 5.0, 20.0);
        let refined = refiner.refine(&Powell::new(), [17, 74], &start, false)?;
        assert_eq!(refined, start);
        Ok(())
    }
}
