pub mod broadcast;
pub mod special;

pub use broadcast::{BroadcastError, Sampled, broadcast_len};

/// Behaviour of [`interpolate_linear`] for queries outside the sampled range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutOfRange {
    /// Hold the first/last sample value.
    Clamp,
    /// Return a fixed value.
    Fill(f64),
}

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

pub fn deterministic_argsort(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_unstable_by(|lhs, rhs| {
        values[*lhs]
            .total_cmp(&values[*rhs])
            .then_with(|| lhs.cmp(rhs))
    });
    indices
}

/// Sorted distinct values together with the index of each value's first occurrence.
pub fn unique_with_first_index(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut unique = Vec::with_capacity(values.len());
    let mut first_index = Vec::with_capacity(values.len());

    for index in deterministic_argsort(values) {
        let value = values[index];
        if unique.last() == Some(&value) {
            continue;
        }
        unique.push(value);
        first_index.push(index);
    }

    (unique, first_index)
}

pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 {
        return None;
    }

    let step = (end - start) / ((count - 1) as f64);
    let mut grid = Vec::with_capacity(count);
    for index in 0..count {
        grid.push(start + step * (index as f64));
    }

    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

/// `10^e` for `count` exponents evenly spaced over `[exponent_min, exponent_max]`.
pub fn log_grid(exponent_min: f64, exponent_max: f64, count: usize) -> Option<Vec<f64>> {
    let exponents = linear_grid(exponent_min, exponent_max, count)?;
    Some(exponents.into_iter().map(|exponent| 10f64.powf(exponent)).collect())
}

/// Inclusive grid over `[start, end]` whose spacing does not exceed `max_step`.
pub fn bounded_step_grid(start: f64, end: f64, max_step: f64) -> Option<Vec<f64>> {
    if !(max_step.is_finite() && max_step > 0.0) || !start.is_finite() || !end.is_finite() {
        return None;
    }
    if end <= start {
        return None;
    }

    let intervals = ((end - start) / max_step).ceil().max(1.0) as usize;
    linear_grid(start, end, intervals + 1)
}

/// One-dimensional linear interpolation on a non-decreasing grid.
///
/// Returns `None` when the grid has fewer than two points or the lengths differ.
/// A NaN query yields NaN under [`OutOfRange::Clamp`] and the fill value otherwise.
pub fn interpolate_linear(
    x: f64,
    x_grid: &[f64],
    y_grid: &[f64],
    out_of_range: OutOfRange,
) -> Option<f64> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    let last_index = x_grid.len() - 1;
    if x.is_nan() {
        return Some(match out_of_range {
            OutOfRange::Clamp => f64::NAN,
            OutOfRange::Fill(value) => value,
        });
    }
    if x < x_grid[0] {
        return Some(match out_of_range {
            OutOfRange::Clamp => y_grid[0],
            OutOfRange::Fill(value) => value,
        });
    }
    if x > x_grid[last_index] {
        return Some(match out_of_range {
            OutOfRange::Clamp => y_grid[last_index],
            OutOfRange::Fill(value) => value,
        });
    }
    if x == x_grid[last_index] {
        return Some(y_grid[last_index]);
    }

    let upper = x_grid.partition_point(|probe| *probe <= x);
    let lower = upper - 1;
    let x0 = x_grid[lower];
    let x1 = x_grid[upper];
    let fraction = (x - x0) / (x1 - x0);
    Some(y_grid[lower] + fraction * (y_grid[upper] - y_grid[lower]))
}

/// Composite trapezoidal rule of `y(x)`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> Option<f64> {
    if y.len() != x.len() {
        return None;
    }

    let mut sum = 0.0;
    let mut correction = 0.0;
    for (y_pair, x_pair) in y.windows(2).zip(x.windows(2)) {
        kahan_add(
            &mut sum,
            &mut correction,
            0.5 * (x_pair[1] - x_pair[0]) * (y_pair[0] + y_pair[1]),
        );
    }

    Some(sum)
}

pub fn relative_difference(lhs: f64, rhs: f64, relative_floor: f64) -> f64 {
    let scale = lhs.abs().max(rhs.abs()).max(relative_floor);
    (lhs - rhs).abs() / scale
}

pub fn within_tolerance(
    lhs: f64,
    rhs: f64,
    abs_tol: f64,
    rel_tol: f64,
    relative_floor: f64,
) -> bool {
    let abs_diff = (lhs - rhs).abs();
    abs_diff <= abs_tol || relative_difference(lhs, rhs, relative_floor) <= rel_tol
}
