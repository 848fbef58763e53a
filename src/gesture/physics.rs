//! Drag physics helpers.
//!
//! Pure functions, shared by the dismiss gesture and anything else that
//! needs overscroll resistance or release projection.

/// Damped distance for `distance` pixels of overscroll.
///
/// Grows with `distance` but never reaches `dimension`; the smaller
/// `constant`, the stiffer the resistance.
pub fn rubber_band(distance: f64, dimension: f64, constant: f64) -> f64 {
    if dimension <= 0.0 {
        return 0.0;
    }
    let magnitude = distance.abs();
    let damped = (magnitude * dimension * constant) / (dimension + constant * magnitude);
    damped.copysign(distance)
}

/// `value` when inside `[min, max]`, otherwise the bound plus a rubber-banded
/// overscroll.
pub fn rubber_band_if_out_of_bounds(
    value: f64,
    min: f64,
    max: f64,
    dimension: f64,
    constant: f64,
) -> f64 {
    if value < min {
        min - rubber_band(min - value, dimension, constant)
    } else if value > max {
        max + rubber_band(value - max, dimension, constant)
    } else {
        value
    }
}

/// Distance travelled after release by something moving at `velocity`
/// (px/ms) that loses `1 - deceleration_rate` of its speed every millisecond.
///
/// Closed form of the geometric series `v·r + v·r² + …`.
pub fn project(velocity: f64, deceleration_rate: f64) -> f64 {
    velocity * deceleration_rate / (1.0 - deceleration_rate)
}

/// The entry of `values` closest to `target`. Ties go to the earlier entry.
pub fn find_nearest_number_in_array(target: f64, values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |nearest, value| match nearest {
        Some(best) if (best - target).abs() <= (value - target).abs() => Some(best),
        _ => Some(value),
    })
}

/// Linearly map `value` from `input` onto `output`. Not clamped.
pub fn range_map(value: f64, input: (f64, f64), output: (f64, f64)) -> f64 {
    let (in_min, in_max) = input;
    let (out_min, out_max) = output;
    if in_max == in_min {
        return out_min;
    }
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

/// [`range_map`] clamped to the output range.
pub fn range_map_clamped(value: f64, input: (f64, f64), output: (f64, f64)) -> f64 {
    let mapped = range_map(value, input, output);
    let (low, high) = if output.0 <= output.1 {
        output
    } else {
        (output.1, output.0)
    };
    mapped.clamp(low, high)
}
