use nannou::math::*;

pub mod polygon;
pub use polygon::*;

pub mod timed;
pub use timed::*;

pub mod voronoi;
pub use voronoi::*;

/// Returns the min and max values of an f32 slice.
pub fn minmax(arr: &[f32]) -> Option<(f32, f32)> {
    if arr.is_empty() {
        return None;
    }

    let mut min = arr[0];
    let mut max = arr[0];

    for e in arr.iter() {
        min = e.min(min);
        max = e.max(max);
    }

    Some((min, max))
}

/// Normalize a slice of f32 into the range \[0.0, 1.0\] using the min and max elements. A
/// slice whose elements are all equal maps to 0.0.
pub fn normalize(arr: &mut [f32]) {
    if let Some((min, max)) = minmax(arr) {
        if min == max {
            arr.fill(0.0);
            return;
        }

        for e in arr.iter_mut() {
            *e = map_range(*e, min, max, 0.0, 1.0);
        }
    }
}

pub fn map_clamp(val: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    map_range(val, in_min, in_max, out_min, out_max).clamp(out_min, out_max)
}

/// Find the mean of [values] for a subset of [indices].
pub fn indexed_mean(values: &[f32], indices: &[usize]) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }

    let mut sum = 0.0;

    for i in indices.iter() {
        sum += values[*i];
    }

    sum / indices.len() as f32
}
