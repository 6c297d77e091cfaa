//! Road path simplification.
//!
//! Reduces raw freehand input to a manageable set of control points before
//! submission: distance-based thinning first, then recursive max-deviation
//! (Ramer-Douglas-Peucker) reduction, escalating the tolerance while the
//! result still exceeds the point cap. Pure and deterministic.

use crate::params::ControlPoint;

/// Options for [`simplify_drawn_path`].
#[derive(Debug, Clone, Copy)]
pub struct SimplifyOptions {
    /// Points closer than this to the last retained point are dropped.
    pub min_distance: f64,
    /// RDP tolerance: points within this perpendicular distance of the
    /// line between retained endpoints are dropped.
    pub epsilon: f64,
    /// Upper bound on the returned point count; epsilon escalates until met.
    pub max_points: usize,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            min_distance: 5.0,
            epsilon: 3.0,
            max_points: 20,
        }
    }
}

/// Perpendicular distance from `point` to the line through `start`/`end`.
/// Degenerates to point distance when the segment has zero length.
fn perpendicular_distance(point: &ControlPoint, start: &ControlPoint, end: &ControlPoint) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_squared = dx * dx + dy * dy;

    if length_squared == 0.0 {
        return point.distance_to(start);
    }

    let numerator = (dy * point.x - dx * point.y + end.x * start.y - end.y * start.x).abs();
    numerator / length_squared.sqrt()
}

/// Recursive Ramer-Douglas-Peucker reduction with tolerance `epsilon`.
pub fn simplify_path(points: &[ControlPoint], epsilon: f64) -> Vec<ControlPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_distance = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let distance = perpendicular_distance(point, first, last);
        if distance > max_distance {
            max_distance = distance;
            max_index = i;
        }
    }

    if max_distance > epsilon {
        let mut left = simplify_path(&points[..=max_index], epsilon);
        let right = simplify_path(&points[max_index..], epsilon);
        // The split point appears in both halves; keep it once.
        left.pop();
        left.extend(right);
        left
    } else {
        vec![*first, *last]
    }
}

/// Distance-based thinning: keeps points at least `min_distance` apart.
/// The final point is always retained.
pub fn thin_by_distance(points: &[ControlPoint], min_distance: f64) -> Vec<ControlPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut result = vec![*first];
    let mut last_kept = *first;

    for point in &points[1..] {
        if last_kept.distance_to(point) >= min_distance {
            result.push(*point);
            last_kept = *point;
        }
    }

    let last_input = points[points.len() - 1];
    let last_result = result[result.len() - 1];
    if last_result != last_input {
        result.push(last_input);
    }

    result
}

/// Full reduction of a freehand path: thin, then RDP, then escalate the
/// tolerance (x1.5, capped at 50) while the result exceeds `max_points`.
pub fn simplify_drawn_path(points: &[ControlPoint], options: SimplifyOptions) -> Vec<ControlPoint> {
    let thinned = thin_by_distance(points, options.min_distance);
    let mut simplified = simplify_path(&thinned, options.epsilon);

    let mut epsilon = options.epsilon;
    while simplified.len() > options.max_points && epsilon < 50.0 {
        epsilon *= 1.5;
        simplified = simplify_path(points, epsilon);
    }

    simplified
}
