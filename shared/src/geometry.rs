//! Pure collision geometry shared by wall collisions and projectile hits.

use crate::vec2::Vec2;

/// Tests whether the closed segment `[start, end]` passes within `radius`
/// of `center`.
///
/// The closest point on the segment is found by projecting the center onto
/// the segment's supporting line and clamping the parameter to `[0, 1]`, so
/// endpoints are handled the same as interior points. A degenerate segment
/// (`start == end`) degrades to a point-in-circle test without dividing by
/// zero.
pub fn segment_circle_intersects(start: Vec2, end: Vec2, center: Vec2, radius: f32) -> bool {
    let segment = end - start;
    let length_squared = segment.magnitude_squared();

    let t = if length_squared == 0.0 {
        0.0
    } else {
        ((center - start).dot(segment) / length_squared).clamp(0.0, 1.0)
    };

    let closest = start + segment * t;
    (center - closest).magnitude_squared() <= radius * radius
}
