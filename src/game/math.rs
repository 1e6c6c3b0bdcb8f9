use super::types::Point;
use std::f64::consts::PI;

pub fn distance(a: Point, b: Point) -> f64 {
  distance_sq(a, b).sqrt()
}

pub fn distance_sq(a: Point, b: Point) -> f64 {
  let dx = a.x - b.x;
  let dy = a.y - b.y;
  dx * dx + dy * dy
}

pub fn length(point: Point) -> f64 {
  (point.x * point.x + point.y * point.y).sqrt()
}

pub fn lerp(a: Point, b: Point, t: f64) -> Point {
  Point {
    x: a.x + (b.x - a.x) * t,
    y: a.y + (b.y - a.y) * t,
  }
}

pub fn from_angle(angle: f64, magnitude: f64) -> Point {
  Point {
    x: angle.cos() * magnitude,
    y: angle.sin() * magnitude,
  }
}

pub fn angle_between(from: Point, to: Point) -> f64 {
  (to.y - from.y).atan2(to.x - from.x)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f64) -> f64 {
  let mut wrapped = angle % (PI * 2.0);
  if wrapped > PI {
    wrapped -= PI * 2.0;
  } else if wrapped <= -PI {
    wrapped += PI * 2.0;
  }
  wrapped
}

/// Moves `current` toward `target` by at most `max_delta` radians along the shorter arc.
pub fn rotate_toward(current: f64, target: f64, max_delta: f64) -> f64 {
  let delta = wrap_angle(target - current);
  let budget = max_delta.max(0.0);
  wrap_angle(current + clamp(delta, -budget, budget))
}

/// Unit vector from `from` to `to`, or `fallback` when the points coincide.
pub fn direction(from: Point, to: Point, fallback: f64) -> Point {
  let dx = to.x - from.x;
  let dy = to.y - from.y;
  let len = (dx * dx + dy * dy).sqrt();
  if !len.is_finite() || len < 1e-9 {
    return from_angle(fallback, 1.0);
  }
  Point {
    x: dx / len,
    y: dy / len,
  }
}

pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
  let abx = b.x - a.x;
  let aby = b.y - a.y;
  let len_sq = abx * abx + aby * aby;
  if len_sq < 1e-12 {
    return distance(point, a);
  }
  let t = clamp(((point.x - a.x) * abx + (point.y - a.y) * aby) / len_sq, 0.0, 1.0);
  distance(point, lerp(a, b, t))
}

/// Clamps `point` into a disc of `radius` around the origin.
pub fn clamp_to_disc(point: Point, radius: f64) -> Point {
  let len = length(point);
  if len <= radius || len < 1e-9 {
    return point;
  }
  Point {
    x: point.x / len * radius,
    y: point.y / len * radius,
  }
}

pub fn is_finite(point: Point) -> bool {
  point.x.is_finite() && point.y.is_finite()
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
  value.min(max).max(min)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rotate_toward_takes_shorter_arc_across_pi() {
    let current = PI - 0.1;
    let target = -PI + 0.1;
    let next = rotate_toward(current, target, 0.05);
    assert!((wrap_angle(next - current) - 0.05).abs() < 1e-9);
  }

  #[test]
  fn rotate_toward_snaps_inside_budget() {
    let next = rotate_toward(0.2, 0.25, 0.1);
    assert!((next - 0.25).abs() < 1e-12);
  }

  #[test]
  fn clamp_to_disc_keeps_direction() {
    let clamped = clamp_to_disc(Point { x: 300.0, y: 400.0 }, 50.0);
    assert!((clamped.x - 30.0).abs() < 1e-9);
    assert!((clamped.y - 40.0).abs() < 1e-9);
  }

  #[test]
  fn distance_to_segment_projects_onto_interior() {
    let d = distance_to_segment(
      Point { x: 5.0, y: 3.0 },
      Point { x: 0.0, y: 0.0 },
      Point { x: 10.0, y: 0.0 },
    );
    assert!((d - 3.0).abs() < 1e-12);
  }
}
