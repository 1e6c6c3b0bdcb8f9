//! Recorded head path and arc-length resampling of body segments.
//!
//! The path is stored oldest-first. `start` marks the oldest point still
//! retained; the discarded prefix is compacted away once it grows large.

use super::constants::{TRAIL_COMPACT_THRESHOLD, TRAIL_MIN_RECORD_DISTANCE};
use super::math::{distance, distance_sq, from_angle, lerp};
use super::types::Point;

#[derive(Debug, Clone, Default)]
pub struct Trail {
    points: Vec<Point>,
    start: usize,
}

impl Trail {
    /// A straight path of `length` trailing behind `head`, opposite to `angle`.
    pub fn seeded(head: Point, angle: f64, length: f64) -> Self {
        let step = TRAIL_MIN_RECORD_DISTANCE * 2.0;
        let count = (length / step).ceil().max(1.0) as usize;
        let back = from_angle(angle, -1.0);
        let points = (0..=count)
            .rev()
            .map(|k| {
                let d = (k as f64 * step).min(length);
                Point {
                    x: head.x + back.x * d,
                    y: head.y + back.y * d,
                }
            })
            .collect();
        Self { points, start: 0 }
    }

    #[cfg(test)]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points, start: 0 }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.points.len() - self.start
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn newest(&self) -> Option<Point> {
        self.retained().last().copied()
    }

    pub fn oldest(&self) -> Option<Point> {
        self.retained().first().copied()
    }

    pub fn retained(&self) -> &[Point] {
        &self.points[self.start..]
    }

    /// Appends the head position if it moved far enough from the last recorded point.
    pub fn record(&mut self, head: Point) -> bool {
        if let Some(last) = self.newest() {
            let min = TRAIL_MIN_RECORD_DISTANCE;
            if distance_sq(last, head) < min * min {
                return false;
            }
        }
        self.points.push(head);
        true
    }

    /// Writes `count` body points into `out`: `out[0]` is `head`, and each following
    /// point lies exactly `spacing` further back along the path (head included as
    /// the leading vertex). Segments past the end of the path pin to its oldest point.
    pub fn resample(&self, head: Point, count: usize, spacing: f64, out: &mut Vec<Point>) {
        out.clear();
        if count == 0 {
            return;
        }
        out.push(head);

        let mut prev = head;
        let mut walked = 0.0;
        let mut next_target = spacing;
        for &point in self.retained().iter().rev() {
            if out.len() >= count {
                break;
            }
            let edge = distance(prev, point);
            if edge > 0.0 {
                while walked + edge >= next_target && out.len() < count {
                    let t = (next_target - walked) / edge;
                    out.push(lerp(prev, point, t));
                    next_target += spacing;
                }
            }
            walked += edge;
            prev = point;
        }

        let tail = self.oldest().unwrap_or(head);
        while out.len() < count {
            out.push(tail);
        }
    }

    /// Arc length from `head` back through the whole retained path.
    #[cfg(test)]
    pub fn arc_length(&self, head: Point) -> f64 {
        let mut prev = head;
        let mut total = 0.0;
        for &point in self.retained().iter().rev() {
            total += distance(prev, point);
            prev = point;
        }
        total
    }

    /// Drops the oldest points once the path behind `head` is longer than `needed`.
    pub fn retain_arc(&mut self, head: Point, needed: f64) {
        let mut prev = head;
        let mut walked = 0.0;
        let mut keep_from = None;
        for (offset, &point) in self.retained().iter().enumerate().rev() {
            walked += distance(prev, point);
            prev = point;
            if walked >= needed {
                keep_from = Some(self.start + offset);
                break;
            }
        }
        if let Some(index) = keep_from {
            self.start = index;
        }
        if self.start > TRAIL_COMPACT_THRESHOLD {
            self.points.drain(..self.start);
            self.start = 0;
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for point in &mut self.points[self.start..] {
            point.x += dx;
            point.y += dy;
        }
    }

    #[cfg(test)]
    pub(crate) fn discarded(&self) -> usize {
        self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_trail(length: f64, step: f64) -> Trail {
        let count = (length / step).round() as usize;
        Trail::from_points((0..=count).map(|k| Point { x: k as f64 * step, y: 0.0 }).collect())
    }

    #[test]
    fn straight_path_resamples_at_exact_spacing() {
        let spacing = 9.0;
        let segments = 20;
        let length = (segments - 1) as f64 * spacing + 13.0;
        let trail = straight_trail(length, 1.7);
        let head = Point { x: length, y: 0.0 };

        let mut body = Vec::new();
        trail.resample(head, segments, spacing, &mut body);

        assert_eq!(body.len(), segments);
        for pair in body.windows(2) {
            assert!((distance(pair[0], pair[1]) - spacing).abs() < 1e-9);
        }
        for point in &body {
            assert!(point.y.abs() < 1e-12);
        }
    }

    #[test]
    fn head_leads_even_when_not_recorded() {
        let trail = straight_trail(100.0, 2.5);
        let head = Point { x: 101.0, y: 0.0 };
        let mut body = Vec::new();
        trail.resample(head, 3, 9.0, &mut body);
        assert_eq!(body[0], head);
        assert!((body[1].x - 92.0).abs() < 1e-9);
        assert!((body[2].x - 83.0).abs() < 1e-9);
    }

    #[test]
    fn short_trail_pins_tail_to_oldest_point() {
        let trail = straight_trail(20.0, 5.0);
        let head = Point { x: 20.0, y: 0.0 };
        let mut body = Vec::new();
        trail.resample(head, 6, 9.0, &mut body);
        assert_eq!(body.len(), 6);
        assert!((body[2].x - 2.0).abs() < 1e-9);
        for point in &body[3..] {
            assert_eq!(*point, Point { x: 0.0, y: 0.0 });
        }
    }

    #[test]
    fn resample_follows_corner_without_cutting() {
        let mut points: Vec<Point> = (0..=40).map(|k| Point { x: k as f64, y: 0.0 }).collect();
        points.extend((1..=40).map(|k| Point { x: 40.0, y: k as f64 }));
        let trail = Trail::from_points(points);
        let head = Point { x: 40.0, y: 40.0 };
        let mut body = Vec::new();
        trail.resample(head, 8, 10.0, &mut body);
        // Fifth segment sits exactly on the corner; later ones run along the x axis.
        assert!((body[4].x - 40.0).abs() < 1e-9 && body[4].y.abs() < 1e-9);
        assert!((body[5].x - 30.0).abs() < 1e-9 && body[5].y.abs() < 1e-9);
    }

    #[test]
    fn record_skips_points_closer_than_minimum() {
        let mut trail = Trail::from_points(vec![Point { x: 0.0, y: 0.0 }]);
        assert!(!trail.record(Point { x: 1.0, y: 0.0 }));
        assert!(trail.record(Point { x: TRAIL_MIN_RECORD_DISTANCE, y: 0.0 }));
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn retain_bounds_arc_length_and_compacts() {
        let mut trail = straight_trail(10_000.0, 2.5);
        let head = Point { x: 10_000.0, y: 0.0 };
        trail.retain_arc(head, 200.0);
        let kept = trail.arc_length(head);
        assert!(kept >= 200.0 && kept < 200.0 + 2.5 + 1e-9);
        // Discarded prefix exceeded the threshold, so it was drained.
        assert_eq!(trail.discarded(), 0);
        assert!(trail.len() < 100);
    }

    #[test]
    fn seeded_trail_spans_requested_length() {
        let head = Point { x: 50.0, y: 50.0 };
        let trail = Trail::seeded(head, 0.0, 90.0);
        assert!((trail.arc_length(head) - 90.0).abs() < 1e-9);
        assert_eq!(trail.newest(), Some(head));
    }
}
