use super::math::wrap_angle;

pub fn parse_angle(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some(wrap_angle(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn rejects_non_finite_angles() {
        assert_eq!(parse_angle(f64::NAN), None);
        assert_eq!(parse_angle(f64::INFINITY), None);
    }

    #[test]
    fn wraps_into_half_open_range() {
        assert!((parse_angle(3.0 * PI).expect("finite") - PI).abs() < 1e-9);
        assert!((parse_angle(-0.5).expect("finite") + 0.5).abs() < 1e-12);
    }
}
