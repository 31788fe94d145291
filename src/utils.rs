/// Returns x modulo y, folded into [0, y)
pub fn modulo(x: f64, y: f64) -> f64 {
    let x = x % y;
    if x < 0.0 {
        x + y
    } else {
        x
    }
}

/// Smallest signed difference between two angles, in degrees, within [-180, 180)
pub fn angle_difference_deg(a: f64, b: f64) -> f64 {
    modulo(a - b + 180.0, 360.0) - 180.0
}

#[cfg(test)]
mod test {
    use super::{angle_difference_deg, modulo};

    #[test]
    fn test_modulo() {
        assert_eq!(modulo(370.0, 360.0), 10.0);
        assert_eq!(modulo(-10.0, 360.0), 350.0);
        assert_eq!(modulo(0.0, 360.0), 0.0);
        assert_eq!(modulo(720.0, 360.0), 0.0);
    }

    #[test]
    fn test_angle_difference() {
        assert_eq!(angle_difference_deg(10.0, 350.0), 20.0);
        assert_eq!(angle_difference_deg(350.0, 10.0), -20.0);
        assert_eq!(angle_difference_deg(90.0, 90.0), 0.0);
    }
}
