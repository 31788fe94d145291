//! Earth orientation and observer geometry
use nalgebra::Vector3;

use crate::{
    constants::{
        DAYS_PER_JULIAN_CENTURY, EARTH_EQUATORIAL_RADIUS_KM, EARTH_FLATTENING, J2000_MJD,
        SECONDS_PER_DAY,
    },
    site::Site,
    utils::modulo,
};

/// Greenwich mean sidereal time and its rate
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SiderealTime {
    /// Sidereal angle (degrees, [0, 360))
    pub angle_deg: f64,
    /// Time derivative (degrees per day)
    pub rate_deg_day: f64,
}

/// Greenwich mean sidereal time at `mjd`.
pub fn sidereal_time(mjd: f64) -> SiderealTime {
    let dt = mjd - J2000_MJD;
    let t = dt / DAYS_PER_JULIAN_CENTURY;

    let angle_deg = modulo(
        280.46061837 + 360.98564736629 * dt + t * t * (0.000387933 - t / 38710000.0),
        360.0,
    );

    let rate_deg_day = 360.98564736629 + t * (0.000387933 - t / 38710000.0);

    SiderealTime {
        angle_deg,
        rate_deg_day,
    }
}

/// Inertial position (km) and velocity (km.s⁻¹) of a ground [Site] at `mjd`,
/// on an oblate Earth rotated by the mean sidereal angle.
/// No polar motion, precession or nutation.
pub fn observer_state(mjd: f64, site: &Site) -> (Vector3<f64>, Vector3<f64>) {
    let lat_rad = site.latitude_deg.to_radians();
    let (sin_lat, cos_lat) = lat_rad.sin_cos();

    let ff = (1.0 - EARTH_FLATTENING * (2.0 - EARTH_FLATTENING) * sin_lat * sin_lat).sqrt();
    let gc = 1.0 / ff + site.altitude_km / EARTH_EQUATORIAL_RADIUS_KM;
    let gs = (1.0 - EARTH_FLATTENING).powi(2) / ff + site.altitude_km / EARTH_EQUATORIAL_RADIUS_KM;

    let sidereal = sidereal_time(mjd);
    let theta = (sidereal.angle_deg + site.longitude_deg).to_radians();
    let dtheta = sidereal.rate_deg_day.to_radians() / SECONDS_PER_DAY;
    let (sin_theta, cos_theta) = theta.sin_cos();

    let rho = gc * cos_lat * EARTH_EQUATORIAL_RADIUS_KM;

    let position = Vector3::new(
        rho * cos_theta,
        rho * sin_theta,
        gs * sin_lat * EARTH_EQUATORIAL_RADIUS_KM,
    );

    let velocity = Vector3::new(-rho * sin_theta * dtheta, rho * cos_theta * dtheta, 0.0);

    (position, velocity)
}

/// Converts equatorial coordinates (degrees) to (azimuth, elevation) in degrees,
/// as seen from [Site] at `mjd`. Azimuth is measured from North, through East.
pub fn equatorial_to_horizontal(
    mjd: f64,
    site: &Site,
    right_ascension_deg: f64,
    declination_deg: f64,
) -> (f64, f64) {
    let h = (sidereal_time(mjd).angle_deg + site.longitude_deg - right_ascension_deg).to_radians();
    let lat = site.latitude_deg.to_radians();
    let dec = declination_deg.to_radians();

    let azimuth = modulo(
        h.sin()
            .atan2(h.cos() * lat.sin() - dec.tan() * lat.cos())
            .to_degrees()
            + 180.0,
        360.0,
    );

    let elevation = (lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos())
        .clamp(-1.0, 1.0)
        .asin()
        .to_degrees();

    (azimuth, elevation)
}

#[cfg(test)]
mod test {
    use super::*;

    fn site(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Site {
        Site::new(1, latitude_deg, longitude_deg, altitude_km, "test")
    }

    #[test]
    fn sidereal_at_j2000() {
        let gmst = sidereal_time(J2000_MJD);
        assert!((gmst.angle_deg - 280.46061837).abs() < 1.0E-9);
        assert!((gmst.rate_deg_day - 360.98564736629).abs() < 1.0E-9);
    }

    #[test]
    fn sidereal_daily_advance() {
        // one solar day later, the sidereal angle gained ~0.9856°
        let t0 = sidereal_time(59000.0);
        let t1 = sidereal_time(59001.0);
        let advance = modulo(t1.angle_deg - t0.angle_deg, 360.0);
        assert!((advance - 0.98564736629).abs() < 1.0E-6, "{}", advance);
    }

    #[test]
    fn observer_radius() {
        let equator = site(0.0, 0.0, 0.0);
        let (pos, vel) = observer_state(59000.0, &equator);
        assert!((pos.norm() - EARTH_EQUATORIAL_RADIUS_KM).abs() < 1.0E-6);
        assert!(pos.z.abs() < 1.0E-9);
        // equatorial ground speed ~0.465 km/s, perpendicular to the radius
        assert!((vel.norm() - 0.4651).abs() < 1.0E-3, "{}", vel.norm());
        assert!(pos.dot(&vel).abs() < 1.0E-6);

        let pole = site(90.0, 0.0, 0.0);
        let (pos, vel) = observer_state(59000.0, &pole);
        let polar_radius = EARTH_EQUATORIAL_RADIUS_KM * (1.0 - EARTH_FLATTENING);
        assert!((pos.z - polar_radius).abs() < 1.0E-6);
        assert!(vel.norm() < 1.0E-9);
    }

    #[test]
    fn observer_velocity_is_derivative() {
        let s = site(52.0, 5.0, 0.05);
        let mjd = 59000.3;
        let dt_s = 5.0;
        let (p0, v0) = observer_state(mjd - dt_s / SECONDS_PER_DAY, &s);
        let (p1, _) = observer_state(mjd + dt_s / SECONDS_PER_DAY, &s);
        let (_, v) = observer_state(mjd, &s);
        let numerical = (p1 - p0) / (2.0 * dt_s);
        assert!((numerical - v).norm() < 1.0E-6, "{} {}", numerical, v);
        assert!((v0 - v).norm() < 1.0E-3);
    }

    #[test]
    fn zenith_and_horizon() {
        let s = site(52.0, 5.0, 0.0);
        let mjd = 59000.0;
        let local_sidereal = sidereal_time(mjd).angle_deg + s.longitude_deg;

        // a source on the local meridian at declination = latitude is at zenith
        let (_, elevation) = equatorial_to_horizontal(mjd, &s, local_sidereal, 52.0);
        assert!((elevation - 90.0).abs() < 1.0E-6);

        // due south on the meridian, below the zenith
        let (azimuth, elevation) = equatorial_to_horizontal(mjd, &s, local_sidereal, 0.0);
        assert!((elevation - 38.0).abs() < 1.0E-6);
        assert!((azimuth - 180.0).abs() < 1.0E-6, "{}", azimuth);

        // celestial pole sits at the latitude, due north
        let (azimuth, elevation) = equatorial_to_horizontal(mjd, &s, 123.0, 90.0);
        assert!((elevation - 52.0).abs() < 1.0E-6);
        assert!(azimuth < 1.0E-6 || (azimuth - 360.0).abs() < 1.0E-6, "{}", azimuth);
    }
}
