//! Doppler model
use crate::{
    constants::{MJD_JD_OFFSET, SPEED_OF_LIGHT_KM_S},
    error::Error,
    geometry::{equatorial_to_horizontal, observer_state},
    observation::Observation,
    propagator::Propagator,
    site::Site,
    utils::modulo,
};

/// Satellite as seen from a ground [Site]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineOfSight {
    /// Range rate (km.s⁻¹), positive when receding
    pub velocity_km_s: f64,
    /// Azimuth (degrees, from North through East)
    pub azimuth_deg: f64,
    /// Elevation above the horizon (degrees)
    pub elevation_deg: f64,
    /// Range (km)
    pub range_km: f64,
}

impl LineOfSight {
    /// Doppler factor of a single (one way) link
    pub fn doppler_factor(&self) -> f64 {
        1.0 - self.velocity_km_s / SPEED_OF_LIGHT_KM_S
    }

    pub fn is_visible(&self) -> bool {
        self.elevation_deg > 0.0
    }
}

/// Evaluates the satellite [LineOfSight] from [Site] at `mjd`,
/// `state` being the initialized [Propagator] state.
pub fn line_of_sight<P: Propagator>(
    propagator: &P,
    state: &P::State,
    mjd: f64,
    site: &Site,
) -> Result<LineOfSight, Error> {
    let (obs_pos, obs_vel) = observer_state(mjd, site);
    let (sat_pos, sat_vel) = propagator.evaluate(state, mjd + MJD_JD_OFFSET)?;

    let dr = sat_pos - obs_pos;
    let dv = sat_vel - obs_vel;
    let range_km = dr.norm();

    let right_ascension_deg = modulo(dr.y.atan2(dr.x).to_degrees(), 360.0);
    let declination_deg = (dr.z / range_km).asin().to_degrees();

    let (azimuth_deg, elevation_deg) =
        equatorial_to_horizontal(mjd, site, right_ascension_deg, declination_deg);

    Ok(LineOfSight {
        velocity_km_s: dv.dot(&dr) / range_km,
        azimuth_deg,
        elevation_deg,
        range_km,
    })
}

/// Doppler factor applying to this [Observation]: one factor per link,
/// so a relayed (or bistatic) measurement combines both legs.
pub fn doppler_factor<P: Propagator>(
    propagator: &P,
    state: &P::State,
    point: &Observation,
) -> Result<f64, Error> {
    let factor = line_of_sight(propagator, state, point.mjd, &point.site)?.doppler_factor();

    match &point.remote {
        Some(remote) => {
            let remote = line_of_sight(propagator, state, point.mjd, remote)?;
            Ok(factor * remote.doppler_factor())
        },
        None => Ok(factor),
    }
}

/// Samples used when searching for the closest approach
const CLOSEST_APPROACH_SAMPLES: usize = 1024;

/// Searches for the time of closest approach (MJD) as seen from [Site]:
/// the instant the range rate changes sign while the satellite is above
/// the horizon, strictly within `mjd_min` and `mjd_max`.
/// The window is padded by 10% on each side and sampled uniformly.
/// When several approaches exist, the latest one is returned.
pub fn closest_approach<P: Propagator>(
    propagator: &P,
    state: &P::State,
    site: &Site,
    mjd_min: f64,
    mjd_max: f64,
) -> Result<Option<f64>, Error> {
    let span = mjd_max - mjd_min;
    let start = mjd_min - 0.1 * span;
    let step = 1.2 * span / (CLOSEST_APPROACH_SAMPLES - 1) as f64;

    let mut previous: Option<f64> = None;
    let mut tca = None;

    for i in 0..CLOSEST_APPROACH_SAMPLES {
        let mjd = start + i as f64 * step;
        let los = line_of_sight(propagator, state, mjd, site)?;

        if let Some(velocity) = previous {
            if velocity * los.velocity_km_s < 0.0
                && los.is_visible()
                && mjd > mjd_min
                && mjd < mjd_max
            {
                tca = Some(mjd);
            }
        }

        previous = Some(los.velocity_km_s);
    }

    Ok(tca)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::orbit::Orbit;
    use nalgebra::Vector3;

    /// Satellite frozen at a fixed inertial state
    struct Frozen {
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    }

    impl Propagator for Frozen {
        type State = ();

        fn initialize(&self, _: &Orbit) -> Result<(), Error> {
            Ok(())
        }

        fn evaluate(&self, _: &(), _: f64) -> Result<(Vector3<f64>, Vector3<f64>), Error> {
            Ok((self.position, self.velocity))
        }
    }

    /// Satellite at zenith of `site`, 1000 km up, receding at `rate_km_s`
    fn zenith(site: &Site, mjd: f64, rate_km_s: f64) -> Frozen {
        let (pos, vel) = observer_state(mjd, site);
        let up = pos.normalize();
        Frozen {
            position: pos + up * 1000.0,
            velocity: vel + up * rate_km_s,
        }
    }

    #[test]
    fn receding_at_zenith() {
        let site = Site::new(1, 0.0, 0.0, 0.0, "equator");
        let mjd = 59000.25;
        let propagator = zenith(&site, mjd, 1.0);

        let los = line_of_sight(&propagator, &(), mjd, &site).unwrap();
        assert!((los.velocity_km_s - 1.0).abs() < 1.0E-9);
        assert!((los.range_km - 1000.0).abs() < 1.0E-6);
        assert!((los.elevation_deg - 90.0).abs() < 1.0E-5);
        assert!(los.is_visible());
        assert!((los.doppler_factor() - (1.0 - 1.0 / SPEED_OF_LIGHT_KM_S)).abs() < 1.0E-15);
    }

    #[test]
    fn relayed_factor() {
        let site = Site::new(1, 0.0, 0.0, 0.0, "equator");
        let mjd = 59000.25;
        let propagator = zenith(&site, mjd, -2.0);

        let single = Observation::new(mjd, 145000.0, 1.0, site.clone());
        let factor = doppler_factor(&propagator, &(), &single).unwrap();
        let expected = 1.0 + 2.0 / SPEED_OF_LIGHT_KM_S;
        assert!((factor - expected).abs() < 1.0E-15);

        let relayed = single.with_remote(site.clone());
        let factor = doppler_factor(&propagator, &(), &relayed).unwrap();
        assert!((factor - expected * expected).abs() < 1.0E-15);
    }

    #[test]
    fn below_horizon() {
        let site = Site::new(1, 0.0, 0.0, 0.0, "equator");
        let mjd = 59000.25;
        let (pos, _) = observer_state(mjd, &site);
        let propagator = Frozen {
            position: -pos * 2.0,
            velocity: Vector3::zeros(),
        };
        let los = line_of_sight(&propagator, &(), mjd, &site).unwrap();
        assert!(!los.is_visible());
        assert!((los.elevation_deg + 90.0).abs() < 1.0E-5);
    }
}
