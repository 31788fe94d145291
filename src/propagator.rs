//! Orbit propagation
use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::{
    constants::{MINUTES_PER_DAY, MJD_JD_OFFSET},
    error::Error,
    orbit::Orbit,
};

/// J2000 expressed as Julian date
const J2000_JD: f64 = 2451545.0;

/// Any orbit model should implement [Propagator].
/// A [Propagator] is initialized once per element set, then evaluated at
/// any number of instants. States are expressed in an inertial
/// equator-aligned frame.
pub trait Propagator {
    /// Initialized state, ready to be evaluated
    type State;

    /// Prepare the element set. Numerically degenerate elements
    /// (eccentricity >= 1, vanishing mean motion) are rejected.
    fn initialize(&self, orbit: &Orbit) -> Result<Self::State, Error>;

    /// Returns position (km) and velocity (km.s⁻¹) at Julian date `jd`.
    fn evaluate(
        &self,
        state: &Self::State,
        jd: f64,
    ) -> Result<(Vector3<f64>, Vector3<f64>), Error>;
}

/// SGP4/SDP4 [Propagator] (WGS-72 constants, Kozai mean motion),
/// producing TEME states.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sgp4;

/// Initialized [Sgp4] state
pub struct Sgp4State {
    constants: sgp4::Constants,
    epoch_jd: f64,
}

impl std::fmt::Debug for Sgp4State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Sgp4State(epoch_jd={})", self.epoch_jd)
    }
}

impl Propagator for Sgp4 {
    type State = Sgp4State;

    fn initialize(&self, orbit: &Orbit) -> Result<Sgp4State, Error> {
        if !(0.0..1.0).contains(&orbit.eccentricity) {
            return Err(Error::Propagator(format!(
                "eccentricity {} outside [0, 1)",
                orbit.eccentricity
            )));
        }

        if orbit.mean_motion.is_nan() || orbit.mean_motion <= 0.0 {
            return Err(Error::Propagator(format!(
                "invalid mean motion {}",
                orbit.mean_motion
            )));
        }

        let elements = sgp4::Orbit::from_kozai_elements(
            &sgp4::WGS72,
            orbit.inclination_deg.to_radians(),
            orbit.right_ascension_deg.to_radians(),
            orbit.eccentricity,
            orbit.argument_of_perigee_deg.to_radians(),
            orbit.mean_anomaly_deg.to_radians(),
            // rev/day to rad/min
            orbit.mean_motion * PI / 720.0,
        )
        .map_err(|e| Error::Propagator(e.to_string()))?;

        let epoch_jd = orbit.epoch_mjd() + MJD_JD_OFFSET;

        let constants = sgp4::Constants::new(
            sgp4::WGS72,
            sgp4::afspc_epoch_to_sidereal_time,
            (epoch_jd - J2000_JD) / 365.25,
            orbit.bstar,
            elements,
        )
        .map_err(|e| Error::Propagator(e.to_string()))?;

        Ok(Sgp4State {
            constants,
            epoch_jd,
        })
    }

    fn evaluate(
        &self,
        state: &Sgp4State,
        jd: f64,
    ) -> Result<(Vector3<f64>, Vector3<f64>), Error> {
        let minutes = (jd - state.epoch_jd) * MINUTES_PER_DAY;

        let prediction = state
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| Error::Propagator(e.to_string()))?;

        Ok((
            Vector3::from(prediction.position),
            Vector3::from(prediction.velocity),
        ))
    }
}
