use log::debug;
use nalgebra::SVector;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    geometry::sidereal_time,
    site::Site,
    time::{day_of_year_from_mjd, format_timestamp, mjd_from_day_of_year},
    utils::modulo,
};

/// Lowest mean motion (rev/day) presented to the propagator
pub(crate) const MIN_MEAN_MOTION: f64 = 0.05;

/// Eccentricity substituted for unbound (e >= 1) trial values
pub(crate) const MAX_ECCENTRICITY: f64 = 0.999;

/// Catalog number of template element sets
pub const TEMPLATE_CATALOG_NUMBER: u32 = 99999;

/// International designator of template element sets
pub const TEMPLATE_DESIGNATOR: &str = "13900A";

/// Number of fitted [Orbit] parameters
pub const NUM_PARAMETERS: usize = 7;

/// Fitted parameter vector, indexed by [Parameter]:
/// inclination (°), right ascension of the ascending node (°), eccentricity,
/// argument of perigee (°), mean anomaly (°), mean motion (rev/day), drag term.
pub type Parameters = SVector<f64, NUM_PARAMETERS>;

/// Orbital element that can be fitted
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parameter {
    Inclination,
    RightAscension,
    Eccentricity,
    ArgumentOfPerigee,
    MeanAnomaly,
    MeanMotion,
    Drag,
}

impl Parameter {
    /// All [Parameter]s, in [Parameters] order
    pub const ALL: [Parameter; NUM_PARAMETERS] = [
        Self::Inclination,
        Self::RightAscension,
        Self::Eccentricity,
        Self::ArgumentOfPerigee,
        Self::MeanAnomaly,
        Self::MeanMotion,
        Self::Drag,
    ];

    /// Index in [Parameters]
    pub const fn index(&self) -> usize {
        match self {
            Self::Inclination => 0,
            Self::RightAscension => 1,
            Self::Eccentricity => 2,
            Self::ArgumentOfPerigee => 3,
            Self::MeanAnomaly => 4,
            Self::MeanMotion => 5,
            Self::Drag => 6,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Inclination => write!(f, "inclination"),
            Self::RightAscension => write!(f, "ascending node"),
            Self::Eccentricity => write!(f, "eccentricity"),
            Self::ArgumentOfPerigee => write!(f, "argument of perigee"),
            Self::MeanAnomaly => write!(f, "mean anomaly"),
            Self::MeanMotion => write!(f, "mean motion"),
            Self::Drag => write!(f, "drag"),
        }
    }
}

impl std::str::FromStr for Parameter {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inclination" | "incl" | "i" => Ok(Self::Inclination),
            "ascending node" | "raan" | "node" => Ok(Self::RightAscension),
            "eccentricity" | "ecc" | "e" => Ok(Self::Eccentricity),
            "argument of perigee" | "argp" | "w" => Ok(Self::ArgumentOfPerigee),
            "mean anomaly" | "ma" | "m" => Ok(Self::MeanAnomaly),
            "mean motion" | "n" => Ok(Self::MeanMotion),
            "drag" | "bstar" => Ok(Self::Drag),
            _ => Err(Error::Parser(crate::error::ParsingError::InvalidField {
                field: "parameter",
                content: s.to_string(),
            })),
        }
    }
}

/// Template element sets, used as a starting point when no catalog entry exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrbitTemplate {
    /// Polar low Earth orbit passing over the observer
    Leo,
    /// Geostationary transfer orbit
    Gto,
    /// Geosynchronous orbit
    Gso,
    /// Highly elliptical (Molniya-like) orbit
    Heo,
}

/// Mean orbital elements, the working element set of the fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orbit {
    /// Catalog (NORAD) number
    pub catalog_number: u32,
    /// International designator (YYNNNP..), up to 8 characters
    pub designator: String,
    /// Possible name
    pub name: Option<String>,
    /// Epoch year (4 digits)
    pub epoch_year: i32,
    /// Epoch fractional day of year, January 1st 00:00 being 1.0
    pub epoch_day: f64,
    /// Inclination (degrees)
    pub inclination_deg: f64,
    /// Right ascension of the ascending node (degrees)
    pub right_ascension_deg: f64,
    pub eccentricity: f64,
    /// Argument of perigee (degrees)
    pub argument_of_perigee_deg: f64,
    /// Mean anomaly (degrees)
    pub mean_anomaly_deg: f64,
    /// Mean motion (rev/day)
    pub mean_motion: f64,
    /// Drag term (earth radii⁻¹)
    pub bstar: f64,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            catalog_number: 99999,
            designator: "00000A".to_string(),
            name: None,
            epoch_year: 2000,
            epoch_day: 1.0,
            inclination_deg: 0.0,
            right_ascension_deg: 0.0,
            eccentricity: 0.0,
            argument_of_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            mean_motion: 1.0,
            bstar: 0.0,
        }
    }
}

impl std::fmt::Display for Orbit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "{:05} {} ({})",
            self.catalog_number,
            self.designator,
            self.name.as_deref().unwrap_or("unnamed")
        )?;
        writeln!(f, "epoch : {}", format_timestamp(self.epoch_mjd()))?;
        writeln!(f, "incl  : {:.4}°", self.inclination_deg)?;
        writeln!(f, "node  : {:.4}°", self.right_ascension_deg)?;
        writeln!(f, "ecc   : {:.7}", self.eccentricity)?;
        writeln!(f, "argp  : {:.4}°", self.argument_of_perigee_deg)?;
        writeln!(f, "ma    : {:.4}°", self.mean_anomaly_deg)?;
        writeln!(f, "n     : {:.8} rev/day", self.mean_motion)?;
        write!(f, "bstar : {:.4E}", self.bstar)
    }
}

impl Orbit {
    /// Epoch expressed as MJD. Uses the same day-of-year rule as
    /// [Orbit::set_epoch_mjd], so both round trip.
    pub fn epoch_mjd(&self) -> f64 {
        mjd_from_day_of_year(self.epoch_year, self.epoch_day)
    }

    /// Move the element epoch to `mjd`. Elements are not propagated.
    pub fn set_epoch_mjd(&mut self, mjd: f64) {
        let (year, day) = day_of_year_from_mjd(mjd);
        self.epoch_year = year;
        self.epoch_day = day;
    }

    /// Returns fitted [Parameters]
    pub fn parameters(&self) -> Parameters {
        Parameters::from([
            self.inclination_deg,
            self.right_ascension_deg,
            self.eccentricity,
            self.argument_of_perigee_deg,
            self.mean_anomaly_deg,
            self.mean_motion,
            self.bstar,
        ])
    }

    /// Copies this [Orbit], replacing the fitted elements by `params`.
    /// Eccentricity and mean motion are brought back into the propagator domain,
    /// angles are folded into [0, 360).
    pub fn with_parameters(&self, params: &Parameters) -> Self {
        let params = domain_clamp(params);
        let mut s = self.clone();
        s.inclination_deg = params[Parameter::Inclination.index()];
        s.right_ascension_deg = modulo(params[Parameter::RightAscension.index()], 360.0);
        s.eccentricity = params[Parameter::Eccentricity.index()];
        s.argument_of_perigee_deg = modulo(params[Parameter::ArgumentOfPerigee.index()], 360.0);
        s.mean_anomaly_deg = modulo(params[Parameter::MeanAnomaly.index()], 360.0);
        s.mean_motion = params[Parameter::MeanMotion.index()];
        s.bstar = params[Parameter::Drag.index()];
        s
    }

    /// Builds a template [Orbit] with epoch `mjd`, identified as
    /// [TEMPLATE_CATALOG_NUMBER] / [TEMPLATE_DESIGNATOR].
    /// The [OrbitTemplate::Leo] template is placed over `site` at `mjd`.
    pub fn from_template(template: OrbitTemplate, mjd: f64, site: &Site) -> Self {
        let mut orbit = match template {
            OrbitTemplate::Leo => Self {
                inclination_deg: 90.0,
                right_ascension_deg: modulo(
                    sidereal_time(mjd).angle_deg + site.longitude_deg,
                    360.0,
                ),
                eccentricity: 0.0001,
                argument_of_perigee_deg: 0.0,
                mean_anomaly_deg: site.latitude_deg,
                mean_motion: 14.0,
                bstar: 0.5E-4,
                ..Default::default()
            },
            OrbitTemplate::Gto => Self {
                inclination_deg: 20.0,
                eccentricity: 0.7,
                mean_motion: 2.25,
                ..Default::default()
            },
            OrbitTemplate::Gso => Self {
                inclination_deg: 10.0,
                mean_motion: 1.0027,
                ..Default::default()
            },
            OrbitTemplate::Heo => Self {
                inclination_deg: 63.434,
                eccentricity: 0.71,
                argument_of_perigee_deg: 270.0,
                mean_motion: 2.006,
                ..Default::default()
            },
        };
        orbit.catalog_number = TEMPLATE_CATALOG_NUMBER;
        orbit.designator = TEMPLATE_DESIGNATOR.to_string();
        orbit.set_epoch_mjd(mjd);
        orbit
    }
}

/// Brings eccentricity into [0, 1) and mean motion above [MIN_MEAN_MOTION].
pub(crate) fn domain_clamp(params: &Parameters) -> Parameters {
    let mut params = *params;

    let ecc = &mut params[Parameter::Eccentricity.index()];
    if *ecc < 0.0 {
        debug!("eccentricity {:.7} clamped to 0", ecc);
        *ecc = 0.0;
    } else if *ecc >= 1.0 {
        debug!("eccentricity {:.7} clamped to {}", ecc, MAX_ECCENTRICITY);
        *ecc = MAX_ECCENTRICITY;
    }

    let n = &mut params[Parameter::MeanMotion.index()];
    if *n < MIN_MEAN_MOTION {
        debug!("mean motion {:.8} clamped to {}", n, MIN_MEAN_MOTION);
        *n = MIN_MEAN_MOTION;
    }

    params
}
