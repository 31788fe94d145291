#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod cfg;
mod constants;
mod dataset;
mod doppler;
mod error;
mod geometry;
mod identification;
mod observation;
mod optimizer;
mod orbit;
mod propagator;
mod residual;
mod site;
mod solver;
mod time;
mod utils;

pub mod output;
pub mod tle;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{Config, DatasetOpts, FitConfig, FitMask, IdentificationOpts, OptimizerOpts};
    pub use crate::constants::SPEED_OF_LIGHT_KM_S;
    pub use crate::dataset::{Dataset, Window};
    pub use crate::doppler::{closest_approach, doppler_factor, line_of_sight, LineOfSight};
    pub use crate::error::{Error, ParsingError};
    pub use crate::geometry::{equatorial_to_horizontal, observer_state, sidereal_time, SiderealTime};
    pub use crate::identification::{
        doppler_scan, grid_search, visibility_scan, DopplerMatch, GridAxis, SearchGrid,
        SearchSample, VisibilityMatch,
    };
    pub use crate::observation::{Observation, Selection};
    pub use crate::optimizer::{minimize, Minimum};
    pub use crate::orbit::{Orbit, OrbitTemplate, Parameter, Parameters};
    pub use crate::propagator::{Propagator, Sgp4, Sgp4State};
    pub use crate::residual::{compute_rms, Evaluation, Objective};
    pub use crate::site::{Site, SiteCatalog, Sites};
    pub use crate::solver::{FitSummary, Solver};
    pub use crate::time::{
        calendar_from_mjd, day_of_year_from_mjd, epoch_from_mjd, format_timestamp,
        mjd_from_calendar, mjd_from_day_of_year, mjd_from_epoch, parse_timestamp,
    };
    pub use crate::tle::TleCatalog;
    // re-export
    pub use hifitime::{Duration, Epoch};
    pub use nalgebra::Vector3;
}
