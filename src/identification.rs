//! Catalog identification
use itertools::Itertools;
use log::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::{Config, OptimizerOpts},
    dataset::Dataset,
    doppler::line_of_sight,
    error::Error,
    optimizer::minimize,
    orbit::{Orbit, Parameter},
    propagator::Propagator,
    residual::Objective,
    site::Site,
    tle::TleCatalog,
};

/// Time span and sites covered by the highlighted measurements
#[derive(Debug, Clone)]
pub(crate) struct Coverage {
    pub mjd_min: f64,
    pub mjd_max: f64,
    pub sites: Vec<Site>,
}

impl Coverage {
    pub fn new(dataset: &Dataset) -> Result<Self, Error> {
        let (mjd_min, mjd_max) = dataset
            .highlighted_mjd_range()
            .ok_or(Error::NoHighlightedPoints)?;

        let sites = dataset
            .highlighted()
            .flat_map(|point| std::iter::once(&point.site).chain(point.remote.as_ref()))
            .unique_by(|site| site.id)
            .cloned()
            .collect();

        Ok(Self {
            mjd_min,
            mjd_max,
            sites,
        })
    }

    /// `samples` evenly spaced epochs, window edges included
    pub fn epochs(&self, samples: usize) -> impl Iterator<Item = f64> + '_ {
        let samples = samples.max(2);
        let step = (self.mjd_max - self.mjd_min) / (samples - 1) as f64;
        (0..samples).map(move |i| self.mjd_min + i as f64 * step)
    }

    /// Highest elevation (degrees) reached over all sites,
    /// and the corresponding epoch.
    pub fn peak_elevation<P: Propagator>(
        &self,
        propagator: &P,
        state: &P::State,
        samples: usize,
    ) -> Result<(f64, f64), Error> {
        let mut peak = (f64::NEG_INFINITY, self.mjd_min);

        for mjd in self.epochs(samples) {
            for site in self.sites.iter() {
                let los = line_of_sight(propagator, state, mjd, site)?;
                if los.elevation_deg > peak.0 {
                    peak = (los.elevation_deg, mjd);
                }
            }
        }

        Ok(peak)
    }
}

/// Catalog entry matching the measured Doppler curve
#[derive(Debug, Clone, PartialEq)]
pub struct DopplerMatch {
    pub catalog_number: u32,
    /// Post-fit RMS (kHz)
    pub rms_khz: f64,
    /// Transmitted frequency (kHz)
    pub frequency_khz: f64,
    /// Fitted elements
    pub orbit: Orbit,
}

/// Catalog entry visible during the observations
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityMatch {
    pub catalog_number: u32,
    pub name: Option<String>,
    /// Highest elevation over the observing sites (degrees)
    pub peak_elevation_deg: f64,
    /// Epoch of the highest elevation (MJD)
    pub peak_mjd: f64,
}

/// Fits every catalog entry to the highlighted points of [Dataset],
/// starting at the reference frequency, and returns the best entry whose
/// post-fit RMS is below `max_rms_khz`.
///
/// Only the parameters of the identification mask are fitted, the others
/// keep their catalog value. Entries that never rise above the horizon
/// of any observing site during the observations are skipped.
pub fn doppler_scan<P: Propagator>(
    propagator: &P,
    catalog: &TleCatalog,
    dataset: &Dataset,
    cfg: &Config,
    max_rms_khz: f64,
) -> Result<Option<DopplerMatch>, Error> {
    let coverage = Coverage::new(dataset)?;
    let count = dataset.highlighted_count() as f64;

    let opts = OptimizerOpts {
        max_iterations: cfg.identification.max_iterations,
        ..cfg.optimizer
    };
    let steps = cfg.identification.mask.steps(&cfg.optimizer.steps);

    let mut best: Option<DopplerMatch> = None;

    for entry in catalog.entries() {
        let state = match propagator.initialize(entry) {
            Ok(state) => state,
            Err(e) => {
                debug!("{:05} - {}", entry.catalog_number, e);
                continue;
            },
        };

        match coverage.peak_elevation(propagator, &state, cfg.identification.visibility_samples) {
            Ok((elevation, _)) if elevation > 0.0 => {},
            Ok((elevation, _)) => {
                debug!(
                    "{:05} - not visible (peak elevation {:.1}°)",
                    entry.catalog_number, elevation
                );
                continue;
            },
            Err(e) => {
                debug!("{:05} - {}", entry.catalog_number, e);
                continue;
            },
        }

        let objective = Objective::new(propagator, entry, dataset, cfg.fit.solve_frequency)
            .with_frequency(dataset.reference_frequency_khz());

        let minimum = minimize(
            |x| objective.evaluate(x).chisq,
            &entry.parameters(),
            &steps,
            &opts,
        );

        let evaluation = objective.evaluate(&minimum.x);
        let rms_khz = (evaluation.chisq / count).sqrt();

        debug!(
            "{:05} - rms {:.3} kHz, {:.3} kHz",
            entry.catalog_number, rms_khz, evaluation.frequency_khz
        );

        if rms_khz.is_nan() || rms_khz >= max_rms_khz {
            continue;
        }

        if best.as_ref().map_or(true, |b| rms_khz < b.rms_khz) {
            best = Some(DopplerMatch {
                catalog_number: entry.catalog_number,
                rms_khz,
                frequency_khz: evaluation.frequency_khz,
                orbit: entry.with_parameters(&minimum.x),
            });
        }
    }

    match &best {
        Some(m) => info!(
            "identified {:05}: rms {:.3} kHz, {:.3} kHz",
            m.catalog_number, m.rms_khz, m.frequency_khz
        ),
        None => warn!("no catalog entry below {:.3} kHz rms", max_rms_khz),
    }

    Ok(best)
}

/// Samples every catalog entry across the highlighted observation window
/// and returns those rising above `min_elevation_deg` at any observing
/// site, highest peak first.
pub fn visibility_scan<P: Propagator>(
    propagator: &P,
    catalog: &TleCatalog,
    dataset: &Dataset,
    min_elevation_deg: f64,
    samples: usize,
) -> Result<Vec<VisibilityMatch>, Error> {
    let coverage = Coverage::new(dataset)?;

    let mut matches = catalog
        .entries()
        .iter()
        .filter_map(|entry| {
            let peak = propagator
                .initialize(entry)
                .and_then(|state| coverage.peak_elevation(propagator, &state, samples));

            match peak {
                Ok((elevation, mjd)) if elevation > min_elevation_deg => Some(VisibilityMatch {
                    catalog_number: entry.catalog_number,
                    name: entry.name.clone(),
                    peak_elevation_deg: elevation,
                    peak_mjd: mjd,
                }),
                Ok(_) => None,
                Err(e) => {
                    debug!("{:05} - {}", entry.catalog_number, e);
                    None
                },
            }
        })
        .collect::<Vec<_>>();

    matches.sort_by(|a, b| b.peak_elevation_deg.total_cmp(&a.peak_elevation_deg));

    info!(
        "{} catalog entries above {:.1}° elevation",
        matches.len(),
        min_elevation_deg
    );

    Ok(matches)
}

/// Uniform sampling of `[min, max]`, edges included
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl GridAxis {
    pub fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let span = if self.steps > 1 {
            (self.max - self.min) / (self.steps - 1) as f64
        } else {
            0.0
        };
        (0..self.steps).map(move |i| self.min + i as f64 * span)
    }
}

/// Circular orbit search over (mean anomaly, ascending node),
/// for a given mean motion and inclination.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchGrid {
    /// Mean motion estimate (rev/day)
    pub mean_motion: f64,
    /// Inclination estimate (degrees)
    pub inclination_deg: f64,
    /// Mean anomaly axis (degrees)
    pub mean_anomaly: GridAxis,
    /// Ascending node axis (degrees)
    pub right_ascension: GridAxis,
}

/// One [SearchGrid] node
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SearchSample {
    pub mean_anomaly_deg: f64,
    pub right_ascension_deg: f64,
    /// RMS at the working frequency (kHz), infinite
    /// when the propagator rejected this node.
    pub rms_khz: f64,
}

/// Evaluates the RMS of the highlighted points at every [SearchGrid] node,
/// mean anomaly being the outer axis. The other elements of `orbit` are
/// kept, except eccentricity and argument of perigee which are zeroed.
pub fn grid_search<P: Propagator>(
    propagator: &P,
    orbit: &Orbit,
    dataset: &Dataset,
    grid: &SearchGrid,
) -> Result<Vec<SearchSample>, Error> {
    let count = dataset.highlighted_count();
    if count == 0 {
        return Err(Error::NoHighlightedPoints);
    }

    let objective = Objective::new(propagator, orbit, dataset, false);

    let mut params = orbit.parameters();
    params[Parameter::Inclination.index()] = grid.inclination_deg;
    params[Parameter::Eccentricity.index()] = 0.0;
    params[Parameter::ArgumentOfPerigee.index()] = 0.0;
    params[Parameter::MeanMotion.index()] = grid.mean_motion;

    let samples = grid
        .mean_anomaly
        .values()
        .cartesian_product(grid.right_ascension.values().collect::<Vec<_>>())
        .map(|(mean_anomaly_deg, right_ascension_deg)| {
            params[Parameter::MeanAnomaly.index()] = mean_anomaly_deg;
            params[Parameter::RightAscension.index()] = right_ascension_deg;
            let chisq = objective.evaluate(&params).chisq;
            SearchSample {
                mean_anomaly_deg,
                right_ascension_deg,
                rms_khz: (chisq / count as f64).sqrt(),
            }
        })
        .collect::<Vec<_>>();

    info!("parameter search: {} nodes", samples.len());
    Ok(samples)
}
