//! Orbit fit context
use log::{debug, info};

use crate::{
    cfg::Config,
    dataset::Dataset,
    doppler::closest_approach,
    error::Error,
    identification::{
        doppler_scan, grid_search, visibility_scan, SearchGrid, SearchSample, VisibilityMatch,
    },
    optimizer::minimize,
    orbit::{Orbit, OrbitTemplate},
    propagator::Propagator,
    residual::{compute_rms, Objective},
    site::Site,
    time::format_timestamp,
    tle::TleCatalog,
};

/// [Solver::fit] report
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitSummary {
    /// Post-fit RMS (kHz)
    pub rms_khz: f64,
    /// Working frequency after the fit (kHz)
    pub frequency_khz: f64,
    /// Number of fitted (highlighted) points
    pub points: usize,
    /// Post-fit objective value (kHz²)
    pub chisq: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// [Solver] fits a working [Orbit] to the Doppler curve of a [Dataset].
/// It owns everything a fit needs: there is no shared state between two
/// [Solver]s.
pub struct Solver<P: Propagator> {
    /// Solver parametrization
    pub cfg: Config,
    /// Measurements
    dataset: Dataset,
    /// Working element set
    orbit: Orbit,
    /// [Propagator]
    propagator: P,
}

impl<P: Propagator> Solver<P> {
    /// Creates a new [Solver]
    pub fn new(cfg: &Config, propagator: P, dataset: Dataset, orbit: Orbit) -> Self {
        Self {
            cfg: *cfg,
            dataset,
            orbit,
            propagator,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Mutable access to the [Dataset], for selection and editing
    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    pub fn orbit(&self) -> &Orbit {
        &self.orbit
    }

    /// Replaces the working [Orbit]
    pub fn set_orbit(&mut self, orbit: Orbit) {
        self.orbit = orbit;
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    /// Objective function for the current context
    pub fn objective(&self) -> Objective<'_, P> {
        Objective::new(
            &self.propagator,
            &self.orbit,
            &self.dataset,
            self.cfg.fit.solve_frequency,
        )
    }

    /// Fits the masked parameters of the working [Orbit] to the highlighted
    /// points. The solved frequency (when enabled) is committed once, at the
    /// accepted minimum. Predicted frequency and residual of each highlighted
    /// point are refreshed.
    pub fn fit(&mut self) -> Result<FitSummary, Error> {
        let points = self.dataset.highlighted_count();
        if points == 0 {
            return Err(Error::NoHighlightedPoints);
        }

        let steps = self.cfg.fit.mask.steps(&self.cfg.optimizer.steps);
        debug!("fitting [{}]", self.cfg.fit.mask);

        let (minimum, evaluation) = {
            let objective = self.objective();
            let minimum = minimize(
                |x| objective.evaluate(x).chisq,
                &self.orbit.parameters(),
                &steps,
                &self.cfg.optimizer,
            );
            let evaluation = objective.evaluate(&minimum.x);
            (minimum, evaluation)
        };

        self.orbit = self.orbit.with_parameters(&minimum.x);

        if self.cfg.fit.solve_frequency && evaluation.chisq.is_finite() {
            self.dataset.set_frequency(evaluation.frequency_khz);
        }

        let rms_khz = self.rms()?;

        info!(
            "{:05} fitted: rms {:.3} kHz over {} points, {:.3} kHz ({} iterations)",
            self.orbit.catalog_number,
            rms_khz,
            points,
            self.dataset.frequency_khz(),
            minimum.iterations,
        );

        Ok(FitSummary {
            rms_khz,
            frequency_khz: self.dataset.frequency_khz(),
            points,
            chisq: minimum.chisq,
            iterations: minimum.iterations,
            evaluations: minimum.evaluations,
        })
    }

    /// RMS (kHz) of the highlighted points for the working [Orbit],
    /// refreshing each point's predicted frequency and residual.
    pub fn rms(&mut self) -> Result<f64, Error> {
        compute_rms(&self.propagator, &self.orbit, &mut self.dataset)
    }

    /// Searches the catalog for the entry best matching the Doppler curve,
    /// see [doppler_scan]. On success, the winning elements and frequency
    /// become the working ones and are refined with the fit mask.
    pub fn identify_from_doppler(
        &mut self,
        catalog: &TleCatalog,
        max_rms_khz: f64,
    ) -> Result<Option<u32>, Error> {
        let found = doppler_scan(
            &self.propagator,
            catalog,
            &self.dataset,
            &self.cfg,
            max_rms_khz,
        )?;

        match found {
            Some(found) => {
                self.orbit = found.orbit;
                self.dataset.set_frequency(found.frequency_khz);
                self.fit()?;
                Ok(Some(found.catalog_number))
            },
            None => Ok(None),
        }
    }

    /// Catalog entries visible from the observing sites, see [visibility_scan].
    pub fn identify_from_visibility(
        &self,
        catalog: &TleCatalog,
        min_elevation_deg: f64,
    ) -> Result<Vec<VisibilityMatch>, Error> {
        visibility_scan(
            &self.propagator,
            catalog,
            &self.dataset,
            min_elevation_deg,
            self.cfg.identification.visibility_samples,
        )
    }

    /// RMS map of a circular orbit search, see [grid_search].
    pub fn parameter_search(&self, grid: &SearchGrid) -> Result<Vec<SearchSample>, Error> {
        grid_search(&self.propagator, &self.orbit, &self.dataset, grid)
    }

    /// Time of closest approach (MJD) of the working [Orbit] as seen
    /// from [Site], within the observation span.
    pub fn time_of_closest_approach(&self, site: &Site) -> Result<Option<f64>, Error> {
        let state = self.propagator.initialize(&self.orbit)?;
        let (mjd_min, mjd_max) = self.dataset.mjd_range();
        closest_approach(&self.propagator, &state, site, mjd_min, mjd_max)
    }

    /// Moves the element epoch to `mjd`. Elements are not propagated:
    /// a new fit is expected to follow.
    pub fn set_epoch(&mut self, mjd: f64) {
        self.orbit.set_epoch_mjd(mjd);
    }

    /// Replaces the working elements by an [OrbitTemplate], placed at the
    /// mean highlighted epoch, over the site of the first highlighted point.
    /// The working elements take the template identifiers.
    pub fn load_template(&mut self, template: OrbitTemplate) {
        let mjd = self.dataset.mean_highlighted_mjd();

        let site = self
            .dataset
            .highlighted()
            .next()
            .or(self.dataset.points().first())
            .map(|point| point.site.clone())
            .unwrap_or_else(|| Site::unknown(0));

        self.orbit = Orbit::from_template(template, mjd, &site);
        info!("{:?} template at {}", template, format_timestamp(mjd));
    }

    /// Loads catalog elements as working elements. The working frequency
    /// returns to the reference frequency.
    pub fn load_elements(
        &mut self,
        catalog: &TleCatalog,
        catalog_number: u32,
    ) -> Result<(), Error> {
        let orbit = catalog
            .lookup(catalog_number)
            .ok_or(Error::UnknownCatalogNumber(catalog_number))?;

        self.orbit = orbit.clone();
        self.dataset
            .set_frequency(self.dataset.reference_frequency_khz());

        debug!("loaded {}", self.orbit);
        Ok(())
    }
}
