//! Fit residuals and objective function
use log::{debug, warn};

use crate::{
    dataset::Dataset,
    doppler::doppler_factor,
    error::Error,
    orbit::{Orbit, Parameters},
    propagator::Propagator,
};

/// Result of one [Objective] evaluation
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Evaluation {
    /// Sum of squared residuals (kHz²)
    pub chisq: f64,
    /// Transmitted frequency used in this evaluation (kHz): either solved
    /// for, or the working frequency of the [Dataset].
    pub frequency_khz: f64,
}

impl Evaluation {
    fn rejected(frequency_khz: f64) -> Self {
        Self {
            chisq: f64::INFINITY,
            frequency_khz,
        }
    }
}

/// Objective function of the orbit fit: squared Doppler residuals over the
/// highlighted points of a [Dataset], for a trial set of [Parameters].
///
/// [Objective::evaluate] does not modify anything. When solving for the
/// frequency, the solved value is returned in the [Evaluation] and it is up
/// to the caller to commit it.
pub struct Objective<'a, P: Propagator> {
    orbit: &'a Orbit,
    dataset: &'a Dataset,
    propagator: &'a P,
    solve_frequency: bool,
    frequency_khz: f64,
}

impl<'a, P: Propagator> Objective<'a, P> {
    /// Builds a new [Objective]. `orbit` provides the elements that are
    /// not part of [Parameters] (epoch, identifiers).
    pub fn new(
        propagator: &'a P,
        orbit: &'a Orbit,
        dataset: &'a Dataset,
        solve_frequency: bool,
    ) -> Self {
        Self {
            orbit,
            dataset,
            propagator,
            solve_frequency,
            frequency_khz: dataset.frequency_khz(),
        }
    }

    /// Returns [Objective] using this working frequency (kHz) instead
    /// of the [Dataset] one.
    pub fn with_frequency(mut self, frequency_khz: f64) -> Self {
        self.frequency_khz = frequency_khz;
        self
    }

    /// Evaluates the objective for these [Parameters].
    /// Trials the propagator cannot handle score [f64::INFINITY].
    pub fn evaluate(&self, params: &Parameters) -> Evaluation {
        let working_khz = self.frequency_khz;
        let orbit = self.orbit.with_parameters(params);

        let state = match self.propagator.initialize(&orbit) {
            Ok(state) => state,
            Err(e) => {
                warn!("{:05} - {}", orbit.catalog_number, e);
                return Evaluation::rejected(working_khz);
            },
        };

        let mut terms = Vec::with_capacity(self.dataset.len());

        for point in self.dataset.highlighted() {
            match doppler_factor(self.propagator, &state, point) {
                Ok(factor) => terms.push((point.frequency_khz(), factor)),
                Err(e) => {
                    debug!("{:05} ({}) - {}", orbit.catalog_number, point.timestamp(), e);
                    return Evaluation::rejected(working_khz);
                },
            }
        }

        let frequency_khz = if self.solve_frequency {
            let (sum1, sum2) = terms
                .iter()
                .fold((0.0, 0.0), |(sum1, sum2), (observed, factor)| {
                    (sum1 + factor * observed, sum2 + factor * factor)
                });

            if sum2 > 0.0 {
                sum1 / sum2
            } else {
                working_khz
            }
        } else {
            working_khz
        };

        let chisq = terms
            .iter()
            .map(|(observed, factor)| (observed - factor * frequency_khz).powi(2))
            .sum::<f64>();

        Evaluation {
            chisq,
            frequency_khz,
        }
    }
}

/// Computes the RMS residual (kHz) of the highlighted points of [Dataset]
/// for this [Orbit], at the working frequency. Predicted frequency and residual
/// are stored on each highlighted point, and cleared on the others.
/// [Dataset] is left untouched when any prediction fails.
pub fn compute_rms<P: Propagator>(
    propagator: &P,
    orbit: &Orbit,
    dataset: &mut Dataset,
) -> Result<f64, Error> {
    if dataset.highlighted_count() == 0 {
        return Err(Error::NoHighlightedPoints);
    }

    let state = propagator.initialize(orbit)?;
    let frequency_khz = dataset.frequency_khz();

    let predictions = dataset
        .points()
        .iter()
        .map(|point| {
            if point.is_highlighted() {
                doppler_factor(propagator, &state, point)
                    .map(|factor| Some(factor * frequency_khz))
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let mut sum = 0.0;
    let mut count = 0;

    for (point, predicted) in dataset.points_mut().iter_mut().zip(predictions) {
        let observed = point.frequency_khz();

        point.predicted_khz = predicted;
        point.residual_khz = predicted.map(|predicted| observed - predicted);

        if let Some(residual) = point.residual_khz {
            sum += residual * residual;
            count += 1;
        }
    }

    Ok((sum / count as f64).sqrt())
}
