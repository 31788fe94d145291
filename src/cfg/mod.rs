#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::orbit::{Parameter, NUM_PARAMETERS};

mod mask;
pub use mask::FitMask;

fn default_solve_frequency() -> bool {
    true
}

fn default_steps() -> [f64; NUM_PARAMETERS] {
    [5.0, 5.0, 0.1, 5.0, 5.0, 0.1, 1.0E-5]
}

fn default_tolerance() -> f64 {
    1.0E-5
}

fn default_min_decrease() -> f64 {
    0.0
}

fn default_max_iterations() -> usize {
    100
}

fn default_identification_mask() -> FitMask {
    FitMask::none()
        .with(Parameter::RightAscension)
        .with(Parameter::MeanAnomaly)
}

fn default_identification_iterations() -> usize {
    25
}

fn default_visibility_samples() -> usize {
    32
}

/// Orbit fit configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitConfig {
    /// Fitted parameters
    #[cfg_attr(feature = "serde", serde(default))]
    pub mask: FitMask,
    /// Solve for the transmitted frequency, in closed form, at each
    /// evaluation. Otherwise the working frequency is held fixed.
    #[cfg_attr(feature = "serde", serde(default = "default_solve_frequency"))]
    pub solve_frequency: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            mask: FitMask::default(),
            solve_frequency: default_solve_frequency(),
        }
    }
}

/// Minimizer settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerOpts {
    /// Initial step of each parameter, in [Parameter] order
    /// (degrees, rev/day and drag units).
    #[cfg_attr(feature = "serde", serde(default = "default_steps"))]
    pub steps: [f64; NUM_PARAMETERS],
    /// Iteration stops once the relative chi-square decrease between two
    /// accepted iterations falls below this value.
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub tolerance: f64,
    /// Iteration stops once the absolute chi-square decrease (kHz²)
    /// falls to or below this value.
    #[cfg_attr(feature = "serde", serde(default = "default_min_decrease"))]
    pub min_decrease: f64,
    /// Iteration budget
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
}

impl Default for OptimizerOpts {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            tolerance: default_tolerance(),
            min_decrease: default_min_decrease(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Measurement loading options
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasetOpts {
    /// Offset added to every measured frequency (Hz)
    #[cfg_attr(feature = "serde", serde(default))]
    pub frequency_offset_hz: f64,
    /// Reference frequency override (kHz). For example 143050 kHz
    /// when processing GRAVES radar reflections.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_frequency_khz: Option<f64>,
}

impl DatasetOpts {
    /// [DatasetOpts] preset for GRAVES radar reflections
    pub fn graves() -> Self {
        Self {
            reference_frequency_khz: Some(143050.0),
            ..Default::default()
        }
    }
}

/// Catalog identification settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdentificationOpts {
    /// Parameters fitted for each candidate, others keep their catalog value
    #[cfg_attr(feature = "serde", serde(default = "default_identification_mask"))]
    pub mask: FitMask,
    /// Iteration budget, per candidate
    #[cfg_attr(feature = "serde", serde(default = "default_identification_iterations"))]
    pub max_iterations: usize,
    /// Number of epochs sampled across the observation window,
    /// when testing candidate visibility.
    #[cfg_attr(feature = "serde", serde(default = "default_visibility_samples"))]
    pub visibility_samples: usize,
}

impl Default for IdentificationOpts {
    fn default() -> Self {
        Self {
            mask: default_identification_mask(),
            max_iterations: default_identification_iterations(),
            visibility_samples: default_visibility_samples(),
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Orbit fit
    #[cfg_attr(feature = "serde", serde(default))]
    pub fit: FitConfig,
    /// Minimizer
    #[cfg_attr(feature = "serde", serde(default))]
    pub optimizer: OptimizerOpts,
    /// Measurement loading
    #[cfg_attr(feature = "serde", serde(default))]
    pub dataset: DatasetOpts,
    /// Catalog identification
    #[cfg_attr(feature = "serde", serde(default))]
    pub identification: IdentificationOpts,
}

impl Config {
    /// Returns [Config] fitting the along track position only (mean anomaly),
    /// which is enough to match a Doppler curve to fresh catalog elements.
    /// You can then customize [Self] as you will.
    pub fn along_track_preset() -> Self {
        let mut s = Self::default();
        s.fit.mask = FitMask::none().with(Parameter::MeanAnomaly);
        s
    }

    /// Returns [Config] fitting every element but drag, for
    /// refining a template or outdated element set.
    pub fn full_orbit_preset() -> Self {
        let mut s = Self::default();
        s.fit.mask = FitMask::all().without(Parameter::Drag);
        s
    }
}
