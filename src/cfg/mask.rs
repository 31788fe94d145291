use crate::{
    error::Error,
    orbit::{Parameter, Parameters, NUM_PARAMETERS},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selects which [Parameter]s are fitted
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitMask([bool; NUM_PARAMETERS]);

impl FitMask {
    /// Empty [FitMask]: nothing is fitted
    pub fn none() -> Self {
        Self::default()
    }

    /// Every [Parameter] is fitted
    pub fn all() -> Self {
        Self([true; NUM_PARAMETERS])
    }

    /// Copies and returns [FitMask] with this [Parameter] fitted
    pub fn with(&self, parameter: Parameter) -> Self {
        let mut s = *self;
        s.0[parameter.index()] = true;
        s
    }

    /// Copies and returns [FitMask] with this [Parameter] held fixed
    pub fn without(&self, parameter: Parameter) -> Self {
        let mut s = *self;
        s.0[parameter.index()] = false;
        s
    }

    /// Toggles this [Parameter]
    pub fn toggle(&mut self, parameter: Parameter) {
        self.0[parameter.index()] = !self.0[parameter.index()];
    }

    pub fn contains(&self, parameter: Parameter) -> bool {
        self.0[parameter.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|b| *b)
    }

    /// Fitted [Parameter]s
    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        Parameter::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Applies this mask to initial steps: held parameters get a null step.
    pub fn steps(&self, steps: &[f64; NUM_PARAMETERS]) -> Parameters {
        Parameters::from_fn(|i, _| if self.0[i] { steps[i] } else { 0.0 })
    }
}

impl std::fmt::Display for FitMask {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let names = self.parameters().map(|p| p.to_string()).collect::<Vec<_>>();
        write!(f, "{}", names.join(", "))
    }
}

impl std::str::FromStr for FitMask {
    type Err = Error;
    /// Parses comma separated [Parameter]s, like "mean anomaly, raan".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = Self::none();
        for item in s.split(',') {
            if item.trim().is_empty() {
                continue;
            }
            mask = mask.with(item.parse::<Parameter>()?);
        }
        Ok(mask)
    }
}
