//! Derivative-free least squares minimizer
use log::debug;
use nalgebra::{DMatrix, DVector, SVector};

use crate::cfg::OptimizerOpts;

/// Initial Marquardt damping
const INITIAL_DAMPING: f64 = 1.0E-3;

const MIN_DAMPING: f64 = 1.0E-12;

/// Damping increases allowed within one iteration
const MAX_DAMPING_ATTEMPTS: usize = 8;

/// Steps below this (relative) size are considered exhausted
const STEP_FLOOR: f64 = 1.0E-10;

/// Outcome of [minimize]
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum<const N: usize> {
    /// Best parameters
    pub x: SVector<f64, N>,
    /// Objective value at [Minimum::x]
    pub chisq: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Objective evaluations
    pub evaluations: usize,
    /// False when the iteration budget ran out first
    pub converged: bool,
}

/// Best improving trial: (x, value, from the Newton step)
type Candidate<const N: usize> = Option<(SVector<f64, N>, f64, bool)>;

fn threshold<const N: usize>(best: &Candidate<N>, f0: f64) -> f64 {
    best.as_ref().map(|(_, fb, _)| *fb).unwrap_or(f0)
}

fn consider<const N: usize>(
    best: &mut Candidate<N>,
    f0: f64,
    x: SVector<f64, N>,
    f: f64,
    newton: bool,
) {
    if f < threshold(best, f0) {
        *best = Some((x, f, newton));
    }
}

struct Counted<F> {
    func: F,
    evaluations: usize,
}

impl<F> Counted<F> {
    fn eval<const N: usize>(&mut self, x: &SVector<f64, N>) -> f64
    where
        F: FnMut(&SVector<f64, N>) -> f64,
    {
        self.evaluations += 1;
        (self.func)(x)
    }
}

/// Minimizes `func` starting from `x0`.
///
/// Only parameters with a non zero initial `steps` entry are varied, the others
/// remain frozen. Each iteration probes the active parameters at ± their step
/// (plus pairwise cross probes), builds a finite difference gradient and
/// Hessian, and attempts a damped Newton (Marquardt) step. The best strictly
/// improving candidate is accepted; on failure, steps are halved.
/// Damping decreases after each successful Newton step and is reset
/// when no damped step improved.
///
/// Non finite objective values are valid and simply never accepted.
pub fn minimize<const N: usize, F>(
    func: F,
    x0: &SVector<f64, N>,
    steps: &SVector<f64, N>,
    opts: &OptimizerOpts,
) -> Minimum<N>
where
    F: FnMut(&SVector<f64, N>) -> f64,
{
    let mut func = Counted {
        func,
        evaluations: 0,
    };

    let active = (0..N).filter(|i| steps[*i] != 0.0).collect::<Vec<_>>();
    let m = active.len();

    let mut x = *x0;
    let mut h = steps.abs();
    let mut f0 = func.eval(&x);
    let mut damping = INITIAL_DAMPING;

    let mut iterations = 0;
    let mut converged = m == 0;

    while !converged && iterations < opts.max_iterations {
        iterations += 1;

        if f0 == 0.0 {
            converged = true;
            break;
        }

        let mut best = Candidate::<N>::None;

        // axis probes
        let mut fp = vec![0.0; m];
        let mut fm = vec![0.0; m];

        for (k, &i) in active.iter().enumerate() {
            let mut xp = x;
            xp[i] += h[i];
            fp[k] = func.eval(&xp);
            consider(&mut best, f0, xp, fp[k], false);

            let mut xm = x;
            xm[i] -= h[i];
            fm[k] = func.eval(&xm);
            consider(&mut best, f0, xm, fm[k], false);
        }

        let mut gradient = DVector::<f64>::zeros(m);
        let mut hessian = DMatrix::<f64>::zeros(m, m);

        for (k, &i) in active.iter().enumerate() {
            gradient[k] = (fp[k] - fm[k]) / (2.0 * h[i]);
            hessian[(k, k)] = (fp[k] - 2.0 * f0 + fm[k]) / (h[i] * h[i]);
        }

        // cross probes
        for k in 0..m {
            for l in (k + 1)..m {
                let (i, j) = (active[k], active[l]);
                let mut xkl = x;
                xkl[i] += h[i];
                xkl[j] += h[j];
                let fkl = func.eval(&xkl);
                consider(&mut best, f0, xkl, fkl, false);

                let hkl = (fkl - fp[k] - fp[l] + f0) / (h[i] * h[j]);
                hessian[(k, l)] = hkl;
                hessian[(l, k)] = hkl;
            }
        }

        let mut newton_delta = None;

        if f0.is_finite()
            && gradient.iter().all(|g| g.is_finite())
            && hessian.iter().all(|v| v.is_finite())
        {
            for _ in 0..MAX_DAMPING_ATTEMPTS {
                let mut system = hessian.clone();
                for (k, &i) in active.iter().enumerate() {
                    let scale = if hessian[(k, k)] != 0.0 {
                        hessian[(k, k)].abs()
                    } else {
                        f0.max(f64::MIN_POSITIVE) / (h[i] * h[i])
                    };
                    system[(k, k)] += damping * scale;
                }

                let delta = match system.cholesky() {
                    Some(cholesky) => -cholesky.solve(&gradient),
                    None => {
                        damping *= 10.0;
                        continue;
                    },
                };

                let mut xt = x;
                for (k, &i) in active.iter().enumerate() {
                    xt[i] += delta[k];
                }

                let ft = func.eval(&xt);
                if ft < f0 {
                    damping = (damping / 10.0).max(MIN_DAMPING);
                    consider(&mut best, f0, xt, ft, true);
                    newton_delta = Some(delta);
                    break;
                }

                damping *= 10.0;
            }
        }

        if newton_delta.is_none() {
            damping = INITIAL_DAMPING;
        }

        match best {
            Some((xb, fb, newton)) => {
                let decrease = f0 - fb;
                let relative = decrease / f0.abs();

                if newton {
                    if let Some(delta) = &newton_delta {
                        for (k, &i) in active.iter().enumerate() {
                            h[i] = (2.0 * delta[k].abs()).clamp(0.1 * h[i], h[i]);
                        }
                    }
                }

                debug!(
                    "iteration {}: chisq {:.6E} -> {:.6E} ({})",
                    iterations,
                    f0,
                    fb,
                    if newton { "newton" } else { "probe" }
                );

                x = xb;
                f0 = fb;

                if decrease <= opts.min_decrease || relative < opts.tolerance {
                    converged = true;
                }
            },
            None => {
                for &i in active.iter() {
                    h[i] *= 0.5;
                }

                debug!("iteration {}: no improvement, steps {:?}", iterations, h.as_slice());

                if active
                    .iter()
                    .all(|&i| h[i] < STEP_FLOOR * (1.0 + x[i].abs()))
                {
                    converged = true;
                }
            },
        }
    }

    Minimum {
        x,
        chisq: f0,
        iterations,
        evaluations: func.evaluations,
        converged,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    fn opts() -> OptimizerOpts {
        OptimizerOpts {
            tolerance: 1.0E-12,
            max_iterations: 200,
            ..Default::default()
        }
    }

    #[test]
    fn coupled_quadratic() {
        let f = |x: &Vector3<f64>| {
            (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2) + (x[0] - 1.0) * (x[1] + 2.0)
        };

        let min = minimize(
            f,
            &Vector3::new(5.0, 5.0, 7.0),
            &Vector3::new(1.0, 1.0, 0.0),
            &opts(),
        );

        assert!(min.converged);
        assert!((min.x[0] - 1.0).abs() < 1.0E-4, "{}", min.x);
        assert!((min.x[1] + 2.0).abs() < 1.0E-4, "{}", min.x);
        // frozen
        assert_eq!(min.x[2], 7.0);
        assert!(min.chisq < 1.0E-8);
        assert!(min.evaluations > min.iterations);
    }

    #[test]
    fn non_quadratic() {
        // sum of squared residuals of a sine model
        let samples = (0..20).map(|i| i as f64 * 0.3).collect::<Vec<_>>();
        let truth = Vector3::new(2.0, 0.7, 0.0);
        let model = |p: &Vector3<f64>, t: f64| p[0] * (t + p[1]).sin();

        let f = |p: &Vector3<f64>| {
            samples
                .iter()
                .map(|t| (model(p, *t) - model(&truth, *t)).powi(2))
                .sum::<f64>()
        };

        let min = minimize(
            f,
            &Vector3::new(1.5, 0.4, 0.0),
            &Vector3::new(0.1, 0.1, 0.0),
            &opts(),
        );

        assert!((min.x[0] - 2.0).abs() < 1.0E-4, "{}", min.x);
        assert!((min.x[1] - 0.7).abs() < 1.0E-4, "{}", min.x);
    }

    #[test]
    fn infinite_region() {
        // invalid below zero
        let f = |x: &Vector3<f64>| {
            if x[0] < 0.0 {
                f64::INFINITY
            } else {
                (x[0] - 0.5).powi(2)
            }
        };

        let min = minimize(
            f,
            &Vector3::new(3.0, 0.0, 0.0),
            &Vector3::new(5.0, 0.0, 0.0),
            &opts(),
        );

        assert!((min.x[0] - 0.5).abs() < 1.0E-4, "{}", min.x);
    }

    #[test]
    fn nothing_to_fit() {
        let mut calls = 0;
        let min = minimize(
            |x: &Vector3<f64>| {
                calls += 1;
                x.norm()
            },
            &Vector3::new(1.0, 2.0, 3.0),
            &Vector3::zeros(),
            &opts(),
        );
        assert_eq!(min.iterations, 0);
        assert_eq!(min.evaluations, 1);
        assert_eq!(calls, 1);
        assert_eq!(min.x, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn iteration_budget() {
        let f = |x: &Vector3<f64>| (x[0] - 1.0E6).powi(2) + 1.0;
        let opts = OptimizerOpts {
            max_iterations: 1,
            ..opts()
        };
        let min = minimize(f, &Vector3::zeros(), &Vector3::new(1.0E-3, 0.0, 0.0), &opts);
        assert_eq!(min.iterations, 1);
        assert!(!min.converged);
        assert!(min.chisq < 1.0E12 + 1.0);
    }
}
