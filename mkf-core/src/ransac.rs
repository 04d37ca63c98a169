//! Model-agnostic random sample consensus.
//!
//! Implement [`Estimator`] for a geometric model and call [`ransac`]. The
//! sampler is a seeded [`StdRng`], so a given input and [`RansacOptions`]
//! always produce the same consensus set.

use rand::{rngs::StdRng, seq::index::sample, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of one consensus search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Upper bound on sampled hypotheses
    pub max_iters: usize,
    /// Inlier distance threshold, in model residual units
    pub thresh: f64,
    /// Hypotheses with fewer inliers are never accepted
    pub min_inliers: usize,
    /// Stop early once this confidence of having drawn an all-inlier
    /// sample is reached; `0` disables early exit
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            thresh: 0.01,
            min_inliers: 3,
            confidence: 0.999,
            seed: 0x5eed_f00d,
        }
    }
}

/// Best hypothesis found by [`ransac`]
#[derive(Debug, Clone)]
pub struct Consensus<M> {
    pub model: M,
    /// Indices of the data within `thresh` of `model`, ascending
    pub inliers: Vec<usize>,
    pub inlier_rms: f64,
    /// Hypotheses drawn (including degenerate ones)
    pub iters: usize,
}

pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal sample size
    const MIN_SAMPLES: usize;

    /// Model through the sampled data, or `None` for a degenerate sample
    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model>;

    /// Non-negative distance of `datum` to `model`
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Least-squares model on a consensus set; `None` keeps the sampled model
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

/// Adaptive iteration bound `log(1 - p) / log(1 - w^m)`
fn required_iterations(confidence: f64, inlier_ratio: f64, min_samples: usize, cap: usize) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return cap;
    }
    let all_inlier = inlier_ratio.powi(min_samples as i32);
    let denom = (1.0 - all_inlier).max(1e-12).ln();
    if denom >= 0.0 {
        return cap;
    }
    let needed = ((1.0 - confidence).ln() / denom).ceil();
    if needed.is_finite() && needed >= 0.0 {
        (needed as usize).min(cap)
    } else {
        cap
    }
}

fn score<E: Estimator>(
    data: &[E::Datum],
    model: &E::Model,
    thresh: f64,
    inliers: &mut Vec<usize>,
) -> f64 {
    inliers.clear();
    let mut sum_sq = 0.0;
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= thresh {
            inliers.push(i);
            sum_sq += r * r;
        }
    }
    if inliers.is_empty() {
        f64::INFINITY
    } else {
        (sum_sq / inliers.len() as f64).sqrt()
    }
}

/// Run the consensus loop.
///
/// Returns `None` when the data is smaller than one minimal sample or no
/// hypothesis reached `min_inliers`.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> Option<Consensus<E::Model>> {
    if data.len() < E::MIN_SAMPLES {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut best: Option<Consensus<E::Model>> = None;
    let mut inliers = Vec::with_capacity(data.len());
    let mut budget = opts.max_iters;
    let mut iters = 0;

    while iters < budget {
        iters += 1;
        let picked = sample(&mut rng, data.len(), E::MIN_SAMPLES).into_vec();
        let Some(model) = E::fit(data, &picked) else {
            continue;
        };

        let rms = score::<E>(data, &model, opts.thresh, &mut inliers);
        if inliers.len() < opts.min_inliers.max(E::MIN_SAMPLES) {
            continue;
        }

        let improves = best.as_ref().is_none_or(|b| {
            inliers.len() > b.inliers.len()
                || (inliers.len() == b.inliers.len() && rms < b.inlier_rms)
        });
        if improves {
            budget = required_iterations(
                opts.confidence,
                inliers.len() as f64 / data.len() as f64,
                E::MIN_SAMPLES,
                opts.max_iters,
            )
            .max(iters);
            best = Some(Consensus {
                model,
                inliers: inliers.clone(),
                inlier_rms: rms,
                iters,
            });
        }
    }

    let mut best = best?;
    best.iters = iters;

    if let Some(refined) = E::refit(data, &best.inliers) {
        let rms = score::<E>(data, &refined, opts.thresh, &mut inliers);
        if inliers.len() >= best.inliers.len() {
            best.model = refined;
            best.inliers = inliers;
            best.inlier_rms = rms;
        }
    }

    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D "model": a constant value
    struct Constant;

    impl Estimator for Constant {
        type Datum = f64;
        type Model = f64;
        const MIN_SAMPLES: usize = 1;

        fn fit(data: &[f64], sample: &[usize]) -> Option<f64> {
            Some(data[sample[0]])
        }

        fn residual(model: &f64, datum: &f64) -> f64 {
            (model - datum).abs()
        }

        fn refit(data: &[f64], inliers: &[usize]) -> Option<f64> {
            let sum: f64 = inliers.iter().map(|&i| data[i]).sum();
            Some(sum / inliers.len() as f64)
        }
    }

    #[test]
    fn finds_majority_value() {
        let mut data = vec![5.0, 5.001, 4.999, 5.0005, 5.0];
        data.extend([1.0, 9.0, -3.0]);
        let opts = RansacOptions {
            thresh: 0.01,
            ..Default::default()
        };
        let consensus = ransac::<Constant>(&data, &opts).unwrap();
        assert_eq!(consensus.inliers, vec![0, 1, 2, 3, 4]);
        assert!((consensus.model - 5.0).abs() < 1e-3);
    }

    #[test]
    fn too_little_data() {
        let opts = RansacOptions::default();
        assert!(ransac::<Constant>(&[], &opts).is_none());
    }

    #[test]
    fn min_inliers_not_reached() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        let opts = RansacOptions {
            thresh: 0.1,
            min_inliers: 2,
            ..Default::default()
        };
        assert!(ransac::<Constant>(&data, &opts).is_none());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let data: Vec<f64> = (0..50).map(|i| (i % 7) as f64).collect();
        let opts = RansacOptions {
            thresh: 0.5,
            ..Default::default()
        };
        let a = ransac::<Constant>(&data, &opts).unwrap();
        let b = ransac::<Constant>(&data, &opts).unwrap();
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.iters, b.iters);
    }

    #[test]
    fn adaptive_bound() {
        assert_eq!(required_iterations(0.99, 1.0, 3, 1000), 1);
        assert_eq!(required_iterations(0.0, 0.5, 3, 1000), 1000);
        let n = required_iterations(0.99, 0.5, 3, 1000);
        assert!(n > 30 && n < 40);
    }
}
