use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};

use crate::{
    prelude::{
        Config, Dataset, Error, FitMask, GridAxis, Objective, Observation, Orbit, Parameter,
        SearchGrid, Selection, Sgp4, Site, Solver,
    },
    tests::{init_logger, reference_dataset, reference_orbit, TRANSMITTED_KHZ},
    utils::angle_difference_deg,
};

#[test]
fn three_point_scenario() {
    init_logger();

    let site = Site::new(1, 52.0, 5.0, 0.05, "scenario");
    let points = [
        (59000.0, 100000.010),
        (59000.001, 100000.000),
        (59000.002, 99999.990),
    ]
    .iter()
    .map(|(mjd, f_khz)| {
        Observation::new(*mjd, *f_khz, 1.0, site.clone()).with_selection(Selection::Highlighted)
    })
    .collect::<Vec<_>>();

    let dataset = Dataset::new(points).unwrap();

    let mut orbit = Orbit {
        inclination_deg: 98.0,
        eccentricity: 0.001,
        mean_motion: 14.5,
        ..Default::default()
    };
    orbit.set_epoch_mjd(59000.0);

    let cfg = Config::along_track_preset();
    let mut solver = Solver::new(&cfg, Sgp4, dataset, orbit);

    let summary = solver.fit().unwrap();
    assert_eq!(summary.points, 3);
    assert!(summary.rms_khz < 0.05, "rms {} kHz", summary.rms_khz);

    // only the mean anomaly moved
    let fitted = solver.orbit();
    assert_eq!(fitted.inclination_deg, 98.0);
    assert_eq!(fitted.eccentricity, 0.001);
    assert_eq!(fitted.mean_motion, 14.5);
    assert_eq!(fitted.right_ascension_deg, 0.0);

    for point in solver.dataset().points() {
        assert!(point.residual_khz.is_some());
        assert!(point.predicted_khz.is_some());
    }
}

#[test]
fn ground_truth_mean_anomaly() {
    init_logger();

    let truth = reference_orbit();
    let dataset = reference_dataset();

    let initial = Orbit {
        mean_anomaly_deg: truth.mean_anomaly_deg + 0.5,
        ..truth.clone()
    };

    let cfg = Config::along_track_preset();
    let mut solver = Solver::new(&cfg, Sgp4, dataset, initial);

    let prefit = solver.rms().unwrap();
    let summary = solver.fit().unwrap();

    assert!(summary.rms_khz <= prefit);
    assert!(summary.rms_khz < 1.0E-4, "rms {} kHz", summary.rms_khz);

    let error = angle_difference_deg(solver.orbit().mean_anomaly_deg, truth.mean_anomaly_deg);
    assert!(error.abs() < 1.0E-3, "mean anomaly error {}°", error);

    let frequency_error = (summary.frequency_khz - TRANSMITTED_KHZ).abs();
    assert!(frequency_error < 1.0E-3, "frequency error {} kHz", frequency_error);
}

#[test]
fn ground_truth_node_and_mean_anomaly() {
    init_logger();

    let truth = reference_orbit();
    let dataset = reference_dataset();

    let initial = Orbit {
        right_ascension_deg: truth.right_ascension_deg - 1.0,
        mean_anomaly_deg: truth.mean_anomaly_deg + 2.0,
        ..truth.clone()
    };

    let mut cfg = Config::default();
    cfg.fit.mask = FitMask::none()
        .with(Parameter::RightAscension)
        .with(Parameter::MeanAnomaly);

    let mut solver = Solver::new(&cfg, Sgp4, dataset, initial);

    let prefit = solver.rms().unwrap();
    let summary = solver.fit().unwrap();

    assert!(summary.rms_khz < prefit);
    assert!(summary.rms_khz < 1.0E-3, "rms {} kHz", summary.rms_khz);

    let fitted = solver.orbit();
    let node_error = angle_difference_deg(fitted.right_ascension_deg, truth.right_ascension_deg);
    let anomaly_error = angle_difference_deg(fitted.mean_anomaly_deg, truth.mean_anomaly_deg);
    assert!(node_error.abs() < 1.0E-2, "node error {}°", node_error);
    assert!(anomaly_error.abs() < 1.0E-2, "mean anomaly error {}°", anomaly_error);

    // fixed elements untouched
    assert_eq!(fitted.inclination_deg, truth.inclination_deg);
    assert_eq!(fitted.mean_motion, truth.mean_motion);
    assert_eq!(fitted.epoch_day, truth.epoch_day);
}

#[test]
fn fixed_frequency_fit() {
    init_logger();

    let truth = reference_orbit();
    let mut dataset = reference_dataset();
    dataset.set_frequency(TRANSMITTED_KHZ);

    let initial = Orbit {
        mean_anomaly_deg: truth.mean_anomaly_deg - 0.5,
        ..truth.clone()
    };

    let mut cfg = Config::along_track_preset();
    cfg.fit.solve_frequency = false;

    let mut solver = Solver::new(&cfg, Sgp4, dataset, initial);
    let summary = solver.fit().unwrap();

    assert_eq!(summary.frequency_khz, TRANSMITTED_KHZ);
    assert!(summary.rms_khz < 1.0E-4, "rms {} kHz", summary.rms_khz);
}

#[test]
fn frequency_recovery() {
    let truth = reference_orbit();
    let dataset = reference_dataset();

    let objective = Objective::new(&Sgp4, &truth, &dataset, true);
    let evaluation = objective.evaluate(&truth.parameters());

    let relative = (evaluation.frequency_khz - TRANSMITTED_KHZ).abs() / TRANSMITTED_KHZ;
    assert!(relative < 1.0E-6, "relative error {}", relative);
    assert!(evaluation.chisq < 1.0E-9);
}

#[test]
fn reorder_invariance() {
    let truth = reference_orbit();
    let dataset = reference_dataset();

    let mut trial = truth.parameters();
    trial[Parameter::MeanAnomaly.index()] += 0.3;
    trial[Parameter::RightAscension.index()] -= 0.2;

    let expected = Objective::new(&Sgp4, &truth, &dataset, true).evaluate(&trial);
    assert!(expected.chisq > 0.0);

    let mut rng = SmallRng::seed_from_u64(0x5eed);

    for _ in 0..5 {
        let mut points = dataset.points().to_vec();
        points.shuffle(&mut rng);

        let shuffled = Dataset::new(points).unwrap();
        let evaluation = Objective::new(&Sgp4, &truth, &shuffled, true).evaluate(&trial);

        assert!(
            (evaluation.chisq - expected.chisq).abs() <= 1.0E-9 * expected.chisq,
            "{} != {}",
            evaluation.chisq,
            expected.chisq
        );
        assert!((evaluation.frequency_khz - expected.frequency_khz).abs() < 1.0E-9);
    }
}

#[test]
fn fit_requires_highlights() {
    let mut dataset = reference_dataset();
    dataset.clear_highlights();

    let cfg = Config::along_track_preset();
    let mut solver = Solver::new(&cfg, Sgp4, dataset, reference_orbit());

    assert!(matches!(solver.fit(), Err(Error::NoHighlightedPoints)));
    assert!(matches!(solver.rms(), Err(Error::NoHighlightedPoints)));
}

#[test]
fn parameter_search() {
    init_logger();

    let mut dataset = reference_dataset();
    dataset.set_frequency(TRANSMITTED_KHZ);

    let cfg = Config::default();
    let solver = Solver::new(&cfg, Sgp4, dataset, reference_orbit());

    // circular equivalent: argument of latitude 0°
    let grid = SearchGrid {
        mean_motion: 14.25,
        inclination_deg: 98.7,
        mean_anomaly: GridAxis::new(-2.0, 2.0, 5),
        right_ascension: GridAxis::new(118.0, 122.0, 5),
    };

    let samples = solver.parameter_search(&grid).unwrap();
    assert_eq!(samples.len(), 25);
    assert!(samples.iter().all(|s| s.rms_khz.is_finite()));

    // mean anomaly is the outer axis
    assert_eq!(samples[0].mean_anomaly_deg, -2.0);
    assert_eq!(samples[1].mean_anomaly_deg, -2.0);
    assert_eq!(samples[1].right_ascension_deg, 119.0);

    let best = samples
        .iter()
        .min_by(|a, b| a.rms_khz.total_cmp(&b.rms_khz))
        .unwrap();

    assert_eq!(best.mean_anomaly_deg, 0.0);
    assert!((best.right_ascension_deg - 120.0).abs() <= 1.0);
}
