use popsel_core::{DensityModel, GaussianKde, ObservationSet, RngHandle};

fn grid_observations() -> ObservationSet {
    ObservationSet::new(
        vec!["x".into()],
        (0..41).map(|i| vec![-4.0 + 0.2 * i as f64]).collect(),
    )
    .unwrap()
}

#[test]
fn observation_set_rejects_ragged_rows() {
    let err = ObservationSet::new(vec!["a".into(), "b".into()], vec![vec![1.0, 2.0], vec![1.0]])
        .unwrap_err();
    assert_eq!(err.code(), "observation-shape");

    let err = ObservationSet::new(vec!["a".into()], vec![vec![f64::NAN]]).unwrap_err();
    assert_eq!(err.code(), "observation-non-finite");
}

#[test]
fn fingerprint_tracks_values() {
    let a = ObservationSet::new(vec!["a".into()], vec![vec![1.0]]).unwrap();
    let b = ObservationSet::new(vec!["a".into()], vec![vec![1.0 + 1e-12]]).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint(), a.clone().fingerprint());
}

#[test]
fn single_kernel_matches_normal_density() {
    let kde = GaussianKde::new(vec![vec![0.0]], Some(vec![1.0])).unwrap();
    let obs = grid_observations();
    let densities = kde.evaluate(&obs).unwrap();
    for (x, density) in obs.iter().zip(&densities) {
        let expected = (-0.5 * x[0] * x[0]).exp() / (2.0 * std::f64::consts::PI).sqrt();
        assert!((density - expected).abs() < 1e-12);
    }
}

#[test]
fn kde_integrates_to_roughly_one() {
    let points: Vec<Vec<f64>> = (0..50).map(|i| vec![(i as f64 / 10.0).sin()]).collect();
    let kde = GaussianKde::new(points, None).unwrap();
    let step = 0.01;
    let integral: f64 = (0..1000)
        .map(|i| kde.density_at(&[-5.0 + step * i as f64]) * step)
        .sum();
    assert!((integral - 1.0).abs() < 1e-3, "integral {integral}");
}

#[test]
fn kde_rejects_dimension_mismatch_and_draws_near_samples() {
    let kde = GaussianKde::new(vec![vec![5.0, 5.0]], Some(vec![0.01, 0.01])).unwrap();
    let obs = grid_observations();
    assert_eq!(kde.evaluate(&obs).unwrap_err().code(), "kde-observation-dimension");

    let mut rng = RngHandle::from_seed(3);
    for _ in 0..100 {
        let draw = kde.draw(&mut rng).unwrap();
        assert_eq!(draw.len(), 2);
        assert!((draw[0] - 5.0).abs() < 0.1);
    }
}

#[test]
fn far_tail_log_density_stays_finite() {
    let kde = GaussianKde::new(vec![vec![0.0], vec![1.0]], Some(vec![0.5])).unwrap();
    let far = [60.0];
    assert_eq!(kde.density_at(&far), 0.0);
    let log_density = kde.log_density_at(&far);
    assert!(log_density.is_finite());
    // nearest kernel dominates: ln(0.5 N(59 / 0.5)) up to the ln 2 of the average
    let expected = -0.5 * (59.0f64 / 0.5).powi(2)
        - 0.5f64.ln()
        - 0.5 * (2.0 * std::f64::consts::PI).ln()
        - 2.0f64.ln();
    assert!((log_density - expected).abs() < 1e-9, "{log_density} vs {expected}");

    let obs = ObservationSet::new(vec!["x".into()], vec![vec![0.3], far.to_vec()]).unwrap();
    let logs = kde.log_evaluate(&obs).unwrap();
    assert!((logs[0] - kde.density_at(&[0.3]).ln()).abs() < 1e-12);
    assert_eq!(logs[1], log_density);
}

#[test]
fn weights_shift_density_and_draws() {
    let points = vec![vec![-3.0], vec![3.0]];
    let flat = GaussianKde::new(points.clone(), Some(vec![1.0])).unwrap();
    let tilted = GaussianKde::weighted(points.clone(), Some(vec![0.1, 0.9]), Some(vec![1.0])).unwrap();
    assert!((flat.density_at(&[3.0]) - flat.density_at(&[-3.0])).abs() < 1e-15);
    assert!(tilted.density_at(&[3.0]) > 5.0 * tilted.density_at(&[-3.0]));

    let zero_weight = GaussianKde::weighted(points.clone(), Some(vec![0.0, 2.0]), Some(vec![1.0])).unwrap();
    let single = GaussianKde::new(vec![vec![3.0]], Some(vec![1.0])).unwrap();
    assert!((zero_weight.density_at(&[1.0]) - single.density_at(&[1.0])).abs() < 1e-15);
    let mut rng = RngHandle::from_seed(11);
    for _ in 0..50 {
        assert!(zero_weight.draw(&mut rng).unwrap()[0] > -1.0);
    }

    let err = GaussianKde::weighted(points.clone(), Some(vec![1.0]), None).unwrap_err();
    assert_eq!(err.code(), "kde-weights");
    let err = GaussianKde::weighted(points, Some(vec![0.0, 0.0]), None).unwrap_err();
    assert_eq!(err.code(), "kde-weights");
}
