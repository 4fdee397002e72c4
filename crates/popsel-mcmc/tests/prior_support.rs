use popsel_core::RngHandle;
use popsel_mcmc::{MixturePrior, ModelIndex};
use proptest::prelude::*;

fn ln_gamma_3() -> f64 {
    2.0_f64.ln()
}

proptest! {
    #[test]
    fn prior_is_flat_dirichlet_on_simplex(
        x0 in 0.0f64..2.0,
        a in 0.0f64..1.0,
        t in 0.0f64..0.999,
    ) {
        let prior = MixturePrior::new(2, 3);
        let b = (1.0 - a) * t;
        let value = prior.log_prior(&[x0, a, b]);
        prop_assert!((value - ln_gamma_3()).abs() < 1e-12);
    }

    #[test]
    fn negative_fraction_is_outside_support(
        x0 in 0.0f64..2.0,
        a in 0.0f64..1.0,
        neg in -1.0f64..-1e-12,
    ) {
        let prior = MixturePrior::new(2, 3);
        prop_assert_eq!(prior.log_prior(&[x0, neg, a]), f64::NEG_INFINITY);
        prop_assert_eq!(prior.log_prior(&[x0, a, neg]), f64::NEG_INFINITY);
    }

    #[test]
    fn over_unit_sum_is_outside_support(
        x0 in 0.0f64..2.0,
        a in 0.0f64..1.0,
        excess in 1e-9f64..1.0,
    ) {
        let prior = MixturePrior::new(2, 3);
        let b = 1.0 - a + excess;
        prop_assert_eq!(prior.log_prior(&[x0, a, b]), f64::NEG_INFINITY);
    }

    #[test]
    fn out_of_range_model_index_is_outside_support(
        below in -10.0f64..-1e-9,
        above in 2.0f64..10.0,
    ) {
        let prior = MixturePrior::new(2, 3);
        prop_assert_eq!(prior.log_prior(&[below, 0.2, 0.3]), f64::NEG_INFINITY);
        prop_assert_eq!(prior.log_prior(&[above, 0.2, 0.3]), f64::NEG_INFINITY);
    }
}

#[test]
fn non_finite_inputs_are_outside_support() {
    let prior = MixturePrior::new(3, 2);
    assert_eq!(prior.log_prior(&[f64::NAN, 0.5]), f64::NEG_INFINITY);
    assert_eq!(prior.log_prior(&[f64::INFINITY, 0.5]), f64::NEG_INFINITY);
    assert_eq!(prior.log_prior(&[1.5, f64::NAN]), f64::NEG_INFINITY);
    assert_eq!(prior.log_prior(&[1.5]), f64::NEG_INFINITY);
}

#[test]
fn single_channel_prior_has_unit_density() {
    let prior = MixturePrior::new(2, 1);
    assert_eq!(prior.dim(), 1);
    assert_eq!(prior.log_prior(&[1.2]), 0.0);
    assert_eq!(prior.complete_betas(&[1.2]), vec![1.0]);
}

// Models at either end of [0, M) border the support wall on one side only;
// interior models are bordered by neighbouring models on both sides.
#[test]
fn floor_encoding_has_walls_only_at_the_end_bins() {
    let prior = MixturePrior::new(3, 2);
    let betas = 0.4;
    assert!(prior.log_prior(&[0.0, betas]).is_finite());
    assert_eq!(prior.log_prior(&[-1e-12, betas]), f64::NEG_INFINITY);
    assert!(prior.log_prior(&[3.0 - 1e-9, betas]).is_finite());
    assert_eq!(prior.log_prior(&[3.0, betas]), f64::NEG_INFINITY);

    assert_eq!(prior.model_index(&[1.0 - 1e-9, betas]), Some(ModelIndex(0)));
    assert_eq!(prior.model_index(&[1.0, betas]), Some(ModelIndex(1)));
    assert_eq!(prior.model_index(&[2.0 - 1e-9, betas]), Some(ModelIndex(1)));
    assert_eq!(prior.model_index(&[2.0, betas]), Some(ModelIndex(2)));
}

#[test]
fn decode_appends_implied_fraction() {
    let prior = MixturePrior::new(2, 3);
    let point = prior.decode(&[1.7, 0.25, 0.5]).unwrap();
    assert_eq!(point.model, ModelIndex(1));
    assert_eq!(point.betas.as_slice(), &[0.25, 0.5, 0.25]);
    assert!(prior.decode(&[1.7, 0.75, 0.5]).is_none());
}

#[test]
fn initial_points_lie_inside_support() {
    let prior = MixturePrior::new(4, 3);
    let mut rng = RngHandle::from_seed(11);
    let mut seen = [false; 4];
    for _ in 0..400 {
        let x = prior.sample(&mut rng).unwrap();
        assert_eq!(x.len(), 3);
        assert!(prior.log_prior(&x).is_finite());
        seen[prior.model_index(&x).unwrap().0] = true;
    }
    assert!(seen.iter().all(|s| *s));
}
