use ndarray::{Array2, Axis};
use postura_ml::{silhouette_score, FeatureScaler};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Proptest strategies
// ---------------------------------------------------------------------------

fn matrix_strategy() -> impl Strategy<Value = Array2<f64>> {
    (2usize..30, 1usize..8).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(-1e3f64..1e3, rows * cols)
            .prop_map(move |data| Array2::from_shape_vec((rows, cols), data).unwrap())
    })
}

// ---------------------------------------------------------------------------
// Property: lenient scaling yields zero mean and unit-or-zero variance
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn scaled_columns_are_standardized(x in matrix_strategy()) {
        let mut scaler = FeatureScaler::new();
        scaler.fit_lenient(&x).unwrap();
        let scaled = scaler.transform_matrix(&x).unwrap();

        for col in scaled.axis_iter(Axis(1)) {
            let n = col.len() as f64;
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            prop_assert!(mean.abs() < 1e-6, "mean {}", mean);
            prop_assert!(var < 1e-9 || (var - 1.0).abs() < 1e-4, "variance {}", var);
        }
    }

    #[test]
    fn row_transform_matches_matrix_transform(x in matrix_strategy()) {
        let mut scaler = FeatureScaler::new();
        scaler.fit_lenient(&x).unwrap();
        let scaled = scaler.transform_matrix(&x).unwrap();
        for (i, row) in x.outer_iter().enumerate() {
            let single = scaler.transform(row).unwrap();
            for (a, b) in single.iter().zip(scaled.row(i).iter()) {
                prop_assert!((a - b).abs() < 1e-12);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: silhouette score stays in [-1, 1]
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn silhouette_bounded(x in matrix_strategy(), seed in any::<u64>()) {
        let n = x.nrows();
        // Two labels, both present.
        let labels: Vec<usize> = (0..n)
            .map(|i| if i == 0 { 0 } else if i == 1 { 1 } else { ((seed >> (i % 64)) & 1) as usize })
            .collect();
        let s = silhouette_score(&x, &labels);
        prop_assert!(s.is_finite());
        prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&s), "silhouette {}", s);
    }
}
