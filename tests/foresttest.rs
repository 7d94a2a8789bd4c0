extern crate rand;
extern crate rand_chacha;
extern crate rrcflib;

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use rrcflib::{RCFError, RandomCutForest, RandomCutForestBuilder, Reducer};

fn gaussian_cluster(rng: &mut ChaCha20Rng, dimensions: usize, num_points: usize) -> Vec<(usize, Vec<f64>)> {
    (0..num_points)
        .map(|i| (i, (0..dimensions).map(|_| rng.sample(StandardNormal)).collect()))
        .collect()
}

#[cfg(test)]
parameterized_test::create! { outlier_scores_highest, (reducer, parallel_enabled), {
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let points = gaussian_cluster(&mut rng, 3, 200);
    let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(3)
        .num_trees(30)
        .reducer(reducer)
        .random_seed(17)
        .parallel_enabled(parallel_enabled)
        .build_from(points)
        .unwrap();
    forest.insert(1000, vec![1000.0, 1000.0, 1000.0]).unwrap();

    let outlier = forest.codisp(&1000).unwrap();
    for label in 0..200 {
        assert!(forest.codisp(&label).unwrap() < outlier);
    }
}}

outlier_scores_highest! {
    mean: (Reducer::Mean, false),
    median: (Reducer::Median, false),
    mean_parallel: (Reducer::Mean, true),
}

#[test]
fn reducers_agree_with_per_tree_scores() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let points = gaussian_cluster(&mut rng, 2, 64);
    let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
        .num_trees(11)
        .random_seed(3)
        .build_from(points.clone())
        .unwrap();

    let mut scores: Vec<f64> = forest.codisp_per_tree(&5).unwrap().into_iter().flatten().collect();
    assert_eq!(scores.len(), 11);
    assert_relative_eq!(forest.codisp(&5).unwrap(), scores.iter().sum::<f64>() / 11.0, epsilon = 1e-12);
    scores.sort_by(|a, b| a.total_cmp(b));

    // rebuilding with the same seed reproduces the trees
    forest.configure(11, None, Reducer::Median).unwrap();
    assert!(forest.is_empty());
    let forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
        .num_trees(11)
        .random_seed(3)
        .reducer(Reducer::Median)
        .build_from(points.clone())
        .unwrap();
    assert_eq!(forest.codisp(&5).unwrap(), scores[5]);

    let forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
        .num_trees(11)
        .random_seed(3)
        .reducer(Reducer::Max)
        .build_from(points)
        .unwrap();
    assert_eq!(forest.codisp(&5).unwrap(), scores[10]);
}

#[test]
fn streaming_window() {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
        .num_trees(8)
        .random_seed(8)
        .parallel_enabled(true)
        .build()
        .unwrap();

    for (label, point) in gaussian_cluster(&mut rng, 2, 300) {
        forest.insert(label, point).unwrap();
        if label >= 50 {
            forest.delete(&(label - 50)).unwrap();
        }
    }
    assert_eq!(forest.len(), 50);
    for tree in forest.trees() {
        assert_eq!(tree.tree().len(), 50);
        assert_eq!(tree.tree().num_leaves(), 50);
    }
    assert_eq!(forest.codisp(&0), Err(RCFError::UnknownLabel));
    assert!(forest.codisp(&299).is_ok());
}

#[test]
fn sampled_forest_forgets_evicted_labels() {
    let mut rng = ChaCha20Rng::seed_from_u64(12);
    let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
        .num_trees(5)
        .sample_size(32)
        .time_decay(0.05)
        .random_seed(12)
        .build()
        .unwrap();

    for (label, point) in gaussian_cluster(&mut rng, 2, 1000) {
        forest.insert(label, point).unwrap();
    }
    assert_eq!(forest.num_observations(), 1000);
    for tree in forest.trees() {
        assert_eq!(tree.tree().len(), 32);
    }
    assert!(forest.len() <= 5 * 32);

    // a strong decay keeps recent points; the oldest are long gone
    assert!((0..100).all(|label| !forest.contains(&label)));
    assert_eq!(forest.delete(&0), Err(RCFError::UnknownLabel));
    for label in 0..1000 {
        let holders = forest.trees().iter().filter(|t| t.contains(&label)).count();
        assert_eq!(forest.num_holders(&label), holders);
    }
}

#[test]
fn invalid_points_are_rejected() {
    let mut forest: RandomCutForest<&str, f32> = RandomCutForestBuilder::new(2)
        .num_trees(3)
        .random_seed(1)
        .build()
        .unwrap();
    assert!(matches!(forest.insert("a", vec![1.0]), Err(RCFError::InvalidArgument { .. })));
    assert!(matches!(forest.insert("a", vec![1.0, f32::NAN]), Err(RCFError::InvalidArgument { .. })));
    assert_eq!(forest.num_observations(), 0);
    assert!(forest.is_empty());

    let points = vec![("a", vec![0.0, 0.0]), ("b", vec![1.0, 1.0, 1.0])];
    assert!(RandomCutForestBuilder::new(2).num_trees(3).build_from(points).is_err());
}
