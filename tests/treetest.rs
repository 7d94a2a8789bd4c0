extern crate rand;
extern crate rand_chacha;
extern crate rrcflib;

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use rrcflib::{BoundingBox, Node, NodeKey, RCFError, Tree};

fn normal_points(rng: &mut ChaCha20Rng, dimensions: usize, num_points: usize) -> Vec<Vec<f64>> {
    (0..num_points)
        .map(|_| (0..dimensions).map(|_| rng.sample(StandardNormal)).collect())
        .collect()
}

/// Recomputes mass and bounding box of every subtree from its leaves and
/// compares them with the cached values.
fn verify_subtree(tree: &Tree<usize, f64>, node_key: NodeKey) -> (u32, BoundingBox<f64>) {
    match tree.get_node(node_key) {
        Node::Leaf(leaf) => (leaf.mass(), BoundingBox::new_from_point(leaf.point())),
        Node::Branch(branch) => {
            assert_eq!(tree.get_node(branch.left()).parent(), Some(node_key));
            assert_eq!(tree.get_node(branch.right()).parent(), Some(node_key));
            let (left_mass, left_box) = verify_subtree(tree, branch.left());
            let (right_mass, right_box) = verify_subtree(tree, branch.right());
            let merged = BoundingBox::merged_box_with_box(&left_box, &right_box);
            assert_eq!(branch.mass(), left_mass + right_mass);
            assert_eq!(branch.bounding_box(), &merged);
            (branch.mass(), merged)
        }
    }
}

fn verify_tree(tree: &Tree<usize, f64>) {
    if let Some(root_key) = tree.root_node() {
        let (mass, _) = verify_subtree(tree, root_key);
        assert_eq!(mass as usize, tree.len());
        assert_eq!(tree.num_leaves(), tree.num_branches() + 1);
    } else {
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.node_store().len(), 0);
    }
}

#[cfg(test)]
parameterized_test::create! { build_counts, (dimensions, num_points, seed), {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let points = normal_points(&mut rng, dimensions, num_points);
    let tree = Tree::build_with_seed(points.into_iter().enumerate(), seed).unwrap();
    assert_eq!(tree.len(), num_points);
    assert_eq!(tree.num_leaves(), num_points);
    assert_eq!(tree.num_branches(), num_points - 1);
    verify_tree(&tree);
}}

build_counts! {
    single: (2, 1, 0),
    small: (1, 5, 1),
    medium: (3, 100, 2),
    large: (10, 1000, 3),
}

#[test]
fn cached_values_after_every_mutation() {
    let mut rng = ChaCha20Rng::seed_from_u64(23);
    let points = normal_points(&mut rng, 3, 300);
    let mut tree: Tree<usize, f64> = Tree::new(3);
    tree.seed(23);

    // a sliding window of 64 points, with repeated coordinates every so often
    for (i, point) in points.iter().enumerate() {
        let point = if i % 10 == 9 { points[i - 5].clone() } else { point.clone() };
        tree.insert(i, point).unwrap();
        if i >= 64 {
            tree.delete(&(i - 64)).unwrap();
        }
        verify_tree(&tree);
    }
    assert_eq!(tree.len(), 64);
}

#[test]
fn insert_then_delete_is_identity() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let points = normal_points(&mut rng, 2, 50);
    let mut tree = Tree::build_with_seed(points.clone().into_iter().enumerate(), 5).unwrap();

    let outline = tree.to_string();
    let bounding_box = tree.bounding_box();
    let codisps: Vec<f64> = (0..50).map(|i| tree.codisp(&i).unwrap()).collect();

    for (label, point) in [(100, vec![0.1, 0.2]), (101, vec![9.0, -9.0]), (102, points[3].clone())] {
        tree.insert(label, point).unwrap();
        tree.delete(&label).unwrap();
        assert_eq!(tree.to_string(), outline);
        assert_eq!(tree.bounding_box(), bounding_box);
        for (i, codisp) in codisps.iter().enumerate() {
            assert_eq!(tree.codisp(&i).unwrap(), *codisp);
        }
        verify_tree(&tree);
    }
}

#[test]
fn duplicate_insertion_leaves_shape_untouched() {
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let points = normal_points(&mut rng, 4, 40);
    let mut tree = Tree::build_with_seed(points.clone().into_iter().enumerate(), 31).unwrap();
    let num_nodes = tree.node_store().len();
    let depths: Vec<usize> = (0..40).map(|i| tree.depth(&i).unwrap()).collect();

    tree.insert(1000, points[12].clone()).unwrap();
    assert_eq!(tree.node_store().len(), num_nodes);
    assert_eq!(tree.num_leaves(), 40);
    assert_eq!(tree.codisp(&1000), tree.codisp(&12));
    assert_eq!(tree.point(&1000), tree.point(&12));
    for (i, depth) in depths.iter().enumerate() {
        assert_eq!(tree.depth(&i).unwrap(), *depth);
    }
    verify_tree(&tree);
}

/// Builds trees on the points 0, 1, 3 and 7 of the real line and returns the
/// frequency of each tree shape. In one dimension the smaller values always
/// lie on the left, so the outline identifies the shape.
fn shape_frequencies<F>(num_trials: u64, make_tree: F) -> HashMap<String, f64>
where
    F: Fn(u64) -> Tree<usize, f64>,
{
    let mut counts: HashMap<String, f64> = HashMap::new();
    for seed in 0..num_trials {
        *counts.entry(make_tree(seed).to_string()).or_insert(0.0) += 1.0;
    }
    for count in counts.values_mut() {
        *count /= num_trials as f64;
    }
    counts
}

#[test]
fn insertion_matches_batch_distribution() {
    let values = [0.0, 1.0, 3.0, 7.0];
    let num_trials = 4000;

    let batch = shape_frequencies(num_trials, |seed| {
        let points = values.iter().enumerate().map(|(i, &x)| (i, vec![x]));
        Tree::build_with_seed(points, seed).unwrap()
    });
    let streamed = shape_frequencies(num_trials, |seed| {
        // build without the interior point 1.0, then stream it in
        let points = values.iter().enumerate().filter(|(i, _)| *i != 1).map(|(i, &x)| (i, vec![x]));
        let mut tree = Tree::build_with_seed(points, seed + num_trials).unwrap();
        tree.insert(1, vec![values[1]]).unwrap();
        tree
    });

    // first cut on [0, 7) splits {0} | {1, 3, 7} w.p. 1/7, {0, 1} | {3, 7}
    // w.p. 2/7 and {0, 1, 3} | {7} w.p. 4/7
    let expected: [f64; 5] = [1.0 / 21.0, 2.0 / 21.0, 2.0 / 7.0, 4.0 / 21.0, 8.0 / 21.0];
    assert_eq!(batch.len(), expected.len());
    let mut observed: Vec<f64> = batch.values().copied().collect();
    observed.sort_by(|a, b| a.total_cmp(b));
    let mut sorted_expected = expected.to_vec();
    sorted_expected.sort_by(|a, b| a.total_cmp(b));
    for (o, e) in observed.iter().zip(sorted_expected.iter()) {
        assert!((o - e).abs() < 0.04, "observed {} expected {}", o, e);
    }

    for (shape, frequency) in batch.iter() {
        let other = streamed.get(shape).copied().unwrap_or(0.0);
        assert!((frequency - other).abs() < 0.05, "shape\n{}batch {} streamed {}", shape, frequency, other);
    }
    assert_eq!(streamed.len(), batch.len());
}

#[test]
fn three_point_outlier() {
    let mut outlier_wins = 0;
    for seed in 0..500 {
        let points = vec![(0, vec![0.0, 0.0]), (1, vec![0.0, 1.0]), (2, vec![10.0, 10.0])];
        let mut tree: Tree<usize, f64> = Tree::build_with_seed(points, seed).unwrap();
        let (a, b, c) = (tree.codisp(&0).unwrap(), tree.codisp(&1).unwrap(), tree.codisp(&2).unwrap());
        for score in [a, b, c] {
            assert!((0.0..1.0).contains(&score));
        }
        if c > a && c > b {
            outlier_wins += 1;
        }

        tree.delete(&2).unwrap();
        assert_eq!(tree.codisp(&0), Ok(0.5));
        assert_eq!(tree.codisp(&1), Ok(0.5));
    }
    // the first cut isolates the outlier with probability 19/20
    assert!(outlier_wins > 450, "outlier won {} of 500", outlier_wins);
}

#[test]
fn errors_leave_tree_unchanged() {
    let mut tree: Tree<usize, f64> = Tree::new(2);
    assert_eq!(tree.codisp(&0), Err(RCFError::EmptyTree));
    assert_eq!(tree.delete(&0), Err(RCFError::EmptyTree));

    tree.insert(0, vec![0.0, 0.0]).unwrap();
    tree.insert(1, vec![1.0, 0.0]).unwrap();
    let outline = tree.to_string();

    assert_eq!(tree.insert(1, vec![5.0, 5.0]), Err(RCFError::DuplicateLabel));
    assert!(matches!(tree.insert(2, vec![5.0]), Err(RCFError::InvalidArgument { .. })));
    assert!(matches!(tree.insert(2, vec![5.0, f64::NEG_INFINITY]), Err(RCFError::InvalidArgument { .. })));
    assert!(matches!(tree.insert(2, vec![f64::MAX, -f64::MAX]), Err(RCFError::InvalidArgument { .. })));
    assert_eq!(tree.delete(&7), Err(RCFError::UnknownLabel));
    assert_eq!(tree.codisp(&7), Err(RCFError::UnknownLabel));

    assert_eq!(tree.to_string(), outline);
    assert_eq!(tree.len(), 2);
    verify_tree(&tree);
}
