extern crate rand;
extern crate rand_chacha;
extern crate rrcflib;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rrcflib::{RandomCutForest, RandomCutForestBuilder, Reducer, Result, Tree};

/// Scores a small random point set with a single tree, then a periodic
/// stream with an injected anomaly with a forest of sampled trees.
///
/// Set `RUST_LOG=rrcflib=debug` to see the library's logging.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut rng = ChaCha20Rng::seed_from_u64(17);

    // a single tree on ten points in the unit square
    let points: Vec<(String, Vec<f64>)> = (0..10)
        .map(|i| (i.to_string(), vec![rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)]))
        .collect();
    let mut tree: Tree<String, f64> = Tree::build_with_seed(points, 17)?;
    tree.insert("random".to_string(), vec![1.0, 2.0])?;
    println!("{}", tree);
    println!("codisp(random) = {:.4}", tree.codisp(&"random".to_string())?);

    // a forest on a shingled sine wave
    let num_trees = 40;
    let sample_size = 256;
    let shingle_size = 4;
    let data_size = 2000;
    let anomaly_at = 1500;

    let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(shingle_size)
        .num_trees(num_trees)
        .sample_size(sample_size)
        .reducer(Reducer::Mean)
        .random_seed(42)
        .parallel_enabled(true)
        .build()?;

    let signal: Vec<f64> = (0..data_size + shingle_size)
        .map(|t| {
            let value = 50.0 * (2.0 * std::f64::consts::PI * t as f64 / 100.0).sin();
            let noise: f64 = rng.gen_range(-1.0..1.0);
            if t == anomaly_at { value + 80.0 } else { value + noise }
        })
        .collect();

    let mut top: (usize, f64) = (0, 0.0);
    for t in 0..data_size {
        let shingle = signal[t..t + shingle_size].to_vec();
        if forest.insert(t, shingle)? == 0 {
            continue;
        }
        let score = forest.codisp(&t)?;
        if t > sample_size && score > top.1 {
            top = (t, score);
        }
    }
    println!(
        "highest codisp {:.4} at t = {} (anomaly injected at t = {})",
        top.1, top.0, anomaly_at
    );
    Ok(())
}
