use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_core::RngCore;
use rayon::prelude::*;

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::errors::RCFError;
use crate::sampled_tree::{SampledTree, SampledUpdate};
use crate::types::Result;
use crate::util::{check_argument, check_point};
use crate::RCFFloat;

/// Aggregation of per-tree scores into a forest score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reducer {
    /// Arithmetic mean of the tree scores.
    #[default]
    Mean,
    /// Median of the tree scores; the mean of the two middle scores for an
    /// even number of trees.
    Median,
    /// Largest tree score.
    Max,
}

impl Reducer {
    /// Reduce a collection of scores, or `None` if there are no scores.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Reducer;
    ///
    /// let scores = vec![0.5, 0.25, 0.125, 0.875];
    /// assert_eq!(Reducer::Mean.reduce(scores.clone()), Some(0.4375));
    /// assert_eq!(Reducer::Median.reduce(scores.clone()), Some(0.375));
    /// assert_eq!(Reducer::Max.reduce(scores), Some(0.875));
    /// assert_eq!(Reducer::Median.reduce(Vec::new()), None);
    /// ```
    pub fn reduce(&self, mut scores: Vec<f64>) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        let reduced = match self {
            Reducer::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
            Reducer::Median => {
                scores.sort_by(|a, b| a.total_cmp(b));
                let mid = scores.len() / 2;
                if scores.len() % 2 == 0 {
                    (scores[mid - 1] + scores[mid]) / 2.0
                } else {
                    scores[mid]
                }
            }
            Reducer::Max => scores.into_iter().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(reduced)
    }
}

/// A robust random cut forest.
///
/// A forest is an ordered collection of random cut trees; specifically a
/// collection of [`SampledTree`]s. Inserting a labeled point offers it to
/// every tree, each of which independently decides whether to accept the
/// point into its sample. The collusive displacement of a label is computed
/// in every tree holding it and the scores are aggregated with the forest's
/// [`Reducer`].
///
/// Points are validated before any tree is touched, so a failed operation
/// leaves the forest unchanged. When parallelism is enabled the per-tree work
/// is distributed with `rayon`.
///
/// It is recommended to use [`RandomCutForestBuilder`] to create a new
/// [`RandomCutForest`] model.
///
/// # Examples
///
/// ```
/// use rrcflib::{RandomCutForest, RandomCutForestBuilder};
///
/// // create a random cut forest on two-dimensional data points
/// let mut forest: RandomCutForest<usize, f64> = RandomCutForestBuilder::new(2)
///     .num_trees(20)
///     .random_seed(42)
///     .build()
///     .unwrap();
///
/// // insert some data points
/// for i in 0..20 {
///     forest.insert(i, vec![(i % 5) as f64, (i / 5) as f64]).unwrap();
/// }
/// forest.insert(100, vec![30.0, -30.0]).unwrap();
///
/// // the outlier scores higher than a point in the grid
/// assert!(forest.codisp(&100).unwrap() > forest.codisp(&7).unwrap());
/// ```
pub struct RandomCutForest<L, T> {
    dimensions: usize,
    num_trees: usize,
    sample_size: Option<usize>,
    time_decay: f64,
    reducer: Reducer,
    parallel_enabled: bool,
    num_observations: usize,
    rng: ChaCha20Rng,
    holders: HashMap<L, usize>,
    trees: Vec<SampledTree<L, T>>,
}

impl<L, T> RandomCutForest<L, T>
where
    L: Hash + Eq + Clone + Debug + Send + Sync,
    T: RCFFloat,
{
    fn new_trees(
        dimensions: usize,
        num_trees: usize,
        sample_size: Option<usize>,
        time_decay: f64,
        rng: &mut ChaCha20Rng,
    ) -> Result<Vec<SampledTree<L, T>>> {
        check_argument(num_trees > 0, "number of trees must be positive")?;
        (0..num_trees)
            .map(|_| SampledTree::new(dimensions, sample_size, time_decay, rng.next_u64()))
            .collect()
    }

    /// Reset the forest to a fresh, empty configuration.
    ///
    /// All trees and labels are discarded. The dimensionality, decay and
    /// parallelism settings are kept; new trees draw their seeds from the
    /// forest's generator.
    pub fn configure(
        &mut self,
        num_trees: usize,
        sample_size: Option<usize>,
        reducer: Reducer,
    ) -> Result<()> {
        let trees = RandomCutForest::<L, T>::new_trees(
            self.dimensions, num_trees, sample_size, self.time_decay, &mut self.rng)?;
        debug!(num_trees, ?sample_size, ?reducer, "configuring random cut forest");

        self.trees = trees;
        self.num_trees = num_trees;
        self.sample_size = sample_size;
        self.reducer = reducer;
        self.num_observations = 0;
        self.holders.clear();
        Ok(())
    }

    /// Insert a labeled point into the forest.
    ///
    /// The point is offered to every tree. Returns the number of trees that
    /// accepted it, which is every tree when the forest has no sample size.
    ///
    /// Fails with `InvalidArgument` for a malformed point and `DuplicateLabel`
    /// if the label is already held by some tree; nothing is modified on
    /// failure.
    pub fn insert(&mut self, label: L, point: Vec<T>) -> Result<usize> {
        check_point(&point, self.dimensions)?;
        if self.holders.contains_key(&label) {
            return Err(RCFError::DuplicateLabel);
        }
        // every tree must accept the point before any of them is updated
        if self.parallel_enabled {
            self.trees.par_iter().try_for_each(|t| t.tree().check_insertion(&label, &point))?;
        } else {
            self.trees.iter().try_for_each(|t| t.tree().check_insertion(&label, &point))?;
        }

        let sequence_index = self.num_observations;
        let updates: Vec<SampledUpdate<L>> = if self.parallel_enabled {
            self.trees
                .par_iter_mut()
                .map(|t| t.update(label.clone(), point.clone(), sequence_index))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.trees
                .iter_mut()
                .map(|t| t.update(label.clone(), point.clone(), sequence_index))
                .collect::<Result<Vec<_>>>()?
        };
        self.num_observations += 1;

        let mut num_accepted = 0;
        for update in updates {
            if let Some(evicted) = update.evicted {
                self.release(&evicted);
            }
            if update.accepted {
                num_accepted += 1;
            }
        }
        if num_accepted > 0 {
            self.holders.insert(label.clone(), num_accepted);
        }
        trace!(?label, num_accepted, "inserted point into forest");
        Ok(num_accepted)
    }

    /// Decrements the number of trees holding `label`, forgetting the label
    /// when no tree holds it anymore.
    fn release(&mut self, label: &L) {
        if let Some(count) = self.holders.get_mut(label) {
            *count -= 1;
            if *count == 0 {
                self.holders.remove(label);
                debug!(?label, "label evicted from every tree");
            }
        }
    }

    /// Delete a label from every tree holding it.
    ///
    /// Fails with `UnknownLabel` if no tree holds the label.
    pub fn delete(&mut self, label: &L) -> Result<()> {
        if !self.holders.contains_key(label) {
            return Err(RCFError::UnknownLabel);
        }
        if self.parallel_enabled {
            self.trees.par_iter_mut().try_for_each(|t| t.delete(label).map(|_| ()))?;
        } else {
            self.trees.iter_mut().try_for_each(|t| t.delete(label).map(|_| ()))?;
        }
        self.holders.remove(label);
        trace!(?label, "deleted point from forest");
        Ok(())
    }

    /// Collusive displacement of `label` reduced over the trees holding it.
    ///
    /// Fails with `UnknownLabel` if no tree holds the label.
    pub fn codisp(&self, label: &L) -> Result<f64> {
        if !self.holders.contains_key(label) {
            return Err(RCFError::UnknownLabel);
        }
        let scores: Vec<Option<f64>> = if self.parallel_enabled {
            self.trees
                .par_iter()
                .map(|t| t.codisp(label))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.trees
                .iter()
                .map(|t| t.codisp(label))
                .collect::<Result<Vec<_>>>()?
        };
        let scores: Vec<f64> = scores.into_iter().flatten().collect();
        self.reducer.reduce(scores).ok_or(RCFError::UnknownLabel)
    }

    /// Collusive displacement of `label` in every tree, `None` for the trees
    /// that do not hold it.
    pub fn codisp_per_tree(&self, label: &L) -> Result<Vec<Option<f64>>> {
        if !self.holders.contains_key(label) {
            return Err(RCFError::UnknownLabel);
        }
        self.trees.iter().map(|t| t.codisp(label)).collect()
    }

    /// Returns true if some tree holds `label`.
    pub fn contains(&self, label: &L) -> bool { self.holders.contains_key(label) }

    /// Number of labels held by at least one tree.
    pub fn len(&self) -> usize { self.holders.len() }

    pub fn is_empty(&self) -> bool { self.holders.is_empty() }

    /// Number of trees holding `label`.
    pub fn num_holders(&self, label: &L) -> usize {
        self.holders.get(label).copied().unwrap_or(0)
    }

    /// Return the dimensionality of the points accepted by this forest.
    pub fn dimensions(&self) -> usize { self.dimensions }

    /// Return the number of trees in this forest.
    pub fn num_trees(&self) -> usize { self.num_trees }

    /// Return the maximum number of labels held by each tree.
    pub fn sample_size(&self) -> Option<usize> { self.sample_size }

    /// Return the decay factor of the random samplers used by the forest's trees.
    pub fn time_decay(&self) -> f64 { self.time_decay }

    pub fn reducer(&self) -> Reducer { self.reducer }

    pub fn is_parallel_enabled(&self) -> bool { self.parallel_enabled }

    /// Return the total number of points inserted into this forest.
    pub fn num_observations(&self) -> usize { self.num_observations }

    /// Return the trees of the forest.
    pub fn trees(&self) -> &[SampledTree<L, T>] { &self.trees }
}


/// Convenient mechanism for creating [`RandomCutForest`]s.
///
/// The builder has the following required parameters for initialization:
///
/// * `dimensions`
///
/// The builder uses the following defaults for the remaining parameters:
///
/// * `num_trees = 50`
/// * `sample_size = None`, every tree holds every point
/// * `time_decay = 0.0`
/// * `reducer = Reducer::Mean`
/// * `random_seed`, drawn from the operating system
/// * `parallel_enabled = false`
///
/// # Examples
///
/// ```
/// use rrcflib::{RandomCutForest, RandomCutForestBuilder, Reducer};
///
/// // create the default random cut forest on three-dimensional data points
/// let forest = RandomCutForestBuilder::<u64, f32>::new(3).build().unwrap();
/// assert_eq!(forest.dimensions(), 3);
/// assert_eq!(forest.num_trees(), 50);
/// assert_eq!(forest.sample_size(), None);
/// assert_eq!(forest.time_decay(), 0.0);
/// assert_eq!(forest.reducer(), Reducer::Mean);
///
/// // create a forest with specified parameters. you can also specify the
/// // label and point types by annotating the target variable
/// let forest: RandomCutForest<u64, f32> = RandomCutForestBuilder::new(3)
///     .num_trees(20)
///     .sample_size(128)
///     .time_decay(0.01)
///     .reducer(Reducer::Median)
///     .parallel_enabled(true)
///     .build()
///     .unwrap();
/// assert_eq!(forest.num_trees(), 20);
/// assert_eq!(forest.sample_size(), Some(128));
/// assert_eq!(forest.time_decay(), 0.01);
/// assert!(forest.is_parallel_enabled());
/// ```
pub struct RandomCutForestBuilder<L, T> {
    dimensions: usize,
    num_trees: usize,
    sample_size: Option<usize>,
    time_decay: f64,
    reducer: Reducer,
    random_seed: Option<u64>,
    parallel_enabled: bool,
    _types: PhantomData<(L, T)>,
}

impl<L, T> RandomCutForestBuilder<L, T>
where
    L: Hash + Eq + Clone + Debug + Send + Sync,
    T: RCFFloat,
{
    /// Initialize a random cut forest builder.
    ///
    /// The only required parameter is the dimensionality of the points.
    /// Reasonable defaults are used for other parameters.
    pub fn new(dimensions: usize) -> Self {
        RandomCutForestBuilder {
            dimensions: dimensions,
            num_trees: 50,
            sample_size: None,
            time_decay: 0.0,
            reducer: Reducer::default(),
            random_seed: None,
            parallel_enabled: false,
            _types: PhantomData,
        }
    }

    /// Set the number of trees used in the random cut forest.
    pub fn num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    /// Set the number of labels retained by each tree in the random cut forest.
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    /// Set the random sampling decay factor of the random cut forest.
    pub fn time_decay(mut self, time_decay: f64) -> Self {
        self.time_decay = time_decay;
        self
    }

    /// Set the aggregation of per-tree scores.
    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    /// Seed the forest; trees and samplers draw their seeds from it.
    pub fn random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = Some(random_seed);
        self
    }

    /// Distribute per-tree work over the `rayon` thread pool.
    pub fn parallel_enabled(mut self, parallel_enabled: bool) -> Self {
        self.parallel_enabled = parallel_enabled;
        self
    }

    /// Build an empty random cut forest using the parameters set by the
    /// builder.
    ///
    /// Fails with `InvalidArgument` on zero trees, a zero sample size, or a
    /// negative decay.
    pub fn build(self) -> Result<RandomCutForest<L, T>> {
        let mut rng = match self.random_seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let trees = RandomCutForest::<L, T>::new_trees(
            self.dimensions, self.num_trees, self.sample_size, self.time_decay, &mut rng)?;
        debug!(
            dimensions = self.dimensions,
            num_trees = self.num_trees,
            sample_size = ?self.sample_size,
            "built random cut forest"
        );

        Ok(RandomCutForest {
            dimensions: self.dimensions,
            num_trees: self.num_trees,
            sample_size: self.sample_size,
            time_decay: self.time_decay,
            reducer: self.reducer,
            parallel_enabled: self.parallel_enabled,
            num_observations: 0,
            rng: rng,
            holders: HashMap::new(),
            trees: trees,
        })
    }

    /// Build a random cut forest and populate it from a batch of labeled
    /// points.
    ///
    /// Each tree's sampler is offered the points in order and the tree is
    /// built in one pass from the points it retains. All points are validated
    /// first: a malformed point fails with `InvalidArgument` and a repeated
    /// label with `DuplicateLabel`.
    pub fn build_from(self, points: Vec<(L, Vec<T>)>) -> Result<RandomCutForest<L, T>> {
        let mut seen: HashSet<&L> = HashSet::with_capacity(points.len());
        for (label, point) in points.iter() {
            check_point(point, self.dimensions)?;
            if !seen.insert(label) {
                return Err(RCFError::DuplicateLabel);
            }
        }

        let mut forest = self.build()?;
        let retained: Vec<HashSet<L>> = if forest.parallel_enabled {
            forest.trees
                .par_iter_mut()
                .map(|t| t.populate(&points, 0))
                .collect::<Result<Vec<_>>>()?
        } else {
            forest.trees
                .iter_mut()
                .map(|t| t.populate(&points, 0))
                .collect::<Result<Vec<_>>>()?
        };
        for label in retained.into_iter().flatten() {
            *forest.holders.entry(label).or_insert(0) += 1;
        }
        forest.num_observations = points.len();
        debug!(num_points = points.len(), num_labels = forest.holders.len(), "populated random cut forest");
        Ok(forest)
    }
}
