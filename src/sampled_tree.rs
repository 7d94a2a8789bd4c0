use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::trace;

use crate::tree::Tree;
use crate::types::Result;
use crate::{RCFFloat, SamplerResult, StreamSampler};

/// Combination of a tree and a reservoir sampler.
///
/// A random cut tree, represented by the [`Tree`] struct, is a data structure
/// for organizing labeled vectors using bounding boxes and random cuts. In a
/// random cut forest we may wish to limit the number of points contained in
/// each tree. This is done using a reservoir sampler. A `SampledTree`
/// coordinates insertions and deletions between a reservoir sampler, given by
/// a [`StreamSampler`], and the random cut tree: the tree always holds
/// exactly the labels held by the sampler.
///
/// # Examples
///
/// ```
/// use rrcflib::SampledTree;
///
/// // a sampled tree on two-dimensional points holding at most 32 labels
/// let mut tree: SampledTree<u32, f32> = SampledTree::new(2, Some(32), 0.01, 42).unwrap();
///
/// // every point is accepted until the sample size is reached
/// tree.update(0, vec![0.0, 0.0], 0).unwrap();
/// tree.update(1, vec![1.0, -1.0], 1).unwrap();
/// tree.update(2, vec![2.0, 3.0], 2).unwrap();
/// assert_eq!(tree.tree().len(), 3);
/// assert!(tree.contains(&1));
/// ```
pub struct SampledTree<L, T> {
    tree: Tree<L, T>,
    sampler: StreamSampler<L>,
}

/// Outcome of offering a labeled point to a [`SampledTree`].
#[derive(Clone, Debug, PartialEq)]
pub struct SampledUpdate<L> {
    /// True if the tree now holds the offered label.
    pub accepted: bool,
    /// Label evicted from the tree to make room, if any.
    pub evicted: Option<L>,
}

impl<L, T> SampledTree<L, T>
where
    L: Hash + Eq + Clone + Debug,
    T: RCFFloat,
{
    /// Create a new sampled tree.
    ///
    /// Specify the dimensionality of the points, the tree's `sample_size`
    /// (`None` keeps every point), the decay factor `time_decay` of the
    /// [`StreamSampler`], and a seed for both sources of randomness.
    pub fn new(
        dimensions: usize,
        sample_size: Option<usize>,
        time_decay: f64,
        seed: u64,
    ) -> Result<Self> {
        let mut sampled_tree = SampledTree {
            tree: Tree::new(dimensions),
            sampler: StreamSampler::new(sample_size, time_decay)?,
        };
        sampled_tree.seed(seed);
        Ok(sampled_tree)
    }

    /// Sets the seed of the `SampledTree`'s tree and stream sampler.
    ///
    /// Randomness is used in [`Tree`] for generating random cuts and in
    /// [`StreamSampler`] to determine which points are accepted into the
    /// sample. The two generators are seeded differently.
    pub fn seed(&mut self, seed: u64) {
        self.tree.seed(seed);
        self.sampler.seed(seed.rotate_left(32) ^ 0x5555_5555_5555_5555);
    }

    /// Offer a labeled point to the sampled tree.
    ///
    /// The stream sampler decides if the point will be accepted as a function
    /// of the decay factor and `sequence_index`. An accepted point may evict
    /// another label, which is deleted from the tree before the new point is
    /// inserted.
    ///
    /// The point is checked against the tree before it is offered to the
    /// sampler, so neither the sampler nor the tree changes on failure.
    pub fn update(&mut self, label: L, point: Vec<T>, sequence_index: usize) -> Result<SampledUpdate<L>> {
        self.tree.check_insertion(&label, &point)?;
        match self.sampler.sample(label.clone(), sequence_index) {
            SamplerResult::Ignored => Ok(SampledUpdate { accepted: false, evicted: None }),
            SamplerResult::Accepted(evicted) => {
                let evicted = match evicted {
                    Some(sample) => {
                        let evicted_label = sample.into_value();
                        trace!(label = ?evicted_label, "evicting label");
                        self.tree.delete(&evicted_label)?;
                        Some(evicted_label)
                    }
                    None => None,
                };
                self.tree.insert(label, point)?;
                Ok(SampledUpdate { accepted: true, evicted: evicted })
            }
        }
    }

    /// Populate the empty sampled tree from a batch of labeled points.
    ///
    /// Every point is offered to the sampler in order, numbered from
    /// `first_sequence_index`; the tree is then built in one pass from the
    /// points the sampler retained. Returns the retained labels.
    pub fn populate(
        &mut self,
        points: &[(L, Vec<T>)],
        first_sequence_index: usize,
    ) -> Result<HashSet<L>> {
        for (i, (label, _)) in points.iter().enumerate() {
            self.sampler.sample(label.clone(), first_sequence_index + i);
        }
        let retained: HashSet<L> = self.sampler.iter().map(|s| s.value().clone()).collect();
        if !retained.is_empty() {
            let batch = points
                .iter()
                .filter(|(label, _)| retained.contains(label))
                .map(|(label, point)| (label.clone(), point.clone()));
            self.tree.populate(batch)?;
        }
        Ok(retained)
    }

    /// Delete a label from the tree and the sampler. Returns false if the
    /// tree does not hold the label.
    pub fn delete(&mut self, label: &L) -> Result<bool> {
        if !self.tree.contains(label) {
            return Ok(false);
        }
        self.sampler.remove(label);
        self.tree.delete(label)?;
        Ok(true)
    }

    /// Returns true if the tree holds `label`.
    pub fn contains(&self, label: &L) -> bool { self.tree.contains(label) }

    /// Collusive displacement of `label` in this tree, or `None` if the tree
    /// does not hold it.
    pub fn codisp(&self, label: &L) -> Result<Option<f64>> {
        if !self.tree.contains(label) {
            return Ok(None);
        }
        self.tree.codisp(label).map(Some)
    }

    pub fn tree(&self) -> &Tree<L, T> { &self.tree }

    pub fn sampler(&self) -> &StreamSampler<L> { &self.sampler }
}
