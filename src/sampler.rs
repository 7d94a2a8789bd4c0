//! Random sampling of labels from a stream.
//!
//! A stream sampler is a mechanism for maintaining a bounded random sample
//! from a stream of data. Specifically, we maintain "weighted samples": data
//! samples that have assigned to them a "weight" which is proportional to the
//! probability that the value will be kept in the sample. This allows for
//! time-decay random sampling where we prefer to keep recently observed
//! samples.
//!
//! ```
//! use rrcflib::{SamplerResult, StreamSampler};
//!
//! // create a sampler that can contain two elements with a time decay
//! // parameter large enough that it should be very rare for a new value
//! // to not be accepted
//! let mut sampler = StreamSampler::new(Some(2), 100000.0).unwrap();
//! sampler.seed(0);
//!
//! // sample a new value. this is guaranteed to be sampled as long as
//! // the sampler is not full
//! match sampler.sample("hello", 10) {
//!     SamplerResult::Accepted(evicted) => assert!(evicted.is_none()),
//!     SamplerResult::Ignored => panic!(),
//! }
//! assert!(sampler.contains(&"hello"));
//!
//! match sampler.sample("world", 20) {
//!     SamplerResult::Accepted(evicted) => assert!(evicted.is_none()),
//!     SamplerResult::Ignored => panic!(),
//! }
//!
//! // the sampler is full, but because of the large decay parameter, it is
//! // almost guaranteed that the third sample will be accepted
//! match sampler.sample("I'm taking over", 123) {
//!     SamplerResult::Accepted(evicted) => assert_eq!(evicted.unwrap().value(), &"hello"),
//!     SamplerResult::Ignored => panic!(),
//! }
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use std::cmp::Ordering;
use std::collections::binary_heap;
use std::collections::BinaryHeap;

use crate::types::Result;
use crate::util::check_argument;

/// Weighted samples stored in a stream sampler.
///
/// Weighted samples store a value along with a weight. Within a sampler,
/// weighted samples are ranked by their weight and the sample with the
/// largest weight is the first to be evicted.
///
/// # Examples
///
/// ```
/// use rrcflib::WeightedSample;
///
/// let x = WeightedSample::new("Hello, ", 42.0);
/// let y = WeightedSample::new("world.", 123.0);
/// let z = WeightedSample::new("Same weight as 'Hello'", 42.0);
///
/// assert!(x < y);
/// assert!(x == z);
/// ```
#[derive(Debug)]
pub struct WeightedSample<T> {
    value: T,
    weight: f64,
}

impl<T> WeightedSample<T> {
    pub fn new(value: T, weight: f64) -> Self {
        WeightedSample {
            value: value,
            weight: weight,
        }
    }

    /// Get the value stored in the weighted sample.
    pub fn value(&self) -> &T { &self.value }

    /// Consume the weighted sample, returning its value.
    pub fn into_value(self) -> T { self.value }

    /// Get the weight of the sample.
    pub fn weight(&self) -> f64 { self.weight }
}

/// Weighted samples are ordered by their weight so that they can be stored
/// in a [`BinaryHeap`]. Weights are never NaN, which makes the order total.
impl<T> Ord for WeightedSample<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight.partial_cmp(&other.weight).unwrap_or(Ordering::Equal)
    }
}

impl<T> PartialOrd for WeightedSample<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for WeightedSample<T> {
    fn eq(&self, other: &Self) -> bool {
        self.weight.eq(&other.weight)
    }
}

impl<T> Eq for WeightedSample<T> { }


/// Returned when a stream sampler is offered a new value.
///
/// When [`StreamSampler::sample`] is called with a new value, the value is
/// either ignored or accepted into the sampler. If accepted, a weighted sample
/// might be evicted from the sampler.
#[derive(Debug)]
pub enum SamplerResult<T> {
    Ignored,
    Accepted(Option<WeightedSample<T>>),
}

/// Maintains a bounded random sample from a data stream.
///
/// When a new value is submitted to the sampler it decides whether to accept
/// the value into the sample. The decision is based on the current number of
/// samples as well as the weights of these samples. Newer values, indicated by
/// their sequence index, are assigned a smaller weight than older values and
/// are therefore more likely to be kept.
///
/// This sampler is based on a weighted reservoir sampling algorithm with a
/// time decay parameter `time_decay`. When `time_decay == 0.0`, samples are
/// uniformly retained; that is, given `N` observations a sampler of size `S`
/// keeps `S` samples distributed uniformly across the `N` observations
/// without replacement. A sampler without a sample size accepts every value.
///
/// # Examples
///
/// ```
/// use rrcflib::{SamplerResult, StreamSampler};
///
/// // create a seeded stream sampler on strings
/// let mut sampler: StreamSampler<&str> = StreamSampler::new(Some(2), 123.4).unwrap();
/// sampler.seed(42);
/// assert_eq!(sampler.capacity(), Some(2));
///
/// // add a sample to the empty stream sampler with a sequence index of zero
/// sampler.sample("Hello", 0);
/// assert!(!sampler.is_full());
/// assert_eq!(sampler.size(), 1);
/// assert_eq!(sampler.num_observations(), 1);
///
/// // until the sampler is full it will always return an `Accepted` result
/// let result = sampler.sample(", world!", 1);
/// assert!(sampler.is_full());
/// assert!(matches!(result, SamplerResult::Accepted(None)));
///
/// // a sample can also be withdrawn explicitly
/// assert!(sampler.remove(&"Hello"));
/// assert_eq!(sampler.size(), 1);
/// ```
#[derive(Debug)]
pub struct StreamSampler<T> {
    weighted_samples: BinaryHeap<WeightedSample<T>>,
    sample_size: Option<usize>,
    num_observations: usize,
    time_decay: f64,
    rng: ChaCha8Rng,
}


impl<T: PartialEq> StreamSampler<T> {

    /// Create a new stream sampler.
    ///
    /// `sample_size` is the number of samples that the stream sampler can
    /// store, or `None` for no limit. `time_decay` indicates how aggressively
    /// the sampler favors keeping more recently observed samples.
    ///
    /// Fails with `InvalidArgument` on a zero sample size or a negative or
    /// non-finite decay.
    pub fn new(sample_size: Option<usize>, time_decay: f64) -> Result<Self> {
        check_argument(sample_size != Some(0), "sample size must be positive")?;
        check_argument(
            time_decay >= 0.0 && time_decay.is_finite(),
            "time decay must be non-negative and finite",
        )?;

        Ok(StreamSampler {
            weighted_samples: BinaryHeap::with_capacity(sample_size.unwrap_or(0)),
            sample_size: sample_size,
            num_observations: 0,
            time_decay: time_decay,
            rng: ChaCha8Rng::from_entropy(),
        })
    }

    /// Reset the stream sampler's random number generator with a specified
    /// seed.
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Sample a new value with a given sequence index.
    ///
    /// A value along with `sequence_index`, indicating the relative order of
    /// this value to other observed values, is provided to be a candidate
    /// addition to this sample. If the value is **not** sampled then a
    /// [`SamplerResult::Ignored`] is returned by this function. Otherwise,
    /// a [`SamplerResult::Accepted`] is returned containing the sample that
    /// had to be evicted in order to make room for the new value, if any.
    pub fn sample(&mut self, value: T, sequence_index: usize) -> SamplerResult<T> {
        let weight = self.compute_weight(sequence_index);
        self.num_observations += 1;

        // determine if we should accept the new value into the sample
        let accept_sample = !self.is_full() || match self.weighted_samples.peek() {
            Some(sample) => weight < sample.weight(),
            None => false,
        };

        // if accepted, add to samples and evict a sample if necessary
        if accept_sample {
            let evicted_sample = match self.is_full() {
                true => self.weighted_samples.pop(),
                false => None,
            };
            self.weighted_samples.push(WeightedSample::new(value, weight));
            return SamplerResult::Accepted(evicted_sample);
        }

        SamplerResult::Ignored
    }

    /// Remove a value from the sample. Returns true if it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        let size = self.weighted_samples.len();
        self.weighted_samples.retain(|sample| sample.value() != value);
        self.weighted_samples.len() < size
    }

    /// Returns true if `value` is currently sampled.
    pub fn contains(&self, value: &T) -> bool {
        self.weighted_samples.iter().any(|sample| sample.value() == value)
    }

    /// Transform a sequence index to a weight using this sampler's decay factor.
    ///
    /// Given a sequence index `n`, the priority of a sample is `u^(1/w)` with
    /// `u` uniform on `(0, 1)` and `w = exp(lambda * n)`, where `lambda` is
    /// the decay parameter; the sampler keeps the samples of largest
    /// priority. The returned weight is `-log(-log(priority))`, which orders
    /// samples the opposite way and is numerically stable: the more negative
    /// the weight the more likely the value is kept.
    pub fn compute_weight(&mut self, sequence_index: usize) -> f64 {
        let random: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        -(sequence_index as f64) * self.time_decay + (-random.ln()).ln()
    }

    /// Returns an iterator on the elements of the sampler.
    ///
    /// The weighted samples are visited in arbitrary order.
    pub fn iter(&self) -> binary_heap::Iter<'_, WeightedSample<T>> {
        self.weighted_samples.iter()
    }

    pub fn num_observations(&self) -> usize { self.num_observations }
    pub fn is_full(&self) -> bool {
        self.sample_size.map_or(false, |size| self.weighted_samples.len() >= size)
    }
    pub fn capacity(&self) -> Option<usize> { self.sample_size }
    pub fn size(&self) -> usize { self.weighted_samples.len() }
    pub fn time_decay(&self) -> f64 { self.time_decay }
}
