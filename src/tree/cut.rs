use rand::Rng;

use crate::types::Result;
use crate::util::check_argument;
use crate::{BoundingBox, RCFFloat};

/// Side of a cut on which a point falls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Hyperplane cut inside a bounding box.
///
/// This data structure represents the "cut" part of random cut trees. A cut
/// is a hyperplane that partitions data points into two halves. When the cut
/// lies inside a bounding box it is guaranteed to result in two non-empty
/// partitions.
///
/// A cut consists of a `dimension` and a `value`. The dimension is the
/// dimension along which the normal vector of the cut points. Dimensions use
/// zero-based indexing. The value of the cut is the location along the
/// Cartesian axis where the cut is located. Points whose component is less
/// than or equal to the value lie to the left of the cut.
///
/// # Examples
///
/// ```
/// use rrcflib::Cut;
///
/// // create a new cut from a given dimension and value
/// let cut = Cut::new(1, 0.0);
///
/// // check if a some points are to the left or to the right of the cut
/// let p: Vec<f32> = vec![1.0, -1.0];
/// let q: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
/// assert!(Cut::is_left_of(&p, &cut));
/// assert!(!Cut::is_left_of(&q, &cut));
///
/// // generate a random cut inside a bounding box
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use rrcflib::BoundingBox;
///
/// let bbox = BoundingBox::new(&[0.0, 0.0, 0.0], &[2.0, 3.0, 4.0]);
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// let random_cut = Cut::new_random_cut(&bbox, &mut rng).unwrap();
///
/// // confirm that the random cut lies inside the bounding box
/// assert!(random_cut.dimension() <= 2);
/// assert!(bbox.min_values()[random_cut.dimension()] <= random_cut.value());
/// assert!(random_cut.value() < bbox.max_values()[random_cut.dimension()]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Cut<T> {
    dimension: usize,
    value: T,
}

impl<T> Cut<T>
    where T: RCFFloat
{

    /// Create a new cut from a given dimension and value.
    pub fn new(dimension: usize, value: T) -> Self {
        Cut {
            dimension: dimension,
            value: value
        }
    }

    /// Returns a random cut inside a bounding box.
    ///
    /// The dimension is chosen with probability proportional to the length
    /// of the box along that dimension and the value is uniform on
    /// `[min, max)` of the chosen dimension. Dimensions with zero length are
    /// never chosen, so the cut is guaranteed to split the box into two
    /// non-empty halves.
    ///
    /// Returns an `InvalidArgument` error when the box has no extent at all or
    /// its extent overflows.
    ///
    /// This function requires a random number generator: any struct that
    /// implements the [`rand::Rng`] trait from the [`rand`] crate.
    pub fn new_random_cut<R: Rng>(
        bounding_box: &BoundingBox<T>,
        rng: &mut R,
    ) -> Result<Self> {
        check_argument(
            bounding_box.range_sum() > T::zero(),
            "cannot cut a bounding box with no extent",
        )?;
        check_argument(
            bounding_box.range_sum().is_finite(),
            "bounding box extent overflows",
        )?;

        // rounding can push a sample onto the upper edge of its dimension;
        // such a sample is drawn again
        loop {
            if let Some(cut) = Cut::sample_cut(bounding_box, rng) {
                return Ok(cut);
            }
        }
    }

    fn sample_cut<R: Rng>(bounding_box: &BoundingBox<T>, rng: &mut R) -> Option<Self> {
        let random: f64 = rng.gen();
        let mut break_point: T = T::from(random)? * bounding_box.range_sum();

        for i in 0..bounding_box.dimensions() {
            let (min, max) = bounding_box.range(i);
            let range = max - min;
            if break_point < range {
                let cut_value = min + break_point;
                return if cut_value < max { Some(Cut::new(i, cut_value)) } else { None };
            }
            break_point = break_point - range;
        }
        None
    }

    /// Returns true if `point` is to the left of `cut`.
    ///
    /// This simply checks if the component of the point in the cut's dimension
    /// is less than or equal to the cut's value.
    pub fn is_left_of(point: &[T], cut: &Cut<T>) -> bool {
        point[cut.dimension] <= cut.value
    }

    /// Returns the side of this cut on which `point` falls.
    pub fn side_of(&self, point: &[T]) -> Side {
        if Cut::is_left_of(point, self) { Side::Left } else { Side::Right }
    }

    /// Decide whether this cut isolates `point` from a node whose points
    /// span `[min, max]` along the cut dimension.
    ///
    /// Returns the side the point lies on when the point and every point of
    /// the node fall on opposite sides of the cut, and `None` when the cut
    /// passes through the node's extent.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::{Cut, Side};
    ///
    /// // node points span [2, 5] on dimension 0
    /// let cut = Cut::new(0, 1.5);
    /// assert_eq!(cut.isolation_side(&[1.0], 2.0, 5.0), Some(Side::Left));
    ///
    /// let cut = Cut::new(0, 5.5);
    /// assert_eq!(cut.isolation_side(&[6.0], 2.0, 5.0), Some(Side::Right));
    ///
    /// let cut = Cut::new(0, 3.0);
    /// assert_eq!(cut.isolation_side(&[6.0], 2.0, 5.0), None);
    /// ```
    pub fn isolation_side(&self, point: &[T], min: T, max: T) -> Option<Side> {
        let x = point[self.dimension];
        if x <= self.value && self.value < min {
            Some(Side::Left)
        } else if max <= self.value && self.value < x {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Get the dimension of the cut.
    pub fn dimension(&self) -> usize { self.dimension }

    /// Get the value of the cut.
    pub fn value(&self) -> T { self.value }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_random_cut_skips_flat_dimensions() {
        let bbox = BoundingBox::new(&[1.0f64, 0.0, 4.0], &[1.0, 2.0, 4.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1000 {
            let cut = Cut::new_random_cut(&bbox, &mut rng).unwrap();
            assert_eq!(cut.dimension(), 1);
            assert!(0.0 <= cut.value() && cut.value() < 2.0);
        }
    }

    #[test]
    fn test_random_cut_on_point_box() {
        let bbox = BoundingBox::new_from_point(&[1.0f32, 2.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(Cut::new_random_cut(&bbox, &mut rng).is_err());
    }

    #[test]
    fn test_random_cut_dimension_frequencies() {
        // dimension 1 is three times as long as dimension 0
        let bbox = BoundingBox::new(&[0.0f64, 0.0], &[1.0, 3.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let trials = 20000;
        let ones = (0..trials)
            .filter(|_| Cut::new_random_cut(&bbox, &mut rng).unwrap().dimension() == 1)
            .count();
        let frequency = ones as f64 / trials as f64;
        assert!((frequency - 0.75).abs() < 0.02, "frequency = {}", frequency);
    }

    #[test]
    fn test_isolation_side_boundaries() {
        // a cut exactly on the node minimum does not isolate a point below
        let cut = Cut::new(0, 2.0f64);
        assert_eq!(cut.isolation_side(&[1.0], 2.0, 5.0), None);
        // a cut exactly on the node maximum isolates a point above
        let cut = Cut::new(0, 5.0f64);
        assert_eq!(cut.isolation_side(&[6.0], 2.0, 5.0), Some(Side::Right));
        // a point between the node's points is never isolated
        let cut = Cut::new(0, 3.5f64);
        assert_eq!(cut.isolation_side(&[3.0], 2.0, 5.0), None);
    }
}
