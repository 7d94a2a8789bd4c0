use std::fmt;

use crate::types::Result;
use crate::util::check_argument;
use crate::RCFFloat;

/// Bounding box on collections on points.
///
/// Given a set of *d*-dimensional points, a bounding box is the smallest *d*-
/// dimensional rectangular prism containing all of these points. A bounding box
/// is represented by two vectors: the minimum and the maximum value along each
/// dimension. A dimension where every point shares the same coordinate has a
/// zero-length side.
///
/// # Examples
///
/// ```
/// use rrcflib::BoundingBox;
///
/// // create a new bounding box from a single point
/// let point: Vec<f32> = vec![1.0, 2.0];
/// let bbox = BoundingBox::new_from_point(&point);
/// assert_eq!(bbox.min_values(), &point[..]);
/// assert_eq!(bbox.max_values(), &point[..]);
///
/// // create a second bounding box by merging the first one with another point
/// let new_point = vec![3.0, -2.0];
/// let merged_bbox = BoundingBox::merged_box_with_point(&bbox, &new_point);
/// println!("{}", &merged_bbox);   // BoundingBox ([1.0, -2.0], [3.0, 2.0])
///
/// // confirm that the two points and the first bounding box are contained
/// // in this larger merged box
/// assert!(merged_bbox.contains_point(&point));
/// assert!(merged_bbox.contains_point(&new_point));
/// assert!(merged_bbox.contains_box(&bbox));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox<T> {
    min_values: Vec<T>,
    max_values: Vec<T>,
    range_sum: T,
}

impl<T> BoundingBox<T> where T: RCFFloat {

    /// Create a new bounding box from a min values vector and a max values
    /// vector.
    ///
    /// # Panics
    ///
    /// If the two vectors have different lengths.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::BoundingBox;
    ///
    /// let min = vec![-1.0, 0.0];
    /// let max = vec![1.0, 3.0];
    /// let bbox = BoundingBox::new(&min, &max);
    /// assert_eq!(bbox.dimensions(), 2);
    /// assert_eq!(bbox.range_sum(), 5.0);
    /// ```
    pub fn new(min_values: &[T], max_values: &[T]) -> Self {
        assert_eq!(min_values.len(), max_values.len());

        BoundingBox {
            min_values: min_values.to_vec(),
            max_values: max_values.to_vec(),
            range_sum: BoundingBox::compute_range_sum(min_values, max_values),
        }
    }

    /// Create a new bounding box from a single point.
    ///
    /// The resulting bounding box has no interior: its min values are equal to
    /// its max values. Therefore, its range sum is zero.
    pub fn new_from_point(point: &[T]) -> Self {
        BoundingBox {
            min_values: point.to_vec(),
            max_values: point.to_vec(),
            range_sum: T::zero(),
        }
    }

    /// Create the smallest bounding box covering every given point.
    ///
    /// Returns an `InvalidArgument` error when no points are given or when
    /// the points do not share one dimensionality.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::BoundingBox;
    ///
    /// let points = vec![vec![0.0, 5.0], vec![2.0, -1.0], vec![1.0, 1.0]];
    /// let bbox = BoundingBox::<f64>::from_points(&points).unwrap();
    /// assert_eq!(bbox.min_values(), &[0.0, -1.0]);
    /// assert_eq!(bbox.max_values(), &[2.0, 5.0]);
    ///
    /// let empty: Vec<Vec<f64>> = Vec::new();
    /// assert!(BoundingBox::<f64>::from_points(&empty).is_err());
    /// ```
    pub fn from_points<P: AsRef<[T]>>(points: &[P]) -> Result<Self> {
        check_argument(!points.is_empty(), "cannot bound an empty point set")?;
        let first = points[0].as_ref();
        let mut min_values = first.to_vec();
        let mut max_values = first.to_vec();
        for point in points[1..].iter() {
            let point = point.as_ref();
            check_argument(point.len() == first.len(), "point dimension mismatch")?;
            for i in 0..point.len() {
                min_values[i] = min_values[i].min(point[i]);
                max_values[i] = max_values[i].max(point[i]);
            }
        }
        Ok(BoundingBox::new(&min_values, &max_values))
    }

    /// Returns a new bounding box given by the merging of a bounding box with
    /// a point.
    ///
    /// If the point lies inside the bounding box then this returns a clone of
    /// the same bounding box.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::BoundingBox;
    ///
    /// let min = vec![0.0, 0.0];
    /// let max = vec![1.0, 1.0];
    /// let bbox = BoundingBox::new(&min, &max);
    ///
    /// let point = vec![0.5, 3.0];
    /// let merged = BoundingBox::merged_box_with_point(&bbox, &point);
    /// assert_eq!(merged.max_values(), &[1.0, 3.0]);
    /// assert_eq!(merged.range_sum(), 4.0);
    /// ```
    pub fn merged_box_with_point(bounding_box: &BoundingBox<T>, point: &[T]) -> Self {
        let min_values: Vec<T> = bounding_box.min_values.iter()
            .zip(point)
            .map(|(&x, &y)| x.min(y))
            .collect();

        let max_values: Vec<T> = bounding_box.max_values.iter()
            .zip(point)
            .map(|(&x, &y)| x.max(y))
            .collect();

        let range_sum = BoundingBox::compute_range_sum(&min_values, &max_values);
        BoundingBox { min_values, max_values, range_sum }
    }

    /// Returns a new bounding box given by the merging of two bounding boxes.
    ///
    /// The merging of two bounding boxes is given by two points. The first is
    /// the minimum value in each dimension. The second is the maximum value
    /// in each dimension. The points contained in both bounding boxes are also
    /// contained in this large bounding box.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::BoundingBox;
    ///
    /// let bbox1 = BoundingBox::new(&[0.0, 0.0], &[2.0, 2.0]);
    /// let bbox2 = BoundingBox::new(&[1.0, 1.0], &[3.0, 4.0]);
    ///
    /// let merged = BoundingBox::merged_box_with_box(&bbox1, &bbox2);
    /// assert_eq!(merged.min_values(), &[0.0, 0.0]);
    /// assert_eq!(merged.max_values(), &[3.0, 4.0]);
    /// assert_eq!(merged.range_sum(), 7.0);
    /// ```
    pub fn merged_box_with_box(
        bounding_box1: &BoundingBox<T>,
        bounding_box2: &BoundingBox<T>) -> Self
    {
        let min_values: Vec<T> = bounding_box1.min_values.iter()
            .zip(bounding_box2.min_values.iter())
            .map(|(&x, &y)| x.min(y))
            .collect();

        let max_values: Vec<T> = bounding_box1.max_values.iter()
            .zip(bounding_box2.max_values.iter())
            .map(|(&x, &y)| x.max(y))
            .collect();

        let range_sum = BoundingBox::compute_range_sum(&min_values, &max_values);
        BoundingBox { min_values, max_values, range_sum }
    }

    /// Get the dimensionality of the bounding box.
    pub fn dimensions(&self) -> usize { self.min_values.len() }

    /// Get the vector of min values of the bounding box.
    pub fn min_values(&self) -> &[T] { &self.min_values }

    /// Get the vector of max values of the bounding box.
    pub fn max_values(&self) -> &[T] { &self.max_values }

    /// Get the sum across all dimensions of lengths of the bounding box.
    pub fn range_sum(&self) -> T { self.range_sum }

    /// The `(min, max)` extent of the box along one dimension.
    pub fn range(&self, dimension: usize) -> (T, T) {
        (self.min_values[dimension], self.max_values[dimension])
    }

    /// Returns true if the given point is contained inside the bounding box
    pub fn contains_point(&self, point: &[T]) -> bool {
        for i in 0..self.dimensions() {
            if point[i] < self.min_values[i] || self.max_values[i] < point[i] {
                return false;
            }
        }
        true
    }

    /// Returns true if the given bounding box is contained inside this
    /// bounding box.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(&[0.0, 0.0], &[8.0, 8.0]);
    /// let small_bbox = BoundingBox::new(&[0.0, 1.0], &[2.0, 3.0]);
    /// assert!(bbox.contains_box(&small_bbox));
    ///
    /// let med_bbox = BoundingBox::new(&[4.0, 6.0], &[9.0, 7.0]);
    /// assert!(!bbox.contains_box(&med_bbox));
    /// ```
    pub fn contains_box(&self, bounding_box: &BoundingBox<T>) -> bool {
        for i in 0..self.dimensions() {
            let min = bounding_box.min_values[i];
            let max = bounding_box.max_values[i];
            if min < self.min_values[i] || self.max_values[i] < max {
                return false;
            }
        }
        true
    }

    /// Compute the range sum from a pair of min/max value vectors.
    ///
    /// The range sum is the sum of the differences between the min values and
    /// max values of the bounding box across each component. For example, if
    /// the min values are `[a, b]` and the max values are `[c, d]` then the
    /// range sum is equal to `(c - a) + (d - b)`.
    pub fn compute_range_sum(min_values: &[T], max_values: &[T]) -> T {
        assert_eq!(min_values.len(), max_values.len());
        min_values.iter().zip(max_values).map(|(&min, &max)| max - min).sum()
    }
}

impl<T> fmt::Display for BoundingBox<T>
    where T: RCFFloat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingBox ({:?}, {:?})", self.min_values, self.max_values)
    }
}
