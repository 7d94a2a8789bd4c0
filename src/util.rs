use crate::{errors::RCFError, types::Result, RCFFloat};

/// If the test condition is false, return an InvalidArgument error with
/// the given error message. Otherwise return Ok.
pub(crate) fn check_argument(test: bool, msg: &'static str) -> Result<()> {
    if test {
        Ok(())
    } else {
        Err(RCFError::InvalidArgument { msg: msg })
    }
}

/// Checks that a point has the expected dimensionality and only finite
/// components.
pub(crate) fn check_point<T: RCFFloat>(point: &[T], dimensions: usize) -> Result<()> {
    check_argument(point.len() == dimensions, "point dimension mismatch")?;
    check_argument(point.iter().all(|x| x.is_finite()), "numbers should be finite")
}

/// Round every component to the given number of decimals, ties to even.
/// Components too large to scale are left as they are.
pub(crate) fn round_point<T: RCFFloat>(point: &mut [T], decimals: u32) {
    let scale = T::from(10f64.powi(decimals as i32)).unwrap_or_else(T::one);
    for x in point.iter_mut() {
        let scaled = *x * scale;
        if !scaled.is_finite() {
            continue;
        }
        let mut rounded = scaled.round();
        // `round` breaks ties away from zero
        if (scaled - scaled.trunc()).abs() == T::from(0.5).unwrap_or_else(T::zero)
            && rounded % (T::one() + T::one()) != T::zero()
        {
            rounded = rounded - scaled.signum();
        }
        *x = rounded / scale;
    }
}

/// Hashable key of a coordinate vector; `-0.0` and `0.0` map to the same key.
pub(crate) fn point_key<T: RCFFloat>(point: &[T]) -> Vec<(u64, i16, i8)> {
    point.iter().map(|&x| (x + T::zero()).integer_decode()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_point() {
        assert!(check_point(&[1.0f64, 2.0], 2).is_ok());
        assert_eq!(
            check_point(&[1.0f64], 2),
            Err(RCFError::InvalidArgument { msg: "point dimension mismatch" })
        );
        assert!(check_point(&[1.0f64, f64::NAN], 2).is_err());
        assert!(check_point(&[f32::INFINITY, 0.0], 2).is_err());
    }

    #[test]
    fn test_round_point() {
        let mut point = vec![0.125f64, -1.23456, 2.5];
        round_point(&mut point, 2);
        assert_eq!(point, vec![0.12, -1.23, 2.5]);

        let mut point = vec![2.5f64, 3.5, -2.5];
        round_point(&mut point, 0);
        assert_eq!(point, vec![2.0, 4.0, -2.0]);

        let mut point = vec![1.7e308f64, -0.5];
        round_point(&mut point, 3);
        assert_eq!(point, vec![1.7e308, -0.5]);
    }

    #[test]
    fn test_point_key_signed_zero() {
        assert_eq!(point_key(&[0.0f64, 1.0]), point_key(&[-0.0f64, 1.0]));
        assert_ne!(point_key(&[0.0f64, 1.0]), point_key(&[0.0f64, 1.5]));
    }
}
