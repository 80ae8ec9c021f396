//! Histogram intersection similarity.

use crate::error::HistogramError;
use crate::histogram::Histogram;

/// Histogram intersection: the sum of element-wise minima.
///
/// Higher is more similar. Both histograms must have the same number of bins.
pub fn intersection(query: &Histogram, candidate: &Histogram) -> Result<f32, HistogramError> {
    if query.len() != candidate.len() {
        return Err(HistogramError::LengthMismatch {
            query: query.len(),
            candidate: candidate.len(),
        });
    }

    Ok(query
        .bins()
        .iter()
        .zip(candidate.bins())
        .map(|(q, c)| q.min(*c))
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_intersection_is_mass() {
        let h = Histogram::new("a.jpg", vec![0.0, 0.25, 0.5, 0.125, 0.125]);
        let score = intersection(&h, &h).unwrap();
        assert_eq!(score, h.total_mass());
    }

    #[test]
    fn test_elementwise_minimum() {
        let a = Histogram::new("a.jpg", vec![0.5, 0.1, 0.4]);
        let b = Histogram::new("b.jpg", vec![0.2, 0.6, 0.2]);
        let score = intersection(&a, &b).unwrap();
        assert!((score - 0.5).abs() < 1e-6);
        assert_eq!(score, intersection(&b, &a).unwrap());
    }

    #[test]
    fn test_disjoint_is_zero() {
        let a = Histogram::new("a.jpg", vec![1.0, 0.0, 0.0]);
        let b = Histogram::new("b.jpg", vec![0.0, 1.0, 1.0]);
        assert_eq!(intersection(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch_fails() {
        let short = Histogram::new("short.jpg", vec![0.5; 3]);
        let long = Histogram::new("long.jpg", vec![0.5; 6]);

        let err = intersection(&short, &long).unwrap_err();
        assert!(matches!(
            err,
            HistogramError::LengthMismatch {
                query: 3,
                candidate: 6
            }
        ));
        assert!(intersection(&long, &short).is_err());
    }
}
