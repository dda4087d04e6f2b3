//! Index-domain helpers that do not depend on the tensor type
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::utils::compact_domain;
//!
//! let distinct = compact_domain(&[1_000_007, 1_000_003, 1_000_007]);
//! assert_eq!(distinct, vec![1_000_003, 1_000_007]);
//! ```

/// Sorted set of distinct values in `indices`
///
/// The mark array only spans the observed `[min, max]` range, so a few
/// large, clustered indices do not cost an allocation the size of the
/// nominal dimension.
///
/// # Complexity
///
/// Time: O(n + (max - min))
/// Space: O(max - min)
pub fn compact_domain(indices: &[usize]) -> Vec<usize> {
    let (min, max) = match indices.iter().copied().fold(None, |acc, i| match acc {
        None => Some((i, i)),
        Some((lo, hi)) => Some((lo.min(i), hi.max(i))),
    }) {
        Some(bounds) => bounds,
        None => return Vec::new(),
    };

    let mut marks = vec![false; max - min + 1];
    let mut found = 0;
    for &i in indices {
        let slot = &mut marks[i - min];
        if !*slot {
            *slot = true;
            found += 1;
        }
    }

    let mut distinct = Vec::with_capacity(found);
    distinct.extend(
        marks
            .iter()
            .enumerate()
            .filter(|(_, &marked)| marked)
            .map(|(offset, _)| offset + min),
    );
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_domain_empty() {
        assert!(compact_domain(&[]).is_empty());
    }

    #[test]
    fn test_compact_domain_single() {
        assert_eq!(compact_domain(&[42, 42, 42]), vec![42]);
    }

    #[test]
    fn test_compact_domain_sorted_distinct() {
        assert_eq!(compact_domain(&[5, 2, 9, 2, 5, 7]), vec![2, 5, 7, 9]);
    }
}
