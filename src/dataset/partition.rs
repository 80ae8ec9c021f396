//! Splitting a dataset into contiguous, near-equal groups.

/// Split `items` into exactly `k` contiguous groups.
///
/// The first `n % k` groups hold `n / k + 1` items and the rest hold `n / k`.
/// Order is preserved within and across groups. Returns an empty plan when
/// `k == 0` or there are no items.
pub fn partition<T>(items: Vec<T>, k: usize) -> Vec<Vec<T>> {
    let sizes = partition_sizes(items.len(), k);
    if sizes.is_empty() {
        return Vec::new();
    }

    let mut remaining = items.into_iter();
    sizes
        .into_iter()
        .map(|size| remaining.by_ref().take(size).collect())
        .collect()
}

/// Group sizes `partition` would produce for `n` items.
pub fn partition_sizes(n: usize, k: usize) -> Vec<usize> {
    if k == 0 || n == 0 {
        return Vec::new();
    }

    let base = n / k;
    let remainder = n % k;
    (0..k).map(|i| base + usize::from(i < remainder)).collect()
}
