/// Split `total` into `weights.len()` consecutive boundaries proportional to `weights`.
///
/// Returns the cumulative end of each part. Boundaries come from the running weight sum, so
/// rounding never accumulates and the last boundary is exactly `total`.
pub(crate) fn proportional_ends(total: u64, weights: &[u64]) -> Vec<u64> {
    let sum: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    if sum == 0 {
        return vec![total; weights.len()];
    }
    let mut out = Vec::with_capacity(weights.len());
    let mut acc = 0u128;
    for &w in weights {
        acc += u128::from(w);
        let end = (u128::from(total) * acc + sum / 2) / sum;
        out.push(end as u64);
    }
    if let Some(last) = out.last_mut() {
        *last = total;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
