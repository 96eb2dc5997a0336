//! Allocation helpers: exploration blending and integer apportionment.
//!
//! Both are deterministic. [`apportion`] always hits its total exactly, whatever
//! floating-point noise (or garbage) the input carries.

/// Blend a fractional split with the uniform split.
///
/// `mix[v] = etf / N + split[v] * (1 - etf)`, with `etf` clamped to `[0, 1]`.
pub fn blend_with_uniform(split: &[f64], exploration_fraction: f64) -> Vec<f64> {
    if split.is_empty() {
        return Vec::new();
    }
    let etf = if exploration_fraction.is_finite() {
        exploration_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let uniform = 1.0 / split.len() as f64;
    split
        .iter()
        .map(|s| uniform * etf + s * (1.0 - etf))
        .collect()
}

/// Largest-remainder apportionment of `values` into integers summing to `total`.
///
/// - Each entry starts at the floor of its value (non-finite or negative values count as 0).
/// - Missing points go one at a time to entries in decreasing order of fractional
///   remainder; equal remainders keep input order. The order is cycled if more points
///   are missing than there are entries (e.g. an all-zero input).
/// - Excess points (inputs summing above `total`) are taken back in the reverse order.
///
/// Returns an empty vector for empty input.
pub fn apportion(values: &[f64], total: u32) -> Vec<u32> {
    if values.is_empty() {
        return Vec::new();
    }
    let cap = f64::from(total);
    let clean: Vec<f64> = values
        .iter()
        .map(|v| if v.is_finite() && *v > 0.0 { v.min(cap) } else { 0.0 })
        .collect();
    let mut out: Vec<u32> = clean.iter().map(|v| v.floor() as u32).collect();

    let mut order: Vec<usize> = (0..clean.len()).collect();
    // Stable sort: ties stay in input order.
    order.sort_by(|&a, &b| {
        let ra = clean[a] - clean[a].floor();
        let rb = clean[b] - clean[b].floor();
        rb.total_cmp(&ra)
    });

    let mut assigned: u64 = out.iter().map(|&x| u64::from(x)).sum();
    let target = u64::from(total);
    let mut cursor = 0;
    while assigned < target {
        out[order[cursor % order.len()]] += 1;
        assigned += 1;
        cursor += 1;
    }
    let mut cursor = 0;
    while assigned > target {
        let i = order[order.len() - 1 - cursor % order.len()];
        if out[i] > 0 {
            out[i] -= 1;
            assigned -= 1;
        }
        cursor += 1;
    }
    out
}
