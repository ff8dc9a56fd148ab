//! Sample-size arithmetic for the rank guarantee.
//!
//! The engine's guarantee is: with probability at least `alpha`, at least `k`
//! of the sampled reference points lie within the top `t = ceil(tau/100 * n)`
//! true-distance ranks. Sampling is uniform *without replacement*, so the
//! number of top-`t` points observed among `m` samples is hypergeometric, and
//! the minimum sample size is found from its lower tail.

use rand::seq::index;
use rand::Rng;

/// Natural-log factorial table, `ln(i!)` for `i` in `0..=n`.
///
/// One table is built per `minimum_samples_reqd` call and shared across the
/// probability evaluations of the binary search.
struct LnFactorial(Vec<f64>);

impl LnFactorial {
    fn new(n: usize) -> Self {
        let mut table = Vec::with_capacity(n + 1);
        let mut acc = 0.0f64;
        table.push(0.0);
        for i in 1..=n {
            acc += (i as f64).ln();
            table.push(acc);
        }
        Self(table)
    }

    /// `ln C(n, r)`; requires `r <= n`.
    #[inline]
    fn ln_choose(&self, n: usize, r: usize) -> f64 {
        self.0[n] - self.0[r] - self.0[n - r]
    }
}

/// Probability that at least `k` of `m` uniform draws without replacement
/// from `n` points fall within the top `t` ranked positions.
///
/// This is the upper tail of a hypergeometric distribution with population
/// `n`, `t` marked points, and `m` draws. Evaluated through the `k`-term
/// complement of the lower tail, in log space for stability.
pub fn success_probability(n: usize, k: usize, m: usize, t: usize) -> f64 {
    if t >= n {
        // Every point is top-ranked; we only need enough draws.
        return if m >= k { 1.0 } else { 0.0 };
    }
    if m < k || k > t {
        return 0.0;
    }
    // At most n - t draws can miss, so at least m - (n - t) must hit.
    if m > n - t + k - 1 {
        return 1.0;
    }

    let table = LnFactorial::new(n);
    success_probability_with(&table, n, k, m, t)
}

fn success_probability_with(table: &LnFactorial, n: usize, k: usize, m: usize, t: usize) -> f64 {
    if m < k || k > t {
        return 0.0;
    }
    if m > n - t + k - 1 {
        return 1.0;
    }

    let ln_total = table.ln_choose(n, m);
    let mut miss = 0.0f64;
    for j in 0..k {
        // P(exactly j of the m draws are in the top t).
        if m - j > n - t {
            continue; // cannot place the remaining draws outside the top t
        }
        let ln_term = table.ln_choose(t, j) + table.ln_choose(n - t, m - j) - ln_total;
        miss += ln_term.exp();
    }
    (1.0 - miss).clamp(0.0, 1.0)
}

/// Number of points within the top `tau` percentile of `n` ranks.
#[inline]
pub(crate) fn top_rank_count(n: usize, tau: f64) -> usize {
    ((tau / 100.0) * n as f64).ceil() as usize
}

/// Smallest number of samples `m` (without replacement, out of `n`) such that
/// with probability at least `alpha`, at least `k` of them land in the top
/// `ceil(tau/100 * n)` ranked positions.
///
/// Boundary behavior:
/// - `n == 0` yields 0;
/// - `alpha >= 1` yields `n`: certainty cannot be bought with a strict
///   subsample, so the whole set is evaluated;
/// - `tau >= 100` yields 0: every reference point is already top-ranked;
/// - an infeasible combination (`k` larger than the top-rank count) yields
///   `n`, the maximally exhaustive fallback.
///
/// Monotone non-decreasing in `k` and `alpha`, non-increasing in `tau`.
pub fn minimum_samples_reqd(n: usize, k: usize, tau: f64, alpha: f64) -> usize {
    if n == 0 {
        return 0;
    }
    if alpha >= 1.0 {
        return n;
    }
    let t = top_rank_count(n, tau);
    if t >= n {
        return 0;
    }
    let k = k.min(n);
    if k > t {
        return n;
    }

    let table = LnFactorial::new(n);

    // The tail probability is non-decreasing in m, so binary search for the
    // first m in [k, n] that satisfies the confidence requirement.
    let mut lo = k;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if success_probability_with(&table, n, k, mid, t) >= alpha {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Draw `m` distinct indices uniformly at random from `[0, n)`.
///
/// The result always holds exactly `min(m, n)` distinct values; `m == n`
/// returns a permutation of all indices. Order is unspecified.
pub fn obtain_distinct_samples<R: Rng + ?Sized>(rng: &mut R, m: usize, n: usize) -> Vec<usize> {
    let m = m.min(n);
    index::sample(rng, n, m).into_vec()
}
