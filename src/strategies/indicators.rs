// src/strategies/indicators.rs
//! Thin helpers around the `ta` indicators: run a streaming indicator over a
//! whole slice and compare the tails of two lines.
use ta::Next;

/// Feeds every value through `indicator`, one output per input.
pub fn apply<I>(mut indicator: I, values: &[f64]) -> Vec<f64>
where
    I: Next<f64, Output = f64>,
{
    values.iter().map(|v| indicator.next(*v)).collect()
}

/// `fast` moved from at-or-below `slow` to above it on the last value.
pub fn crossover(fast: &[f64], slow: &[f64]) -> bool {
    match (last_two(fast), last_two(slow)) {
        (Some((f_prev, f_last)), Some((s_prev, s_last))) => f_prev <= s_prev && f_last > s_last,
        _ => false,
    }
}

/// `fast` moved from at-or-above `slow` to below it on the last value.
pub fn crossunder(fast: &[f64], slow: &[f64]) -> bool {
    match (last_two(fast), last_two(slow)) {
        (Some((f_prev, f_last)), Some((s_prev, s_last))) => f_prev >= s_prev && f_last < s_last,
        _ => false,
    }
}

fn last_two(values: &[f64]) -> Option<(f64, f64)> {
    match values {
        [.., prev, last] => Some((*prev, *last)),
        _ => None,
    }
}
