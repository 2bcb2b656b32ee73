use rand::{RngExt as _, rngs::StdRng};

/// Amount of requests to dispatch in a single one-second cycle.
///
/// The integer part of `target_rate` is always dispatched,
/// the fractional part adds one more request with that probability.
/// Individual batches are thus integers while the expected
/// amount per cycle equals `target_rate`.
pub fn batch_size(target_rate: f64, rng: &mut StdRng) -> u64 {
    if !target_rate.is_finite() || target_rate <= 0. {
        return 0;
    }

    let whole = target_rate.floor();
    let fraction = target_rate - whole;

    let mut size = whole as u64;
    if fraction > 0. && rng.random_bool(fraction.clamp(0., 1.)) {
        size += 1;
    }
    size
}
