pub mod round;
pub mod time;

pub use round::{round_basal, round_value};
pub use time::{format_timestamp, parse_timestamp};

use crate::numeric::js_round;

pub fn round(value: f64, digits: i32) -> f64 {
    js_round(value, digits)
}

/// Linear-interpolation percentile, `p` in `[0, 100]`. This is the single
/// percentile implementation in the crate; autosens' 50th-percentile ratio
/// call and any other percentile consumer share it rather than keeping a
/// second nearest-index variant around.
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
