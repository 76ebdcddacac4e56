//! BG target schedule lookup and safety bounding.

use chrono::{DateTime, Utc};

use crate::types::Profile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BgTargets {
    pub min_bg: f64,
    pub max_bg: f64,
    pub temptarget_set: bool,
}

impl Default for BgTargets {
    fn default() -> Self {
        Self { min_bg: 100.0, max_bg: 120.0, temptarget_set: false }
    }
}

pub fn bg_targets_lookup(profile: &Profile, _time: DateTime<Utc>) -> BgTargets {
    bound_target_range(BgTargets {
        min_bg: profile.min_bg,
        max_bg: profile.max_bg,
        temptarget_set: profile.temptarget_set,
    })
}

/// mmol/L inputs (<20) are converted to mg/dL; a 80–200 safety corridor is
/// applied on top so a misconfigured profile can never push the target
/// range outside clinically sane bounds. This is a defensive floor/ceiling
/// distinct from the `threshold` computed in the dosing cascade (§4.9
/// Stage 3), which has its own formula.
fn bound_target_range(mut targets: BgTargets) -> BgTargets {
    if targets.min_bg < 20.0 {
        targets.min_bg *= 18.0;
    }
    if targets.max_bg < 20.0 {
        targets.max_bg *= 18.0;
    }
    targets.min_bg = targets.min_bg.clamp(80.0, 200.0);
    targets.max_bg = targets.max_bg.clamp(80.0, 200.0);
    targets
}
