pub mod basal;
pub mod isf;
pub mod carbs;
pub mod targets;

pub use basal::{basal_lookup, max_daily_basal};
pub use isf::{isf_lookup, isf_lookup_from_schedule};
pub use carbs::carb_ratio_lookup;
pub use targets::{bg_targets_lookup, BgTargets};
