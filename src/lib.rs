//! oref-ng: closed-loop insulin dosing decision engine core.
//!
//! Five subsystems feed a single pure entry point, [`engine::determine`]:
//! IOB reconstruction, meal/COB detection, autosens, dynamic ISF, the
//! forecast engine, and the dosing cascade. The core performs no I/O and
//! holds no state across ticks; callers own persistence, transport, and
//! pump delivery.
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod error;
pub mod numeric;
pub mod types;
pub mod utils;
pub mod profile;
pub mod insulin;
pub mod pump_history;
pub mod iob;
pub mod meal;
pub mod cob;
pub mod autosens;
pub mod dynamic_isf;
pub mod forecast;
pub mod temp_basal;
pub mod reason;
pub mod determine_basal;
pub mod engine;

#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "wasm")]
pub mod wasm;

pub mod prelude {
    pub use crate::autosens::{detect_sensitivity, AutosensResult};
    pub use crate::cob::{calculate as calculate_cob, CarbAbsorptionResult};
    pub use crate::determine_basal::determine_basal;
    pub use crate::dynamic_isf::{dynamic_isf, DynamicIsfResult};
    pub use crate::engine::{determine, EngineInputs};
    pub use crate::error::OrefError;
    pub use crate::forecast::{run_forecast, ForecastResult};
    pub use crate::iob::calculate as calculate_iob;
    pub use crate::insulin::{calculate_iob_contrib, BilinearCurve, ExponentialCurve, InsulinCurve};
    pub use crate::meal::generate as generate_meal_data;
    pub use crate::profile::{basal_lookup, bg_targets_lookup, carb_ratio_lookup, isf_lookup};
    pub use crate::types::*;
    pub use crate::Result;
}

pub use error::OrefError;
pub type Result<T> = std::result::Result<T, OrefError>;
