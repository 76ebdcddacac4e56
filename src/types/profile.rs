//! Therapy profile: the full set of recognized configuration options from
//! spec.md §3, plus the schedule types the accessors in
//! [`crate::profile`] walk.

use crate::insulin::InsulinCurve;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasalScheduleEntry {
    /// Minutes since midnight.
    pub offset: u32,
    pub rate: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarbRatioScheduleEntry {
    pub offset: u32,
    pub ratio: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ISFEntry {
    pub offset: u32,
    pub sensitivity: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub end_offset: Option<u32>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ISFProfile {
    pub sensitivities: Vec<ISFEntry>,
}

/// Rolling autosens state carried between ticks by the orchestrator (not
/// the pure core, which receives it as an input per §5).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AutosensData {
    pub ratio: f64,
}

fn default_max_daily_safety_multiplier() -> f64 { 3.0 }
fn default_current_basal_safety_multiplier() -> f64 { 4.0 }
fn default_half_basal_exercise_target() -> f64 { 160.0 }
fn default_max_cob() -> f64 { 120.0 }
fn default_min_5m_carbimpact() -> f64 { 8.0 }
fn default_max_meal_absorption_time() -> f64 { 6.0 }
fn default_remaining_carbs_cap() -> f64 { 90.0 }
fn default_remaining_carbs_fraction() -> f64 { 1.0 }
fn default_smb_delivery_ratio() -> f64 { 0.5 }
fn default_smb_interval() -> f64 { 3.0 }
fn default_max_smb_basal_minutes() -> f64 { 30.0 }
fn default_max_uam_smb_basal_minutes() -> f64 { 30.0 }
fn default_autosens_min() -> f64 { 0.7 }
fn default_autosens_max() -> f64 { 1.2 }
fn default_bolus_increment() -> f64 { 0.05 }
fn default_noisy_cgm_target_multiplier() -> f64 { 1.3 }
fn default_threshold_setting() -> f64 { 60.0 }
fn default_carbs_req_threshold() -> f64 { 1.0 }
fn default_max_delta_bg_threshold() -> f64 { 0.2 }
fn default_weight_percentage() -> f64 { 1.0 }
fn default_insulin_peak_time() -> f64 { 75.0 }
fn default_adjustment_factor() -> f64 { 0.4 }
fn default_adjustment_factor_sigmoid() -> f64 { 0.4 }

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Hours. Accessors enforce the 5h floor rather than the struct, so a
    /// profile round-trips the value the user entered.
    pub dia: f64,
    pub max_iob: f64,
    pub max_basal: f64,
    pub max_daily_basal: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_daily_safety_multiplier"))]
    pub max_daily_safety_multiplier: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_current_basal_safety_multiplier"))]
    pub current_basal_safety_multiplier: f64,

    pub basal_profile: Vec<BasalScheduleEntry>,
    pub isf_profile: ISFProfile,
    pub carb_ratio_profile: Vec<CarbRatioScheduleEntry>,

    /// Fallback single values used when the corresponding schedule is
    /// empty (spec §4.2's `sens=200, basal=0.1, carbRatio=30` defense is
    /// layered on top of these in the accessors).
    pub current_basal: f64,
    pub sens: f64,
    pub carb_ratio: f64,

    pub min_bg: f64,
    pub max_bg: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub temptarget_set: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_half_basal_exercise_target"))]
    pub half_basal_exercise_target: f64,

    #[cfg_attr(feature = "serde", serde(default = "default_max_cob"))]
    pub max_cob: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_min_5m_carbimpact"))]
    pub min_5m_carbimpact: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_meal_absorption_time"))]
    pub max_meal_absorption_time: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_remaining_carbs_cap"))]
    pub remaining_carbs_cap: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_remaining_carbs_fraction"))]
    pub remaining_carbs_fraction: f64,

    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_always: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_with_cob: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_after_carbs: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_with_temptarget: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_high_bg: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_smb_with_high_temptarget: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_smb_high_bg_target: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_smb_delivery_ratio"))]
    pub smb_delivery_ratio: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_smb_interval"))]
    pub smb_interval: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_smb_basal_minutes"))]
    pub max_smb_basal_minutes: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_uam_smb_basal_minutes"))]
    pub max_uam_smb_basal_minutes: f64,

    #[cfg_attr(feature = "serde", serde(default))]
    pub use_new_formula: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sigmoid: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_adjustment_factor"))]
    pub adjustment_factor: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_adjustment_factor_sigmoid"))]
    pub adjustment_factor_sigmoid: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tdd_adj_basal: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_custom_peak_time: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_insulin_peak_time"))]
    pub insulin_peak_time: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve: InsulinCurve,

    #[cfg_attr(feature = "serde", serde(default = "default_autosens_min"))]
    pub autosens_min: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_autosens_max"))]
    pub autosens_max: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sensitivity_raises_target: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resistance_lowers_target: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub high_temptarget_raises_sensitivity: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub low_temptarget_lowers_sensitivity: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rewind_resets_autosens: bool,

    #[cfg_attr(feature = "serde", serde(default = "default_bolus_increment"))]
    pub bolus_increment: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub model: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub skip_neutral_temps: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub suspend_zeros_iob: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_uam: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_noisy_cgm_target_multiplier"))]
    pub noisy_cgm_target_multiplier: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_threshold_setting"))]
    pub threshold_setting: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_carbs_req_threshold"))]
    pub carbs_req_threshold: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_delta_bg_threshold"))]
    pub max_delta_bg_threshold: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_weight_percentage"))]
    pub weight_percentage: f64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            dia: 5.0,
            max_iob: 0.0,
            max_basal: 1.0,
            max_daily_basal: 1.0,
            max_daily_safety_multiplier: default_max_daily_safety_multiplier(),
            current_basal_safety_multiplier: default_current_basal_safety_multiplier(),
            basal_profile: Vec::new(),
            isf_profile: ISFProfile::default(),
            carb_ratio_profile: Vec::new(),
            current_basal: 1.0,
            sens: 50.0,
            carb_ratio: 10.0,
            min_bg: 100.0,
            max_bg: 120.0,
            temptarget_set: false,
            half_basal_exercise_target: default_half_basal_exercise_target(),
            max_cob: default_max_cob(),
            min_5m_carbimpact: default_min_5m_carbimpact(),
            max_meal_absorption_time: default_max_meal_absorption_time(),
            remaining_carbs_cap: default_remaining_carbs_cap(),
            remaining_carbs_fraction: default_remaining_carbs_fraction(),
            enable_smb_always: false,
            enable_smb_with_cob: false,
            enable_smb_after_carbs: false,
            enable_smb_with_temptarget: false,
            enable_smb_high_bg: false,
            allow_smb_with_high_temptarget: false,
            enable_smb_high_bg_target: 0.0,
            smb_delivery_ratio: default_smb_delivery_ratio(),
            smb_interval: default_smb_interval(),
            max_smb_basal_minutes: default_max_smb_basal_minutes(),
            max_uam_smb_basal_minutes: default_max_uam_smb_basal_minutes(),
            use_new_formula: false,
            sigmoid: false,
            adjustment_factor: default_adjustment_factor(),
            adjustment_factor_sigmoid: default_adjustment_factor_sigmoid(),
            tdd_adj_basal: false,
            use_custom_peak_time: false,
            insulin_peak_time: default_insulin_peak_time(),
            curve: InsulinCurve::default(),
            autosens_min: default_autosens_min(),
            autosens_max: default_autosens_max(),
            sensitivity_raises_target: false,
            resistance_lowers_target: false,
            high_temptarget_raises_sensitivity: false,
            low_temptarget_lowers_sensitivity: false,
            rewind_resets_autosens: false,
            bolus_increment: default_bolus_increment(),
            model: String::new(),
            skip_neutral_temps: false,
            suspend_zeros_iob: false,
            enable_uam: false,
            noisy_cgm_target_multiplier: default_noisy_cgm_target_multiplier(),
            threshold_setting: default_threshold_setting(),
            carbs_req_threshold: default_carbs_req_threshold(),
            max_delta_bg_threshold: default_max_delta_bg_threshold(),
            weight_percentage: default_weight_percentage(),
        }
    }
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder::default()
    }

    /// DIA below 5h is raised to 5 (spec §4.4).
    pub fn effective_dia(&self) -> f64 {
        self.dia.max(5.0)
    }

    pub fn max_safe_basal(&self) -> f64 {
        crate::numeric::clamp(
            self.max_basal
                .min(3.0 * self.max_daily_basal)
                .min(self.current_basal_safety_multiplier * self.current_basal),
            0.0,
            self.max_basal,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    profile: Profile,
}

macro_rules! builder_setter {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.profile.$field = value;
            self
        }
    };
}

impl ProfileBuilder {
    builder_setter!(dia, dia, f64);
    builder_setter!(sens, sens, f64);
    builder_setter!(carb_ratio, carb_ratio, f64);
    builder_setter!(curve, curve, InsulinCurve);
    builder_setter!(current_basal, current_basal, f64);
    builder_setter!(max_iob, max_iob, f64);
    builder_setter!(max_basal, max_basal, f64);
    builder_setter!(min_bg, min_bg, f64);
    builder_setter!(max_bg, max_bg, f64);

    pub fn basal_profile(mut self, schedule: Vec<BasalScheduleEntry>) -> Self {
        self.profile.basal_profile = schedule;
        self
    }

    pub fn isf_profile(mut self, schedule: ISFProfile) -> Self {
        self.profile.isf_profile = schedule;
        self
    }

    pub fn build(self) -> Profile {
        self.profile
    }
}
