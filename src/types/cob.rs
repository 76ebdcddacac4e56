//! Meal / carb-absorption data shapes.

use chrono::{DateTime, Utc};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MealData {
    pub carbs: f64,
    pub ns_carbs: f64,
    pub bw_carbs: f64,
    pub journal_carbs: f64,
    pub meal_cob: f64,
    pub current_deviation: f64,
    pub max_deviation: f64,
    pub min_deviation: f64,
    pub slope_from_max_deviation: f64,
    pub slope_from_min_deviation: f64,
    pub all_deviations: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_carb_time: Option<DateTime<Utc>>,
    pub bw_found: bool,
}

impl MealData {
    pub fn rounded(&self) -> Self {
        Self {
            carbs: crate::numeric::js_round(self.carbs, 3),
            ns_carbs: crate::numeric::js_round(self.ns_carbs, 3),
            bw_carbs: crate::numeric::js_round(self.bw_carbs, 3),
            journal_carbs: crate::numeric::js_round(self.journal_carbs, 3),
            meal_cob: crate::numeric::js_round(self.meal_cob, 0),
            current_deviation: crate::numeric::js_round(self.current_deviation, 2),
            max_deviation: crate::numeric::js_round(self.max_deviation, 2),
            min_deviation: crate::numeric::js_round(self.min_deviation, 2),
            slope_from_max_deviation: crate::numeric::js_round(self.slope_from_max_deviation, 3),
            slope_from_min_deviation: crate::numeric::js_round(self.slope_from_min_deviation, 3),
            all_deviations: self.all_deviations.clone(),
            last_carb_time: self.last_carb_time,
            bw_found: self.bw_found,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct COBResult {
    pub meal_cob: f64,
    pub carbs_absorbed: f64,
    pub current_deviation: f64,
    pub max_deviation: f64,
    pub min_deviation: f64,
    pub slope_from_max: f64,
    pub slope_from_min: f64,
}
