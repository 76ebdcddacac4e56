//! Reason-string builder (spec §6/§9): assembles the ordered prefix every
//! determination carries before the dosing-stage conclusion clause is
//! appended by [`crate::determine_basal`].

use crate::dynamic_isf::DynamicIsfResult;

pub struct ReasonContext {
    pub autosens_ratio: f64,
    pub isf_from: f64,
    pub isf_to: f64,
    pub cob: f64,
    pub current_deviation: f64,
    pub bgi: f64,
    pub carb_ratio: f64,
    pub target: f64,
    pub min_pred_bg: f64,
    pub min_guard_bg: f64,
    pub iob_pred_bg: f64,
    pub cob_pred_bg: Option<f64>,
    pub uam_pred_bg: Option<f64>,
    pub dynamic_isf: Option<DynamicIsfResult>,
}

/// Builds the fixed-order prefix: `"Autosens ratio: X, ISF: Y→Z, COB:…,
/// Dev:…, BGI:…, CR:…, Target:…, minPredBG…, minGuardBG…, IOBpredBG…[,
/// COBpredBG…][, UAMpredBG…][, Dynamic ISF: On, …]"`. The dosing cascade
/// appends its own conclusion clause to the returned string.
pub fn build_prefix(ctx: &ReasonContext) -> String {
    let mut reason = format!(
        "Autosens ratio: {:.2}, ISF: {:.1}→{:.1}, COB: {:.0}, Dev: {:.0}, BGI: {:.1}, CR: {:.1}, Target: {:.0}, minPredBG {:.0}, minGuardBG {:.0}, IOBpredBG {:.0}",
        ctx.autosens_ratio, ctx.isf_from, ctx.isf_to, ctx.cob, ctx.current_deviation, ctx.bgi, ctx.carb_ratio, ctx.target, ctx.min_pred_bg, ctx.min_guard_bg, ctx.iob_pred_bg
    );

    if let Some(cob_pred) = ctx.cob_pred_bg {
        reason.push_str(&format!(", COBpredBG {:.0}", cob_pred));
    }
    if let Some(uam_pred) = ctx.uam_pred_bg {
        reason.push_str(&format!(", UAMpredBG {:.0}", uam_pred));
    }
    if let Some(dyn_isf) = ctx.dynamic_isf {
        reason.push_str(&format!(
            ", Dynamic ISF: On, tddRatio: {:.2}, uncappedRatio: {:.2}",
            dyn_isf.tdd_ratio, dyn_isf.uncapped_ratio
        ));
    }

    reason
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_includes_mandatory_fields_in_order() {
        let ctx = ReasonContext {
            autosens_ratio: 1.0,
            isf_from: 50.0,
            isf_to: 50.0,
            cob: 0.0,
            current_deviation: 0.0,
            bgi: 0.0,
            carb_ratio: 10.0,
            target: 100.0,
            min_pred_bg: 100.0,
            min_guard_bg: 100.0,
            iob_pred_bg: 100.0,
            cob_pred_bg: None,
            uam_pred_bg: None,
            dynamic_isf: None,
        };
        let reason = build_prefix(&ctx);
        assert!(reason.starts_with("Autosens ratio:"));
        assert!(reason.contains("IOBpredBG"));
        assert!(!reason.contains("COBpredBG"));
    }

    #[test]
    fn includes_optional_cob_and_uam_clauses_when_present() {
        let ctx = ReasonContext {
            autosens_ratio: 1.0,
            isf_from: 50.0,
            isf_to: 50.0,
            cob: 20.0,
            current_deviation: 5.0,
            bgi: -2.0,
            carb_ratio: 10.0,
            target: 100.0,
            min_pred_bg: 90.0,
            min_guard_bg: 85.0,
            iob_pred_bg: 95.0,
            cob_pred_bg: Some(110.0),
            uam_pred_bg: Some(105.0),
            dynamic_isf: None,
        };
        let reason = build_prefix(&ctx);
        assert!(reason.contains("COBpredBG 110"));
        assert!(reason.contains("UAMpredBG 105"));
    }
}
