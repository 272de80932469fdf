use serde::Serialize;

use super::RiskTone;
use crate::models::{HealthAnalysis, RiskLevel};

/// At-a-glance card: the one insight, the top condition and what to do next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfographicView {
    pub key_point: String,
    pub top_condition: String,
    pub immediate_action: String,
    pub risk: RiskLevel,
    pub indicator: RiskTone,
    pub doctor_visit: &'static str,
}

pub fn doctor_visit_advice(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "IMMEDIATELY",
        RiskLevel::Moderate => "Recommended",
        RiskLevel::Low => "Monitor at home",
    }
}

impl InfographicView {
    pub fn build(analysis: &HealthAnalysis) -> Self {
        let data = &analysis.infographic_data;
        Self {
            key_point: data.key_point.clone(),
            top_condition: data.top_condition.clone(),
            immediate_action: data.immediate_action.clone(),
            risk: analysis.risk_score,
            indicator: analysis.risk_score.into(),
            doctor_visit: doctor_visit_advice(analysis.risk_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn advice_follows_risk() {
        let mut analysis = fixtures::analysis(true, 0);
        for (risk, tone, advice) in [
            (RiskLevel::Low, RiskTone::Green, "Monitor at home"),
            (RiskLevel::Moderate, RiskTone::Yellow, "Recommended"),
            (RiskLevel::High, RiskTone::Red, "IMMEDIATELY"),
        ] {
            analysis.risk_score = risk;
            let view = InfographicView::build(&analysis);
            assert_eq!(view.indicator, tone);
            assert_eq!(view.doctor_visit, advice);
        }
    }

    #[test]
    fn copies_the_model_summary() {
        let view = InfographicView::build(&fixtures::analysis(true, 0));
        assert_eq!(view.top_condition, "Viral fever");
        assert_eq!(view.immediate_action, "Rest and hydrate");
    }
}
