//! Read-only views of a finished assessment.
//!
//! Everything here is a pure function of the final analysis and the inputs the
//! patient gave; nothing writes back to the session.

pub mod concept_map;
pub mod infographic;
pub mod pdf;
pub mod study;

use serde::Serialize;

use crate::models::{HealthAnalysis, PatientProfile, QuestionAnswer, RiskLevel, SymptomData, non_blank};

pub const DISCLAIMER: &str = "This analysis is generated by AI. It is strictly educational and not a substitute for professional medical advice.";

const URGENT_NOTICE: &str = "URGENT: Seek immediate medical attention.";

/// Everything a finished assessment is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub analysis: &'a HealthAnalysis,
    pub profile: &'a PatientProfile,
    pub symptoms: &'a SymptomData,
    pub answers: &'a [QuestionAnswer],
}

/// Traffic-light colour used wherever the risk level is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTone {
    Green,
    Yellow,
    Red,
}

impl From<RiskLevel> for RiskTone {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => RiskTone::Green,
            RiskLevel::Moderate => RiskTone::Yellow,
            RiskLevel::High => RiskTone::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBanner {
    pub level: RiskLevel,
    pub tone: RiskTone,
    pub explanation: String,
    pub urgent_notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionRow {
    pub name: String,
    pub likelihood: String,
    /// Highlight the likelihood badge.
    pub most_likely: bool,
    pub relevance: String,
    pub matches: String,
    pub does_not_match: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReportView {
    pub patient_line: String,
    pub summary: String,
    pub risk: RiskBanner,
    pub conditions: Vec<ConditionRow>,
    pub self_care_steps: Vec<String>,
    pub medication_caution: Vec<String>,
    pub red_flags: Vec<String>,
    pub disclaimer: &'static str,
}

impl HealthReportView {
    pub fn build(inputs: ReportInputs<'_>) -> Self {
        let analysis = inputs.analysis;

        Self {
            patient_line: patient_line(inputs.profile),
            summary: analysis.executive_summary.clone(),
            risk: RiskBanner {
                level: analysis.risk_score,
                tone: analysis.risk_score.into(),
                explanation: analysis.risk_explanation.clone(),
                urgent_notice: (analysis.risk_score == RiskLevel::High)
                    .then(|| URGENT_NOTICE.to_string()),
            },
            conditions: analysis
                .conditions
                .iter()
                .map(|c| ConditionRow {
                    name: c.name.clone(),
                    likelihood: c.likelihood.clone(),
                    most_likely: c.likelihood.to_lowercase().contains("most"),
                    relevance: c.relevance.clone(),
                    matches: c.matching_symptoms.join(", "),
                    does_not_match: c.non_matching_symptoms.join(", "),
                })
                .collect(),
            self_care_steps: analysis.self_care_steps.clone(),
            medication_caution: analysis.medication_caution.clone(),
            red_flags: analysis.red_flags.clone(),
            disclaimer: DISCLAIMER,
        }
    }

    pub fn to_markdown(&self) -> String {
        let urgent = self
            .risk
            .urgent_notice
            .as_ref()
            .map(|notice| format!("\n**{notice}**\n"))
            .unwrap_or_default();
        let rows: String = self
            .conditions
            .iter()
            .map(|row| {
                let likelihood = if row.most_likely {
                    format!("**{}**", row.likelihood)
                } else {
                    row.likelihood.clone()
                };
                format!(
                    "| {} | {} | {} | {} | {} |\n",
                    table_cell(&row.name),
                    table_cell(&likelihood),
                    table_cell(&row.relevance),
                    table_cell(&row.matches),
                    table_cell(&row.does_not_match)
                )
            })
            .collect();

        format!(
            "# Health Assessment
{patient}

## Summary
{summary}

## Risk: {level}
{explanation}
{urgent}
## Possible Conditions
| Condition | Likelihood | Why | Matches | Does not match |
|---|---|---|---|---|
{rows}{self_care}{caution}{red_flags}
_{disclaimer}_
",
            patient = self.patient_line,
            summary = self.summary,
            level = self.risk.level,
            explanation = self.risk.explanation,
            self_care = markdown_list("Self-Care Steps", &self.self_care_steps),
            caution = markdown_list("Medication Caution", &self.medication_caution),
            red_flags = markdown_list("When to Seek Medical Care", &self.red_flags),
            disclaimer = self.disclaimer,
        )
    }
}

fn patient_line(profile: &PatientProfile) -> String {
    let mut line = format!("Patient: {}", profile.display_name());
    if let Some(age) = non_blank(&profile.age) {
        line.push_str(&format!(" | Age: {age}"));
    }
    if let Some(gender) = non_blank(&profile.gender) {
        line.push_str(&format!(" | Gender: {gender}"));
    }
    line
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn markdown_list(title: &str, items: &[String]) -> String {
    let items: String = items.iter().map(|item| format!("- {item}\n")).collect();
    format!("\n## {title}\n{items}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn view(analysis: &HealthAnalysis, profile: &PatientProfile) -> HealthReportView {
        HealthReportView::build(ReportInputs {
            analysis,
            profile,
            symptoms: &SymptomData::default(),
            answers: &[],
        })
    }

    #[test]
    fn report_lists_every_item() {
        let analysis = fixtures::analysis(true, 0);
        let markdown = view(&analysis, &PatientProfile::default()).to_markdown();

        for condition in &analysis.conditions {
            assert!(markdown.contains(&condition.name));
        }
        for item in analysis
            .self_care_steps
            .iter()
            .chain(&analysis.medication_caution)
            .chain(&analysis.red_flags)
        {
            assert!(markdown.contains(&format!("- {item}")));
        }
        assert!(markdown.contains("Patient: Anonymous"));
        assert!(!markdown.contains("URGENT"));
    }

    #[test]
    fn high_risk_shows_urgent_banner() {
        let mut analysis = fixtures::analysis(true, 0);
        analysis.risk_score = RiskLevel::High;
        let report = view(&analysis, &PatientProfile::default());
        assert_eq!(report.risk.tone, RiskTone::Red);
        assert!(report.to_markdown().contains("**URGENT: Seek immediate medical attention.**"));
    }

    #[test]
    fn most_likely_conditions_are_highlighted() {
        let analysis = fixtures::analysis(true, 0);
        let report = view(&analysis, &PatientProfile::default());
        assert!(report.conditions[0].most_likely);
        assert!(!report.conditions[1].most_likely);
        assert_eq!(report.conditions[1].matches, "fever, fatigue");
        assert_eq!(report.conditions[1].does_not_match, "cough");
    }

    #[test]
    fn patient_line_skips_blank_fields() {
        let profile = PatientProfile {
            name: Some("Meera".to_string()),
            age: Some("34".to_string()),
            gender: Some(" ".to_string()),
            ..PatientProfile::default()
        };
        assert_eq!(patient_line(&profile), "Patient: Meera | Age: 34");
    }
}
