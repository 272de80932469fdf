use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional demographics collected on the first wizard step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub location: Option<String>,
    /// Consent to keep the profile across a reset.
    #[serde(default)]
    pub store_session: bool,
}

impl PatientProfile {
    pub fn display_name(&self) -> &str {
        non_blank(&self.name).unwrap_or("Anonymous")
    }
}

/// Returns the trimmed-non-empty value of an optional form field.
pub fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomData {
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => f.write_str("English"),
            Language::Hindi => f.write_str("Hindi"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    /// Free-form label such as "Most Likely", "Possible", "Unlikely".
    pub likelihood: String,
    pub relevance: String,
    #[serde(default)]
    pub matching_symptoms: Vec<String>,
    #[serde(default)]
    pub non_matching_symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfographicData {
    pub key_point: String,
    pub top_condition: String,
    pub immediate_action: String,
}

/// Structured output of one analysis call. Field names are the wire contract
/// with the model and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAnalysis {
    pub executive_summary: String,
    pub extracted_symptoms: Vec<String>,
    pub conditions: Vec<Condition>,
    pub risk_score: RiskLevel,
    pub risk_explanation: String,
    pub self_care_steps: Vec<String>,
    pub medication_caution: Vec<String>,
    pub red_flags: Vec<String>,
    pub infographic_data: InfographicData,
    pub flashcards: Vec<Flashcard>,
    pub knowledge_quiz: Vec<QuizQuestion>,
    pub is_final_report: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarifying_questions: Option<Vec<ClarifyingQuestion>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question_id: u32,
    pub question_text: String,
    pub answer: String,
}

/// What the first analysis pass means for the wizard, decided once right after the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    FinalReport(HealthAnalysis),
    NeedsClarification {
        analysis: HealthAnalysis,
        questions: Vec<ClarifyingQuestion>,
    },
}

impl AnalysisOutcome {
    /// A clarifying round only happens when the analysis is not final and
    /// actually carries questions.
    pub fn classify(analysis: HealthAnalysis) -> Self {
        let questions = match &analysis.clarifying_questions {
            Some(questions) if !analysis.is_final_report && !questions.is_empty() => {
                questions.clone()
            }
            _ => return AnalysisOutcome::FinalReport(analysis),
        };
        AnalysisOutcome::NeedsClarification {
            analysis,
            questions,
        }
    }

    pub fn needs_clarification(&self) -> bool {
        matches!(self, AnalysisOutcome::NeedsClarification { .. })
    }

    pub fn analysis(&self) -> &HealthAnalysis {
        match self {
            AnalysisOutcome::FinalReport(analysis)
            | AnalysisOutcome::NeedsClarification { analysis, .. } => analysis,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn analysis(is_final: bool, questions: usize) -> HealthAnalysis {
        HealthAnalysis {
            executive_summary: "Symptoms are consistent with a common viral illness.".to_string(),
            extracted_symptoms: vec!["fever".to_string(), "fatigue".to_string()],
            conditions: vec![
                Condition {
                    name: "Viral fever".to_string(),
                    likelihood: "Most Likely".to_string(),
                    relevance: "Short fever with fatigue.".to_string(),
                    matching_symptoms: vec!["fever".to_string()],
                    non_matching_symptoms: vec![],
                },
                Condition {
                    name: "Influenza".to_string(),
                    likelihood: "Possible".to_string(),
                    relevance: "Seasonal pattern.".to_string(),
                    matching_symptoms: vec!["fever".to_string(), "fatigue".to_string()],
                    non_matching_symptoms: vec!["cough".to_string()],
                },
            ],
            risk_score: RiskLevel::Low,
            risk_explanation: "Mild, short-lived fever without warning signs.".to_string(),
            self_care_steps: vec!["Rest".to_string(), "Drink fluids".to_string()],
            medication_caution: vec!["Avoid combining fever reducers".to_string()],
            red_flags: vec!["Fever above 39.5 C".to_string(), "Stiff neck".to_string()],
            infographic_data: InfographicData {
                key_point: "Likely a self-limiting viral fever".to_string(),
                top_condition: "Viral fever".to_string(),
                immediate_action: "Rest and hydrate".to_string(),
            },
            flashcards: vec![
                Flashcard {
                    question: "What is a fever?".to_string(),
                    answer: "A temporary rise in body temperature.".to_string(),
                },
                Flashcard {
                    question: "When is fever dangerous?".to_string(),
                    answer: "When very high or with a stiff neck.".to_string(),
                },
            ],
            knowledge_quiz: vec![QuizQuestion {
                id: 1,
                question: "Which helps with a fever?".to_string(),
                options: vec!["Fluids".to_string(), "Skipping meals".to_string()],
                correct_answer: 0,
                explanation: "Fluids prevent dehydration.".to_string(),
            }],
            is_final_report: is_final,
            clarifying_questions: Some(
                (1..=questions as u32)
                    .map(|id| ClarifyingQuestion {
                        id,
                        text: format!("Question {id}?"),
                        options: vec!["Yes".to_string(), "No".to_string()],
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analysis_uses_camel_case_wire_names() {
        let value = serde_json::to_value(fixtures::analysis(true, 0)).unwrap();
        assert_eq!(value["riskScore"], json!("Low"));
        assert_eq!(value["isFinalReport"], json!(true));
        assert!(value["infographicData"]["keyPoint"].is_string());
        assert!(value["knowledgeQuiz"][0]["correctAnswer"].is_number());
        assert!(value["conditions"][0]["matchingSymptoms"].is_array());
    }

    #[test]
    fn unknown_risk_level_is_rejected() {
        let mut value = serde_json::to_value(fixtures::analysis(true, 0)).unwrap();
        value["riskScore"] = json!("Extreme");
        assert!(serde_json::from_value::<HealthAnalysis>(value).is_err());
    }

    #[test]
    fn final_flag_wins_over_questions() {
        let outcome = AnalysisOutcome::classify(fixtures::analysis(true, 3));
        assert!(!outcome.needs_clarification());
    }

    #[test]
    fn missing_or_empty_questions_mean_final() {
        let mut analysis = fixtures::analysis(false, 0);
        assert!(!AnalysisOutcome::classify(analysis.clone()).needs_clarification());

        analysis.clarifying_questions = None;
        assert!(!AnalysisOutcome::classify(analysis).needs_clarification());
    }

    #[test]
    fn non_final_with_questions_needs_clarification() {
        match AnalysisOutcome::classify(fixtures::analysis(false, 4)) {
            AnalysisOutcome::NeedsClarification { questions, .. } => assert_eq!(questions.len(), 4),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn profile_fields_default_to_empty() {
        let profile: PatientProfile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(profile, PatientProfile::default());
        assert_eq!(profile.display_name(), "Anonymous");

        let profile: PatientProfile =
            serde_json::from_value(json!({"name": "Ravi", "storeSession": true})).unwrap();
        assert!(profile.store_session);
        assert_eq!(profile.display_name(), "Ravi");
    }
}
