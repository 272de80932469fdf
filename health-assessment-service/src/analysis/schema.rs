use serde_json::{Value, json};

/// Structured-output schema sent with every analysis call, in the
/// `responseSchema` dialect of the Gemini API.
pub fn response_schema() -> Value {
    let string_list = |description: &str| {
        json!({ "type": "ARRAY", "items": { "type": "STRING" }, "description": description })
    };

    json!({
        "type": "OBJECT",
        "properties": {
            "executiveSummary": {
                "type": "STRING",
                "description": "A brief 2-3 sentence overview of the analysis."
            },
            "extractedSymptoms": string_list("List of identified symptoms."),
            "conditions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "likelihood": {
                            "type": "STRING",
                            "description": "e.g. Most Likely, Possible, Unlikely"
                        },
                        "relevance": {
                            "type": "STRING",
                            "description": "Why this condition is considered, referencing user answers if available."
                        },
                        "matchingSymptoms": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "nonMatchingSymptoms": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["name", "likelihood", "relevance", "matchingSymptoms", "nonMatchingSymptoms"]
                }
            },
            "riskScore": { "type": "STRING", "enum": ["Low", "Moderate", "High"] },
            "riskExplanation": {
                "type": "STRING",
                "description": "1-2 sentences explaining the risk level based on specific inputs."
            },
            "selfCareSteps": string_list("Immediate home care advice."),
            "medicationCaution": string_list("What to avoid or use with caution."),
            "redFlags": string_list("Signs to seek immediate medical help."),
            "infographicData": {
                "type": "OBJECT",
                "properties": {
                    "keyPoint": { "type": "STRING", "description": "One main takeaway." },
                    "topCondition": { "type": "STRING", "description": "The most relevant condition discussed." },
                    "immediateAction": { "type": "STRING", "description": "The most important next step." }
                },
                "required": ["keyPoint", "topCondition", "immediateAction"]
            },
            "flashcards": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "answer": { "type": "STRING" }
                    },
                    "required": ["question", "answer"]
                }
            },
            "knowledgeQuiz": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "INTEGER" },
                        "question": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "correctAnswer": {
                            "type": "INTEGER",
                            "description": "Index of the correct option (0-3)"
                        },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["id", "question", "options", "correctAnswer", "explanation"]
                }
            },
            "isFinalReport": {
                "type": "BOOLEAN",
                "description": "True if based on clarifying questions, false on the initial pass."
            },
            "clarifyingQuestions": {
                "type": "ARRAY",
                "description": "5-8 context-specific questions to narrow down possibilities. Empty if isFinalReport is true.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "INTEGER" },
                        "text": { "type": "STRING" },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "Simple options like Yes, No, Maybe, or specific values."
                        }
                    },
                    "required": ["id", "text", "options"]
                }
            }
        },
        "required": [
            "executiveSummary",
            "extractedSymptoms",
            "conditions",
            "riskScore",
            "riskExplanation",
            "selfCareSteps",
            "medicationCaution",
            "redFlags",
            "infographicData",
            "flashcards",
            "knowledgeQuiz",
            "isFinalReport"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HealthAnalysis;

    #[test]
    fn contract_enums_are_exact() {
        let schema = response_schema();
        assert_eq!(
            schema["properties"]["riskScore"]["enum"],
            json!(["Low", "Moderate", "High"])
        );
        assert_eq!(schema["properties"]["isFinalReport"]["type"], json!("BOOLEAN"));
    }

    #[test]
    fn every_required_field_exists_on_the_model() {
        let analysis = serde_json::to_value(crate::models::fixtures::analysis(true, 0)).unwrap();
        let schema = response_schema();
        for field in schema["required"].as_array().unwrap() {
            let field = field.as_str().unwrap();
            assert!(analysis.get(field).is_some(), "model lacks {field}");
            assert!(schema["properties"].get(field).is_some());
        }
        // The model must parse back from a reply that only has the required fields.
        let back: HealthAnalysis = serde_json::from_value(analysis).unwrap();
        assert!(back.is_final_report);
    }
}
