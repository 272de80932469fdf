use super::AnalysisRequest;
use crate::models::non_blank;

pub const SYSTEM_INSTRUCTION: &str = r#"You are HealthAware AI, a symptom-awareness and health-guidance assistant.

You are not a doctor and you never diagnose. You give educational, general health information only.
Safety comes first: if the symptoms could indicate an emergency, say clearly that the person should seek immediate care.
Always state: "This is not medical advice. Consult a qualified healthcare professional."

Analyze the provided symptoms (text, and an attached image or medical report when present) and answer with a single JSON object that follows the response schema:
1. Extract the key symptoms.
2. List possible conditions, strictly for education, with the symptoms that match and do not match each one.
3. Assign a risk score of Low, Moderate or High and explain it.
4. Give immediate self-care steps.
5. List medication cautions.
6. List red flags that require medical care.
7. Create study material: flashcards and a short multiple-choice quiz.
8. On a first pass, generate clarifying questions.

Answer in the language the user asks for. Keep the tone professional, empathetic and clear, at a 10th-12th grade reading level."#;

/// Render the user part of the request.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    let profile = &request.profile;
    let symptoms = &request.symptoms;

    let mut prompt = format!(
        "Analyze the following health context.
User language preference: {language}.

Patient profile (optional):
- Name: {name}
- Age: {age}
- Gender: {gender}
- Location: {location}

Symptom input:
- Description: \"{description}\"
- Duration: {duration}
- Severity: {severity}
",
        language = request.language,
        name = profile.display_name(),
        age = or_not_provided(&profile.age),
        gender = or_not_provided(&profile.gender),
        location = or_not_provided(&profile.location),
        description = symptoms.description.trim(),
        duration = symptoms.duration.trim(),
        severity = symptoms.severity,
    );

    if request.file.is_some() {
        prompt.push_str(
            "\nAn attached file (image or PDF) contains medical reports or visual symptoms.\n",
        );
    }

    if request.is_follow_up() {
        let transcript: String = request
            .previous_answers
            .iter()
            .map(|answer| format!("- Q: {}\n  A: {}\n", answer.question_text, answer.answer))
            .collect();
        prompt.push_str(&format!(
            r#"
User answers to clarifying questions:
{transcript}
Task:
Using the original symptoms and the answers above, write the final detailed health report.
Set "isFinalReport" to true.
Leave "clarifyingQuestions" empty.
Refine the risk score and the possible conditions with the new information.
"#
        ));
    } else {
        prompt.push_str(
            r#"
Task:
Perform an initial analysis.
Set "isFinalReport" to false.
Generate 5-8 "clarifyingQuestions" that would narrow down the possibilities or assess severity, each with simple answer options.
"#,
        );
    }

    prompt
}

fn or_not_provided(field: &Option<String>) -> &str {
    non_blank(field).unwrap_or("Not provided")
}
