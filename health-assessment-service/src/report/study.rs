//! Study aids generated with the report: flashcards and a short knowledge quiz.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Flashcard, QuizQuestion};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashcardView {
    /// Wrapped 0-based index of the card shown.
    pub index: usize,
    pub total: usize,
    pub card: Flashcard,
    pub previous: usize,
    pub next: usize,
}

/// The card at `index`, wrapping around the deck in both directions.
pub fn flashcard_at(cards: &[Flashcard], index: i64) -> Option<FlashcardView> {
    if cards.is_empty() {
        return None;
    }
    let total = cards.len();
    let index = index.rem_euclid(total as i64) as usize;
    Some(FlashcardView {
        index,
        total,
        card: cards[index].clone(),
        previous: (index + total - 1) % total,
        next: (index + 1) % total,
    })
}

/// Option picked per question, keyed by the question's position in the quiz.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizSelections {
    pub selections: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub position: usize,
    pub question: String,
    pub selected: usize,
    pub correct: bool,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizGrade {
    pub results: Vec<QuestionResult>,
    pub score: usize,
    pub answered: usize,
    pub total: usize,
}

/// Grade the questions that have a selection. Selections for positions or
/// options that do not exist are ignored.
pub fn grade_quiz(questions: &[QuizQuestion], selections: &QuizSelections) -> QuizGrade {
    let results: Vec<QuestionResult> = selections
        .selections
        .iter()
        .filter_map(|(&position, &selected)| {
            let question = questions.get(position)?;
            question.options.get(selected)?;
            Some(QuestionResult {
                position,
                question: question.question.clone(),
                selected,
                correct: selected == question.correct_answer,
                correct_answer: question
                    .options
                    .get(question.correct_answer)
                    .cloned()
                    .unwrap_or_default(),
                explanation: question.explanation.clone(),
            })
        })
        .collect();

    QuizGrade {
        score: results.iter().filter(|r| r.correct).count(),
        answered: results.len(),
        total: questions.len(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn flashcards_wrap_both_ways() {
        let cards = fixtures::analysis(true, 0).flashcards;

        let view = flashcard_at(&cards, 2).unwrap();
        assert_eq!(view.index, 0);
        assert_eq!(view.previous, 1);
        assert_eq!(view.next, 1);

        let view = flashcard_at(&cards, -1).unwrap();
        assert_eq!(view.index, 1);
        assert_eq!(view.card.question, "When is fever dangerous?");
        assert_eq!(view.next, 0);

        assert!(flashcard_at(&[], 0).is_none());
    }

    #[test]
    fn quiz_is_graded_by_position() {
        let mut questions = fixtures::analysis(true, 0).knowledge_quiz;
        questions.push(QuizQuestion {
            id: 1,
            question: "Is a stiff neck a warning sign?".to_string(),
            options: vec!["No".to_string(), "Yes".to_string()],
            correct_answer: 1,
            explanation: "It can point to meningitis.".to_string(),
        });

        let selections = QuizSelections {
            selections: BTreeMap::from([(0, 1), (1, 1), (7, 0)]),
        };
        let grade = grade_quiz(&questions, &selections);

        assert_eq!(grade.total, 2);
        assert_eq!(grade.answered, 2);
        assert_eq!(grade.score, 1);
        assert!(!grade.results[0].correct);
        assert_eq!(grade.results[0].correct_answer, "Fluids");
        assert_eq!(grade.results[0].explanation, "Fluids prevent dehydration.");
        assert!(grade.results[1].correct);
    }

    #[test]
    fn out_of_range_option_is_ignored() {
        let questions = fixtures::analysis(true, 0).knowledge_quiz;
        let selections = QuizSelections {
            selections: BTreeMap::from([(0, 5)]),
        };
        let grade = grade_quiz(&questions, &selections);
        assert_eq!(grade.answered, 0);
        assert_eq!(grade.score, 0);
    }
}
