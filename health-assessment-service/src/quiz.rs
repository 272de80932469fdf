//! Clarifying questionnaire shown between the two analysis passes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ClarifyingQuestion, QuestionAnswer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("there are no clarifying questions to answer")]
    NoQuestions,

    #[error("\"{answer}\" is not an option for this question")]
    UnknownOption { answer: String },

    #[error("question {position} was already answered with \"{answer}\"")]
    AnswerLocked { position: usize, answer: String },

    #[error("question {position} has not been answered yet")]
    Unanswered { position: usize },

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("already at the last question")]
    AtLastQuestion,
}

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    /// 1-based position.
    pub position: usize,
    pub total: usize,
    pub question: ClarifyingQuestion,
    pub answer: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_finish: bool,
}

/// One-question-at-a-time questionnaire. An answer is fixed once given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifyingQuiz {
    questions: Vec<ClarifyingQuestion>,
    answers: Vec<Option<String>>,
    current: usize,
}

impl ClarifyingQuiz {
    pub fn new(questions: Vec<ClarifyingQuestion>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            questions,
            answers,
            current: 0,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &ClarifyingQuestion {
        &self.questions[self.current]
    }

    fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    /// Record the answer to the current question and move on to the next one
    /// unless this is the last question.
    pub fn answer(&mut self, answer: &str) -> Result<(), QuizError> {
        let question = &self.questions[self.current];
        let answer = answer.trim();

        if !question.options.is_empty() && !question.options.iter().any(|o| o == answer) {
            return Err(QuizError::UnknownOption {
                answer: answer.to_string(),
            });
        }
        if answer.is_empty() {
            return Err(QuizError::UnknownOption {
                answer: String::new(),
            });
        }

        match &self.answers[self.current] {
            Some(existing) if existing == answer => {}
            Some(existing) => {
                return Err(QuizError::AnswerLocked {
                    position: self.current + 1,
                    answer: existing.clone(),
                });
            }
            None => self.answers[self.current] = Some(answer.to_string()),
        }

        if !self.is_last() {
            self.current += 1;
        }
        Ok(())
    }

    pub fn previous(&mut self) -> Result<(), QuizError> {
        if self.current == 0 {
            return Err(QuizError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(())
    }

    /// Move forward past an answered question.
    pub fn next(&mut self) -> Result<(), QuizError> {
        if self.is_last() {
            return Err(QuizError::AtLastQuestion);
        }
        if self.answers[self.current].is_none() {
            return Err(QuizError::Unanswered {
                position: self.current + 1,
            });
        }
        self.current += 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    /// One answer per question, in question order.
    pub fn finish(&self) -> Result<Vec<QuestionAnswer>, QuizError> {
        self.questions
            .iter()
            .zip(&self.answers)
            .enumerate()
            .map(|(index, (question, answer))| match answer {
                Some(answer) => Ok(QuestionAnswer {
                    question_id: question.id,
                    question_text: question.text.clone(),
                    answer: answer.clone(),
                }),
                None => Err(QuizError::Unanswered { position: index + 1 }),
            })
            .collect()
    }

    pub fn view(&self) -> QuestionView {
        let answer = self.answers[self.current].clone();
        QuestionView {
            position: self.current + 1,
            total: self.questions.len(),
            question: self.current_question().clone(),
            can_go_back: self.current > 0,
            can_go_forward: !self.is_last() && answer.is_some(),
            can_finish: self.is_last() && self.is_complete(),
            answer,
        }
    }
}
