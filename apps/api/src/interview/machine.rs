//! Mock interview state machine.
//!
//! `Idle` → `start` → `InProgress { step: 0 }` → `advance` … → after the last
//! answer the interview is complete and the state drops straight back to
//! `Idle`. The step index of an in-progress interview is always below
//! `QUESTION_COUNT`.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const QUESTION_COUNT: usize = 5;

pub const FIXED_QUESTIONS: [&str; QUESTION_COUNT] = [
    "Tell me about yourself.",
    "Why do you want to work with our company?",
    "Describe a challenging project you worked on and how you handled it.",
    "What are your greatest strengths and weaknesses?",
    "Where do you see yourself in five years?",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Easy,
    #[default]
    Moderate,
    Hard,
    All,
}

impl Level {
    pub fn describe(self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Moderate => "moderate",
            Level::Hard => "hard",
            Level::All => "a mix of easy, moderate and hard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionSource {
    Fixed,
    /// Questions written by the AI from the user's resume and a company's skills.
    Generated {
        company: String,
        company_name: String,
        level: Level,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewTurn {
    pub question: String,
    pub answer: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewProgress {
    pub source: QuestionSource,
    pub step: usize,
    pub question: String,
    pub turns: Vec<InterviewTurn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InterviewState {
    #[default]
    Idle,
    InProgress(InterviewProgress),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Next { step: usize, question: String },
    Complete { turns: Vec<InterviewTurn> },
}

impl InterviewState {
    /// (Re)starts at step 0, discarding any interview in progress.
    pub fn start(&mut self, source: QuestionSource, first_question: String) {
        *self = InterviewState::InProgress(InterviewProgress {
            source,
            step: 0,
            question: first_question,
            turns: Vec::new(),
        });
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, InterviewState::InProgress(_))
    }

    /// Current step index; 0 when idle.
    pub fn step(&self) -> usize {
        match self {
            InterviewState::Idle => 0,
            InterviewState::InProgress(p) => p.step,
        }
    }

    pub fn progress(&self) -> Option<&InterviewProgress> {
        match self {
            InterviewState::Idle => None,
            InterviewState::InProgress(p) => Some(p),
        }
    }

    pub fn current_question(&self) -> Option<&str> {
        self.progress().map(|p| p.question.as_str())
    }

    /// Whether answering the current question leads to another one.
    pub fn has_next_question(&self) -> bool {
        self.progress()
            .is_some_and(|p| p.step + 1 < QUESTION_COUNT)
    }

    /// Records the answer to the current question. `next_question` must be
    /// supplied exactly when `has_next_question()` is true.
    pub fn advance(
        &mut self,
        answer: String,
        feedback: String,
        next_question: Option<String>,
    ) -> Result<StepOutcome, AppError> {
        let has_next = self.has_next_question();
        let InterviewState::InProgress(progress) = self else {
            return Err(AppError::Validation("No interview in progress".to_string()));
        };

        match (has_next, next_question) {
            (true, Some(question)) => {
                let asked = std::mem::replace(&mut progress.question, question.clone());
                progress.turns.push(InterviewTurn {
                    question: asked,
                    answer,
                    feedback,
                });
                progress.step += 1;
                Ok(StepOutcome::Next {
                    step: progress.step,
                    question,
                })
            }
            (false, None) => {
                let mut turns = std::mem::take(&mut progress.turns);
                turns.push(InterviewTurn {
                    question: std::mem::take(&mut progress.question),
                    answer,
                    feedback,
                });
                *self = InterviewState::Idle;
                Ok(StepOutcome::Complete { turns })
            }
            (true, None) => Err(AppError::Internal(anyhow::anyhow!(
                "interview step {} advanced without a next question",
                progress.step
            ))),
            (false, Some(_)) => Err(AppError::Internal(anyhow::anyhow!(
                "interview given a question past step {}",
                QUESTION_COUNT - 1
            ))),
        }
    }
}
