use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use super::exercise::{Catalog, Exercise, ExerciseError, QuestMode};
use super::scoring::{score_fill_blank, score_typing};
use crate::client::identity::PlayerSession;
use crate::sync::ProgressReporter;

#[derive(Debug, Error)]
pub enum QuestError {
    #[error(transparent)]
    Exercise(#[from] ExerciseError),
    #[error("the open exercise is a {0} quest")]
    WrongMode(QuestMode),
    #[error("blank {slot} does not exist (exercise has {slots} blanks)")]
    NoSuchBlank { slot: usize, slots: usize },
}

/// Where the open exercise is in its lifecycle. Completion is not terminal:
/// editing after "Mark Complete" goes back to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Empty,
    InProgress,
    MarkedComplete,
}

/// User input for the open exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Typing(String),
    FillBlank(Vec<String>),
}

impl Attempt {
    pub fn for_exercise(exercise: &Exercise) -> Self {
        match exercise {
            Exercise::Typing(_) => Attempt::Typing(String::new()),
            Exercise::FillBlank(ex) => Attempt::FillBlank(vec![String::new(); ex.blanks.len()]),
        }
    }

    /// JSON payload stored alongside the percentage.
    pub fn payload(&self) -> String {
        match self {
            Attempt::Typing(typed) => json!({ "typed": typed }).to_string(),
            Attempt::FillBlank(answers) => json!({ "answers": answers }).to_string(),
        }
    }

    /// Attempt that exactly matches the exercise's canonical content.
    pub fn canonical(exercise: &Exercise) -> Self {
        match exercise {
            Exercise::Typing(ex) => Attempt::Typing(ex.snippet.clone()),
            Exercise::FillBlank(ex) => Attempt::FillBlank(ex.blanks.clone()),
        }
    }

    pub fn score(&self, exercise: &Exercise) -> u8 {
        match (exercise, self) {
            (Exercise::Typing(ex), Attempt::Typing(typed)) => score_typing(&ex.snippet, typed),
            (Exercise::FillBlank(ex), Attempt::FillBlank(answers)) => {
                score_fill_blank(&ex.blanks, answers)
            }
            _ => 0,
        }
    }
}

/// Drives one open exercise at a time: every mutation rescores the attempt
/// and hands the new percentage to the reporter.
pub struct QuestBoard<R: ProgressReporter> {
    catalog: Arc<Catalog>,
    session: PlayerSession,
    reporter: R,
    exercise: Exercise,
    attempt: Attempt,
    percentage: u8,
    phase: AttemptPhase,
}

impl<R: ProgressReporter> QuestBoard<R> {
    pub fn new(
        catalog: Arc<Catalog>,
        session: PlayerSession,
        reporter: R,
        mode: QuestMode,
        language: &str,
        index: usize,
    ) -> Result<Self, QuestError> {
        let exercise = catalog.exercise(mode, language, index)?;
        let attempt = Attempt::for_exercise(&exercise);
        let percentage = attempt.score(&exercise);
        Ok(Self {
            catalog,
            session,
            reporter,
            exercise,
            attempt,
            percentage,
            phase: AttemptPhase::Empty,
        })
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    pub fn set_session(&mut self, session: PlayerSession) {
        self.session = session;
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Opens another exercise, discarding the current attempt. Lookup
    /// failures leave the current exercise untouched.
    pub fn open(&mut self, mode: QuestMode, language: &str, index: usize) -> Result<(), QuestError> {
        let exercise = self.catalog.exercise(mode, language, index)?;
        self.reporter
            .exercise_closed(&self.exercise.key().to_string());

        tracing::debug!(exercise = %exercise.key(), "Opening exercise");
        self.attempt = Attempt::for_exercise(&exercise);
        self.percentage = self.attempt.score(&exercise);
        self.exercise = exercise;
        self.phase = AttemptPhase::Empty;
        Ok(())
    }

    pub fn select_mode(&mut self, mode: QuestMode) -> Result<(), QuestError> {
        let language = self.exercise.language().to_string();
        self.open(mode, &language, 0)
    }

    pub fn switch_language(&mut self, language: &str) -> Result<(), QuestError> {
        self.open(self.exercise.mode(), language, 0)
    }

    /// Moves to the next exercise of the same kind, wrapping around.
    pub fn next_exercise(&mut self) -> Result<(), QuestError> {
        let mode = self.exercise.mode();
        let language = self.exercise.language().to_string();
        let count = self.catalog.count(mode, &language).max(1);
        let next = (self.exercise.index() + 1) % count;
        self.open(mode, &language, next)
    }

    /// Replaces the whole typed text, as a text area change event would.
    pub fn set_typed(&mut self, text: &str) -> Result<u8, QuestError> {
        self.typed_mut()?.replace_range(.., text);
        Ok(self.commit())
    }

    pub fn type_char(&mut self, c: char) -> Result<u8, QuestError> {
        self.typed_mut()?.push(c);
        Ok(self.commit())
    }

    pub fn backspace(&mut self) -> Result<u8, QuestError> {
        self.typed_mut()?.pop();
        Ok(self.commit())
    }

    pub fn set_blank(&mut self, slot: usize, value: &str) -> Result<u8, QuestError> {
        let Attempt::FillBlank(answers) = &mut self.attempt else {
            return Err(QuestError::WrongMode(self.exercise.mode()));
        };
        let slots = answers.len();
        let answer = answers
            .get_mut(slot)
            .ok_or(QuestError::NoSuchBlank { slot, slots })?;
        answer.replace_range(.., value);
        Ok(self.commit())
    }

    /// Clears the attempt. The cleared state is reported like any edit.
    pub fn reset(&mut self) -> u8 {
        self.attempt = Attempt::for_exercise(&self.exercise);
        let pct = self.commit();
        self.phase = AttemptPhase::Empty;
        pct
    }

    /// Self-reported completion: reports 100% with the canonical answer as
    /// payload, whatever the attempt currently looks like. The exercise stays
    /// editable.
    pub fn mark_complete(&mut self) {
        let key = self.exercise.key().to_string();
        let payload = Attempt::canonical(&self.exercise).payload();
        tracing::info!(exercise = %key, "Exercise marked complete");

        self.percentage = 100;
        self.phase = AttemptPhase::MarkedComplete;
        self.reporter
            .report_now(self.session.identifier(), &key, 100, payload);
    }

    fn typed_mut(&mut self) -> Result<&mut String, QuestError> {
        match &mut self.attempt {
            Attempt::Typing(typed) => Ok(typed),
            Attempt::FillBlank(_) => Err(QuestError::WrongMode(QuestMode::FillBlank)),
        }
    }

    fn commit(&mut self) -> u8 {
        self.percentage = self.attempt.score(&self.exercise);
        self.phase = AttemptPhase::InProgress;
        self.reporter.report(
            self.session.identifier(),
            &self.exercise.key().to_string(),
            self.percentage,
            self.attempt.payload(),
        );
        self.percentage
    }
}
