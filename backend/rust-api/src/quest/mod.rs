//! Coding mini-games: exercise catalog, scoring and the per-exercise
//! attempt lifecycle.

pub mod board;
pub mod exercise;
pub mod scoring;

pub use board::{Attempt, AttemptPhase, QuestBoard, QuestError};
pub use exercise::{Catalog, Exercise, ExerciseKey, FillBlankExercise, QuestMode, TypingExercise};
pub use scoring::{score_fill_blank, score_typing};
