//! Answer normalization and matching

pub mod matcher;
pub mod normalize;
pub mod number;
pub mod similarity;

pub use matcher::{resolve, AnswerMatcher, AnswerSource, ResolvedAnswers, Verdict};
pub use normalize::normalize;
