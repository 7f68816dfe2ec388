// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! M-CHAT screening questionnaire scoring.

use serde::{Deserialize, Serialize};

/// The five screening questions, in order.
pub const MCHAT_QUESTIONS: [&str; 5] = [
    "If you point at something across the room, does your child look at it?",
    "Does your child play make-believe or pretend?",
    "Does your child point with one finger to show you something interesting?",
    "Does your child respond when you call his or her name?",
    "If something new happens, does your child look at your face to see how you feel about it?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tier for a given number of "No" answers.
    pub fn from_score(score: usize) -> Self {
        match score {
            0..=2 => RiskTier::Low,
            3..=4 => RiskTier::Medium,
            _ => RiskTier::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MchatResult {
    pub score: usize,
    pub risk: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssessmentError {
    #[error("Expected {expected} answers, got {actual}")]
    WrongAnswerCount { expected: usize, actual: usize },
}

/// Score a complete answer set: one point per "No".
pub fn score_mchat(answers: &[Answer]) -> Result<MchatResult, AssessmentError> {
    if answers.len() != MCHAT_QUESTIONS.len() {
        return Err(AssessmentError::WrongAnswerCount {
            expected: MCHAT_QUESTIONS.len(),
            actual: answers.len(),
        });
    }

    let score = answers.iter().filter(|a| **a == Answer::No).count();
    Ok(MchatResult {
        score,
        risk: RiskTier::from_score(score),
    })
}
