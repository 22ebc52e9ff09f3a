//! Grading aggregation.
//!
//! Turns raw per-criterion scores from the judge into weighted subtotals and
//! a final composite score.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DebateError;
use crate::rubric::{MAX_CRITERION_SCORE, RoundType, rubric_for, weight_sum};
use crate::session::Source;

/// Score awarded to every criterion when the judge is unavailable.
pub const FALLBACK_CRITERION_SCORE: f64 = 3.0;

/// A single criterion's raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    pub criterion: String,
    pub weight: u8,
    pub score: f64,
}

/// Scores for one round category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundGrading {
    pub round_type: RoundType,
    pub scores: Vec<CriterionScore>,
    pub subtotal: f64,
    pub max_points: f64,
    pub feedback: Option<String>,
    pub source: Source,
}

/// Composite grading for a finished debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGrading {
    pub constructive: RoundGrading,
    pub cross_ex: RoundGrading,
    pub rebuttal: RoundGrading,
    pub closing: RoundGrading,
    pub final_score: f64,
    /// True when any category was scored by the fallback.
    pub fallback: bool,
}

impl FinalGrading {
    pub fn categories(&self) -> [&RoundGrading; 4] {
        [&self.constructive, &self.cross_ex, &self.rebuttal, &self.closing]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted subtotal scaled to the round's point allocation.
pub fn compute_subtotal(round_type: RoundType, scores: &[CriterionScore]) -> f64 {
    let max_weighted = MAX_CRITERION_SCORE * f64::from(weight_sum(round_type));
    if max_weighted == 0.0 {
        return 0.0;
    }
    let weighted: f64 = scores
        .iter()
        .map(|s| f64::from(s.weight) * s.score)
        .sum();
    round2(weighted / max_weighted * round_type.max_points())
}

/// Build a grading from raw judge scores keyed by criterion name.
///
/// Every rubric criterion must be present with a finite score in [0, 5].
pub fn grade_from_scores(
    round_type: RoundType,
    raw: &HashMap<String, f64>,
    feedback: Option<String>,
    source: Source,
) -> Result<RoundGrading, DebateError> {
    let mut scores = Vec::new();
    for criterion in rubric_for(round_type) {
        let score = *raw.get(criterion.name).ok_or_else(|| {
            DebateError::Validation(format!(
                "Missing score for '{}' in {} grading",
                criterion.name, round_type
            ))
        })?;
        if !score.is_finite() || !(0.0..=MAX_CRITERION_SCORE).contains(&score) {
            return Err(DebateError::Validation(format!(
                "Score {} for '{}' is outside 0-5",
                score, criterion.name
            )));
        }
        scores.push(CriterionScore {
            criterion: criterion.name.to_string(),
            weight: criterion.weight,
            score,
        });
    }

    let subtotal = compute_subtotal(round_type, &scores);
    Ok(RoundGrading {
        round_type,
        scores,
        subtotal,
        max_points: round_type.max_points(),
        feedback,
        source,
    })
}

/// Deterministic "adequate" grading used when the judge cannot be reached.
pub fn fallback_grading(round_type: RoundType) -> RoundGrading {
    let scores: Vec<CriterionScore> = rubric_for(round_type)
        .iter()
        .map(|c| CriterionScore {
            criterion: c.name.to_string(),
            weight: c.weight,
            score: FALLBACK_CRITERION_SCORE,
        })
        .collect();
    let subtotal = compute_subtotal(round_type, &scores);

    RoundGrading {
        round_type,
        scores,
        subtotal,
        max_points: round_type.max_points(),
        feedback: Some("Automatic scoring was unavailable; an adequate score was assigned.".to_string()),
        source: Source::Fallback,
    }
}

/// Combine one grading per round into the final result.
pub fn aggregate(gradings: &[RoundGrading]) -> Result<FinalGrading, DebateError> {
    let find = |round_type: RoundType| -> Result<RoundGrading, DebateError> {
        let mut matching = gradings.iter().filter(|g| g.round_type == round_type);
        match (matching.next(), matching.next()) {
            (Some(grading), None) => Ok(grading.clone()),
            (None, _) => Err(DebateError::Validation(format!(
                "No grading for the {} round",
                round_type
            ))),
            (Some(_), Some(_)) => Err(DebateError::Validation(format!(
                "Duplicate grading for the {} round",
                round_type
            ))),
        }
    };

    let constructive = find(RoundType::Constructive)?;
    let cross_ex = find(RoundType::CrossEx)?;
    let rebuttal = find(RoundType::Rebuttal)?;
    let closing = find(RoundType::Closing)?;

    let final_score = round2(
        constructive.subtotal + cross_ex.subtotal + rebuttal.subtotal + closing.subtotal,
    );
    let fallback = [&constructive, &cross_ex, &rebuttal, &closing]
        .iter()
        .any(|g| g.source == Source::Fallback);

    Ok(FinalGrading {
        constructive,
        cross_ex,
        rebuttal,
        closing,
        final_score,
        fallback,
    })
}
