//! Round types and the fixed scoring rubric.
//!
//! Each of the four rounds carries its own weighted criteria. A criterion is
//! scored 0-5 by the judge and multiplied by its weight; the weighted sum is
//! scaled to the round's point allocation (30/10/35/25, summing to 100).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DebateError;

/// Number of rounds in a debate.
pub const ROUND_COUNT: u8 = 4;

/// Highest raw score a judge may award a single criterion.
pub const MAX_CRITERION_SCORE: f64 = 5.0;

/// The four debate rounds, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoundType {
    #[serde(rename = "constructive")]
    Constructive,
    #[serde(rename = "cross-ex")]
    CrossEx,
    #[serde(rename = "rebuttal")]
    Rebuttal,
    #[serde(rename = "closing")]
    Closing,
}

impl RoundType {
    pub const ALL: [RoundType; 4] = [
        RoundType::Constructive,
        RoundType::CrossEx,
        RoundType::Rebuttal,
        RoundType::Closing,
    ];

    /// Map a 1-based round position to its type.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(RoundType::Constructive),
            2 => Some(RoundType::CrossEx),
            3 => Some(RoundType::Rebuttal),
            4 => Some(RoundType::Closing),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            RoundType::Constructive => 1,
            RoundType::CrossEx => 2,
            RoundType::Rebuttal => 3,
            RoundType::Closing => 4,
        }
    }

    /// Points this round contributes to the final score.
    pub fn max_points(self) -> f64 {
        match self {
            RoundType::Constructive => 30.0,
            RoundType::CrossEx => 10.0,
            RoundType::Rebuttal => 35.0,
            RoundType::Closing => 25.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundType::Constructive => "constructive",
            RoundType::CrossEx => "cross-ex",
            RoundType::Rebuttal => "rebuttal",
            RoundType::Closing => "closing",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RoundType::Constructive => "Constructive",
            RoundType::CrossEx => "Cross-Examination",
            RoundType::Rebuttal => "Rebuttal",
            RoundType::Closing => "Closing Statement",
        }
    }

    /// What the speaker is expected to do this round.
    pub fn instructions(self) -> &'static str {
        match self {
            RoundType::Constructive => {
                "Lay out your case: state your position and give your strongest arguments."
            }
            RoundType::CrossEx => {
                "Probe your opponent's case with pointed questions and answer theirs directly."
            }
            RoundType::Rebuttal => {
                "Refute your opponent's key arguments and rebuild the parts of your case they attacked."
            }
            RoundType::Closing => {
                "Summarize the debate, weigh the most important issues, and explain why your side wins."
            }
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundType {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constructive" => Ok(RoundType::Constructive),
            "cross-ex" | "crossex" | "cross_ex" => Ok(RoundType::CrossEx),
            "rebuttal" => Ok(RoundType::Rebuttal),
            "closing" => Ok(RoundType::Closing),
            other => Err(DebateError::Validation(format!(
                "Unknown round type: {}",
                other
            ))),
        }
    }
}

/// One weighted scoring criterion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub name: &'static str,
    pub description: &'static str,
    /// Multiplier applied to the raw 0-5 score (1 or 2).
    pub weight: u8,
    /// Illustrative only; not used in scoring.
    pub examples: &'static [&'static str],
}

const CONSTRUCTIVE: &[Criterion] = &[
    Criterion {
        name: "Clarity of Position",
        description: "States a clear, specific stance on the resolution.",
        weight: 2,
        examples: &["\"Uniforms should be mandatory because they remove visible income gaps.\""],
    },
    Criterion {
        name: "Evidence and Support",
        description: "Backs claims with evidence, data, or well-chosen examples.",
        weight: 2,
        examples: &["Citing a study on attendance after a uniform policy was introduced."],
    },
    Criterion {
        name: "Logical Structure",
        description: "Arguments follow from one another and are easy to track.",
        weight: 1,
        examples: &["Numbered contentions with a claim, warrant, and impact each."],
    },
];

const CROSS_EX: &[Criterion] = &[
    Criterion {
        name: "Question Quality",
        description: "Asks targeted questions that expose weaknesses in the opposing case.",
        weight: 1,
        examples: &["\"If costs are the concern, why not subsidise uniforms instead of dropping them?\""],
    },
    Criterion {
        name: "Answer Handling",
        description: "Answers challenges directly without conceding ground unnecessarily.",
        weight: 1,
        examples: &["Acknowledging a cost point while redirecting to net savings."],
    },
];

const REBUTTAL: &[Criterion] = &[
    Criterion {
        name: "Direct Clash",
        description: "Engages the opponent's actual arguments rather than a straw man.",
        weight: 2,
        examples: &["Quoting the opponent's claim before answering it."],
    },
    Criterion {
        name: "Refutation Strength",
        description: "Shows why opposing arguments fail on evidence or reasoning.",
        weight: 2,
        examples: &["Pointing out that a cited survey measured a different population."],
    },
    Criterion {
        name: "Defense of Case",
        description: "Rebuilds own arguments that were attacked.",
        weight: 1,
        examples: &["Re-extending an uncontested contention."],
    },
];

const CLOSING: &[Criterion] = &[
    Criterion {
        name: "Crystallization",
        description: "Narrows the debate to the issues that decide it.",
        weight: 2,
        examples: &["\"This round comes down to two questions...\""],
    },
    Criterion {
        name: "Impact Weighing",
        description: "Compares the size and likelihood of each side's impacts.",
        weight: 2,
        examples: &["Arguing that equity outweighs self-expression for younger students."],
    },
    Criterion {
        name: "Persuasive Delivery",
        description: "Ends with a compelling, confident summary.",
        weight: 1,
        examples: &["A memorable final line tied back to the opening."],
    },
];

/// Criteria for a round.
pub fn rubric_for(round_type: RoundType) -> &'static [Criterion] {
    match round_type {
        RoundType::Constructive => CONSTRUCTIVE,
        RoundType::CrossEx => CROSS_EX,
        RoundType::Rebuttal => REBUTTAL,
        RoundType::Closing => CLOSING,
    }
}

/// Sum of criterion weights for a round.
pub fn weight_sum(round_type: RoundType) -> u32 {
    rubric_for(round_type)
        .iter()
        .map(|c| u32::from(c.weight))
        .sum()
}

/// The rubric for one round, as served to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRubric {
    pub round_type: RoundType,
    pub round_number: u8,
    pub max_points: f64,
    pub criteria: &'static [Criterion],
}

/// The full rubric in round order.
pub fn full_rubric() -> Vec<RoundRubric> {
    RoundType::ALL
        .iter()
        .map(|&round_type| RoundRubric {
            round_type,
            round_number: round_type.number(),
            max_points: round_type.max_points(),
            criteria: rubric_for(round_type),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_mapping_is_fixed() {
        assert_eq!(RoundType::from_number(1), Some(RoundType::Constructive));
        assert_eq!(RoundType::from_number(2), Some(RoundType::CrossEx));
        assert_eq!(RoundType::from_number(3), Some(RoundType::Rebuttal));
        assert_eq!(RoundType::from_number(4), Some(RoundType::Closing));
        assert_eq!(RoundType::from_number(0), None);
        assert_eq!(RoundType::from_number(5), None);
        for round_type in RoundType::ALL {
            assert_eq!(RoundType::from_number(round_type.number()), Some(round_type));
        }
    }

    #[test]
    fn test_point_allocation_sums_to_100() {
        let total: f64 = RoundType::ALL.iter().map(|r| r.max_points()).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_weights_are_one_or_two() {
        for round_type in RoundType::ALL {
            let criteria = rubric_for(round_type);
            assert!(!criteria.is_empty());
            assert!(criteria.iter().all(|c| c.weight == 1 || c.weight == 2));
        }
        assert_eq!(weight_sum(RoundType::Constructive), 5);
        assert_eq!(weight_sum(RoundType::CrossEx), 2);
    }

    #[test]
    fn test_round_type_serde_names() {
        let json = serde_json::to_string(&RoundType::CrossEx).unwrap();
        assert_eq!(json, "\"cross-ex\"");
        let parsed: RoundType = serde_json::from_str("\"closing\"").unwrap();
        assert_eq!(parsed, RoundType::Closing);
        assert_eq!("Cross-Ex".parse::<RoundType>().unwrap(), RoundType::CrossEx);
        assert!("opening".parse::<RoundType>().is_err());
    }

    #[test]
    fn test_full_rubric_in_order() {
        let rubric = full_rubric();
        let numbers: Vec<u8> = rubric.iter().map(|r| r.round_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
