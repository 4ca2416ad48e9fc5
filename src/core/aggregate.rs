use crate::models::{Component, ComponentScores, Recommendation, RubricWeights, TierThresholds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub overall: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
}

pub fn weight_of(weights: &RubricWeights, component: Component) -> f64 {
    match component {
        Component::Semantic => weights.semantic,
        Component::Skills => weights.skills,
        Component::Experience => weights.experience,
        Component::Education => weights.education,
        Component::Projects => weights.projects,
    }
}

pub fn tier(overall: f64, thresholds: &TierThresholds) -> Recommendation {
    if overall >= thresholds.shortlist {
        Recommendation::Shortlist
    } else if overall >= thresholds.maybe {
        Recommendation::Maybe
    } else {
        Recommendation::Reject
    }
}

/// Weighted rubric sum, mean confidence and recommendation tier
pub fn aggregate(
    scores: &ComponentScores,
    confidence: &ComponentScores,
    weights: &RubricWeights,
    thresholds: &TierThresholds,
) -> Aggregate {
    let overall = Component::ALL
        .iter()
        .map(|c| scores.get(*c) * weight_of(weights, *c))
        .sum::<f64>()
        .clamp(0.0, 100.0);

    Aggregate {
        overall,
        confidence: confidence.mean().clamp(0.0, 1.0),
        recommendation: tier(overall, thresholds),
    }
}
