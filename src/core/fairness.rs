use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{FairnessMetric, FairnessReport, GroupAttribute, GroupStats};

/// Pass/fail thresholds for the distribution checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairnessThresholds {
    /// Gini coefficient of the score distribution must not exceed this
    #[serde(default = "default_max_gini")]
    pub max_gini: f64,
    /// Four-fifths rule on top-K selection rates
    #[serde(default = "default_min_disparate_impact")]
    pub min_disparate_impact: f64,
    /// Largest allowed gap between group mean scores, in score points
    #[serde(default = "default_max_parity_gap")]
    pub max_parity_gap: f64,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_max_gini() -> f64 { 0.4 }
fn default_min_disparate_impact() -> f64 { 0.8 }
fn default_max_parity_gap() -> f64 { 10.0 }
fn default_top_k() -> usize { 10 }

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self {
            max_gini: default_max_gini(),
            min_disparate_impact: default_min_disparate_impact(),
            max_parity_gap: default_max_parity_gap(),
            default_top_k: default_top_k(),
        }
    }
}

/// Gini coefficient in [0, 1]; 0 for empty or all-zero inputs
pub fn gini(scores: &[f64]) -> f64 {
    let n = scores.len();
    let total: f64 = scores.iter().sum();
    if n == 0 || total <= 0.0 {
        return 0.0;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n_f = n as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * (i as f64 + 1.0) - n_f - 1.0) * x)
        .sum();

    (weighted / (n_f * total)).clamp(0.0, 1.0)
}

/// Per-group statistics over a ranked list (highest score first). Candidates
/// without a group label are left out of the group metrics.
pub fn group_stats(ranked: &[(String, f64)], attribute: &GroupAttribute, top_k: usize) -> Vec<GroupStats> {
    let mut by_group: BTreeMap<&str, (usize, f64, usize)> = BTreeMap::new();

    for (position, (candidate_id, score)) in ranked.iter().enumerate() {
        let Some(group) = attribute.groups.get(candidate_id) else {
            continue;
        };
        let entry = by_group.entry(group.as_str()).or_insert((0, 0.0, 0));
        entry.0 += 1;
        entry.1 += score;
        if position < top_k {
            entry.2 += 1;
        }
    }

    by_group
        .into_iter()
        .map(|(group, (size, total, selected))| GroupStats {
            group: group.to_string(),
            size,
            mean_score: total / size as f64,
            selected,
            selection_rate: selected as f64 / size as f64,
        })
        .collect()
}

/// Lowest over highest selection rate. 1.0 when nobody was selected.
pub fn disparate_impact(groups: &[GroupStats]) -> f64 {
    let rates = groups.iter().map(|g| g.selection_rate);
    let max = rates.clone().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return 1.0;
    }
    let min = rates.fold(f64::INFINITY, f64::min);
    min / max
}

/// Largest gap between group mean scores
pub fn parity_gap(groups: &[GroupStats]) -> f64 {
    let means = groups.iter().map(|g| g.mean_score);
    let max = means.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = means.fold(f64::INFINITY, f64::min);
    if groups.is_empty() {
        0.0
    } else {
        max - min
    }
}

#[derive(Debug, Clone)]
pub struct FairnessEvaluation {
    pub reports: Vec<FairnessReport>,
    pub groups: Vec<GroupStats>,
}

/// Run every applicable check. Group checks need a consented attribute and at
/// least two populated groups; otherwise only the Gini check runs.
pub fn evaluate(
    audit_id: Uuid,
    ranked: &[(String, f64)],
    attribute: Option<&GroupAttribute>,
    top_k: usize,
    thresholds: &FairnessThresholds,
) -> Result<FairnessEvaluation, EngineError> {
    if let Some(attribute) = attribute {
        if !attribute.consent {
            return Err(EngineError::ConsentRequired {
                attribute: attribute.name.clone(),
            });
        }
    }

    let scores: Vec<f64> = ranked.iter().map(|(_, s)| *s).collect();
    let gini_value = gini(&scores);
    let mut reports = vec![FairnessReport {
        audit_id,
        metric_type: FairnessMetric::Gini,
        value: gini_value,
        threshold: thresholds.max_gini,
        passed: gini_value <= thresholds.max_gini,
    }];

    let groups = attribute
        .map(|attr| group_stats(ranked, attr, top_k))
        .unwrap_or_default();

    if groups.len() >= 2 {
        let impact = disparate_impact(&groups);
        reports.push(FairnessReport {
            audit_id,
            metric_type: FairnessMetric::DisparateImpact,
            value: impact,
            threshold: thresholds.min_disparate_impact,
            passed: impact >= thresholds.min_disparate_impact,
        });

        let gap = parity_gap(&groups);
        reports.push(FairnessReport {
            audit_id,
            metric_type: FairnessMetric::StatisticalParity,
            value: gap,
            threshold: thresholds.max_parity_gap,
            passed: gap <= thresholds.max_parity_gap,
        });
    }

    Ok(FairnessEvaluation { reports, groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(consent: bool, pairs: &[(&str, &str)]) -> GroupAttribute {
        GroupAttribute {
            name: "cohort".to_string(),
            consent,
            groups: pairs
                .iter()
                .map(|(c, g)| (c.to_string(), g.to_string()))
                .collect(),
        }
    }

    fn ranked(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn test_gini_equal_scores_is_zero() {
        assert_eq!(gini(&[50.0, 50.0, 50.0]), 0.0);
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_gini_concentrated() {
        let g = gini(&[0.0, 0.0, 0.0, 100.0]);
        assert!((g - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_consent_required() {
        let result = evaluate(
            Uuid::new_v4(),
            &ranked(&[("a", 80.0)]),
            Some(&attribute(false, &[("a", "x")])),
            1,
            &FairnessThresholds::default(),
        );
        assert!(matches!(result, Err(EngineError::ConsentRequired { .. })));
    }

    #[test]
    fn test_disparate_impact_flags_skewed_selection() {
        let list = ranked(&[("a1", 90.0), ("a2", 85.0), ("b1", 60.0), ("b2", 55.0)]);
        let attr = attribute(true, &[("a1", "A"), ("a2", "A"), ("b1", "B"), ("b2", "B")]);

        let evaluation = evaluate(Uuid::new_v4(), &list, Some(&attr), 2, &FairnessThresholds::default()).unwrap();

        assert_eq!(evaluation.reports.len(), 3);
        let impact = evaluation
            .reports
            .iter()
            .find(|r| r.metric_type == FairnessMetric::DisparateImpact)
            .unwrap();
        assert_eq!(impact.value, 0.0);
        assert!(!impact.passed);

        let parity = evaluation
            .reports
            .iter()
            .find(|r| r.metric_type == FairnessMetric::StatisticalParity)
            .unwrap();
        assert!((parity.value - 30.0).abs() < 1e-9);
        assert!(!parity.passed);
    }

    #[test]
    fn test_single_group_skips_group_checks() {
        let list = ranked(&[("a1", 90.0), ("a2", 85.0)]);
        let attr = attribute(true, &[("a1", "A"), ("a2", "A")]);
        let evaluation = evaluate(Uuid::new_v4(), &list, Some(&attr), 1, &FairnessThresholds::default()).unwrap();
        assert_eq!(evaluation.reports.len(), 1);
        assert_eq!(evaluation.reports[0].metric_type, FairnessMetric::Gini);
    }

    #[test]
    fn test_no_selection_is_neutral() {
        let groups = vec![
            GroupStats { group: "A".into(), size: 1, mean_score: 10.0, selected: 0, selection_rate: 0.0 },
            GroupStats { group: "B".into(), size: 1, mean_score: 10.0, selected: 0, selection_rate: 0.0 },
        ];
        assert_eq!(disparate_impact(&groups), 1.0);
    }
}
