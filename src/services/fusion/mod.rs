use crate::models::{
    HybridRecord, ReasonTag, ScoreRecord, ScoreSource, StrategyWeights, UserProfile,
};
use std::collections::{HashMap, HashSet};

/// Maturity-adaptive strategy weights. Early users lean on content and
/// rules; mature users lean on collaborative signals; the sequence share
/// tracks engagement recency.
pub fn weight_policy(profile: &UserProfile) -> StrategyWeights {
    let base = if profile.rating_count < 5 {
        StrategyWeights {
            content: 0.40,
            collaborative: 0.10,
            sequence: 0.20 + 0.1 * profile.recency_score,
            rule: 0.30,
        }
    } else if profile.rating_count < 25 {
        StrategyWeights {
            content: 0.35,
            collaborative: 0.25,
            sequence: 0.25 + 0.05 * profile.session_depth,
            rule: 0.15,
        }
    } else {
        StrategyWeights {
            content: 0.25,
            collaborative: 0.45,
            sequence: 0.20 + 0.1 * profile.recency_score,
            rule: 0.10,
        }
    };

    base.normalized()
}

/// Raw per-strategy outputs feeding fusion. Order between strategies does
/// not matter; fusion is commutative over them.
#[derive(Debug, Default)]
pub struct StrategyOutputs {
    pub content: Vec<ScoreRecord>,
    pub collaborative: Vec<ScoreRecord>,
    pub sequence: Vec<ScoreRecord>,
    pub rule: Vec<ScoreRecord>,
}

fn slot<'a>(
    map: &'a mut HashMap<i64, HybridRecord>,
    record: ScoreRecord,
    weights: StrategyWeights,
) -> &'a mut HybridRecord {
    map.entry(record.item_id).or_insert_with(|| HybridRecord {
        item_id: record.item_id,
        movie: record.movie,
        content_score: 0.0,
        collaborative_score: 0.0,
        sequence_score: 0.0,
        rule_score: 0.0,
        weights,
        score: 0.0,
        source: ScoreSource::Hybrid,
        reasons: Vec::new(),
    })
}

/// Merges strategy outputs into hybrid records. Every strategy slot
/// defaults to zero and is overwritten by that strategy's score, then the
/// hybrid score is the weighted linear blend.
pub fn fuse(
    outputs: StrategyOutputs,
    weights: StrategyWeights,
    include_explanations: bool,
) -> Vec<HybridRecord> {
    let mut by_id: HashMap<i64, HybridRecord> = HashMap::new();

    for record in outputs.content {
        let score = record.score;
        slot(&mut by_id, record, weights).content_score = score;
    }
    for record in outputs.collaborative {
        let score = record.score;
        slot(&mut by_id, record, weights).collaborative_score = score;
    }
    for record in outputs.sequence {
        let score = record.score;
        slot(&mut by_id, record, weights).sequence_score = score;
    }
    for record in outputs.rule {
        let score = record.score;
        slot(&mut by_id, record, weights).rule_score = score;
    }

    let mut records: Vec<HybridRecord> = by_id.into_values().collect();
    for record in &mut records {
        record.score = record.content_score * weights.content
            + record.collaborative_score * weights.collaborative
            + record.sequence_score * weights.sequence
            + record.rule_score * weights.rule;

        if include_explanations {
            record.reasons = explain(record, &weights);
        }
    }

    records
}

fn explain(record: &HybridRecord, weights: &StrategyWeights) -> Vec<ReasonTag> {
    let mut reasons = Vec::new();
    if record.content_score > 0.7 && weights.content > 0.2 {
        reasons.push(ReasonTag::StrongContent);
    }
    if record.collaborative_score > 0.7 && weights.collaborative > 0.2 {
        reasons.push(ReasonTag::SimilarUsers);
    }
    if record.sequence_score > 0.7 && weights.sequence > 0.2 {
        reasons.push(ReasonTag::SessionFlow);
    }
    if record.rule_score > 0.6 && weights.rule > 0.1 {
        reasons.push(ReasonTag::OnboardingMatch);
    }
    reasons
}

/// Greedy overlap penalty. Records are rescored, never dropped; a record
/// sharing no genre and no director with anything ranked above it keeps
/// its score untouched.
pub fn apply_diversity(records: &mut Vec<HybridRecord>, diversity_factor: f64) {
    if diversity_factor <= 0.0 {
        return;
    }

    sort_by_score(records);

    let mut seen_genres: HashSet<String> = HashSet::new();
    let mut seen_directors: HashSet<String> = HashSet::new();

    for record in records.iter_mut() {
        let genre_overlap = record.movie.genres.iter().any(|g| seen_genres.contains(g));
        let director_overlap = record
            .movie
            .directors
            .iter()
            .any(|d| seen_directors.contains(d));

        let penalty =
            0.3 * f64::from(genre_overlap as u8) + 0.2 * f64::from(director_overlap as u8);
        record.score *= 1.0 - penalty * diversity_factor;

        seen_genres.extend(record.movie.genres.iter().cloned());
        seen_directors.extend(record.movie.directors.iter().cloned());
    }
}

/// Drops records under the score floor, orders by (score desc, item_id
/// asc), and truncates to `count`.
pub fn rank(mut records: Vec<HybridRecord>, min_score: f64, count: usize) -> Vec<HybridRecord> {
    records.retain(|r| r.score >= min_score);
    sort_by_score(&mut records);
    records.truncate(count);
    records
}

fn sort_by_score(records: &mut [HybridRecord]) {
    records.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.item_id.cmp(&b.item_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;

    fn record(item_id: i64, score: f64, source: ScoreSource) -> ScoreRecord {
        ScoreRecord {
            item_id,
            movie: Movie::new(item_id, format!("movie-{}", item_id)),
            score,
            source,
        }
    }

    fn fixed_weights() -> StrategyWeights {
        StrategyWeights {
            content: 0.4,
            collaborative: 0.3,
            sequence: 0.2,
            rule: 0.1,
        }
    }

    #[test]
    fn test_fusion_arithmetic() {
        let outputs = StrategyOutputs {
            content: vec![record(1, 0.8, ScoreSource::Content)],
            collaborative: vec![record(1, 0.6, ScoreSource::CollaborativeMatrix)],
            sequence: vec![record(1, 0.7, ScoreSource::Sequence)],
            rule: vec![record(1, 0.5, ScoreSource::Rule)],
        };

        let records = fuse(outputs, fixed_weights(), false);
        assert_eq!(records.len(), 1);
        assert!((records[0].score - 0.69).abs() < 1e-9);
        assert_eq!(records[0].source, ScoreSource::Hybrid);
    }

    #[test]
    fn test_missing_strategy_slot_is_zero() {
        let outputs = StrategyOutputs {
            content: vec![record(1, 0.9, ScoreSource::Content)],
            ..Default::default()
        };

        let records = fuse(outputs, fixed_weights(), false);
        assert_eq!(records[0].collaborative_score, 0.0);
        assert_eq!(records[0].sequence_score, 0.0);
        assert_eq!(records[0].rule_score, 0.0);
        assert!((records[0].score - 0.9 * 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_fusion_unions_items_across_strategies() {
        let outputs = StrategyOutputs {
            content: vec![record(1, 0.5, ScoreSource::Content)],
            rule: vec![record(2, 0.8, ScoreSource::Rule)],
            ..Default::default()
        };

        let mut records = fuse(outputs, fixed_weights(), false);
        records.sort_by_key(|r| r.item_id);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].content_score, 0.0);
        assert!((records[1].rule_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_explanation_thresholds() {
        let outputs = StrategyOutputs {
            content: vec![record(1, 0.8, ScoreSource::Content)],
            collaborative: vec![record(1, 0.71, ScoreSource::CollaborativeMatrix)],
            sequence: vec![record(1, 0.2, ScoreSource::Sequence)],
            rule: vec![record(1, 0.65, ScoreSource::Rule)],
        };

        let weights = StrategyWeights {
            content: 0.35,
            collaborative: 0.25,
            sequence: 0.25,
            rule: 0.15,
        };
        let records = fuse(outputs, weights, true);
        let reasons = &records[0].reasons;

        assert!(reasons.contains(&ReasonTag::StrongContent));
        assert!(reasons.contains(&ReasonTag::SimilarUsers));
        assert!(reasons.contains(&ReasonTag::OnboardingMatch));
        assert!(!reasons.contains(&ReasonTag::SessionFlow));
    }

    #[test]
    fn test_explanations_off_by_default() {
        let outputs = StrategyOutputs {
            content: vec![record(1, 0.9, ScoreSource::Content)],
            ..Default::default()
        };
        let records = fuse(outputs, fixed_weights(), false);
        assert!(records[0].reasons.is_empty());
    }

    #[test]
    fn test_weight_tiers_at_boundaries() {
        let mut profile = UserProfile::degenerate("u");

        profile.rating_count = 4;
        let tier1 = weight_policy(&profile);
        assert!((tier1.content - 0.4).abs() < 1e-9);
        assert!((tier1.rule - 0.3).abs() < 1e-9);

        profile.rating_count = 5;
        let tier2 = weight_policy(&profile);
        assert!((tier2.content - 0.35).abs() < 1e-9);
        assert!((tier2.collaborative - 0.25).abs() < 1e-9);

        profile.rating_count = 25;
        let tier3 = weight_policy(&profile);
        assert!((tier3.collaborative - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_weights_form_a_simplex() {
        let mut profile = UserProfile::degenerate("u");
        profile.recency_score = 1.0;
        profile.session_depth = 1.0;

        for rating_count in [0, 4, 5, 24, 25, 100] {
            profile.rating_count = rating_count;
            let weights = weight_policy(&profile);
            assert!((weights.sum() - 1.0).abs() < 1e-9);
            assert!(weights.content >= 0.0);
            assert!(weights.collaborative >= 0.0);
            assert!(weights.sequence >= 0.0);
            assert!(weights.rule >= 0.0);
        }
    }

    #[test]
    fn test_maturity_moves_weight_toward_collaborative() {
        let mut profile = UserProfile::degenerate("u");
        let mut previous_collab = -1.0;
        let mut previous_rule = 2.0;

        for rating_count in [0, 5, 25] {
            profile.rating_count = rating_count;
            let weights = weight_policy(&profile);
            assert!(weights.collaborative >= previous_collab);
            assert!(weights.rule <= previous_rule);
            previous_collab = weights.collaborative;
            previous_rule = weights.rule;
        }
    }

    fn hybrid(item_id: i64, score: f64, genres: &[&str], directors: &[&str]) -> HybridRecord {
        HybridRecord {
            item_id,
            movie: Movie::new(item_id, format!("movie-{}", item_id))
                .with_genres(genres.iter().map(|g| g.to_string()).collect())
                .with_directors(directors.iter().map(|d| d.to_string()).collect()),
            content_score: 0.0,
            collaborative_score: 0.0,
            sequence_score: 0.0,
            rule_score: 0.0,
            weights: fixed_weights(),
            score,
            source: ScoreSource::Hybrid,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn test_diversity_penalizes_overlap_without_dropping() {
        let mut records = vec![
            hybrid(1, 0.9, &["Action"], &["Nolan"]),
            hybrid(2, 0.8, &["Action"], &["Nolan"]),
            hybrid(3, 0.7, &["Romance"], &["Gerwig"]),
        ];

        apply_diversity(&mut records, 1.0);

        assert_eq!(records.len(), 3);
        // Leader untouched; full overlap penalized by 0.5; disjoint untouched.
        assert!((records[0].score - 0.9).abs() < 1e-9);
        assert!((records[1].score - 0.8 * 0.5).abs() < 1e-9);
        assert!((records[2].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_diversity_never_raises_scores() {
        let mut records = vec![
            hybrid(1, 0.9, &["Action"], &[]),
            hybrid(2, 0.85, &["Action"], &[]),
            hybrid(3, 0.8, &["Action"], &[]),
        ];
        let before: Vec<f64> = records.iter().map(|r| r.score).collect();

        apply_diversity(&mut records, 0.25);

        for (record, original) in records.iter().zip(before) {
            assert!(record.score <= original + 1e-12);
        }
    }

    #[test]
    fn test_zero_diversity_factor_is_a_no_op() {
        let mut records = vec![hybrid(2, 0.8, &["Action"], &[]), hybrid(1, 0.9, &["Action"], &[])];
        apply_diversity(&mut records, 0.0);

        // Not even reordered.
        assert_eq!(records[0].item_id, 2);
        assert!((records[1].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_rank_cuts_sorts_and_truncates() {
        let records = vec![
            hybrid(3, 0.6, &[], &[]),
            hybrid(1, 0.9, &[], &[]),
            hybrid(2, 0.9, &[], &[]),
            hybrid(4, 0.3, &[], &[]),
        ];

        let ranked = rank(records, 0.5, 2);
        assert_eq!(ranked.len(), 2);
        // Ties broken by ascending item id.
        assert_eq!(ranked[0].item_id, 1);
        assert_eq!(ranked[1].item_id, 2);
        for record in &ranked {
            assert!(record.score >= 0.5);
        }
    }
}
