//! Integration tests for format recommendations and the learning loop.

use proptest::prelude::*;
use std::sync::Arc;
use tourney::bracket::TeamId;
use tourney::format::BracketFormat;
use tourney::recommend::{FormatRecommender, MemoryRecommendationStore, Verdict, engine};

fn teams(n: usize) -> Vec<TeamId> {
    (100..100 + n as TeamId).collect()
}

fn setup() -> FormatRecommender {
    FormatRecommender::new(Arc::new(MemoryRecommendationStore::new()))
}

#[tokio::test]
async fn test_eight_team_basketball_recommendation() {
    let recommender = setup();
    let result = recommender.recommend("basketball", &teams(8)).await.unwrap();

    let rec = &result.recommendation;
    assert_eq!(rec.format, BracketFormat::SingleElimination);
    assert_eq!(rec.confidence, 85);
    assert_eq!(rec.matches, 7);
    assert_eq!(rec.rounds, 3);
    assert!(!rec.learning_based);

    let round_robin = result
        .alternatives
        .iter()
        .find(|alt| alt.format == BracketFormat::RoundRobin)
        .unwrap();
    assert_eq!(round_robin.verdict, Verdict::NotRecommended);
    assert_eq!(round_robin.matches, 28);

    assert_eq!(result.analysis.team_count, 8);
    assert_eq!(result.analysis.match_counts.double_elimination, 15);
}

#[tokio::test]
async fn test_chess_history_overrides_heuristic() {
    let recommender = setup();

    for n in [9, 10, 9, 11, 10] {
        let (_, record) = recommender
            .recommend_and_store(7, "chess", &teams(n))
            .await
            .unwrap();
        recommender
            .record_admin_choice(record.id, BracketFormat::RoundRobin)
            .await
            .unwrap();
    }

    let rec = recommender
        .recommend("chess", &teams(10))
        .await
        .unwrap()
        .recommendation;
    assert_eq!(rec.format, BracketFormat::RoundRobin);
    assert!(rec.confidence <= 95);
    assert!(rec.confidence > 85);
    assert!(rec.learning_based);
    assert!(rec.reason.contains("[Learning: Based on 5 similar past tournaments]"));
}

#[tokio::test]
async fn test_history_window_limits_learning() {
    let store = Arc::new(MemoryRecommendationStore::new());
    let recommender = FormatRecommender::new(store).with_history_window(2);

    // Three old double-elimination choices, then two single-elimination ones
    let choices = [
        BracketFormat::DoubleElimination,
        BracketFormat::DoubleElimination,
        BracketFormat::DoubleElimination,
        BracketFormat::SingleElimination,
        BracketFormat::SingleElimination,
    ];
    for choice in choices {
        let (_, record) = recommender
            .recommend_and_store(1, "volleyball", &teams(12))
            .await
            .unwrap();
        recommender.record_admin_choice(record.id, choice).await.unwrap();
    }

    let rec = recommender
        .recommend("volleyball", &teams(12))
        .await
        .unwrap()
        .recommendation;
    assert_eq!(rec.format, BracketFormat::SingleElimination);
    assert!(rec.learning_based);
}

#[tokio::test]
async fn test_recorded_matches_follow_choice() {
    let recommender = setup();
    let (_, record) = recommender
        .recommend_and_store(3, "ml", &teams(6))
        .await
        .unwrap();
    assert_eq!(record.matches_created, 0);
    assert_eq!(record.factors_considered.selected_teams, 6);

    let decided = recommender
        .record_admin_choice(record.id, BracketFormat::RoundRobin)
        .await
        .unwrap();
    assert_eq!(decided.matches_created, 15);
    assert!(decided.updated_at >= record.updated_at);
}

proptest! {
    #[test]
    fn test_two_teams_always_single_elimination(
        history in prop::collection::vec((0usize..6, 0u8..3), 0..20),
    ) {
        let history: Vec<_> = history
            .into_iter()
            .map(|(n, f)| tourney::recommend::HistorySample {
                num_teams: n,
                recommended_format: BracketFormat::ALL[f as usize],
                admin_choice: Some(BracketFormat::ALL[f as usize]),
            })
            .collect();

        let rec = engine::recommend(2, "chess", &history).recommendation;
        prop_assert_eq!(rec.format, BracketFormat::SingleElimination);
        prop_assert_eq!(rec.confidence, 95);

        for n in [3, 4] {
            let rec = engine::recommend(n, "chess", &history).recommendation;
            prop_assert_eq!(rec.format, BracketFormat::RoundRobin);
            prop_assert_eq!(rec.confidence, 85);
        }
    }

    #[test]
    fn test_confidence_never_exceeds_100(n in 2usize..200, learned in any::<bool>()) {
        let history = if learned {
            vec![tourney::recommend::HistorySample {
                num_teams: n,
                recommended_format: BracketFormat::DoubleElimination,
                admin_choice: None,
            }]
        } else {
            Vec::new()
        };
        let rec = engine::recommend(n, "basketball", &history).recommendation;
        prop_assert!(rec.confidence <= 100);
        prop_assert_eq!(rec.matches, rec.format.match_count(n));
    }
}
