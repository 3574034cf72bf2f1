//! Integration tests for the bracket lifecycle.
//!
//! Runs the bracket manager against the in-memory store: bracket creation,
//! byes, result submission, progression and champion detection.

use std::sync::Arc;
use tourney::bracket::{
    BracketError, BracketManager, BracketSummary, Match, MatchResult, MatchStatus,
    MemoryBracketStore, NewBracket, TeamId,
};
use tourney::format::BracketFormat;

const A: TeamId = 11;
const B: TeamId = 22;
const C: TeamId = 33;
const D: TeamId = 44;

fn setup() -> BracketManager {
    BracketManager::new(Arc::new(MemoryBracketStore::new()))
}

async fn create(
    manager: &BracketManager,
    sport: &str,
    format: BracketFormat,
    teams: &[TeamId],
) -> BracketSummary {
    manager
        .create_bracket(NewBracket {
            event_id: 1,
            sport_type: sport.to_string(),
            bracket_type: format,
            team_ids: teams.to_vec(),
        })
        .await
        .expect("Failed to create bracket")
}

fn find(matches: &[Match], round: u32, number: u32) -> Match {
    matches
        .iter()
        .find(|m| m.round_number == round && m.match_number == number)
        .cloned()
        .expect("Match slot missing")
}

fn win(winner: TeamId, m: &Match) -> MatchResult {
    if m.team1_id == Some(winner) {
        MatchResult {
            team1_score: 2,
            team2_score: 0,
            winner_team_id: winner,
        }
    } else {
        MatchResult {
            team1_score: 0,
            team2_score: 2,
            winner_team_id: winner,
        }
    }
}

async fn play(manager: &BracketManager, bracket_id: i64, round: u32, number: u32, winner: TeamId) {
    let matches = manager.get_matches(bracket_id).await.unwrap();
    let m = find(&matches, round, number);
    manager
        .submit_result(m.id, win(winner, &m))
        .await
        .expect("Result rejected");
}

#[tokio::test]
async fn test_four_team_single_elimination() {
    let manager = setup();
    let summary = create(&manager, "basketball", BracketFormat::SingleElimination, &[A, B, C, D]).await;
    let id = summary.bracket.id;
    assert_eq!(summary.total_matches, 3);

    play(&manager, id, 1, 1, A).await;
    play(&manager, id, 1, 2, C).await;

    let progress = manager.get_progress(id).await.unwrap();
    assert!(!progress.is_completed);
    assert_eq!(progress.champion_team_id, None);
    assert_eq!(progress.current_round, 2);

    play(&manager, id, 2, 1, A).await;

    let progress = manager.get_progress(id).await.unwrap();
    assert!(progress.is_completed);
    assert_eq!(progress.champion_team_id, Some(A));

    let summary = manager.bracket_summary(id).await.unwrap();
    assert_eq!(summary.completion_rate, 100);
}

#[tokio::test]
async fn test_byes_advance_at_creation() {
    let manager = setup();
    let summary = create(
        &manager,
        "volleyball",
        BracketFormat::SingleElimination,
        &[1, 2, 3, 4, 5, 6],
    )
    .await;

    // 6 teams: 3 first-round matches, the third winner gets a bye in round 2
    let round_two = &summary.rounds[1].matches;
    assert_eq!(round_two.len(), 2);
    assert!(round_two[1].is_walkover() || round_two[1].team2_id.is_none());
    assert_eq!(summary.progress.current_round, 1);
}

#[tokio::test]
async fn test_resubmitting_same_result_is_a_no_op() {
    let manager = setup();
    let summary = create(&manager, "chess", BracketFormat::SingleElimination, &[A, B, C, D]).await;
    let first = summary.rounds[0].matches[0].clone();
    let result = win(A, &first);

    let update = manager.submit_result(first.id, result).await.unwrap();
    assert!(!update.changed.is_empty());

    let retry = manager.submit_result(first.id, result).await.unwrap();
    assert!(retry.changed.is_empty());
    assert_eq!(retry.progress, update.progress);

    let conflicting = manager.submit_result(first.id, win(B, &first)).await;
    assert!(matches!(conflicting, Err(BracketError::InvalidState(_))));
}

#[tokio::test]
async fn test_result_for_unready_match_is_rejected() {
    let manager = setup();
    let summary = create(&manager, "ml", BracketFormat::SingleElimination, &[A, B, C, D]).await;
    let final_match = summary.rounds[1].matches[0].clone();

    let err = manager
        .submit_result(
            final_match.id,
            MatchResult {
                team1_score: 1,
                team2_score: 0,
                winner_team_id: A,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::InvalidState(_)));
}

#[tokio::test]
async fn test_duplicate_sport_in_event_is_rejected() {
    let manager = setup();
    create(&manager, "codm", BracketFormat::RoundRobin, &[A, B, C]).await;

    let err = manager
        .create_bracket(NewBracket {
            event_id: 1,
            sport_type: "codm".to_string(),
            bracket_type: BracketFormat::SingleElimination,
            team_ids: vec![A, B],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::DuplicateBracket { .. }));
}

#[tokio::test]
async fn test_double_elimination_full_run() {
    let manager = setup();
    let summary = create(&manager, "badminton", BracketFormat::DoubleElimination, &[A, B, C, D]).await;
    let id = summary.bracket.id;
    assert_eq!(summary.total_matches, 7);

    play(&manager, id, 1, 1, A).await;
    play(&manager, id, 1, 2, C).await;
    play(&manager, id, 2, 1, A).await;
    play(&manager, id, 2, 2, B).await;
    play(&manager, id, 3, 1, C).await;
    // Losers-bracket champion C takes the grand final, forcing the reset
    play(&manager, id, 4, 1, C).await;

    let progress = manager.get_progress(id).await.unwrap();
    assert!(!progress.is_completed);
    assert_eq!(progress.current_round, 5);

    play(&manager, id, 5, 1, C).await;
    let progress = manager.get_progress(id).await.unwrap();
    assert_eq!(progress.champion_team_id, Some(C));
}

#[tokio::test]
async fn test_round_robin_lifecycle() {
    let manager = setup();
    let summary = create(&manager, "chess", BracketFormat::RoundRobin, &[A, B, C, D]).await;
    let id = summary.bracket.id;
    assert_eq!(summary.total_matches, 6);
    assert_eq!(summary.rounds.len(), 1);

    // D wins everything
    let matches = manager.get_matches(id).await.unwrap();
    for m in &matches {
        let winner = if m.involves(D) {
            D
        } else {
            m.team1_id.unwrap()
        };
        manager.submit_result(m.id, win(winner, m)).await.unwrap();
    }

    let progress = manager.get_progress(id).await.unwrap();
    assert!(progress.is_completed);
    assert_eq!(progress.champion_team_id, Some(D));
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let manager = setup();
    let summary = create(&manager, "chess", BracketFormat::DoubleElimination, &[1, 2, 3, 4, 5]).await;
    let id = summary.bracket.id;
    play(&manager, id, 1, 1, 2).await;

    let first = manager.recompute_progress(id).await.unwrap();
    let second = manager.recompute_progress(id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.get_progress(id).await.unwrap(), first);
}

#[tokio::test]
async fn test_concurrent_results_are_serialized() {
    let manager = setup();
    let teams: Vec<TeamId> = (1..=8).collect();
    let summary = create(&manager, "basketball", BracketFormat::SingleElimination, &teams).await;
    let id = summary.bracket.id;

    let mut handles = Vec::new();
    for m in summary.rounds[0].matches.clone() {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let winner = m.team1_id.unwrap();
            manager.submit_result(m.id, win(winner, &m)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let matches = manager.get_matches(id).await.unwrap();
    let round_two: Vec<&Match> = matches.iter().filter(|m| m.round_number == 2).collect();
    assert_eq!(round_two.len(), 2);
    assert!(round_two.iter().all(|m| m.has_both_teams()));

    let progress = manager.get_progress(id).await.unwrap();
    assert_eq!(progress.current_round, 2);
}

#[tokio::test]
async fn test_schedule_and_start() {
    let manager = setup();
    let summary = create(&manager, "volleyball", BracketFormat::SingleElimination, &[A, B]).await;
    let m = summary.rounds[0].matches[0].clone();

    let when = chrono::Utc::now();
    let scheduled = manager
        .schedule_match(m.id, Some(when), Some("Court 1".to_string()))
        .await
        .unwrap();
    assert_eq!(scheduled.venue.as_deref(), Some("Court 1"));

    let started = manager.start_match(m.id).await.unwrap();
    assert_eq!(started.status, MatchStatus::Ongoing);

    manager.submit_result(m.id, win(B, &m)).await.unwrap();
    let err = manager
        .schedule_match(m.id, Some(when), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::InvalidState(_)));
}
