//! Property-based tests for bracket layouts and progression.
//!
//! Uses proptest to drive brackets of arbitrary size through arbitrary
//! results and checks the invariants every bracket must keep.

use proptest::prelude::*;
use tourney::bracket::{
    BracketLayout, Match, MatchResult, TeamId, advance, compute_progress, progression::record_result,
};
use tourney::format::{BracketFormat, ceil_log2};
use tourney::leaderboard::tally_bracket;

fn format_strategy() -> impl Strategy<Value = BracketFormat> {
    prop_oneof![
        Just(BracketFormat::SingleElimination),
        Just(BracketFormat::DoubleElimination),
        Just(BracketFormat::RoundRobin),
    ]
}

fn seeded(format: BracketFormat, n: usize) -> (BracketLayout, Vec<Match>) {
    let layout = BracketLayout::build(format, n).unwrap();
    let teams: Vec<TeamId> = (1..=n as TeamId).collect();
    let mut matches = layout.seed(&teams).unwrap();
    for (i, m) in matches.iter_mut().enumerate() {
        m.id = i as i64 + 1;
    }
    advance(&layout, &mut matches).unwrap();
    (layout, matches)
}

/// Play every ready match until none is left, picking winners from `coins`.
/// Returns the number of matches played.
fn play_out(layout: &BracketLayout, matches: &mut [Match], coins: &[bool]) -> usize {
    let mut played = 0;
    loop {
        let Some(idx) = matches
            .iter()
            .position(|m| !m.is_completed() && m.has_both_teams())
        else {
            return played;
        };
        let m = &mut matches[idx];
        let team1_wins = coins.get(played % coins.len().max(1)).copied().unwrap_or(true);
        let (winner, s1, s2) = if team1_wins {
            (m.team1_id.unwrap(), 3, 1)
        } else {
            (m.team2_id.unwrap(), 1, 3)
        };
        record_result(
            m,
            &MatchResult {
                team1_score: s1,
                team2_score: s2,
                winner_team_id: winner,
            },
        )
        .unwrap();
        advance(layout, matches).unwrap();
        played += 1;
    }
}

proptest! {
    #[test]
    fn test_contested_slots_match_formula(format in format_strategy(), n in 2usize..80) {
        let layout = BracketLayout::build(format, n).unwrap();
        prop_assert_eq!(layout.contested_count(), format.match_count(n));
    }

    #[test]
    fn test_single_elimination_round_count(n in 2usize..200) {
        let layout = BracketLayout::build(BracketFormat::SingleElimination, n).unwrap();
        prop_assert_eq!(layout.round_count(), ceil_log2(n));
        prop_assert_eq!(BracketFormat::DoubleElimination.round_count(n), 2 * ceil_log2(n));
    }

    #[test]
    fn test_every_bracket_finishes_with_one_champion(
        format in format_strategy(),
        n in 2usize..24,
        coins in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let (layout, mut matches) = seeded(format, n);
        let played = play_out(&layout, &mut matches, &coins);

        prop_assert!(matches.iter().all(Match::is_completed));
        let progress = compute_progress(format, 1, &matches);
        prop_assert!(progress.is_completed);
        prop_assert!(progress.champion_team_id.is_some());

        match format {
            BracketFormat::DoubleElimination => {
                // The reset is only played when the losers-bracket champion wins the grand final
                prop_assert!(played == 2 * n - 2 || played == 2 * n - 1);
            }
            _ => prop_assert_eq!(played, format.match_count(n)),
        }

        let champion = progress.champion_team_id.unwrap();
        if format.is_elimination() {
            let final_round = matches.iter().map(|m| m.round_number).max().unwrap();
            let finals: Vec<&Match> = matches.iter().filter(|m| m.round_number == final_round).collect();
            prop_assert_eq!(finals.len(), 1);
            prop_assert_eq!(finals[0].winner_team_id, Some(champion));
        }
    }

    #[test]
    fn test_progress_is_idempotent(
        format in format_strategy(),
        n in 2usize..16,
        coins in prop::collection::vec(any::<bool>(), 1..32),
        steps in 0usize..20,
    ) {
        let (layout, mut matches) = seeded(format, n);
        // Play a prefix of the bracket
        let mut ready: Vec<usize> = Vec::new();
        for _ in 0..steps {
            ready.clear();
            ready.extend(
                matches
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| !m.is_completed() && m.has_both_teams())
                    .map(|(i, _)| i),
            );
            let Some(&idx) = ready.first() else { break };
            let m = &mut matches[idx];
            let (winner, team1_score, team2_score) = if coins[idx % coins.len()] {
                (m.team1_id, 1, 0)
            } else {
                (m.team2_id, 0, 1)
            };
            record_result(m, &MatchResult { team1_score, team2_score, winner_team_id: winner.unwrap() }).unwrap();
            advance(&layout, &mut matches).unwrap();
        }

        let snapshot = matches.clone();
        let first = compute_progress(format, 1, &matches);
        advance(&layout, &mut matches).unwrap();
        let second = compute_progress(format, 1, &matches);
        prop_assert_eq!(&matches, &snapshot);
        prop_assert_eq!(first.clone(), second);
        prop_assert_eq!(first.is_completed, first.champion_team_id.is_some());
    }

    #[test]
    fn test_win_rate_bounded(
        format in format_strategy(),
        n in 2usize..16,
        coins in prop::collection::vec(any::<bool>(), 1..32),
    ) {
        let (layout, mut matches) = seeded(format, n);
        play_out(&layout, &mut matches, &coins);
        for standing in tally_bracket(format, &matches).ranked() {
            prop_assert!(standing.win_rate <= 100);
            if standing.total_matches == 0 {
                prop_assert_eq!(standing.win_rate, 0);
            }
        }
    }
}
