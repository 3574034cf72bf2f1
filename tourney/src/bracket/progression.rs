//! Match progression engine.
//!
//! [`advance`] walks a bracket's layout in dependency order and fills every
//! slot whose feeder matches are decided: winners move forward, double
//! elimination losers drop down, and slots that can only ever receive one
//! team are completed as walkovers. [`compute_progress`] then derives the
//! bracket's progress summary from the match set alone. Both are pure and
//! idempotent, so running them again on an unchanged match set is a no-op.

use super::errors::{BracketError, BracketResult};
use super::layout::{BracketLayout, Section, Source};
use super::models::{BracketId, Match, MatchResult, MatchStatus, TeamId, TournamentProgress};
use crate::format::BracketFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a source currently delivers to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    /// Feeder match not decided yet
    Pending,
    Team(TeamId),
    /// Nobody will ever arrive
    Empty,
}

/// Propagate decided matches through the bracket.
///
/// Fills team slots from seeds, winners and losers, and completes walkovers.
/// Fails with `InvalidState` if a slot already holds a different team than
/// its source delivers, which means the stored match set is inconsistent.
pub fn advance(layout: &BracketLayout, matches: &mut [Match]) -> BracketResult<()> {
    let rows = layout.align(matches)?;

    for (slot_idx, slot) in layout.slots().iter().enumerate() {
        let row = rows[slot_idx];
        let mut occupants = [Occupant::Pending; 2];

        for (side, source) in slot.sources.iter().enumerate() {
            occupants[side] = match *source {
                Source::Seed(_) => match matches[row].team(side) {
                    Some(team) => Occupant::Team(team),
                    None => Occupant::Empty,
                },
                Source::Bye => Occupant::Empty,
                Source::WinnerOf(feeder) => winner_of(&matches[rows[feeder]]),
                Source::LoserOf(feeder) => {
                    loser_of(&matches[rows[feeder]], slot.section == Section::GrandFinalReset)
                }
            };
        }

        let m = &mut matches[row];
        for (side, occupant) in occupants.iter().enumerate() {
            match (*occupant, m.team(side)) {
                (Occupant::Team(team), None) => {
                    m.set_team(side, Some(team));
                    m.updated_at = Utc::now();
                }
                (Occupant::Team(team), Some(current)) if team != current => {
                    return Err(BracketError::InvalidState(format!(
                        "Round {} match {} holds team {} where team {} should advance",
                        m.round_number, m.match_number, current, team
                    )));
                }
                (Occupant::Empty, Some(current)) => {
                    return Err(BracketError::InvalidState(format!(
                        "Round {} match {} holds team {} in a slot nobody can reach",
                        m.round_number, m.match_number, current
                    )));
                }
                _ => {}
            }
        }

        if !m.is_completed() {
            let walkover = match occupants {
                [Occupant::Team(team), Occupant::Empty] | [Occupant::Empty, Occupant::Team(team)] => {
                    Some(Some(team))
                }
                [Occupant::Empty, Occupant::Empty] => Some(None),
                _ => None,
            };
            if let Some(winner) = walkover {
                m.complete_walkover(winner);
                m.updated_at = Utc::now();
            }
        }
    }

    Ok(())
}

fn winner_of(feeder: &Match) -> Occupant {
    if !feeder.is_completed() {
        return Occupant::Pending;
    }
    match feeder.winner_team_id {
        Some(team) => Occupant::Team(team),
        None => Occupant::Empty,
    }
}

/// A grand-final loser only reaches the reset when the losers-bracket
/// finalist (team2) won the grand final.
fn loser_of(feeder: &Match, into_reset: bool) -> Occupant {
    if !feeder.is_completed() {
        return Occupant::Pending;
    }
    if into_reset && feeder.winner_team_id.is_some() && feeder.winner_team_id == feeder.team1_id {
        return Occupant::Empty;
    }
    match feeder.loser() {
        Some(team) => Occupant::Team(team),
        None => Occupant::Empty,
    }
}

/// Derive a bracket's progress from its match set
pub fn compute_progress(
    format: BracketFormat,
    bracket_id: BracketId,
    matches: &[Match],
) -> TournamentProgress {
    let final_round = matches.iter().map(|m| m.round_number).max().unwrap_or(0);
    let current_round = matches
        .iter()
        .filter(|m| !m.is_completed())
        .map(|m| m.round_number)
        .min()
        .unwrap_or(final_round);

    let champion_team_id = if format.is_elimination() {
        let mut finals = matches.iter().filter(|m| m.round_number == final_round);
        match (finals.next(), finals.next()) {
            (Some(last), None) if last.is_completed() => last.winner_team_id,
            _ => None,
        }
    } else if !matches.is_empty() && matches.iter().all(Match::is_completed) {
        round_robin_standings(matches).first().map(|s| s.team_id)
    } else {
        None
    };

    TournamentProgress {
        bracket_id,
        current_round,
        is_completed: champion_team_id.is_some(),
        champion_team_id,
    }
}

/// Round-robin table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team_id: TeamId,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_for: i64,
    pub points_against: i64,
}

impl Standing {
    pub fn point_differential(&self) -> i64 {
        self.points_for - self.points_against
    }
}

/// Round-robin table, best first.
///
/// Ordered by wins, then point differential (missing scores count as 0),
/// then seed order. Seed order is the order in which teams first appear in
/// the match list, which the round-robin layout makes equal to seeding.
pub fn round_robin_standings(matches: &[Match]) -> Vec<Standing> {
    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by_key(|m| (m.round_number, m.match_number));

    let mut table: Vec<Standing> = Vec::new();
    let mut position: HashMap<TeamId, usize> = HashMap::new();

    for m in ordered {
        for team in [m.team1_id, m.team2_id].into_iter().flatten() {
            position.entry(team).or_insert_with(|| {
                table.push(Standing {
                    team_id: team,
                    played: 0,
                    wins: 0,
                    losses: 0,
                    points_for: 0,
                    points_against: 0,
                });
                table.len() - 1
            });
        }

        if !m.is_contested() {
            continue;
        }
        for team in [m.team1_id, m.team2_id].into_iter().flatten() {
            let Some((scored, conceded)) = m.score_for(team) else {
                continue;
            };
            let row = &mut table[position[&team]];
            row.played += 1;
            row.points_for += i64::from(scored);
            row.points_against += i64::from(conceded);
            if m.winner_team_id == Some(team) {
                row.wins += 1;
            } else {
                row.losses += 1;
            }
        }
    }

    // Stable sort keeps seed order for full ties
    table.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| b.point_differential().cmp(&a.point_differential()))
    });
    table
}

/// Record a result on a match.
///
/// Returns `Ok(false)` when the identical result is already recorded, so a
/// retried submission changes nothing.
pub fn record_result(m: &mut Match, result: &MatchResult) -> BracketResult<bool> {
    if m.is_completed() {
        if m.is_walkover() {
            return Err(BracketError::InvalidState(format!(
                "Match {} was resolved as a walkover",
                m.id
            )));
        }
        let same = m.team1_score == Some(result.team1_score)
            && m.team2_score == Some(result.team2_score)
            && m.winner_team_id == Some(result.winner_team_id);
        if same {
            return Ok(false);
        }
        return Err(BracketError::InvalidState(format!(
            "Match {} is already completed with a different result",
            m.id
        )));
    }

    if !m.has_both_teams() {
        return Err(BracketError::InvalidState(format!(
            "Match {} does not have both teams yet",
            m.id
        )));
    }
    if result.team1_score < 0 || result.team2_score < 0 {
        return Err(BracketError::InvalidInput(
            "Scores must not be negative".to_string(),
        ));
    }
    if !m.involves(result.winner_team_id) {
        return Err(BracketError::InvalidInput(format!(
            "Team {} does not play in match {}",
            result.winner_team_id, m.id
        )));
    }
    let (winner_score, loser_score) = if m.team1_id == Some(result.winner_team_id) {
        (result.team1_score, result.team2_score)
    } else {
        (result.team2_score, result.team1_score)
    };
    if winner_score < loser_score {
        return Err(BracketError::InvalidInput(format!(
            "Winner {} scored {} against {}",
            result.winner_team_id, winner_score, loser_score
        )));
    }

    m.team1_score = Some(result.team1_score);
    m.team2_score = Some(result.team2_score);
    m.winner_team_id = Some(result.winner_team_id);
    m.status = MatchStatus::Completed;
    m.updated_at = Utc::now();
    Ok(true)
}

/// Mark a match as being played. Starting an ongoing match is a no-op.
pub fn begin_match(m: &mut Match) -> BracketResult<bool> {
    match m.status {
        MatchStatus::Ongoing => Ok(false),
        MatchStatus::Completed => Err(BracketError::InvalidState(format!(
            "Match {} is already completed",
            m.id
        ))),
        MatchStatus::Scheduled if !m.has_both_teams() => Err(BracketError::InvalidState(
            format!("Match {} does not have both teams yet", m.id),
        )),
        MatchStatus::Scheduled => {
            m.status = MatchStatus::Ongoing;
            m.updated_at = Utc::now();
            Ok(true)
        }
    }
}

/// Set date and venue of a match that has not been decided
pub fn reschedule(
    m: &mut Match,
    match_date: Option<DateTime<Utc>>,
    venue: Option<String>,
) -> BracketResult<bool> {
    if m.is_completed() {
        return Err(BracketError::InvalidState(format!(
            "Match {} is already completed",
            m.id
        )));
    }
    if venue.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(BracketError::InvalidInput(
            "Venue must not be blank".to_string(),
        ));
    }
    if m.match_date == match_date && m.venue == venue {
        return Ok(false);
    }
    m.match_date = match_date;
    m.venue = venue;
    m.updated_at = Utc::now();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TeamId = 101;
    const B: TeamId = 102;
    const C: TeamId = 103;
    const D: TeamId = 104;
    const E: TeamId = 105;

    fn seeded(format: BracketFormat, teams: &[TeamId]) -> (BracketLayout, Vec<Match>) {
        let layout = BracketLayout::build(format, teams.len()).unwrap();
        let mut matches = layout.seed(teams).unwrap();
        for (i, m) in matches.iter_mut().enumerate() {
            m.id = i as i64 + 1;
            m.bracket_id = 1;
        }
        advance(&layout, &mut matches).unwrap();
        (layout, matches)
    }

    fn find(matches: &mut [Match], round: u32, number: u32) -> &mut Match {
        matches
            .iter_mut()
            .find(|m| m.round_number == round && m.match_number == number)
            .unwrap()
    }

    fn play(
        layout: &BracketLayout,
        matches: &mut [Match],
        round: u32,
        number: u32,
        winner: TeamId,
    ) {
        let m = find(matches, round, number);
        let (s1, s2) = if m.team1_id == Some(winner) { (3, 1) } else { (1, 3) };
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
    }

    #[test]
    fn test_four_team_single_elimination_scenario() {
        let format = BracketFormat::SingleElimination;
        let (layout, mut matches) = seeded(format, &[A, B, C, D]);

        play(&layout, &mut matches, 1, 1, A);
        play(&layout, &mut matches, 1, 2, C);

        let progress = compute_progress(format, 1, &matches);
        assert!(!progress.is_completed);
        assert_eq!(progress.champion_team_id, None);
        assert_eq!(progress.current_round, 2);

        let final_match = find(&mut matches, 2, 1).clone();
        assert_eq!(final_match.team1_id, Some(A));
        assert_eq!(final_match.team2_id, Some(C));

        play(&layout, &mut matches, 2, 1, A);
        let progress = compute_progress(format, 1, &matches);
        assert!(progress.is_completed);
        assert_eq!(progress.champion_team_id, Some(A));
        assert_eq!(progress.current_round, 2);
    }

    #[test]
    fn test_byes_are_walked_over_at_creation() {
        let (_, mut matches) = seeded(BracketFormat::SingleElimination, &[A, B, C, D, E]);

        let bye = find(&mut matches, 1, 3).clone();
        assert!(bye.is_walkover());
        assert_eq!(bye.winner_team_id, Some(E));
        assert_eq!(bye.team1_score, None);

        // Round 2 match 2 receives E and waits for nobody else
        let next = find(&mut matches, 2, 2).clone();
        assert_eq!((next.team1_id, next.team2_id), (Some(E), None));
        assert!(next.is_walkover());

        let semi = find(&mut matches, 3, 1).clone();
        assert_eq!(semi.team2_id, Some(E));
        assert!(!semi.is_completed());
    }

    #[test]
    fn test_advance_is_idempotent() {
        let format = BracketFormat::DoubleElimination;
        let (layout, mut matches) = seeded(format, &[A, B, C, D, E]);
        play(&layout, &mut matches, 1, 1, B);

        let before = matches.clone();
        let progress = compute_progress(format, 1, &matches);
        advance(&layout, &mut matches).unwrap();
        assert_eq!(matches, before);
        assert_eq!(compute_progress(format, 1, &matches), progress);
    }

    #[test]
    fn test_advance_rejects_conflicting_slot() {
        let (layout, mut matches) = seeded(BracketFormat::SingleElimination, &[A, B, C, D]);
        find(&mut matches, 2, 1).team1_id = Some(D);
        play_result_only(&mut matches, 1, 1, A);
        assert!(matches!(
            advance(&layout, &mut matches),
            Err(BracketError::InvalidState(_))
        ));
    }

    fn play_result_only(matches: &mut [Match], round: u32, number: u32, winner: TeamId) {
        record_result(
            find(matches, round, number),
            &MatchResult {
                team1_score: 2,
                team2_score: 0,
                winner_team_id: winner,
            },
        )
        .unwrap();
    }

    fn run_double_elimination(grand_final_winner_from_losers: bool) -> (Vec<Match>, TournamentProgress) {
        let format = BracketFormat::DoubleElimination;
        let (layout, mut matches) = seeded(format, &[A, B, C, D]);
        // Winners bracket: A beats B, C beats D, A beats C
        play(&layout, &mut matches, 1, 1, A);
        play(&layout, &mut matches, 1, 2, C);
        play(&layout, &mut matches, 2, 1, A);
        // Losers bracket: B beats D, then C beats B
        play(&layout, &mut matches, 2, 2, B);
        play(&layout, &mut matches, 3, 1, C);

        let grand_final = find(&mut matches, 4, 1).clone();
        assert_eq!((grand_final.team1_id, grand_final.team2_id), (Some(A), Some(C)));

        let winner = if grand_final_winner_from_losers { C } else { A };
        play(&layout, &mut matches, 4, 1, winner);
        let progress = compute_progress(format, 1, &matches);
        (matches, progress)
    }

    #[test]
    fn test_double_elimination_winners_champion_skips_reset() {
        let (mut matches, progress) = run_double_elimination(false);
        let reset = find(&mut matches, 5, 1).clone();
        assert!(reset.is_walkover());
        assert_eq!(reset.winner_team_id, Some(A));
        assert!(progress.is_completed);
        assert_eq!(progress.champion_team_id, Some(A));
    }

    #[test]
    fn test_double_elimination_reset_is_played() {
        let format = BracketFormat::DoubleElimination;
        let (mut matches, progress) = run_double_elimination(true);
        assert!(!progress.is_completed);
        assert_eq!(progress.current_round, 5);

        let reset = find(&mut matches, 5, 1).clone();
        assert_eq!((reset.team1_id, reset.team2_id), (Some(C), Some(A)));

        let layout = BracketLayout::for_matches(format, &matches).unwrap();
        play(&layout, &mut matches, 5, 1, A);
        let progress = compute_progress(format, 1, &matches);
        assert_eq!(progress.champion_team_id, Some(A));
    }

    #[test]
    fn test_round_robin_champion_needs_every_match() {
        let format = BracketFormat::RoundRobin;
        let (layout, mut matches) = seeded(format, &[A, B, C]);
        // (A,B) (A,C) (B,C)
        play(&layout, &mut matches, 1, 1, B);
        play(&layout, &mut matches, 1, 2, C);
        assert_eq!(compute_progress(format, 1, &matches).champion_team_id, None);

        play(&layout, &mut matches, 1, 3, B);
        let progress = compute_progress(format, 1, &matches);
        assert!(progress.is_completed);
        assert_eq!(progress.champion_team_id, Some(B));
        assert_eq!(progress.current_round, 1);
    }

    #[test]
    fn test_round_robin_tie_break() {
        let format = BracketFormat::RoundRobin;
        let (_, mut matches) = seeded(format, &[A, B, C]);
        let results = [
            // A 5-0 B, C 2-1 A, B 4-3 C: everyone has one win
            (1, 5, 0, A),
            (2, 1, 2, C),
            (3, 4, 3, B),
        ];
        for (number, s1, s2, winner) in results {
            record_result(
                find(&mut matches, 1, number),
                &MatchResult {
                    team1_score: s1,
                    team2_score: s2,
                    winner_team_id: winner,
                },
            )
            .unwrap();
        }

        let table = round_robin_standings(&matches);
        let order: Vec<TeamId> = table.iter().map(|s| s.team_id).collect();
        // Differentials: A +4, B -4, C 0
        assert_eq!(order, vec![A, C, B]);
        assert_eq!(table[0].played, 2);
        assert_eq!(table[0].wins, 1);
    }

    #[test]
    fn test_round_robin_full_tie_keeps_seed_order() {
        let (_, mut matches) = seeded(BracketFormat::RoundRobin, &[C, A, B]);
        for (number, winner) in [(1, C), (2, B), (3, A)] {
            let m = find(&mut matches, 1, number);
            m.winner_team_id = Some(winner);
            m.status = MatchStatus::Completed;
        }
        let order: Vec<TeamId> = round_robin_standings(&matches)
            .iter()
            .map(|s| s.team_id)
            .collect();
        assert_eq!(order, vec![C, A, B]);
    }

    #[test]
    fn test_record_result_validation() {
        let (_, mut matches) = seeded(BracketFormat::SingleElimination, &[A, B, C, D]);
        let result = MatchResult {
            team1_score: 2,
            team2_score: 1,
            winner_team_id: A,
        };

        let outsider = MatchResult {
            winner_team_id: E,
            ..result
        };
        assert!(matches!(
            record_result(find(&mut matches, 1, 1), &outsider),
            Err(BracketError::InvalidInput(_))
        ));

        let negative = MatchResult {
            team1_score: -1,
            ..result
        };
        assert!(matches!(
            record_result(find(&mut matches, 1, 1), &negative),
            Err(BracketError::InvalidInput(_))
        ));

        assert!(matches!(
            record_result(find(&mut matches, 2, 1), &result),
            Err(BracketError::InvalidState(_))
        ));

        let outscored = MatchResult {
            winner_team_id: B,
            ..result
        };
        assert!(matches!(
            record_result(find(&mut matches, 1, 1), &outscored),
            Err(BracketError::InvalidInput(_))
        ));
        // Level scores are decided by the named winner
        let level = MatchResult {
            team1_score: 1,
            team2_score: 1,
            winner_team_id: D,
        };
        assert!(record_result(find(&mut matches, 1, 2), &level).unwrap());

        assert!(record_result(find(&mut matches, 1, 1), &result).unwrap());
        assert!(!record_result(find(&mut matches, 1, 1), &result).unwrap());

        let different = MatchResult {
            winner_team_id: B,
            ..result
        };
        assert!(matches!(
            record_result(find(&mut matches, 1, 1), &different),
            Err(BracketError::InvalidState(_))
        ));
    }

    #[test]
    fn test_walkover_rejects_result() {
        let (_, mut matches) = seeded(BracketFormat::SingleElimination, &[A, B, C]);
        let result = MatchResult {
            team1_score: 1,
            team2_score: 0,
            winner_team_id: C,
        };
        assert!(matches!(
            record_result(find(&mut matches, 1, 2), &result),
            Err(BracketError::InvalidState(_))
        ));
    }

    #[test]
    fn test_begin_and_reschedule() {
        let (_, mut matches) = seeded(BracketFormat::SingleElimination, &[A, B, C, D]);

        assert!(begin_match(find(&mut matches, 2, 1)).is_err());
        assert!(begin_match(find(&mut matches, 1, 1)).unwrap());
        assert!(!begin_match(find(&mut matches, 1, 1)).unwrap());
        assert_eq!(find(&mut matches, 1, 1).status, MatchStatus::Ongoing);

        let when = Utc::now();
        let m = find(&mut matches, 1, 2);
        assert!(reschedule(m, Some(when), Some("Court 2".to_string())).unwrap());
        assert!(!reschedule(m, Some(when), Some("Court 2".to_string())).unwrap());
        assert!(reschedule(m, Some(when), Some("  ".to_string())).is_err());
    }
}
