//! Medal and win statistics derived from match state.
//!
//! Everything here is a pure function of the match set, so a leaderboard can
//! be rebuilt at any time and never disagrees with the brackets.

use super::models::{TeamStanding, TeamTally};
use crate::bracket::{Match, TeamId, compute_progress, round_robin_standings};
use crate::format::BracketFormat;
use std::collections::HashMap;

/// Per-team tallies kept in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct Tallies {
    order: Vec<TeamId>,
    by_team: HashMap<TeamId, TeamTally>,
}

impl Tallies {
    fn entry(&mut self, team_id: TeamId) -> &mut TeamTally {
        if !self.by_team.contains_key(&team_id) {
            self.order.push(team_id);
        }
        self.by_team.entry(team_id).or_default()
    }

    pub fn get(&self, team_id: TeamId) -> Option<&TeamTally> {
        self.by_team.get(&team_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add another set of tallies, e.g. another bracket of the same event
    pub fn absorb(&mut self, other: &Tallies) {
        for team_id in &other.order {
            if let Some(tally) = other.by_team.get(team_id) {
                self.entry(*team_id).add(tally);
            }
        }
    }

    /// Rank teams by points, then gold, silver, bronze and wins.
    ///
    /// Teams equal on every key keep their order of first appearance.
    pub fn ranked(&self) -> Vec<TeamStanding> {
        let mut rows: Vec<(TeamId, TeamTally)> = self
            .order
            .iter()
            .filter_map(|team_id| self.by_team.get(team_id).map(|t| (*team_id, *t)))
            .collect();

        rows.sort_by(|(_, a), (_, b)| {
            b.total_points()
                .cmp(&a.total_points())
                .then_with(|| b.gold.cmp(&a.gold))
                .then_with(|| b.silver.cmp(&a.silver))
                .then_with(|| b.bronze.cmp(&a.bronze))
                .then_with(|| b.wins.cmp(&a.wins))
        });

        rows.into_iter()
            .enumerate()
            .map(|(i, (team_id, tally))| TeamStanding {
                rank: i as u32 + 1,
                team_id,
                total_matches: tally.total_matches,
                wins: tally.wins,
                gold: tally.gold,
                silver: tally.silver,
                bronze: tally.bronze,
                total_points: tally.total_points(),
                win_rate: tally.win_rate(),
            })
            .collect()
    }
}

/// Tally one bracket.
///
/// Every match a team occupies counts toward `total_matches`, and every
/// match it is recorded as winning counts toward `wins`. Each team earns at
/// most one medal per bracket.
pub fn tally_bracket(format: BracketFormat, matches: &[Match]) -> Tallies {
    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by_key(|m| (m.round_number, m.match_number));

    let mut tallies = Tallies::default();
    for m in &ordered {
        for team_id in [m.team1_id, m.team2_id].into_iter().flatten() {
            let tally = tallies.entry(team_id);
            tally.total_matches += 1;
            if m.winner_team_id == Some(team_id) {
                tally.wins += 1;
            }
        }
    }

    let progress = compute_progress(format, 0, matches);
    let gold = progress.champion_team_id;
    let (silver, bronze) = match format {
        BracketFormat::SingleElimination => single_elimination_podium(&ordered),
        BracketFormat::DoubleElimination => double_elimination_podium(&ordered),
        BracketFormat::RoundRobin if progress.is_completed => {
            let table = round_robin_standings(matches);
            (
                table.get(1).map(|s| s.team_id).into_iter().collect(),
                table.get(2).map(|s| s.team_id).into_iter().collect(),
            )
        }
        BracketFormat::RoundRobin => (Vec::new(), Vec::new()),
    };

    let mut medalled: Vec<TeamId> = Vec::new();
    if let Some(team_id) = gold {
        tallies.entry(team_id).gold += 1;
        medalled.push(team_id);
    }
    for team_id in silver {
        if !medalled.contains(&team_id) {
            tallies.entry(team_id).silver += 1;
            medalled.push(team_id);
        }
    }
    for team_id in bronze {
        if !medalled.contains(&team_id) {
            tallies.entry(team_id).bronze += 1;
            medalled.push(team_id);
        }
    }

    tallies
}

fn losers_in_round(ordered: &[&Match], round: u32) -> Vec<TeamId> {
    ordered
        .iter()
        .filter(|m| m.round_number == round)
        .filter_map(|m| m.loser())
        .collect()
}

/// Silver to the final's loser, bronze to the semi-final losers
fn single_elimination_podium(ordered: &[&Match]) -> (Vec<TeamId>, Vec<TeamId>) {
    let final_round = ordered.iter().map(|m| m.round_number).max().unwrap_or(0);
    let silver = losers_in_round(ordered, final_round);
    let bronze = match final_round.checked_sub(1) {
        Some(round) if round > 0 => losers_in_round(ordered, round),
        _ => Vec::new(),
    };
    (silver, bronze)
}

/// The last two rounds are the grand final and its reset, and the round
/// before them holds the losers-bracket final.
fn double_elimination_podium(ordered: &[&Match]) -> (Vec<TeamId>, Vec<TeamId>) {
    let reset_round = ordered.iter().map(|m| m.round_number).max().unwrap_or(0);
    let Some(reset) = ordered.iter().find(|m| m.round_number == reset_round) else {
        return (Vec::new(), Vec::new());
    };

    let silver = if !reset.is_completed() {
        Vec::new()
    } else if reset.is_contested() {
        reset.loser().into_iter().collect()
    } else {
        losers_in_round(ordered, reset_round.saturating_sub(1))
    };

    let bronze = match reset_round.checked_sub(2) {
        Some(round) if round > 0 => losers_in_round(ordered, round),
        _ => Vec::new(),
    };
    (silver, bronze)
}
