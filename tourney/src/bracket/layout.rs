//! Bracket layouts.
//!
//! A layout is the slot graph of a bracket: every match slot names where its
//! two occupants come from (a seed, the winner or loser of another slot, or
//! nothing). Layouts are a pure function of `(format, team_count)`, so the
//! graph is never persisted; the progression engine rebuilds it from the
//! stored match set.
//!
//! Elimination rounds are produced by [`pair_round`](Builder::pair_round):
//! entrants are paired in order and an odd entrant out gets a bye slot. For
//! single elimination this gives `ceil(n / 2^r)` slots in round `r`, and the
//! winner of match `m` feeds match `ceil(m / 2)` of the next round.
//!
//! Double elimination reuses the same pairing for the losers bracket. Losers
//! of the first winners round are paired among themselves; for every later
//! winners round the losers-bracket survivors are first halved until they no
//! longer outnumber the teams dropping down, then each survivor meets a
//! dropped team. The losers champion meets the winners champion in the grand
//! final, followed by a reset slot that is only contested when the losers
//! champion wins the grand final.
//!
//! Round numbers are dependency depths: a slot is one round after the latest
//! slot it depends on.

use super::errors::{BracketError, BracketResult};
use super::models::{Match, TeamId};
use crate::format::BracketFormat;
use std::collections::{BTreeSet, HashMap};

/// Where a slot occupant comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Seeded team, by 0-based seed position
    Seed(usize),
    /// Winner of the slot at this layout index
    WinnerOf(usize),
    /// Loser of the slot at this layout index
    LoserOf(usize),
    /// Never occupied
    Bye,
}

/// Part of the bracket a slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Winners,
    Losers,
    GrandFinal,
    GrandFinalReset,
    RoundRobin,
}

/// One match slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub round_number: u32,
    pub match_number: u32,
    pub section: Section,
    pub sources: [Source; 2],
    /// Whether each source can ever deliver a team
    pub live: [bool; 2],
}

impl Slot {
    /// Both occupants will exist, so the slot is played rather than walked over
    pub fn is_contested(&self) -> bool {
        self.live[0] && self.live[1]
    }
}

/// Slot graph of a bracket
#[derive(Debug, Clone)]
pub struct BracketLayout {
    format: BracketFormat,
    team_count: usize,
    slots: Vec<Slot>,
    index: HashMap<(u32, u32), usize>,
}

impl BracketLayout {
    /// Build the layout for `team_count` seeded teams
    pub fn build(format: BracketFormat, team_count: usize) -> BracketResult<Self> {
        if team_count < 2 {
            return Err(BracketError::InvalidInput(format!(
                "A bracket needs at least 2 teams, got {team_count}"
            )));
        }

        let mut builder = Builder::default();
        match format {
            BracketFormat::SingleElimination => {
                builder.single_elimination(team_count);
            }
            BracketFormat::DoubleElimination => builder.double_elimination(team_count),
            BracketFormat::RoundRobin => builder.round_robin(team_count),
        }

        Ok(builder.finish(format, team_count))
    }

    /// Rebuild the layout of a persisted bracket
    ///
    /// Round 1 only ever holds seeded teams, so the team count is the number
    /// of distinct teams found there.
    pub fn for_matches(format: BracketFormat, matches: &[Match]) -> BracketResult<Self> {
        let seeded: BTreeSet<TeamId> = matches
            .iter()
            .filter(|m| m.round_number == 1)
            .flat_map(|m| [m.team1_id, m.team2_id])
            .flatten()
            .collect();

        let layout = Self::build(format, seeded.len())?;
        if layout.slots.len() != matches.len() {
            return Err(BracketError::InvalidState(format!(
                "{} layout for {} teams has {} slots but the bracket has {} matches",
                format,
                seeded.len(),
                layout.slots.len(),
                matches.len()
            )));
        }
        Ok(layout)
    }

    pub fn format(&self) -> BracketFormat {
        self.format
    }

    pub fn team_count(&self) -> usize {
        self.team_count
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of rounds
    pub fn round_count(&self) -> u32 {
        self.slots.iter().map(|s| s.round_number).max().unwrap_or(0)
    }

    /// Slots that will actually be played
    pub fn contested_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_contested()).count()
    }

    /// Layout index of the slot at `(round_number, match_number)`
    pub fn position(&self, round_number: u32, match_number: u32) -> Option<usize> {
        self.index.get(&(round_number, match_number)).copied()
    }

    /// Map every slot to the index of its row in `matches`
    pub fn align(&self, matches: &[Match]) -> BracketResult<Vec<usize>> {
        if matches.len() != self.slots.len() {
            return Err(BracketError::InvalidState(format!(
                "Expected {} matches, found {}",
                self.slots.len(),
                matches.len()
            )));
        }

        let rows: HashMap<(u32, u32), usize> = matches
            .iter()
            .enumerate()
            .map(|(row, m)| ((m.round_number, m.match_number), row))
            .collect();

        self.slots
            .iter()
            .map(|slot| {
                rows.get(&(slot.round_number, slot.match_number))
                    .copied()
                    .ok_or_else(|| {
                        BracketError::InvalidState(format!(
                            "Missing match for round {} match {}",
                            slot.round_number, slot.match_number
                        ))
                    })
            })
            .collect()
    }

    /// Create the unsaved match rows with seeds placed
    pub fn seed(&self, team_ids: &[TeamId]) -> BracketResult<Vec<Match>> {
        if team_ids.len() != self.team_count {
            return Err(BracketError::InvalidInput(format!(
                "Layout is for {} teams, got {}",
                self.team_count,
                team_ids.len()
            )));
        }

        Ok(self
            .slots
            .iter()
            .map(|slot| {
                let mut m = Match::unsaved(slot.round_number, slot.match_number);
                for (side, source) in slot.sources.iter().enumerate() {
                    if let Source::Seed(seed) = source {
                        m.set_team(side, Some(team_ids[*seed]));
                    }
                }
                m
            })
            .collect())
    }
}

#[derive(Debug)]
struct PendingSlot {
    section: Section,
    sources: [Source; 2],
    depth: u32,
    live: [bool; 2],
}

#[derive(Debug, Default)]
struct Builder {
    slots: Vec<PendingSlot>,
}

impl Builder {
    fn push(&mut self, section: Section, sources: [Source; 2]) -> usize {
        let depth = 1 + sources.iter().map(|s| self.depth_of(*s)).max().unwrap_or(0);
        let live = [self.is_live(sources[0]), self.is_live(sources[1])];
        self.slots.push(PendingSlot {
            section,
            sources,
            depth,
            live,
        });
        self.slots.len() - 1
    }

    fn depth_of(&self, source: Source) -> u32 {
        match source {
            Source::Seed(_) | Source::Bye => 0,
            Source::WinnerOf(i) | Source::LoserOf(i) => self.slots[i].depth,
        }
    }

    fn is_live(&self, source: Source) -> bool {
        match source {
            Source::Seed(_) => true,
            Source::Bye => false,
            Source::WinnerOf(i) => self.slots[i].live[0] || self.slots[i].live[1],
            Source::LoserOf(i) => self.is_contested(i),
        }
    }

    fn is_contested(&self, i: usize) -> bool {
        self.slots[i].live[0] && self.slots[i].live[1]
    }

    /// Pair entrants in order; returns the winners of the new slots
    fn pair_round(&mut self, section: Section, entrants: &[Source]) -> Vec<Source> {
        entrants
            .chunks(2)
            .map(|pair| {
                let second = pair.get(1).copied().unwrap_or(Source::Bye);
                Source::WinnerOf(self.push(section, [pair[0], second]))
            })
            .collect()
    }

    /// Returns the slot indices of each winners round
    fn single_elimination(&mut self, team_count: usize) -> Vec<Vec<usize>> {
        let mut entrants: Vec<Source> = (0..team_count).map(Source::Seed).collect();
        let mut rounds = Vec::new();
        while entrants.len() > 1 {
            let first = self.slots.len();
            entrants = self.pair_round(Section::Winners, &entrants);
            rounds.push((first..self.slots.len()).collect());
        }
        rounds
    }

    fn double_elimination(&mut self, team_count: usize) {
        let winners_rounds = self.single_elimination(team_count);
        let Some(&winners_final) = winners_rounds.last().and_then(|round| round.first()) else {
            return;
        };

        let mut survivors: Vec<Source> = Vec::new();
        for (round_idx, round) in winners_rounds.iter().enumerate() {
            let drops: Vec<Source> = round
                .iter()
                .copied()
                .filter(|&slot| self.is_contested(slot))
                .map(Source::LoserOf)
                .collect();

            if round_idx == 0 {
                survivors = drops;
                continue;
            }

            while survivors.len() > drops.len().max(1) {
                survivors = self.pair_round(Section::Losers, &survivors);
            }
            survivors = self.pair_round(Section::Losers, &interleave(&survivors, &drops));
        }

        while survivors.len() > 1 {
            survivors = self.pair_round(Section::Losers, &survivors);
        }

        let losers_champion = survivors.first().copied().unwrap_or(Source::Bye);
        let grand_final = self.push(
            Section::GrandFinal,
            [Source::WinnerOf(winners_final), losers_champion],
        );
        self.push(
            Section::GrandFinalReset,
            [Source::WinnerOf(grand_final), Source::LoserOf(grand_final)],
        );
    }

    /// Pairs in seed order: (1,2), (1,3) … (n-1,n)
    fn round_robin(&mut self, team_count: usize) {
        for first in 0..team_count {
            for second in first + 1..team_count {
                self.push(
                    Section::RoundRobin,
                    [Source::Seed(first), Source::Seed(second)],
                );
            }
        }
    }

    fn finish(self, format: BracketFormat, team_count: usize) -> BracketLayout {
        let mut next_number: HashMap<u32, u32> = HashMap::new();
        let mut index = HashMap::new();

        let slots = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(i, pending)| {
                let number = next_number.entry(pending.depth).or_insert(0);
                *number += 1;
                index.insert((pending.depth, *number), i);
                Slot {
                    round_number: pending.depth,
                    match_number: *number,
                    section: pending.section,
                    sources: pending.sources,
                    live: pending.live,
                }
            })
            .collect();

        BracketLayout {
            format,
            team_count,
            slots,
            index,
        }
    }
}

fn interleave(first: &[Source], second: &[Source]) -> Vec<Source> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    for i in 0..first.len().max(second.len()) {
        merged.extend(first.get(i).copied());
        merged.extend(second.get(i).copied());
    }
    merged
}
