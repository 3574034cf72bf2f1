//! Bracket manager: bracket generation and the match lifecycle.

use super::errors::{BracketError, BracketResult};
use super::layout::BracketLayout;
use super::models::{
    Bracket, BracketId, BracketSummary, BracketUpdate, EventId, Match, MatchId, MatchResult,
    NewBracket, RoundMatches, TeamId, TournamentProgress,
};
use super::progression::{advance, begin_match, compute_progress, record_result, reschedule};
use super::store::BracketStore;
use crate::format::BracketFormat;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Longest accepted sport label
pub const MAX_SPORT_TYPE_LEN: usize = 100;

/// Bracket manager
///
/// Every change to a bracket's matches runs under that bracket's lock, so two
/// results submitted at once for the same bracket are applied one after the
/// other and the persisted progress reflects both.
#[derive(Clone)]
pub struct BracketManager {
    store: Arc<dyn BracketStore>,
    locks: Arc<RwLock<HashMap<BracketId, Arc<Mutex<()>>>>>,
}

impl BracketManager {
    /// Create a new bracket manager
    pub fn new(store: Arc<dyn BracketStore>) -> Self {
        Self {
            store,
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Generate a bracket and its matches for a roster in seed order.
    ///
    /// Byes are resolved immediately, so the returned matches already show
    /// every team that advanced without an opponent.
    pub async fn create_bracket(&self, request: NewBracket) -> BracketResult<BracketSummary> {
        let sport_type = request.sport_type.trim();
        if sport_type.is_empty() {
            return Err(BracketError::InvalidInput(
                "Sport type is required".to_string(),
            ));
        }
        if sport_type.len() > MAX_SPORT_TYPE_LEN {
            return Err(BracketError::InvalidInput(format!(
                "Sport type is longer than {MAX_SPORT_TYPE_LEN} characters"
            )));
        }
        let format = request.bracket_type;
        validate_roster(format, &request.team_ids)?;

        let layout = BracketLayout::build(format, request.team_ids.len())?;
        let mut matches = layout.seed(&request.team_ids)?;
        advance(&layout, &mut matches)?;
        let progress = compute_progress(format, 0, &matches);

        let (bracket, matches, progress) = self
            .store
            .insert_bracket(request.event_id, sport_type, format, matches, progress)
            .await?;

        info!(
            "Created {} bracket {} for event {} ({}, {} teams, {} matches)",
            format,
            bracket.id,
            bracket.event_id,
            bracket.sport_type,
            request.team_ids.len(),
            matches.len()
        );

        Ok(summarize(bracket, progress, matches))
    }

    /// Get a bracket
    pub async fn get_bracket(&self, bracket_id: BracketId) -> BracketResult<Bracket> {
        self.store
            .find_bracket(bracket_id)
            .await?
            .ok_or(BracketError::BracketNotFound(bracket_id))
    }

    /// Brackets of an event
    pub async fn list_brackets(&self, event_id: EventId) -> BracketResult<Vec<Bracket>> {
        self.store.list_brackets(event_id).await
    }

    /// Matches of a bracket ordered by round and match number
    pub async fn get_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>> {
        self.get_bracket(bracket_id).await?;
        self.store.load_matches(bracket_id).await
    }

    /// Progress of a bracket.
    ///
    /// Falls back to computing it from the matches when no row is stored.
    pub async fn get_progress(&self, bracket_id: BracketId) -> BracketResult<TournamentProgress> {
        let bracket = self.get_bracket(bracket_id).await?;
        if let Some(progress) = self.store.load_progress(bracket_id).await? {
            return Ok(progress);
        }
        warn!("Bracket {bracket_id} has no progress row, deriving it from matches");
        let matches = self.store.load_matches(bracket_id).await?;
        Ok(compute_progress(bracket.bracket_type, bracket_id, &matches))
    }

    /// Bracket with statistics and matches grouped by round
    pub async fn bracket_summary(&self, bracket_id: BracketId) -> BracketResult<BracketSummary> {
        let bracket = self.get_bracket(bracket_id).await?;
        let matches = self.store.load_matches(bracket_id).await?;
        let progress = match self.store.load_progress(bracket_id).await? {
            Some(progress) => progress,
            None => compute_progress(bracket.bracket_type, bracket_id, &matches),
        };
        Ok(summarize(bracket, progress, matches))
    }

    /// Set date and venue of a match
    pub async fn schedule_match(
        &self,
        match_id: MatchId,
        match_date: Option<DateTime<Utc>>,
        venue: Option<String>,
    ) -> BracketResult<Match> {
        let update = self
            .mutate_match(match_id, move |m| reschedule(m, match_date, venue))
            .await?;
        update.target.ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Mark a match as ongoing
    pub async fn start_match(&self, match_id: MatchId) -> BracketResult<Match> {
        let update = self.mutate_match(match_id, begin_match).await?;
        update.target.ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Record a match result and advance the bracket.
    ///
    /// Submitting the result already recorded for a completed match is a
    /// no-op, so callers may retry after a transient failure.
    pub async fn submit_result(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> BracketResult<BracketUpdate> {
        let update = self
            .mutate_match(match_id, move |m| record_result(m, &result))
            .await?;

        debug!(
            "Result for match {match_id}: {} rows changed, current round {}",
            update.changed.len(),
            update.progress.current_round
        );
        if let Some(champion) = update.progress.champion_team_id {
            info!(
                "Bracket {} completed, champion team {}",
                update.progress.bracket_id, champion
            );
        }
        Ok(update)
    }

    /// Re-run progression over the stored matches and rewrite the progress
    pub async fn recompute_progress(
        &self,
        bracket_id: BracketId,
    ) -> BracketResult<TournamentProgress> {
        let bracket = self.get_bracket(bracket_id).await?;
        let format = bracket.bracket_type;

        let lock = self.bracket_lock(bracket_id).await;
        let guard = lock.lock().await;

        let mutated = self
            .store
            .mutate_bracket(
                bracket_id,
                Box::new(move |matches| {
                    let layout = BracketLayout::for_matches(format, matches)?;
                    advance(&layout, matches)?;
                    Ok(compute_progress(format, bracket_id, matches))
                }),
            )
            .await;
        drop(guard);
        self.release_lock(bracket_id, lock).await;
        let mutated = mutated?;

        if !mutated.changed.is_empty() {
            warn!(
                "Recompute of bracket {} repaired {} matches",
                bracket_id,
                mutated.changed.len()
            );
        }
        Ok(mutated.progress)
    }

    /// Whether the store is reachable
    pub async fn health_check(&self) -> BracketResult<()> {
        self.store.ping().await
    }

    async fn bracket_lock(&self, bracket_id: BracketId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&bracket_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(bracket_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other task holds or waits on the lock.
    ///
    /// Clones are only handed out under the map lock, so a count of two (map
    /// plus `lock`) seen under the write lock means nobody else can reach it.
    async fn release_lock(&self, bracket_id: BracketId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.write().await;
        if locks
            .get(&bracket_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2)
        {
            locks.remove(&bracket_id);
        }
    }

    async fn mutate_match<F>(&self, match_id: MatchId, op: F) -> BracketResult<BracketUpdate>
    where
        F: FnOnce(&mut Match) -> BracketResult<bool> + Send + 'static,
    {
        let bracket = self
            .store
            .find_bracket_for_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;
        let bracket_id = bracket.id;
        let format = bracket.bracket_type;

        let lock = self.bracket_lock(bracket_id).await;
        let guard = lock.lock().await;

        let mutated = self
            .store
            .mutate_bracket(
                bracket_id,
                Box::new(move |matches| {
                    let target = matches
                        .iter_mut()
                        .find(|m| m.id == match_id)
                        .ok_or(BracketError::MatchNotFound(match_id))?;
                    op(target)?;

                    let layout = BracketLayout::for_matches(format, matches)?;
                    advance(&layout, matches)?;
                    Ok(compute_progress(format, bracket_id, matches))
                }),
            )
            .await;
        drop(guard);
        self.release_lock(bracket_id, lock).await;
        let mutated = mutated?;

        Ok(BracketUpdate {
            target: mutated.matches.iter().find(|m| m.id == match_id).cloned(),
            changed: mutated.changed,
            progress: mutated.progress,
        })
    }
}

fn validate_roster(format: BracketFormat, team_ids: &[TeamId]) -> BracketResult<()> {
    if team_ids.len() < 2 {
        return Err(BracketError::InvalidInput(format!(
            "A bracket needs at least 2 teams, got {}",
            team_ids.len()
        )));
    }
    if team_ids.len() > format.max_teams() {
        return Err(BracketError::InvalidInput(format!(
            "A {format} bracket takes at most {} teams, got {}",
            format.max_teams(),
            team_ids.len()
        )));
    }
    let mut seen = HashSet::with_capacity(team_ids.len());
    for team_id in team_ids {
        if !seen.insert(team_id) {
            return Err(BracketError::InvalidInput(format!(
                "Team {team_id} is listed more than once"
            )));
        }
    }
    Ok(())
}

fn summarize(bracket: Bracket, progress: TournamentProgress, matches: Vec<Match>) -> BracketSummary {
    let total_matches = matches.len();
    let completed_matches = matches.iter().filter(|m| m.is_completed()).count();
    let completion_rate = if total_matches == 0 {
        0
    } else {
        (completed_matches as f64 * 100.0 / total_matches as f64).round() as u32
    };
    let team_count = matches
        .iter()
        .flat_map(|m| [m.team1_id, m.team2_id])
        .flatten()
        .collect::<HashSet<_>>()
        .len();

    let mut by_round: BTreeMap<u32, Vec<Match>> = BTreeMap::new();
    for m in matches {
        by_round.entry(m.round_number).or_default().push(m);
    }
    let rounds = by_round
        .into_iter()
        .map(|(round_number, mut matches)| {
            matches.sort_by_key(|m| m.match_number);
            RoundMatches {
                round_number,
                matches,
            }
        })
        .collect();

    BracketSummary {
        bracket,
        progress,
        total_matches,
        completed_matches,
        completion_rate,
        team_count,
        rounds,
    }
}
