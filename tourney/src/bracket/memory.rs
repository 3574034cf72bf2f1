//! In-memory bracket store for tests and database-less runs.

use super::errors::{BracketError, BracketResult};
use super::models::{Bracket, BracketId, EventId, Match, MatchId, TournamentProgress};
use super::store::{BracketMutation, BracketStore, Mutated, changed_matches};
use crate::db::StoreError;
use crate::format::BracketFormat;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    next_bracket_id: BracketId,
    next_match_id: MatchId,
    brackets: BTreeMap<BracketId, Bracket>,
    matches: HashMap<BracketId, Vec<Match>>,
    progress: HashMap<BracketId, TournamentProgress>,
}

/// [`BracketStore`] backed by process memory.
///
/// A single mutex guards all tables, so every mutation is atomic.
#[derive(Debug, Default)]
pub struct MemoryBracketStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryBracketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> BracketResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::ZERO).into());
        }
        Ok(())
    }
}

#[async_trait]
impl BracketStore for MemoryBracketStore {
    async fn insert_bracket(
        &self,
        event_id: EventId,
        sport_type: &str,
        bracket_type: BracketFormat,
        matches: Vec<Match>,
        progress: TournamentProgress,
    ) -> BracketResult<(Bracket, Vec<Match>, TournamentProgress)> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        if state
            .brackets
            .values()
            .any(|b| b.event_id == event_id && b.sport_type == sport_type)
        {
            return Err(BracketError::DuplicateBracket {
                event_id,
                sport_type: sport_type.to_string(),
            });
        }

        state.next_bracket_id += 1;
        let now = Utc::now();
        let bracket = Bracket {
            id: state.next_bracket_id,
            event_id,
            sport_type: sport_type.to_string(),
            bracket_type,
            created_at: now,
            updated_at: now,
        };

        let mut saved = matches;
        saved.sort_by_key(|m| (m.round_number, m.match_number));
        for m in &mut saved {
            state.next_match_id += 1;
            m.id = state.next_match_id;
            m.bracket_id = bracket.id;
            m.created_at = now;
            m.updated_at = now;
        }

        let progress = TournamentProgress {
            bracket_id: bracket.id,
            ..progress
        };

        state.brackets.insert(bracket.id, bracket.clone());
        state.matches.insert(bracket.id, saved.clone());
        state.progress.insert(bracket.id, progress.clone());
        Ok((bracket, saved, progress))
    }

    async fn find_bracket(&self, bracket_id: BracketId) -> BracketResult<Option<Bracket>> {
        self.check_online()?;
        Ok(self.state.lock().await.brackets.get(&bracket_id).cloned())
    }

    async fn find_bracket_for_match(&self, match_id: MatchId) -> BracketResult<Option<Bracket>> {
        self.check_online()?;
        let state = self.state.lock().await;
        let owner = state
            .matches
            .iter()
            .find(|(_, matches)| matches.iter().any(|m| m.id == match_id))
            .map(|(bracket_id, _)| *bracket_id);
        Ok(owner.and_then(|id| state.brackets.get(&id).cloned()))
    }

    async fn list_brackets(&self, event_id: EventId) -> BracketResult<Vec<Bracket>> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .await
            .brackets
            .values()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn load_matches(&self, bracket_id: BracketId) -> BracketResult<Vec<Match>> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .await
            .matches
            .get(&bracket_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_progress(
        &self,
        bracket_id: BracketId,
    ) -> BracketResult<Option<TournamentProgress>> {
        self.check_online()?;
        Ok(self.state.lock().await.progress.get(&bracket_id).cloned())
    }

    async fn mutate_bracket(
        &self,
        bracket_id: BracketId,
        mutation: BracketMutation,
    ) -> BracketResult<Mutated> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        let before = state
            .matches
            .get(&bracket_id)
            .cloned()
            .ok_or(BracketError::BracketNotFound(bracket_id))?;
        let mut matches = before.clone();
        let progress = mutation(&mut matches)?;
        let changed = changed_matches(&before, &matches)?;

        if !changed.is_empty() {
            if let Some(bracket) = state.brackets.get_mut(&bracket_id) {
                bracket.updated_at = Utc::now();
            }
        }
        state.matches.insert(bracket_id, matches.clone());
        state.progress.insert(bracket_id, progress.clone());

        Ok(Mutated {
            matches,
            changed,
            progress,
        })
    }

    async fn ping(&self) -> BracketResult<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> TournamentProgress {
        TournamentProgress {
            bracket_id: 0,
            current_round: 1,
            is_completed: false,
            champion_team_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = MemoryBracketStore::new();
        let (bracket, matches, progress) = store
            .insert_bracket(
                7,
                "chess",
                BracketFormat::RoundRobin,
                vec![Match::unsaved(1, 1)],
                progress(),
            )
            .await
            .unwrap();

        assert_eq!(bracket.id, 1);
        assert_eq!(matches[0].id, 1);
        assert_eq!(matches[0].bracket_id, 1);
        assert_eq!(progress.bracket_id, 1);
        assert_eq!(
            store.find_bracket_for_match(1).await.unwrap().unwrap().id,
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_sport_rejected() {
        let store = MemoryBracketStore::new();
        let format = BracketFormat::SingleElimination;
        store
            .insert_bracket(7, "chess", format, vec![], progress())
            .await
            .unwrap();
        let err = store
            .insert_bracket(7, "chess", format, vec![], progress())
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::DuplicateBracket { .. }));

        store
            .insert_bracket(8, "chess", format, vec![], progress())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = MemoryBracketStore::new();
        let (bracket, before, _) = store
            .insert_bracket(
                1,
                "ml",
                BracketFormat::SingleElimination,
                vec![Match::unsaved(1, 1)],
                progress(),
            )
            .await
            .unwrap();

        let result = store
            .mutate_bracket(
                bracket.id,
                Box::new(|matches| {
                    matches[0].venue = Some("Lab".to_string());
                    Err(BracketError::InvalidState("rejected".to_string()))
                }),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.load_matches(bracket.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_offline_store_is_transient() {
        let store = MemoryBracketStore::new();
        store.set_offline(true);
        let err = store.list_brackets(1).await.unwrap_err();
        assert!(err.is_transient());

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
