//! Format decision rules.
//!
//! The decision runs in priority order:
//! 1. two teams always get single elimination at 95
//! 2. three or four teams always get round robin at 85
//! 3. otherwise a team-count heuristic picks the format
//! 4. past decisions for the same sport at a similar team count override
//!    the heuristic and raise its confidence
//!
//! All functions here are pure; history is fetched by the caller.

use super::models::{
    AlternativeFormat, ComplexityScores, DailyCapacity, FormatRecommendation, HistorySample,
    MatchCounts, Recommendation, TournamentAnalysis, Verdict,
};
use crate::format::BracketFormat;

/// Team-count distance within which a past tournament counts as similar
pub const SIMILAR_TEAM_RANGE: usize = 2;

/// Confidence added when history overrides the heuristic
pub const LEARNING_BOOST: u8 = 10;

/// Highest confidence a learned recommendation can reach
pub const MAX_LEARNED_CONFIDENCE: u8 = 95;

/// Largest roster for which round robin is the heuristic choice.
///
/// One below the older "up to 8 teams" band: an 8-team roster
/// is recommended single elimination at 85, with round robin listed as not
/// recommended.
pub const ROUND_ROBIN_MAX_TEAMS: usize = 7;

/// Largest roster for which double elimination is still an alternative
pub const DOUBLE_ELIMINATION_MAX_TEAMS: usize = 16;

/// Minutes available for matches per scheduling day
pub const SCHEDULING_MINUTES_PER_DAY: u32 = 8 * 60;

/// Match duration used for sports without a known duration
pub const DEFAULT_MATCH_MINUTES: u32 = 45;

/// What past decisions say about a roster size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnedPreference {
    pub best_format: Option<BracketFormat>,
    pub similar_cases: usize,
}

impl LearnedPreference {
    pub const NONE: LearnedPreference = LearnedPreference {
        best_format: None,
        similar_cases: 0,
    };

    pub fn used_learning(&self) -> bool {
        self.best_format.is_some()
    }
}

/// Fixed answers for tiny rosters; history never overrides these
pub fn special_case(num_teams: usize) -> Option<(BracketFormat, u8)> {
    match num_teams {
        2 => Some((BracketFormat::SingleElimination, 95)),
        3 | 4 => Some((BracketFormat::RoundRobin, 85)),
        _ => None,
    }
}

/// Team-count heuristic for rosters without a special case
pub fn heuristic(num_teams: usize) -> (BracketFormat, u8) {
    if num_teams <= ROUND_ROBIN_MAX_TEAMS {
        (BracketFormat::RoundRobin, 80)
    } else if num_teams <= 16 {
        (BracketFormat::SingleElimination, 85)
    } else {
        (BracketFormat::SingleElimination, 90)
    }
}

/// Most frequent effective format among similar past tournaments.
///
/// `history` is newest first; on a frequency tie the format seen first wins.
pub fn analyze_history(history: &[HistorySample], num_teams: usize) -> LearnedPreference {
    let similar: Vec<&HistorySample> = history
        .iter()
        .filter(|sample| sample.num_teams.abs_diff(num_teams) <= SIMILAR_TEAM_RANGE)
        .collect();

    let mut counts: Vec<(BracketFormat, usize)> = Vec::new();
    for sample in &similar {
        let format = sample.effective_format();
        match counts.iter_mut().find(|(f, _)| *f == format) {
            Some((_, count)) => *count += 1,
            None => counts.push((format, 1)),
        }
    }

    let mut best: Option<(BracketFormat, usize)> = None;
    for (format, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((format, count));
        }
    }

    LearnedPreference {
        best_format: best.map(|(format, _)| format),
        similar_cases: similar.len(),
    }
}

/// Decide the format for a roster given the sport's history
pub fn recommend(num_teams: usize, sport_type: &str, history: &[HistorySample]) -> Recommendation {
    let (format, confidence, learned) = match special_case(num_teams) {
        Some((format, confidence)) => (format, confidence, LearnedPreference::NONE),
        None => {
            let (base_format, base_confidence) = heuristic(num_teams);
            let learned = analyze_history(history, num_teams);
            match learned.best_format {
                Some(format) => (
                    format,
                    base_confidence
                        .saturating_add(LEARNING_BOOST)
                        .min(MAX_LEARNED_CONFIDENCE),
                    learned,
                ),
                None => (base_format, base_confidence, learned),
            }
        }
    };

    build(format, num_teams, confidence, learned, sport_type)
}

/// Assemble the full answer for a decided format
pub fn build(
    format: BracketFormat,
    num_teams: usize,
    confidence: u8,
    learned: LearnedPreference,
    sport_type: &str,
) -> Recommendation {
    let mut reason = format.reason(num_teams);
    if learned.used_learning() {
        reason.push_str(&format!(
            " [Learning: Based on {} similar past tournaments]",
            learned.similar_cases
        ));
    }

    Recommendation {
        recommendation: FormatRecommendation {
            format,
            matches: format.match_count(num_teams),
            rounds: format.round_count(num_teams),
            confidence,
            description: format.description(num_teams),
            reason,
            learning_based: learned.used_learning(),
        },
        alternatives: alternatives(num_teams, format),
        analysis: analysis(num_teams, sport_type),
    }
}

/// Every format except `primary`, with a verdict
pub fn alternatives(num_teams: usize, primary: BracketFormat) -> Vec<AlternativeFormat> {
    BracketFormat::ALL
        .into_iter()
        .filter(|format| *format != primary)
        .map(|format| {
            let matches = format.match_count(num_teams);
            let (verdict, warning) = match format {
                BracketFormat::RoundRobin if num_teams > ROUND_ROBIN_MAX_TEAMS => (
                    Verdict::NotRecommended,
                    Some(format!(
                        "{matches} matches would be too many for {num_teams} teams"
                    )),
                ),
                BracketFormat::DoubleElimination if num_teams > DOUBLE_ELIMINATION_MAX_TEAMS => (
                    Verdict::NotRecommended,
                    Some(format!(
                        "{matches} matches - too complex for {num_teams} teams"
                    )),
                ),
                BracketFormat::RoundRobin if num_teams <= 4 => (Verdict::AlsoGood, None),
                _ => (Verdict::Alternative, None),
            };
            AlternativeFormat {
                format,
                verdict,
                matches,
                rounds: format.round_count(num_teams),
                warning,
                description: format.description(num_teams),
            }
        })
        .collect()
}

/// Nominal match length of a sport, case-insensitive
pub fn match_duration_minutes(sport_type: &str) -> u32 {
    match sport_type.trim().to_lowercase().as_str() {
        "basketball" => 40,
        "volleyball" => 45,
        "badminton" => 30,
        "chess" => 60,
        "ml" => 25,
        "codm" => 20,
        _ => DEFAULT_MATCH_MINUTES,
    }
}

pub fn daily_capacity(sport_type: &str) -> DailyCapacity {
    let duration = match_duration_minutes(sport_type);
    DailyCapacity {
        max_matches_per_day: SCHEDULING_MINUTES_PER_DAY / duration,
        match_duration_minutes: duration,
        sport_type: sport_type.to_string(),
    }
}

pub fn analysis(num_teams: usize, sport_type: &str) -> TournamentAnalysis {
    let match_counts = MatchCounts::for_teams(num_teams);
    let daily_capacity = daily_capacity(sport_type);
    let per_day = daily_capacity.max_matches_per_day.max(1) as usize;
    TournamentAnalysis {
        team_count: num_teams,
        match_counts,
        estimated_days: match_counts.round_robin.div_ceil(per_day) as u32,
        daily_capacity,
        complexity: ComplexityScores::for_teams(num_teams),
    }
}
