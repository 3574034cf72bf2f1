//! HTTP service over the `tourney` library.
//!
//! Exposes format recommendations, bracket management and leaderboards as
//! JSON endpoints, with environment configuration, structured logging,
//! request ids and Prometheus metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
