//! # CFL Draft
//!
//! Snake-draft engine for the Cannabis Fantasy League. Teams draft real-world
//! market entities (manufacturers, cannabis strains, products, pharmacies and
//! brands) into fixed-size rosters.
//!
//! ## Architecture
//!
//! - **State**: [`draft::DraftState`] is mutated exactly once per pick through
//!   [`draft::DraftState::apply_pick`], with turn order given by the snake formula
//!   in [`draft::order`].
//! - **Policy**: [`draft::PickPolicy`] chooses the best available asset for the team
//!   on the clock, walking positions by remaining need and falling back across
//!   stat tiers (previous day, current day, popularity).
//! - **Guard**: [`guard::DraftGuard`] serializes picks per league and trips a
//!   circuit breaker after repeated auto-pick failures.
//! - **Actors**: each running draft is owned by a [`draft::DraftActor`] that runs
//!   the pick timer and fans events out to subscribers. [`draft::DraftManager`]
//!   spawns and routes to them.
//! - **Persistence**: [`db::DraftRepository`] with a PostgreSQL implementation and
//!   an in-memory one for tests.
//!
//! ## Example
//!
//! ```no_run
//! use cfl_draft::db::InMemoryDraftRepository;
//! use cfl_draft::draft::{DraftConfig, DraftManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cfl_draft::DraftError> {
//!     let repo = Arc::new(InMemoryDraftRepository::new());
//!     repo.add_team(1, 10).await;
//!     repo.add_team(1, 11).await;
//!
//!     let manager = DraftManager::new(repo, DraftConfig::default());
//!     let state = manager.start_draft(1, None).await?;
//!     println!("Team {:?} is on the clock", state.team_on_clock());
//!     Ok(())
//! }
//! ```

/// Persistence: connection pool, repository trait and implementations.
pub mod db;

/// Draft domain: models, ordering, state, pick policy, execution, actors.
pub mod draft;

/// Per-league pick locks and auto-pick circuit breakers.
pub mod guard;

pub use draft::{
    AssetType, DraftConfig, DraftError, DraftManager, DraftPick, DraftResult, DraftState,
    DraftStatus, Position, RosterLimits,
};
