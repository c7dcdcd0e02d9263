//! Snake draft engine.
//!
//! Each league drafts in snake order: pick `p` of `n` teams falls in round
//! `(p - 1) / n + 1`, odd rounds run front to back and even rounds back to front.
//! A pick is committed under the league lock and applied to [`DraftState`]
//! exactly once. When a team's clock runs out its [`DraftActor`] auto-picks the
//! best available asset through [`PickExecutor`], retrying on uniqueness
//! conflicts and feeding the league's circuit breaker.
//!
//! ## Example
//!
//! ```no_run
//! use cfl_draft::db::InMemoryDraftRepository;
//! use cfl_draft::draft::{AssetType, DraftConfig, DraftManager, PickSelection};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cfl_draft::DraftError> {
//!     let repo = Arc::new(InMemoryDraftRepository::new());
//!     repo.add_team(1, 100).await;
//!     repo.add_team(1, 200).await;
//!     repo.add_asset(7, AssetType::Brand, "Green Leaf", 40).await;
//!
//!     let manager = DraftManager::new(repo, DraftConfig::default());
//!     let state = manager.start_draft(1, Some(vec![100, 200])).await?;
//!
//!     let outcome = manager
//!         .make_pick(1, PickSelection { team_id: 100, asset_id: 7 })
//!         .await?;
//!     assert_eq!(outcome.state.current_pick, state.current_pick + 1);
//!
//!     // let the clock pick for team 200
//!     let auto = manager.auto_pick_now(1).await?;
//!     println!("auto-picked asset {}", auto.pick.asset_id);
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod autopick;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod models;
pub mod order;
pub mod policy;
pub mod state;

pub use actor::{DraftActor, DraftHandle};
pub use autopick::{AutoPickTrigger, PickExecutor, PickOutcome};
pub use config::{DraftConfig, DraftSpeed};
pub use errors::{DraftError, DraftResult};
pub use manager::DraftManager;
pub use messages::{DraftEvent, DraftMessage, DraftSnapshot};
pub use models::{
    Asset, AssetId, AssetType, Candidate, DraftPick, DraftStatus, LeagueId, PickSelection,
    Position, RosterCounts, RosterLimits, StatTier, TeamId,
};
pub use order::{DraftOrderRandomizer, snake_slot, team_for_pick, total_picks};
pub use policy::{CandidateSource, PickPolicy, Selection, positions_by_need};
pub use state::DraftState;
