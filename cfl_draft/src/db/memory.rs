//! In-memory `DraftRepository` for tests and local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

use super::repository::DraftRepository;
use crate::draft::{
    Asset, AssetId, AssetType, Candidate, CandidateSource, DraftError, DraftPick, DraftResult,
    DraftState, DraftStatus, LeagueId, StatTier, TeamId,
};

#[derive(Default)]
struct Inner {
    teams: HashMap<LeagueId, Vec<TeamId>>,
    assets: BTreeMap<AssetId, Asset>,
    daily_points: HashMap<(AssetId, NaiveDate), i64>,
    drafts: HashMap<LeagueId, DraftState>,
    picks: HashMap<LeagueId, Vec<DraftPick>>,
    rostered: HashMap<LeagueId, HashSet<AssetId>>,
    /// One-shot uniqueness conflicts, as if another writer won the asset
    conflicts: HashSet<(LeagueId, AssetId)>,
    record_attempts: u32,
}

/// Mutex-guarded store with the same conflict semantics as the SQL schema
#[derive(Default)]
pub struct InMemoryDraftRepository {
    inner: Mutex<Inner>,
}

impl InMemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_team(&self, league_id: LeagueId, team_id: TeamId) {
        self.inner
            .lock()
            .await
            .teams
            .entry(league_id)
            .or_default()
            .push(team_id);
    }

    pub async fn add_asset(&self, id: AssetId, asset_type: AssetType, name: &str, popularity: i64) {
        self.inner.lock().await.assets.insert(
            id,
            Asset {
                id,
                asset_type,
                name: name.to_string(),
                popularity,
            },
        );
    }

    pub async fn set_daily_points(&self, asset_id: AssetId, stat_date: NaiveDate, points: i64) {
        self.inner
            .lock()
            .await
            .daily_points
            .insert((asset_id, stat_date), points);
    }

    /// Make the next `record_pick` of this asset fail with `AlreadyDrafted`
    pub async fn inject_conflict(&self, league_id: LeagueId, asset_id: AssetId) {
        self.inner
            .lock()
            .await
            .conflicts
            .insert((league_id, asset_id));
    }

    /// Number of `record_pick` calls, successful or not
    pub async fn record_attempts(&self) -> u32 {
        self.inner.lock().await.record_attempts
    }
}

#[async_trait]
impl CandidateSource for InMemoryDraftRepository {
    async fn best_available(
        &self,
        league_id: LeagueId,
        asset_types: &[AssetType],
        tier: StatTier,
        stat_date: Option<NaiveDate>,
        excluded: &HashSet<AssetId>,
    ) -> DraftResult<Option<Candidate>> {
        let inner = self.inner.lock().await;
        let rostered = inner.rostered.get(&league_id);

        let best = inner
            .assets
            .values()
            .filter(|asset| asset_types.contains(&asset.asset_type))
            .filter(|asset| !excluded.contains(&asset.id))
            .filter(|asset| rostered.is_none_or(|taken| !taken.contains(&asset.id)))
            .filter_map(|asset| {
                let score = match stat_date {
                    Some(date) => *inner.daily_points.get(&(asset.id, date))?,
                    None => asset.popularity,
                };
                Some((score, asset))
            })
            // highest score, then lowest id
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.id.cmp(&a.1.id)));

        Ok(best.map(|(score, asset)| Candidate {
            asset_id: asset.id,
            asset_type: asset.asset_type,
            name: asset.name.clone(),
            score,
            tier,
        }))
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn league_teams(&self, league_id: LeagueId) -> DraftResult<Vec<TeamId>> {
        Ok(self
            .inner
            .lock()
            .await
            .teams
            .get(&league_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_draft(&self, state: &DraftState) -> DraftResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.drafts.contains_key(&state.league_id) {
            return Err(DraftError::DraftExists(state.league_id));
        }
        inner.drafts.insert(state.league_id, state.clone());
        Ok(())
    }

    async fn load_draft(&self, league_id: LeagueId) -> DraftResult<DraftState> {
        self.inner
            .lock()
            .await
            .drafts
            .get(&league_id)
            .cloned()
            .ok_or(DraftError::DraftNotFound(league_id))
    }

    async fn update_draft_status(&self, state: &DraftState) -> DraftResult<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .drafts
            .get_mut(&state.league_id)
            .ok_or(DraftError::DraftNotFound(state.league_id))?;
        stored.status = state.status;
        stored.pick_deadline = state.pick_deadline;
        stored.pick_timer_secs = state.pick_timer_secs;
        stored.started_at = state.started_at;
        Ok(())
    }

    async fn record_pick(&self, pick: &DraftPick, next: &DraftState) -> DraftResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record_attempts += 1;

        if inner.conflicts.remove(&(pick.league_id, pick.asset_id))
            || inner
                .rostered
                .get(&pick.league_id)
                .is_some_and(|taken| taken.contains(&pick.asset_id))
        {
            return Err(DraftError::AlreadyDrafted {
                asset_id: pick.asset_id,
            });
        }

        let current = inner
            .drafts
            .get(&pick.league_id)
            .ok_or(DraftError::DraftNotFound(pick.league_id))?
            .current_pick;
        if current != pick.pick_number {
            return Err(DraftError::PickSuperseded(pick.pick_number));
        }

        inner
            .rostered
            .entry(pick.league_id)
            .or_default()
            .insert(pick.asset_id);
        inner
            .picks
            .entry(pick.league_id)
            .or_default()
            .push(pick.clone());
        inner.drafts.insert(pick.league_id, next.clone());
        Ok(())
    }

    async fn list_picks(&self, league_id: LeagueId) -> DraftResult<Vec<DraftPick>> {
        Ok(self
            .inner
            .lock()
            .await
            .picks
            .get(&league_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_asset(&self, asset_id: AssetId) -> DraftResult<Option<Asset>> {
        Ok(self.inner.lock().await.assets.get(&asset_id).cloned())
    }

    async fn active_drafts(&self) -> DraftResult<Vec<LeagueId>> {
        let inner = self.inner.lock().await;
        let mut leagues: Vec<LeagueId> = inner
            .drafts
            .values()
            .filter(|d| matches!(d.status, DraftStatus::InProgress | DraftStatus::Paused))
            .map(|d| d.league_id)
            .collect();
        leagues.sort_unstable();
        Ok(leagues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Position;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 20).unwrap()
    }

    #[tokio::test]
    async fn test_best_available_ranks_by_tier_metric() {
        let repo = InMemoryDraftRepository::new();
        repo.add_asset(1, AssetType::Brand, "Alpha", 50).await;
        repo.add_asset(2, AssetType::Brand, "Beta", 10).await;
        repo.set_daily_points(2, day(), 30).await;

        let by_points = repo
            .best_available(
                1,
                &[AssetType::Brand],
                StatTier::CurrentDay,
                Some(day()),
                &HashSet::new(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_points.asset_id, 2);
        assert_eq!(by_points.score, 30);

        let by_popularity = repo
            .best_available(1, &[AssetType::Brand], StatTier::Popularity, None, &HashSet::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_popularity.asset_id, 1);
    }

    #[tokio::test]
    async fn test_score_ties_go_to_lower_id() {
        let repo = InMemoryDraftRepository::new();
        repo.add_asset(8, AssetType::Product, "Late", 5).await;
        repo.add_asset(3, AssetType::Product, "Early", 5).await;

        let best = repo
            .best_available(1, &[AssetType::Product], StatTier::Popularity, None, &HashSet::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.asset_id, 3);
    }

    #[tokio::test]
    async fn test_create_draft_twice_fails() {
        let repo = InMemoryDraftRepository::new();
        let state = DraftState::new(1, vec![1, 2], Default::default()).unwrap();
        repo.create_draft(&state).await.unwrap();
        assert!(matches!(
            repo.create_draft(&state).await,
            Err(DraftError::DraftExists(1))
        ));
    }

    #[tokio::test]
    async fn test_injected_conflict_fires_once() {
        let repo = InMemoryDraftRepository::new();
        let mut state = DraftState::new(1, vec![1, 2], Default::default()).unwrap();
        state
            .start(chrono::Utc::now(), std::time::Duration::from_secs(60))
            .unwrap();
        repo.create_draft(&state).await.unwrap();

        let pick = DraftPick {
            league_id: 1,
            pick_number: 1,
            round: 1,
            team_id: 1,
            asset_type: AssetType::Brand,
            asset_id: 5,
            position: Position::Brand,
            auto_pick: false,
            picked_at: chrono::Utc::now(),
        };
        let mut next = state.clone();
        next.apply_pick(&pick).unwrap();

        repo.inject_conflict(1, 5).await;
        assert!(matches!(
            repo.record_pick(&pick, &next).await,
            Err(DraftError::AlreadyDrafted { asset_id: 5 })
        ));
        assert_eq!(repo.load_draft(1).await.unwrap().current_pick, 1);

        repo.record_pick(&pick, &next).await.unwrap();
        assert_eq!(repo.record_attempts().await, 2);
        assert_eq!(repo.load_draft(1).await.unwrap().current_pick, 2);
        assert_eq!(repo.list_picks(1).await.unwrap(), vec![pick]);
    }
}
