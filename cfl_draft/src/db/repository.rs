//! Draft persistence.
//!
//! [`DraftRepository`] abstracts storage so the executor and actors can run
//! against PostgreSQL in production and [`super::InMemoryDraftRepository`] in tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::{BTreeMap, HashSet};

use super::timeouts::{TimeoutError, with_default_timeout, with_transaction_timeout};
use crate::draft::{
    Asset, AssetId, AssetType, Candidate, CandidateSource, DraftError, DraftPick, DraftResult,
    DraftState, LeagueId, Position, RosterCounts, RosterLimits, StatTier, TeamId,
};

const ROSTER_ASSET_KEY: &str = "roster_slots_league_asset_key";
const PICK_NUMBER_KEY: &str = "draft_picks_league_pick_key";

/// Storage operations for drafts
#[async_trait]
pub trait DraftRepository: CandidateSource {
    /// Team ids registered in a league
    async fn league_teams(&self, league_id: LeagueId) -> DraftResult<Vec<TeamId>>;

    /// Insert a new draft. Fails with `DraftExists` if the league already has one.
    async fn create_draft(&self, state: &DraftState) -> DraftResult<()>;

    /// Load a draft with current roster counts
    async fn load_draft(&self, league_id: LeagueId) -> DraftResult<DraftState>;

    /// Persist a status change (pause, resume)
    async fn update_draft_status(&self, state: &DraftState) -> DraftResult<()>;

    /// Atomically store a pick and advance the draft to `next`.
    ///
    /// Fails with `AlreadyDrafted` when the asset is already on a roster in the
    /// league and with `PickSuperseded` when the draft moved past the pick.
    /// Nothing is written on failure.
    async fn record_pick(&self, pick: &DraftPick, next: &DraftState) -> DraftResult<()>;

    /// Picks in pick order
    async fn list_picks(&self, league_id: LeagueId) -> DraftResult<Vec<DraftPick>>;

    async fn find_asset(&self, asset_id: AssetId) -> DraftResult<Option<Asset>>;

    /// Leagues whose draft is in progress or paused
    async fn active_drafts(&self) -> DraftResult<Vec<LeagueId>>;
}

/// PostgreSQL implementation of `DraftRepository`
#[derive(Clone)]
pub struct PgDraftRepository {
    pool: PgPool,
}

impl PgDraftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a league, returning its id
    pub async fn create_league(&self, name: &str) -> DraftResult<LeagueId> {
        let row = sqlx::query("INSERT INTO leagues (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    /// Add a team to a league, returning its id
    pub async fn create_team(&self, league_id: LeagueId, name: &str) -> DraftResult<TeamId> {
        let row = sqlx::query("INSERT INTO teams (league_id, name) VALUES ($1, $2) RETURNING id")
            .bind(league_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    /// Register a draftable asset, returning its id
    pub async fn create_asset(
        &self,
        asset_type: AssetType,
        name: &str,
        popularity: i64,
    ) -> DraftResult<AssetId> {
        let row = sqlx::query(
            "INSERT INTO assets (asset_type, name, popularity) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(asset_type.as_str())
        .bind(name)
        .bind(popularity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    /// Upsert an asset's points for a day
    pub async fn set_daily_points(
        &self,
        asset_id: AssetId,
        stat_date: NaiveDate,
        total_points: i64,
    ) -> DraftResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_asset_stats (asset_id, stat_date, total_points)
            VALUES ($1, $2, $3)
            ON CONFLICT (asset_id, stat_date) DO UPDATE SET total_points = EXCLUDED.total_points
            "#,
        )
        .bind(asset_id)
        .bind(stat_date)
        .bind(total_points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_rosters(
        &self,
        league_id: LeagueId,
        order: &[TeamId],
    ) -> DraftResult<BTreeMap<TeamId, RosterCounts>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT team_id, position, COUNT(*) AS filled
                FROM roster_slots
                WHERE league_id = $1
                GROUP BY team_id, position
                "#,
            )
            .bind(league_id)
            .fetch_all(&self.pool),
        )
        .await?;

        let mut rosters: BTreeMap<TeamId, RosterCounts> = order
            .iter()
            .map(|team_id| (*team_id, RosterCounts::default()))
            .collect();

        for row in rows {
            let team_id: TeamId = row.get("team_id");
            let position: Position = row.get::<String, _>("position").parse()?;
            let filled: i64 = row.get("filled");
            let counts = rosters.entry(team_id).or_default();
            for _ in 0..filled {
                counts.increment(position);
            }
        }

        Ok(rosters)
    }

    /// Insert the roster slot and pick rows and advance the draft in one transaction
    async fn write_pick(&self, pick: &DraftPick, next: &DraftState) -> DraftResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roster_slots (
                league_id, team_id, asset_id, asset_type, position, acquired_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(pick.league_id)
        .bind(pick.team_id)
        .bind(pick.asset_id)
        .bind(pick.asset_type.as_str())
        .bind(pick.position.as_str())
        .bind(pick.picked_at.naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_pick_conflict(e, pick))?;

        sqlx::query(
            r#"
            INSERT INTO draft_picks (
                league_id, pick_number, round, team_id, asset_type, asset_id,
                position, auto_pick, picked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(pick.league_id)
        .bind(pick.pick_number as i32)
        .bind(pick.round as i32)
        .bind(pick.team_id)
        .bind(pick.asset_type.as_str())
        .bind(pick.asset_id)
        .bind(pick.position.as_str())
        .bind(pick.auto_pick)
        .bind(pick.picked_at.naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_pick_conflict(e, pick))?;

        // Advance only if no one else did first
        let advanced = sqlx::query(
            r#"
            UPDATE drafts
            SET current_pick = $3, current_round = $4, status = $5, pick_deadline = $6,
                picks_made = $7, completed_at = $8, updated_at = NOW()
            WHERE league_id = $1 AND current_pick = $2
            "#,
        )
        .bind(pick.league_id)
        .bind(pick.pick_number as i32)
        .bind(next.current_pick as i32)
        .bind(next.current_round as i32)
        .bind(next.status.to_string())
        .bind(to_naive(next.pick_deadline))
        .bind(next.picks_made as i32)
        .bind(to_naive(next.completed_at))
        .execute(&mut *tx)
        .await?;

        if advanced.rows_affected() == 0 {
            return Err(DraftError::PickSuperseded(pick.pick_number));
        }

        tx.commit().await?;
        Ok(())
    }
}

fn to_naive(dt: Option<DateTime<Utc>>) -> Option<NaiveDateTime> {
    dt.map(|dt| dt.naive_utc())
}

fn from_naive(row: &PgRow, column: &str) -> Option<DateTime<Utc>> {
    row.get::<Option<NaiveDateTime>, _>(column)
        .map(|dt| dt.and_utc())
}

fn pick_from_row(row: &PgRow) -> DraftResult<DraftPick> {
    Ok(DraftPick {
        league_id: row.get("league_id"),
        pick_number: row.get::<i32, _>("pick_number") as u32,
        round: row.get::<i32, _>("round") as u32,
        team_id: row.get("team_id"),
        asset_type: row.get::<String, _>("asset_type").parse()?,
        asset_id: row.get("asset_id"),
        position: row.get::<String, _>("position").parse()?,
        auto_pick: row.get("auto_pick"),
        picked_at: row.get::<NaiveDateTime, _>("picked_at").and_utc(),
    })
}

/// Classify insert failures inside `record_pick`
fn map_pick_conflict(err: sqlx::Error, pick: &DraftPick) -> DraftError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    };

    match constraint.as_deref() {
        Some(PICK_NUMBER_KEY) => DraftError::PickSuperseded(pick.pick_number),
        Some(other) => {
            if other != ROSTER_ASSET_KEY {
                log::warn!(
                    "Unexpected unique violation on '{}' for pick {}",
                    other,
                    pick.pick_number
                );
            }
            DraftError::AlreadyDrafted {
                asset_id: pick.asset_id,
            }
        }
        None => DraftError::Database(err),
    }
}

#[async_trait]
impl CandidateSource for PgDraftRepository {
    async fn best_available(
        &self,
        league_id: LeagueId,
        asset_types: &[AssetType],
        tier: StatTier,
        stat_date: Option<NaiveDate>,
        excluded: &HashSet<AssetId>,
    ) -> DraftResult<Option<Candidate>> {
        let types: Vec<String> = asset_types.iter().map(|t| t.as_str().to_string()).collect();
        let excluded: Vec<AssetId> = excluded.iter().copied().collect();

        let row = match stat_date {
            Some(date) => {
                with_default_timeout(
                    sqlx::query(
                        r#"
                        SELECT a.id, a.asset_type, a.name, s.total_points AS score
                        FROM assets a
                        JOIN daily_asset_stats s ON s.asset_id = a.id AND s.stat_date = $3
                        WHERE a.asset_type = ANY($2)
                          AND NOT (a.id = ANY($4))
                          AND NOT EXISTS (
                              SELECT 1 FROM roster_slots r
                              WHERE r.league_id = $1 AND r.asset_id = a.id
                          )
                        ORDER BY s.total_points DESC, a.id ASC
                        LIMIT 1
                        "#,
                    )
                    .bind(league_id)
                    .bind(&types)
                    .bind(date)
                    .bind(&excluded)
                    .fetch_optional(&self.pool),
                )
                .await?
            }
            None => {
                with_default_timeout(
                    sqlx::query(
                        r#"
                        SELECT a.id, a.asset_type, a.name, a.popularity AS score
                        FROM assets a
                        WHERE a.asset_type = ANY($2)
                          AND NOT (a.id = ANY($3))
                          AND NOT EXISTS (
                              SELECT 1 FROM roster_slots r
                              WHERE r.league_id = $1 AND r.asset_id = a.id
                          )
                        ORDER BY a.popularity DESC, a.id ASC
                        LIMIT 1
                        "#,
                    )
                    .bind(league_id)
                    .bind(&types)
                    .bind(&excluded)
                    .fetch_optional(&self.pool),
                )
                .await?
            }
        };

        row.map(|row| {
            Ok(Candidate {
                asset_id: row.get("id"),
                asset_type: row.get::<String, _>("asset_type").parse()?,
                name: row.get("name"),
                score: row.get("score"),
                tier,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl DraftRepository for PgDraftRepository {
    async fn league_teams(&self, league_id: LeagueId) -> DraftResult<Vec<TeamId>> {
        let rows = with_default_timeout(
            sqlx::query("SELECT id FROM teams WHERE league_id = $1 ORDER BY id")
                .bind(league_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn create_draft(&self, state: &DraftState) -> DraftResult<()> {
        let limits = serde_json::to_string(&state.limits)
            .map_err(|e| DraftError::InvalidConfig(e.to_string()))?;

        let result = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO drafts (
                    league_id, status, current_pick, current_round, total_picks,
                    draft_order, roster_limits, pick_timer_secs, pick_deadline,
                    picks_made, started_at, completed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(state.league_id)
            .bind(state.status.to_string())
            .bind(state.current_pick as i32)
            .bind(state.current_round as i32)
            .bind(state.total_picks as i32)
            .bind(&state.order)
            .bind(limits)
            .bind(state.pick_timer_secs as i64)
            .bind(to_naive(state.pick_deadline))
            .bind(state.picks_made as i32)
            .bind(to_naive(state.started_at))
            .bind(to_naive(state.completed_at))
            .execute(&self.pool),
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(TimeoutError::Database(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() =>
            {
                Err(DraftError::DraftExists(state.league_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_draft(&self, league_id: LeagueId) -> DraftResult<DraftState> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT league_id, status, current_pick, current_round, total_picks,
                       draft_order, roster_limits::text AS roster_limits, pick_timer_secs,
                       pick_deadline, picks_made, started_at, completed_at
                FROM drafts
                WHERE league_id = $1
                "#,
            )
            .bind(league_id)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(DraftError::DraftNotFound(league_id))?;

        let order: Vec<TeamId> = row.get("draft_order");
        let limits: RosterLimits = serde_json::from_str(&row.get::<String, _>("roster_limits"))
            .map_err(|e| DraftError::InvalidConfig(format!("bad roster limits: {e}")))?;
        let rosters = self.load_rosters(league_id, &order).await?;

        Ok(DraftState {
            league_id,
            status: row.get::<String, _>("status").parse()?,
            current_pick: row.get::<i32, _>("current_pick") as u32,
            current_round: row.get::<i32, _>("current_round") as u32,
            total_picks: row.get::<i32, _>("total_picks") as u32,
            order,
            rosters,
            limits,
            pick_timer_secs: row.get::<i64, _>("pick_timer_secs") as u64,
            pick_deadline: from_naive(&row, "pick_deadline"),
            picks_made: row.get::<i32, _>("picks_made") as u32,
            started_at: from_naive(&row, "started_at"),
            completed_at: from_naive(&row, "completed_at"),
        })
    }

    async fn update_draft_status(&self, state: &DraftState) -> DraftResult<()> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE drafts
                SET status = $2, pick_deadline = $3, pick_timer_secs = $4,
                    started_at = $5, updated_at = NOW()
                WHERE league_id = $1
                "#,
            )
            .bind(state.league_id)
            .bind(state.status.to_string())
            .bind(to_naive(state.pick_deadline))
            .bind(state.pick_timer_secs as i64)
            .bind(to_naive(state.started_at))
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(DraftError::DraftNotFound(state.league_id));
        }
        Ok(())
    }

    async fn record_pick(&self, pick: &DraftPick, next: &DraftState) -> DraftResult<()> {
        with_transaction_timeout(self.write_pick(pick, next)).await
    }

    async fn list_picks(&self, league_id: LeagueId) -> DraftResult<Vec<DraftPick>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT league_id, pick_number, round, team_id, asset_type, asset_id,
                       position, auto_pick, picked_at
                FROM draft_picks
                WHERE league_id = $1
                ORDER BY pick_number
                "#,
            )
            .bind(league_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(pick_from_row).collect()
    }

    async fn find_asset(&self, asset_id: AssetId) -> DraftResult<Option<Asset>> {
        let row = with_default_timeout(
            sqlx::query("SELECT id, asset_type, name, popularity FROM assets WHERE id = $1")
                .bind(asset_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.map(|row| {
            Ok(Asset {
                id: row.get("id"),
                asset_type: row.get::<String, _>("asset_type").parse()?,
                name: row.get("name"),
                popularity: row.get("popularity"),
            })
        })
        .transpose()
    }

    async fn active_drafts(&self) -> DraftResult<Vec<LeagueId>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT league_id FROM drafts
                WHERE status IN ('in_progress', 'paused')
                ORDER BY league_id
                "#,
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(|row| row.get("league_id")).collect())
    }
}
