//! Best-available pick selection.

use super::{
    errors::{DraftError, DraftResult},
    models::{
        AssetId, AssetType, Candidate, LeagueId, Position, RosterCounts, RosterLimits, StatTier,
        TeamId,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Source of ranked, undrafted assets.
///
/// Implementations return the highest-scoring asset of one of `asset_types` that
/// is on no roster in the league and not in `excluded`, ranked by the tier's
/// metric. Score ties go to the lower asset id.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn best_available(
        &self,
        league_id: LeagueId,
        asset_types: &[AssetType],
        tier: StatTier,
        stat_date: Option<NaiveDate>,
        excluded: &HashSet<AssetId>,
    ) -> DraftResult<Option<Candidate>>;
}

/// Positions with open slots, most open slots first.
///
/// Ties keep canonical position order, so flex comes last among equals.
pub fn positions_by_need(counts: &RosterCounts, limits: &RosterLimits) -> Vec<(Position, u8)> {
    let mut needs: Vec<(Position, u8)> = Position::ALL
        .iter()
        .map(|p| (*p, counts.remaining_need(*p, limits)))
        .filter(|(_, need)| *need > 0)
        .collect();
    // stable sort keeps canonical order for ties
    needs.sort_by(|a, b| b.1.cmp(&a.1));
    needs
}

/// Selected asset and the slot it will fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub candidate: Candidate,
    pub position: Position,
}

/// Auto-pick selection policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PickPolicy;

impl PickPolicy {
    /// Choose the best available asset for a team.
    ///
    /// Walks positions by need and, for each, tries previous-day points, then
    /// current-day points, then popularity. The first hit wins.
    #[allow(clippy::too_many_arguments)]
    pub async fn select<S>(
        &self,
        source: &S,
        league_id: LeagueId,
        team_id: TeamId,
        counts: &RosterCounts,
        limits: &RosterLimits,
        today: NaiveDate,
        excluded: &HashSet<AssetId>,
    ) -> DraftResult<Selection>
    where
        S: CandidateSource + ?Sized,
    {
        let needs = positions_by_need(counts, limits);
        if needs.is_empty() {
            return Err(DraftError::RosterFull(team_id));
        }

        for (position, _) in needs {
            for tier in StatTier::FALLBACK_ORDER {
                let found = source
                    .best_available(
                        league_id,
                        position.asset_types(),
                        tier,
                        tier.stat_date(today),
                        excluded,
                    )
                    .await?;

                if let Some(candidate) = found {
                    let Some(slot) = counts.slot_for(candidate.asset_type, limits) else {
                        continue;
                    };
                    log::debug!(
                        "League {}: team {} selects {} ({}) for {} via {} tier",
                        league_id,
                        team_id,
                        candidate.asset_id,
                        candidate.asset_type,
                        slot,
                        tier
                    );
                    return Ok(Selection {
                        candidate,
                        position: slot,
                    });
                }
            }
        }

        Err(DraftError::NoCandidates(team_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Entry {
        id: AssetId,
        asset_type: AssetType,
        previous_day: Option<i64>,
        current_day: Option<i64>,
        popularity: i64,
    }

    #[derive(Default)]
    struct FakeSource {
        entries: Vec<Entry>,
        calls: Mutex<Vec<(Vec<AssetType>, StatTier)>>,
    }

    impl FakeSource {
        fn with(
            mut self,
            id: AssetId,
            asset_type: AssetType,
            prev: Option<i64>,
            cur: Option<i64>,
            pop: i64,
        ) -> Self {
            self.entries.push(Entry {
                id,
                asset_type,
                previous_day: prev,
                current_day: cur,
                popularity: pop,
            });
            self
        }
    }

    #[async_trait]
    impl CandidateSource for FakeSource {
        async fn best_available(
            &self,
            _league_id: LeagueId,
            asset_types: &[AssetType],
            tier: StatTier,
            _stat_date: Option<NaiveDate>,
            excluded: &HashSet<AssetId>,
        ) -> DraftResult<Option<Candidate>> {
            self.calls.lock().unwrap().push((asset_types.to_vec(), tier));
            let best = self
                .entries
                .iter()
                .filter(|e| asset_types.contains(&e.asset_type) && !excluded.contains(&e.id))
                .filter_map(|e| {
                    let score = match tier {
                        StatTier::PreviousDay => e.previous_day?,
                        StatTier::CurrentDay => e.current_day?,
                        StatTier::Popularity => e.popularity,
                    };
                    Some((score, e))
                })
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.id.cmp(&a.1.id)));
            Ok(best.map(|(score, e)| Candidate {
                asset_id: e.id,
                asset_type: e.asset_type,
                name: format!("asset-{}", e.id),
                score,
                tier,
            }))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn test_positions_by_need_orders_descending_with_canonical_ties() {
        let limits = RosterLimits::default();
        let mut counts = RosterCounts::default();
        counts.increment(Position::Manufacturer);

        let order: Vec<Position> = positions_by_need(&counts, &limits)
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(
            order,
            vec![
                Position::CannabisStrain,
                Position::Product,
                Position::Pharmacy,
                Position::Manufacturer,
                Position::Brand,
                Position::Flex,
            ]
        );
    }

    #[test]
    fn test_positions_by_need_skips_full_slots() {
        let limits = RosterLimits::default();
        let mut counts = RosterCounts::default();
        counts.increment(Position::Brand);
        assert!(
            !positions_by_need(&counts, &limits)
                .iter()
                .any(|(p, _)| *p == Position::Brand)
        );
    }

    #[tokio::test]
    async fn test_prefers_previous_day_points() {
        let source = FakeSource::default()
            .with(1, AssetType::Manufacturer, Some(10), Some(99), 1000)
            .with(2, AssetType::Manufacturer, Some(20), None, 1);

        let selection = PickPolicy
            .select(
                &source,
                1,
                5,
                &RosterCounts::default(),
                &RosterLimits::default(),
                today(),
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(selection.candidate.asset_id, 2);
        assert_eq!(selection.candidate.tier, StatTier::PreviousDay);
        assert_eq!(selection.position, Position::Manufacturer);
    }

    #[tokio::test]
    async fn test_falls_back_to_current_day_then_popularity() {
        let source = FakeSource::default()
            .with(1, AssetType::Manufacturer, None, Some(5), 10)
            .with(2, AssetType::Manufacturer, None, None, 500);

        let selection = PickPolicy
            .select(
                &source,
                1,
                5,
                &RosterCounts::default(),
                &RosterLimits::default(),
                today(),
                &HashSet::new(),
            )
            .await
            .unwrap();
        assert_eq!(selection.candidate.asset_id, 1);
        assert_eq!(selection.candidate.tier, StatTier::CurrentDay);

        let excluded = HashSet::from([1]);
        let selection = PickPolicy
            .select(
                &source,
                1,
                5,
                &RosterCounts::default(),
                &RosterLimits::default(),
                today(),
                &excluded,
            )
            .await
            .unwrap();
        assert_eq!(selection.candidate.asset_id, 2);
        assert_eq!(selection.candidate.tier, StatTier::Popularity);
    }

    #[tokio::test]
    async fn test_moves_to_next_position_when_none_available() {
        let source = FakeSource::default().with(9, AssetType::Pharmacy, None, None, 3);

        let selection = PickPolicy
            .select(
                &source,
                1,
                5,
                &RosterCounts::default(),
                &RosterLimits::default(),
                today(),
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(selection.candidate.asset_id, 9);
        assert_eq!(selection.position, Position::Pharmacy);
        // manufacturer, cannabis_strain and product each tried all three tiers first
        assert_eq!(source.calls.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_flex_only_need_takes_any_type() {
        let limits = RosterLimits {
            manufacturer: 1,
            cannabis_strain: 0,
            product: 0,
            pharmacy: 0,
            brand: 0,
            flex: 1,
        };
        let mut counts = RosterCounts::default();
        counts.increment(Position::Manufacturer);
        let source = FakeSource::default()
            .with(1, AssetType::Brand, Some(4), None, 0)
            .with(2, AssetType::Product, Some(8), None, 0);

        let selection = PickPolicy
            .select(&source, 1, 5, &counts, &limits, today(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(selection.candidate.asset_id, 2);
        assert_eq!(selection.position, Position::Flex);
    }

    #[tokio::test]
    async fn test_full_roster_and_empty_pool() {
        let limits = RosterLimits {
            manufacturer: 1,
            cannabis_strain: 0,
            product: 0,
            pharmacy: 0,
            brand: 0,
            flex: 0,
        };
        let mut counts = RosterCounts::default();
        let source = FakeSource::default();

        assert!(matches!(
            PickPolicy
                .select(&source, 1, 5, &counts, &limits, today(), &HashSet::new())
                .await,
            Err(DraftError::NoCandidates(5))
        ));

        counts.increment(Position::Manufacturer);
        assert!(matches!(
            PickPolicy
                .select(&source, 1, 5, &counts, &limits, today(), &HashSet::new())
                .await,
            Err(DraftError::RosterFull(5))
        ));
    }
}
