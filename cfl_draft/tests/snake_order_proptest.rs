/// Property-based tests for snake draft ordering
///
/// These tests check the turn-order invariants over random team counts
/// and roster sizes.
use cfl_draft::draft::{
    DraftOrderRandomizer, RosterLimits, order::picks_for_team, snake_slot, team_for_pick,
    total_picks,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

// Roster limits with at least one slot
fn limits_strategy() -> impl Strategy<Value = RosterLimits> {
    (0u8..=3, 0u8..=3, 0u8..=3, 0u8..=3, 0u8..=2, 0u8..=2)
        .prop_filter("roster needs a slot", |l| {
            l.0 + l.1 + l.2 + l.3 + l.4 + l.5 > 0
        })
        .prop_map(
            |(manufacturer, cannabis_strain, product, pharmacy, brand, flex)| RosterLimits {
                manufacturer,
                cannabis_strain,
                product,
                pharmacy,
                brand,
                flex,
            },
        )
}

fn order_for(team_count: usize) -> Vec<i64> {
    (1..=team_count as i64).map(|t| t * 10).collect()
}

proptest! {
    #[test]
    fn every_team_picks_once_per_round(team_count in 1usize..=16, round in 1u32..=20) {
        let order = order_for(team_count);
        let first = (round - 1) * team_count as u32 + 1;
        let teams: HashSet<i64> = (first..first + team_count as u32)
            .map(|pick| team_for_pick(&order, pick).unwrap())
            .collect();
        prop_assert_eq!(teams.len(), team_count);
    }

    #[test]
    fn completed_draft_gives_each_team_a_full_roster(
        team_count in 1usize..=14,
        limits in limits_strategy(),
    ) {
        let order = order_for(team_count);
        let total = total_picks(team_count, &limits);

        let mut counts: HashMap<i64, u32> = HashMap::new();
        for pick in 1..=total {
            *counts.entry(team_for_pick(&order, pick).unwrap()).or_default() += 1;
        }

        prop_assert_eq!(counts.len(), team_count);
        for count in counts.values() {
            prop_assert_eq!(*count, limits.roster_size());
        }
    }

    #[test]
    fn round_boundary_repeats_team(team_count in 2usize..=16, round in 1u32..=20) {
        let order = order_for(team_count);
        let last_of_round = round * team_count as u32;
        prop_assert_eq!(
            team_for_pick(&order, last_of_round),
            team_for_pick(&order, last_of_round + 1)
        );
    }

    #[test]
    fn round_matches_formula(pick in 1u32..=500, team_count in 1usize..=16) {
        let (round, index) = snake_slot(pick, team_count).unwrap();
        prop_assert_eq!(round, (pick - 1) / team_count as u32 + 1);
        prop_assert!(index < team_count);
    }

    #[test]
    fn picks_for_team_partition_the_draft(team_count in 1usize..=10, limits in limits_strategy()) {
        let order = order_for(team_count);
        let total = total_picks(team_count, &limits);

        let mut all: Vec<u32> = order
            .iter()
            .flat_map(|team| picks_for_team(&order, *team, total))
            .collect();
        all.sort_unstable();
        prop_assert_eq!(all, (1..=total).collect::<Vec<_>>());
    }

    #[test]
    fn shuffled_order_is_a_permutation(team_count in 0usize..=20) {
        let teams = order_for(team_count);
        let mut shuffled = DraftOrderRandomizer::new().shuffle(&teams);
        shuffled.sort_unstable();
        prop_assert_eq!(shuffled, teams);
    }
}
