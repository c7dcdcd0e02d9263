//! Snake draft ordering.
//!
//! Odd rounds run through the team order front to back, even rounds back to
//! front, so the team picking last in one round picks first in the next.

use super::models::{RosterLimits, TeamId};
use rand::seq::SliceRandom;

/// Round (1-based) and order index for a global pick number (1-based).
///
/// Returns `None` for pick 0 or an empty team list.
pub fn snake_slot(pick_number: u32, team_count: usize) -> Option<(u32, usize)> {
    if pick_number == 0 || team_count == 0 {
        return None;
    }

    let n = team_count as u32;
    let zero_based = pick_number - 1;
    let round = zero_based / n + 1;
    let offset = (zero_based % n) as usize;

    let index = if round % 2 == 1 {
        offset
    } else {
        team_count - 1 - offset
    };

    Some((round, index))
}

/// Team owning a pick
pub fn team_for_pick(order: &[TeamId], pick_number: u32) -> Option<TeamId> {
    snake_slot(pick_number, order.len()).map(|(_, index)| order[index])
}

/// Round a pick falls in
pub fn round_for_pick(pick_number: u32, team_count: usize) -> Option<u32> {
    snake_slot(pick_number, team_count).map(|(round, _)| round)
}

/// Picks in a complete draft
pub fn total_picks(team_count: usize, limits: &RosterLimits) -> u32 {
    team_count as u32 * limits.roster_size()
}

/// Every pick number a team owns, in order
pub fn picks_for_team(order: &[TeamId], team_id: TeamId, total: u32) -> Vec<u32> {
    (1..=total)
        .filter(|&pick| team_for_pick(order, pick) == Some(team_id))
        .collect()
}

/// Random draft order generator
pub struct DraftOrderRandomizer {
    rng: rand::rngs::ThreadRng,
}

impl DraftOrderRandomizer {
    /// Create a new randomizer
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }

    /// Shuffled copy of the team list
    pub fn shuffle(&mut self, team_ids: &[TeamId]) -> Vec<TeamId> {
        let mut order = team_ids.to_vec();
        order.shuffle(&mut self.rng);
        order
    }
}

impl Default for DraftOrderRandomizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_slot_four_teams() {
        let expected = [
            (1, 0),
            (1, 1),
            (1, 2),
            (1, 3),
            (2, 3),
            (2, 2),
            (2, 1),
            (2, 0),
            (3, 0),
        ];
        for (i, slot) in expected.iter().enumerate() {
            assert_eq!(snake_slot(i as u32 + 1, 4), Some(*slot), "pick {}", i + 1);
        }
    }

    #[test]
    fn test_snake_slot_invalid_input() {
        assert_eq!(snake_slot(0, 4), None);
        assert_eq!(snake_slot(1, 0), None);
    }

    #[test]
    fn test_single_team_always_picks() {
        for pick in 1..=5 {
            assert_eq!(team_for_pick(&[42], pick), Some(42));
            assert_eq!(round_for_pick(pick, 1), Some(pick));
        }
    }

    #[test]
    fn test_turn_passes_back_to_same_team_at_round_boundary() {
        let order = [10, 20, 30];
        assert_eq!(team_for_pick(&order, 3), Some(30));
        assert_eq!(team_for_pick(&order, 4), Some(30));
        assert_eq!(team_for_pick(&order, 6), Some(10));
        assert_eq!(team_for_pick(&order, 7), Some(10));
    }

    #[test]
    fn test_total_picks() {
        assert_eq!(total_picks(12, &RosterLimits::default()), 120);
    }

    #[test]
    fn test_picks_for_team() {
        let order = [1, 2, 3];
        assert_eq!(picks_for_team(&order, 1, 9), vec![1, 6, 7]);
        assert_eq!(picks_for_team(&order, 3, 9), vec![3, 4, 9]);
    }

    #[test]
    fn test_randomizer_keeps_all_teams() {
        let mut randomizer = DraftOrderRandomizer::new();
        let teams = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut order = randomizer.shuffle(&teams);
        order.sort_unstable();
        assert_eq!(order, teams);
    }

    #[test]
    fn test_randomizer_empty() {
        let mut randomizer = DraftOrderRandomizer::new();
        assert!(randomizer.shuffle(&[]).is_empty());
    }
}
