//! Draft data models.

use super::errors::DraftError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// League ID type
pub type LeagueId = i64;

/// Team ID type
pub type TeamId = i64;

/// Asset ID type (a draftable market entity)
pub type AssetId = i64;

/// Kinds of market entity that can be drafted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Manufacturer,
    CannabisStrain,
    Product,
    Pharmacy,
    Brand,
}

impl AssetType {
    /// All asset types in canonical order
    pub const ALL: [AssetType; 5] = [
        AssetType::Manufacturer,
        AssetType::CannabisStrain,
        AssetType::Product,
        AssetType::Pharmacy,
        AssetType::Brand,
    ];

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Manufacturer => "manufacturer",
            AssetType::CannabisStrain => "cannabis_strain",
            AssetType::Product => "product",
            AssetType::Pharmacy => "pharmacy",
            AssetType::Brand => "brand",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manufacturer" => Ok(AssetType::Manufacturer),
            "cannabis_strain" => Ok(AssetType::CannabisStrain),
            "product" => Ok(AssetType::Product),
            "pharmacy" => Ok(AssetType::Pharmacy),
            "brand" => Ok(AssetType::Brand),
            other => Err(DraftError::UnknownAssetType(other.to_string())),
        }
    }
}

/// Roster slot kinds. `Flex` accepts any asset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Manufacturer,
    CannabisStrain,
    Product,
    Pharmacy,
    Brand,
    Flex,
}

impl Position {
    /// All positions in canonical order (used as the need tie-breaker)
    pub const ALL: [Position; 6] = [
        Position::Manufacturer,
        Position::CannabisStrain,
        Position::Product,
        Position::Pharmacy,
        Position::Brand,
        Position::Flex,
    ];

    /// Asset types eligible for this slot
    pub fn asset_types(&self) -> &'static [AssetType] {
        match self {
            Position::Manufacturer => &[AssetType::Manufacturer],
            Position::CannabisStrain => &[AssetType::CannabisStrain],
            Position::Product => &[AssetType::Product],
            Position::Pharmacy => &[AssetType::Pharmacy],
            Position::Brand => &[AssetType::Brand],
            Position::Flex => &AssetType::ALL,
        }
    }

    /// Whether an asset of `asset_type` may occupy this slot
    pub fn accepts(&self, asset_type: AssetType) -> bool {
        self.asset_types().contains(&asset_type)
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Flex => "flex",
            other => other
                .asset_types()
                .first()
                .map(AssetType::as_str)
                .unwrap_or("flex"),
        }
    }
}

impl From<AssetType> for Position {
    fn from(asset_type: AssetType) -> Self {
        match asset_type {
            AssetType::Manufacturer => Position::Manufacturer,
            AssetType::CannabisStrain => Position::CannabisStrain,
            AssetType::Product => Position::Product,
            AssetType::Pharmacy => Position::Pharmacy,
            AssetType::Brand => Position::Brand,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "flex" {
            return Ok(Position::Flex);
        }
        s.parse::<AssetType>().map(Position::from)
    }
}

/// Maximum number of roster slots per position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterLimits {
    pub manufacturer: u8,
    pub cannabis_strain: u8,
    pub product: u8,
    pub pharmacy: u8,
    pub brand: u8,
    pub flex: u8,
}

impl Default for RosterLimits {
    fn default() -> Self {
        Self {
            manufacturer: 2,
            cannabis_strain: 2,
            product: 2,
            pharmacy: 2,
            brand: 1,
            flex: 1,
        }
    }
}

impl RosterLimits {
    /// Slot limit for a position
    pub fn limit(&self, position: Position) -> u8 {
        match position {
            Position::Manufacturer => self.manufacturer,
            Position::CannabisStrain => self.cannabis_strain,
            Position::Product => self.product,
            Position::Pharmacy => self.pharmacy,
            Position::Brand => self.brand,
            Position::Flex => self.flex,
        }
    }

    /// Total roster size (picks per team)
    pub fn roster_size(&self) -> u32 {
        Position::ALL.iter().map(|p| u32::from(self.limit(*p))).sum()
    }

    /// Validate limits
    pub fn validate(&self) -> Result<(), String> {
        if self.roster_size() == 0 {
            return Err("Roster must have at least one slot".to_string());
        }
        Ok(())
    }
}

/// Filled roster slots per position for one team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCounts {
    pub manufacturer: u8,
    pub cannabis_strain: u8,
    pub product: u8,
    pub pharmacy: u8,
    pub brand: u8,
    pub flex: u8,
}

impl RosterCounts {
    /// Filled slots for a position
    pub fn filled(&self, position: Position) -> u8 {
        match position {
            Position::Manufacturer => self.manufacturer,
            Position::CannabisStrain => self.cannabis_strain,
            Position::Product => self.product,
            Position::Pharmacy => self.pharmacy,
            Position::Brand => self.brand,
            Position::Flex => self.flex,
        }
    }

    fn slot_mut(&mut self, position: Position) -> &mut u8 {
        match position {
            Position::Manufacturer => &mut self.manufacturer,
            Position::CannabisStrain => &mut self.cannabis_strain,
            Position::Product => &mut self.product,
            Position::Pharmacy => &mut self.pharmacy,
            Position::Brand => &mut self.brand,
            Position::Flex => &mut self.flex,
        }
    }

    /// Record one more filled slot
    pub fn increment(&mut self, position: Position) {
        let slot = self.slot_mut(position);
        *slot = slot.saturating_add(1);
    }

    /// Total filled slots
    pub fn total(&self) -> u32 {
        Position::ALL.iter().map(|p| u32::from(self.filled(*p))).sum()
    }

    /// Open slots left for a position
    pub fn remaining_need(&self, position: Position, limits: &RosterLimits) -> u8 {
        limits.limit(position).saturating_sub(self.filled(position))
    }

    /// Slot an asset of `asset_type` would occupy: its own position first, then flex
    pub fn slot_for(&self, asset_type: AssetType, limits: &RosterLimits) -> Option<Position> {
        let base = Position::from(asset_type);
        if self.remaining_need(base, limits) > 0 {
            Some(base)
        } else if self.remaining_need(Position::Flex, limits) > 0 {
            Some(Position::Flex)
        } else {
            None
        }
    }

    /// Whether every slot is filled
    pub fn is_full(&self, limits: &RosterLimits) -> bool {
        Position::ALL
            .iter()
            .all(|p| self.remaining_need(*p, limits) == 0)
    }
}

/// Data-freshness tiers used to rank available assets, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTier {
    /// Points from the previous day's aggregated stats
    PreviousDay,
    /// Points from today's (possibly partial) stats
    CurrentDay,
    /// Static popularity metric
    Popularity,
}

impl StatTier {
    /// Fallback order
    pub const FALLBACK_ORDER: [StatTier; 3] = [
        StatTier::PreviousDay,
        StatTier::CurrentDay,
        StatTier::Popularity,
    ];

    /// Stat date queried for this tier, `None` for popularity
    pub fn stat_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            StatTier::PreviousDay => today.pred_opt(),
            StatTier::CurrentDay => Some(today),
            StatTier::Popularity => None,
        }
    }
}

impl fmt::Display for StatTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatTier::PreviousDay => write!(f, "previous_day"),
            StatTier::CurrentDay => write!(f, "current_day"),
            StatTier::Popularity => write!(f, "popularity"),
        }
    }
}

/// A draftable asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub asset_type: AssetType,
    pub name: String,
    /// Static popularity metric (last-resort ranking)
    pub popularity: i64,
}

/// Best-available result from a candidate query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub asset_id: AssetId,
    pub asset_type: AssetType,
    pub name: String,
    pub score: i64,
    pub tier: StatTier,
}

/// Draft lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftStatus::Pending => write!(f, "pending"),
            DraftStatus::InProgress => write!(f, "in_progress"),
            DraftStatus::Paused => write!(f, "paused"),
            DraftStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for DraftStatus {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DraftStatus::Pending),
            "in_progress" => Ok(DraftStatus::InProgress),
            "paused" => Ok(DraftStatus::Paused),
            "completed" => Ok(DraftStatus::Completed),
            other => Err(DraftError::InvalidConfig(format!(
                "unknown draft status '{other}'"
            ))),
        }
    }
}

/// A recorded pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    pub league_id: LeagueId,
    /// Global pick number, 1-based
    pub pick_number: u32,
    /// Round, 1-based
    pub round: u32,
    pub team_id: TeamId,
    pub asset_type: AssetType,
    pub asset_id: AssetId,
    /// Roster slot the asset fills
    pub position: Position,
    pub auto_pick: bool,
    pub picked_at: DateTime<Utc>,
}

/// Manual pick request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSelection {
    pub team_id: TeamId,
    pub asset_id: AssetId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_size() {
        assert_eq!(RosterLimits::default().roster_size(), 10);
    }

    #[test]
    fn test_asset_type_round_trips_through_storage_name() {
        for asset_type in AssetType::ALL {
            assert_eq!(asset_type.as_str().parse::<AssetType>().unwrap(), asset_type);
        }
        assert!("dispensary".parse::<AssetType>().is_err());
    }

    #[test]
    fn test_position_storage_names() {
        assert_eq!(Position::CannabisStrain.as_str(), "cannabis_strain");
        assert_eq!(Position::Flex.as_str(), "flex");
        assert_eq!("flex".parse::<Position>().unwrap(), Position::Flex);
        assert_eq!("brand".parse::<Position>().unwrap(), Position::Brand);
    }

    #[test]
    fn test_flex_accepts_every_type() {
        for asset_type in AssetType::ALL {
            assert!(Position::Flex.accepts(asset_type));
        }
        assert!(!Position::Brand.accepts(AssetType::Product));
    }

    #[test]
    fn test_slot_for_prefers_base_position_then_flex() {
        let limits = RosterLimits::default();
        let mut counts = RosterCounts::default();

        assert_eq!(
            counts.slot_for(AssetType::Brand, &limits),
            Some(Position::Brand)
        );

        counts.increment(Position::Brand);
        assert_eq!(
            counts.slot_for(AssetType::Brand, &limits),
            Some(Position::Flex)
        );

        counts.increment(Position::Flex);
        assert_eq!(counts.slot_for(AssetType::Brand, &limits), None);
        assert_eq!(
            counts.slot_for(AssetType::Pharmacy, &limits),
            Some(Position::Pharmacy)
        );
    }

    #[test]
    fn test_remaining_need_saturates() {
        let limits = RosterLimits {
            brand: 0,
            ..RosterLimits::default()
        };
        let mut counts = RosterCounts::default();
        counts.increment(Position::Brand);
        assert_eq!(counts.remaining_need(Position::Brand, &limits), 0);
    }

    #[test]
    fn test_stat_tier_dates() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            StatTier::PreviousDay.stat_date(today),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(StatTier::CurrentDay.stat_date(today), Some(today));
        assert_eq!(StatTier::Popularity.stat_date(today), None);
    }

    #[test]
    fn test_empty_limits_rejected() {
        let limits = RosterLimits {
            manufacturer: 0,
            cannabis_strain: 0,
            product: 0,
            pharmacy: 0,
            brand: 0,
            flex: 0,
        };
        assert!(limits.validate().is_err());
    }
}
