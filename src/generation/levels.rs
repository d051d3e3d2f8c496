//! # Level Table
//!
//! The per-level generation records and the overworld's path offer.

use crate::generation::{DoorPlacement, GenerationConfig, LevelParams};
use crate::{DelverError, DelverResult};
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fewest and most paths offered at once
pub const MIN_PATHS_OFFERED: usize = 2;
pub const MAX_PATHS_OFFERED: usize = 5;

const BUILTIN_LEVELS: &str = include_str!("../../data/levels.json");

/// Level records keyed by level name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelTable {
    levels: BTreeMap<String, LevelParams>,
}

impl LevelTable {
    /// Parses and validates a table from JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::LevelTable;
    ///
    /// let table = LevelTable::from_json(r#"{"cellar": {"num_rooms": 3, "type": "dung"}}"#).unwrap();
    /// assert_eq!(table.get("cellar").unwrap().num_rooms, 3);
    /// assert!(table.get("attic").is_err());
    /// ```
    pub fn from_json(json: &str) -> DelverResult<Self> {
        let table: LevelTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Loads a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> DelverResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        info!("Loaded {} levels from {}", table.len(), path.display());
        Ok(table)
    }

    /// The table bundled with the crate.
    pub fn builtin() -> DelverResult<Self> {
        Self::from_json(BUILTIN_LEVELS)
    }

    fn validate(&self) -> DelverResult<()> {
        for (name, params) in &self.levels {
            params.validate().map_err(|err| {
                DelverError::InvalidState(format!("level '{}' is invalid: {}", name, err))
            })?;
        }
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, params: LevelParams) {
        self.levels.insert(name.into(), params);
    }

    pub fn get(&self, name: &str) -> DelverResult<&LevelParams> {
        self.levels
            .get(name)
            .ok_or_else(|| DelverError::UnknownLevel(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Generation config for a named level.
    pub fn generation_config(
        &self,
        name: &str,
        seed: u64,
        door_placement: DoorPlacement,
    ) -> DelverResult<GenerationConfig> {
        let params = self.get(name)?.clone();
        Ok(GenerationConfig::for_level(seed, name, params).with_door_placement(door_placement))
    }

    /// Draws between two and five level names, with replacement, weighted by
    /// each level's `weight`.
    pub fn offer_paths(&self, rng: &mut StdRng) -> DelverResult<Vec<String>> {
        let names: Vec<&String> = self.levels.keys().collect();
        let weights = self.levels.values().map(|params| params.weight);
        let picker = WeightedIndex::new(weights).map_err(|err| {
            DelverError::InvalidState(format!("cannot offer paths: {}", err))
        })?;

        let count = rng.gen_range(MIN_PATHS_OFFERED..=MAX_PATHS_OFFERED);
        let offered: Vec<String> = (0..count)
            .map(|_| names[picker.sample(rng)].clone())
            .collect();
        debug!("Offering paths {:?}", offered);
        Ok(offered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{utils::create_rng, LevelKind};

    #[test]
    fn test_builtin_table_is_valid() {
        let table = LevelTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert!(table
            .names()
            .any(|name| table.get(name).unwrap().kind == LevelKind::Dungeon));
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let result = LevelTable::from_json(r#"{"pit": {"trap_chance": 2.0}}"#);
        assert!(matches!(result, Err(DelverError::InvalidState(_))));

        let result = LevelTable::from_json(r#"{"pit": {"num_rooms": "many"}}"#);
        assert!(matches!(result, Err(DelverError::Serde(_))));
    }

    #[test]
    fn test_offer_paths_respects_bounds_and_weights() {
        let table = LevelTable::from_json(
            r#"{
                "never": {"weight": 0},
                "always": {"weight": 3, "type": "dung"}
            }"#,
        )
        .unwrap();
        let mut rng = create_rng(17);

        for _ in 0..50 {
            let offered = table.offer_paths(&mut rng).unwrap();
            assert!((MIN_PATHS_OFFERED..=MAX_PATHS_OFFERED).contains(&offered.len()));
            assert!(offered.iter().all(|name| name == "always"));
        }
    }

    #[test]
    fn test_offer_paths_needs_weight() {
        let table = LevelTable::from_json(r#"{"closed": {"weight": 0}}"#).unwrap();
        let mut rng = create_rng(1);
        assert!(table.offer_paths(&mut rng).is_err());
        assert!(LevelTable::default().offer_paths(&mut rng).is_err());
    }

    #[test]
    fn test_generation_config_for_level() {
        let table = LevelTable::from_json(r#"{"cellar": {"num_rooms": 3}}"#).unwrap();
        let config = table
            .generation_config("cellar", 9, DoorPlacement::Randomized)
            .unwrap();
        assert_eq!(config.level_key, "cellar");
        assert_eq!(config.level.num_rooms, 3);
        assert_eq!(config.seed, 9);
        assert_eq!(config.door_placement, DoorPlacement::Randomized);
        assert!(matches!(
            table.generation_config("attic", 9, DoorPlacement::Midpoint),
            Err(DelverError::UnknownLevel(_))
        ));
    }
}
