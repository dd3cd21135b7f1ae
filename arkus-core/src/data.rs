use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::world::{Classification, Item};
use crate::{GeneratorError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct GameTable {
    pub game: String,
    pub filler_item_name: String,
    #[serde(default)]
    pub starting_characters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub progression: bool,
    #[serde(default)]
    pub useful: bool,
    #[serde(default)]
    pub trap: bool,
    #[serde(default)]
    pub filler: bool,
}

fn default_count() -> u32 {
    1
}

impl ItemRecord {
    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|c| c == category)
    }

    pub fn classification(&self) -> Classification {
        if self.trap {
            Classification::Trap
        } else if self.progression {
            Classification::Progression
        } else if self.useful {
            Classification::Useful
        } else {
            Classification::Filler
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub requires: Option<String>,
}

impl LocationRecord {
    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|c| c == category)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionRecord {
    pub name: String,
    #[serde(default)]
    pub connects_to: Vec<String>,
    #[serde(default)]
    pub starting: bool,
    #[serde(default)]
    pub chapter: Option<u32>,
    #[serde(default)]
    pub adventure_pack: bool,
}

/// The four catalog tables describing the game, loaded once per run and
/// treated as read-only from then on. Exclusion decisions live in the
/// per-run plan, never in these records.
#[derive(Debug, Clone)]
pub struct GameData {
    pub game: GameTable,
    pub items: Vec<ItemRecord>,
    pub locations: Vec<LocationRecord>,
    pub regions: Vec<RegionRecord>,
}

impl GameData {
    /// Tables compiled into the binary, used when no data directory is given.
    pub fn bundled() -> Result<GameData> {
        GameData::from_json(
            include_str!("../data/game.json"),
            include_str!("../data/items.json"),
            include_str!("../data/locations.json"),
            include_str!("../data/regions.json"),
        )
    }

    pub fn load(dir: &Path) -> Result<GameData> {
        let read = |file: &str| -> Result<String> {
            fs::read_to_string(dir.join(file)).map_err(GeneratorError::from)
        };
        GameData::from_json(
            &read("game.json")?,
            &read("items.json")?,
            &read("locations.json")?,
            &read("regions.json")?,
        )
    }

    pub fn from_json(game: &str, items: &str, locations: &str, regions: &str) -> Result<GameData> {
        let data = GameData {
            game: serde_json::from_str(game)?,
            items: serde_json::from_str(items)?,
            locations: serde_json::from_str(locations)?,
            regions: serde_json::from_str(regions)?,
        };
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<()> {
        for location in &self.locations {
            if !self.regions.iter().any(|r| r.name == location.region) {
                return Err(GeneratorError::Config(format!(
                    "location \"{}\" references unknown region \"{}\"",
                    location.name, location.region
                )));
            }
        }
        for region in &self.regions {
            for target in &region.connects_to {
                if !self.regions.iter().any(|r| r.name == *target) {
                    return Err(GeneratorError::Config(format!(
                        "region \"{}\" connects to unknown region \"{}\"",
                        region.name, target
                    )));
                }
            }
        }
        // Every chapter access item doubles as the name of that chapter's
        // completion location; a mismatch here would strand the chapter.
        for item in &self.items {
            if item.has_category("Chapter")
                && !self.locations.iter().any(|l| l.name == item.name)
            {
                return Err(GeneratorError::Config(format!(
                    "chapter item \"{}\" has no matching location",
                    item.name
                )));
            }
        }
        if self.regions.iter().filter(|r| r.starting).count() != 1 {
            return Err(GeneratorError::Config(
                "region table must declare exactly one starting region".to_string(),
            ));
        }
        if !self
            .items
            .iter()
            .any(|i| i.filler && i.name == self.game.filler_item_name)
        {
            return Err(GeneratorError::Config(format!(
                "filler item \"{}\" is not a filler entry in the item table",
                self.game.filler_item_name
            )));
        }
        Ok(())
    }

    pub fn item(&self, name: &str) -> Result<&ItemRecord> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| GeneratorError::ItemNotFound(name.to_string()))
    }

    /// Item factory: classification comes from the catalog record.
    pub fn create_item(&self, name: &str) -> Result<Item> {
        let record = self.item(name)?;
        Ok(Item {
            name: record.name.clone(),
            classification: record.classification(),
        })
    }

    pub fn trap_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.trap)
            .map(|i| i.name.as_str())
            .collect()
    }

    pub fn filler_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.filler)
            .map(|i| i.name.as_str())
            .collect()
    }
}
