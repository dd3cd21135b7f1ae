use crate::data::GameData;
use crate::{GeneratorError, GeneratorSettings, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Classification {
    Progression,
    Useful,
    Filler,
    Trap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub classification: Classification,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub category: Vec<String>,
    pub requires: Option<String>,
    /// Event locations have no address on the host side and never count
    /// towards the pool/location balance.
    pub event: bool,
    pub locked_item: Option<Item>,
}

impl Location {
    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|c| c == category)
    }

    pub fn is_unfilled(&self) -> bool {
        !self.event && self.locked_item.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub chapter: Option<u32>,
    pub adventure_pack: bool,
    pub locations: Vec<Location>,
}

impl Region {
    pub fn is_chapter(&self) -> bool {
        self.chapter.is_some() || self.adventure_pack
    }
}

/// A directed edge between two named regions. Topology edits work on these
/// endpoint pairs; nothing in the crate derives connectivity from name
/// substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: String,
    pub target: String,
}

/// The one player's region graph, location set and pending structural
/// edits. Region deletion is two-phase: stages mark, and a single commit
/// checkpoint after rule assignment applies the removals.
#[derive(Debug, Clone)]
pub struct World {
    regions: Vec<Region>,
    connections: Vec<Connection>,
    pending_removal: Vec<String>,
}

impl World {
    pub fn build(data: &GameData, settings: &GeneratorSettings) -> Result<World> {
        let mut regions = Vec::new();
        for record in &data.regions {
            if record.adventure_pack && !settings.pack_enabled(&record.name) {
                continue;
            }
            let locations = data
                .locations
                .iter()
                .filter(|l| l.region == record.name)
                .filter(|l| {
                    settings.challenges_as_locations || !l.has_category("Heroic Challenge")
                })
                .map(|l| Location {
                    name: l.name.clone(),
                    region: l.region.clone(),
                    category: l.category.clone(),
                    requires: l.requires.clone(),
                    event: l.has_category("Victory"),
                    locked_item: None,
                })
                .collect();
            regions.push(Region {
                name: record.name.clone(),
                chapter: record.chapter,
                adventure_pack: record.adventure_pack,
                locations,
            });
        }

        let mut connections = Vec::new();
        for record in &data.regions {
            if !regions.iter().any(|r| r.name == record.name) {
                continue;
            }
            for target in &record.connects_to {
                if regions.iter().any(|r| r.name == *target) {
                    connections.push(Connection {
                        source: record.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(World {
            regions,
            connections,
            pending_removal: Vec::new(),
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn get_region(&self, name: &str) -> Result<&Region> {
        self.region(name)
            .ok_or_else(|| GeneratorError::RegionNotFound(name.to_string()))
    }

    pub fn contains_region(&self, name: &str) -> bool {
        self.region(name).is_some()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn has_connection(&self, source: &str, target: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.source == source && c.target == target)
    }

    pub fn connect(&mut self, source: &str, target: &str) {
        if !self.has_connection(source, target) {
            self.connections.push(Connection {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }

    pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.source == source && c.target == target));
        self.connections.len() != before
    }

    pub fn connections_from(&self, source: &str) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.source == source).collect()
    }

    pub fn connections_into(&self, target: &str) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.target == target).collect()
    }

    // Drops every edge touching the region, in either direction.
    pub fn detach(&mut self, name: &str) {
        self.connections
            .retain(|c| c.source != name && c.target != name);
    }

    pub fn mark_for_removal(&mut self, name: &str) {
        if !self.pending_removal.iter().any(|n| n == name) {
            self.pending_removal.push(name.to_string());
        }
    }

    pub fn pending_removal(&self) -> &[String] {
        &self.pending_removal
    }

    /// Apply all marked removals. Runs once, at the checkpoint after rule
    /// assignment; removing regions earlier breaks the pipeline stages
    /// that still need to see them.
    pub fn commit_removals(&mut self) -> usize {
        let names = std::mem::take(&mut self.pending_removal);
        for name in &names {
            self.detach(name);
        }
        let before = self.regions.len();
        self.regions.retain(|r| !names.iter().any(|n| n == &r.name));
        before - self.regions.len()
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.regions.iter().flat_map(|r| r.locations.iter())
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations().find(|l| l.name == name)
    }

    pub fn get_location_mut(&mut self, name: &str) -> Result<&mut Location> {
        self.regions
            .iter_mut()
            .flat_map(|r| r.locations.iter_mut())
            .find(|l| l.name == name)
            .ok_or_else(|| GeneratorError::LocationNotFound(name.to_string()))
    }

    pub fn unfilled_locations(&self) -> Vec<&Location> {
        self.locations().filter(|l| l.is_unfilled()).collect()
    }

    pub fn remove_location(&mut self, name: &str) -> bool {
        for region in &mut self.regions {
            let before = region.locations.len();
            region.locations.retain(|l| l.name != name);
            if region.locations.len() != before {
                return true;
            }
        }
        false
    }

    // Returns the removed location names.
    pub fn strip_region_locations(&mut self, region_name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        if let Some(region) = self.regions.iter_mut().find(|r| r.name == region_name) {
            removed = region.locations.iter().map(|l| l.name.clone()).collect();
            region.locations.clear();
        }
        removed
    }

    pub fn place_locked_item(&mut self, location_name: &str, item: Item) -> Result<()> {
        let location = self.get_location_mut(location_name)?;
        if location.locked_item.is_some() {
            return Err(GeneratorError::Config(format!(
                "location \"{location_name}\" already holds a locked item"
            )));
        }
        location.locked_item = Some(item);
        Ok(())
    }
}
