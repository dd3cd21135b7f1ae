use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub mod data;
mod pool;
mod rewards;
mod topology;
pub mod world;

pub use data::GameData;
pub use world::{Classification, Connection, Item, Location, Region, World};

pub const START_REGION: &str = "Manual";
pub const HUB_REGION: &str = "Hub";
pub const FINAL_BOSS_REGION: &str = "Final Boss";
pub const VICTORY_LOCATION: &str = "Defeat Kaos";
pub const VICTORY_ITEM: &str = "Victory";
pub const FRAGMENT_ITEM: &str = "Map of Arkus Fragment";
pub const PROGRESSIVE_CHAPTER_ITEM: &str = "Progressive Chapter";

/// The four optional adventure-pack chapters, in the order they join a
/// linear chain.
pub const ADVENTURE_PACKS: [&str; 4] = [
    "Empire of Ice",
    "Pirate Seas",
    "Darklight Crypt",
    "Dragon's Peak",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub seed: u64,
    pub player_name: String,
    /// One chapter after another instead of a hub with spokes.
    pub linear_mode: bool,
    /// Cap on how many chapters end up in the game, 1..=20.
    pub chapters_in_pool: u32,
    /// How many chapters must be completed before the final boss opens.
    pub chapters_to_beat: u32,
    pub include_empire: bool,
    pub include_ship: bool,
    pub include_crypt: bool,
    pub include_peak: bool,
    pub characters_to_exclude: Vec<String>,
    /// Treat the exclusion list as the set of characters to keep.
    pub whitelist_characters: bool,
    pub challenges_as_locations: bool,
    /// Percentage of top-up items that are traps, 0..=100.
    pub filler_traps: u32,
    /// Weight options keyed `<trap_name>_weight` (case-folded, spaces as
    /// underscores). A missing key counts as weight zero.
    pub trap_weights: HashMap<String, u32>,
    pub output_path: PathBuf,
    pub data_path: Option<PathBuf>,
}

impl Default for GeneratorSettings {
    fn default() -> GeneratorSettings {
        GeneratorSettings {
            seed: 0,
            player_name: "Player".to_string(),
            linear_mode: false,
            chapters_in_pool: 20,
            chapters_to_beat: 16,
            include_empire: false,
            include_ship: false,
            include_crypt: false,
            include_peak: false,
            characters_to_exclude: Vec::new(),
            whitelist_characters: false,
            challenges_as_locations: true,
            filler_traps: 0,
            trap_weights: HashMap::new(),
            output_path: PathBuf::from("output"),
            data_path: None,
        }
    }
}

impl GeneratorSettings {
    pub fn pack_enabled(&self, name: &str) -> bool {
        match name {
            "Empire of Ice" => self.include_empire,
            "Pirate Seas" => self.include_ship,
            "Darklight Crypt" => self.include_crypt,
            "Dragon's Peak" => self.include_peak,
            _ => true,
        }
    }

    pub fn extra_chapter_count(&self) -> u32 {
        [
            self.include_empire,
            self.include_ship,
            self.include_crypt,
            self.include_peak,
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count() as u32
    }

    pub fn total_chapters(&self) -> u32 {
        (16 + self.extra_chapter_count()).min(self.chapters_in_pool)
    }

    /// Story chapters surviving the cap in linear mode; Chapter 1 always
    /// stays so the chain has somewhere to start.
    pub fn story_chapters_kept(&self) -> u32 {
        self.total_chapters()
            .saturating_sub(self.extra_chapter_count())
            .max(1)
    }

    pub fn trap_weight(&self, trap_name: &str) -> u32 {
        let key = format!("{}_weight", trap_name.to_lowercase().replace(' ', "_"));
        self.trap_weights.get(&key).copied().unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("data table error: {0}")]
    Data(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("location not found: {0}")]
    LocationNotFound(String),
    #[error("region not found: {0}")]
    RegionNotFound(String),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Exclusion decisions accumulated across the pipeline stages; the
/// catalog records themselves stay untouched.
#[derive(Debug, Default, Clone)]
pub struct ExclusionPlan {
    pub excluded_chapters: Vec<String>,
    pub removed_locations: Vec<String>,
    pub removed_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotData {
    pub game: String,
    pub player: String,
    pub seed: u64,
    pub linear_mode: bool,
    pub total_chapters: u32,
    pub required_fragments: Option<u32>,
    pub included_chapters: Vec<String>,
    pub starting_characters: Vec<String>,
}

pub struct Generation {
    pub world: World,
    pub pool: Vec<Item>,
    pub plan: ExclusionPlan,
    pub slot_data: SlotData,
}

/// Run the whole per-slot pipeline in its fixed order: build regions,
/// adjust topology, assemble and top up the pool, assign rules, commit
/// region removals, place rewards, lock the victory event, and check the
/// pool/location balance.
pub fn generate(settings: &GeneratorSettings, data: &GameData) -> Result<Generation> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut plan = ExclusionPlan::default();

    let mut world = World::build(data, settings)?;
    info!(
        "built {} regions for {}",
        world.regions().len(),
        settings.player_name
    );

    topology::adjust(&mut world, settings)?;

    let mut pool = pool::assemble(&mut world, data, settings, &mut plan, &mut rng)?;
    pool::top_up(&world, data, settings, &mut pool, &mut plan, &mut rng)?;
    info!(
        "pool holds {} items after quota and top-up for {}",
        pool.len(),
        settings.player_name
    );

    set_rules(&mut world, settings)?;

    // Regions may only disappear once their rules have been assigned.
    let removed = world.commit_removals();
    if removed > 0 {
        info!("dropped {removed} regions at the removal checkpoint");
    }

    rewards::place(&mut world, settings, &mut pool, &mut rng)?;

    let victory = data.create_item(VICTORY_ITEM)?;
    world.place_locked_item(VICTORY_LOCATION, victory)?;

    let unfilled = world.unfilled_locations().len();
    if pool.len() != unfilled {
        return Err(GeneratorError::Config(format!(
            "item pool holds {} items for {} unfilled locations; \
             adjust the chapter or character options",
            pool.len(),
            unfilled
        )));
    }

    let slot_data = build_slot_data(&world, data, settings);
    Ok(Generation {
        world,
        pool,
        plan,
        slot_data,
    })
}

/// Attach access-rule strings to locations. Rules are recorded for the
/// client, never evaluated here.
fn set_rules(world: &mut World, settings: &GeneratorSettings) -> Result<()> {
    let mut rules: Vec<(String, String)> = Vec::new();

    if settings.linear_mode {
        let chain = linear_chain_completions(world, settings);
        for (index, completion) in chain.iter().enumerate() {
            if index > 0 {
                rules.push((
                    completion.clone(),
                    format!("|{PROGRESSIVE_CHAPTER_ITEM}:{index}|"),
                ));
            }
        }
        rules.push((
            VICTORY_LOCATION.to_string(),
            format!(
                "|{PROGRESSIVE_CHAPTER_ITEM}:{}|",
                chain.len().saturating_sub(1)
            ),
        ));
    } else {
        let completions: Vec<String> = world
            .locations()
            .filter(|l| l.has_category("Level Completion"))
            .map(|l| l.name.clone())
            .collect();
        for completion in completions {
            // The access item shares the completion location's name.
            rules.push((completion.clone(), format!("|{completion}|")));
        }
        rules.push((
            VICTORY_LOCATION.to_string(),
            format!(
                "|{FRAGMENT_ITEM}:{}|",
                rewards::total_required_fragments(settings)
            ),
        ));
    }

    for (location, requires) in rules {
        world.get_location_mut(&location)?.requires = Some(requires);
    }
    Ok(())
}

/// Completion-location names along the linear chain, in chain order.
/// Chapters cut by the cap have no locations left and drop out here.
fn linear_chain_completions(world: &World, settings: &GeneratorSettings) -> Vec<String> {
    let mut story: Vec<(u32, &Region)> = world
        .regions()
        .iter()
        .filter_map(|r| r.chapter.map(|n| (n, r)))
        .filter(|(n, _)| *n <= settings.story_chapters_kept())
        .collect();
    story.sort_by_key(|(n, _)| *n);

    let mut regions: Vec<&Region> = story.into_iter().map(|(_, r)| r).collect();
    for pack in ADVENTURE_PACKS {
        if let Some(region) = world.region(pack) {
            regions.push(region);
        }
    }

    regions
        .into_iter()
        .filter_map(|region| {
            region
                .locations
                .iter()
                .find(|l| l.has_category("Level Completion"))
                .map(|l| l.name.clone())
        })
        .collect()
}

fn build_slot_data(
    world: &World,
    data: &GameData,
    settings: &GeneratorSettings,
) -> SlotData {
    let included_chapters: Vec<String> = world
        .regions()
        .iter()
        .filter(|r| r.is_chapter())
        .map(|r| r.name.clone())
        .collect();
    SlotData {
        game: data.game.game.clone(),
        player: settings.player_name.clone(),
        seed: settings.seed,
        linear_mode: settings.linear_mode,
        total_chapters: included_chapters.len() as u32,
        required_fragments: (!settings.linear_mode)
            .then(|| rewards::total_required_fragments(settings)),
        included_chapters,
        starting_characters: data.game.starting_characters.clone(),
    }
}

/// Load the catalog, generate, and write the per-seed output files.
pub fn run(settings: GeneratorSettings) -> Result<()> {
    let data = match &settings.data_path {
        Some(dir) => {
            if !dir.exists() {
                return Err(GeneratorError::Config(format!(
                    "Data path does not exist: {}",
                    dir.display()
                )));
            }
            GameData::load(dir)?
        }
        None => GameData::bundled()?,
    };

    if !settings.output_path.exists() {
        fs::create_dir_all(&settings.output_path)?;
    }
    // Outputs for a given run go into a per-seed subfolder so repeated
    // runs do not collide.
    let out_root = settings.output_path.join(format!("Arkus_{}", settings.seed));
    if !out_root.exists() {
        fs::create_dir_all(&out_root)?;
    }

    let generation = generate(&settings, &data)?;

    let slot_path = out_root.join("slot_data.json");
    fs::write(&slot_path, serde_json::to_string_pretty(&generation.slot_data)?)?;

    let spoiler_path = out_root.join("spoiler.log");
    fs::write(&spoiler_path, spoiler_text(&generation, &settings))?;

    info!(
        "wrote {} and {}",
        slot_path.display(),
        spoiler_path.display()
    );
    Ok(())
}

fn spoiler_text(generation: &Generation, settings: &GeneratorSettings) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "Arkus Randomiser seed {}", settings.seed);
    let _ = writeln!(out, "Player: {}", settings.player_name);
    let _ = writeln!(
        out,
        "Mode: {}",
        if settings.linear_mode { "linear" } else { "hub" }
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Topology:");
    for connection in generation.world.connections() {
        let _ = writeln!(out, "  {} -> {}", connection.source, connection.target);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Locked placements:");
    for location in generation.world.locations() {
        if let Some(item) = &location.locked_item {
            let _ = writeln!(out, "  {}: {}", location.name, item.name);
        }
    }
    let _ = writeln!(out);

    if !generation.plan.excluded_chapters.is_empty() {
        let _ = writeln!(out, "Excluded chapters:");
        for chapter in &generation.plan.excluded_chapters {
            let _ = writeln!(out, "  {chapter}");
        }
        let _ = writeln!(out);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &generation.pool {
        *counts.entry(item.name.as_str()).or_default() += 1;
    }
    let _ = writeln!(out, "Item pool ({} items):", generation.pool.len());
    for (name, count) in counts {
        let _ = writeln!(out, "  {count}x {name}");
    }
    out
}
