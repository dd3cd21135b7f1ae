use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::GameData;
use crate::world::{Item, World};
use crate::{
    ExclusionPlan, GeneratorError, GeneratorSettings, Result, FRAGMENT_ITEM,
    PROGRESSIVE_CHAPTER_ITEM,
};

/// Build the player's item pool from the catalog and apply every
/// option-driven removal: chapter quota, character list, challenge
/// locations. Decisions are recorded on the plan so later stages see them
/// without touching the catalog records.
pub fn assemble(
    world: &mut World,
    data: &GameData,
    settings: &GeneratorSettings,
    plan: &mut ExclusionPlan,
    rng: &mut StdRng,
) -> Result<Vec<Item>> {
    if settings.whitelist_characters && settings.characters_to_exclude.len() < 8 {
        return Err(GeneratorError::Config(
            "character whitelist needs at least 8 Skylanders, with at least one from \
             each element and at least one Giant"
                .to_string(),
        ));
    }

    let mut pool = base_pool(world, data, settings)?;

    if settings.linear_mode {
        trim_linear_chapters(world, settings, plan, &mut pool)?;
    } else {
        trim_hub_chapters(world, data, settings, plan, &mut pool, rng)?;
    }

    filter_characters(world, data, settings, plan, &mut pool)?;

    Ok(pool)
}

fn base_pool(
    world: &World,
    data: &GameData,
    settings: &GeneratorSettings,
) -> Result<Vec<Item>> {
    let mut pool = Vec::new();
    for record in &data.items {
        if record.count == 0 {
            continue;
        }
        // Chapter advances drive the linear chain; per-chapter access items
        // and map fragments only exist in hub mode.
        if record.has_category("Chapter Advance") && !settings.linear_mode {
            continue;
        }
        if (record.has_category("Chapter") || record.has_category("Fragment"))
            && settings.linear_mode
        {
            continue;
        }
        // An access item without a chapter in the world belongs to a
        // disabled adventure pack.
        if record.has_category("Chapter") && world.location(&record.name).is_none() {
            continue;
        }
        if record.has_category("Skylander")
            && data.game.starting_characters.contains(&record.name)
        {
            continue;
        }
        for _ in 0..record.count {
            pool.push(data.create_item(&record.name)?);
        }
    }
    Ok(pool)
}

/// Linear quota: keep one chapter advance per chain step past the first,
/// and strip the locations of story chapters cut by the cap. The regions
/// themselves go at the removal checkpoint.
fn trim_linear_chapters(
    world: &mut World,
    settings: &GeneratorSettings,
    plan: &mut ExclusionPlan,
    pool: &mut Vec<Item>,
) -> Result<()> {
    let story_kept = settings.story_chapters_kept();
    let advances_needed =
        (story_kept + settings.extra_chapter_count()).saturating_sub(1) as usize;
    let advances_in_pool = pool
        .iter()
        .filter(|i| i.name == PROGRESSIVE_CHAPTER_ITEM)
        .count();
    for _ in advances_needed..advances_in_pool {
        remove_item(pool, PROGRESSIVE_CHAPTER_ITEM, plan)?;
    }

    let excess: Vec<String> = world
        .regions()
        .iter()
        .filter(|r| matches!(r.chapter, Some(n) if n > story_kept))
        .map(|r| r.name.clone())
        .collect();
    for region in excess {
        for name in world.strip_region_locations(&region) {
            plan.removed_locations.push(name);
        }
        world.mark_for_removal(&region);
        plan.excluded_chapters.push(region);
    }
    Ok(())
}

/// Hub quota: draw the chapters to exclude at random from whatever is
/// enabled, then pull the access item and one fragment per excluded
/// chapter and empty the owning region.
fn trim_hub_chapters(
    world: &mut World,
    data: &GameData,
    settings: &GeneratorSettings,
    plan: &mut ExclusionPlan,
    pool: &mut Vec<Item>,
    rng: &mut StdRng,
) -> Result<()> {
    let mut enabled: Vec<String> = data
        .items
        .iter()
        .filter(|i| i.has_category("Chapter"))
        .filter(|i| world.location(&i.name).is_some())
        .map(|i| i.name.clone())
        .collect();
    let to_exclude = enabled.len().saturating_sub(settings.total_chapters() as usize);

    enabled.shuffle(rng);
    for name in enabled.into_iter().take(to_exclude) {
        let region = world
            .location(&name)
            .map(|l| l.region.clone())
            .ok_or_else(|| GeneratorError::LocationNotFound(name.clone()))?;
        remove_item(pool, &name, plan)?;
        remove_item(pool, FRAGMENT_ITEM, plan)?;
        for location in world.strip_region_locations(&region) {
            plan.removed_locations.push(location);
        }
        world.detach(&region);
        world.mark_for_removal(&region);
        plan.excluded_chapters.push(region);
    }
    Ok(())
}

/// Whitelist mode keeps only listed characters; blacklist mode drops only
/// listed ones. Starting characters are never in the pool and never
/// filtered. Dropped characters take their heroic challenge location with
/// them.
fn filter_characters(
    world: &mut World,
    data: &GameData,
    settings: &GeneratorSettings,
    plan: &mut ExclusionPlan,
    pool: &mut Vec<Item>,
) -> Result<()> {
    for record in data.items.iter().filter(|i| i.has_category("Skylander")) {
        if data.game.starting_characters.contains(&record.name) {
            continue;
        }
        let listed = settings
            .characters_to_exclude
            .iter()
            .any(|n| n == &record.name);
        if settings.whitelist_characters ^ listed {
            remove_item(pool, &record.name, plan)?;
            if settings.challenges_as_locations {
                let challenge = format!("Heroic Challenge - {}", record.name);
                if world.remove_location(&challenge) {
                    plan.removed_locations.push(challenge);
                }
            }
        }
    }
    Ok(())
}

/// Fill the gap between pool size and unfilled locations with traps and
/// filler. Trap draws are weighted per trap by its weight option; filler
/// draws are uniform.
pub fn top_up(
    world: &World,
    data: &GameData,
    settings: &GeneratorSettings,
    pool: &mut Vec<Item>,
    plan: &mut ExclusionPlan,
    rng: &mut StdRng,
) -> Result<()> {
    if !settings.linear_mode {
        // Fragments belonging to disabled adventure packs never had a
        // chapter to be placed behind.
        for _ in settings.extra_chapter_count()..4 {
            remove_item(pool, FRAGMENT_ITEM, plan)?;
        }
    }

    let unfilled = world.unfilled_locations().len();
    if pool.len() >= unfilled {
        return Ok(());
    }
    let extras = unfilled - pool.len();

    let traps = data.trap_names();
    let filler = data.filler_names();
    let trap_percent = if traps.is_empty() {
        0
    } else {
        settings.filler_traps.min(100) as usize
    };
    let (trap_count, filler_count) = split_extras(extras, trap_percent);

    if trap_count > 0 {
        let mut weighted: Vec<(&str, u32)> = traps
            .iter()
            .map(|name| (*name, settings.trap_weight(name)))
            .collect();
        if weighted.iter().map(|(_, w)| *w).sum::<u32>() == 0 {
            if let Some(last) = weighted.last_mut() {
                warn!(
                    "{} set every trap weight to zero; falling back to {}",
                    settings.player_name, last.0
                );
                last.1 = 1;
            }
        }
        for _ in 0..trap_count {
            let (name, _) = weighted
                .choose_weighted(rng, |entry| entry.1)
                .map_err(|e| GeneratorError::Config(format!("trap selection failed: {e}")))?;
            pool.push(data.create_item(name)?);
        }
    }

    for _ in 0..filler_count {
        let name = filler.choose(rng).ok_or_else(|| {
            GeneratorError::Config("item table declares no filler items".to_string())
        })?;
        pool.push(data.create_item(name)?);
    }
    Ok(())
}

pub(crate) fn split_extras(extras: usize, trap_percent: usize) -> (usize, usize) {
    let trap_count = extras * trap_percent / 100;
    (trap_count, extras - trap_count)
}

fn remove_item(pool: &mut Vec<Item>, name: &str, plan: &mut ExclusionPlan) -> Result<()> {
    let index = pool
        .iter()
        .position(|i| i.name == name)
        .ok_or_else(|| GeneratorError::ItemNotFound(name.to_string()))?;
    pool.remove(index);
    plan.removed_items.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{assemble, split_extras, top_up};
    use crate::data::GameData;
    use crate::world::World;
    use crate::{ExclusionPlan, GeneratorError, GeneratorSettings};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn assembled(settings: &GeneratorSettings) -> (World, Vec<crate::world::Item>) {
        let data = GameData::bundled().unwrap();
        let mut world = World::build(&data, settings).unwrap();
        crate::topology::adjust(&mut world, settings).unwrap();
        let mut plan = ExclusionPlan::default();
        let pool = assemble(&mut world, &data, settings, &mut plan, &mut rng()).unwrap();
        (world, pool)
    }

    #[test]
    fn whitelist_below_eight_aborts() {
        let data = GameData::bundled().unwrap();
        let settings = GeneratorSettings {
            whitelist_characters: true,
            characters_to_exclude: vec!["Spyro".to_string(); 7],
            ..GeneratorSettings::default()
        };
        let mut world = World::build(&data, &settings).unwrap();
        let mut plan = ExclusionPlan::default();
        let result = assemble(&mut world, &data, &settings, &mut plan, &mut rng());
        assert!(matches!(result, Err(GeneratorError::Config(_))));
    }

    #[test]
    fn whitelist_of_eight_keeps_only_listed_characters() {
        let names = [
            "Spyro",
            "Eruptor",
            "Gill Grunt",
            "Jet-Vac",
            "Terrafin",
            "Stealth Elf",
            "Chop Chop",
            "Bouncer",
        ];
        let settings = GeneratorSettings {
            whitelist_characters: true,
            characters_to_exclude: names.iter().map(|n| n.to_string()).collect(),
            ..GeneratorSettings::default()
        };
        let (world, pool) = assembled(&settings);

        for name in names {
            assert!(pool.iter().any(|i| i.name == name), "{name} missing");
        }
        // Pop Fizz is not listed, so whitelist mode drops him and his
        // heroic challenge.
        assert!(!pool.iter().any(|i| i.name == "Pop Fizz"));
        assert!(world.location("Heroic Challenge - Pop Fizz").is_none());
        assert!(world.location("Heroic Challenge - Spyro").is_some());
    }

    #[test]
    fn blacklist_drops_only_listed_characters() {
        let settings = GeneratorSettings {
            characters_to_exclude: vec!["Drobot".to_string(), "Chill".to_string()],
            ..GeneratorSettings::default()
        };
        let (_, pool) = assembled(&settings);
        assert!(!pool.iter().any(|i| i.name == "Drobot"));
        assert!(!pool.iter().any(|i| i.name == "Chill"));
        assert!(pool.iter().any(|i| i.name == "Spyro"));
    }

    #[test]
    fn starting_characters_stay_out_of_the_pool() {
        let (_, pool) = assembled(&GeneratorSettings::default());
        assert!(!pool.iter().any(|i| i.name == "Tree Rex"));
        assert!(!pool.iter().any(|i| i.name == "Cynder"));
    }

    #[test]
    fn linear_quota_trims_chapter_advances() {
        let settings = GeneratorSettings {
            linear_mode: true,
            chapters_in_pool: 10,
            ..GeneratorSettings::default()
        };
        let (world, pool) = assembled(&settings);
        let advances = pool
            .iter()
            .filter(|i| i.name == "Progressive Chapter")
            .count();
        assert_eq!(advances, 9);
        assert!(world.get_region("Chapter 11").unwrap().locations.is_empty());
        assert!(!world.get_region("Chapter 10").unwrap().locations.is_empty());
    }

    #[test]
    fn hub_quota_excludes_random_chapters_with_their_fragments() {
        let settings = GeneratorSettings {
            chapters_in_pool: 12,
            ..GeneratorSettings::default()
        };
        let (world, pool) = assembled(&settings);

        let data = GameData::bundled().unwrap();
        let access = pool
            .iter()
            .filter(|i| {
                data.item(&i.name)
                    .map(|r| r.has_category("Chapter"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(access, 12);
        let emptied = world
            .regions()
            .iter()
            .filter(|r| r.is_chapter() && r.locations.is_empty())
            .count();
        assert_eq!(emptied, 4);
        assert_eq!(world.pending_removal().len(), 4);
    }

    #[test]
    fn split_covers_every_percentage_exactly() {
        for extras in 0..=60usize {
            for percent in [0usize, 1, 25, 50, 99, 100] {
                let (traps, filler) = split_extras(extras, percent);
                assert_eq!(traps + filler, extras);
                assert!(traps <= extras);
            }
        }
    }

    #[test]
    fn zero_trap_weights_fall_back_to_the_last_trap() {
        let settings = GeneratorSettings {
            filler_traps: 100,
            ..GeneratorSettings::default()
        };
        let data = GameData::bundled().unwrap();
        let mut world = World::build(&data, &settings).unwrap();
        crate::topology::adjust(&mut world, &settings).unwrap();
        let mut plan = ExclusionPlan::default();
        let mut r = rng();
        let mut pool = assemble(&mut world, &data, &settings, &mut plan, &mut r).unwrap();

        top_up(&world, &data, &settings, &mut pool, &mut plan, &mut r).unwrap();
        // With every weight at zero, all draws land on the final trap.
        assert!(pool.iter().any(|i| i.name == "Arkeyan Ambush"));
        assert!(!pool.iter().any(|i| i.name == "Chompy Swarm"));
        assert_eq!(pool.len(), world.unfilled_locations().len());
    }

    #[test]
    fn top_up_balances_pool_against_unfilled_locations() {
        let settings = GeneratorSettings {
            filler_traps: 30,
            trap_weights: [("chompy_swarm_weight".to_string(), 4u32)]
                .into_iter()
                .collect(),
            ..GeneratorSettings::default()
        };
        let data = GameData::bundled().unwrap();
        let mut world = World::build(&data, &settings).unwrap();
        crate::topology::adjust(&mut world, &settings).unwrap();
        let mut plan = ExclusionPlan::default();
        let mut r = rng();
        let mut pool = assemble(&mut world, &data, &settings, &mut plan, &mut r).unwrap();

        top_up(&world, &data, &settings, &mut pool, &mut plan, &mut r).unwrap();
        assert_eq!(pool.len(), world.unfilled_locations().len());
    }
}
