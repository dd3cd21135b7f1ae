use crate::world::World;
use crate::{
    GeneratorSettings, Result, ADVENTURE_PACKS, FINAL_BOSS_REGION, HUB_REGION, START_REGION,
};

/// Restructure the region graph into exactly one of the two supported
/// shapes: a single chapter chain, or a hub with one spoke per chapter.
/// All edits are edge operations on endpoint pairs.
pub fn adjust(world: &mut World, settings: &GeneratorSettings) -> Result<()> {
    if settings.linear_mode {
        linearize(world, settings)
    } else {
        open_hub(world)
    }
}

/// Linear: Manual -> Chapter 1 .. Chapter K -> included adventure packs ->
/// Final Boss. The hub drops out of the graph entirely, and story chapters
/// past the cap are cut from the chain.
fn linearize(world: &mut World, settings: &GeneratorSettings) -> Result<()> {
    let story_kept = settings.story_chapters_kept();

    world.disconnect(START_REGION, HUB_REGION);
    world.detach(HUB_REGION);
    world.mark_for_removal(HUB_REGION);

    let excess: Vec<String> = world
        .regions()
        .iter()
        .filter(|r| matches!(r.chapter, Some(n) if n > story_kept))
        .map(|r| r.name.clone())
        .collect();
    for name in &excess {
        world.detach(name);
        world.mark_for_removal(name);
    }

    let chain = linear_chain(world, story_kept);

    // Only the last chain element may lead to the boss.
    for name in chain.iter().take(chain.len().saturating_sub(1)) {
        world.disconnect(name, FINAL_BOSS_REGION);
    }
    for pair in chain.windows(2) {
        world.connect(&pair[0], &pair[1]);
    }
    if let Some(first) = chain.first() {
        world.connect(START_REGION, first);
    }
    if let Some(last) = chain.last() {
        world.connect(last, FINAL_BOSS_REGION);
    }
    Ok(())
}

/// Story chapters in numeric order, then the included adventure packs in
/// their fixed order.
fn linear_chain(world: &World, story_kept: u32) -> Vec<String> {
    let mut story: Vec<(u32, String)> = world
        .regions()
        .iter()
        .filter_map(|r| r.chapter.map(|n| (n, r.name.clone())))
        .filter(|(n, _)| *n <= story_kept)
        .collect();
    story.sort_by_key(|(n, _)| *n);

    let mut chain: Vec<String> = story.into_iter().map(|(_, name)| name).collect();
    for pack in ADVENTURE_PACKS {
        if world.contains_region(pack) {
            chain.push(pack.to_string());
        }
    }
    chain
}

/// Non-linear: Manual -> Hub, Hub -> every chapter, every chapter ->
/// Final Boss. The story chain and the direct start link are severed.
fn open_hub(world: &mut World) -> Result<()> {
    let chapter_one = world
        .regions()
        .iter()
        .find(|r| r.chapter == Some(1))
        .map(|r| r.name.clone());
    if let Some(name) = chapter_one {
        world.disconnect(START_REGION, &name);
    }

    let chapters: Vec<String> = world
        .regions()
        .iter()
        .filter(|r| r.is_chapter())
        .map(|r| r.name.clone())
        .collect();
    let chain_edges: Vec<(String, String)> = world
        .connections()
        .iter()
        .filter(|c| chapters.contains(&c.source) && chapters.contains(&c.target))
        .map(|c| (c.source.clone(), c.target.clone()))
        .collect();
    for (source, target) in chain_edges {
        world.disconnect(&source, &target);
    }
    Ok(())
}
