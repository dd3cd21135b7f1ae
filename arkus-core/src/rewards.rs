use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::world::{Classification, Item, World};
use crate::{GeneratorError, GeneratorSettings, Result, FRAGMENT_ITEM};

/// Hub mode only: demote the fragments beyond the completion requirement
/// to useful, then lock one fragment onto every remaining chapter
/// completion location so fragments are always earned by finishing
/// chapters.
pub fn place(
    world: &mut World,
    settings: &GeneratorSettings,
    pool: &mut Vec<Item>,
    rng: &mut StdRng,
) -> Result<()> {
    if settings.linear_mode {
        return Ok(());
    }

    let required = total_required_fragments(settings) as usize;
    let mut fragment_slots: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, item)| item.name == FRAGMENT_ITEM)
        .map(|(index, _)| index)
        .collect();
    if !fragment_slots.is_empty() {
        let keep = required.clamp(1, fragment_slots.len());
        let bonus = fragment_slots.len() - keep;
        fragment_slots.shuffle(rng);
        for &slot in fragment_slots.iter().take(bonus) {
            pool[slot].classification = Classification::Useful;
        }
    }

    let completions: Vec<String> = world
        .locations()
        .filter(|l| l.has_category("Level Completion"))
        .map(|l| l.name.clone())
        .collect();
    for name in completions {
        let index = pool
            .iter()
            .position(|i| i.name == FRAGMENT_ITEM)
            .ok_or_else(|| GeneratorError::ItemNotFound(FRAGMENT_ITEM.to_string()))?;
        let fragment = pool.remove(index);
        world.place_locked_item(&name, fragment)?;
    }
    Ok(())
}

pub(crate) fn total_required_fragments(settings: &GeneratorSettings) -> u32 {
    (16 + settings.extra_chapter_count())
        .min(settings.chapters_in_pool)
        .min(settings.chapters_to_beat)
}
