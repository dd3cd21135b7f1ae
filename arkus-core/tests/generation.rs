use arkus_core::{
    generate, GameData, GeneratorError, GeneratorSettings, FINAL_BOSS_REGION, FRAGMENT_ITEM,
    HUB_REGION, START_REGION, VICTORY_ITEM, VICTORY_LOCATION,
};

fn settings(seed: u64) -> GeneratorSettings {
    GeneratorSettings {
        seed,
        ..GeneratorSettings::default()
    }
}

fn data() -> GameData {
    GameData::bundled().unwrap()
}

/// Follow the single exit out of each region from the start until the
/// final boss, returning the regions passed through.
fn walk_chain(world: &arkus_core::World) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = START_REGION.to_string();
    while current != FINAL_BOSS_REGION {
        let exits = world.connections_from(&current);
        assert_eq!(exits.len(), 1, "{current} should have exactly one exit");
        current = exits[0].target.clone();
        path.push(current.clone());
        assert!(path.len() < 64, "chain does not terminate");
    }
    path.pop();
    path
}

#[test]
fn pool_balances_against_locations_across_the_option_matrix() {
    let data = data();
    for linear_mode in [false, true] {
        for chapters_in_pool in [10, 16, 20] {
            for packs in [false, true] {
                for filler_traps in [0, 35] {
                    let config = GeneratorSettings {
                        linear_mode,
                        chapters_in_pool,
                        include_empire: packs,
                        include_ship: packs,
                        include_crypt: packs,
                        include_peak: packs,
                        filler_traps,
                        ..settings(0xA001)
                    };
                    let generation = generate(&config, &data).unwrap();
                    assert_eq!(
                        generation.pool.len(),
                        generation.world.unfilled_locations().len(),
                        "imbalance at linear={linear_mode} cap={chapters_in_pool} \
                         packs={packs} traps={filler_traps}"
                    );
                }
            }
        }
    }
}

#[test]
fn whitelist_smaller_than_eight_is_fatal() {
    let config = GeneratorSettings {
        whitelist_characters: true,
        characters_to_exclude: vec![
            "Spyro".to_string(),
            "Eruptor".to_string(),
            "Chill".to_string(),
        ],
        ..settings(3)
    };
    let result = generate(&config, &data());
    assert!(matches!(result, Err(GeneratorError::Config(_))));
}

#[test]
fn whitelist_of_eight_generates_cleanly() {
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
    let config = GeneratorSettings {
        whitelist_characters: true,
        characters_to_exclude: names.iter().map(|n| n.to_string()).collect(),
        ..settings(3)
    };
    let generation = generate(&config, &data()).unwrap();
    assert_eq!(
        generation.pool.len(),
        generation.world.unfilled_locations().len()
    );
}

#[test]
fn linear_generation_leaves_one_chain_and_no_hub() {
    let config = GeneratorSettings {
        linear_mode: true,
        chapters_in_pool: 12,
        ..settings(0xB002)
    };
    let generation = generate(&config, &data()).unwrap();
    let world = &generation.world;

    assert!(!world.contains_region(HUB_REGION));
    assert!(!world.contains_region("Chapter 13"));

    let chain = walk_chain(world);
    assert_eq!(chain.len(), 12);
    assert_eq!(chain.first().map(String::as_str), Some("Chapter 1"));
    assert_eq!(chain.last().map(String::as_str), Some("Chapter 12"));
}

#[test]
fn hub_generation_keeps_spokes_for_every_surviving_chapter() {
    let config = GeneratorSettings {
        chapters_in_pool: 12,
        ..settings(0xC003)
    };
    let generation = generate(&config, &data()).unwrap();
    let world = &generation.world;

    let chapters: Vec<&str> = world
        .regions()
        .iter()
        .filter(|r| r.is_chapter())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(chapters.len(), 12);
    assert_eq!(generation.plan.excluded_chapters.len(), 4);
    for chapter in &chapters {
        assert!(world.has_connection(HUB_REGION, chapter));
        assert!(world.has_connection(chapter, FINAL_BOSS_REGION));
    }
    for excluded in &generation.plan.excluded_chapters {
        assert!(!world.contains_region(excluded));
    }
}

#[test]
fn victory_event_is_locked_and_off_the_books() {
    let generation = generate(&settings(9), &data()).unwrap();
    let victory = generation.world.location(VICTORY_LOCATION).unwrap();
    assert_eq!(
        victory.locked_item.as_ref().map(|i| i.name.as_str()),
        Some(VICTORY_ITEM)
    );
    assert!(generation
        .world
        .unfilled_locations()
        .iter()
        .all(|l| l.name != VICTORY_LOCATION));
}

#[test]
fn fragments_survive_reward_placement_exactly_once() {
    let config = GeneratorSettings {
        chapters_in_pool: 14,
        chapters_to_beat: 9,
        ..settings(0xD004)
    };
    let generation = generate(&config, &data()).unwrap();

    let locked = generation
        .world
        .locations()
        .filter(|l| {
            l.locked_item
                .as_ref()
                .map(|i| i.name == FRAGMENT_ITEM)
                .unwrap_or(false)
        })
        .count();
    let pooled = generation
        .pool
        .iter()
        .filter(|i| i.name == FRAGMENT_ITEM)
        .count();
    assert_eq!(locked + pooled, 14);
    assert_eq!(pooled, 0);
}

#[test]
fn completion_rules_and_victory_rule_are_recorded() {
    let generation = generate(&settings(21), &data()).unwrap();
    let completion = generation.world.location("Rumbletown").unwrap();
    assert_eq!(completion.requires.as_deref(), Some("|Rumbletown|"));
    let victory = generation.world.location(VICTORY_LOCATION).unwrap();
    assert_eq!(
        victory.requires.as_deref(),
        Some("|Map of Arkus Fragment:16|")
    );

    let linear = GeneratorSettings {
        linear_mode: true,
        ..settings(21)
    };
    let generation = generate(&linear, &data()).unwrap();
    let second = generation.world.location("Junkyard Isles").unwrap();
    assert_eq!(second.requires.as_deref(), Some("|Progressive Chapter:1|"));
    let victory = generation.world.location(VICTORY_LOCATION).unwrap();
    assert_eq!(
        victory.requires.as_deref(),
        Some("|Progressive Chapter:15|")
    );
}

#[test]
fn same_seed_reproduces_the_same_generation() {
    let config = GeneratorSettings {
        chapters_in_pool: 13,
        filler_traps: 40,
        trap_weights: [("sheep_stampede_weight".to_string(), 3u32)]
            .into_iter()
            .collect(),
        ..settings(0xE005)
    };
    let data = data();
    let first = generate(&config, &data).unwrap();
    let second = generate(&config, &data).unwrap();

    let names = |generation: &arkus_core::Generation| -> Vec<String> {
        generation.pool.iter().map(|i| i.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(
        serde_json::to_value(&first.slot_data).unwrap(),
        serde_json::to_value(&second.slot_data).unwrap()
    );
    assert_eq!(
        first.plan.excluded_chapters,
        second.plan.excluded_chapters
    );
}

#[test]
fn slot_data_reflects_the_generated_world() {
    let config = GeneratorSettings {
        include_empire: true,
        ..settings(31)
    };
    let generation = generate(&config, &data()).unwrap();
    let slot = &generation.slot_data;

    assert_eq!(slot.game, "Skylanders Giants");
    assert_eq!(slot.total_chapters, 17);
    assert_eq!(slot.required_fragments, Some(16));
    assert!(slot
        .included_chapters
        .contains(&"Empire of Ice".to_string()));
    assert_eq!(
        slot.starting_characters,
        vec!["Tree Rex".to_string(), "Cynder".to_string()]
    );
}
