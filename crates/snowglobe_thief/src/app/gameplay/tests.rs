use std::fs;
use std::path::{Path, PathBuf};

use engine::content::{AssetDef, TAG_AUTOTILE, TAG_PHYSICS, TAG_TILE};
use engine::{
    compile_asset_registry, AnimationClip, AnimationError, AppPaths, AssetRegistry, FrameImage, GridPos, InputAction,
    InputSnapshot, Scene, SceneCommand, TextDraw, Tile, Tilemap, Vec2,
};
use tempfile::TempDir;

use super::player::{Player, PLAYER_SIZE};
use super::scene::{SnowglobeScene, LANDING_SHAKE};
use crate::app::bootstrap::GameConfig;

const DT: f32 = 1.0 / 60.0;

fn frames(key: &str, count: u32, width: u32, height: u32) -> Vec<FrameImage> {
    (0..count)
        .map(|index| FrameImage::new(format!("{key}/{index}"), width, height))
        .collect()
}

fn player_clip(action: &str, duration: u32) -> AssetDef {
    let (width, height, offset, adjust) = if action == "wall_slide" {
        (6, 15, Vec2::new(0.0, -2.0), Vec2::new(0.0, -1.0))
    } else {
        (8, 16, Vec2::new(-1.0, -2.0), Vec2::new(-2.0, -2.0))
    };
    let clip = AnimationClip::new(frames(&format!("player/{action}"), 2, width, height), duration, true)
        .expect("clip")
        .with_offset(offset)
        .with_size_adjust(adjust);
    AssetDef::animation(format!("player@{action}"), ["animation"], clip)
}

fn idle_clip(entity: &str, width: u32, height: u32) -> AssetDef {
    let clip = AnimationClip::new(frames(&format!("{entity}/idle"), 1, width, height), 5, true)
        .expect("clip");
    AssetDef::animation(format!("{entity}@idle"), ["animation"], clip)
}

fn registry_without(skip: &str) -> AssetRegistry {
    let defs = vec![
        AssetDef::images("snow", [TAG_TILE, TAG_AUTOTILE, TAG_PHYSICS], frames("snow", 9, 16, 16)),
        AssetDef::images("decor", [TAG_TILE], frames("decor", 2, 16, 16)),
        AssetDef::images("spawners", [TAG_TILE, "entity"], frames("spawners", 4, 16, 16)),
        player_clip("idle", 6),
        player_clip("run", 4),
        player_clip("rising", 6),
        player_clip("falling", 6),
        player_clip("wall_slide", 15),
        idle_clip("door", 9, 19),
        idle_clip("snowglobe", 8, 10),
        idle_clip("sign", 10, 10),
    ];
    AssetRegistry::from_defs(defs.into_iter().filter(|def| def.id != skip))
}

fn test_registry() -> AssetRegistry {
    registry_without("")
}

fn floor_tiles(row: i32, columns: std::ops::RangeInclusive<i32>) -> Vec<(&'static str, u32, i32, i32)> {
    columns.map(|x| ("snow", 0, x, row)).collect()
}

fn level_json(tiles: &[(&str, u32, i32, i32)], offgrid: &[(&str, u32, f64, f64)]) -> String {
    let tilemap = tiles
        .iter()
        .map(|(kind, variant, x, y)| {
            format!(r#""{x};{y}": {{"type": "{kind}", "variant": {variant}, "pos": [{x}, {y}]}}"#)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let offgrid = offgrid
        .iter()
        .map(|(kind, variant, x, y)| {
            format!(r#"{{"type": "{kind}", "variant": {variant}, "pos": [{x:?}, {y:?}]}}"#)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(r#"{{"tile_size": 16, "tilemap": {{{tilemap}}}, "offgrid": [{offgrid}]}}"#)
}

fn write_level(root: &Path, index: u32, json: &str) {
    let paths = AppPaths::under_root(root.to_path_buf());
    fs::create_dir_all(&paths.levels_dir).expect("levels dir");
    fs::write(paths.level_path(index), json).expect("write level");
}

fn scene_at(root: &Path, level: u32) -> SnowglobeScene {
    let mut scene = SnowglobeScene::new(
        GameConfig::default(),
        AppPaths::under_root(root.to_path_buf()),
        test_registry(),
    )
    .expect("scene")
    .with_rng_seed(7);
    scene.load_level(level).expect("level");
    scene.load();
    scene
}

/// Player resting on a floor at row 5, with a door around it.
fn door_level() -> String {
    level_json(
        &floor_tiles(5, 0..=6),
        &[("spawners", 0, 32.0, 66.0), ("spawners", 1, 30.0, 61.0)],
    )
}

fn second_level() -> String {
    level_json(
        &floor_tiles(5, 0..=8),
        &[("spawners", 0, 64.0, 66.0), ("decor", 1, 10.0, 70.0)],
    )
}

fn tick(scene: &mut SnowglobeScene, input: InputSnapshot) -> SceneCommand {
    scene.update(DT, &input)
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn test_tilemap() -> Tilemap {
    Tilemap::new(16, test_registry().tile_rules())
}

fn player_at(position: Vec2) -> Player {
    let set = test_registry().animation_set("player").expect("player set");
    Player::new(set, position).expect("player")
}

fn ticks_until_landing(player: &Player, tilemap: &Tilemap) -> u32 {
    let mut probe = player.clone();
    for tick in 1..=200 {
        probe.update(tilemap);
        if probe.body.collisions.down {
            return tick;
        }
    }
    panic!("player never landed");
}

/// Floor row 5 across a wide span; the player starts 66 units above it.
fn drop_setup() -> (Tilemap, Player) {
    let mut tilemap = test_tilemap();
    for x in -2..=10 {
        tilemap.place(Tile::new("snow", 0, GridPos::new(x, 5)));
    }
    (tilemap, player_at(Vec2::new(32.0, 0.0)))
}

/// A wall in column 5 with the player touching its left face mid-air.
fn wall_setup() -> (Tilemap, Player) {
    let mut tilemap = test_tilemap();
    for y in 0..=6 {
        tilemap.place(Tile::new("snow", 0, GridPos::new(5, y)));
    }
    for x in 0..=5 {
        tilemap.place(Tile::new("snow", 0, GridPos::new(x, 7)));
    }
    let mut player = player_at(Vec2::new(74.0, 20.0));
    player.set_movement(false, true);
    (tilemap, player)
}

#[test]
fn player_at_rest_stays_grounded_and_idle() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    let mut scene = scene_at(temp.path(), 0);

    for _ in 0..5 {
        assert_eq!(tick(&mut scene, InputSnapshot::empty()), SceneCommand::None);
        let player = scene.player();
        assert!(player.body.collisions.down);
        assert_eq!(player.body.velocity.y, 0.0);
        assert_eq!(player.action(), "idle");
        assert_eq!(player.rect().bottom(), 80.0);
    }
    assert_eq!(scene.player().body.size, PLAYER_SIZE);
}

#[test]
fn held_move_runs_and_faces_left() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    let mut scene = scene_at(temp.path(), 0);

    let held_left = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
    for _ in 0..3 {
        tick(&mut scene, held_left);
    }

    assert_eq!(scene.player().action(), "run");
    assert!(scene.player().body.flip);
    approx(scene.player().rect().x, 29.0);
}

#[test]
fn landing_resets_air_time_and_jumps() {
    let (tilemap, mut player) = drop_setup();
    let landing = ticks_until_landing(&player, &tilemap);

    for _ in 1..landing {
        player.update(&tilemap);
        assert!(!player.body.collisions.down);
    }
    assert_eq!(player.jumps_remaining(), 0);

    player.update(&tilemap);
    assert!(player.body.collisions.down);
    assert_eq!(player.air_time(), 0);
    assert_eq!(player.jumps_remaining(), 1);
    assert_eq!(player.rect().bottom(), 80.0);
}

#[test]
fn gravity_never_exceeds_fall_cap() {
    let (tilemap, mut player) = drop_setup();
    let mut previous = player.body.velocity.y;
    for _ in 0..35 {
        player.update(&tilemap);
        let velocity = player.body.velocity.y;
        assert!(velocity >= previous);
        assert!(velocity <= 3.0);
        previous = velocity;
    }
    assert_eq!(previous, 3.0);
}

#[test]
fn buffered_jump_fires_after_landing_within_window() {
    let (tilemap, mut player) = drop_setup();
    let landing = ticks_until_landing(&player, &tilemap);

    for _ in 0..landing - 5 {
        player.update(&tilemap);
    }
    assert!(!player.jump(false));
    assert_eq!(player.jump_buffer(), 13);

    for _ in 0..5 {
        player.update(&tilemap);
    }
    assert!(player.body.collisions.down);
    assert_eq!(player.jump_buffer(), 8);
    assert_eq!(player.body.velocity.y, 0.0);

    player.update(&tilemap);
    assert_eq!(player.body.velocity.y, -1.5);
    assert_eq!(player.jump_buffer(), 0);

    player.update(&tilemap);
    assert!(!player.body.collisions.down);
    assert!(player.rect().bottom() < 80.0);
}

#[test]
fn buffered_jump_expires_before_landing() {
    let (tilemap, mut player) = drop_setup();
    let landing = ticks_until_landing(&player, &tilemap);

    for _ in 0..landing - 15 {
        player.update(&tilemap);
    }
    assert!(!player.jump(false));

    for _ in 0..18 {
        player.update(&tilemap);
        assert_eq!(player.body.velocity.x, 0.0);
    }
    assert!(player.body.collisions.down);
    assert_eq!(player.body.velocity.y, 0.0);
    assert_eq!(player.jump_buffer(), 0);
    assert_eq!(player.action(), "idle");
}

#[test]
fn grounded_jump_uses_boost_when_held() {
    let (tilemap, mut player) = drop_setup();
    let landing = ticks_until_landing(&player, &tilemap);
    for _ in 0..landing {
        player.update(&tilemap);
    }

    let mut plain = player.clone();
    assert!(plain.jump(false));
    assert_eq!(plain.body.velocity.y, -1.5);
    assert!(!plain.is_boost_active());

    player.set_boost_held(true);
    assert!(player.jump(false));
    assert_eq!(player.body.velocity.y, -2.6);
    assert!(player.is_boost_active());
    assert_eq!(player.jumps_remaining(), 0);
}

#[test]
fn wall_slide_alternates_fall_speed_and_faces_wall() {
    let (tilemap, mut player) = wall_setup();

    for _ in 0..4 {
        player.update(&tilemap);
        assert!(player.body.collisions.right);
        assert_ne!(player.action(), "wall_slide");
    }

    let mut speeds = Vec::new();
    for _ in 0..4 {
        player.update(&tilemap);
        assert_eq!(player.action(), "wall_slide");
        assert!(!player.body.flip);
        assert_eq!(player.rect().right(), 80.0);
        speeds.push(player.body.velocity.y);
    }
    assert_eq!(speeds, [1.0, 0.0, 1.0, 0.0]);
    assert_eq!(player.wall_slide_ticks(), 4);
}

#[test]
fn wall_jump_pushes_away_from_wall() {
    let (tilemap, mut player) = wall_setup();
    for _ in 0..8 {
        player.update(&tilemap);
    }

    let mut plain = player.clone();
    assert!(plain.jump(false));
    assert_eq!(plain.body.velocity, Vec2::new(-1.0, -1.0));
    assert_eq!(plain.air_time(), 5);

    player.set_boost_held(true);
    assert!(player.jump(false));
    assert_eq!(player.body.velocity, Vec2::new(-1.9, -2.0));
    assert!(player.is_boost_active());

    player.update(&tilemap);
    assert!(!player.body.collisions.right);
    assert_eq!(player.action(), "rising");
    approx(player.body.velocity.x, -1.8);
    approx(player.body.velocity.y, -1.9);
}

#[test]
fn releasing_boost_cuts_jump_short() {
    let (tilemap, mut player) = wall_setup();
    for _ in 0..8 {
        player.update(&tilemap);
    }
    player.set_boost_held(true);
    assert!(player.jump(false));
    player.update(&tilemap);

    player.set_boost_held(false);
    player.vary_jump();
    assert_eq!(player.body.velocity.y, -0.5);
    assert!(!player.is_boost_active());

    player.vary_jump();
    assert_eq!(player.body.velocity.y, -0.5);
}

#[test]
fn boost_expires_at_jump_peak() {
    let (tilemap, mut player) = drop_setup();
    let landing = ticks_until_landing(&player, &tilemap);
    for _ in 0..landing {
        player.update(&tilemap);
    }
    player.set_boost_held(true);
    assert!(player.jump(false));

    for _ in 0..60 {
        player.update(&tilemap);
        if player.body.velocity.y >= 0.0 {
            break;
        }
        assert!(player.is_boost_active());
    }
    assert!(!player.is_boost_active());

    player.update(&tilemap);
    let falling = player.body.velocity.y;
    assert!(falling > 0.0);
    assert!(!player.body.collisions.down);

    player.set_boost_held(false);
    player.vary_jump();
    assert_eq!(player.body.velocity.y, falling);
}

#[test]
fn missing_player_action_is_rejected() {
    let set = registry_without("player@wall_slide")
        .animation_set("player")
        .expect("set");
    let err = Player::new(set, Vec2::ZERO).expect_err("missing clip");
    assert_eq!(
        err,
        AnimationError::MissingAction {
            entity: "player".to_string(),
            action: "wall_slide".to_string(),
        }
    );
}

#[test]
fn level_load_spawns_entities_and_removes_spawners() {
    let temp = TempDir::new().expect("temp");
    write_level(
        temp.path(),
        0,
        &level_json(
            &[("snow", 0, 0, 5), ("spawners", 2, 3, 3), ("spawners", 3, 4, 3)],
            &[("spawners", 0, 32.0, 66.0), ("spawners", 1, 30.0, 61.0)],
        ),
    );
    let scene = scene_at(temp.path(), 0);

    assert_eq!(scene.level(), Some(0));
    assert_eq!(scene.tilemap().tile_count(), 1);
    assert!(scene.tilemap().offgrid().is_empty());
    assert_eq!(scene.player().rect().position(), Vec2::new(32.0, 66.0));

    let positions = scene
        .interactables()
        .iter()
        .map(|entity| entity.position())
        .collect::<Vec<_>>();
    assert_eq!(
        positions,
        [Vec2::new(30.0, 61.0), Vec2::new(48.0, 48.0), Vec2::new(64.0, 48.0)]
    );
}

#[test]
fn door_prompt_appears_while_overlapping() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    let mut scene = scene_at(temp.path(), 0);

    tick(&mut scene, InputSnapshot::empty());
    let frame = scene.frame();

    assert_eq!(
        frame.prompts,
        [TextDraw {
            text: "[E]".to_string(),
            anchor: Vec2::new(30.0, 53.0),
        }]
    );
    assert!(frame.overlay.is_none());
    assert_eq!(frame.entities.len(), 2);
    assert_eq!(frame.tiles.len(), 7);
}

#[test]
fn door_interaction_runs_transition_and_loads_next_level() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    write_level(temp.path(), 1, &second_level());
    let mut scene = scene_at(temp.path(), 0);

    tick(&mut scene, InputSnapshot::empty().with_action_pressed(InputAction::Interact));
    assert!(scene.is_transitioning());
    assert!(!scene.is_interact_latched());

    let frame = scene.frame();
    assert!(frame.overlay.is_some());
    assert_eq!(frame.shake_offset, Vec2::ZERO);
    assert!(scene.interactables()[0].is_overlapping_player());
    assert!(frame.prompts.is_empty());

    let held_right = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
    let mut loaded_at = None;
    let mut finished_at = None;
    for tick_index in 2..=300 {
        tick(&mut scene, held_right);
        if scene.is_transitioning() {
            assert_eq!(scene.player().movement_x(), 0.0);
        }
        if loaded_at.is_none() && scene.level() == Some(1) {
            loaded_at = Some(tick_index);
        }
        if !scene.is_transitioning() {
            finished_at = Some(tick_index);
            break;
        }
    }

    assert_eq!(loaded_at, Some(14));
    let finished_at = finished_at.expect("transition finished");
    assert!((140..=150).contains(&finished_at), "finished at {finished_at}");
    assert!(scene.interactables().is_empty());
    assert_eq!(scene.player().rect().x, 64.0);
}

#[test]
fn failed_next_level_keeps_current_level() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    let mut scene = scene_at(temp.path(), 0);
    let tiles_before = scene.tilemap().tile_count();

    tick(&mut scene, InputSnapshot::empty().with_action_pressed(InputAction::Interact));
    for _ in 0..300 {
        tick(&mut scene, InputSnapshot::empty());
        if !scene.is_transitioning() {
            break;
        }
    }

    assert!(!scene.is_transitioning());
    assert_eq!(scene.level(), Some(0));
    assert_eq!(scene.tilemap().tile_count(), tiles_before);
    assert_eq!(scene.interactables().len(), 1);
}

#[test]
fn released_interact_does_not_open_door() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &level_json(
        &floor_tiles(5, 0..=8),
        &[("spawners", 0, 80.0, 66.0), ("spawners", 1, 30.0, 61.0)],
    ));
    let mut scene = scene_at(temp.path(), 0);

    tick(&mut scene, InputSnapshot::empty().with_action_pressed(InputAction::Interact));
    assert!(scene.is_interact_latched());
    assert!(!scene.is_transitioning());

    tick(&mut scene, InputSnapshot::empty().with_action_released(InputAction::Interact));
    assert!(!scene.is_interact_latched());
    assert!(!scene.is_transitioning());
}

#[test]
fn landing_at_terminal_speed_shakes_camera() {
    let temp = TempDir::new().expect("temp");
    write_level(
        temp.path(),
        0,
        &level_json(&floor_tiles(5, -2..=10), &[("spawners", 0, 32.0, 0.0)]),
    );
    let mut scene = scene_at(temp.path(), 0);

    let mut landed = false;
    for _ in 0..60 {
        tick(&mut scene, InputSnapshot::empty());
        if scene.player().body.collisions.down {
            landed = true;
            break;
        }
        assert_eq!(scene.camera().screenshake(), 0.0);
    }
    assert!(landed);
    assert_eq!(scene.camera().screenshake(), LANDING_SHAKE);

    tick(&mut scene, InputSnapshot::empty());
    assert_eq!(scene.camera().screenshake(), LANDING_SHAKE - 1.0);
    let offset = scene.frame().shake_offset;
    assert!(offset.x.abs() <= LANDING_SHAKE / 2.0);
    assert!(offset.y.abs() <= LANDING_SHAKE / 2.0);
}

#[test]
fn quit_input_stops_scene() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &door_level());
    let mut scene = scene_at(temp.path(), 0);

    let command = tick(&mut scene, InputSnapshot::empty().with_quit_requested(true));
    assert_eq!(command, SceneCommand::Quit);
}

#[test]
fn camera_follows_player_gradually() {
    let temp = TempDir::new().expect("temp");
    write_level(temp.path(), 0, &second_level());
    let mut scene = scene_at(temp.path(), 0);
    let start = scene.camera().scroll();
    assert_eq!(start, Vec2::new(67.0 - 80.0, 73.0 - 60.0));

    let held_right = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
    for _ in 0..5 {
        tick(&mut scene, held_right);
    }
    let scroll = scene.camera().scroll();
    assert!(scroll.x > start.x);
    assert!(scroll.x < scene.player().rect().center().x - 80.0);
}

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

#[test]
fn shipped_assets_compile_and_every_level_loads() {
    let paths = AppPaths::under_root(repo_root());
    let registry = compile_asset_registry(&paths.defs_dir).expect("shipped defs compile");
    let mut scene = SnowglobeScene::new(GameConfig::default(), paths, registry)
        .expect("shipped registry has every entity");

    for (level, interactables) in [(0, 3), (1, 2)] {
        scene.load_level(level).expect("shipped level loads");
        assert_eq!(scene.interactables().len(), interactables, "level {level}");
        scene.load();
        let frame = scene.frame();
        assert!(!frame.tiles.is_empty(), "level {level}");
        assert_eq!(frame.entities.len(), interactables + 1);
    }
}
