use engine::{
    AppError, AppPaths, AssetRegistry, Camera2D, FrameSnapshot, InputAction, InputSnapshot, LevelError,
    Scene, SceneCommand, SpriteDraw, Tilemap, TransitionEvent, TransitionRequest,
    TransitionSequencer, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::interact::{
    InteractEntity, InteractKind, DEFAULT_SIGN_TEXT, DOOR_SIZE, SIGN_SIZE, SNOWGLOBE_SIZE,
};
use super::player::Player;
use crate::app::bootstrap::GameConfig;

const SPAWNER_KIND: &str = "spawners";
const SPAWN_PLAYER: u32 = 0;
const SPAWN_DOOR: u32 = 1;
const SPAWN_SNOWGLOBE: u32 = 2;
const SPAWN_SIGN: u32 = 3;
const SPAWNER_PARTS: [(&str, u32); 4] = [
    (SPAWNER_KIND, SPAWN_PLAYER),
    (SPAWNER_KIND, SPAWN_DOOR),
    (SPAWNER_KIND, SPAWN_SNOWGLOBE),
    (SPAWNER_KIND, SPAWN_SIGN),
];
// Display pixels.
pub(super) const LANDING_SHAKE: f64 = 8.0;

#[derive(Debug)]
enum Mode {
    Normal,
    Transition(TransitionSequencer),
}

pub(crate) struct SnowglobeScene {
    config: GameConfig,
    paths: AppPaths,
    registry: AssetRegistry,
    tilemap: Tilemap,
    player: Player,
    door_template: InteractEntity,
    snowglobe_template: InteractEntity,
    sign_template: InteractEntity,
    interactables: Vec<InteractEntity>,
    camera: Camera2D,
    mode: Mode,
    level: Option<u32>,
    interact_latched: bool,
    rng: StdRng,
}

impl SnowglobeScene {
    pub(crate) fn new(
        config: GameConfig,
        paths: AppPaths,
        registry: AssetRegistry,
    ) -> Result<Self, AppError> {
        let player = Player::new(registry.animation_set("player")?, Vec2::ZERO)?;
        let door_request =
            TransitionRequest::new(config.door_caption.clone(), config.caption_hold_seconds);
        let door_template = InteractEntity::new(
            InteractKind::Door {
                request: door_request,
            },
            &registry.animation_set("door")?,
            Vec2::ZERO,
            DOOR_SIZE,
        )?;
        let snowglobe_template = InteractEntity::new(
            InteractKind::Snowglobe,
            &registry.animation_set("snowglobe")?,
            Vec2::ZERO,
            SNOWGLOBE_SIZE,
        )?;
        let sign_template = InteractEntity::new(
            InteractKind::Sign {
                text: DEFAULT_SIGN_TEXT.to_string(),
            },
            &registry.animation_set("sign")?,
            Vec2::ZERO,
            SIGN_SIZE,
        )?;
        let tilemap = Tilemap::new(config.tile_size, registry.tile_rules());
        let camera = Camera2D::new(config.canvas_vec(), config.camera_speed);

        Ok(Self {
            config,
            paths,
            registry,
            tilemap,
            player,
            door_template,
            snowglobe_template,
            sign_template,
            interactables: Vec::new(),
            camera,
            mode: Mode::Normal,
            level: None,
            interact_latched: false,
            rng: StdRng::from_entropy(),
        })
    }

    pub(super) fn is_transitioning(&self) -> bool {
        matches!(self.mode, Mode::Transition(_))
    }

    /// Loads `levels/<index>.json`. On error nothing changes.
    pub(crate) fn load_level(&mut self, index: u32) -> Result<(), LevelError> {
        self.tilemap.load(&self.paths.level_path(index))?;

        self.player.reset_for_level();
        self.interactables.clear();
        let markers = self.tilemap.extract(&SPAWNER_PARTS, false);
        debug!(level = index, spawners = markers.len(), "spawners_resolved");
        for marker in markers {
            match marker.part {
                SPAWN_PLAYER => self.player.body.position = marker.pos,
                SPAWN_DOOR => self
                    .interactables
                    .push(self.door_template.placed_at(marker.pos)),
                SPAWN_SNOWGLOBE => self
                    .interactables
                    .push(self.snowglobe_template.placed_at(marker.pos)),
                SPAWN_SIGN => self
                    .interactables
                    .push(self.sign_template.placed_at(marker.pos)),
                _ => {}
            }
        }
        self.level = Some(index);
        info!(
            level = index,
            tiles = self.tilemap.tile_count(),
            offgrid = self.tilemap.offgrid().len(),
            interactables = self.interactables.len(),
            "level_loaded"
        );
        Ok(())
    }

    fn apply_input(&mut self, input: &InputSnapshot) {
        self.player.set_movement(
            input.is_down(InputAction::MoveLeft),
            input.is_down(InputAction::MoveRight),
        );
        if input.was_pressed(InputAction::JumpBoost) {
            self.player.set_boost_held(true);
        }
        if input.was_pressed(InputAction::Jump) {
            self.player.jump(false);
        }
        if input.was_released(InputAction::JumpBoost) {
            self.player.set_boost_held(false);
            self.player.vary_jump();
        }
        if input.was_pressed(InputAction::Interact) {
            self.interact_latched = true;
        }
        if input.was_released(InputAction::Interact) {
            self.interact_latched = false;
        }
    }

    fn start_transition(&mut self, request: TransitionRequest) {
        info!(
            caption = %request.caption,
            hold_seconds = request.hold_seconds,
            "transition_started"
        );
        self.player.clear_movement();
        self.mode = Mode::Transition(TransitionSequencer::new(request, self.config.display_vec()));
    }

    fn step_transition(&mut self, dt_seconds: f64) {
        let event = match &mut self.mode {
            Mode::Transition(sequencer) => sequencer.step(dt_seconds),
            Mode::Normal => return,
        };
        match event {
            TransitionEvent::Covered => self.advance_level(),
            TransitionEvent::Finished => {
                self.mode = Mode::Normal;
                info!(level = ?self.level, "transition_finished");
            }
            TransitionEvent::None => {}
        }
    }

    fn advance_level(&mut self) {
        let next = self.level.map_or(self.config.start_level, |level| level + 1);
        if let Err(error) = self.load_level(next) {
            warn!(level = next, error = %error, "level_load_failed");
        }
    }

    fn tile_draws(&self) -> Vec<SpriteDraw> {
        let tile_size = self.tilemap.tile_size();
        let offgrid = self.tilemap.offgrid().iter().filter_map(|tile| {
            self.registry
                .tile_frame(&tile.kind, tile.variant)
                .map(|frame| SpriteDraw::from_frame(frame, tile.pos, false))
        });
        let grid = self
            .tilemap
            .tiles_in_view(self.camera.view_rect())
            .into_iter()
            .filter_map(|tile| {
                self.registry
                    .tile_frame(&tile.kind, self.tilemap.render_variant(tile))
                    .map(|frame| {
                        SpriteDraw::from_frame(frame, tile.pos.world_origin(tile_size), false)
                    })
            });
        offgrid.chain(grid).collect()
    }
}

impl Scene for SnowglobeScene {
    fn load(&mut self) {
        self.camera.snap_to(self.player.rect().center());
        info!(
            level = ?self.level,
            interactables = self.interactables.len(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        if !self.is_transitioning() {
            self.apply_input(input);
        }

        self.camera.decay_shake();
        self.camera.follow(self.player.rect().center());

        let transitioning = self.is_transitioning();
        let mut ignored_latch = false;
        let latch = if transitioning {
            &mut ignored_latch
        } else {
            &mut self.interact_latched
        };
        let player_rect = self.player.rect();
        let mut request = None;
        for entity in &mut self.interactables {
            entity.update(player_rect);
            if request.is_none() {
                request = entity.interact(latch);
            }
        }

        let at_terminal_speed =
            self.player.body.velocity.y >= self.player.body.tuning().max_fall_speed;
        self.player.update(&self.tilemap);
        if at_terminal_speed && self.player.body.collisions.down {
            debug!(shake = LANDING_SHAKE, "landing_shake");
            self.camera.add_shake(LANDING_SHAKE);
        }

        if let Some(request) = request {
            self.start_transition(request);
        }
        self.step_transition(f64::from(fixed_dt_seconds));

        SceneCommand::None
    }

    fn frame(&mut self) -> FrameSnapshot {
        let mut entities = self
            .interactables
            .iter()
            .map(InteractEntity::sprite)
            .collect::<Vec<_>>();
        entities.push(SpriteDraw::from_frame(
            self.player.current_frame(),
            self.player.body.render_position(),
            self.player.body.flip,
        ));

        let (shake_offset, prompts, overlay) = match &self.mode {
            Mode::Normal => (
                self.camera.shake_offset(&mut self.rng),
                self.interactables
                    .iter()
                    .filter_map(InteractEntity::prompt)
                    .collect(),
                None,
            ),
            Mode::Transition(sequencer) => (Vec2::ZERO, Vec::new(), Some(sequencer.overlay())),
        };

        FrameSnapshot {
            camera_offset: self.camera.render_offset(),
            shake_offset,
            tiles: self.tile_draws(),
            entities,
            prompts,
            overlay,
        }
    }

    fn unload(&mut self) {
        info!(level = ?self.level, "scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        let level = self
            .level
            .map_or_else(|| "-".to_string(), |level| level.to_string());
        let mut title = format!("Snowglobe Thief | level {level} | {}", self.player.action());
        if let Some(text) = self
            .interactables
            .iter()
            .find_map(InteractEntity::overlapped_sign_text)
        {
            title.push_str(" | sign: ");
            title.push_str(text);
        }
        Some(title)
    }
}

#[cfg(test)]
impl SnowglobeScene {
    pub(super) fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub(super) fn level(&self) -> Option<u32> {
        self.level
    }

    pub(super) fn player(&self) -> &Player {
        &self.player
    }

    pub(super) fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub(super) fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub(super) fn interactables(&self) -> &[InteractEntity] {
        &self.interactables
    }

    pub(super) fn is_interact_latched(&self) -> bool {
        self.interact_latched
    }
}
