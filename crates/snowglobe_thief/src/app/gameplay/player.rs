use engine::{AnimationError, AnimationSet, Collisions, FrameImage, PhysicsEntity, Rect, Tilemap, Vec2};

pub(super) const PLAYER_SIZE: Vec2 = Vec2::new(6.0, 14.0);

#[derive(Debug, Clone, Copy, PartialEq)]
struct JumpTuning {
    ground_impulse: f64,
    boosted_ground_impulse: f64,
    wall_impulse: Vec2,
    boosted_wall_impulse: Vec2,
    released_boost_speed: f64,
    buffer_ticks: u32,
    jump_air_time: u32,
    rising_after: u32,
    falling_after: u32,
    jump_grace_ticks: u32,
    friction: f64,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            ground_impulse: -1.5,
            boosted_ground_impulse: -2.6,
            wall_impulse: Vec2::new(1.0, -1.0),
            boosted_wall_impulse: Vec2::new(1.9, -2.0),
            released_boost_speed: -0.5,
            buffer_ticks: 13,
            jump_air_time: 5,
            rising_after: 4,
            falling_after: 8,
            jump_grace_ticks: 10,
            friction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerAction {
    Idle,
    Run,
    Rising,
    Falling,
    WallSlide,
}

impl PlayerAction {
    const ALL: [PlayerAction; 5] = [
        PlayerAction::Idle,
        PlayerAction::Run,
        PlayerAction::Rising,
        PlayerAction::Falling,
        PlayerAction::WallSlide,
    ];

    fn as_str(self) -> &'static str {
        match self {
            PlayerAction::Idle => "idle",
            PlayerAction::Run => "run",
            PlayerAction::Rising => "rising",
            PlayerAction::Falling => "falling",
            PlayerAction::WallSlide => "wall_slide",
        }
    }
}

/// First match wins: wall slide, rising, falling, run, idle.
fn select_action(
    collisions: Collisions,
    velocity_y: f64,
    air_time: u32,
    movement_x: f64,
    tuning: &JumpTuning,
) -> PlayerAction {
    if collisions.horizontal() && air_time > tuning.rising_after && velocity_y > 0.0 {
        PlayerAction::WallSlide
    } else if air_time > tuning.rising_after && velocity_y < 0.0 {
        PlayerAction::Rising
    } else if air_time > tuning.falling_after && velocity_y > 0.0 {
        PlayerAction::Falling
    } else if movement_x != 0.0 {
        PlayerAction::Run
    } else {
        PlayerAction::Idle
    }
}

#[derive(Debug, Clone)]
pub(super) struct Player {
    pub(super) body: PhysicsEntity,
    air_time: u32,
    jumps: u32,
    jump_buffer: u32,
    wall_slide: u32,
    slide_alternator: u8,
    moving_left: bool,
    moving_right: bool,
    boost_held: bool,
    jump_effect: bool,
    tuning: JumpTuning,
}

impl Player {
    pub(super) fn new(animations: AnimationSet, position: Vec2) -> Result<Self, AnimationError> {
        let required = PlayerAction::ALL.map(PlayerAction::as_str);
        animations.require(&required)?;
        Ok(Self {
            body: PhysicsEntity::new(animations, position, PLAYER_SIZE)?,
            air_time: 0,
            jumps: 1,
            jump_buffer: 0,
            wall_slide: 0,
            slide_alternator: 0,
            moving_left: false,
            moving_right: false,
            boost_held: false,
            jump_effect: false,
            tuning: JumpTuning::default(),
        })
    }

    #[cfg(test)]
    pub(super) fn air_time(&self) -> u32 {
        self.air_time
    }

    #[cfg(test)]
    pub(super) fn jumps_remaining(&self) -> u32 {
        self.jumps
    }

    #[cfg(test)]
    pub(super) fn jump_buffer(&self) -> u32 {
        self.jump_buffer
    }

    #[cfg(test)]
    pub(super) fn wall_slide_ticks(&self) -> u32 {
        self.wall_slide
    }

    #[cfg(test)]
    pub(super) fn is_boost_active(&self) -> bool {
        self.jump_effect
    }

    pub(super) fn rect(&self) -> Rect {
        self.body.rect()
    }

    pub(super) fn action(&self) -> &str {
        self.body.action()
    }

    pub(super) fn current_frame(&self) -> &FrameImage {
        self.body.current_frame()
    }

    pub(super) fn movement_x(&self) -> f64 {
        f64::from(u8::from(self.moving_right)) - f64::from(u8::from(self.moving_left))
    }

    pub(super) fn set_movement(&mut self, left: bool, right: bool) {
        self.moving_left = left;
        self.moving_right = right;
    }

    pub(super) fn clear_movement(&mut self) {
        self.set_movement(false, false);
    }

    pub(super) fn set_boost_held(&mut self, held: bool) {
        self.boost_held = held;
    }

    // Position, velocity and facing carry over.
    pub(super) fn reset_for_level(&mut self) {
        self.air_time = 0;
        self.jumps = 1;
        self.wall_slide = 0;
        self.slide_alternator = 0;
    }

    /// Wall jump first, then a regular jump. Only a direct attempt arms the
    /// buffer.
    pub(super) fn jump(&mut self, buffered: bool) -> bool {
        if self.wall_slide > 1 {
            let away = if self.body.flip && self.body.last_movement.x < 0.0 {
                1.0
            } else if !self.body.flip && self.body.last_movement.x > 0.0 {
                -1.0
            } else {
                return false;
            };
            let impulse = if self.boost_held {
                self.jump_effect = true;
                self.tuning.boosted_wall_impulse
            } else {
                self.tuning.wall_impulse
            };
            self.body.velocity = Vec2::new(impulse.x * away, impulse.y);
            self.air_time = self.tuning.jump_air_time;
            self.jumps = self.jumps.saturating_sub(1);
            return true;
        }

        if self.jumps > 0 {
            self.body.velocity.y = if self.boost_held {
                self.jump_effect = true;
                self.tuning.boosted_ground_impulse
            } else {
                self.tuning.ground_impulse
            };
            self.jumps -= 1;
            self.air_time = self.tuning.jump_air_time;
            return true;
        }

        if !buffered {
            self.jump_buffer = self.tuning.buffer_ticks;
        }
        false
    }

    pub(super) fn vary_jump(&mut self) {
        if self.jump_effect {
            self.body.velocity.y = self.body.velocity.y.max(self.tuning.released_boost_speed);
            self.jump_effect = false;
        }
    }

    pub(super) fn update(&mut self, tilemap: &Tilemap) {
        let movement = Vec2::new(self.movement_x(), 0.0);
        self.body.update(tilemap, movement);

        if self.body.velocity.y >= 0.0 {
            self.jump_effect = false;
        }

        self.air_time += 1;
        self.jump_buffer = self.jump_buffer.saturating_sub(1);
        if self.jump_buffer > 0 && self.jump(true) {
            self.jump_buffer = 0;
        }

        if self.body.collisions.down {
            self.air_time = 0;
            self.jumps = 1;
        } else if self.air_time > self.tuning.jump_grace_ticks {
            self.jumps = 0;
        }

        let action = select_action(
            self.body.collisions,
            self.body.velocity.y,
            self.air_time,
            movement.x,
            &self.tuning,
        );
        if action == PlayerAction::WallSlide {
            self.wall_slide += 1;
            self.slide_alternator = (self.slide_alternator + 1) % 2;
            self.body.velocity.y = f64::from(self.slide_alternator);
            self.body.flip = !self.body.collisions.right;
        } else {
            self.wall_slide = 0;
            self.slide_alternator = 0;
        }
        self.body.set_action(action.as_str());

        let friction = self.tuning.friction;
        if self.body.velocity.x > 0.0 {
            self.body.velocity.x = (self.body.velocity.x - friction).max(0.0);
        }
        if self.body.velocity.x < 0.0 {
            self.body.velocity.x = (self.body.velocity.x + friction).min(0.0);
        }
    }
}
