use tracing::warn;

use super::{Animation, AnimationError, AnimationSet, FrameImage, Rect, Tilemap, Vec2};

pub const DEFAULT_ACTION: &str = "idle";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsTuning {
    pub gravity: f64,
    pub max_fall_speed: f64,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 0.1,
            max_fall_speed: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collisions {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Collisions {
    pub fn horizontal(&self) -> bool {
        self.left || self.right
    }

    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

/// Rectangle body with gravity and axis-separated tile collision. Owns its
/// animation playback; the body size follows the current frame.
#[derive(Debug, Clone)]
pub struct PhysicsEntity {
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub collisions: Collisions,
    pub flip: bool,
    pub last_movement: Vec2,
    action: String,
    animation: Animation,
    anim_offset: Vec2,
    animations: AnimationSet,
    tuning: PhysicsTuning,
}

impl PhysicsEntity {
    pub fn new(animations: AnimationSet, position: Vec2, size: Vec2) -> Result<Self, AnimationError> {
        let animation = animations.instance(DEFAULT_ACTION)?;
        Ok(Self {
            position,
            size,
            velocity: Vec2::ZERO,
            collisions: Collisions::default(),
            flip: false,
            last_movement: Vec2::ZERO,
            action: DEFAULT_ACTION.to_string(),
            anim_offset: animation.offset(),
            animation,
            animations,
            tuning: PhysicsTuning::default(),
        })
    }

    pub fn with_tuning(mut self, tuning: PhysicsTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn tuning(&self) -> PhysicsTuning {
        self.tuning
    }

    pub fn entity_type(&self) -> &str {
        self.animations.entity()
    }

    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.position, self.size)
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn current_frame(&self) -> &FrameImage {
        self.animation.current_frame()
    }

    /// Top-left of the sprite, which may sit outside the collision box.
    pub fn render_position(&self) -> Vec2 {
        self.position + self.anim_offset
    }

    /// Switches to a fresh playback of `action`. Re-selecting the current
    /// action keeps its cursor. An unknown action is logged and ignored.
    pub fn set_action(&mut self, action: &str) {
        if self.action == action {
            return;
        }
        match self.animations.instance(action) {
            Ok(animation) => {
                self.action = action.to_string();
                self.anim_offset = animation.offset();
                self.animation = animation;
            }
            Err(error) => {
                warn!(entity = self.animations.entity(), action, error = %error, "animation_action_missing");
            }
        }
    }

    pub fn update(&mut self, tilemap: &Tilemap, movement: Vec2) {
        self.size = self.animation.body_size();
        self.collisions = Collisions::default();

        let frame_movement = movement + self.velocity;

        self.position.x += frame_movement.x;
        let mut entity_rect = self.rect();
        for rect in tilemap.physics_rects_around(self.position) {
            if entity_rect.overlaps(&rect) {
                if frame_movement.x > 0.0 {
                    entity_rect.set_right(rect.left());
                    self.collisions.right = true;
                }
                if frame_movement.x < 0.0 {
                    entity_rect.set_left(rect.right());
                    self.collisions.left = true;
                }
                self.position.x = entity_rect.x;
            }
        }

        self.position.y += frame_movement.y;
        let mut entity_rect = self.rect();
        let solids = tilemap.physics_rects_around(self.position);
        for rect in &solids {
            if entity_rect.overlaps(rect) {
                if frame_movement.y > 0.0 {
                    entity_rect.set_bottom(rect.top());
                    self.collisions.down = true;
                }
                if frame_movement.y < 0.0 {
                    entity_rect.set_top(rect.bottom());
                    self.collisions.up = true;
                }
                self.position.y = entity_rect.y;
            }
        }
        // Standing exactly on a tile top counts as ground contact.
        if frame_movement.y >= 0.0
            && !self.collisions.down
            && solids.iter().any(|rect| entity_rect.rests_on(rect))
        {
            self.collisions.down = true;
        }

        if movement.x > 0.0 {
            self.flip = false;
        }
        if movement.x < 0.0 {
            self.flip = true;
        }
        self.last_movement = movement;

        self.velocity.y = (self.velocity.y + self.tuning.gravity).min(self.tuning.max_fall_speed);
        if self.collisions.vertical() {
            self.velocity.y = 0.0;
        }

        self.animation.update();
        self.anim_offset = self.animation.offset();
    }
}
