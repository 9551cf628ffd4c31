use tracing::debug;

use super::Vec2;

/// Height of the wipe's chevron points, in display pixels.
pub const WIPE_POINT_ALTITUDE: f64 = 250.0;
const WIPE_MARGIN: f64 = 50.0;
const WIPE_STEPS_PER_HEIGHT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub caption: String,
    pub hold_seconds: f64,
}

impl TransitionRequest {
    pub fn new(caption: impl Into<String>, hold_seconds: f64) -> Self {
        Self {
            caption: caption.into(),
            hold_seconds: if hold_seconds.is_finite() {
                hold_seconds.max(0.0)
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStage {
    Covering,
    Holding,
    Revealing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    None,
    /// The wipe covers the whole viewport; swap level state now.
    Covered,
    Finished,
}

/// Wipe geometry for one frame, in display coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct WipeOverlay {
    pub points: [Vec2; 6],
    pub caption: String,
    pub caption_center: Vec2,
    pub display_size: Vec2,
}

/// Drives the cover, hold and reveal stages of a level transition. Stepped
/// once per tick alongside the normal simulation.
#[derive(Debug, Clone)]
pub struct TransitionSequencer {
    request: TransitionRequest,
    display_size: Vec2,
    stage: TransitionStage,
    y: f64,
    held_for: f64,
}

impl TransitionSequencer {
    pub fn new(request: TransitionRequest, display_size: Vec2) -> Self {
        Self {
            request,
            display_size,
            stage: TransitionStage::Covering,
            y: -display_size.y - WIPE_POINT_ALTITUDE,
            held_for: 0.0,
        }
    }

    pub fn stage(&self) -> TransitionStage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == TransitionStage::Finished
    }

    pub fn wipe_y(&self) -> f64 {
        self.y
    }

    pub fn request(&self) -> &TransitionRequest {
        &self.request
    }

    pub fn step(&mut self, dt_seconds: f64) -> TransitionEvent {
        let wipe_step = self.display_size.y / WIPE_STEPS_PER_HEIGHT;
        let mut event = TransitionEvent::None;

        match self.stage {
            TransitionStage::Covering => {
                self.y += wipe_step;
                if self.y >= 0.0 {
                    self.stage = TransitionStage::Holding;
                    self.held_for = 0.0;
                    event = TransitionEvent::Covered;
                    debug!(caption = %self.request.caption, "transition_covered");
                }
            }
            TransitionStage::Holding => self.held_for += dt_seconds,
            TransitionStage::Revealing | TransitionStage::Finished => {}
        }

        if self.stage == TransitionStage::Holding && self.held_for > self.request.hold_seconds {
            self.stage = TransitionStage::Revealing;
        }

        if self.stage == TransitionStage::Revealing {
            self.y += wipe_step;
            if self.y >= self.display_size.y {
                self.stage = TransitionStage::Finished;
                event = TransitionEvent::Finished;
            }
        }

        event
    }

    pub fn overlay(&self) -> WipeOverlay {
        let w = self.display_size.x;
        let h = self.display_size.y;
        let y = self.y;
        let alt = WIPE_POINT_ALTITUDE;
        WipeOverlay {
            points: [
                Vec2::new(0.0, y - alt - WIPE_MARGIN),
                Vec2::new(w / 2.0, y - WIPE_MARGIN),
                Vec2::new(w, y - alt - WIPE_MARGIN),
                Vec2::new(w, h + y + WIPE_MARGIN),
                Vec2::new(w / 2.0, h + y + alt + WIPE_MARGIN),
                Vec2::new(0.0, h + y + WIPE_MARGIN),
            ],
            caption: self.request.caption.clone(),
            caption_center: Vec2::new(w / 2.0, h / 2.0 + y - WIPE_MARGIN),
            display_size: self.display_size,
        }
    }
}
