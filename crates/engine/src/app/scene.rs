use super::frame::FrameSnapshot;
use super::input::{ActionStates, InputAction};

/// Input for one simulation tick: held state plus press and release edges
/// that occurred since the previous tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    held: ActionStates,
    pressed: ActionStates,
    released: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        held: ActionStates,
        pressed: ActionStates,
        released: ActionStates,
    ) -> Self {
        Self {
            quit_requested,
            held,
            pressed,
            released,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn was_released(&self, action: InputAction) -> bool {
        self.released.is_down(action)
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    /// Marks a press edge; the action is also held.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.pressed.set(action, true);
        self.held.set(action, true);
        self
    }

    /// Marks a release edge; the action is no longer held.
    pub fn with_action_released(mut self, action: InputAction) -> Self {
        self.released.set(action, true);
        self.held.set(action, false);
        self
    }

    /// Held state only, with this tick's edges cleared.
    pub fn held_only(&self) -> Self {
        Self {
            quit_requested: self.quit_requested,
            held: self.held,
            pressed: ActionStates::default(),
            released: ActionStates::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    /// Everything the renderer needs for the current frame.
    fn frame(&mut self) -> FrameSnapshot;
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_keep_held_state_consistent_with_edges() {
        let input = InputSnapshot::empty()
            .with_action_pressed(InputAction::Jump)
            .with_action_released(InputAction::JumpBoost)
            .with_action_down(InputAction::MoveLeft, true);

        assert!(input.was_pressed(InputAction::Jump));
        assert!(input.is_down(InputAction::Jump));
        assert!(input.was_released(InputAction::JumpBoost));
        assert!(!input.is_down(InputAction::JumpBoost));
        assert!(input.is_down(InputAction::MoveLeft));
        assert!(!input.was_pressed(InputAction::MoveLeft));
    }

    #[test]
    fn held_only_drops_edges() {
        let input = InputSnapshot::empty()
            .with_action_pressed(InputAction::Interact)
            .with_quit_requested(true)
            .held_only();

        assert!(input.is_down(InputAction::Interact));
        assert!(!input.was_pressed(InputAction::Interact));
        assert!(input.quit_requested());
    }
}
