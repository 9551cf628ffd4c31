use engine::world::DEFAULT_ACTION;
use engine::{
    Animation, AnimationError, AnimationSet, Rect, SpriteDraw, TextDraw, TransitionRequest, Vec2,
};

pub(super) const DOOR_SIZE: Vec2 = Vec2::new(9.0, 19.0);
pub(super) const SNOWGLOBE_SIZE: Vec2 = Vec2::new(8.0, 10.0);
pub(super) const SIGN_SIZE: Vec2 = Vec2::new(10.0, 10.0);
pub(super) const DEFAULT_SIGN_TEXT: &str = "placeholder";
const DOOR_PROMPT: &str = "[E]";
const DOOR_PROMPT_RISE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum InteractKind {
    Door { request: TransitionRequest },
    Snowglobe,
    Sign { text: String },
}

/// Stationary entity that tracks overlap with the player.
#[derive(Debug, Clone)]
pub(super) struct InteractEntity {
    kind: InteractKind,
    position: Vec2,
    size: Vec2,
    animation: Animation,
    overlapping_player: bool,
}

impl InteractEntity {
    pub(super) fn new(
        kind: InteractKind,
        animations: &AnimationSet,
        position: Vec2,
        size: Vec2,
    ) -> Result<Self, AnimationError> {
        Ok(Self {
            kind,
            position,
            size,
            animation: animations.instance(DEFAULT_ACTION)?,
            overlapping_player: false,
        })
    }

    pub(super) fn placed_at(&self, position: Vec2) -> Self {
        Self {
            position,
            overlapping_player: false,
            ..self.clone()
        }
    }

    pub(super) fn rect(&self) -> Rect {
        Rect::from_pos_size(self.position, self.size)
    }

    #[cfg(test)]
    pub(super) fn position(&self) -> Vec2 {
        self.position
    }

    #[cfg(test)]
    pub(super) fn is_overlapping_player(&self) -> bool {
        self.overlapping_player
    }

    pub(super) fn overlapped_sign_text(&self) -> Option<&str> {
        match &self.kind {
            InteractKind::Sign { text } if self.overlapping_player => Some(text),
            _ => None,
        }
    }

    pub(super) fn update(&mut self, player_rect: Rect) {
        self.size = self.animation.body_size();
        self.animation.update();
        self.overlapping_player = player_rect.overlaps(&self.rect());
    }

    pub(super) fn interact(&self, interact_latched: &mut bool) -> Option<TransitionRequest> {
        match &self.kind {
            InteractKind::Door { request } if self.overlapping_player && *interact_latched => {
                *interact_latched = false;
                Some(request.clone())
            }
            _ => None,
        }
    }

    pub(super) fn sprite(&self) -> SpriteDraw {
        SpriteDraw::from_frame(
            self.animation.current_frame(),
            self.position + self.animation.offset(),
            false,
        )
    }

    pub(super) fn prompt(&self) -> Option<TextDraw> {
        match self.kind {
            InteractKind::Door { .. } if self.overlapping_player => Some(TextDraw {
                text: DOOR_PROMPT.to_string(),
                anchor: Vec2::new(self.position.x, self.position.y - DOOR_PROMPT_RISE),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine::{AnimationClip, FrameImage};

    use super::*;

    fn door() -> InteractEntity {
        let clip = AnimationClip::new(vec![FrameImage::new("door/idle/0", 9, 19)], 5, true)
            .expect("clip");
        let set = AnimationSet::new("door").with_clip("idle", Arc::new(clip));
        InteractEntity::new(
            InteractKind::Door {
                request: TransitionRequest::new("you left the north pole.", 2.0),
            },
            &set,
            Vec2::new(32.0, 13.0),
            DOOR_SIZE,
        )
        .expect("door")
    }

    #[test]
    fn door_consumes_latch_only_when_overlapping() {
        let mut door = door();
        let mut latched = true;

        door.update(Rect::new(0.0, 0.0, 6.0, 14.0));
        assert!(door.interact(&mut latched).is_none());
        assert!(latched);

        door.update(Rect::new(30.0, 18.0, 6.0, 14.0));
        let request = door.interact(&mut latched).expect("request");
        assert_eq!(request.caption, "you left the north pole.");
        assert!(!latched);
        assert!(door.interact(&mut latched).is_none());
    }

    #[test]
    fn prompt_sits_above_overlapped_door() {
        let mut door = door();
        assert!(door.prompt().is_none());

        door.update(Rect::new(30.0, 18.0, 6.0, 14.0));
        let prompt = door.prompt().expect("prompt");
        assert_eq!(prompt.text, DOOR_PROMPT);
        assert_eq!(prompt.anchor, Vec2::new(32.0, 5.0));
    }

    #[test]
    fn edge_contact_is_not_overlap() {
        let mut door = door();
        door.update(Rect::new(26.0, 13.0, 6.0, 14.0));
        assert!(!door.is_overlapping_player());
    }

    #[test]
    fn sign_text_shows_only_while_overlapping() {
        let clip = AnimationClip::new(vec![FrameImage::new("sign/idle/0", 10, 10)], 5, true)
            .expect("clip");
        let set = AnimationSet::new("sign").with_clip("idle", Arc::new(clip));
        let mut sign = InteractEntity::new(
            InteractKind::Sign {
                text: DEFAULT_SIGN_TEXT.to_string(),
            },
            &set,
            Vec2::new(0.0, 0.0),
            SIGN_SIZE,
        )
        .expect("sign");

        assert!(sign.overlapped_sign_text().is_none());
        sign.update(Rect::new(4.0, 4.0, 6.0, 14.0));
        assert_eq!(sign.overlapped_sign_text(), Some(DEFAULT_SIGN_TEXT));
        assert!(sign.prompt().is_none());
        let mut latched = true;
        assert!(sign.interact(&mut latched).is_none());
        assert!(latched);
    }

    #[test]
    fn placed_copy_resets_overlap() {
        let mut door = door();
        door.update(Rect::new(30.0, 18.0, 6.0, 14.0));
        let copy = door.placed_at(Vec2::new(100.0, 50.0));
        assert!(!copy.is_overlapping_player());
        assert_eq!(copy.position(), Vec2::new(100.0, 50.0));
    }
}
