use std::sync::Arc;

use crate::world::{FrameImage, Vec2, WipeOverlay};

/// One sprite at a world position. The renderer subtracts the camera offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub key: Arc<str>,
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
    pub flip: bool,
}

impl SpriteDraw {
    pub fn from_frame(frame: &FrameImage, position: Vec2, flip: bool) -> Self {
        Self {
            key: Arc::clone(frame.key()),
            position,
            width: frame.width(),
            height: frame.height(),
            flip,
        }
    }
}

/// Short text anchored at the bottom-left of a world position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub text: String,
    pub anchor: Vec2,
}

/// Render boundary for a single frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSnapshot {
    pub camera_offset: (i32, i32),
    /// Whole-frame shake, in display pixels.
    pub shake_offset: Vec2,
    pub tiles: Vec<SpriteDraw>,
    pub entities: Vec<SpriteDraw>,
    pub prompts: Vec<TextDraw>,
    pub overlay: Option<WipeOverlay>,
}
