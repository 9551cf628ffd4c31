use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::Vec2;

/// Identifier and pixel size of a single sprite frame. Pixel data lives with
/// the renderer; the simulation only needs the key and the size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameImage {
    key: Arc<str>,
    width: u32,
    height: u32,
}

impl FrameImage {
    pub fn new(key: impl Into<Arc<str>>, width: u32, height: u32) -> Self {
        Self {
            key: key.into(),
            width,
            height,
        }
    }

    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(f64::from(self.width), f64::from(self.height))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("animation needs at least one frame")]
    NoFrames,
    #[error("frame duration must be at least one tick")]
    ZeroFrameDuration,
    #[error("entity '{entity}' has no animation for action '{action}'")]
    MissingAction { entity: String, action: String },
}

/// Immutable animation template shared by every entity that plays it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    frames: Vec<FrameImage>,
    frame_duration: u32,
    looping: bool,
    offset: Vec2,
    size_adjust: Vec2,
}

impl AnimationClip {
    pub fn new(
        frames: Vec<FrameImage>,
        frame_duration: u32,
        looping: bool,
    ) -> Result<Self, AnimationError> {
        if frames.is_empty() {
            return Err(AnimationError::NoFrames);
        }
        if frame_duration == 0 {
            return Err(AnimationError::ZeroFrameDuration);
        }
        Ok(Self {
            frames,
            frame_duration,
            looping,
            offset: Vec2::ZERO,
            size_adjust: Vec2::ZERO,
        })
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_size_adjust(mut self, size_adjust: Vec2) -> Self {
        self.size_adjust = size_adjust;
        self
    }

    pub fn frames(&self) -> &[FrameImage] {
        &self.frames
    }

    pub fn frame_duration(&self) -> u32 {
        self.frame_duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn size_adjust(&self) -> Vec2 {
        self.size_adjust
    }

    pub fn total_ticks(&self) -> u32 {
        self.frame_duration
            .saturating_mul(self.frames.len() as u32)
    }
}

/// Playback state over a shared clip. Cloning yields an independent cursor.
#[derive(Debug, Clone)]
pub struct Animation {
    clip: Arc<AnimationClip>,
    cursor: u32,
    done: bool,
}

impl Animation {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            cursor: 0,
            done: false,
        }
    }

    pub fn update(&mut self) {
        self.advance(1);
    }

    pub fn advance(&mut self, dt: u32) {
        let total = self.clip.total_ticks();
        if self.clip.looping {
            self.cursor = ((u64::from(self.cursor) + u64::from(dt)) % u64::from(total)) as u32;
        } else {
            let last = total - 1;
            self.cursor = self.cursor.saturating_add(dt).min(last);
            if self.cursor >= last {
                self.done = true;
            }
        }
    }

    pub fn frame_index(&self) -> usize {
        (self.cursor / self.clip.frame_duration) as usize % self.clip.frames.len()
    }

    pub fn current_frame(&self) -> &FrameImage {
        &self.clip.frames[self.frame_index()]
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn offset(&self) -> Vec2 {
        self.clip.offset
    }

    pub fn size_adjust(&self) -> Vec2 {
        self.clip.size_adjust
    }

    /// Size of the current frame after the clip's size adjustment.
    pub fn body_size(&self) -> Vec2 {
        self.current_frame().size() + self.clip.size_adjust
    }
}

/// Clips available to one entity, keyed by action name.
#[derive(Debug, Clone, Default)]
pub struct AnimationSet {
    entity: String,
    clips: BTreeMap<String, Arc<AnimationClip>>,
}

impl AnimationSet {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            clips: BTreeMap::new(),
        }
    }

    pub fn with_clip(mut self, action: impl Into<String>, clip: Arc<AnimationClip>) -> Self {
        self.insert(action, clip);
        self
    }

    pub fn insert(&mut self, action: impl Into<String>, clip: Arc<AnimationClip>) {
        self.clips.insert(action.into(), clip);
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn contains(&self, action: &str) -> bool {
        self.clips.contains_key(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    pub fn require(&self, actions: &[&str]) -> Result<(), AnimationError> {
        match actions.iter().find(|action| !self.contains(action)) {
            Some(action) => Err(self.missing(action)),
            None => Ok(()),
        }
    }

    /// Fresh playback state for `action`.
    pub fn instance(&self, action: &str) -> Result<Animation, AnimationError> {
        self.clips
            .get(action)
            .map(|clip| Animation::new(Arc::clone(clip)))
            .ok_or_else(|| self.missing(action))
    }

    fn missing(&self, action: &str) -> AnimationError {
        AnimationError::MissingAction {
            entity: self.entity.clone(),
            action: action.to_string(),
        }
    }
}
