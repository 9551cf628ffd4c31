use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start or end with '/'")]
    EdgeSlash,
    #[error("sprite key must not contain an empty segment")]
    EmptySegment,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Keys are relative, slash-separated, lowercase paths without extension.
pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(SpriteKeyError::EdgeSlash);
    }
    if key.contains("//") {
        return Err(SpriteKeyError::EmptySegment);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    if let Some(character) = key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        return Err(SpriteKeyError::InvalidCharacter { character });
    }
    Ok(())
}

/// `snow/3` under `sprites_dir` is `sprites_dir/snow/3.png`.
pub(crate) fn sprite_path(sprites_dir: &Path, key: &str) -> Result<PathBuf, SpriteKeyError> {
    validate_sprite_key(key)?;
    let mut path = sprites_dir.to_path_buf();
    path.extend(key.split('/'));
    path.set_extension("png");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_frame_keys() {
        for key in ["snow/0", "player/wall_slide/3", "snow_bg/12", "a-b/c_d"] {
            assert!(validate_sprite_key(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_invalid_keys() {
        for key in ["", "/a", "a/", "a//b", "..", "a/../b", r"a\b", "A", "a.b", "player@idle"] {
            assert!(validate_sprite_key(key).is_err(), "key={key}");
        }
    }

    #[test]
    fn path_appends_png_under_sprites_dir() {
        let path = sprite_path(Path::new("assets/sprites"), "door/idle/0").expect("path");
        assert_eq!(path, Path::new("assets/sprites/door/idle/0.png"));
        assert_eq!(
            sprite_path(Path::new("x"), "../etc"),
            Err(SpriteKeyError::ParentTraversal)
        );
    }
}
