use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
mod sprite_keys;
pub mod world;

pub use app::{
    run_app, AppError, FrameSnapshot, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot,
    Renderer, Scene, SceneCommand, SpriteDraw, TextDraw,
};
pub use content::{
    compile_asset_registry, AssetLookupError, AssetRegistry, ContentCompileError,
    ContentErrorCode, LevelError, SourceLocation,
};
pub use sprite_keys::SpriteKeyError;
pub use world::{
    Animation, AnimationClip, AnimationError, AnimationSet, Camera2D, Collisions, FrameImage,
    GridPos, OffgridTile, PhysicsEntity, PhysicsTuning, Rect, SpawnMarker, Tile, TileRules,
    Tilemap, TransitionEvent, TransitionRequest, TransitionSequencer, TransitionStage, Vec2,
    WipeOverlay,
};

pub const ROOT_ENV_VAR: &str = "SNOWGLOBE_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub defs_dir: PathBuf,
    pub levels_dir: PathBuf,
    pub sprites_dir: PathBuf,
}

impl AppPaths {
    /// Layout under `root`: `assets/base/{defs,levels,sprites}`.
    pub fn under_root(root: PathBuf) -> Self {
        let assets_dir = root.join("assets").join("base");
        Self {
            defs_dir: assets_dir.join("defs"),
            levels_dir: assets_dir.join("levels"),
            sprites_dir: assets_dir.join("sprites"),
            assets_dir,
            root,
        }
    }

    /// Level files are named by index, e.g. `levels/0.json`.
    pub fn level_path(&self, index: u32) -> PathBuf {
        self.levels_dir.join(format!("{index}.json"))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "SNOWGLOBE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/snowglobe-thief\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
    #[error("required asset directory is missing: {path}")]
    MissingDir { path: PathBuf },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::under_root(resolve_root()?);
    for dir in [&paths.defs_dir, &paths.levels_dir] {
        if !dir.is_dir() {
            return Err(StartupError::MissingDir { path: dir.clone() });
        }
    }
    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
