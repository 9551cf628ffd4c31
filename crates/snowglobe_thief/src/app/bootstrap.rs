use std::env;

use engine::{compile_asset_registry, resolve_app_paths, AppError, LoopConfig, Scene, Vec2};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::SnowglobeScene;

const START_LEVEL_ENV_VAR: &str = "SNOWGLOBE_START_LEVEL";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GameConfig {
    pub(crate) display_size: (u32, u32),
    pub(crate) canvas_size: (u32, u32),
    /// Divisor on the remaining camera distance per tick; larger is slower.
    pub(crate) camera_speed: f64,
    pub(crate) tile_size: u32,
    pub(crate) start_level: u32,
    pub(crate) door_caption: String,
    pub(crate) caption_hold_seconds: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            display_size: (1000, 750),
            canvas_size: (160, 120),
            camera_speed: 13.0,
            tile_size: 16,
            start_level: 0,
            door_caption: "you left the north pole.".to_string(),
            caption_hold_seconds: 2.0,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            start_level: parse_start_level(env::var(START_LEVEL_ENV_VAR).ok().as_deref()),
            ..Self::default()
        }
    }

    pub(crate) fn display_vec(&self) -> Vec2 {
        Vec2::new(f64::from(self.display_size.0), f64::from(self.display_size.1))
    }

    pub(crate) fn canvas_vec(&self) -> Vec2 {
        Vec2::new(f64::from(self.canvas_size.0), f64::from(self.canvas_size.1))
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    info!("=== Snowglobe Thief Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        defs = %paths.defs_dir.display(),
        levels = %paths.levels_dir.display(),
        sprites = %paths.sprites_dir.display(),
        "startup_paths"
    );

    let registry = compile_asset_registry(&paths.defs_dir)?;
    info!(assets = registry.len(), "asset_registry_compiled");

    let game_config = GameConfig::from_env();
    let config = LoopConfig {
        window_width: game_config.display_size.0,
        window_height: game_config.display_size.1,
        canvas_width: game_config.canvas_size.0,
        canvas_height: game_config.canvas_size.1,
        sprites_dir: paths.sprites_dir.clone(),
        ..LoopConfig::default()
    };

    let start_level = game_config.start_level;
    let mut scene = SnowglobeScene::new(game_config, paths, registry)?;
    scene.load_level(start_level)?;

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_start_level(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return 0;
    };
    match raw.parse::<u32>() {
        Ok(level) => level,
        Err(error) => {
            warn!(
                var = START_LEVEL_ENV_VAR,
                value = raw,
                error = %error,
                "start_level_override_ignored"
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_level_override_parses_or_falls_back() {
        assert_eq!(parse_start_level(None), 0);
        assert_eq!(parse_start_level(Some(" 2 ")), 2);
        assert_eq!(parse_start_level(Some("")), 0);
        assert_eq!(parse_start_level(Some("-1")), 0);
        assert_eq!(parse_start_level(Some("north")), 0);
    }

    #[test]
    fn default_config_matches_canvas_and_display() {
        let config = GameConfig::default();
        assert_eq!(config.canvas_vec(), Vec2::new(160.0, 120.0));
        assert_eq!(config.display_vec(), Vec2::new(1000.0, 750.0));
        assert_eq!(config.camera_speed, 13.0);
    }
}
