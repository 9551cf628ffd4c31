mod frame;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use frame::{FrameSnapshot, SpriteDraw, TextDraw};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::Renderer;
pub use scene::{InputSnapshot, Scene, SceneCommand};
