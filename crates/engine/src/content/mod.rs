mod compiler;
mod level;
mod registry;

pub use compiler::{
    compile_asset_registry, frame_key, parse_defs_document, ContentCompileError,
    ContentErrorCode, SourceLocation,
};
pub use level::{parse_level, read_level_file, LevelError, LoadedLevel};
pub use registry::{
    AssetDef, AssetKind, AssetLookupError, AssetRegistry, TAG_AUTOTILE, TAG_PHYSICS, TAG_TILE,
};
