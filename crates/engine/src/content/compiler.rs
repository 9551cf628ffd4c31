use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::debug;

use crate::sprite_keys::validate_sprite_key;
use crate::world::{AnimationClip, FrameImage, Vec2};

use super::registry::{AssetDef, AssetRegistry};

const DEFAULT_FRAME_DURATION: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInFile,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefType {
    ImageSet,
    Animation,
}

impl DefType {
    fn tag(self) -> &'static str {
        match self {
            DefType::ImageSet => "ImageSetDef",
            DefType::Animation => "AnimationDef",
        }
    }
}

/// Compiles every `*.xml` under `defs_dir`, in sorted path order, into one
/// registry. A def in a later file replaces the same def name from an
/// earlier one.
pub fn compile_asset_registry(defs_dir: &Path) -> Result<AssetRegistry, ContentCompileError> {
    let xml_files = collect_xml_files_sorted(defs_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut merged = BTreeMap::<String, AssetDef>::new();
    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        let defs = parse_defs_document(&xml_file, &raw)?;
        debug!(file = %xml_file.display(), defs = defs.len(), "defs_file_compiled");
        for def in defs {
            merged.insert(def.id.clone(), def);
        }
    }

    Ok(AssetRegistry::from_defs(merged.into_values()))
}

pub fn parse_defs_document(
    file_path: &Path,
    raw: &str,
) -> Result<Vec<AssetDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut seen_in_file = HashSet::<String>::new();
    let mut defs = Vec::<AssetDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        let def_type = match child.tag_name().name() {
            "ImageSetDef" => DefType::ImageSet,
            "AnimationDef" => DefType::Animation,
            other => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{other}>; expected <ImageSetDef> or <AnimationDef>"
                    ),
                    file_path,
                    &doc,
                    child,
                ))
            }
        };
        let def = parse_asset_def(def_type, file_path, &doc, child)?;
        if !seen_in_file.insert(def.id.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateDefInFile,
                format!("duplicate def '{}'; a file may define a defName only once", def.id),
                file_path,
                &doc,
                child,
            ));
        }
        defs.push(def);
    }

    Ok(defs)
}

fn parse_asset_def(
    def_type: DefType,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<AssetDef, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut tags = BTreeSet::<String>::new();
    let mut frame_size: Option<(u32, u32)> = None;
    let mut frame_count: Option<u32> = None;
    let mut frame_duration = DEFAULT_FRAME_DURATION;
    let mut offset = Vec2::ZERO;
    let mut size_adjust = Vec2::ZERO;
    let mut looping = true;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <{}>", field_name, def_type.tag()),
                file_path,
                doc,
                field,
            ));
        }

        match (def_type, field_name.as_str()) {
            (_, "defName") => {
                def_name = Some(required_text(file_path, doc, field, "defName")?);
            }
            (_, "tags") => {
                let value = field.text().unwrap_or_default();
                tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            (_, "frameSize") => {
                let value = required_text(file_path, doc, field, "frameSize")?;
                let (w, h) = parse_pair::<u32>(&value)
                    .filter(|(w, h)| *w > 0 && *h > 0)
                    .ok_or_else(|| {
                        invalid_value(
                            format!("frameSize '{value}' must be two positive integers 'w,h'"),
                            file_path,
                            doc,
                            field,
                        )
                    })?;
                frame_size = Some((w, h));
            }
            (_, "frameCount") => {
                let value = required_text(file_path, doc, field, "frameCount")?;
                let parsed = value
                    .parse::<u32>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| {
                        invalid_value(
                            format!("frameCount '{value}' must be a positive integer"),
                            file_path,
                            doc,
                            field,
                        )
                    })?;
                frame_count = Some(parsed);
            }
            (DefType::Animation, "frameDuration") => {
                let value = required_text(file_path, doc, field, "frameDuration")?;
                frame_duration = value
                    .parse::<u32>()
                    .ok()
                    .filter(|ticks| *ticks > 0)
                    .ok_or_else(|| {
                        invalid_value(
                            format!("frameDuration '{value}' must be a positive integer"),
                            file_path,
                            doc,
                            field,
                        )
                    })?;
            }
            (DefType::Animation, "offset") => {
                offset = required_vec2(file_path, doc, field, "offset")?;
            }
            (DefType::Animation, "sizeAdjust") => {
                size_adjust = required_vec2(file_path, doc, field, "sizeAdjust")?;
            }
            (DefType::Animation, "loop") => {
                let value = required_text(file_path, doc, field, "loop")?;
                looping = match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(invalid_value(
                            format!("loop '{value}' must be 'true' or 'false'"),
                            file_path,
                            doc,
                            field,
                        ))
                    }
                };
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <{}>", field_name, def_type.tag()),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let def_name = def_name.ok_or_else(|| missing_field("defName", def_type, file_path, doc, node))?;
    let (width, height) =
        frame_size.ok_or_else(|| missing_field("frameSize", def_type, file_path, doc, node))?;
    let frame_count =
        frame_count.ok_or_else(|| missing_field("frameCount", def_type, file_path, doc, node))?;
    validate_sprite_key(&frame_key(&def_name, 0)).map_err(|error| {
        invalid_value(
            format!("defName '{def_name}' does not form a valid sprite key: {error}"),
            file_path,
            doc,
            node,
        )
    })?;

    let frames = (0..frame_count)
        .map(|index| FrameImage::new(frame_key(&def_name, index), width, height))
        .collect::<Vec<_>>();

    match def_type {
        DefType::ImageSet => Ok(AssetDef::images(def_name, tags, frames)),
        DefType::Animation => {
            let clip = AnimationClip::new(frames, frame_duration, looping)
                .map_err(|error| invalid_value(error.to_string(), file_path, doc, node))?
                .with_offset(offset)
                .with_size_adjust(size_adjust);
            Ok(AssetDef::animation(def_name, tags, clip))
        }
    }
}

/// Sprite key for frame `index` of a def: `player@idle` frame 2 is
/// `player/idle/2`.
pub fn frame_key(def_name: &str, index: u32) -> String {
    format!("{}/{index}", def_name.replace('@', "/"))
}

fn parse_pair<T: std::str::FromStr>(raw: &str) -> Option<(T, T)> {
    let (a, b) = raw.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn required_vec2(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<Vec2, ContentCompileError> {
    let value = required_text(file_path, doc, node, field_name)?;
    parse_pair::<f64>(&value)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| Vec2::new(x, y))
        .ok_or_else(|| {
            invalid_value(
                format!("{field_name} '{value}' must be two numbers 'x,y'"),
                file_path,
                doc,
                node,
            )
        })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    field_name: &str,
    def_type: DefType,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    error_at_node(
        ContentErrorCode::MissingField,
        format!("missing required field <{}> in <{}>", field_name, def_type.tag()),
        file_path,
        doc,
        node,
    )
}

fn invalid_value(
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    error_at_node(ContentErrorCode::InvalidValue, message, file_path, doc, node)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| {
        normalize_rel_path(path.strip_prefix(root).unwrap_or(path.as_path()))
    });
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read defs: {source}"),
        file_path: path,
        location: None,
    }
}
