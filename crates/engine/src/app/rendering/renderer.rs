use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{FrameSnapshot, SpriteDraw, TextDraw};
use crate::sprite_keys::sprite_path;
use crate::world::{Vec2, WipeOverlay};

const CLEAR_COLOR: [u8; 4] = [28, 30, 48, 255];
const WIPE_COLOR: [u8; 4] = [1, 1, 1, 255];
const TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];
const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;

#[derive(Debug, Clone)]
struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Canvas-resolution pixel target. `pixels` scales it up to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    canvas: (u32, u32),
    display: (u32, u32),
    sprites_dir: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        canvas: (u32, u32),
        display: (u32, u32),
        sprites_dir: PathBuf,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let canvas = (canvas.0.max(1), canvas.1.max(1));
        let pixels = Self::build_pixels(Arc::clone(&window), canvas, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            canvas,
            display: (display.0.max(1), display.1.max(1)),
            sprites_dir,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.canvas, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        canvas: (u32, u32),
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(canvas.0, canvas.1, surface)
    }

    pub fn render_frame(&mut self, snapshot: &FrameSnapshot) -> Result<(), Error> {
        let (width, height) = self.canvas;
        let display_to_canvas = width as f64 / self.display.0 as f64;
        let sprites_dir = self.sprites_dir.as_path();
        let sprite_cache = &mut self.sprite_cache;
        let warned = &mut self.warned_missing_sprite_keys;
        let frame = self.pixels.frame_mut();

        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let shake = (
            (snapshot.shake_offset.x * display_to_canvas).round() as i32,
            (snapshot.shake_offset.y * display_to_canvas).round() as i32,
        );
        let origin = (
            snapshot.camera_offset.0 - shake.0,
            snapshot.camera_offset.1 - shake.1,
        );

        for draw in snapshot.tiles.iter().chain(&snapshot.entities) {
            let sprite = resolve_cached_sprite(sprite_cache, warned, sprites_dir, &draw.key);
            draw_sprite_or_placeholder(frame, width, height, origin, draw, sprite);
        }
        for prompt in &snapshot.prompts {
            draw_prompt(frame, width, height, origin, prompt);
        }
        if let Some(overlay) = &snapshot.overlay {
            draw_wipe_overlay(frame, width, height, overlay);
        }

        self.pixels.render()
    }
}

fn world_to_canvas(position: Vec2, origin: (i32, i32)) -> (i32, i32) {
    (
        position.x.floor() as i32 - origin.0,
        position.y.floor() as i32 - origin.1,
    )
}

fn draw_sprite_or_placeholder(
    frame: &mut [u8],
    width: u32,
    height: u32,
    origin: (i32, i32),
    draw: &SpriteDraw,
    sprite: Option<&LoadedSprite>,
) {
    let (x, y) = world_to_canvas(draw.position, origin);
    match sprite {
        Some(sprite) => draw_sprite(frame, width, height, x, y, sprite, draw.flip),
        None => fill_rect_clipped(
            frame,
            width,
            height,
            x,
            y,
            draw.width as i32,
            draw.height as i32,
            placeholder_color(&draw.key),
        ),
    }
}

fn draw_prompt(frame: &mut [u8], width: u32, height: u32, origin: (i32, i32), prompt: &TextDraw) {
    let (x, y) = world_to_canvas(prompt.anchor, origin);
    draw_text_blocks(frame, width, height, &prompt.text, x, y - GLYPH_HEIGHT, TEXT_COLOR);
}

fn draw_wipe_overlay(frame: &mut [u8], width: u32, height: u32, overlay: &WipeOverlay) {
    let scale_x = width as f64 / overlay.display_size.x.max(1.0);
    let scale_y = height as f64 / overlay.display_size.y.max(1.0);
    let points = overlay
        .points
        .map(|point| (point.x * scale_x, point.y * scale_y));
    fill_polygon_scanline(frame, width, height, &points, WIPE_COLOR);

    let text_width = text_width_px(&overlay.caption);
    let cx = (overlay.caption_center.x * scale_x).round() as i32;
    let cy = (overlay.caption_center.y * scale_y).round() as i32;
    draw_text_blocks(
        frame,
        width,
        height,
        &overlay.caption,
        cx - text_width / 2,
        cy - GLYPH_HEIGHT / 2,
        TEXT_COLOR,
    );
}

/// Stable flat color per sprite key, so missing art stays distinguishable.
fn placeholder_color(key: &str) -> [u8; 4] {
    let hash = key
        .bytes()
        .fold(0x811c_9dc5_u32, |acc, byte| (acc ^ u32::from(byte)).wrapping_mul(0x0100_0193));
    [
        96 + (hash & 0x7f) as u8,
        96 + ((hash >> 8) & 0x7f) as u8,
        96 + ((hash >> 16) & 0x7f) as u8,
        255,
    ]
}

fn text_width_px(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        0
    } else {
        count * GLYPH_ADVANCE - 1
    }
}

/// Font rendering is out of scope; each visible glyph is a solid block.
fn draw_text_blocks(
    frame: &mut [u8],
    width: u32,
    height: u32,
    text: &str,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    for (index, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            continue;
        }
        let glyph_x = x + index as i32 * GLYPH_ADVANCE;
        fill_rect_clipped(frame, width, height, glyph_x, y, GLYPH_WIDTH, GLYPH_HEIGHT, color);
    }
}

/// Even-odd fill, sampling each row at its pixel center.
fn fill_polygon_scanline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    points: &[(f64, f64)],
    color: [u8; 4],
) {
    if points.len() < 3 {
        return;
    }
    let mut crossings = Vec::<f64>::with_capacity(points.len());
    for row in 0..height as i32 {
        let sample_y = row as f64 + 0.5;
        crossings.clear();
        for (index, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(index + 1) % points.len()];
            if (y0 <= sample_y && y1 > sample_y) || (y1 <= sample_y && y0 > sample_y) {
                let t = (sample_y - y0) / (y1 - y0);
                crossings.push(x0 + t * (x1 - x0));
            }
        }
        crossings.sort_by(f64::total_cmp);
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil() as i32;
            let end = (span[1] - 0.5).ceil() as i32;
            for x in start.max(0)..end.min(width as i32) {
                write_pixel_rgba_clipped(frame, width as usize, x, row, color);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + rect_width).min(width as i32);
    let bottom = (y + rect_height).min(height as i32);
    for py in top..bottom {
        for px in left..right {
            write_pixel_rgba_clipped(frame, width as usize, px, py, color);
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(byte_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn draw_sprite(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    sprite: &LoadedSprite,
    flip: bool,
) {
    if sprite.width == 0 || sprite.height == 0 {
        return;
    }
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.rgba.len() < expected_rgba_len {
        return;
    }

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + sprite.width as i32).min(width as i32);
    let draw_bottom = (top + sprite.height as i32).min(height as i32);
    let sprite_width = sprite.width as usize;

    for out_y in draw_top..draw_bottom {
        let src_y = (out_y - top) as usize;
        for out_x in draw_left..draw_right {
            let dx = (out_x - left) as usize;
            let src_x = if flip { sprite_width - 1 - dx } else { dx };
            let src_offset = (src_y * sprite_width + src_x) * 4;
            let alpha = sprite.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let mut color = [0u8; 4];
            color.copy_from_slice(&sprite.rgba[src_offset..src_offset + 4]);
            write_pixel_rgba_clipped(frame, width as usize, out_x, out_y, color);
        }
    }
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    sprites_dir: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match sprite_path(sprites_dir, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(warned_missing_sprite_keys, key, Some(&path), &reason);
                    None
                }
            },
            Err(error) => {
                let reason = format!("invalid_key:{error}");
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, &reason);
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}
