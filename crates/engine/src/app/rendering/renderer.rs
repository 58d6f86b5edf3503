use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use crate::content::local_asset_path;
use crate::runtime::{HeadlessRuntime, ObjectKind, RuntimeObject, SceneRuntime, Size, Vec2};

use super::canvas::{text_width, FrameCanvas, PixelRect, RgbaImage, GLYPH_HEIGHT, TEXT_SCALE};

const CLEAR_COLOR: [u8; 4] = [18, 20, 28, 255];
const OUTLINE_COLOR: [u8; 4] = [80, 220, 255, 255];
const HANDLE_FILL_COLOR: [u8; 4] = [255, 255, 255, 255];
const HANDLE_EDGE_COLOR: [u8; 4] = [30, 30, 30, 255];
const HUD_COLOR: [u8; 4] = [255, 255, 255, 255];
const STATUS_COLOR: [u8; 4] = [255, 230, 120, 255];
const OVERLAY_TITLE_COLOR: [u8; 4] = [255, 80, 80, 255];
const OVERLAY_BUTTON_COLOR: [u8; 4] = [60, 60, 72, 255];
const OVERLAY_DIM: f32 = 0.45;
const SPOTLIGHT_OUTSIDE: f32 = 0.15;
const TEXT_MARGIN: i32 = 16;

/// Decoded textures keyed by runtime texture key. A `None` entry means the
/// key was tried and the placeholder is used from then on.
pub(crate) struct ImageCache {
    asset_root: Option<PathBuf>,
    images: HashMap<String, Option<RgbaImage>>,
    warned: HashSet<String>,
}

impl ImageCache {
    pub(crate) fn new(asset_root: Option<PathBuf>) -> Self {
        Self {
            asset_root,
            images: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    fn resolve(&mut self, runtime: &HeadlessRuntime, key: &str) -> Option<&RgbaImage> {
        if !self.images.contains_key(key) {
            let loaded = self.load(runtime, key);
            self.images.insert(key.to_string(), loaded);
        }
        self.images.get(key).and_then(Option::as_ref)
    }

    fn load(&mut self, runtime: &HeadlessRuntime, key: &str) -> Option<RgbaImage> {
        let root = self.asset_root.as_deref()?;
        let source = runtime.texture_source(key)?;
        let Some(path) = local_asset_path(root, &source.url) else {
            self.warn_once(key, None, "remote_or_unresolved_url");
            return None;
        };
        match load_rgba(&path) {
            Ok(image) => Some(image),
            Err(reason) => {
                self.warn_once(key, Some(&path), &reason);
                None
            }
        }
    }

    fn warn_once(&mut self, key: &str, path: Option<&Path>, reason: &str) {
        if !self.warned.insert(key.to_string()) {
            return;
        }
        let path = path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        warn!(texture = key, path = %path, reason, "preview_texture_fallback");
    }

    /// The image to draw for `object`: its current spritesheet cell when the
    /// texture is a sheet, the whole image otherwise.
    fn image_for(&mut self, runtime: &HeadlessRuntime, object: &RuntimeObject) -> Option<Cow<'_, RgbaImage>> {
        let key = object.texture.as_deref()?;
        let frame = runtime.texture_source(key).and_then(|source| source.frame);
        let cell = object
            .animation
            .as_deref()
            .and_then(|animation| runtime.animation(animation))
            .map(|spec| spec.first_frame)
            .unwrap_or(0);
        let image = self.resolve(runtime, key)?;
        match frame {
            Some(frame) => image
                .frame(frame.width as u32, frame.height as u32, cell)
                .map(Cow::Owned),
            None => Some(Cow::Borrowed(image)),
        }
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(RgbaImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Stable colour for textures that have no decodable image.
fn placeholder_color(key: &str) -> [u8; 4] {
    let hash = key.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(0x0100_0193)
    });
    [
        96 + (hash & 0x7f) as u8,
        96 + ((hash >> 8) & 0x7f) as u8,
        96 + ((hash >> 16) & 0x7f) as u8,
        255,
    ]
}

fn object_rect(runtime: &HeadlessRuntime, handle: crate::runtime::ObjectHandle) -> Option<PixelRect> {
    let position = runtime.position(handle)?;
    let size = runtime.display_size(handle)?;
    Some(PixelRect::from_center(position.x, position.y, size.width, size.height))
}

/// Draws the runtime's visible objects, outline, HUD and overlay, plus an
/// optional status line along the bottom edge.
pub(crate) fn compose_frame(
    canvas: &mut FrameCanvas<'_>,
    runtime: &HeadlessRuntime,
    images: &mut ImageCache,
    status: Option<&str>,
) {
    canvas.clear(CLEAR_COLOR);
    let mut light: Option<(Vec2, f32)> = None;

    for handle in runtime.draw_order() {
        let Some(object) = runtime.object(handle) else {
            continue;
        };
        if !object.visible {
            continue;
        }
        match object.kind {
            ObjectKind::Sprite => {
                let Some(rect) = object_rect(runtime, handle) else {
                    continue;
                };
                match images.image_for(runtime, object) {
                    Some(image) => canvas.blit(&image, rect, object.flip_x, object.tint),
                    None => {
                        let key = object.texture.as_deref().unwrap_or_default();
                        canvas.fill_rect(rect, placeholder_color(key));
                    }
                }
            }
            ObjectKind::Marker { radius } => {
                let rect = PixelRect::from_center(
                    object.position.x,
                    object.position.y,
                    radius * 2.0,
                    radius * 2.0,
                );
                canvas.fill_rect(rect, HANDLE_FILL_COLOR);
                canvas.outline_rect(rect, 1, HANDLE_EDGE_COLOR);
            }
            ObjectKind::Light { radius } => light = Some((object.position, radius)),
        }
    }

    if let Some(rect) = runtime.outline().and_then(|handle| object_rect(runtime, handle)) {
        canvas.outline_rect(rect, 2, OUTLINE_COLOR);
    }
    if let Some((center, radius)) = light {
        canvas.spotlight(center.x, center.y, radius, SPOTLIGHT_OUTSIDE);
    }
    if let Some(text) = runtime.hud_text() {
        canvas.text(TEXT_MARGIN, TEXT_MARGIN, text, HUD_COLOR);
    }
    if let Some(text) = status {
        let y = canvas.height() as i32 - TEXT_MARGIN - GLYPH_HEIGHT * TEXT_SCALE;
        canvas.text(TEXT_MARGIN, y, text, STATUS_COLOR);
    }
    if let Some(overlay) = runtime.overlay() {
        canvas.dim(OVERLAY_DIM);
        let center_x = canvas.width() as i32 / 2;
        let center_y = canvas.height() as i32 / 2;
        let line = GLYPH_HEIGHT * TEXT_SCALE;
        canvas.text(
            center_x - text_width(&overlay.message) / 2,
            center_y - line * 2,
            &overlay.message,
            OVERLAY_TITLE_COLOR,
        );
        let label_width = text_width(&overlay.action_label);
        canvas.fill_rect(
            PixelRect {
                left: center_x - label_width / 2 - TEXT_MARGIN / 2,
                top: center_y + line - TEXT_MARGIN / 2,
                width: label_width + TEXT_MARGIN,
                height: line + TEXT_MARGIN,
            },
            OVERLAY_BUTTON_COLOR,
        );
        canvas.text(
            center_x - label_width / 2,
            center_y + line,
            &overlay.action_label,
            HUD_COLOR,
        );
    }
}

/// Presents the headless runtime in a window. The pixel buffer is sized to
/// the world so runtime coordinates map 1:1 onto buffer pixels.
pub struct Renderer {
    pixels: Pixels<'static>,
    world: Size,
    images: ImageCache,
}

impl Renderer {
    pub fn new(window: Arc<Window>, world: Size, asset_root: Option<PathBuf>) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window);
        let pixels = Pixels::new(world.width as u32, world.height as u32, surface)?;
        Ok(Self {
            pixels,
            world,
            images: ImageCache::new(asset_root),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Maps a physical cursor position onto world coordinates, clamping to
    /// the buffer edge when the cursor sits in the letterbox.
    pub fn window_to_world(&self, x: f32, y: f32) -> Vec2 {
        let (px, py) = self
            .pixels
            .window_pos_to_pixel((x, y))
            .unwrap_or_else(|outside| self.pixels.clamp_pixel_pos(outside));
        Vec2::new(px as f32, py as f32)
    }

    pub fn render(&mut self, runtime: &HeadlessRuntime, status: Option<&str>) -> Result<(), Error> {
        let width = self.world.width as u32;
        let height = self.world.height as u32;
        let mut canvas = FrameCanvas::new(self.pixels.frame_mut(), width, height);
        compose_frame(&mut canvas, runtime, &mut self.images, status);
        self.pixels.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{BodyKind, Overlay, SpriteSpec};

    fn draw(runtime: &HeadlessRuntime, status: Option<&str>) -> Vec<u8> {
        let world = runtime.world_size();
        let (width, height) = (world.width as u32, world.height as u32);
        let mut frame = vec![0; (width * height * 4) as usize];
        let mut canvas = FrameCanvas::new(&mut frame, width, height);
        compose_frame(&mut canvas, runtime, &mut ImageCache::new(None), status);
        frame
    }

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    fn sprite(runtime: &mut HeadlessRuntime, key: &str, x: f32, y: f32) -> crate::runtime::ObjectHandle {
        runtime.register_texture(key, Size::new(40.0, 20.0));
        runtime.create_sprite(SpriteSpec {
            position: Vec2::new(x, y),
            texture: key.to_string(),
            body: BodyKind::None,
        })
    }

    #[test]
    fn placeholder_color_is_stable_per_key() {
        assert_eq!(placeholder_color("EDIT_ground"), placeholder_color("EDIT_ground"));
        assert_ne!(placeholder_color("EDIT_ground"), placeholder_color("PLAY_ground"));
        assert_eq!(placeholder_color("x")[3], 255);
    }

    #[test]
    fn sprites_without_images_draw_as_placeholders() {
        let mut runtime = HeadlessRuntime::default();
        sprite(&mut runtime, "EDIT_box", 100.0, 100.0);
        let frame = draw(&runtime, None);

        assert_eq!(pixel(&frame, 800, 100, 100), placeholder_color("EDIT_box"));
        assert_eq!(pixel(&frame, 800, 300, 300), CLEAR_COLOR);
    }

    #[test]
    fn hidden_objects_are_skipped_and_outline_is_drawn() {
        let mut runtime = HeadlessRuntime::default();
        let shown = sprite(&mut runtime, "EDIT_a", 100.0, 100.0);
        let hidden = sprite(&mut runtime, "EDIT_b", 400.0, 400.0);
        runtime.set_visible(hidden, false);
        runtime.set_outline(Some(shown));
        let frame = draw(&runtime, None);

        assert_eq!(pixel(&frame, 800, 400, 400), CLEAR_COLOR);
        // 40×20 centred on (100, 100): left edge at x 80.
        assert_eq!(pixel(&frame, 800, 80, 100), OUTLINE_COLOR);
    }

    #[test]
    fn overlay_dims_the_scene() {
        let mut runtime = HeadlessRuntime::default();
        runtime.show_overlay(Overlay {
            message: "GAME OVER!".to_string(),
            action_label: "PLAY AGAIN".to_string(),
        });
        let frame = draw(&runtime, Some("PLAY"));
        let corner = pixel(&frame, 800, 799, 0);
        assert!(corner[0] < CLEAR_COLOR[0]);
        assert!(corner[2] < CLEAR_COLOR[2]);
    }
}
