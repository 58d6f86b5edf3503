//! RGBA8 frame drawing for the preview window. Everything clips to the frame
//! so callers can pass world-space rectangles straight through.

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 3;
pub(crate) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;

/// Decoded image pixels, row-major RGBA8.
#[derive(Debug, Clone)]
pub(crate) struct RgbaImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

impl RgbaImage {
    /// Copies out the `index`th `frame_width`×`frame_height` cell, reading
    /// cells left to right then top to bottom.
    pub(crate) fn frame(&self, frame_width: u32, frame_height: u32, index: u32) -> Option<RgbaImage> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }
        let columns = self.width / frame_width;
        let rows = self.height / frame_height;
        if columns == 0 || index >= columns * rows {
            return None;
        }
        let origin_x = (index % columns) * frame_width;
        let origin_y = (index / columns) * frame_height;
        let mut rgba = Vec::with_capacity((frame_width * frame_height * 4) as usize);
        for y in origin_y..origin_y + frame_height {
            let start = ((y * self.width + origin_x) * 4) as usize;
            let end = start + (frame_width * 4) as usize;
            rgba.extend_from_slice(self.rgba.get(start..end)?);
        }
        Some(RgbaImage {
            width: frame_width,
            height: frame_height,
            rgba,
        })
    }
}

/// Screen-space rectangle in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelRect {
    pub(crate) left: i32,
    pub(crate) top: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
}

impl PixelRect {
    pub(crate) fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            left: (cx - width * 0.5).round() as i32,
            top: (cy - height * 0.5).round() as i32,
            width: width.round().max(1.0) as i32,
            height: height.round().max(1.0) as i32,
        }
    }
}

pub(crate) struct FrameCanvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameCanvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        (offset + 4 <= self.frame.len()).then_some(offset)
    }

    pub(crate) fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut color = [0; 4];
        color.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(color)
    }

    pub(crate) fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.frame[offset..offset + 4].copy_from_slice(&color);
        }
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub(crate) fn fill_rect(&mut self, rect: PixelRect, color: [u8; 4]) {
        let start_x = rect.left.max(0);
        let start_y = rect.top.max(0);
        let end_x = (rect.left + rect.width).min(self.width as i32);
        let end_y = (rect.top + rect.height).min(self.height as i32);
        for y in start_y..end_y {
            for x in start_x..end_x {
                self.put(x, y, color);
            }
        }
    }

    pub(crate) fn outline_rect(&mut self, rect: PixelRect, thickness: i32, color: [u8; 4]) {
        let t = thickness.max(1);
        let PixelRect {
            left,
            top,
            width,
            height,
        } = rect;
        self.fill_rect(PixelRect { left, top, width, height: t }, color);
        self.fill_rect(
            PixelRect {
                left,
                top: top + height - t,
                width,
                height: t,
            },
            color,
        );
        self.fill_rect(PixelRect { left, top, width: t, height }, color);
        self.fill_rect(
            PixelRect {
                left: left + width - t,
                top,
                width: t,
                height,
            },
            color,
        );
    }

    /// Scales every channel except alpha by `factor` (0 black, 1 unchanged).
    pub(crate) fn dim(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        for pixel in self.frame.chunks_exact_mut(4) {
            for channel in &mut pixel[..3] {
                *channel = (*channel as f32 * factor) as u8;
            }
        }
    }

    /// Darkens everything outside the circle at (`cx`, `cy`).
    pub(crate) fn spotlight(&mut self, cx: f32, cy: f32, radius: f32, outside: f32) {
        let radius_sq = radius * radius;
        let factor = outside.clamp(0.0, 1.0);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= radius_sq {
                    continue;
                }
                if let Some(offset) = self.offset(x, y) {
                    for channel in &mut self.frame[offset..offset + 3] {
                        *channel = (*channel as f32 * factor) as u8;
                    }
                }
            }
        }
    }

    /// Nearest-neighbour blit of `image` stretched over `rect`. Fully
    /// transparent source pixels are skipped; `tint` multiplies RGB.
    pub(crate) fn blit(&mut self, image: &RgbaImage, rect: PixelRect, flip_x: bool, tint: Option<u32>) {
        if image.width == 0 || image.height == 0 || rect.width <= 0 || rect.height <= 0 {
            return;
        }
        if image.rgba.len() < (image.width * image.height * 4) as usize {
            return;
        }
        let tint = tint.map(unpack_rgb);
        for out_y in rect.top.max(0)..(rect.top + rect.height).min(self.height as i32) {
            let dy = out_y - rect.top;
            let src_y = ((dy as i64 * image.height as i64) / rect.height as i64) as u32;
            let src_y = src_y.min(image.height - 1);
            for out_x in rect.left.max(0)..(rect.left + rect.width).min(self.width as i32) {
                let mut dx = out_x - rect.left;
                if flip_x {
                    dx = rect.width - 1 - dx;
                }
                let src_x = ((dx as i64 * image.width as i64) / rect.width as i64) as u32;
                let src_x = src_x.min(image.width - 1);
                let src = ((src_y * image.width + src_x) * 4) as usize;
                let alpha = image.rgba[src + 3];
                if alpha == 0 {
                    continue;
                }
                let mut color = [image.rgba[src], image.rgba[src + 1], image.rgba[src + 2], 255];
                if let Some(tint) = tint {
                    for (channel, factor) in color.iter_mut().zip(tint) {
                        *channel = ((*channel as u16 * factor as u16) / 255) as u8;
                    }
                }
                self.put(out_x, out_y, color);
            }
        }
    }

    pub(crate) fn text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        let mut pen_x = x;
        for ch in text.chars() {
            let rows = glyph_rows(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    self.fill_rect(
                        PixelRect {
                            left: pen_x + col * TEXT_SCALE,
                            top: y + row as i32 * TEXT_SCALE,
                            width: TEXT_SCALE,
                            height: TEXT_SCALE,
                        },
                        color,
                    );
                }
            }
            pen_x += GLYPH_ADVANCE;
        }
    }
}

pub(crate) fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

pub(crate) fn unpack_rgb(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

/// 3×5 bitmap rows, most significant bit leftmost. Lowercase folds to
/// uppercase; anything unknown draws as a box.
fn glyph_rows(ch: char) -> [u8; GLYPH_HEIGHT as usize] {
    match ch.to_ascii_uppercase() {
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b110, 0b001, 0b010, 0b000, 0b010],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '[' => [0b011, 0b010, 0b010, 0b010, 0b011],
        ']' => [0b110, 0b010, 0b010, 0b010, 0b110],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        _ => [0b111, 0b101, 0b101, 0b101, 0b111],
    }
}
