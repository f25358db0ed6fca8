//! Textured-quad rasterizer front. The GPU owns region tables and the
//! per-frame pixel budget; actual pixels live behind the [`VideoSink`].

use log::trace;

use crate::common::bus::ControlBusDevice;
use crate::common::constants::GPU_CLEAR_SCREEN_COST;
use crate::common::constants::GPU_PIXEL_CAPACITY_PER_FRAME;
use crate::common::constants::GPU_REGIONS_PER_TEXTURE;
use crate::common::constants::GPU_TEXTURE_SIZE;
use crate::common::constants::SCREEN_HEIGHT;
use crate::common::constants::SCREEN_WIDTH;
use crate::common::word::Color;
use crate::common::word::Word;
use crate::components::cartridge::TextureAsset;

pub const PORT_COMMAND: i32 = 0;
pub const PORT_REMAINING_PIXELS: i32 = 1;
pub const PORT_CLEAR_COLOR: i32 = 2;
pub const PORT_MULTIPLY_COLOR: i32 = 3;
pub const PORT_ACTIVE_BLENDING: i32 = 4;
pub const PORT_SELECTED_TEXTURE: i32 = 5;
pub const PORT_SELECTED_REGION: i32 = 6;
pub const PORT_DRAWING_POINT_X: i32 = 7;
pub const PORT_DRAWING_POINT_Y: i32 = 8;
pub const PORT_DRAWING_SCALE_X: i32 = 9;
pub const PORT_DRAWING_SCALE_Y: i32 = 10;
pub const PORT_DRAWING_ANGLE: i32 = 11;
pub const PORT_REGION_MIN_X: i32 = 12;
pub const PORT_REGION_MIN_Y: i32 = 13;
pub const PORT_REGION_MAX_X: i32 = 14;
pub const PORT_REGION_MAX_Y: i32 = 15;
pub const PORT_REGION_HOTSPOT_X: i32 = 16;
pub const PORT_REGION_HOTSPOT_Y: i32 = 17;

pub const COMMAND_CLEAR_SCREEN: i32 = 1;
pub const COMMAND_DRAW_REGION: i32 = 2;
pub const COMMAND_DRAW_REGION_ZOOMED: i32 = 3;
pub const COMMAND_DRAW_REGION_ROTATED: i32 = 4;
pub const COMMAND_DRAW_REGION_ROTOZOOMED: i32 = 5;

/// The BIOS texture sits at this index in every selection port.
pub const BIOS_TEXTURE: i32 = -1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendingMode {
    #[default]
    Alpha = 0,
    Add = 1,
    Subtract = 2,
}

/// A rectangular sub-area of a texture. The hotspot is the pixel that
/// lands on the drawing point; it may hang outside the rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: GPU_TEXTURE_SIZE - 1,
            max_y: GPU_TEXTURE_SIZE - 1,
            hotspot_x: 0,
            hotspot_y: 0,
        }
    }
}

impl Region {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

struct TextureRecord {
    regions: Vec<Region>,
}

impl TextureRecord {
    fn new() -> Self {
        Self {
            regions: vec![Region::default(); GPU_REGIONS_PER_TEXTURE as usize],
        }
    }
}

/// Screen-space vertex with its texture-space coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

/// One textured quad, corners in top-left, top-right, bottom-right,
/// bottom-left order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub texture: i32,
    pub vertices: [QuadVertex; 4],
}

/// Host-side video capability, injected at construction. The GPU calls
/// straight through; buffering and actual rendering are the host's job.
pub trait VideoSink {
    fn clear_screen(&mut self, color: Color);
    fn draw_quad(&mut self, quad: &Quad);
    fn set_multiply_color(&mut self, color: Color);
    fn set_blending_mode(&mut self, mode: BlendingMode);
    fn select_texture(&mut self, texture: i32);
    fn load_texture(&mut self, texture: i32, asset: &TextureAsset);
    fn unload_cartridge_textures(&mut self);
}

pub struct Gpu {
    sink: Box<dyn VideoSink>,
    bios_texture: TextureRecord,
    cartridge_textures: Vec<TextureRecord>,
    clear_color: Color,
    multiply_color: Color,
    active_blending: BlendingMode,
    selected_texture: i32,
    selected_region: i32,
    drawing_point_x: i32,
    drawing_point_y: i32,
    drawing_scale_x: f32,
    drawing_scale_y: f32,
    drawing_angle: f32,
    remaining_pixels: i32,
}

impl Gpu {
    pub fn new(sink: Box<dyn VideoSink>) -> Self {
        let mut gpu = Self {
            sink,
            bios_texture: TextureRecord::new(),
            cartridge_textures: Vec::new(),
            clear_color: Color::default(),
            multiply_color: Color::new(255, 255, 255, 255),
            active_blending: BlendingMode::Alpha,
            selected_texture: BIOS_TEXTURE,
            selected_region: 0,
            drawing_point_x: 0,
            drawing_point_y: 0,
            drawing_scale_x: 1.0,
            drawing_scale_y: 1.0,
            drawing_angle: 0.0,
            remaining_pixels: GPU_PIXEL_CAPACITY_PER_FRAME,
        };
        gpu.reset();
        gpu
    }

    /// Back to power-on register state. Region tables are rebuilt and the
    /// sink is told about the restored render states.
    pub fn reset(&mut self) {
        self.bios_texture = TextureRecord::new();
        for texture in &mut self.cartridge_textures {
            *texture = TextureRecord::new();
        }
        self.clear_color = Color::default();
        self.multiply_color = Color::new(255, 255, 255, 255);
        self.active_blending = BlendingMode::Alpha;
        self.selected_texture = BIOS_TEXTURE;
        self.selected_region = 0;
        self.drawing_point_x = 0;
        self.drawing_point_y = 0;
        self.drawing_scale_x = 1.0;
        self.drawing_scale_y = 1.0;
        self.drawing_angle = 0.0;
        self.remaining_pixels = GPU_PIXEL_CAPACITY_PER_FRAME;
        self.sink.set_multiply_color(self.multiply_color);
        self.sink.set_blending_mode(self.active_blending);
        self.sink.select_texture(self.selected_texture);
    }

    /// Refills the draw budget; called by the console at each frame start.
    pub fn begin_frame(&mut self) {
        self.remaining_pixels = GPU_PIXEL_CAPACITY_PER_FRAME;
    }

    pub fn remaining_pixels(&self) -> i32 {
        self.remaining_pixels
    }

    pub fn texture_count(&self) -> i32 {
        self.cartridge_textures.len() as i32
    }

    /// Installs the resident firmware texture at index −1.
    pub fn load_bios_texture(&mut self, asset: &TextureAsset) {
        self.bios_texture = TextureRecord::new();
        self.sink.load_texture(BIOS_TEXTURE, asset);
    }

    pub fn load_cartridge_textures(&mut self, assets: &[TextureAsset]) {
        self.cartridge_textures = assets.iter().map(|_| TextureRecord::new()).collect();
        // a stale selection must not outlive the catalogue it pointed into
        self.selected_texture = BIOS_TEXTURE;
        for (index, asset) in assets.iter().enumerate() {
            self.sink.load_texture(index as i32, asset);
        }
    }

    pub fn unload_cartridge_textures(&mut self) {
        self.cartridge_textures.clear();
        self.selected_texture = BIOS_TEXTURE;
        self.sink.unload_cartridge_textures();
        self.sink.select_texture(self.selected_texture);
    }

    fn selected_texture_record(&mut self) -> &mut TextureRecord {
        if self.selected_texture == BIOS_TEXTURE {
            &mut self.bios_texture
        } else {
            &mut self.cartridge_textures[self.selected_texture as usize]
        }
    }

    fn region(&mut self) -> &mut Region {
        let index = self.selected_region as usize;
        &mut self.selected_texture_record().regions[index]
    }

    // -----------------------------------------------------------------
    // Commands

    fn execute_command(&mut self, value: Word) {
        match value.as_i32() {
            COMMAND_CLEAR_SCREEN => self.clear_screen(),
            COMMAND_DRAW_REGION => self.draw_region(false, false),
            COMMAND_DRAW_REGION_ZOOMED => self.draw_region(true, false),
            COMMAND_DRAW_REGION_ROTATED => self.draw_region(false, true),
            COMMAND_DRAW_REGION_ROTOZOOMED => self.draw_region(true, true),
            // unknown command codes are just ignored
            _ => {}
        }
    }

    fn clear_screen(&mut self) {
        if !self.consume_budget(GPU_CLEAR_SCREEN_COST as f64) {
            return;
        }
        self.sink.clear_screen(self.clear_color);
    }

    fn draw_region(&mut self, zoomed: bool, rotated: bool) {
        let region = *self.region();
        let scale_x = if zoomed { self.drawing_scale_x } else { 1.0 };
        let scale_y = if zoomed { self.drawing_scale_y } else { 1.0 };

        // budget cost approximates the emitted pixels by the region area
        // before rotation, scaled when zooming; mirrored regions (max
        // clamped below min) still cost their absolute area
        let area = (region.width() as f64 * region.height() as f64 * scale_x as f64
            * scale_y as f64)
            .abs();
        if !self.consume_budget(area.ceil()) {
            return;
        }

        let (sin, cos) = if rotated {
            self.drawing_angle.sin_cos()
        } else {
            (0.0, 1.0)
        };
        let mut vertices = [QuadVertex::default(); 4];
        let corners = [(0, 0), (region.width(), 0), (region.width(), region.height()), (0, region.height())];
        for (vertex, (dx, dy)) in vertices.iter_mut().zip(corners) {
            // place the hotspot on the drawing point, scale, then rotate
            // about the hotspot
            let local_x = (region.min_x - region.hotspot_x + dx) as f32 * scale_x;
            let local_y = (region.min_y - region.hotspot_y + dy) as f32 * scale_y;
            vertex.x = self.drawing_point_x as f32 + local_x * cos - local_y * sin;
            vertex.y = self.drawing_point_y as f32 + local_x * sin + local_y * cos;
            vertex.u = (region.min_x + dx) as f32;
            vertex.v = (region.min_y + dy) as f32;
        }

        let quad = Quad {
            texture: self.selected_texture,
            vertices,
        };
        trace!(target: "gpu", "draw quad {:?}", quad);
        self.sink.draw_quad(&quad);
    }

    /// Subtracts `cost` pixels from the frame budget. A draw that does not
    /// fit is dropped entirely and pins the budget to zero, which makes
    /// the throttle observable at the read port.
    fn consume_budget(&mut self, cost: f64) -> bool {
        if cost > self.remaining_pixels as f64 {
            self.remaining_pixels = 0;
            return false;
        }
        self.remaining_pixels -= cost as i32;
        true
    }
}

impl ControlBusDevice for Gpu {
    fn read_port(&mut self, port: i32) -> Word {
        match port {
            // command is write-only
            PORT_COMMAND => Word::ZERO,
            PORT_REMAINING_PIXELS => Word::from(self.remaining_pixels),
            PORT_CLEAR_COLOR => Word::from(self.clear_color),
            PORT_MULTIPLY_COLOR => Word::from(self.multiply_color),
            PORT_ACTIVE_BLENDING => Word::from(self.active_blending as i32),
            PORT_SELECTED_TEXTURE => Word::from(self.selected_texture),
            PORT_SELECTED_REGION => Word::from(self.selected_region),
            PORT_DRAWING_POINT_X => Word::from(self.drawing_point_x),
            PORT_DRAWING_POINT_Y => Word::from(self.drawing_point_y),
            PORT_DRAWING_SCALE_X => Word::from(self.drawing_scale_x),
            PORT_DRAWING_SCALE_Y => Word::from(self.drawing_scale_y),
            PORT_DRAWING_ANGLE => Word::from(self.drawing_angle),
            PORT_REGION_MIN_X => Word::from(self.region().min_x),
            PORT_REGION_MIN_Y => Word::from(self.region().min_y),
            PORT_REGION_MAX_X => Word::from(self.region().max_x),
            PORT_REGION_MAX_Y => Word::from(self.region().max_y),
            PORT_REGION_HOTSPOT_X => Word::from(self.region().hotspot_x),
            PORT_REGION_HOTSPOT_Y => Word::from(self.region().hotspot_y),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, port: i32, value: Word) {
        match port {
            PORT_COMMAND => self.execute_command(value),
            // read-only
            PORT_REMAINING_PIXELS => {}
            PORT_CLEAR_COLOR => self.clear_color = value.as_color(),
            PORT_MULTIPLY_COLOR => {
                self.multiply_color = value.as_color();
                self.sink.set_multiply_color(self.multiply_color);
            }
            PORT_ACTIVE_BLENDING => {
                // unknown blending mode codes are ignored, value unwritten
                let mode = match value.as_i32() {
                    0 => BlendingMode::Alpha,
                    1 => BlendingMode::Add,
                    2 => BlendingMode::Subtract,
                    _ => return,
                };
                self.active_blending = mode;
                self.sink.set_blending_mode(mode);
            }
            PORT_SELECTED_TEXTURE => {
                // prevent selecting a non-existent texture
                let index = value.as_i32();
                if index < BIOS_TEXTURE || index >= self.texture_count() {
                    return;
                }
                self.selected_texture = index;
                self.sink.select_texture(index);
            }
            PORT_SELECTED_REGION => {
                let index = value.as_i32();
                if !(0..GPU_REGIONS_PER_TEXTURE).contains(&index) {
                    return;
                }
                self.selected_region = index;
            }
            PORT_DRAWING_POINT_X => {
                self.drawing_point_x = value.as_i32().clamp(-1000, SCREEN_WIDTH + 1000);
            }
            PORT_DRAWING_POINT_Y => {
                self.drawing_point_y = value.as_i32().clamp(-1000, SCREEN_HEIGHT + 1000);
            }
            PORT_DRAWING_SCALE_X => {
                if let Some(scale) = accept_float(value) {
                    self.drawing_scale_x = scale;
                }
            }
            PORT_DRAWING_SCALE_Y => {
                if let Some(scale) = accept_float(value) {
                    self.drawing_scale_y = scale;
                }
            }
            PORT_DRAWING_ANGLE => {
                if let Some(angle) = accept_float(value) {
                    self.drawing_angle = angle;
                }
            }
            PORT_REGION_MIN_X => {
                self.region().min_x = clamp_to_texture(value);
            }
            PORT_REGION_MIN_Y => {
                self.region().min_y = clamp_to_texture(value);
            }
            PORT_REGION_MAX_X => {
                self.region().max_x = clamp_to_texture(value);
            }
            PORT_REGION_MAX_Y => {
                self.region().max_y = clamp_to_texture(value);
            }
            PORT_REGION_HOTSPOT_X => {
                self.region().hotspot_x = clamp_hotspot(value);
            }
            PORT_REGION_HOTSPOT_Y => {
                self.region().hotspot_y = clamp_hotspot(value);
            }
            _ => {}
        }
    }
}

/// Float ports discard non-finite writes and clamp the rest.
fn accept_float(value: Word) -> Option<f32> {
    let value = value.as_f32();
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(-1024.0, 1024.0))
}

fn clamp_to_texture(value: Word) -> i32 {
    value.as_i32().clamp(0, GPU_TEXTURE_SIZE - 1)
}

// hotspots may hang outside the texture, up to one texture size away
fn clamp_hotspot(value: Word) -> i32 {
    value
        .as_i32()
        .clamp(-GPU_TEXTURE_SIZE, 2 * GPU_TEXTURE_SIZE - 1)
}
