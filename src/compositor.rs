//! Compositing artwork onto backgrounds.
//!
//! The artwork's own alpha channel is the paste mask: transparent pixels let
//! the background through, opaque pixels replace it, and partial alpha blends
//! every channel as `(src * a + dst * (255 - a)) / 255`.

use crate::templates::TemplateImage;
use crate::{Error, Identifier, Result, SourceImage, TARGET_SIZE};
use image::{ImageFormat, Rgb, Rgba, RgbaImage};
use log::info;
use rand::Rng;
use std::io::Cursor;
use std::path::PathBuf;

/// Cell edge length of the grid background
pub const GRID_CELL: u32 = 25;
/// Maximum per-channel offset applied to each grid cell
pub const GRID_JITTER: u8 = 20;
/// Upward correction applied when centering on a tall template
pub const TEMPLATE_LIFT: i64 = 25;

/// Parameters of a jittered color grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub base: Rgb<u8>,
    /// Canvas side length
    pub size: u32,
    pub cell: u32,
    pub jitter: u8,
}

impl GridSpec {
    pub fn new(base: Rgb<u8>) -> Self {
        Self {
            base,
            size: TARGET_SIZE,
            cell: GRID_CELL,
            jitter: GRID_JITTER,
        }
    }
}

/// What the artwork is composited onto. Exactly one per composite.
#[derive(Debug, Clone)]
pub enum Background {
    Solid(Rgb<u8>),
    Grid(GridSpec),
    Template(TemplateImage),
}

/// A persisted composite
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub identifier: Identifier,
    pub image: RgbaImage,
    pub path: PathBuf,
}

impl CompositeResult {
    /// File name offered to the user when downloading.
    pub fn download_name(&self) -> String {
        download_name(&self.identifier)
    }

    /// PNG encoding of the composite for a download action.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| Error::RenderError(format!("PNG encoding failed: {}", e)))?;
        Ok(buf)
    }
}

pub fn download_name(identifier: &Identifier) -> String {
    format!("MHI-inscription-{}.png", identifier)
}

/// Renders composites and writes them under one output directory.
#[derive(Debug, Clone)]
pub struct Compositor {
    output_dir: PathBuf,
}

impl Compositor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path(&self, identifier: &Identifier) -> PathBuf {
        self.output_dir.join(download_name(identifier))
    }

    /// Render `source` over `background` and save it as PNG under a name
    /// derived from `identifier`.
    pub fn composite<R: Rng + ?Sized>(
        &self,
        source: &SourceImage,
        background: &Background,
        identifier: &Identifier,
        rng: &mut R,
    ) -> Result<CompositeResult> {
        let image = render(source, background, rng);

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_path(identifier);
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| Error::RenderError(format!("{}: {}", path.display(), e)))?;
        info!("wrote composite for inscription {} to {}", identifier, path.display());

        Ok(CompositeResult {
            identifier: identifier.clone(),
            image,
            path,
        })
    }
}

/// Render without touching the filesystem. Only the grid path draws from `rng`.
pub fn render<R: Rng + ?Sized>(source: &SourceImage, background: &Background, rng: &mut R) -> RgbaImage {
    let art = source.image.to_rgba8();

    let (mut canvas, offset) = match background {
        Background::Solid(color) => {
            let canvas = RgbaImage::from_pixel(art.width(), art.height(), opaque(*color));
            (canvas, (0, 0))
        }
        Background::Grid(spec) => (render_grid(spec, rng), (0, 0)),
        Background::Template(template) => {
            let canvas = template.image.clone();
            let offset = template_offset(canvas.dimensions(), art.dimensions());
            (canvas, offset)
        }
    };

    paste_masked(&mut canvas, &art, offset.0, offset.1);
    canvas
}

/// Fill a `spec.size` square canvas with cells of independently jittered color.
pub fn render_grid<R: Rng + ?Sized>(spec: &GridSpec, rng: &mut R) -> RgbaImage {
    let cell = spec.cell.max(1);
    let mut canvas = RgbaImage::new(spec.size, spec.size);

    for cy in (0..spec.size).step_by(cell as usize) {
        for cx in (0..spec.size).step_by(cell as usize) {
            let color = opaque(jitter(spec.base, spec.jitter, rng));
            for y in cy..(cy + cell).min(spec.size) {
                for x in cx..(cx + cell).min(spec.size) {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }
    canvas
}

fn jitter<R: Rng + ?Sized>(base: Rgb<u8>, amount: u8, rng: &mut R) -> Rgb<u8> {
    let amount = i16::from(amount);
    Rgb(base.0.map(|c| {
        let offset = rng.random_range(-amount..=amount);
        (i16::from(c) + offset).clamp(0, 255) as u8
    }))
}

/// Where the artwork lands on a template of `canvas` dimensions.
///
/// Tall templates get the artwork centered and lifted by [`TEMPLATE_LIFT`];
/// everything else pastes at the origin.
pub fn template_offset(canvas: (u32, u32), art: (u32, u32)) -> (i64, i64) {
    let (cw, ch) = (i64::from(canvas.0), i64::from(canvas.1));
    let (aw, ah) = (i64::from(art.0), i64::from(art.1));
    if canvas.1 > TARGET_SIZE {
        ((cw - aw) / 2, (ch - ah) / 2 - TEMPLATE_LIFT)
    } else {
        (0, 0)
    }
}

/// Paste `src` at (`x`, `y`) using its alpha as the mask. Pixels falling
/// outside `dst` are clipped.
pub fn paste_masked(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));

    for (sx, sy, px) in src.enumerate_pixels() {
        let mask = u32::from(px[3]);
        if mask == 0 {
            continue;
        }
        let (tx, ty) = (x + i64::from(sx), y + i64::from(sy));
        if tx < 0 || ty < 0 || tx >= dw || ty >= dh {
            continue;
        }

        let under = dst.get_pixel_mut(tx as u32, ty as u32);
        for ch in 0..4 {
            let blended = (u32::from(px[ch]) * mask + u32::from(under[ch]) * (255 - mask) + 127) / 255;
            under[ch] = blended as u8;
        }
    }
}

fn opaque(color: Rgb<u8>) -> Rgba<u8> {
    let [r, g, b] = color.0;
    Rgba([r, g, b, 255])
}
