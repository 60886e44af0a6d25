//! The fixed catalog of pre-supplied background templates

use crate::{Error, Result};
use image::RgbaImage;
use std::path::PathBuf;

/// Template file names, in picker order.
pub const TEMPLATE_FILES: [&str; 5] = ["0.jpeg", "1.jpeg", "2.jpeg", "3.jpeg", "4.png"];

/// A decoded template, ready to be composited onto
#[derive(Debug, Clone)]
pub struct TemplateImage {
    pub index: usize,
    pub image: RgbaImage,
}

/// Resolves template indices to files under a single directory.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    dir: PathBuf,
}

impl TemplateCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, index: usize) -> Result<PathBuf> {
        TEMPLATE_FILES
            .get(index)
            .map(|name| self.dir.join(name))
            .ok_or(Error::UnknownTemplate(index))
    }

    /// Decode template `index` as RGBA.
    pub fn load(&self, index: usize) -> Result<TemplateImage> {
        let path = self.path(index)?;
        let bytes = std::fs::read(&path)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| Error::DecodeError(format!("{}: {}", path.display(), e)))?
            .to_rgba8();
        Ok(TemplateImage { index, image })
    }
}
