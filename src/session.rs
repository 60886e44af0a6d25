//! Interactive state carried between rounds of user input.
//!
//! A UI layer owns a `SessionState`, hands it to [`run_round`] together with
//! the latest input, and keeps the state it gets back.

use crate::compositor::{Background, GridSpec};
use crate::pipeline::{BatchItem, Pipeline};
use crate::templates::TemplateCatalog;
use crate::{Fetcher, Result};
use image::Rgb;
use rand::Rng;

/// Which kind of background the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    ColorWheel,
    Grid,
    Templates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub selection: Selection,
    /// Last color picked; also the grid's base color
    pub color: Rgb<u8>,
    /// Index into the template catalog
    pub template: usize,
    /// Raw identifier input of the last round
    pub inscription: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selection: Selection::ColorWheel,
            color: Rgb([0, 0, 0]),
            template: 0,
            inscription: String::new(),
        }
    }
}

impl SessionState {
    /// The background the current selection stands for. Templates are loaded
    /// from `catalog` on every call.
    pub fn background(&self, catalog: &TemplateCatalog) -> Result<Background> {
        Ok(match self.selection {
            Selection::ColorWheel => Background::Solid(self.color),
            Selection::Grid => Background::Grid(GridSpec::new(self.color)),
            Selection::Templates => Background::Template(catalog.load(self.template)?),
        })
    }
}

/// Record `input` in the state and process it against the selected background.
///
/// If the background cannot be resolved (a missing template file, say) no
/// fetch happens and the whole input comes back as a single failed item.
pub fn run_round<F: Fetcher, R: Rng + ?Sized>(
    mut state: SessionState,
    input: &str,
    pipeline: &Pipeline<F>,
    catalog: &TemplateCatalog,
    rng: &mut R,
) -> (SessionState, Vec<BatchItem>) {
    state.inscription = input.trim().to_string();
    if state.inscription.is_empty() {
        return (state, Vec::new());
    }

    let items = match state.background(catalog) {
        Ok(background) => pipeline.process_batch(&state.inscription, &background, rng),
        Err(e) => vec![BatchItem {
            identifier: state.inscription.clone(),
            outcome: Err(e),
        }],
    };
    (state, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Compositor, Error, FetchConfig, Identifier, SourceImage};
    use image::{DynamicImage, Rgba, RgbaImage};

    struct Flat;

    impl Fetcher for Flat {
        fn new(_config: FetchConfig) -> Result<Self> {
            Ok(Flat)
        }

        fn fetch(&self, _identifier: &Identifier) -> Result<SourceImage> {
            Ok(SourceImage::new(DynamicImage::ImageRgba8(RgbaImage::new(500, 500))))
        }
    }

    #[test]
    fn defaults_match_first_render() {
        let state = SessionState::default();
        assert_eq!(state.selection, Selection::ColorWheel);
        assert_eq!(state.color, Rgb([0, 0, 0]));
        let bg = state.background(&TemplateCatalog::new("unused")).unwrap();
        assert!(matches!(bg, Background::Solid(Rgb([0, 0, 0]))));
    }

    #[test]
    fn grid_selection_uses_color_as_base() {
        let state = SessionState {
            selection: Selection::Grid,
            color: Rgb([1, 2, 3]),
            ..Default::default()
        };
        match state.background(&TemplateCatalog::new("unused")).unwrap() {
            Background::Grid(spec) => assert_eq!(spec, GridSpec::new(Rgb([1, 2, 3]))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn round_records_input_and_returns_results() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(Flat, Compositor::new(dir.path()));
        let catalog = TemplateCatalog::new(dir.path());
        let state = SessionState {
            color: Rgb([9, 9, 9]),
            ..Default::default()
        };

        let (state, items) = run_round(state, " 5,6 ", &pipeline, &catalog, &mut rand::rng());
        assert_eq!(state.inscription, "5,6");
        assert_eq!(items.len(), 2);
        let first = items[0].outcome.as_ref().unwrap();
        assert_eq!(first.image.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn missing_template_fails_the_round() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(Flat, Compositor::new(dir.path()));
        let catalog = TemplateCatalog::new(dir.path().join("templates"));
        let state = SessionState {
            selection: Selection::Templates,
            template: 3,
            ..Default::default()
        };

        let (state, items) = run_round(state, "7,8", &pipeline, &catalog, &mut rand::rng());
        assert_eq!(state.template, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].identifier, "7,8");
        assert!(matches!(items[0].outcome, Err(Error::Io(_))));
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(Flat, Compositor::new(dir.path()));
        let (state, items) = run_round(
            SessionState::default(),
            "",
            &pipeline,
            &TemplateCatalog::new(dir.path()),
            &mut rand::rng(),
        );
        assert!(items.is_empty());
        assert!(state.inscription.is_empty());
    }
}
