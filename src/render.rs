//! CPU raster pipeline: drawing surface, compositing helpers, encoding, and
//! the slide/deck entry points.

pub mod blur;
pub mod composite;
pub mod deck;
pub mod encode;
pub mod pipeline;
pub mod surface;
pub(crate) mod text;

pub use deck::{DeckOptions, export_file_name, render_deck};
pub use encode::{EncodedImage, ImageEncoding};
pub use pipeline::{RenderedSlide, SlideRenderer, generate_slide_image};
pub use surface::{
    CanvasSurface, Shadow, Shape, ShapePaint, StrokeStyle, TextBlock, TextRun, TextSpec,
};
