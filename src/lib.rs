//! Branded carousel slide rendering.
//!
//! A slide is described by a [`RenderRequest`] (text fragment, position in the
//! deck, brand colors, optional images) and painted by one of three templates
//! onto a CPU raster surface. [`generate_slide_image`] is the one-call entry
//! point; [`SlideRenderer`] and [`render_deck`] cover reuse and batching.
//!
//! ```no_run
//! use carousel::{Color, OutputFormat, RenderRequest, StyleName, generate_slide_image};
//!
//! let req = RenderRequest::new(
//!     "Ship small: Smaller releases ship faster",
//!     0,
//!     5,
//!     StyleName::Professional,
//!     Color::rgb(15, 23, 42),
//!     Color::WHITE,
//!     OutputFormat::Linkedin,
//! );
//! let png = generate_slide_image("professional", &req)?;
//! println!("{}", png.to_data_uri().len());
//! # Ok::<(), carousel::CarouselError>(())
//! ```
#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod content;
pub mod foundation;
pub mod layout;
pub mod model;
pub mod render;
pub mod template;

pub use assets::{FontBook, ImageSource};
pub use config::BrandingConfig;
pub use content::SlideContent;
pub use foundation::{
    core::{Canvas, Color},
    error::{CarouselError, CarouselResult},
};
pub use layout::{FontWeight, SizeRange};
pub use model::{OutputFormat, RenderRequest, StyleName, TextAlign};
pub use render::{
    CanvasSurface, DeckOptions, EncodedImage, ImageEncoding, RenderedSlide, SlideRenderer,
    export_file_name, generate_slide_image, render_deck,
};
pub use template::{SlideTemplate, StyleVariant};
