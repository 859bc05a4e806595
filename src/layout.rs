pub mod text;

pub use text::{
    EstimateMeasurer, FaceSpec, FontWeight, SizeRange, TextMeasurer, fit_font_size, wrap_text,
};
