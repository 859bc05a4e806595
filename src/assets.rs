use std::sync::Arc;

pub mod decode;
pub mod fonts;

pub use decode::ImageSource;
pub use fonts::{FontBook, ResolvedFace};

/// Decoded raster ready for drawing, stored as premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}
