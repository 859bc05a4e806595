use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{
    assets::PreparedImage,
    foundation::error::{CarouselError, CarouselResult},
    render::composite::premultiply_rgba8_in_place,
};

/// Where a logo or background image comes from.
///
/// Strings starting with `data:` are data URIs; anything else is a filesystem path.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    DataUri(String),
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl ImageSource {
    pub fn from_reference(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        if reference.trim_start().starts_with("data:") {
            Self::DataUri(reference)
        } else {
            Self::Path(PathBuf::from(reference))
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Short human-readable description, never the full payload.
    pub fn describe(&self) -> String {
        match self {
            Self::DataUri(uri) => {
                let header = uri.split(',').next().unwrap_or("data:");
                format!("{header},<{} bytes>", uri.len())
            }
            Self::Path(p) => p.display().to_string(),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    pub fn read_bytes(&self) -> CarouselResult<Vec<u8>> {
        match self {
            Self::DataUri(uri) => decode_data_uri(uri),
            Self::Path(p) => read_path(p),
            Self::Bytes(b) => Ok(b.to_vec()),
        }
    }

    /// Load and decode the image.
    ///
    /// SVG documents are rasterized at `target` when given and at their own
    /// viewbox size otherwise.
    pub fn load(&self, target: Option<(u32, u32)>) -> CarouselResult<PreparedImage> {
        let bytes = self.read_bytes()?;
        let prepared = if looks_like_svg(&bytes) {
            rasterize_svg(&bytes, target)
        } else {
            decode_image(&bytes)
        };
        prepared.map_err(|e| match e {
            CarouselError::ImageLoad(msg) => {
                CarouselError::image_load(format!("{}: {msg}", self.describe()))
            }
            other => other,
        })
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageSource").field(&self.describe()).finish()
    }
}

impl Serialize for ImageSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::DataUri(uri) => serializer.serialize_str(uri),
            Self::Path(p) => serializer.collect_str(&p.display()),
            Self::Bytes(b) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(b);
                serializer.serialize_str(&format!("data:application/octet-stream;base64,{encoded}"))
            }
        }
    }
}

impl<'de> Deserialize<'de> for ImageSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Err(serde::de::Error::custom("image reference must be non-empty"));
        }
        Ok(Self::from_reference(s))
    }
}

pub fn decode_image(bytes: &[u8]) -> CarouselResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| CarouselError::image_load(format!("decode failed: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CarouselError::image_load("image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn rasterize_svg(bytes: &[u8], target: Option<(u32, u32)>) -> CarouselResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| CarouselError::image_load(format!("svg parse failed: {e}")))?;

    let size = tree.size();
    let (width, height) = match target {
        Some((w, h)) if w > 0 && h > 0 => (w, h),
        _ => (
            size.width().ceil().max(1.0) as u32,
            size.height().ceil().max(1.0) as u32,
        ),
    };

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CarouselError::allocation("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

fn read_path(path: &Path) -> CarouselResult<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("read image file {}", path.display()))
        .map_err(|e| CarouselError::image_load(format!("{e:#}")))
}

fn decode_data_uri(uri: &str) -> CarouselResult<Vec<u8>> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| CarouselError::image_load("data uri must start with \"data:\""))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CarouselError::image_load("data uri is missing ','"))?;

    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| CarouselError::image_load(format!("invalid base64 payload: {e}")))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(s: &str) -> CarouselResult<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| CarouselError::image_load("invalid percent escape in data uri"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}
