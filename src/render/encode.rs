use std::{fmt, io::Cursor};

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{CarouselError, CarouselResult};

/// Portable encodings a finished surface can be serialized to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Png,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Encode a straight-alpha RGBA8 buffer.
///
/// `quality` in `[0, 1]` only affects JPEG; PNG is lossless.
pub fn encode_rgba8(
    width: u32,
    height: u32,
    rgba8: Vec<u8>,
    encoding: ImageEncoding,
    quality: f32,
) -> CarouselResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(width, height, rgba8)
        .ok_or_else(|| CarouselError::encode("rgba buffer does not match surface size"))?;

    let mut buf = Vec::new();
    match encoding {
        ImageEncoding::Png => {
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| CarouselError::encode(format!("png: {e}")))?;
        }
        ImageEncoding::Jpeg => {
            let q = jpeg_quality(quality);
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            image::DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buf, q,
                ))
                .map_err(|e| CarouselError::encode(format!("jpeg: {e}")))?;
        }
    }
    Ok(buf)
}

fn jpeg_quality(quality: f32) -> u8 {
    let q = if quality.is_finite() { quality } else { 1.0 };
    ((q.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
}

/// Encoded slide bytes plus the encoding they were produced with.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    encoding: ImageEncoding,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(encoding: ImageEncoding, bytes: Vec<u8>) -> Self {
        Self { encoding, bytes }
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn mime(&self) -> &'static str {
        self.encoding.mime()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Decode back into straight RGBA8 (width, height, pixels).
    pub fn decode_rgba8(&self) -> CarouselResult<(u32, u32, Vec<u8>)> {
        let img = image::load_from_memory(&self.bytes)
            .map_err(|e| CarouselError::encode(format!("decode encoded image: {e}")))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        Ok((w, h, img.into_raw()))
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("encoding", &self.encoding)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_encode_roundtrips_pixels() {
        let px = vec![10u8, 20, 30, 255, 40, 50, 60, 128];
        let bytes = encode_rgba8(2, 1, px.clone(), ImageEncoding::Png, 1.0).unwrap();
        let enc = EncodedImage::new(ImageEncoding::Png, bytes);
        let (w, h, back) = enc.decode_rgba8().unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(back, px);
    }

    #[test]
    fn jpeg_encode_produces_decodable_image() {
        let px = vec![200u8; 8 * 8 * 4];
        let bytes = encode_rgba8(8, 8, px, ImageEncoding::Jpeg, 0.9).unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
        let enc = EncodedImage::new(ImageEncoding::Jpeg, bytes);
        assert_eq!(enc.decode_rgba8().unwrap().0, 8);
    }

    #[test]
    fn mismatched_buffer_is_encode_error() {
        let err = encode_rgba8(4, 4, vec![0u8; 4], ImageEncoding::Png, 1.0).unwrap_err();
        assert!(matches!(err, CarouselError::Encode(_)));
    }

    #[test]
    fn data_uri_has_mime_prefix() {
        let enc = EncodedImage::new(ImageEncoding::Png, b"ABC".to_vec());
        assert_eq!(enc.to_data_uri(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn jpeg_quality_maps_unit_range() {
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(f32::NAN), 100);
        assert_eq!(jpeg_quality(0.92), 92);
    }
}
