use base64::Engine;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("file is empty")]
    Empty,

    #[error("unsupported image format")]
    Unsupported,

    #[error("invalid image file: {0}")]
    Decode(String),
}

/// Upload bytes that decoded as a supported raster image.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ValidatedImage {
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            _ => "image/jpeg",
        }
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Checks that the bytes are a JPEG, PNG, GIF or WebP image that decodes cleanly.
pub fn validate(bytes: Vec<u8>) -> Result<ValidatedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    let format = image::guess_format(&bytes).map_err(|_| ImageError::Unsupported)?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(ImageError::Unsupported);
    }

    image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    Ok(ValidatedImage { bytes, format })
}
