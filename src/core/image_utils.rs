use std::path::{Path, PathBuf};

/**
 * Flat, row-major grayscale image. Each entry is one 8-bit intensity.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> PixelBuffer {
        assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize),
            "pixel count does not match the image dimensions"
        );
        PixelBuffer {
            width,
            height,
            pixels,
        }
    }

    pub fn filled(width: u32, height: u32, value: u8) -> PixelBuffer {
        let pixel_count = (width as usize) * (height as usize);
        PixelBuffer::new(width, height, vec![value; pixel_count])
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageIoError {
    #[error("unable to decode image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("unable to encode image {path:?}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("I/O error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/**
 * Decode an image file and collapse it to one intensity per pixel. Each gray value
 * is the integer average of the red, green and blue channels; alpha is ignored.
 */
pub fn load_grayscale_image(path: &Path) -> Result<PixelBuffer, ImageIoError> {
    let decoded = image::open(path).map_err(|source| ImageIoError::Decode {
        path: path.to_owned(),
        source,
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0;
            ((r as u16 + g as u16 + b as u16) / 3) as u8
        })
        .collect();
    Ok(PixelBuffer::new(width, height, pixels))
}

/**
 * Write the buffer as an 8-bit grayscale image. The container format is deduced
 * from the file extension. Missing parent directories are created.
 */
pub fn save_grayscale_image(buffer: &PixelBuffer, path: &Path) -> Result<(), ImageIoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ImageIoError::Io {
            path: parent.to_owned(),
            source,
        })?;
    }
    let image = image::GrayImage::from_raw(buffer.width, buffer.height, buffer.pixels.clone())
        .ok_or_else(|| ImageIoError::Encode {
            path: path.to_owned(),
            source: image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            )),
        })?;
    image.save(path).map_err(|source| ImageIoError::Encode {
        path: path.to_owned(),
        source,
    })
}
