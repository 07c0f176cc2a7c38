use image::GenericImageView;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MIN_DIMENSION: u32 = 50;
pub const MAX_DIMENSION: u32 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid file type")]
    UnsupportedExtension,
    #[error("File too large")]
    TooLarge,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("{0}")]
    InvalidDimensions(String),
}

/// True iff the filename carries an extension from the allow-set.
/// Matching is on the lowercased suffix after the last `.`.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Checks size, decodability and pixel dimensions, in that order.
/// The size ceiling is enforced before any decode attempt. The buffer is
/// only borrowed; callers re-read the same bytes for the real decode.
pub fn validate_image(data: &[u8]) -> Result<(), ValidationError> {
    if data.len() > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge);
    }

    let img = image::load_from_memory(data)
        .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width < MIN_DIMENSION {
        return Err(ValidationError::InvalidDimensions(format!(
            "Image too small: width {width} is below the minimum of {MIN_DIMENSION}"
        )));
    }
    if height < MIN_DIMENSION {
        return Err(ValidationError::InvalidDimensions(format!(
            "Image too small: height {height} is below the minimum of {MIN_DIMENSION}"
        )));
    }
    if width > MAX_DIMENSION {
        return Err(ValidationError::InvalidDimensions(format!(
            "Image too large: width {width} exceeds the maximum of {MAX_DIMENSION}"
        )));
    }
    if height > MAX_DIMENSION {
        return Err(ValidationError::InvalidDimensions(format!(
            "Image too large: height {height} exceeds the maximum of {MAX_DIMENSION}"
        )));
    }

    Ok(())
}
