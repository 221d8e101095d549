use std::fs;
use std::path::Path;

use crate::{
    error::{PoseGenError, Result},
    models::SourceImage,
};

/// Reads an image file into a [`SourceImage`], inferring the MIME type from
/// the extension. Anything that is not `image/*` is rejected.
pub fn read_source_image(path: impl AsRef<Path>) -> Result<SourceImage> {
    let path = path.as_ref();

    let mime_type = mime_guess::from_path(path)
        .first_raw()
        .filter(|mime| mime.starts_with("image/"))
        .ok_or_else(|| {
            PoseGenError::InvalidInput(format!(
                "{} does not look like an image file.",
                path.display()
            ))
        })?;

    let bytes = fs::read(path).map_err(|e| {
        log::error!("Failed to read {}: {}", path.display(), e);
        PoseGenError::InvalidInput(format!("Could not read image file {}.", path.display()))
    })?;

    if bytes.is_empty() {
        return Err(PoseGenError::InvalidInput(format!(
            "{} is empty.",
            path.display()
        )));
    }

    log::debug!(
        "Loaded {} ({}, {} bytes)",
        path.display(),
        mime_type,
        bytes.len()
    );

    let mut source = SourceImage::from_bytes(&bytes, mime_type);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        source = source.with_name(name);
    }
    Ok(source)
}
