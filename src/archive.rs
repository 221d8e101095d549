//! Zip packaging for a finished run's images.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    error::{PoseGenError, Result},
    models::GeneratedImage,
};

pub const ARCHIVE_FILE_NAME: &str = "generated_poses.zip";

/// Builds an in-memory zip with one `pose_<n>.png` entry per image, numbered
/// in the order given.
pub fn package_images(images: &[GeneratedImage]) -> Result<Vec<u8>> {
    let entries = images
        .iter()
        .enumerate()
        .map(|(index, image)| -> Result<(String, Vec<u8>)> {
            Ok((GeneratedImage::file_name(index), image.decode()?))
        })
        .collect::<Result<Vec<_>>>()
        .map_err(|e| PoseGenError::PackagingError(e.to_string()))?;

    package_entries(&entries)
}

fn package_entries(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| PoseGenError::PackagingError(format!("{}: {}", name, e)))?;
        writer
            .write_all(bytes)
            .map_err(|e| PoseGenError::PackagingError(format!("{}: {}", name, e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PoseGenError::PackagingError(e.to_string()))?;

    Ok(cursor.into_inner())
}

pub fn write_archive(path: impl AsRef<Path>, images: &[GeneratedImage]) -> Result<()> {
    let path = path.as_ref();
    let bytes = package_images(images)?;

    fs::write(path, &bytes).map_err(|e| {
        PoseGenError::PackagingError(format!("writing {}: {}", path.display(), e))
    })?;

    log::info!(
        "📦 Wrote {} images to {} ({} bytes)",
        images.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}
