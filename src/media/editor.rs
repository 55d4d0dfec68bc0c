//! Image Editor
//!
//! Applies crop and rotation edits with the `image` crate:
//! - Decoding and encoding run on a blocking thread
//! - The source file is never modified; the result is a new sibling file
//! - Only JPEG and PNG are accepted

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::GenericImageView;

use super::{EditDescriptor, ImageEditor, MediaError, MediaResult, RotationAngle};
use crate::ids;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const EDIT_MARKER: &str = "_edit_";

#[derive(Debug, Clone, Default)]
pub struct LocalImageEditor;

impl LocalImageEditor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageEditor for LocalImageEditor {
    async fn apply(&self, uri: &str, edit: &EditDescriptor) -> MediaResult<String> {
        if edit.is_empty() {
            return Err(MediaError::InvalidEdit(
                "Edit has neither crop nor rotation".to_string(),
            ));
        }

        let source = PathBuf::from(uri);
        let edit = edit.clone();
        let output = tokio::task::spawn_blocking(move || apply_edit(&source, &edit)).await??;

        Ok(output.to_string_lossy().to_string())
    }
}

fn apply_edit(source: &Path, edit: &EditDescriptor) -> MediaResult<PathBuf> {
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.display().to_string()));
    }

    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| MediaError::UnsupportedFormat("File has no extension".to_string()))?;

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(MediaError::UnsupportedFormat(format!(
            "Format '.{}' cannot be edited. Only JPEG and PNG are supported.",
            extension
        )));
    }

    let mut img = image::open(source)?;

    if let Some(crop) = edit.crop {
        let (width, height) = img.dimensions();
        let fits = crop.width > 0
            && crop.height > 0
            && crop.x.checked_add(crop.width).is_some_and(|right| right <= width)
            && crop.y.checked_add(crop.height).is_some_and(|bottom| bottom <= height);
        if !fits {
            return Err(MediaError::InvalidEdit(format!(
                "Crop {}x{}+{}+{} exceeds image bounds {}x{}",
                crop.width, crop.height, crop.x, crop.y, width, height
            )));
        }
        img = img.crop_imm(crop.x, crop.y, crop.width, crop.height);
    }

    if let Some(angle) = edit.rotation {
        img = match angle {
            RotationAngle::Rotate90 => img.rotate90(),
            RotationAngle::Rotate180 => img.rotate180(),
            RotationAngle::Rotate270 => img.rotate270(),
        };
    }

    let output = edited_path(source, &extension);
    if let Err(e) = img.save(&output) {
        // Cleanup partially written file
        let _ = std::fs::remove_file(&output);
        return Err(e.into());
    }

    let (new_width, new_height) = img.dimensions();
    log::info!(
        "Edited {} -> {} ({}x{})",
        source.display(),
        output.display(),
        new_width,
        new_height
    );

    Ok(output)
}

/// `<dir>/<stem>_edit_<id>.<ext>`, reusing the original stem on repeated edits.
fn edited_path(source: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("photo");
    let base = stem.split(EDIT_MARKER).next().unwrap_or(stem);
    source.with_file_name(format!("{}{}{}.{}", base, EDIT_MARKER, ids::new_id(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::CropRect;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn create_test_image(temp_dir: &TempDir, filename: &str, width: u32, height: u32) -> PathBuf {
        let path = temp_dir.path().join(filename);
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        img.save(&path).unwrap();
        path
    }

    fn uri(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_rotate_90_swaps_dimensions() {
        // GIVEN: A 40x20 image
        let temp_dir = TempDir::new().unwrap();
        let source = create_test_image(&temp_dir, "photo.png", 40, 20);

        // WHEN: Rotating 90 degrees
        let output = LocalImageEditor::new()
            .apply(&uri(&source), &EditDescriptor::rotate(RotationAngle::Rotate90))
            .await
            .unwrap();

        // THEN: A new file with swapped dimensions, original untouched
        assert_ne!(output, uri(&source));
        assert_eq!(image::open(&output).unwrap().dimensions(), (20, 40));
        assert_eq!(image::open(&source).unwrap().dimensions(), (40, 20));
    }

    #[tokio::test]
    async fn test_crop_then_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let source = create_test_image(&temp_dir, "photo.png", 40, 20);
        let edit = EditDescriptor::crop(CropRect {
            x: 10,
            y: 5,
            width: 20,
            height: 10,
        })
        .then_rotate(RotationAngle::Rotate270);

        let output = LocalImageEditor::new()
            .apply(&uri(&source), &edit)
            .await
            .unwrap();

        assert_eq!(image::open(&output).unwrap().dimensions(), (10, 20));
    }

    #[tokio::test]
    async fn test_crop_out_of_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let source = create_test_image(&temp_dir, "photo.png", 40, 20);
        let edit = EditDescriptor::crop(CropRect {
            x: 30,
            y: 0,
            width: 20,
            height: 10,
        });

        let result = LocalImageEditor::new().apply(&uri(&source), &edit).await;
        assert!(matches!(result, Err(MediaError::InvalidEdit(_))));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let bmp = create_test_image(&temp_dir, "photo.bmp", 8, 8);
        let edit = EditDescriptor::rotate(RotationAngle::Rotate180);
        let editor = LocalImageEditor::new();

        let result = editor.apply(&uri(&bmp), &edit).await;
        assert!(matches!(result, Err(MediaError::UnsupportedFormat(_))));

        let missing = temp_dir.path().join("missing.jpg");
        let result = editor.apply(&uri(&missing), &edit).await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));

        let result = editor
            .apply(&uri(&bmp), &EditDescriptor::default())
            .await;
        assert!(matches!(result, Err(MediaError::InvalidEdit(_))));
    }

    #[test]
    fn test_edited_path_keeps_original_stem() {
        let first = edited_path(Path::new("/media/photo_1.jpg"), "jpg");
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("photo_1_edit_"));
        assert!(name.ends_with(".jpg"));

        let second = edited_path(&first, "jpg");
        let name = second.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("photo_1_edit_"));
        assert_eq!(name.matches(EDIT_MARKER).count(), 1);
        assert_eq!(second.parent(), Some(Path::new("/media")));
    }
}
