//! Resizer module - Resize requests and their execution
//!
//! A [`ResizeRequest`] is built from the form input, checked, and handed to
//! a [`ResizeOrchestrator`] which reads the source, runs the resize
//! primitive and writes the result into the destination folder.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

use crate::file_ops::{Filesystem, FilesystemError, LocalFs};

/// Name of the output folder inside the user's home directory
pub const DESTINATION_DIR_NAME: &str = "imageresizer";

/// Largest width or height accepted from the form
pub const MAX_DIMENSION: u32 = 16_384;

/// ICO entries cannot be larger than this on either side
pub const ICO_MAX_DIMENSION: u32 = 256;

/// Extensions the compiled-in codecs can both decode and encode
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "ico", "webp"];

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidDimension {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Not a usable image file: {}", .0.display())]
    InvalidSource(PathBuf),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error("Resize failed: {0}")]
    Primitive(String),
    #[error("A resize to {} is already pending", .0.display())]
    AlreadyPending(PathBuf),
    #[error("The resizer is busy, try again shortly")]
    Busy,
    #[error("The resize worker has stopped")]
    Disconnected,
}

/// A single resize job, consumed once by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub id: Uuid,
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Overwritten by the request channel before the job is queued
    pub destination_folder: PathBuf,
}

impl ResizeRequest {
    pub fn new(image_path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_path,
            width,
            height,
            destination_folder: PathBuf::new(),
        }
    }

    /// Build a request from the raw text of the form fields
    pub fn from_input(image_path: &Path, width: &str, height: &str) -> Result<Self, ResizeError> {
        let width = parse_dimension("width", width)?;
        let height = parse_dimension("height", height)?;
        if !is_supported_image(image_path) {
            return Err(ResizeError::InvalidSource(image_path.to_path_buf()));
        }
        let limit = max_dimension_for(image_path);
        check_limit("width", width, limit)?;
        check_limit("height", height, limit)?;
        Ok(Self::new(image_path.to_path_buf(), width, height))
    }

    pub fn with_destination(mut self, destination_folder: PathBuf) -> Self {
        self.destination_folder = destination_folder;
        self
    }

    /// `destination_folder/<base name of image_path>`
    pub fn output_path(&self) -> Result<PathBuf, ResizeError> {
        let file_name = self
            .image_path
            .file_name()
            .ok_or_else(|| ResizeError::InvalidSource(self.image_path.clone()))?;
        Ok(self.destination_folder.join(file_name))
    }
}

/// Result of a successful resize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes_written: usize,
}

/// Parse a width or height typed by the user
pub fn parse_dimension(field: &'static str, value: &str) -> Result<u32, ResizeError> {
    let invalid = |reason: &str| ResizeError::InvalidDimension {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("a value is required"));
    }

    let parsed = match trimmed.parse::<u32>() {
        Ok(n) => n,
        Err(_) => {
            return Err(match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() && n <= 0.0 => invalid("must be greater than zero"),
                Ok(n) if n.is_finite() => invalid("must be a whole number of pixels"),
                _ => invalid("is not a number"),
            });
        }
    };

    if parsed == 0 {
        return Err(invalid("must be greater than zero"));
    }
    if parsed > MAX_DIMENSION {
        return Err(invalid(&format!("must not exceed {}", MAX_DIMENSION)));
    }
    Ok(parsed)
}

/// Largest width or height the output format can be encoded at
pub fn max_dimension_for(path: &Path) -> u32 {
    let is_ico = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ico"));
    if is_ico {
        ICO_MAX_DIMENSION
    } else {
        MAX_DIMENSION
    }
}

fn check_limit(field: &'static str, value: u32, limit: u32) -> Result<(), ResizeError> {
    if value > limit {
        return Err(ResizeError::InvalidDimension {
            field,
            value: value.to_string(),
            reason: format!("must not exceed {} for this image format", limit),
        });
    }
    Ok(())
}

/// Check the extension against the formats we can round-trip
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// `<home>/imageresizer`, or a temp-dir fallback when no home is known
pub fn destination_folder() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DESTINATION_DIR_NAME),
        None => {
            let fallback = std::env::temp_dir().join(DESTINATION_DIR_NAME);
            log::warn!(
                "No home directory found, writing to {}",
                fallback.display()
            );
            fallback
        }
    }
}

/// Converts encoded image bytes into encoded bytes of a new size
pub trait ResizePrimitive: Send + Sync {
    fn resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ResizeError>;
}

/// Resize primitive backed by the `image` crate.
///
/// The output keeps the encoding of the input. The aspect ratio is not
/// preserved: the result is exactly `width x height`.
pub struct ImageCrateResizer {
    filter: FilterType,
}

impl Default for ImageCrateResizer {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl ResizePrimitive for ImageCrateResizer {
    fn resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ResizeError> {
        let format = image::guess_format(bytes)
            .map_err(|e| ResizeError::Primitive(format!("Unrecognized image data: {}", e)))?;
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ResizeError::Primitive(format!("Failed to decode image: {}", e)))?;

        let resized = img.resize_exact(width, height, self.filter);

        // JPEG has no alpha channel
        let resized = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
            _ => resized,
        };

        let mut out = Cursor::new(Vec::new());
        resized.write_to(&mut out, format).map_err(|e| {
            ResizeError::Primitive(format!("Failed to encode {:?} image: {}", format, e))
        })?;
        Ok(out.into_inner())
    }
}

/// Coordinates the resize primitive and the filesystem for one request
pub struct ResizeOrchestrator<P = ImageCrateResizer, F = LocalFs> {
    primitive: P,
    fs: F,
}

impl Default for ResizeOrchestrator {
    fn default() -> Self {
        Self::new(ImageCrateResizer::default(), LocalFs)
    }
}

impl<P: ResizePrimitive, F: Filesystem> ResizeOrchestrator<P, F> {
    pub fn new(primitive: P, fs: F) -> Self {
        Self { primitive, fs }
    }

    /// Run a request to completion, logging and returning any failure
    pub fn resize(&self, request: &ResizeRequest) -> Result<ResizeOutcome, ResizeError> {
        match self.run(request) {
            Ok(outcome) => {
                log::info!(
                    "Resized {} to {}x{} -> {}",
                    request.image_path.display(),
                    outcome.width,
                    outcome.height,
                    outcome.output_path.display()
                );
                Ok(outcome)
            }
            Err(ResizeError::Filesystem(e)) if e.is_not_found() => {
                log::warn!("Source image not found: {}", request.image_path.display());
                Err(ResizeError::Filesystem(e))
            }
            Err(e) => {
                log::error!(
                    "Resize of {} failed: {}",
                    request.image_path.display(),
                    e
                );
                Err(e)
            }
        }
    }

    fn run(&self, request: &ResizeRequest) -> Result<ResizeOutcome, ResizeError> {
        if request.width == 0 {
            return Err(ResizeError::InvalidDimension {
                field: "width",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if request.height == 0 {
            return Err(ResizeError::InvalidDimension {
                field: "height",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let limit = max_dimension_for(&request.image_path);
        check_limit("width", request.width, limit)?;
        check_limit("height", request.height, limit)?;

        if !self.fs.exists(&request.image_path) {
            return Err(FilesystemError::not_found(&request.image_path).into());
        }
        let source = self.fs.read_all(&request.image_path)?;

        let resized = self
            .primitive
            .resize(&source, request.width, request.height)?;

        let output_path = request.output_path()?;
        self.fs.create_dir(&request.destination_folder)?;
        self.fs.write_all(&output_path, &resized)?;

        Ok(ResizeOutcome {
            output_path,
            width: request.width,
            height: request.height,
            bytes_written: resized.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_image(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    struct FailingPrimitive;

    impl ResizePrimitive for FailingPrimitive {
        fn resize(&self, _: &[u8], _: u32, _: u32) -> Result<Vec<u8>, ResizeError> {
            Err(ResizeError::Primitive("boom".to_string()))
        }
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("width", "200").unwrap(), 200);
        assert_eq!(parse_dimension("width", " 150 ").unwrap(), 150);
        assert_eq!(parse_dimension("width", "16384").unwrap(), MAX_DIMENSION);
    }

    #[test]
    fn test_parse_dimension_rejects_bad_input() {
        for bad in ["", "   ", "0", "abc", "12px", "-5", "1.5", "16385", "NaN"] {
            let err = parse_dimension("height", bad).unwrap_err();
            assert!(
                matches!(err, ResizeError::InvalidDimension { field: "height", .. }),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_input_checks_extension() {
        let err = ResizeRequest::from_input(Path::new("notes.txt"), "10", "10").unwrap_err();
        assert!(matches!(err, ResizeError::InvalidSource(_)));

        let req = ResizeRequest::from_input(Path::new("photo.JPG"), "10", "20").unwrap();
        assert_eq!((req.width, req.height), (10, 20));
    }

    #[test]
    fn test_ico_size_limit() {
        let err = ResizeRequest::from_input(Path::new("icon.ico"), "300", "200").unwrap_err();
        assert!(matches!(
            err,
            ResizeError::InvalidDimension { field: "width", .. }
        ));
        let err = ResizeRequest::from_input(Path::new("icon.ICO"), "16", "257").unwrap_err();
        assert!(matches!(
            err,
            ResizeError::InvalidDimension { field: "height", .. }
        ));

        let req = ResizeRequest::from_input(Path::new("icon.ico"), "256", "256").unwrap();
        assert_eq!((req.width, req.height), (256, 256));
        assert!(ResizeRequest::from_input(Path::new("photo.png"), "300", "200").is_ok());
    }

    #[test]
    fn test_ico_resize_within_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("icon.ico");
        image::RgbaImage::new(32, 32).save(&source).unwrap();
        let dest = tmp.path().join("out");
        let orchestrator = ResizeOrchestrator::default();

        let req = ResizeRequest::new(source.clone(), 16, 16).with_destination(dest.clone());
        let outcome = orchestrator.resize(&req).unwrap();
        assert_eq!(image::image_dimensions(&outcome.output_path).unwrap(), (16, 16));

        // Oversized requests are refused before anything is read or written
        let req = ResizeRequest::new(source, 300, 200).with_destination(tmp.path().join("big"));
        assert!(matches!(
            orchestrator.resize(&req),
            Err(ResizeError::InvalidDimension { field: "width", .. })
        ));
        assert!(!tmp.path().join("big").exists());
    }

    #[test]
    fn test_output_path_uses_base_name() {
        let req = ResizeRequest::new(PathBuf::from("/some/where/photo.jpg"), 1, 1)
            .with_destination(PathBuf::from("/home/u/imageresizer"));
        assert_eq!(
            req.output_path().unwrap(),
            PathBuf::from("/home/u/imageresizer/photo.jpg")
        );

        let req = ResizeRequest::new(PathBuf::from("/"), 1, 1);
        assert!(matches!(
            req.output_path(),
            Err(ResizeError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_destination_folder_name() {
        assert!(destination_folder().ends_with(DESTINATION_DIR_NAME));
    }

    #[test]
    fn test_resize_writes_exact_dimensions() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("photo.jpg");
        write_test_image(&source, 64, 48);
        let dest = tmp.path().join("imageresizer");

        let req = ResizeRequest::from_input(&source, "200", "150")
            .unwrap()
            .with_destination(dest.clone());
        let outcome = ResizeOrchestrator::default().resize(&req).unwrap();

        assert_eq!(outcome.output_path, dest.join("photo.jpg"));
        assert_eq!(
            image::image_dimensions(&outcome.output_path).unwrap(),
            (200, 150)
        );
        assert_eq!(
            image::ImageFormat::from_path(&outcome.output_path).unwrap(),
            image::guess_format(&fs::read(&outcome.output_path).unwrap()).unwrap()
        );
    }

    #[test]
    fn test_resize_twice_overwrites_identically() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("pic.png");
        write_test_image(&source, 30, 30);
        let dest = tmp.path().join("out");
        let orchestrator = ResizeOrchestrator::default();

        let req = ResizeRequest::new(source.clone(), 12, 8).with_destination(dest.clone());
        let first = orchestrator.resize(&req).unwrap();
        let first_bytes = fs::read(&first.output_path).unwrap();
        let second = orchestrator.resize(&req).unwrap();

        assert_eq!(first.output_path, second.output_path);
        assert_eq!(fs::read(&second.output_path).unwrap(), first_bytes);
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_destination_keeps_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("pic.png");
        write_test_image(&source, 10, 10);
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("other.png"), b"keep me").unwrap();

        let req = ResizeRequest::new(source, 5, 5).with_destination(dest.clone());
        ResizeOrchestrator::default().resize(&req).unwrap();

        assert_eq!(fs::read(dest.join("other.png")).unwrap(), b"keep me");
        assert_eq!(image::image_dimensions(dest.join("pic.png")).unwrap(), (5, 5));
    }

    #[test]
    fn test_missing_source_is_filesystem_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("out");
        let req = ResizeRequest::new(PathBuf::from("/nonexistent/x.png"), 10, 10)
            .with_destination(dest.clone());

        let err = ResizeOrchestrator::default().resize(&req).unwrap_err();
        match err {
            ResizeError::Filesystem(e) => assert!(e.is_not_found()),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_primitive_failure_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("pic.png");
        write_test_image(&source, 10, 10);
        let dest = tmp.path().join("out");

        let orchestrator = ResizeOrchestrator::new(FailingPrimitive, LocalFs);
        let req = ResizeRequest::new(source, 5, 5).with_destination(dest.clone());

        assert!(matches!(
            orchestrator.resize(&req),
            Err(ResizeError::Primitive(_))
        ));
        assert!(!dest.join("pic.png").exists());
    }

    #[test]
    fn test_non_image_bytes_rejected_by_primitive() {
        let err = ImageCrateResizer::default()
            .resize(b"definitely not an image", 10, 10)
            .unwrap_err();
        assert!(matches!(err, ResizeError::Primitive(_)));
    }

    #[test]
    fn test_zero_dimension_rejected_by_orchestrator() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("pic.png");
        write_test_image(&source, 10, 10);

        let req = ResizeRequest::new(source, 0, 5).with_destination(tmp.path().join("out"));
        assert!(matches!(
            ResizeOrchestrator::default().resize(&req),
            Err(ResizeError::InvalidDimension { field: "width", .. })
        ));
    }
}
