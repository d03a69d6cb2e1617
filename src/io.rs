use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use tracing::*;

use crate::GridError;

/// File extensions accepted as input, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A decoded image together with the container format it was read from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Whether the path has one of the [`SUPPORTED_EXTENSIONS`].
///
/// # Example
/// ```
/// use gridcut::io::is_supported_image;
///
/// assert!(is_supported_image("frames/cell_001.PNG"));
/// assert!(!is_supported_image("notes.txt"));
/// ```
pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Lists the supported image files directly inside `dir`, sorted by name.
pub fn list_image_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, GridError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| path_error(dir, &e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| path_error(dir, &e))?.path();
        if path.is_file() && is_supported_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    debug!("Found {} images in {}", files.len(), dir.display());
    Ok(files)
}

/// Decodes an image, guessing its format from the content rather than the name.
pub fn load_image(path: impl AsRef<Path>) -> Result<LoadedImage, GridError> {
    let path = path.as_ref();
    trace!("Decoding {}", path.display());
    let reader = ImageReader::open(path)
        .map_err(|e| image_error(path, ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| image_error(path, ImageError::IoError(e)))?;
    let format = reader.format();
    let image = reader.decode().map_err(|e| image_error(path, e))?;
    Ok(LoadedImage { image, format })
}

/// Writes `image` as a PNG file.
pub fn save_png(image: &DynamicImage, path: impl AsRef<Path>) -> Result<(), GridError> {
    let path = path.as_ref();
    trace!("Encoding {}", path.display());
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| GridError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Appends `.png` unless the path already ends with it, and checks that the
/// parent directory exists.
///
/// # Example
/// ```
/// use gridcut::io::normalize_output_path;
/// use std::path::PathBuf;
///
/// assert_eq!(normalize_output_path("merged").unwrap(), PathBuf::from("merged.png"));
/// assert_eq!(normalize_output_path("merged.PNG").unwrap(), PathBuf::from("merged.PNG"));
/// ```
pub fn normalize_output_path(path: impl AsRef<Path>) -> Result<PathBuf, GridError> {
    let path = path.as_ref();
    let has_png_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    let path = if has_png_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".png");
        PathBuf::from(name)
    };

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(GridError::Path {
                path: parent.to_path_buf(),
                reason: "folder does not exist".to_string(),
            })
        }
        _ => Ok(path),
    }
}

/// Name of the folder a split of `source` is written to.
///
/// # Example
/// ```
/// use gridcut::io::split_dir_name;
///
/// assert_eq!(split_dir_name("sheets/hero.png", "20240102_030405"), "hero_split_20240102_030405");
/// ```
pub fn split_dir_name(source: impl AsRef<Path>, timestamp: &str) -> String {
    let stem = source
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{stem}_split_{timestamp}")
}

/// Creates `{stem}_split_{timestamp}` under `root`, or next to `source` when no
/// root is given.
pub fn create_output_dir(
    source: impl AsRef<Path>,
    root: Option<&Path>,
    timestamp: &str,
) -> Result<PathBuf, GridError> {
    let source = source.as_ref();
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().map_err(|e| path_error(source, &e))?,
        },
    };
    let dir = root.join(split_dir_name(source, timestamp));
    fs::create_dir_all(&dir).map_err(|e| path_error(&dir, &e))?;
    info!("Created output folder {}", dir.display());
    Ok(dir)
}

/// Current UTC time as `yyyyMMdd_HHmmss`.
pub fn timestamp_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_timestamp(secs)
}

/// Formats seconds since the Unix epoch as `yyyyMMdd_HHmmss` (UTC).
///
/// # Example
/// ```
/// use gridcut::io::format_timestamp;
///
/// assert_eq!(format_timestamp(0), "19700101_000000");
/// assert_eq!(format_timestamp(951_782_400), "20000229_000000");
/// ```
pub fn format_timestamp(secs: u64) -> String {
    let days = secs / 86_400;
    let time_secs = secs % 86_400;
    let (hours, mins, secs) = (time_secs / 3600, (time_secs % 3600) / 60, time_secs % 60);

    let mut remaining_days = days;
    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let february = if is_leap_year(year) { 29 } else { 28 };
    let days_in_months = [31, february, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1;
    for days_in_month in days_in_months {
        if remaining_days < days_in_month {
            break;
        }
        remaining_days -= days_in_month;
        month += 1;
    }
    let day = remaining_days + 1;

    format!("{year:04}{month:02}{day:02}_{hours:02}{mins:02}{secs:02}")
}

fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn path_error(path: &Path, err: &std::io::Error) -> GridError {
    let reason = match err.kind() {
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::PermissionDenied => "access denied".to_string(),
        _ => err.to_string(),
    };
    GridError::Path {
        path: path.to_path_buf(),
        reason,
    }
}

fn image_error(path: &Path, err: ImageError) -> GridError {
    match err {
        ImageError::Limits(limit) => {
            GridError::ResourceExhausted(format!("{}: {limit}", path.display()))
        }
        ImageError::IoError(io)
            if matches!(io.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) =>
        {
            path_error(path, &io)
        }
        ImageError::IoError(io) if io.kind() == ErrorKind::OutOfMemory => {
            GridError::ResourceExhausted(format!("{}: {io}", path.display()))
        }
        source => GridError::Decode {
            path: path.to_path_buf(),
            source,
        },
    }
}
