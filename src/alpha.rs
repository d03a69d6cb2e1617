//! Decides whether a merge canvas needs an alpha channel.
//!
//! The probe is a bounded heuristic: it looks at the first
//! [`ALPHA_PROBE_FILE_LIMIT`] inputs only, and for formats whose decoded pixels
//! carry no alpha it samples the top-left [`ALPHA_PROBE_SAMPLE_SIZE`] square.
//! Transparency outside that region or those files goes unnoticed.

use std::path::Path;

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use tracing::*;

use crate::io::{load_image, LoadedImage};

/// How many inputs are inspected at most.
pub const ALPHA_PROBE_FILE_LIMIT: usize = 5;
/// Side of the top-left square sampled per image.
pub const ALPHA_PROBE_SAMPLE_SIZE: u32 = 10;

/// Whether the decoded pixel layout carries an alpha channel.
pub fn format_implies_alpha(color: ColorType) -> bool {
    color.has_alpha()
}

/// Whether the container format can store per-pixel transparency at all.
pub fn format_may_encode_alpha(format: Option<ImageFormat>) -> bool {
    matches!(format, Some(ImageFormat::Png))
}

/// Whether any pixel in the top-left `max_x × max_y` block is not fully opaque.
///
/// # Example
/// ```
/// use gridcut::sampled_region_has_transparency;
/// use image::{DynamicImage, Rgba, RgbaImage};
///
/// let mut img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
/// img.put_pixel(15, 15, Rgba([0, 0, 0, 0]));
/// let img = DynamicImage::ImageRgba8(img);
///
/// assert!(!sampled_region_has_transparency(&img, 10, 10));
/// assert!(sampled_region_has_transparency(&img, 16, 16));
/// ```
pub fn sampled_region_has_transparency(image: &DynamicImage, max_x: u32, max_y: u32) -> bool {
    let (width, height) = image.dimensions();
    (0..width.min(max_x))
        .any(|x| (0..height.min(max_y)).any(|y| image.get_pixel(x, y)[3] < u8::MAX))
}

/// The bounds of the transparency probe.
///
/// # Example
/// ```
/// use gridcut::AlphaProbe;
///
/// let probe = AlphaProbe::default();
/// assert_eq!(probe.file_limit, 5);
/// assert_eq!(probe.sample_size, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaProbe {
    pub file_limit: usize,
    pub sample_size: u32,
}

impl Default for AlphaProbe {
    fn default() -> Self {
        Self::new(ALPHA_PROBE_FILE_LIMIT, ALPHA_PROBE_SAMPLE_SIZE)
    }
}

impl AlphaProbe {
    pub fn new(file_limit: usize, sample_size: u32) -> Self {
        Self {
            file_limit,
            sample_size,
        }
    }

    /// Whether a single decoded image shows transparency.
    ///
    /// The colour type decides in practice: image-rs expands PNG `tRNS` chunks
    /// into an alpha colour type. Sampling pixels is a fallback for decoders
    /// that hand back transparent PNG data without an alpha channel.
    pub fn image_has_alpha(&self, loaded: &LoadedImage) -> bool {
        if format_implies_alpha(loaded.image.color()) {
            return true;
        }
        format_may_encode_alpha(loaded.format)
            && sampled_region_has_transparency(&loaded.image, self.sample_size, self.sample_size)
    }

    /// Decodes up to `file_limit` of `paths` and reports whether any of them
    /// shows transparency. Files that fail to decode are skipped.
    pub fn requires_alpha<I, P>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let found = paths
            .into_iter()
            .take(self.file_limit)
            .any(|path| match load_image(path.as_ref()) {
                Ok(loaded) => self.image_has_alpha(&loaded),
                Err(e) => {
                    debug!("Skipping {} during alpha probe: {}", path.as_ref().display(), e);
                    false
                }
            });
        if found {
            info!("Transparency detected in images, it will be preserved in the result");
        }
        found
    }

    /// Same decision as [`AlphaProbe::requires_alpha`] over images already in memory.
    pub fn requires_alpha_in<'a, I>(&self, images: I) -> bool
    where
        I: IntoIterator<Item = &'a LoadedImage>,
    {
        images
            .into_iter()
            .take(self.file_limit)
            .any(|loaded| self.image_has_alpha(loaded))
    }
}

/// Probes `paths` with the default bounds.
pub fn requires_alpha<I, P>(paths: I) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    AlphaProbe::default().requires_alpha(paths)
}
