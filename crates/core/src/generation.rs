//! Generation request types, validation, and size resolution.
//!
//! A client request describes a batch of `quantity` images. After
//! validation it becomes a [`ValidatedGeneration`], which the dispatcher
//! fans out into one job row per image.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of images in one creation request.
pub const MAX_QUANTITY: i32 = 4;

/// Maximum number of reference images attached to one request.
pub const MAX_REFERENCE_IMAGES: u64 = 4;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: u64 = 4000;

/// Stored error messages are cut to this many characters.
pub const MAX_ERROR_CHARS: usize = 500;

/// A job still pending this long after creation is failed by the reconciler.
pub const JOB_TIMEOUT_MINUTES: i64 = 30;

/// Error message recorded on jobs failed by the timeout policy.
pub const TIMEOUT_ERROR: &str = "execution timed out";

/// Smallest and largest accepted edge for an explicit `WxH` size.
const MIN_EDGE_PX: u32 = 64;
const MAX_EDGE_PX: u32 = 8192;

// ---------------------------------------------------------------------------
// Job type
// ---------------------------------------------------------------------------

/// What kind of generation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TextToImage,
    ImageToImage,
}

impl JobType {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToImage => "text_to_image",
            Self::ImageToImage => "image_to_image",
        }
    }

    /// Parse the wire representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "text_to_image" => Ok(Self::TextToImage),
            "image_to_image" => Ok(Self::ImageToImage),
            other => Err(CoreError::Validation(format!(
                "Unknown job type '{other}'. Must be one of: text_to_image, image_to_image"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution tier
// ---------------------------------------------------------------------------

/// Requested output resolution class. Drives both price and pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "1K")]
    K1,
    #[serde(rename = "2K")]
    K2,
    #[serde(rename = "4K")]
    K4,
}

impl ResolutionTier {
    /// Parse a tier label. Missing or unrecognised labels fall back to 1K,
    /// so a bad label can never select a cheaper (or zero) price.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_uppercase()).as_deref() {
            Some("2K") => Self::K2,
            Some("4K") => Self::K4,
            _ => Self::K1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::K1 => "1K",
            Self::K2 => "2K",
            Self::K4 => "4K",
        }
    }

    /// Long edge of the generated image in pixels.
    pub fn long_edge_px(self) -> u32 {
        match self {
            Self::K1 => 1024,
            Self::K2 => 2048,
            Self::K4 => 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// Request DTO
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/generations`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGenerationRequest {
    pub job_type: String,
    #[validate(length(min = 1, max = MAX_PROMPT_CHARS))]
    pub prompt: String,
    /// Reference images, either data URIs or absolute URLs, in order.
    #[serde(default)]
    #[validate(length(max = MAX_REFERENCE_IMAGES))]
    pub reference_images: Vec<String>,
    #[validate(length(min = 1, max = 128))]
    pub model: String,
    /// Explicit `WIDTHxHEIGHT`; wins over `ratio` when both are given.
    pub size: Option<String>,
    /// Aspect ratio such as `16:9`.
    pub ratio: Option<String>,
    /// `1K`, `2K` or `4K`. Defaults to `1K`.
    pub resolution: Option<String>,
    #[validate(range(min = 1, max = MAX_QUANTITY))]
    pub quantity: i32,
}

/// A request that passed validation, with every field normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGeneration {
    pub job_type: JobType,
    pub prompt: String,
    pub reference_images: Vec<String>,
    pub model: String,
    pub size_ratio: Option<String>,
    pub tier: ResolutionTier,
    pub explicit_size: Option<String>,
    pub quantity: u32,
}

impl CreateGenerationRequest {
    /// Validate the request and normalise it.
    ///
    /// Rejects missing prompt/model, out-of-range quantity, an unknown
    /// job type, a request with neither an explicit size nor a ratio, and
    /// image-to-image requests without reference images.
    pub fn into_validated(self) -> Result<ValidatedGeneration, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let job_type = JobType::parse(self.job_type.trim())?;

        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(CoreError::Validation("Prompt must not be blank".into()));
        }

        let model = self.model.trim().to_string();
        if model.is_empty() {
            return Err(CoreError::Validation("Model must not be blank".into()));
        }

        let reference_images: Vec<String> = self
            .reference_images
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if job_type == JobType::ImageToImage && reference_images.is_empty() {
            return Err(CoreError::Validation(
                "image_to_image requires at least one reference image".into(),
            ));
        }
        for reference in &reference_images {
            validate_reference_image(reference)?;
        }

        let explicit_size = match self.size.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                parse_size(s)?;
                Some(s.to_ascii_lowercase())
            }
            _ => None,
        };

        let size_ratio = match self.ratio.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => {
                parse_ratio(r)?;
                Some(r.to_string())
            }
            _ => None,
        };

        if explicit_size.is_none() && size_ratio.is_none() {
            return Err(CoreError::Validation(
                "Either 'size' or 'ratio' must be provided".into(),
            ));
        }

        Ok(ValidatedGeneration {
            job_type,
            prompt,
            reference_images,
            model,
            size_ratio,
            tier: ResolutionTier::from_label(self.resolution.as_deref()),
            explicit_size,
            // Range-checked by the validator above.
            quantity: self.quantity as u32,
        })
    }
}

// ---------------------------------------------------------------------------
// Size helpers
// ---------------------------------------------------------------------------

/// Resolve the `WIDTHxHEIGHT` string for a job.
///
/// An explicit size wins. Otherwise the tier's long edge is applied to
/// the ratio's longer side. With neither, a square image is assumed.
pub fn resolve_size(explicit: Option<&str>, ratio: Option<&str>, tier: ResolutionTier) -> String {
    if let Some(size) = explicit {
        if parse_size(size).is_ok() {
            return size.to_ascii_lowercase();
        }
    }
    let (rw, rh) = ratio
        .and_then(|r| parse_ratio(r).ok())
        .unwrap_or((1, 1));
    let (w, h) = dimensions_for(rw, rh, tier);
    format!("{w}x{h}")
}

/// Pixel dimensions for a ratio at a tier. The short edge is rounded to a
/// multiple of 8.
pub fn dimensions_for(ratio_w: u32, ratio_h: u32, tier: ResolutionTier) -> (u32, u32) {
    let long = tier.long_edge_px();
    if ratio_w >= ratio_h {
        (long, round_to_8(long as u64 * ratio_h as u64 / ratio_w as u64))
    } else {
        (round_to_8(long as u64 * ratio_w as u64 / ratio_h as u64), long)
    }
}

fn round_to_8(value: u64) -> u32 {
    (((value + 4) / 8) * 8).max(8) as u32
}

/// Parse an aspect ratio such as `16:9`.
pub fn parse_ratio(value: &str) -> Result<(u32, u32), CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid ratio '{value}'. Expected W:H"));
    let (w, h) = value.split_once(':').ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 || w > 100 || h > 100 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Parse an explicit size such as `1024x768`.
pub fn parse_size(value: &str) -> Result<(u32, u32), CoreError> {
    let invalid = || {
        CoreError::Validation(format!(
            "Invalid size '{value}'. Expected WIDTHxHEIGHT between {MIN_EDGE_PX} and {MAX_EDGE_PX}"
        ))
    };
    let lowered = value.trim().to_ascii_lowercase();
    let (w, h) = lowered.split_once('x').ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    let in_range = |edge: u32| (MIN_EDGE_PX..=MAX_EDGE_PX).contains(&edge);
    if !in_range(w) || !in_range(h) {
        return Err(invalid());
    }
    Ok((w, h))
}

fn validate_reference_image(value: &str) -> Result<(), CoreError> {
    let lowered = value.to_ascii_lowercase();
    if lowered.starts_with("data:image/")
        || lowered.starts_with("https://")
        || lowered.starts_with("http://")
    {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Reference images must be data:image URIs or http(s) URLs".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Lifecycle helpers
// ---------------------------------------------------------------------------

/// Cut an error message to [`MAX_ERROR_CHARS`] characters for storage.
pub fn truncate_error(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_ERROR_CHARS).collect()
}

/// Whether a pending job created at `created_at` has exceeded the timeout.
pub fn is_timed_out(created_at: Timestamp, now: Timestamp) -> bool {
    now - created_at > chrono::Duration::minutes(JOB_TIMEOUT_MINUTES)
}

/// Mean of per-handle progress values, clamped to 0..=100.
pub fn mean_progress(values: &[i16]) -> i16 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().map(|v| i64::from((*v).clamp(0, 100))).sum();
    (sum / values.len() as i64) as i16
}
