//! Optional external rasters: country flags and the brim text image.
//!
//! Each lives in an [`AssetSlot`]. A slot with no URL, a failed fetch or an
//! undecodable image all resolve to the 1x1 transparent fallback texture, so
//! the corresponding feature is simply not visible.

use compositing::surface::CpuSurface;
use compositing::texture::{RasterTexture, TextureUsage};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Invalid country code {0:?}, expected two ASCII letters")]
    InvalidCountryCode(String),
    #[error("No endpoint configured")]
    MissingEndpoint,
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Placeholder in flag endpoint templates.
pub const COUNTRY_CODE_PLACEHOLDER: &str = "{code}";

/// Flag image URL for a two-letter country code.
pub fn flag_url(template: Option<&str>, code: &str) -> Result<String, AssetError> {
    let template = template.ok_or(AssetError::MissingEndpoint)?;
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AssetError::InvalidCountryCode(code.to_string()));
    }
    Ok(template.replace(COUNTRY_CODE_PLACEHOLDER, &code.to_ascii_lowercase()))
}

/// Decode encoded image bytes into a texture.
pub fn decode_texture(bytes: &[u8], usage: TextureUsage) -> Result<RasterTexture, AssetError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(RasterTexture::new(
        CpuSurface::from_rgba8(&image),
        usage,
        compositing::constants::MAX_ANISOTROPY,
    ))
}

#[derive(Debug, Clone)]
enum SlotState {
    Idle,
    Pending,
    Ready(RasterTexture),
    Failed,
}

/// A lazily loaded optional raster.
#[derive(Debug, Clone)]
pub struct AssetSlot {
    url: Option<String>,
    usage: TextureUsage,
    state: SlotState,
    fallback: RasterTexture,
}

impl AssetSlot {
    pub fn new(url: Option<String>, usage: TextureUsage) -> Self {
        Self {
            url,
            usage,
            state: SlotState::Idle,
            fallback: RasterTexture::transparent_fallback(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Point the slot at a different URL. Any loaded raster is dropped.
    pub fn set_url(&mut self, url: Option<String>) {
        if self.url != url {
            self.url = url;
            self.state = SlotState::Idle;
        }
    }

    /// URL to fetch, returned once until the slot's URL changes.
    pub fn request(&mut self) -> Option<String> {
        if !matches!(self.state, SlotState::Idle) {
            return None;
        }
        let url = self.url.clone()?;
        self.state = SlotState::Pending;
        debug!("Requesting asset {url}");
        Some(url)
    }

    /// Apply a fetch result for `url`. Results for a URL the slot no longer
    /// points at are dropped.
    pub fn resolve(&mut self, url: &str, result: Result<Vec<u8>, AssetError>) {
        if self.url.as_deref() != Some(url) || !matches!(self.state, SlotState::Pending) {
            debug!("Dropping stale asset result for {url}");
            return;
        }
        self.state = match result.and_then(|bytes| decode_texture(&bytes, self.usage)) {
            Ok(texture) => SlotState::Ready(texture),
            Err(err) => {
                warn!("Asset {url} unavailable, using transparent fallback: {err}");
                SlotState::Failed
            }
        };
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SlotState::Ready(_))
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.state, SlotState::Failed)
    }

    /// Loaded texture, or the transparent fallback.
    pub fn texture(&self) -> &RasterTexture {
        match &self.state {
            SlotState::Ready(texture) => texture,
            SlotState::Idle | SlotState::Pending | SlotState::Failed => &self.fallback,
        }
    }
}
