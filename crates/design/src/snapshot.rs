//! Shareable design snapshots.
//!
//! A design is serialized to JSON, base64 encoded and carried in a single
//! URL query parameter. Decoding fails closed: anything malformed yields
//! `None` and the caller falls back to defaults.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use tracing::{debug, warn};

use crate::error::DesignError;
use crate::types::HatDesign;

/// Query parameter holding the encoded snapshot
pub const SNAPSHOT_PARAM: &str = "d";

/// Encode a design after stripping session-local object URLs.
pub fn encode_design(design: &HatDesign) -> Result<String, DesignError> {
    let json = serde_json::to_vec(&design.sanitized())?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a snapshot, returning `None` for malformed or truncated input.
pub fn decode_design(encoded: &str) -> Option<HatDesign> {
    match try_decode_design(encoded) {
        Ok(design) => Some(design),
        Err(err) => {
            warn!("Discarding design snapshot: {err}");
            None
        }
    }
}

/// Decode a snapshot, reporting why it was rejected.
///
/// Accepts the URL-safe alphabet produced by [`encode_design`] as well as
/// standard padded base64.
pub fn try_decode_design(encoded: &str) -> Result<HatDesign, DesignError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(DesignError::Empty);
    }
    let bytes = match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => bytes,
        Err(url_safe_err) => STANDARD.decode(trimmed).map_err(|_| url_safe_err)?,
    };
    let design = serde_json::from_slice(&bytes)?;
    debug!("Decoded design snapshot ({} bytes)", bytes.len());
    Ok(design)
}

/// Build the `d=<snapshot>` query fragment for a design.
pub fn snapshot_query(design: &HatDesign) -> Result<String, DesignError> {
    Ok(format!("{SNAPSHOT_PARAM}={}", encode_design(design)?))
}

/// Find the snapshot parameter in a query string (with or without leading `?`) and decode it.
pub fn design_from_query(query: &str) -> Option<HatDesign> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let value = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == SNAPSHOT_PARAM).then_some(value)
    })?;
    decode_design(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decal, TextRenderStyle};

    fn sample_design() -> HatDesign {
        HatDesign {
            hat_color: "#CC0000".to_string(),
            front_text: "MEGA\nCLUB".to_string(),
            text_color: "#FFD700".to_string(),
            text_style: TextRenderStyle::GoldEmbroidery,
            flag: Some("de".to_string()),
            ..Default::default()
        }
        .with_decal(Decal::text("t1", "Grüße", "#ffffff", "Pacifico").with_uniform_scale(0.35))
        .with_decal(Decal::image("i1", "https://example.com/logo.png"))
    }

    #[test]
    fn test_encode_is_idempotent_through_decode() {
        let design = sample_design();
        let encoded = encode_design(&design).unwrap();
        let decoded = decode_design(&encoded).unwrap();
        assert_eq!(encode_design(&decoded).unwrap(), encoded);
        assert_eq!(decoded, design);
    }

    #[test]
    fn test_encode_strips_blob_references() {
        let design = sample_design().with_decal(Decal::image("b1", "blob:http://localhost/abc"));
        let encoded = encode_design(&design).unwrap();
        let decoded = decode_design(&encoded).unwrap();
        assert_eq!(encode_design(&decoded).unwrap(), encoded);
        assert_ne!(decoded, design);
        assert_eq!(decoded, design.sanitized());
    }

    #[test]
    fn test_decode_invalid_base64_returns_none() {
        assert!(decode_design("not-valid-base64!!").is_none());
    }

    #[test]
    fn test_decode_truncated_returns_none() {
        let encoded = encode_design(&sample_design()).unwrap();
        let truncated = &encoded[..encoded.len() / 2];
        assert!(decode_design(truncated).is_none());
        assert!(decode_design("").is_none());
    }

    #[test]
    fn test_decode_accepts_standard_alphabet() {
        let json = serde_json::to_vec(&sample_design()).unwrap();
        let encoded = STANDARD.encode(json);
        assert!(decode_design(&encoded).is_some());
    }

    #[test]
    fn test_query_round_trip() {
        let design = sample_design();
        let query = format!("?utm=x&{}", snapshot_query(&design).unwrap());
        assert_eq!(design_from_query(&query), Some(design));
        assert!(design_from_query("?utm=x").is_none());
    }
}
