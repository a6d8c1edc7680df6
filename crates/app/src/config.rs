//! Viewer configuration from the environment

use std::path::PathBuf;

use bevy::prelude::Resource;
use capforge_design::{HatDesign, decode_design, design_from_query};
use tracing::warn;

/// Directory local asset URLs are resolved against
pub const DEFAULT_ASSET_DIR: &str = "assets";

#[derive(Resource, Debug, Clone)]
pub struct ViewerConfig {
    /// Design to open, from `CAPFORGE_DESIGN`
    pub design: HatDesign,
    pub asset_dir: PathBuf,
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `CAPFORGE_DESIGN` takes either a share query (`d=...`) or the bare
    /// encoded snapshot. A snapshot that does not decode opens the default design.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let design = lookup("CAPFORGE_DESIGN")
            .and_then(|raw| {
                let parsed = parse_design(&raw);
                if parsed.is_none() {
                    warn!("CAPFORGE_DESIGN is not a valid snapshot, opening the default design");
                }
                parsed
            })
            .unwrap_or_default();
        let asset_dir = lookup("CAPFORGE_ASSET_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR), PathBuf::from);
        Self { design, asset_dir }
    }
}

fn parse_design(raw: &str) -> Option<HatDesign> {
    let raw = raw.trim();
    if raw.contains('=') {
        design_from_query(raw)
    } else {
        decode_design(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capforge_design::{encode_design, snapshot_query};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ViewerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.design, HatDesign::default());
        assert_eq!(config.asset_dir, PathBuf::from(DEFAULT_ASSET_DIR));
    }

    #[test]
    fn test_design_from_query_or_bare_snapshot() {
        let design = HatDesign {
            front_text: "TEAM".to_string(),
            ..HatDesign::default()
        };
        let query = snapshot_query(&design).unwrap();
        let config = ViewerConfig::from_lookup(lookup(&[("CAPFORGE_DESIGN", &query)]));
        assert_eq!(config.design.front_text, "TEAM");

        let bare = encode_design(&design).unwrap();
        let config = ViewerConfig::from_lookup(lookup(&[("CAPFORGE_DESIGN", &bare)]));
        assert_eq!(config.design.front_text, "TEAM");
    }

    #[test]
    fn test_malformed_design_falls_back() {
        let config = ViewerConfig::from_lookup(lookup(&[
            ("CAPFORGE_DESIGN", "%%%not-base64"),
            ("CAPFORGE_ASSET_DIR", "/srv/caps"),
        ]));
        assert_eq!(config.design, HatDesign::default());
        assert_eq!(config.asset_dir, PathBuf::from("/srv/caps"));
    }
}
