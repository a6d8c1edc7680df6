//! Fulfills the scene's fetch requests from the local filesystem.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use capforge_scene::{FetchRequest, FetchResult, ScenePhase};

use crate::config::ViewerConfig;

pub struct LocalFetchPlugin;

impl Plugin for LocalFetchPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, fulfill_fetches.before(ScenePhase::Input));
    }
}

/// Filesystem path for `url`. `file://` URLs are taken as-is, bare paths are
/// relative to `asset_dir`; anything with another scheme is refused.
pub fn resolve_local(url: &str, asset_dir: &Path) -> Result<PathBuf, String> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") || url.starts_with("blob:") || url.starts_with("data:") {
        return Err(format!("cannot fetch {url} from the desktop viewer"));
    }
    Ok(asset_dir.join(url.trim_start_matches('/')))
}

fn fulfill_fetches(
    mut requests: MessageReader<FetchRequest>,
    config: Res<ViewerConfig>,
    mut results: MessageWriter<FetchResult>,
) {
    for request in requests.read() {
        let bytes = resolve_local(&request.url, &config.asset_dir).and_then(|path| {
            std::fs::read(&path).map_err(|err| format!("{}: {err}", path.display()))
        });
        if let Err(reason) = &bytes {
            warn!("Fetch of {} failed: {reason}", request.url);
        }
        results.write(FetchResult {
            request: request.clone(),
            bytes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_paths_resolve_under_asset_dir() {
        let dir = Path::new("/srv/caps");
        assert_eq!(
            resolve_local("patterns/camo.png", dir).unwrap(),
            PathBuf::from("/srv/caps/patterns/camo.png")
        );
        assert_eq!(
            resolve_local("/flags/de.png", dir).unwrap(),
            PathBuf::from("/srv/caps/flags/de.png")
        );
    }

    #[test]
    fn test_file_urls_are_absolute() {
        assert_eq!(
            resolve_local("file:///tmp/logo.png", Path::new("assets")).unwrap(),
            PathBuf::from("/tmp/logo.png")
        );
    }

    #[test]
    fn test_remote_and_session_urls_are_refused() {
        let dir = Path::new("assets");
        assert!(resolve_local("https://cdn.example/logo.png", dir).is_err());
        assert!(resolve_local("blob:https://shop.example/1234", dir).is_err());
        assert!(resolve_local("data:image/png;base64,AAAA", dir).is_err());
    }
}
