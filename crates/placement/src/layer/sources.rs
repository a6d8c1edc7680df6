//! Texture sources for decal planes.
//!
//! Text decals are composited on the CPU and re-rendered only when their
//! `(text, color, font, style)` changes or a font finishes loading. Image decals are fetched by the
//! caller; every load carries a [`LoadTicket`] so a result that arrives after
//! its decal was removed or re-pointed is dropped.

use std::collections::HashMap;

use capforge_design::TextRenderStyle;
use compositing::color::{WHITE, parse_hex_or};
use compositing::{FontRegistry, RasterTexture, TextRequest, TextureCompositor, TextureUsage};
use tracing::{debug, warn};

use crate::assets::{AssetError, decode_texture};

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextKey {
    text: String,
    color: String,
    font: String,
    style: TextRenderStyle,
    font_revision: u64,
}

#[derive(Debug)]
struct TextEntry {
    key: TextKey,
    texture: RasterTexture,
}

/// Per-decal text textures.
#[derive(Debug)]
pub struct TextDecalTextures {
    compositor: TextureCompositor,
    entries: HashMap<String, TextEntry>,
}

impl TextDecalTextures {
    pub fn new(compositor: TextureCompositor) -> Self {
        Self {
            compositor,
            entries: HashMap::new(),
        }
    }

    /// Make sure decal `id` has an up-to-date texture. Returns `true` when
    /// the texture was (re)rendered.
    pub fn refresh(
        &mut self,
        fonts: &FontRegistry,
        id: &str,
        text: &str,
        color: &str,
        font: &str,
        style: TextRenderStyle,
    ) -> bool {
        let key = TextKey {
            text: text.to_string(),
            color: color.to_string(),
            font: font.to_string(),
            style,
            font_revision: fonts.revision(),
        };
        if self.entries.get(id).is_some_and(|entry| entry.key == key) {
            return false;
        }

        let lines: Vec<&str> = text.lines().collect();
        let request = TextRequest::new(&lines, parse_hex_or(color, WHITE), font, style)
            .with_usage(TextureUsage::ProjectedDecal);
        match self.entries.get_mut(id) {
            Some(entry) => {
                self.compositor.update_text(&mut entry.texture, fonts, &request);
                entry.key = key;
            }
            None => {
                let texture = self.compositor.render_text(fonts, &request);
                self.entries.insert(id.to_string(), TextEntry { key, texture });
            }
        }
        debug!("Rendered text decal {id}");
        true
    }

    pub fn get(&self, id: &str) -> Option<&RasterTexture> {
        self.entries.get(id).map(|entry| &entry.texture)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RasterTexture> {
        self.entries.get_mut(id).map(|entry| &mut entry.texture)
    }

    /// Ids of textures re-rendered since the last call.
    pub fn take_updated(&mut self) -> Vec<String> {
        let mut updated: Vec<String> = self
            .entries
            .iter_mut()
            .filter_map(|(id, entry)| entry.texture.take_needs_update().then(|| id.clone()))
            .collect();
        updated.sort();
        updated
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A pending image fetch for one decal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub decal_id: String,
    pub src: String,
    generation: u64,
}

/// Where an image decal's load stands.
#[derive(Debug, Clone)]
pub enum ImageState {
    Pending,
    Ready(RasterTexture),
    Failed,
}

#[derive(Debug)]
struct ImageEntry {
    src: Option<String>,
    generation: u64,
    state: ImageState,
}

/// Image decal loads keyed by decal id.
#[derive(Debug, Default)]
pub struct ImageLoads {
    entries: HashMap<String, ImageEntry>,
    queued: Vec<LoadTicket>,
    next_generation: u64,
}

impl ImageLoads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `src` for decal `id`, queueing a fetch when it changed.
    ///
    /// A missing `src` (e.g. a stripped session URL) fails immediately.
    pub fn track(&mut self, id: &str, src: Option<&str>) {
        if self
            .entries
            .get(id)
            .is_some_and(|entry| entry.src.as_deref() == src)
        {
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let state = match src {
            Some(src) => {
                self.queued.push(LoadTicket {
                    decal_id: id.to_string(),
                    src: src.to_string(),
                    generation,
                });
                ImageState::Pending
            }
            None => {
                warn!("Image decal {id} has no source, showing placeholder");
                ImageState::Failed
            }
        };
        self.entries.insert(
            id.to_string(),
            ImageEntry {
                src: src.map(str::to_string),
                generation,
                state,
            },
        );
    }

    /// Fetches queued since the last call.
    pub fn take_requests(&mut self) -> Vec<LoadTicket> {
        std::mem::take(&mut self.queued)
    }

    /// Apply a fetch result. Returns `false` if the ticket is stale.
    pub fn complete(&mut self, ticket: &LoadTicket, result: Result<Vec<u8>, AssetError>) -> bool {
        let Some(entry) = self
            .entries
            .get_mut(&ticket.decal_id)
            .filter(|entry| entry.generation == ticket.generation)
        else {
            debug!("Dropping stale image load for decal {}", ticket.decal_id);
            return false;
        };

        entry.state = match result
            .and_then(|bytes| decode_texture(&bytes, TextureUsage::ProjectedDecal))
        {
            Ok(texture) => ImageState::Ready(texture),
            Err(err) => {
                warn!("Image decal {} failed to load {}: {err}", ticket.decal_id, ticket.src);
                ImageState::Failed
            }
        };
        true
    }

    /// Load generation of decal `id`; a new source gets a new generation.
    pub fn generation(&self, id: &str) -> Option<u64> {
        self.entries.get(id).map(|entry| entry.generation)
    }

    pub fn state(&self, id: &str) -> Option<&ImageState> {
        self.entries.get(id).map(|entry| &entry.state)
    }

    /// Forget decals for which `keep` is false. Their in-flight tickets become stale.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|id, _| keep(id));
        self.queued.retain(|ticket| keep(&ticket.decal_id));
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_text_texture_rerenders_only_on_change() {
        let fonts = FontRegistry::new();
        let mut textures = TextDecalTextures::new(TextureCompositor::new(256, 128));
        let style = TextRenderStyle::Embroidery;

        assert!(textures.refresh(&fonts, "t1", "HI", "#ff0000", "Bebas Neue", style));
        let texture = textures.get("t1").unwrap();
        assert!(texture.flip_y);
        let version = texture.version();

        assert!(!textures.refresh(&fonts, "t1", "HI", "#ff0000", "Bebas Neue", style));
        assert_eq!(textures.get("t1").unwrap().version(), version);

        assert!(textures.refresh(&fonts, "t1", "HEY", "#ff0000", "Bebas Neue", style));
        let texture = textures.get_mut("t1").unwrap();
        assert!(texture.version() > version);
        assert!(texture.take_needs_update());
    }

    #[test]
    fn test_text_texture_rerenders_when_font_loads() {
        let mut fonts = FontRegistry::new();
        let mut textures = TextDecalTextures::new(TextureCompositor::new(256, 128));
        let style = TextRenderStyle::Flat;
        assert!(textures.refresh(&fonts, "t1", "HI", "#ffffff", "Fira Sans", style));

        fonts.register("Fira Sans", compositing::DEFAULT_FACE).unwrap();
        assert!(textures.refresh(&fonts, "t1", "HI", "#ffffff", "Fira Sans", style));
        assert!(!textures.refresh(&fonts, "t1", "HI", "#ffffff", "Fira Sans", style));
    }

    #[test]
    fn test_image_load_lifecycle() {
        let mut loads = ImageLoads::new();
        loads.track("d1", Some("https://cdn.example/logo.png"));
        loads.track("d1", Some("https://cdn.example/logo.png"));
        let tickets = loads.take_requests();
        assert_eq!(tickets.len(), 1);
        assert!(matches!(loads.state("d1"), Some(ImageState::Pending)));

        assert!(loads.complete(&tickets[0], Ok(png_bytes())));
        assert!(matches!(loads.state("d1"), Some(ImageState::Ready(t)) if t.width() == 4));
    }

    #[test]
    fn test_undecodable_image_fails() {
        let mut loads = ImageLoads::new();
        loads.track("d1", Some("https://cdn.example/broken.png"));
        let ticket = loads.take_requests().remove(0);
        loads.complete(&ticket, Ok(vec![1, 2, 3]));
        assert!(matches!(loads.state("d1"), Some(ImageState::Failed)));

        loads.track("d2", None);
        assert!(loads.take_requests().is_empty());
        assert!(matches!(loads.state("d2"), Some(ImageState::Failed)));
    }

    #[test]
    fn test_stale_loads_are_dropped() {
        let mut loads = ImageLoads::new();
        loads.track("d1", Some("https://cdn.example/a.png"));
        let first = loads.take_requests().remove(0);
        loads.track("d1", Some("https://cdn.example/b.png"));
        assert!(!loads.complete(&first, Ok(png_bytes())));
        assert!(matches!(loads.state("d1"), Some(ImageState::Pending)));

        let second = loads.take_requests().remove(0);
        loads.retain(|_| false);
        assert!(!loads.complete(&second, Ok(png_bytes())));
        assert!(loads.state("d1").is_none());
    }
}
