//! Decal composition: per-decal placement, selection and texture source.
//!
//! The layer never owns the design. Every edit takes the current
//! [`HatDesign`] and returns the next one; [`DecalCompositionLayer::sync`]
//! then brings the layer's caches in line with whatever design is current.

mod gizmo;
mod interaction;
mod sources;

use std::collections::{HashMap, HashSet};

use capforge_config::CapforgeConfig;
use capforge_design::{Decal, DecalContent, HatDesign};
use compositing::color::{Rgba, rgb8};
use compositing::{FontRegistry, RasterTexture, TextureCompositor};
use glam::{Mat4, Vec3};
use tracing::{debug, info};

pub use gizmo::{DecalTransform, apply_gizmo};
pub use interaction::{DecalInteraction, HOVER_OUTLINE, SELECTED_OUTLINE};
pub use sources::{ImageLoads, ImageState, LoadTicket, TextDecalTextures};

use crate::assets::AssetError;
use crate::error::PlacementError;
use crate::hit_mapper::{DecalSide, LocalPlacement, PointerHit, SurfaceHitMapper};
use crate::targets::{DecalTargets, TargetKey};

/// Wireframe color of a decal whose image is unavailable.
pub const ERROR_PLACEHOLDER: Rgba = rgb8(0xFF, 0x17, 0x44);

/// Canvas used for text decal textures.
pub const DECAL_TEXT_CANVAS: (u32, u32) = (1024, 512);

/// Where a decal lands when it is added without a surface hit: centered on the front panel.
pub const DEFAULT_DECAL_POSITION: [f32; 3] = [0.0, 0.06, 0.1];
pub const DEFAULT_DECAL_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
/// Model-space size given to new decals that arrive with the unit scale.
pub const DEFAULT_DECAL_SCALE: f32 = 0.05;

/// What a decal plane is textured with.
#[derive(Debug, Clone, Copy)]
pub enum DecalSource<'a> {
    Texture(&'a RasterTexture),
    /// Text not yet composited or image still in flight
    Loading,
    /// The image failed or has no usable source
    ErrorPlaceholder,
}

/// Everything needed to draw one decal.
#[derive(Debug, Clone)]
pub struct DecalVisual<'a> {
    pub id: &'a str,
    pub transform: DecalTransform,
    /// Baked target the decal projects onto, after fallback to the main target
    pub target: Option<TargetKey>,
    pub source: DecalSource<'a>,
    /// Changes whenever the source raster is replaced
    pub source_version: u64,
    pub is_text: bool,
    pub interaction: DecalInteraction,
    pub outline: Option<Rgba>,
}

#[derive(Debug)]
pub struct DecalCompositionLayer {
    mapper: SurfaceHitMapper,
    text: TextDecalTextures,
    images: ImageLoads,
    interaction: HashMap<String, DecalInteraction>,
    revision: u64,
}

impl DecalCompositionLayer {
    pub fn new(compositor: TextureCompositor, mapper: SurfaceHitMapper) -> Self {
        Self {
            mapper,
            text: TextDecalTextures::new(compositor),
            images: ImageLoads::new(),
            interaction: HashMap::new(),
            revision: 0,
        }
    }

    pub fn from_config(config: &CapforgeConfig) -> Self {
        let compositor = TextureCompositor::new(DECAL_TEXT_CANVAS.0, DECAL_TEXT_CANVAS.1)
            .with_device_anisotropy(config.max_anisotropy);
        Self::new(compositor, SurfaceHitMapper::new(config.surface_offset))
    }

    /// Bumped whenever decal content may have changed. Interaction state
    /// does not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Gap kept between a decal and the surface it sits on.
    pub fn surface_offset(&self) -> f32 {
        self.mapper.surface_offset
    }

    /// Bring caches in line with `design`: drop state of removed decals,
    /// re-render changed text and queue loads for new image sources.
    pub fn sync(&mut self, design: &HatDesign, fonts: &FontRegistry) {
        let text_ids: HashSet<&str> = design
            .decals
            .iter()
            .filter(|d| d.is_text())
            .map(|d| d.id.as_str())
            .collect();
        let image_ids: HashSet<&str> = design
            .decals
            .iter()
            .filter(|d| !d.is_text())
            .map(|d| d.id.as_str())
            .collect();
        self.text.retain(|id| text_ids.contains(id));
        self.images.retain(|id| image_ids.contains(id));
        self.interaction
            .retain(|id, _| text_ids.contains(id.as_str()) || image_ids.contains(id.as_str()));

        for decal in &design.decals {
            match &decal.content {
                DecalContent::Text { text, color, font } => {
                    let style = decal.style.unwrap_or(design.text_style);
                    self.text.refresh(fonts, &decal.id, text, color, font, style);
                }
                DecalContent::Image { src } => self.images.track(&decal.id, src.as_deref()),
            }
        }
        self.revision += 1;
    }

    /// Image fetches the caller should start.
    pub fn take_load_requests(&mut self) -> Vec<LoadTicket> {
        self.images.take_requests()
    }

    /// Hand back a fetch result. Stale results are ignored.
    pub fn complete_load(&mut self, ticket: &LoadTicket, result: Result<Vec<u8>, AssetError>) {
        if self.images.complete(ticket, result) {
            self.revision += 1;
        }
    }

    /// Text decals re-rendered since the last call.
    pub fn take_updated_text(&mut self) -> Vec<String> {
        self.text.take_updated()
    }

    pub fn interaction(&self, id: &str) -> DecalInteraction {
        self.interaction.get(id).copied().unwrap_or_default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.interaction
            .iter()
            .find(|(_, state)| state.is_selected())
            .map(|(id, _)| id.as_str())
    }

    pub fn pointer_over(&mut self, id: &str) {
        self.transition(id, DecalInteraction::pointer_over);
    }

    pub fn pointer_out(&mut self, id: &str) {
        self.transition(id, DecalInteraction::pointer_out);
    }

    /// Select `id`, deselecting any other decal.
    pub fn select(&mut self, id: &str) {
        for (other, state) in self.interaction.iter_mut() {
            if other != id && state.is_selected() {
                *state = state.deselect();
            }
        }
        self.transition(id, DecalInteraction::click);
    }

    pub fn clear_selection(&mut self) {
        for state in self.interaction.values_mut() {
            if state.is_selected() {
                *state = state.deselect();
            }
        }
    }

    /// Gizmo drag started on the selected decal. Returns `false` when nothing is selected.
    pub fn begin_gizmo(&mut self) -> bool {
        match self.selected().map(str::to_string) {
            Some(id) => {
                self.transition(&id, DecalInteraction::gizmo_start);
                true
            }
            None => false,
        }
    }

    pub fn end_gizmo(&mut self) {
        if let Some(id) = self.selected().map(str::to_string) {
            self.transition(&id, DecalInteraction::gizmo_end);
        }
    }

    fn transition(&mut self, id: &str, step: fn(DecalInteraction) -> DecalInteraction) {
        let state = self.interaction.entry(id.to_string()).or_default();
        let next = step(*state);
        if next != *state {
            debug!("Decal {id}: {:?} -> {next:?}", *state);
            *state = next;
        }
    }

    /// Add `decal` to the design and select it. Without a placement it goes
    /// to the default front position. A decal still at the unit scale is
    /// shrunk to [`DEFAULT_DECAL_SCALE`], which fits the cap's model units.
    pub fn place_new(
        &mut self,
        design: &HatDesign,
        mut decal: Decal,
        placement: Option<&LocalPlacement>,
    ) -> HatDesign {
        if decal.scale == [1.0; 3] {
            decal.scale = [DEFAULT_DECAL_SCALE; 3];
        }
        let decal = match placement {
            Some(placement) => placed(&decal, placement),
            None => Decal {
                position: DEFAULT_DECAL_POSITION,
                normal: Some(DEFAULT_DECAL_NORMAL),
                rotation: DecalSide::Front.rotation(decal.rotation[2]),
                ..decal
            },
        };
        info!("Adding decal {}", decal.id);
        let id = decal.id.clone();
        let next = design.with_decal(decal);
        self.select(&id);
        next
    }

    /// Move decal `id` to a mapped surface placement, keeping its spin.
    pub fn apply_placement(
        &self,
        design: &HatDesign,
        id: &str,
        placement: &LocalPlacement,
    ) -> Result<HatDesign, PlacementError> {
        let decal = design
            .decal(id)
            .ok_or_else(|| PlacementError::UnknownDecal(id.to_string()))?;
        let moved = placed(decal, placement);
        Ok(design.with_decal_updated(id, |_| moved))
    }

    /// Drag decal `id` to a pointer hit. `None` leaves the design as it was.
    pub fn drag_to(&self, design: &HatDesign, id: &str, hit: &PointerHit) -> Option<HatDesign> {
        let placement = self.mapper.map_hit(hit)?;
        self.apply_placement(design, id, &placement).ok()
    }

    /// Write a gizmo's output matrix back into decal `id`.
    pub fn apply_gizmo(
        &self,
        design: &HatDesign,
        id: &str,
        matrix: Mat4,
    ) -> Result<HatDesign, PlacementError> {
        let decal = design
            .decal(id)
            .ok_or_else(|| PlacementError::UnknownDecal(id.to_string()))?;
        let updated = apply_gizmo(decal, matrix).ok_or(PlacementError::NonFiniteTransform)?;
        Ok(design.with_decal_updated(id, |_| updated))
    }

    /// Remove decal `id`. Returns the next design and the selection that
    /// remains, which is `None` when the removed decal was selected.
    pub fn remove(&mut self, design: &HatDesign, id: &str) -> (HatDesign, Option<String>) {
        let selected = self.selected().map(str::to_string);
        let (next, selection) = design.without_decal(id, selected.as_deref());
        self.interaction.remove(id);
        self.text.retain(|other| other != id);
        self.images.retain(|other| other != id);
        self.revision += 1;
        info!("Removed decal {id}");
        (next, selection)
    }

    /// Visuals for every decal in `design`, in list order.
    pub fn visuals<'a>(
        &'a self,
        design: &'a HatDesign,
        targets: Option<&DecalTargets>,
    ) -> Vec<DecalVisual<'a>> {
        design
            .decals
            .iter()
            .map(|decal| {
                let interaction = self.interaction(&decal.id);
                DecalVisual {
                    id: &decal.id,
                    transform: DecalTransform::from_decal(decal),
                    target: targets
                        .and_then(|t| t.resolve(decal.target.as_ref()))
                        .map(|geometry| geometry.key.clone()),
                    source: self.source(decal),
                    source_version: self.source_version(decal),
                    is_text: decal.is_text(),
                    interaction,
                    outline: interaction.outline(),
                }
            })
            .collect()
    }

    fn source_version(&self, decal: &Decal) -> u64 {
        match &decal.content {
            DecalContent::Text { .. } => self.text.get(&decal.id).map_or(0, RasterTexture::version),
            DecalContent::Image { .. } => self.images.generation(&decal.id).unwrap_or(0),
        }
    }

    fn source(&self, decal: &Decal) -> DecalSource<'_> {
        match &decal.content {
            DecalContent::Text { .. } => self
                .text
                .get(&decal.id)
                .map_or(DecalSource::Loading, DecalSource::Texture),
            DecalContent::Image { .. } => match self.images.state(&decal.id) {
                Some(ImageState::Ready(texture)) => DecalSource::Texture(texture),
                Some(ImageState::Failed) => DecalSource::ErrorPlaceholder,
                Some(ImageState::Pending) | None => DecalSource::Loading,
            },
        }
    }
}

fn placed(decal: &Decal, placement: &LocalPlacement) -> Decal {
    let normal: Vec3 = placement.normal;
    Decal {
        position: placement.position.to_array(),
        rotation: DecalSide::from_normal(normal).rotation(decal.rotation[2]),
        normal: Some(normal.to_array()),
        target: Some(placement.target.clone()),
        ..decal.clone()
    }
}
