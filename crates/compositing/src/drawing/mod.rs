//! Persistent 2D drawing surface whose raster is used as a live texture.
//!
//! The adapter owns a set of editable objects over a solid background and
//! redraws its raster after every change, raising a [`DirtySignal`]. It never
//! uploads anything itself; whoever holds the signal decides when to copy the
//! raster out.

mod events;
mod objects;

pub use events::*;
pub use objects::*;

use capforge_design::{HatDesign, TextRenderStyle};
use glam::Vec2;
use tracing::{debug, info};

use crate::color::{Rgba, WHITE, parse_hex_or};
use crate::constants::{DEFAULT_DRAWING_SURFACE_SIZE, DRAWING_SURFACE_FONT_RATIO};
use crate::dirty::DirtySignal;
use crate::fonts::FontRegistry;
use crate::glyphs::GlyphSource;
use crate::surface::CpuSurface;
use crate::text::resolve_font_size;

/// Pointer-downs within this many surface pixels of an object's resize
/// handle start a resize instead of a move.
const HANDLE_RADIUS: f32 = 24.0;

/// Smallest scale a resize gesture can reach.
const MIN_OBJECT_SCALE: f32 = 0.05;

/// Options for the primary text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub fill: Rgba,
    pub font_family: String,
    pub style: TextRenderStyle,
}

/// Result of [`DrawingSurfaceAdapter::set_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextChange {
    Created(ObjectId),
    Updated(ObjectId),
    /// The old object was destroyed and a new one took its place.
    Replaced { old: ObjectId, new: ObjectId },
    Removed(ObjectId),
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Move { grab: Vec2 },
    Resize { start_scale: f32, start_distance: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveGesture {
    id: ObjectId,
    gesture: Gesture,
}

pub struct DrawingSurfaceAdapter {
    size: u32,
    background: Rgba,
    objects: Vec<SurfaceObject>,
    primary_text: Option<ObjectId>,
    next_id: ObjectId,
    active: Option<ObjectId>,
    gesture: Option<ActiveGesture>,
    bounding_rect: BoundingRect,
    raster: CpuSurface,
    dirty: DirtySignal,
    /// Font registry revision the primary text was last built with
    font_revision: u64,
}

impl std::fmt::Debug for DrawingSurfaceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurfaceAdapter")
            .field("size", &self.size)
            .field("objects", &self.objects.len())
            .field("primary_text", &self.primary_text)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Default for DrawingSurfaceAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_DRAWING_SURFACE_SIZE)
    }
}

impl DrawingSurfaceAdapter {
    /// A `size` x `size` white surface with no objects.
    pub fn new(size: u32) -> Self {
        let mut adapter = Self {
            size,
            background: WHITE,
            objects: Vec::new(),
            primary_text: None,
            next_id: 1,
            active: None,
            gesture: None,
            bounding_rect: BoundingRect::at_origin(size),
            raster: CpuSurface::new(size, size),
            dirty: DirtySignal::new(),
            font_revision: 0,
        };
        adapter.request_render();
        adapter
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn objects(&self) -> &[SurfaceObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&SurfaceObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn primary_text(&self) -> Option<&SurfaceObject> {
        self.primary_text.and_then(|id| self.object(id))
    }

    pub fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    /// The raster the texture consumer copies from.
    pub fn raster_element(&self) -> &CpuSurface {
        &self.raster
    }

    /// Handle raised after every draw. Clone it for the upload consumer.
    pub fn dirty_signal(&self) -> DirtySignal {
        self.dirty.clone()
    }

    /// Redraw the raster and notify the consumer.
    pub fn request_render(&mut self) {
        self.raster.clear(self.background);
        for object in &self.objects {
            object.draw(&mut self.raster);
        }
        self.dirty.raise();
    }

    /// Background mirrors the cap base color; objects are kept.
    pub fn set_background(&mut self, color: Rgba) {
        if self.background == color {
            return;
        }
        self.background = color;
        self.request_render();
    }

    /// Remove every object, keeping the background.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.primary_text = None;
        self.active = None;
        self.gesture = None;
        self.request_render();
    }

    /// Add a user object on top of the stack, centered at `center`.
    pub fn add_object(&mut self, content: ObjectContent, center: Vec2) -> ObjectId {
        let id = self.allocate_id();
        self.objects.push(SurfaceObject::new(id, content, center));
        self.request_render();
        id
    }

    pub fn add_image(&mut self, image: CpuSurface, center: Vec2) -> ObjectId {
        self.add_object(ObjectContent::Image(image), center)
    }

    /// Remove an object. Returns whether it existed.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        if self.objects.len() == before {
            return false;
        }
        if self.primary_text == Some(id) {
            self.primary_text = None;
        }
        if self.active == Some(id) {
            self.active = None;
            self.gesture = None;
        }
        self.request_render();
        true
    }

    /// Set the primary text object.
    ///
    /// Flat text and effect text are different object kinds, so switching
    /// between them replaces the object; switching among effect styles or
    /// editing flat text updates it in place. Empty text removes it.
    pub fn set_text(&mut self, text: &str, options: &TextOptions, fonts: &FontRegistry) -> TextChange {
        let glyphs = fonts.glyphs(&options.font_family);
        let fonts_changed = self.font_revision != fonts.revision();
        self.font_revision = fonts.revision();
        let existing = self
            .primary_text
            .and_then(|id| self.objects.iter().position(|o| o.id == id));

        if text.trim().is_empty() {
            let Some(index) = existing else {
                return TextChange::Unchanged;
            };
            let removed = self.objects.remove(index).id;
            self.primary_text = None;
            if self.active == Some(removed) {
                self.active = None;
                self.gesture = None;
            }
            self.request_render();
            return TextChange::Removed(removed);
        }

        let params = TextParams {
            text: text.to_string(),
            fill: options.fill,
            font_family: options.font_family.clone(),
            font_size: self.font_size(text, glyphs),
        };

        let change = match existing {
            None => {
                let id = self.allocate_id();
                let center = Vec2::splat(self.size as f32 * 0.5);
                let content = build_text(params, options.style, glyphs);
                self.objects.push(SurfaceObject::new(id, content, center));
                self.primary_text = Some(id);
                info!("Created primary text object {id}");
                TextChange::Created(id)
            }
            Some(index) => {
                let same_kind = matches!(
                    (&self.objects[index].content, options.style.is_effect()),
                    (ObjectContent::FlatText(_), false) | (ObjectContent::EffectText(_), true)
                );
                if same_kind && !fonts_changed && self.text_matches(index, &params, options.style) {
                    return TextChange::Unchanged;
                }
                let content = build_text(params, options.style, glyphs);
                if same_kind {
                    let object = &mut self.objects[index];
                    object.content = content;
                    debug!("Updated primary text object {}", object.id);
                    TextChange::Updated(object.id)
                } else {
                    let new = self.allocate_id();
                    let object = &mut self.objects[index];
                    let old = object.id;
                    *object = SurfaceObject {
                        id: new,
                        content,
                        ..object.clone()
                    };
                    self.primary_text = Some(new);
                    if self.active == Some(old) {
                        self.active = None;
                        self.gesture = None;
                    }
                    info!("Replaced primary text object {old} with {new}");
                    TextChange::Replaced { old, new }
                }
            }
        };
        self.request_render();
        change
    }

    /// Mirror a design's base color and front text.
    pub fn apply_design(&mut self, design: &HatDesign, fonts: &FontRegistry) -> TextChange {
        self.set_background(parse_hex_or(&design.hat_color, WHITE));
        let options = TextOptions {
            fill: parse_hex_or(&design.text_color, WHITE),
            font_family: design.font.clone(),
            style: design.text_style,
        };
        self.set_text(&design.front_text, &options, fonts)
    }

    /// Font size for the drawing surface: the shared tiers at the surface ratio.
    pub fn font_size(&self, text: &str, glyphs: &dyn GlyphSource) -> f32 {
        let lines: Vec<&str> = text.split('\n').collect();
        resolve_font_size(&lines, glyphs, self.size as f32, DRAWING_SURFACE_FONT_RATIO)
    }

    /// Topmost object containing a surface point.
    pub fn find_target(&self, point: Vec2) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.contains(point))
            .map(|o| o.id)
    }

    /// Drop the current selection and any gesture in progress.
    pub fn discard_active(&mut self) {
        if self.active.take().is_some() {
            debug!("Drawing surface selection cleared");
        }
        self.gesture = None;
    }

    pub fn bounding_rect(&self) -> BoundingRect {
        self.bounding_rect
    }

    /// Where the surface element is laid out on the page.
    pub fn set_bounding_rect(&mut self, rect: BoundingRect) {
        self.bounding_rect = rect;
    }

    /// Run `f` with the bounding rect replaced, restoring the previous rect
    /// afterwards.
    pub fn with_bounding_rect<R>(&mut self, rect: BoundingRect, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.bounding_rect, rect);
        let result = f(self);
        self.bounding_rect = previous;
        result
    }

    /// Interactive editing: select, move and resize objects.
    pub fn dispatch(&mut self, event: SurfacePointerEvent) -> DispatchOutcome {
        let Some(point) = self.bounding_rect.to_surface(event.client, self.size) else {
            return DispatchOutcome::Ignored;
        };
        match event.kind {
            PointerKind::Down => self.pointer_down(point),
            PointerKind::Move => self.pointer_move(point),
            PointerKind::Up => match self.gesture.take() {
                Some(active) => DispatchOutcome::Released(active.id),
                None => DispatchOutcome::Ignored,
            },
        }
    }

    fn pointer_down(&mut self, point: Vec2) -> DispatchOutcome {
        // The active object's handle wins over whatever is stacked above it
        let handle = self
            .active
            .and_then(|id| self.object(id))
            .filter(|object| object.resize_handle().distance(point) <= HANDLE_RADIUS)
            .map(|object| ActiveGesture {
                id: object.id,
                gesture: Gesture::Resize {
                    start_scale: object.scale,
                    start_distance: object.center.distance(point).max(1.0),
                },
            });
        if let Some(active) = handle {
            self.gesture = Some(active);
            return DispatchOutcome::Selected(active.id);
        }

        let Some(id) = self.find_target(point) else {
            self.discard_active();
            return DispatchOutcome::Ignored;
        };
        let Some(grab) = self.object(id).map(|object| object.center - point) else {
            return DispatchOutcome::Ignored;
        };
        self.gesture = Some(ActiveGesture {
            id,
            gesture: Gesture::Move { grab },
        });
        self.active = Some(id);
        debug!("Drawing surface object {id} selected");
        DispatchOutcome::Selected(id)
    }

    fn pointer_move(&mut self, point: Vec2) -> DispatchOutcome {
        let Some(active) = self.gesture else {
            return DispatchOutcome::Ignored;
        };
        let Some(object) = self.objects.iter_mut().find(|o| o.id == active.id) else {
            self.gesture = None;
            return DispatchOutcome::Ignored;
        };
        let outcome = match active.gesture {
            Gesture::Move { grab } => {
                object.center = point + grab;
                DispatchOutcome::Moved(active.id)
            }
            Gesture::Resize {
                start_scale,
                start_distance,
            } => {
                let ratio = object.center.distance(point) / start_distance;
                object.scale = (start_scale * ratio).max(MIN_OBJECT_SCALE);
                DispatchOutcome::Resized(active.id)
            }
        };
        self.request_render();
        outcome
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn text_matches(&self, index: usize, params: &TextParams, style: TextRenderStyle) -> bool {
        match &self.objects[index].content {
            ObjectContent::FlatText(text) => text.params == *params,
            ObjectContent::EffectText(text) => text.params == *params && text.style == style,
            ObjectContent::Image(_) => false,
        }
    }
}

fn build_text(params: TextParams, style: TextRenderStyle, glyphs: &dyn GlyphSource) -> ObjectContent {
    if style.is_effect() {
        ObjectContent::EffectText(EffectText::new(params, style, glyphs))
    } else {
        ObjectContent::FlatText(FlatText::new(params, glyphs))
    }
}
