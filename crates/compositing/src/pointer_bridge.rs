//! Drives the drawing surface from pointer hits on the 3D model.
//!
//! A hit's UV is mapped into drawing-surface pixels and replayed as a
//! surface pointer event. While the replay runs, the surface's bounding rect
//! is the surface itself at the origin, so client and surface coordinates
//! coincide. The previous rect is restored as soon as the replay returns.

use glam::Vec2;
use tracing::debug;

use crate::drawing::{
    BoundingRect, DispatchOutcome, DrawingSurfaceAdapter, PointerKind, SurfacePointerEvent,
};

/// Map a UV coordinate to surface pixels. V is flipped to match texture rows.
pub fn uv_to_canvas(uv: Vec2, size: u32) -> Vec2 {
    let size = size as f32;
    Vec2::new(uv.x * size, (1.0 - uv.y) * size)
}

/// A pointer event from the 3D viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportPointerEvent {
    /// UV of the hit, `None` when the hit carried no texture coordinates.
    pub uv: Option<Vec2>,
    propagation_stopped: bool,
}

impl ViewportPointerEvent {
    pub fn at_uv(uv: Vec2) -> Self {
        Self {
            uv: Some(uv),
            propagation_stopped: false,
        }
    }

    pub fn without_uv() -> Self {
        Self::default()
    }

    /// Keep the camera controls from also handling this event.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// What the bridge did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOutcome {
    /// Surface-hit notification for the caller, when the state was reported.
    pub surface_hit: Option<bool>,
    /// Event replayed into the drawing surface, if any.
    pub forwarded: Option<PointerKind>,
}

impl BridgeOutcome {
    const NONE: Self = Self {
        surface_hit: None,
        forwarded: None,
    };
}

/// Stateful down/move/up handlers for one drag gesture at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvPointerBridge {
    dragging: bool,
    surface_hit: bool,
    last_point: Option<Vec2>,
}

impl UvPointerBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn surface_hit(&self) -> bool {
        self.surface_hit
    }

    pub fn on_pointer_down(
        &mut self,
        event: &mut ViewportPointerEvent,
        surface: &mut DrawingSurfaceAdapter,
    ) -> BridgeOutcome {
        // A down always starts a new gesture, even if the last up was missed
        self.dragging = false;
        self.last_point = None;
        let Some(uv) = event.uv else {
            return BridgeOutcome::NONE;
        };
        let point = uv_to_canvas(uv, surface.size());

        if surface.find_target(point).is_none() {
            self.surface_hit = false;
            surface.discard_active();
            return BridgeOutcome {
                surface_hit: Some(false),
                forwarded: None,
            };
        }

        self.dragging = true;
        self.surface_hit = true;
        self.last_point = Some(point);
        event.stop_propagation();
        replay(surface, PointerKind::Down, point);
        BridgeOutcome {
            surface_hit: Some(true),
            forwarded: Some(PointerKind::Down),
        }
    }

    pub fn on_pointer_move(
        &mut self,
        event: &mut ViewportPointerEvent,
        surface: &mut DrawingSurfaceAdapter,
    ) -> BridgeOutcome {
        if !self.dragging {
            return BridgeOutcome::NONE;
        }
        event.stop_propagation();
        let Some(uv) = event.uv else {
            return BridgeOutcome::NONE;
        };
        let point = uv_to_canvas(uv, surface.size());
        self.last_point = Some(point);
        replay(surface, PointerKind::Move, point);
        BridgeOutcome {
            surface_hit: None,
            forwarded: Some(PointerKind::Move),
        }
    }

    /// Ends the gesture wherever the pointer is, even off the model.
    pub fn on_pointer_up(
        &mut self,
        event: &mut ViewportPointerEvent,
        surface: &mut DrawingSurfaceAdapter,
    ) -> BridgeOutcome {
        let mut forwarded = None;
        if self.dragging {
            event.stop_propagation();
            let point = event
                .uv
                .map(|uv| uv_to_canvas(uv, surface.size()))
                .or(self.last_point)
                .unwrap_or(Vec2::ZERO);
            replay(surface, PointerKind::Up, point);
            forwarded = Some(PointerKind::Up);
        }
        self.dragging = false;
        self.surface_hit = false;
        self.last_point = None;
        BridgeOutcome {
            surface_hit: Some(false),
            forwarded,
        }
    }
}

fn replay(surface: &mut DrawingSurfaceAdapter, kind: PointerKind, point: Vec2) -> DispatchOutcome {
    let rect = BoundingRect::at_origin(surface.size());
    let outcome = surface.with_bounding_rect(rect, |s| s.dispatch(SurfacePointerEvent::new(kind, point)));
    debug!("Replayed {kind:?} at {point} on drawing surface: {outcome:?}");
    outcome
}
