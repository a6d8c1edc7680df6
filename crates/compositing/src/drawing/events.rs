//! Pointer events as the drawing surface receives them.

use glam::Vec2;

use super::objects::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// A pointer event in client (page) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePointerEvent {
    pub kind: PointerKind,
    pub client: Vec2,
}

impl SurfacePointerEvent {
    pub fn new(kind: PointerKind, client: Vec2) -> Self {
        Self { kind, client }
    }
}

/// Where the surface element sits on the page, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingRect {
    /// A rect of `size` x `size` at the origin, which makes client and
    /// surface coordinates identical.
    pub fn at_origin(size: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: size as f32,
            height: size as f32,
        }
    }

    /// Map a client point into a `size` x `size` surface.
    pub fn to_surface(&self, client: Vec2, size: u32) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let scale = Vec2::new(size as f32 / self.width, size as f32 / self.height);
        Some((client - Vec2::new(self.left, self.top)) * scale)
    }
}

/// What a dispatched event did on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing under the pointer or no gesture in progress.
    Ignored,
    Selected(ObjectId),
    Moved(ObjectId),
    Resized(ObjectId),
    Released(ObjectId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_scales_into_surface() {
        let rect = BoundingRect {
            left: 100.0,
            top: 50.0,
            width: 512.0,
            height: 512.0,
        };
        let point = rect.to_surface(Vec2::new(356.0, 306.0), 2048).unwrap();
        assert_eq!(point, Vec2::new(1024.0, 1024.0));
        assert_eq!(
            BoundingRect::at_origin(2048).to_surface(Vec2::new(7.0, 9.0), 2048),
            Some(Vec2::new(7.0, 9.0))
        );
    }

    #[test]
    fn test_collapsed_rect_maps_nothing() {
        let rect = BoundingRect {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        };
        assert_eq!(rect.to_surface(Vec2::ZERO, 2048), None);
    }
}
