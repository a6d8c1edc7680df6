//! Per-decal pointer interaction state.

use compositing::color::{Rgba, rgb8};

pub const HOVER_OUTLINE: Rgba = rgb8(0x4F, 0xC3, 0xF7);
pub const SELECTED_OUTLINE: Rgba = rgb8(0xFF, 0xB3, 0x00);

/// `Unselected -> Hovered -> Selected -> Dragging -> Selected`.
/// Hovering is reversible; clicking from any state selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecalInteraction {
    #[default]
    Unselected,
    Hovered,
    Selected,
    Dragging,
}

impl DecalInteraction {
    pub fn pointer_over(self) -> Self {
        match self {
            Self::Unselected => Self::Hovered,
            other => other,
        }
    }

    pub fn pointer_out(self) -> Self {
        match self {
            Self::Hovered => Self::Unselected,
            other => other,
        }
    }

    pub fn click(self) -> Self {
        match self {
            Self::Dragging => Self::Dragging,
            _ => Self::Selected,
        }
    }

    pub fn gizmo_start(self) -> Self {
        match self {
            Self::Selected | Self::Dragging => Self::Dragging,
            other => other,
        }
    }

    pub fn gizmo_end(self) -> Self {
        match self {
            Self::Dragging => Self::Selected,
            other => other,
        }
    }

    pub fn deselect(self) -> Self {
        Self::Unselected
    }

    pub fn is_selected(self) -> bool {
        matches!(self, Self::Selected | Self::Dragging)
    }

    /// Outline color. Purely visual.
    pub fn outline(self) -> Option<Rgba> {
        match self {
            Self::Unselected => None,
            Self::Hovered => Some(HOVER_OUTLINE),
            Self::Selected | Self::Dragging => Some(SELECTED_OUTLINE),
        }
    }
}
