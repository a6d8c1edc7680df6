//! Placement of decals on the cap model.
//!
//! Turns a loaded mesh hierarchy into classified sub-meshes and baked decal
//! targets, maps pointer hits on those targets to model-local placements and
//! keeps the per-decal state the renderer draws from.

pub mod assets;
pub mod bake;
pub mod classifier;
pub mod error;
pub mod hierarchy;
pub mod hit_mapper;
pub mod layer;
pub mod projection;
pub mod raycast;
pub mod targets;

pub use assets::{AssetError, AssetSlot, flag_url};
pub use classifier::{
    Classification, FabricInputs, MaterialClass, MeshClassifier, Region, SubMesh, SurfaceFill,
    surface_fill,
};
pub use error::PlacementError;
pub use hierarchy::{MaterialDesc, MeshData, MeshPrimitive, ModelHierarchy, NodeId};
pub use hit_mapper::{
    DecalSide, LocalPlacement, PointerHit, SurfaceHitMapper, euler_from_normal,
    orientation_from_normal,
};
pub use layer::{
    DEFAULT_DECAL_SCALE, DecalCompositionLayer, DecalInteraction, DecalSource, DecalTransform,
    DecalVisual, ERROR_PLACEHOLDER, LoadTicket, SELECTED_OUTLINE,
};
pub use projection::project_decal;
pub use raycast::{Ray, SurfaceHit, raycast_targets};
pub use targets::{DecalTargetGeometry, DecalTargets, TargetKey, TargetRegistry};
