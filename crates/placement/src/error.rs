use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Pointer hit has no face data")]
    MissingFaceData,
    #[error("Pointer hit position is not finite")]
    NonFiniteHit,
    #[error("Model transform is not invertible")]
    SingularTransform,
    #[error("Gizmo transform is not finite")]
    NonFiniteTransform,
    #[error("Unknown decal: {0}")]
    UnknownDecal(String),
}
