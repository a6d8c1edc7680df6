//! Decal target geometries and their lifecycle.
//!
//! A [`DecalTargets`] set is built once per loaded model and is read-only
//! afterwards; renderers share it through an `Arc`. [`TargetRegistry`] holds
//! the current set and drops it when the model is swapped or unloaded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use capforge_design::TargetRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hierarchy::MeshPrimitive;

/// Stable `parent/mesh` key of an addressable sub-mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey(String);

impl TargetKey {
    pub fn new(parent_name: &str, mesh_name: &str) -> Self {
        Self(format!("{parent_name}/{mesh_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&TargetRef> for TargetKey {
    fn from(target: &TargetRef) -> Self {
        Self::new(&target.parent_name, &target.mesh_name)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Baked copy of a sub-mesh in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalTargetGeometry {
    pub key: TargetKey,
    pub parent_name: String,
    pub mesh_name: String,
    pub geometry: MeshPrimitive,
}

impl DecalTargetGeometry {
    pub fn target_ref(&self) -> TargetRef {
        TargetRef::new(&self.parent_name, &self.mesh_name)
    }
}

/// All decal targets of one model, one per addressable sub-mesh.
#[derive(Debug, Clone, Default)]
pub struct DecalTargets {
    geometries: Vec<DecalTargetGeometry>,
    index: HashMap<TargetKey, usize>,
    main: Option<usize>,
}

impl DecalTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target. A later geometry with an existing key is ignored.
    pub fn insert(&mut self, target: DecalTargetGeometry) -> bool {
        if self.index.contains_key(&target.key) {
            debug!("Duplicate decal target {} ignored", target.key);
            return false;
        }
        self.index.insert(target.key.clone(), self.geometries.len());
        self.geometries.push(target);
        true
    }

    /// Mark the fallback target for references that no longer resolve.
    pub fn set_main(&mut self, key: &TargetKey) -> bool {
        match self.index.get(key) {
            Some(&index) => {
                self.main = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &TargetKey) -> Option<&DecalTargetGeometry> {
        self.index.get(key).map(|&i| &self.geometries[i])
    }

    pub fn main(&self) -> Option<&DecalTargetGeometry> {
        self.main.map(|i| &self.geometries[i])
    }

    /// Look up a decal's target, falling back to the main target when the
    /// reference is missing or names a mesh from an older model.
    pub fn resolve(&self, target: Option<&TargetRef>) -> Option<&DecalTargetGeometry> {
        target
            .and_then(|t| self.get(&TargetKey::from(t)))
            .or_else(|| self.main())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecalTargetGeometry> {
        self.geometries.iter()
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Owner of the current model's targets.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    current: Option<Arc<DecalTargets>>,
    generation: u64,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install targets for a newly loaded model, disposing the previous set.
    pub fn replace(&mut self, targets: DecalTargets) -> Arc<DecalTargets> {
        self.dispose();
        self.generation += 1;
        info!(
            "Installed {} decal targets (generation {})",
            targets.len(),
            self.generation
        );
        let shared = Arc::new(targets);
        self.current = Some(Arc::clone(&shared));
        shared
    }

    /// Drop the current targets, e.g. on unmount.
    pub fn dispose(&mut self) {
        if let Some(previous) = self.current.take() {
            info!(
                "Disposed {} decal targets (generation {})",
                previous.len(),
                self.generation
            );
        }
    }

    pub fn current(&self) -> Option<Arc<DecalTargets>> {
        self.current.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::quad;

    fn target(parent: &str, mesh: &str) -> DecalTargetGeometry {
        DecalTargetGeometry {
            key: TargetKey::new(parent, mesh),
            parent_name: parent.to_string(),
            mesh_name: mesh.to_string(),
            geometry: quad(),
        }
    }

    fn targets() -> DecalTargets {
        let mut targets = DecalTargets::new();
        targets.insert(target("main_cap", "crown"));
        targets.insert(target("bill", "visor"));
        targets.set_main(&TargetKey::new("main_cap", "crown"));
        targets
    }

    #[test]
    fn test_one_target_per_key() {
        let mut targets = targets();
        assert!(!targets.insert(target("bill", "visor")));
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_stale_reference_falls_back_to_main() {
        let targets = targets();
        let visor = TargetRef::new("bill", "visor");
        assert_eq!(targets.resolve(Some(&visor)).unwrap().mesh_name, "visor");

        let stale = TargetRef::new("main_cap", "crown_v1");
        assert_eq!(targets.resolve(Some(&stale)).unwrap().mesh_name, "crown");
        assert_eq!(targets.resolve(None).unwrap().mesh_name, "crown");
    }

    #[test]
    fn test_registry_replace_disposes_previous() {
        let mut registry = TargetRegistry::new();
        let first = registry.replace(targets());
        assert_eq!(Arc::strong_count(&first), 2);

        let second = registry.replace(DecalTargets::new());
        assert_eq!(Arc::strong_count(&first), 1);
        assert_eq!(registry.generation(), 2);
        assert!(Arc::ptr_eq(&second, &registry.current().unwrap()));

        registry.dispose();
        assert!(registry.current().is_none());
        assert_eq!(Arc::strong_count(&second), 1);
    }
}
