//! Tunables of the snapping engine and per-query parameters.
//!
//! Settings deserialize from TOML; every field has a default, so a
//! partial file only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapError};

/// Orthographic ray starts further than this (in local units) from the
/// geometry get moved forward before ray casting.
pub const ORTHO_RAY_START_CORRECTION: f64 = 400.0;

/// Offset pushing the occlusion plane past the hit face, so the face's
/// own far vertices still count as in front.
pub const OCCLUSION_PLANE_EPSILON: f64 = 5e-6;

/// Shape of one family of acceleration trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Maximum children per node.
    pub arity: usize,
    /// Maximum primitives per leaf.
    pub leaf_size: usize,
}

impl TreeSettings {
    const TRIANGLES: Self = Self {
        arity: 4,
        leaf_size: 1,
    };
    const ELEMENTS: Self = Self {
        arity: 2,
        leaf_size: 1,
    };

    fn validate(&self, name: &'static str) -> Result<()> {
        if self.arity < 2 {
            return Err(SnapError::InvalidSetting {
                name,
                reason: "arity must be at least 2",
            });
        }
        if self.leaf_size < 1 {
            return Err(SnapError::InvalidSetting {
                name,
                reason: "leaf_size must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self::ELEMENTS
    }
}

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// See [`ORTHO_RAY_START_CORRECTION`].
    pub ortho_ray_start_correction: f64,
    /// See [`OCCLUSION_PLANE_EPSILON`].
    pub occlusion_plane_epsilon: f64,
    /// Triangle trees.
    pub triangle_tree: TreeSettings,
    /// Vertex trees.
    pub vert_tree: TreeSettings,
    /// Edge trees.
    pub edge_tree: TreeSettings,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            ortho_ray_start_correction: ORTHO_RAY_START_CORRECTION,
            occlusion_plane_epsilon: OCCLUSION_PLANE_EPSILON,
            triangle_tree: TreeSettings::TRIANGLES,
            vert_tree: TreeSettings::ELEMENTS,
            edge_tree: TreeSettings::ELEMENTS,
        }
    }
}

impl SnapSettings {
    /// Parse and validate settings from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.ortho_ray_start_correction >= 0.0) {
            return Err(SnapError::InvalidSetting {
                name: "ortho_ray_start_correction",
                reason: "must be a non-negative number",
            });
        }
        if !(self.occlusion_plane_epsilon >= 0.0) {
            return Err(SnapError::InvalidSetting {
                name: "occlusion_plane_epsilon",
                reason: "must be a non-negative number",
            });
        }
        self.triangle_tree.validate("triangle_tree")?;
        self.vert_tree.validate("vert_tree")?;
        self.edge_tree.validate("edge_tree")?;
        Ok(())
    }
}

/// Which bases take part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapSelect {
    /// Every visible base.
    #[default]
    All,
    /// Skip bases that are or were selected.
    NotSelected,
    /// Skip the active base.
    NotActive,
}

/// Per-query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapObjectParams {
    /// Base selection filter.
    pub snap_select: SnapSelect,
    /// Snap to the edit cage of the object in edit mode rather than its
    /// evaluated mesh.
    pub use_object_edit_cage: bool,
}

impl Default for SnapObjectParams {
    fn default() -> Self {
        Self {
            snap_select: SnapSelect::All,
            use_object_edit_cage: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = SnapSettings::default();
        assert_eq!(s.ortho_ray_start_correction, 400.0);
        assert_eq!(s.occlusion_plane_epsilon, 5e-6);
        assert_eq!(s.triangle_tree.arity, 4);
        assert_eq!(s.vert_tree.arity, 2);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let s = SnapSettings::from_toml_str(
            r#"
            ortho_ray_start_correction = 50.0

            [edge_tree]
            arity = 8
            "#,
        )
        .unwrap();
        assert_eq!(s.ortho_ray_start_correction, 50.0);
        assert_eq!(s.occlusion_plane_epsilon, OCCLUSION_PLANE_EPSILON);
        assert_eq!(s.edge_tree.arity, 8);
        assert_eq!(s.edge_tree.leaf_size, 1);
        assert_eq!(s.triangle_tree.arity, 4);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SnapSettings::from_toml_str("[vert_tree]\narity = 1"),
            Err(SnapError::InvalidSetting { name: "vert_tree", .. })
        ));
        assert!(SnapSettings::from_toml_str("occlusion_plane_epsilon = -1.0").is_err());
        assert!(matches!(
            SnapSettings::from_toml_str("ortho_ray_start_correction = \"far\""),
            Err(SnapError::Parse(_))
        ));
    }

    #[test]
    fn test_params_from_toml() {
        let p: SnapObjectParams = toml::from_str("snap_select = \"not_active\"").unwrap();
        assert_eq!(p.snap_select, SnapSelect::NotActive);
        assert!(p.use_object_edit_cage);
    }
}
