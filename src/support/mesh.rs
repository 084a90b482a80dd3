//! Unstructured finite-volume mesh.
//!
//! Faces are numbered with all internal faces first, followed by the
//! boundary faces grouped contiguously by [`Patch`]. Every face has an owner
//! cell and an area vector `Sf` pointing out of the owner; internal faces
//! also have a neighbour cell.
//!
//! Interpolation weights and surface-normal-gradient delta coefficients are
//! computed once at construction.

mod builder;
mod error;

use std::ops::Range;

use glam::DVec3;
use serde::Deserialize;

pub use builder::RectangularGrid;
pub use error::MeshError;

/// The boundary-condition family of a patch.
///
/// The kind decides how the kernel treats a boundary face: walls carry no
/// flux and impose no-slip, inlets impose per-phase velocity and volume
/// fraction, outlets impose the mixture pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchKind {
    Wall,
    Inlet,
    Outlet,
}

/// A named, contiguous range of boundary faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    name: String,
    kind: PatchKind,
    start: usize,
    size: usize,
}

impl Patch {
    /// Creates a patch covering faces `start..start + size`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PatchKind {
        self.kind
    }

    /// Returns the global face indices of this patch.
    #[must_use]
    pub fn faces(&self) -> Range<usize> {
        self.start..self.start + self.size
    }
}

/// Raw mesh connectivity and geometry, validated by [`Mesh::new`].
#[derive(Debug, Clone, Default)]
pub struct MeshParts {
    pub cell_centres: Vec<DVec3>,
    pub cell_volumes: Vec<f64>,
    pub face_centres: Vec<DVec3>,
    pub face_areas: Vec<DVec3>,
    pub owner: Vec<usize>,
    /// Neighbour cell of each internal face; its length sets the internal face count.
    pub neighbour: Vec<usize>,
    pub patches: Vec<Patch>,
}

/// A validated finite-volume mesh with precomputed interpolation data.
#[derive(Debug, Clone)]
pub struct Mesh {
    cell_centres: Vec<DVec3>,
    cell_volumes: Vec<f64>,
    face_centres: Vec<DVec3>,
    face_areas: Vec<DVec3>,
    mag_sf: Vec<f64>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
    face_patch: Vec<usize>,
    weights: Vec<f64>,
    delta_coeffs: Vec<f64>,
    cell_cells: Vec<Vec<usize>>,
}

impl Mesh {
    /// Validates the parts and precomputes weights and delta coefficients.
    ///
    /// # Errors
    ///
    /// Returns a [`MeshError`] if array sizes disagree, an address is out of
    /// range, a volume or face area is not strictly positive, or the patches
    /// do not cover the boundary faces exactly once and in order.
    pub fn new(parts: MeshParts) -> Result<Self, MeshError> {
        let MeshParts {
            cell_centres,
            cell_volumes,
            face_centres,
            face_areas,
            owner,
            neighbour,
            patches,
        } = parts;

        let n_cells = cell_centres.len();
        let n_faces = face_centres.len();
        let n_internal = neighbour.len();

        if n_cells == 0 {
            return Err(MeshError::Empty);
        }
        if cell_volumes.len() != n_cells {
            return Err(MeshError::size("cell volumes", n_cells, cell_volumes.len()));
        }
        if face_areas.len() != n_faces {
            return Err(MeshError::size("face areas", n_faces, face_areas.len()));
        }
        if owner.len() != n_faces {
            return Err(MeshError::size("owner", n_faces, owner.len()));
        }
        if n_internal > n_faces {
            return Err(MeshError::size("neighbour", n_faces, n_internal));
        }

        if let Some(cell) = cell_volumes.iter().position(|v| !v.is_finite() || *v <= 0.0) {
            return Err(MeshError::NonPositiveVolume { cell });
        }
        for (face, &cell) in owner.iter().enumerate() {
            if cell >= n_cells {
                return Err(MeshError::BadAddress { face, cell });
            }
        }
        for (face, &cell) in neighbour.iter().enumerate() {
            if cell >= n_cells || cell == owner[face] {
                return Err(MeshError::BadAddress { face, cell });
            }
        }

        let mag_sf: Vec<f64> = face_areas.iter().map(|sf| sf.length()).collect();
        if let Some(face) = mag_sf.iter().position(|m| !m.is_finite() || *m <= 0.0) {
            return Err(MeshError::DegenerateFace { face });
        }

        let mut face_patch = vec![usize::MAX; n_faces];
        let mut next = n_internal;
        for (id, patch) in patches.iter().enumerate() {
            if patch.start != next || patch.start + patch.size > n_faces {
                return Err(MeshError::PatchLayout {
                    patch: patch.name.clone(),
                });
            }
            face_patch[patch.faces()].fill(id);
            next += patch.size;
        }
        if next != n_faces {
            return Err(MeshError::UncoveredFaces {
                first: next,
                count: n_faces - next,
            });
        }

        let mut weights = vec![1.0; n_faces];
        let mut delta_coeffs = vec![0.0; n_faces];
        for face in 0..n_faces {
            let n_hat = face_areas[face] / mag_sf[face];
            let own = cell_centres[owner[face]];
            if face < n_internal {
                let nei = cell_centres[neighbour[face]];
                let d_on = n_hat.dot(nei - own);
                let d_fn = n_hat.dot(nei - face_centres[face]);
                if !d_on.is_finite() || d_on <= 0.0 {
                    return Err(MeshError::DegenerateFace { face });
                }
                weights[face] = d_fn / d_on;
                delta_coeffs[face] = 1.0 / d_on;
            } else {
                let d_of = n_hat.dot(face_centres[face] - own);
                if !d_of.is_finite() || d_of <= 0.0 {
                    return Err(MeshError::DegenerateFace { face });
                }
                delta_coeffs[face] = 1.0 / d_of;
            }
        }

        let mut cell_cells = vec![Vec::new(); n_cells];
        for face in 0..n_internal {
            cell_cells[owner[face]].push(neighbour[face]);
            cell_cells[neighbour[face]].push(owner[face]);
        }

        Ok(Self {
            cell_centres,
            cell_volumes,
            face_centres,
            face_areas,
            mag_sf,
            owner,
            neighbour,
            patches,
            face_patch,
            weights,
            delta_coeffs,
            cell_cells,
        })
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cell_centres.len()
    }

    #[must_use]
    pub fn n_faces(&self) -> usize {
        self.face_centres.len()
    }

    #[must_use]
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    #[must_use]
    pub fn is_internal(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    #[must_use]
    pub fn cell_centres(&self) -> &[DVec3] {
        &self.cell_centres
    }

    #[must_use]
    pub fn cell_volumes(&self) -> &[f64] {
        &self.cell_volumes
    }

    #[must_use]
    pub fn face_centres(&self) -> &[DVec3] {
        &self.face_centres
    }

    /// Face area vectors `Sf`, pointing out of the owner cell.
    #[must_use]
    pub fn face_areas(&self) -> &[DVec3] {
        &self.face_areas
    }

    /// Face area magnitudes `|Sf|`.
    #[must_use]
    pub fn mag_sf(&self) -> &[f64] {
        &self.mag_sf
    }

    #[must_use]
    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    #[must_use]
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    /// Owner-side linear interpolation weights; 1 on boundary faces.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Inverse normal distances used by surface-normal gradients.
    #[must_use]
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.delta_coeffs
    }

    /// Cells sharing an internal face with `cell`.
    #[must_use]
    pub fn cell_cells(&self, cell: usize) -> &[usize] {
        &self.cell_cells[cell]
    }

    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Looks up a patch by name.
    #[must_use]
    pub fn patch(&self, name: &str) -> Option<&Patch> {
        self.patches.iter().find(|p| p.name == name)
    }

    /// Returns the patch owning a boundary face, or `None` for internal faces.
    #[must_use]
    pub fn face_patch(&self, face: usize) -> Option<&Patch> {
        self.patches.get(*self.face_patch.get(face)?)
    }

    /// Returns true if any patch is of the given kind.
    #[must_use]
    pub fn has_patch_kind(&self, kind: PatchKind) -> bool {
        self.patches.iter().any(|p| p.kind == kind && p.size > 0)
    }

    /// Changes the boundary-condition family of a named patch.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnknownPatch`] if no patch has this name.
    pub fn set_patch_kind(&mut self, name: &str, kind: PatchKind) -> Result<(), MeshError> {
        let patch = self
            .patches
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MeshError::UnknownPatch(name.to_owned()))?;
        patch.kind = kind;
        Ok(())
    }

    /// Builder-style variant of [`Mesh::set_patch_kind`].
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnknownPatch`] if no patch has this name.
    pub fn with_patch_kind(mut self, name: &str, kind: PatchKind) -> Result<Self, MeshError> {
        self.set_patch_kind(name, kind)?;
        Ok(self)
    }

    /// Total mesh volume.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.cell_volumes.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn two_cells() -> MeshParts {
        MeshParts {
            cell_centres: vec![DVec3::new(0.5, 0.5, 0.5), DVec3::new(1.5, 0.5, 0.5)],
            cell_volumes: vec![1.0, 1.0],
            face_centres: vec![
                DVec3::new(1.0, 0.5, 0.5),
                DVec3::new(0.0, 0.5, 0.5),
                DVec3::new(2.0, 0.5, 0.5),
            ],
            face_areas: vec![DVec3::X, DVec3::NEG_X, DVec3::X],
            owner: vec![0, 0, 1],
            neighbour: vec![1],
            patches: vec![
                Patch::new("left", PatchKind::Inlet, 1, 1),
                Patch::new("right", PatchKind::Outlet, 2, 1),
            ],
        }
    }

    #[test]
    fn weights_and_deltas() {
        let mesh = Mesh::new(two_cells()).unwrap();
        assert_eq!(mesh.n_internal_faces(), 1);
        assert_relative_eq!(mesh.weights()[0], 0.5);
        assert_relative_eq!(mesh.delta_coeffs()[0], 1.0);
        assert_relative_eq!(mesh.delta_coeffs()[1], 2.0);
        assert_eq!(mesh.face_patch(2).map(Patch::name), Some("right"));
        assert!(mesh.face_patch(0).is_none());
        assert_eq!(mesh.cell_cells(0), &[1]);
    }

    #[test]
    fn rejects_uncovered_boundary() {
        let mut parts = two_cells();
        parts.patches.pop();
        match Mesh::new(parts) {
            Err(MeshError::UncoveredFaces { first, count }) => {
                assert_eq!((first, count), (2, 1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_volume() {
        let mut parts = two_cells();
        parts.cell_volumes[1] = 0.0;
        assert!(matches!(
            Mesh::new(parts),
            Err(MeshError::NonPositiveVolume { cell: 1 })
        ));
    }

    #[test]
    fn patch_kind_can_change() {
        let mut mesh = Mesh::new(two_cells())
            .unwrap()
            .with_patch_kind("right", PatchKind::Wall)
            .unwrap();
        assert!(!mesh.has_patch_kind(PatchKind::Outlet));
        assert!(mesh.set_patch_kind("nowhere", PatchKind::Wall).is_err());
    }
}
