//! Structured rectangular grids.
//!
//! The grid lies in the x–y plane with a single layer of cells of the given
//! depth in z. Only the four edge patches are created: the front and back
//! planes carry no flux and are not represented as faces, which makes the
//! mesh two-dimensional for every operator in [`crate::support::fvm`].

use glam::DVec3;

use super::{Mesh, MeshError, MeshParts, Patch, PatchKind};

/// A uniform `nx × ny` grid spanning `[0, lx] × [0, ly]`.
///
/// Cells are numbered row by row, `cell = j * nx + i`. Boundary patches are
/// named `left`, `right`, `bottom` and `top`, and are all walls until changed
/// with [`Mesh::with_patch_kind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangularGrid {
    pub nx: usize,
    pub ny: usize,
    pub lx: f64,
    pub ly: f64,
    pub depth: f64,
}

impl RectangularGrid {
    #[must_use]
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self {
            nx,
            ny,
            lx,
            ly,
            depth: 1.0,
        }
    }

    /// Returns the index of the cell in column `i`, row `j`.
    #[must_use]
    pub fn cell(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }
}

impl Mesh {
    /// Builds a rectangular grid mesh.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidGrid`] for an empty grid or a non-positive
    /// extent.
    pub fn rectangular(grid: &RectangularGrid) -> Result<Self, MeshError> {
        let RectangularGrid {
            nx,
            ny,
            lx,
            ly,
            depth,
        } = *grid;

        if nx == 0 || ny == 0 {
            return Err(MeshError::InvalidGrid {
                context: format!("{nx} x {ny} cells"),
            });
        }
        if !(lx > 0.0 && ly > 0.0 && depth > 0.0) {
            return Err(MeshError::InvalidGrid {
                context: format!("extent {lx} x {ly} x {depth}"),
            });
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let z = 0.5 * depth;
        let cell = |i: usize, j: usize| j * nx + i;

        let mut parts = MeshParts::default();
        for j in 0..ny {
            for i in 0..nx {
                parts.cell_centres.push(DVec3::new(
                    (i as f64 + 0.5) * dx,
                    (j as f64 + 0.5) * dy,
                    z,
                ));
                parts.cell_volumes.push(dx * dy * depth);
            }
        }

        let x_face = DVec3::new(dy * depth, 0.0, 0.0);
        let y_face = DVec3::new(0.0, dx * depth, 0.0);

        for j in 0..ny {
            for i in 0..nx - 1 {
                parts.push_internal(
                    DVec3::new((i + 1) as f64 * dx, (j as f64 + 0.5) * dy, z),
                    x_face,
                    cell(i, j),
                    cell(i + 1, j),
                );
            }
        }
        for j in 0..ny - 1 {
            for i in 0..nx {
                parts.push_internal(
                    DVec3::new((i as f64 + 0.5) * dx, (j + 1) as f64 * dy, z),
                    y_face,
                    cell(i, j),
                    cell(i, j + 1),
                );
            }
        }

        let start = parts.face_centres.len();
        for j in 0..ny {
            parts.push_boundary(DVec3::new(0.0, (j as f64 + 0.5) * dy, z), -x_face, cell(0, j));
        }
        parts.patches.push(Patch::new("left", PatchKind::Wall, start, ny));

        let start = parts.face_centres.len();
        for j in 0..ny {
            parts.push_boundary(DVec3::new(lx, (j as f64 + 0.5) * dy, z), x_face, cell(nx - 1, j));
        }
        parts.patches.push(Patch::new("right", PatchKind::Wall, start, ny));

        let start = parts.face_centres.len();
        for i in 0..nx {
            parts.push_boundary(DVec3::new((i as f64 + 0.5) * dx, 0.0, z), -y_face, cell(i, 0));
        }
        parts.patches.push(Patch::new("bottom", PatchKind::Wall, start, nx));

        let start = parts.face_centres.len();
        for i in 0..nx {
            parts.push_boundary(DVec3::new((i as f64 + 0.5) * dx, ly, z), y_face, cell(i, ny - 1));
        }
        parts.patches.push(Patch::new("top", PatchKind::Wall, start, nx));

        Mesh::new(parts)
    }
}

impl MeshParts {
    fn push_internal(&mut self, centre: DVec3, area: DVec3, owner: usize, neighbour: usize) {
        self.face_centres.push(centre);
        self.face_areas.push(area);
        self.owner.push(owner);
        self.neighbour.push(neighbour);
    }

    fn push_boundary(&mut self, centre: DVec3, area: DVec3, owner: usize) {
        self.face_centres.push(centre);
        self.face_areas.push(area);
        self.owner.push(owner);
    }
}
