use crate::support::{field::FieldValue, mesh::Mesh};

/// A finite-volume matrix in LDU form.
///
/// Coefficients are scalar; the unknown and the source may be scalars or
/// vectors. `upper[f]` multiplies the neighbour value in the owner's row of
/// internal face `f`, `lower[f]` the owner value in the neighbour's row.
/// Rows are not divided by cell volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FvMatrix<T> {
    diag: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
    source: Vec<T>,
}

impl<T: FieldValue> FvMatrix<T> {
    /// Creates an all-zero matrix sized for the mesh.
    #[must_use]
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            diag: vec![0.0; mesh.n_cells()],
            upper: vec![0.0; mesh.n_internal_faces()],
            lower: vec![0.0; mesh.n_internal_faces()],
            source: vec![T::ZERO; mesh.n_cells()],
        }
    }

    #[must_use]
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    pub fn diag_mut(&mut self) -> &mut [f64] {
        &mut self.diag
    }

    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn source(&self) -> &[T] {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut [T] {
        &mut self.source
    }

    /// Adds a symmetric face coupling `c (x_P - x_N)` to both rows.
    pub fn add_symmetric(&mut self, mesh: &Mesh, face: usize, c: f64) {
        let own = mesh.owner()[face];
        let nei = mesh.neighbour()[face];
        self.diag[own] += c;
        self.diag[nei] += c;
        self.upper[face] -= c;
        self.lower[face] -= c;
    }

    /// Adds an asymmetric face coupling with separate row coefficients.
    ///
    /// The owner row gains `c_own (x_P - x_N)`, the neighbour row
    /// `c_nei (x_N - x_P)`.
    pub fn add_asymmetric(&mut self, mesh: &Mesh, face: usize, c_own: f64, c_nei: f64) {
        let own = mesh.owner()[face];
        let nei = mesh.neighbour()[face];
        self.diag[own] += c_own;
        self.upper[face] -= c_own;
        self.diag[nei] += c_nei;
        self.lower[face] -= c_nei;
    }

    /// Matrix-vector product `A x`.
    #[must_use]
    pub fn apply(&self, mesh: &Mesh, x: &[T]) -> Vec<T> {
        let mut y: Vec<T> = self.diag.iter().zip(x).map(|(d, x)| *x * *d).collect();
        self.add_off_diagonal(mesh, x, &mut y);
        y
    }

    /// Cell residual `b - A x`.
    #[must_use]
    pub fn residual(&self, mesh: &Mesh, x: &[T]) -> Vec<T> {
        self.apply(mesh, x)
            .into_iter()
            .zip(&self.source)
            .map(|(ax, b)| *b - ax)
            .collect()
    }

    /// Diagonal coefficient per unit volume, `A = a_P / V`.
    #[must_use]
    pub fn a(&self, mesh: &Mesh) -> Vec<f64> {
        self.diag
            .iter()
            .zip(mesh.cell_volumes())
            .map(|(d, v)| d / v)
            .collect()
    }

    /// Off-diagonal operator per unit volume, `H = (b - Σ a_N x_N) / V`.
    #[must_use]
    pub fn h(&self, mesh: &Mesh, x: &[T]) -> Vec<T> {
        let mut off = vec![T::ZERO; self.diag.len()];
        self.add_off_diagonal(mesh, x, &mut off);
        self.source
            .iter()
            .zip(off)
            .zip(mesh.cell_volumes())
            .map(|((b, n), v)| (*b - n) * (1.0 / v))
            .collect()
    }

    fn add_off_diagonal(&self, mesh: &Mesh, x: &[T], y: &mut [T]) {
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        for f in 0..self.upper.len() {
            let (own, nei) = (owner[f], neighbour[f]);
            y[own] = y[own] + x[nei] * self.upper[f];
            y[nei] = y[nei] + x[own] * self.lower[f];
        }
    }
}

impl FvMatrix<f64> {
    /// Pins `x[cell]` towards `value` so a pure-Neumann system becomes definite.
    pub fn set_reference(&mut self, cell: usize, value: f64) {
        let d = self.diag[cell];
        self.source[cell] += d * value;
        self.diag[cell] += d;
    }

    /// Returns true if the off-diagonal coefficients are symmetric.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.upper
            .iter()
            .zip(&self.lower)
            .all(|(u, l)| (u - l).abs() <= 1e-14 * u.abs().max(l.abs()))
    }
}
