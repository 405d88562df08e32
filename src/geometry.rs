//! Maps from reference elements into physical space.

pub mod affine;
pub mod multilinear;

use crate::{
  error::Result,
  linalg::{Coord, CoordRef, Matrix},
  Dim, GeometryType, ReferenceElement, Scalar,
};

/// Interface shared by all element geometries.
///
/// A geometry maps the local coordinates of its reference element to global
/// coordinates of dimension [`Geometry::dim_global`].
pub trait Geometry<T: Scalar> {
  fn reference_element(&self) -> &ReferenceElement<T>;

  fn geometry_type(&self) -> GeometryType {
    self.reference_element().geometry_type()
  }
  fn dim_local(&self) -> Dim {
    self.reference_element().dim()
  }
  fn dim_global(&self) -> Dim;

  fn ncorners(&self) -> usize {
    self.reference_element().ncorners()
  }
  /// Global position of corner `i`.
  fn corner(&self, i: usize) -> Result<Coord<T>> {
    let local = self.reference_element().corner(i)?;
    Ok(self.global(local))
  }
  /// Image of the reference element's barycenter.
  fn center(&self) -> Coord<T> {
    self.global(self.reference_element().center())
  }

  /// Evaluates the map at `local`.
  fn global<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Coord<T>;

  /// Local coordinate whose image is `global`.
  ///
  /// For embedded geometries (`dim_local < dim_global`) this is the
  /// least-squares solution.
  fn local<'a>(&self, global: impl Into<CoordRef<'a, T>>) -> Result<Coord<T>>;

  /// Transposed Jacobian (`dim_local x dim_global`) at `local`.
  fn jacobian_transposed<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Matrix<T>;

  fn jacobian<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Matrix<T> {
    self.jacobian_transposed(local).transpose()
  }

  /// (Pseudo-)inverse of the Jacobian, transposed, at `local`.
  fn jacobian_inverse_transposed<'a>(&self, local: impl Into<CoordRef<'a, T>>)
    -> Result<Matrix<T>>;

  /// Ratio of the physical to the reference measure at `local`.
  fn integration_element<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> T;

  /// Measure of the image.
  fn volume(&self) -> T;

  fn is_affine(&self) -> bool;
}

/// Panics if `coord` does not have `dim` components.
pub(crate) fn assert_coord_dim<T: Scalar>(name: &str, coord: &CoordRef<T>, dim: Dim) {
  assert_eq!(
    coord.len(),
    dim,
    "{name} coordinate has {} components, expected {dim}",
    coord.len()
  );
}
