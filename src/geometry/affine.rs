use super::{assert_coord_dim, Geometry};
use crate::{
  error::{Error, Result},
  linalg::{invert_jacobian_transposed, Coord, CoordRef, Matrix},
  Dim, GeometryType, ReferenceElement, Scalar,
};

use std::sync::Arc;

/// A geometry with constant Jacobian, `global(x) = origin + J x`.
///
/// The inverse Jacobian and the integration element are computed once at
/// construction.
#[derive(Debug, Clone)]
pub struct AffineGeometry<T: Scalar> {
  reference_element: Arc<ReferenceElement<T>>,
  origin: Coord<T>,
  jacobian_transposed: Matrix<T>,
  /// `None` for rank deficient Jacobians.
  jacobian_inverse_transposed: Option<Matrix<T>>,
  integration_element: T,
}

impl<T: Scalar> AffineGeometry<T> {
  /// The affine map sending the reference corners onto `vertices`.
  ///
  /// Only the origin corner and the corners at the unit vectors determine the
  /// map; the remaining vertices are assumed consistent with it.
  pub fn from_vertices(
    reference_element: Arc<ReferenceElement<T>>,
    vertices: &[Coord<T>],
  ) -> Result<Self> {
    check_vertices(&reference_element, vertices)?;
    let dim_global = vertices[0].len();
    let origin = vertices[0].clone();
    let spanning = reference_element.spanning_corners();
    let mut jacobian_transposed = Matrix::zeros(spanning.len(), dim_global);
    for (k, &corner) in spanning.iter().enumerate() {
      jacobian_transposed.set_row(k, &(&vertices[corner] - &origin).transpose());
    }
    Self::from_jacobian_transposed(reference_element, origin, jacobian_transposed)
  }

  pub fn from_type_and_vertices(geometry_type: GeometryType, vertices: &[Coord<T>]) -> Result<Self> {
    Self::from_vertices(ReferenceElement::of(geometry_type)?, vertices)
  }

  pub fn from_jacobian_transposed(
    reference_element: Arc<ReferenceElement<T>>,
    origin: Coord<T>,
    jacobian_transposed: Matrix<T>,
  ) -> Result<Self> {
    let (nrows, ncols) = jacobian_transposed.shape();
    if nrows != reference_element.dim() {
      return Err(Error::dimension_mismatch(
        "jacobian transposed rows",
        reference_element.dim(),
        nrows,
      ));
    }
    if ncols != origin.len() {
      return Err(Error::dimension_mismatch(
        "jacobian transposed columns",
        origin.len(),
        ncols,
      ));
    }

    let inverted = invert_jacobian_transposed(&jacobian_transposed);
    Ok(Self {
      reference_element,
      origin,
      jacobian_transposed,
      jacobian_inverse_transposed: inverted.inverse_transposed,
      integration_element: inverted.integration_element,
    })
  }

  pub fn from_type_and_jacobian_transposed(
    geometry_type: GeometryType,
    origin: Coord<T>,
    jacobian_transposed: Matrix<T>,
  ) -> Result<Self> {
    Self::from_jacobian_transposed(
      ReferenceElement::of(geometry_type)?,
      origin,
      jacobian_transposed,
    )
  }

  pub fn origin(&self) -> &Coord<T> {
    &self.origin
  }
}

impl<T: Scalar> Geometry<T> for AffineGeometry<T> {
  fn reference_element(&self) -> &ReferenceElement<T> {
    &self.reference_element
  }
  fn dim_global(&self) -> Dim {
    self.origin.len()
  }

  fn global<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Coord<T> {
    let local = local.into();
    assert_coord_dim("local", &local, self.dim_local());
    self.jacobian_transposed.tr_mul(&local) + &self.origin
  }

  fn local<'a>(&self, global: impl Into<CoordRef<'a, T>>) -> Result<Coord<T>> {
    let global = global.into();
    assert_coord_dim("global", &global, self.dim_global());
    let jit = self
      .jacobian_inverse_transposed
      .as_ref()
      .ok_or(Error::SingularJacobian)?;
    Ok(jit.tr_mul(&(&global - &self.origin)))
  }

  fn jacobian_transposed<'a>(&self, _local: impl Into<CoordRef<'a, T>>) -> Matrix<T> {
    self.jacobian_transposed.clone()
  }

  fn jacobian_inverse_transposed<'a>(
    &self,
    _local: impl Into<CoordRef<'a, T>>,
  ) -> Result<Matrix<T>> {
    self
      .jacobian_inverse_transposed
      .clone()
      .ok_or(Error::SingularJacobian)
  }

  fn integration_element<'a>(&self, _local: impl Into<CoordRef<'a, T>>) -> T {
    self.integration_element
  }

  fn volume(&self) -> T {
    self.integration_element * self.reference_element.volume()
  }

  fn is_affine(&self) -> bool {
    true
  }
}

/// Checks that there is one vertex per reference corner, all of one dimension.
pub(crate) fn check_vertices<T: Scalar>(
  reference_element: &ReferenceElement<T>,
  vertices: &[Coord<T>],
) -> Result<()> {
  if vertices.len() != reference_element.ncorners() {
    return Err(Error::dimension_mismatch(
      "vertex count",
      reference_element.ncorners(),
      vertices.len(),
    ));
  }
  let dim_global = vertices[0].len();
  if let Some(v) = vertices.iter().find(|v| v.len() != dim_global) {
    return Err(Error::dimension_mismatch("vertex dimension", dim_global, v.len()));
  }
  Ok(())
}
