//! Geometries interpolating their corners multilinearly.
//!
//! The map is evaluated along the construction of the reference element:
//! a prism step interpolates linearly between the maps of its bottom and top
//! copy, a pyramid step scales the base map towards the apex. No basis
//! function tables are assembled.

use super::{affine::check_vertices, assert_coord_dim, Geometry};
use crate::{
  error::{Error, Result},
  linalg::{integration_element, invert_jacobian_transposed, Coord, CoordRef, InvertedJacobian, Matrix},
  quadrature::QuadRule,
  topology::Topology,
  Dim, GeometryType, ReferenceElement, Scalar,
};

use std::sync::Arc;
use tracing::{debug, trace};

/// Relative tolerance (in machine epsilons) used to detect the apex of a
/// pyramid step and to compare the Jacobians of prism copies.
pub const APEX_TOLERANCE_FACTOR: f64 = 16.0;

/// Quadrature points per direction used by [`MultiLinearGeometry::volume`].
pub const VOLUME_QUADRATURE_POINTS: usize = 4;

/// Parameters of the Newton iteration inverting a [`MultiLinearGeometry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonConfig {
  /// Number of updates before giving up.
  pub max_iterations: usize,
  /// The iteration stops once the squared update norm is at most
  /// `tolerance_factor` machine epsilons.
  pub tolerance_factor: f64,
}
impl Default for NewtonConfig {
  fn default() -> Self {
    Self {
      max_iterations: 100,
      tolerance_factor: 16.0,
    }
  }
}

#[derive(Debug, Clone)]
struct AffineCache<T: Scalar> {
  jacobian_transposed: Matrix<T>,
  inverted: InvertedJacobian<T>,
}

/// A geometry determined by the global positions of the reference corners.
#[derive(Debug, Clone)]
pub struct MultiLinearGeometry<T: Scalar> {
  reference_element: Arc<ReferenceElement<T>>,
  corners: Vec<Coord<T>>,
  /// Present iff the map was detected to be affine.
  affine: Option<AffineCache<T>>,
  config: NewtonConfig,
}

impl<T: Scalar> MultiLinearGeometry<T> {
  pub fn new(reference_element: Arc<ReferenceElement<T>>, corners: Vec<Coord<T>>) -> Result<Self> {
    check_vertices(&reference_element, &corners)?;

    let topology = reference_element.topology();
    let affine = is_affine_map(topology, &corners).then(|| {
      let center: Vec<T> = reference_element.center().iter().copied().collect();
      let (_, jacobian_transposed) = evaluate(topology, &corners, &center);
      let inverted = invert_jacobian_transposed(&jacobian_transposed);
      AffineCache {
        jacobian_transposed,
        inverted,
      }
    });

    Ok(Self {
      reference_element,
      corners,
      affine,
      config: NewtonConfig::default(),
    })
  }

  pub fn from_type(geometry_type: GeometryType, corners: Vec<Coord<T>>) -> Result<Self> {
    Self::new(ReferenceElement::of(geometry_type)?, corners)
  }

  /// Replaces the parameters of the Newton iteration used by `local`.
  pub fn with_config(mut self, config: NewtonConfig) -> Self {
    self.config = config;
    self
  }
  pub fn config(&self) -> &NewtonConfig {
    &self.config
  }

  pub fn corners(&self) -> &[Coord<T>] {
    &self.corners
  }

  fn evaluate(&self, local: CoordRef<T>) -> (Coord<T>, Matrix<T>) {
    assert_coord_dim("local", &local, self.dim_local());
    let local: Vec<T> = local.iter().copied().collect();
    evaluate(self.reference_element.topology(), &self.corners, &local)
  }
}

impl<T: Scalar> Geometry<T> for MultiLinearGeometry<T> {
  fn reference_element(&self) -> &ReferenceElement<T> {
    &self.reference_element
  }
  fn dim_global(&self) -> Dim {
    self.corners[0].len()
  }

  fn corner(&self, i: usize) -> Result<Coord<T>> {
    self
      .corners
      .get(i)
      .cloned()
      .ok_or_else(|| Error::out_of_range("corner", i, self.corners.len()))
  }

  fn global<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Coord<T> {
    let local = local.into();
    match &self.affine {
      Some(affine) => {
        assert_coord_dim("local", &local, self.dim_local());
        affine.jacobian_transposed.tr_mul(&local) + &self.corners[0]
      }
      None => self.evaluate(local).0,
    }
  }

  /// Inverts the map by Newton iteration starting at the reference center.
  ///
  /// Affine maps are inverted by a single update.
  fn local<'a>(&self, global: impl Into<CoordRef<'a, T>>) -> Result<Coord<T>> {
    let global = global.into();
    assert_coord_dim("global", &global, self.dim_global());
    let mut x = self.reference_element.center().clone();

    if let Some(affine) = &self.affine {
      let jit = affine
        .inverted
        .inverse_transposed
        .as_ref()
        .ok_or(Error::SingularJacobian)?;
      let residual = &global - &self.global(&x);
      return Ok(x + jit.tr_mul(&residual));
    }

    let tolerance = T::lit(self.config.tolerance_factor) * T::machine_epsilon();
    let mut update_norm = f64::INFINITY;
    for iteration in 0..self.config.max_iterations {
      let (image, jacobian_transposed) = self.evaluate(x.as_view());
      let jit = invert_jacobian_transposed(&jacobian_transposed)
        .inverse_transposed
        .ok_or_else(|| {
          debug!(iteration, "singular jacobian during newton iteration");
          Error::SingularJacobian
        })?;
      let delta = jit.tr_mul(&(&global - &image));
      x += &delta;

      let norm_squared = delta.norm_squared();
      update_norm = norm_squared.sqrt().to_f64_lossy();
      trace!(iteration, update_norm, "newton update");
      if norm_squared <= tolerance {
        return Ok(x);
      }
    }

    debug!(
      iterations = self.config.max_iterations,
      update_norm, "newton iteration did not converge"
    );
    Err(Error::ConvergenceFailure {
      iterations: self.config.max_iterations,
      update_norm,
    })
  }

  fn jacobian_transposed<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> Matrix<T> {
    let local = local.into();
    match &self.affine {
      Some(affine) => {
        assert_coord_dim("local", &local, self.dim_local());
        affine.jacobian_transposed.clone()
      }
      None => self.evaluate(local).1,
    }
  }

  fn jacobian_inverse_transposed<'a>(
    &self,
    local: impl Into<CoordRef<'a, T>>,
  ) -> Result<Matrix<T>> {
    let inverse_transposed = match &self.affine {
      Some(affine) => affine.inverted.inverse_transposed.clone(),
      None => invert_jacobian_transposed(&self.jacobian_transposed(local)).inverse_transposed,
    };
    inverse_transposed.ok_or(Error::SingularJacobian)
  }

  fn integration_element<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> T {
    match &self.affine {
      Some(affine) => affine.inverted.integration_element,
      None => integration_element(&self.jacobian_transposed(local)),
    }
  }

  /// Exact for affine maps, otherwise integrates the integration element with
  /// [`VOLUME_QUADRATURE_POINTS`] points per direction.
  fn volume(&self) -> T {
    match &self.affine {
      Some(affine) => affine.inverted.integration_element * self.reference_element.volume(),
      None => {
        let rule = QuadRule::for_topology(self.reference_element.topology(), VOLUME_QUADRATURE_POINTS)
          .expect("supported number of quadrature points");
        rule.apply(|x| self.integration_element(x))
      }
    }
  }

  fn is_affine(&self) -> bool {
    self.affine.is_some()
  }
}

/// Image and transposed Jacobian at `local` of the map of `topology` with
/// `corners`.
fn evaluate<T: Scalar>(topology: &Topology, corners: &[Coord<T>], local: &[T]) -> (Coord<T>, Matrix<T>) {
  let dim = topology.dim();
  let dim_global = corners[0].len();
  match topology {
    Topology::Point => (corners[0].clone(), Matrix::zeros(0, dim_global)),
    Topology::Prism(base) => {
      let n = base.ncorners();
      let (base_local, xn) = (&local[..dim - 1], local[dim - 1]);
      let (bottom, bottom_jt) = evaluate(base, &corners[..n], base_local);
      let (top, top_jt) = evaluate(base, &corners[n..], base_local);

      let weight = T::one() - xn;
      let image = &bottom * weight + &top * xn;
      let mut jt = Matrix::zeros(dim, dim_global);
      jt.rows_mut(0, dim - 1)
        .copy_from(&(bottom_jt * weight + top_jt * xn));
      jt.set_row(dim - 1, &(top - bottom).transpose());
      (image, jt)
    }
    Topology::Pyramid(base) => {
      let n = base.ncorners();
      let apex = &corners[n];
      let xn = local[dim - 1];
      let scale = T::one() - xn;
      let mut jt = Matrix::zeros(dim, dim_global);

      let tolerance = T::lit(APEX_TOLERANCE_FACTOR) * T::machine_epsilon();
      if scale.abs() > tolerance {
        let scaled: Vec<T> = local[..dim - 1].iter().map(|&x| x / scale).collect();
        let (base_image, base_jt) = evaluate(base, &corners[..n], &scaled);
        let image = &base_image * scale + apex * xn;
        let mut last = apex - &base_image;
        for (j, &x) in scaled.iter().enumerate() {
          last += base_jt.row(j).transpose() * x;
        }
        jt.rows_mut(0, dim - 1).copy_from(&base_jt);
        jt.set_row(dim - 1, &last.transpose());
        (image, jt)
      } else {
        // degenerate at the apex, only the direction towards it survives
        let (base_image, _) = evaluate(base, &corners[..n], &local[..dim - 1]);
        jt.set_row(dim - 1, &(apex - base_image).transpose());
        (apex.clone(), jt)
      }
    }
  }
}

/// Whether the multilinear map of `topology` with `corners` is affine.
fn is_affine_map<T: Scalar>(topology: &Topology, corners: &[Coord<T>]) -> bool {
  match topology {
    Topology::Point => true,
    Topology::Prism(base) => {
      let n = base.ncorners();
      let (bottom, top) = corners.split_at(n);
      if !(is_affine_map(base, bottom) && is_affine_map(base, top)) {
        return false;
      }
      let origin = vec![T::zero(); base.dim()];
      let (_, bottom_jt) = evaluate(base, bottom, &origin);
      let (_, top_jt) = evaluate(base, top, &origin);
      let scale = bottom_jt.norm().max(top_jt.norm());
      (bottom_jt - top_jt).norm() <= T::lit(APEX_TOLERANCE_FACTOR) * T::machine_epsilon() * scale
    }
    Topology::Pyramid(base) => is_affine_map(base, &corners[..base.ncorners()]),
  }
}
