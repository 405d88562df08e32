//! Geometric and topological properties of reference elements.

mod cache;
pub mod table;

use table::{SubEntity, SubEntityTable};

use crate::{
  error::{Error, Result},
  geometry::affine::AffineGeometry,
  linalg::{generalized_cross, Coord, CoordRef, Matrix},
  topology::Topology,
  Codim, Dim, GeometryType, Scalar,
};

use std::sync::Arc;
use tracing::debug;

/// Tolerance (in machine epsilons) of [`ReferenceElement::check_inside`].
pub const INSIDE_TOLERANCE_FACTOR: f64 = 64.0;

/// Affine embedding of a subentity's reference element into its parent.
#[derive(Debug, Clone)]
struct Embedding<T: Scalar> {
  origin: Coord<T>,
  jacobian_transposed: Matrix<T>,
}

/// A reference element: subentity counts and incidence, corners, barycenters,
/// volume, containment test and the embeddings of all subentities.
///
/// Subentities are addressed by `(i, codim)`. Reference elements are built once
/// per geometry type and scalar type and shared, see [`ReferenceElement::of`].
#[derive(Debug)]
pub struct ReferenceElement<T: Scalar> {
  geometry_type: GeometryType,
  topology: Topology,
  table: Arc<SubEntityTable>,
  corners: Vec<Coord<T>>,
  spanning_corners: Vec<usize>,
  barycenters: Vec<Vec<Coord<T>>>,
  embeddings: Vec<Vec<Embedding<T>>>,
  integration_normals: Vec<Coord<T>>,
  volume: T,
}

/// The shared reference element of `geometry_type`.
pub fn reference_element<T: Scalar>(geometry_type: GeometryType) -> Result<Arc<ReferenceElement<T>>> {
  ReferenceElement::of(geometry_type)
}

impl<T: Scalar> ReferenceElement<T> {
  /// The shared reference element of `geometry_type`, built on first use.
  pub fn of(geometry_type: GeometryType) -> Result<Arc<Self>> {
    let topology = geometry_type
      .topology()
      .ok_or(Error::NoReferenceElement(geometry_type))?;
    Ok(cache::get_or_build(geometry_type, || {
      Self::build(geometry_type, topology)
    }))
  }

  fn build(geometry_type: GeometryType, topology: Topology) -> Self {
    debug!(%geometry_type, scalar = std::any::type_name::<T>(), "building reference element");
    let dim = topology.dim();
    let table = SubEntityTable::of(geometry_type, &topology);

    let corners: Vec<Coord<T>> = topology
      .corner_coords()
      .into_iter()
      .map(|c| Coord::from_iterator(dim, c.into_iter().map(T::lit)))
      .collect();

    let barycenters: Vec<Vec<Coord<T>>> = (0..=dim)
      .map(|codim| {
        (0..table.size(codim))
          .map(|i| {
            let entity = table.get(codim, i).expect("index within size");
            let mut barycenter = Coord::zeros(dim);
            entity.corners.iter().for_each(|&c| barycenter += &corners[c]);
            barycenter /= T::lit(entity.corners.len() as f64);
            barycenter
          })
          .collect()
      })
      .collect();

    let embeddings: Vec<Vec<Embedding<T>>> = (0..=dim)
      .map(|codim| {
        (0..table.size(codim))
          .map(|i| {
            let entity = table.get(codim, i).expect("index within size");
            embed(entity, &corners)
          })
          .collect()
      })
      .collect();

    let center = &barycenters[0][0];
    let integration_normals = if dim == 0 {
      Vec::new()
    } else {
      embeddings[1]
        .iter()
        .zip(&barycenters[1])
        .map(|(face, face_center)| {
          let normal = generalized_cross(&face.jacobian_transposed);
          if normal.dot(&(face_center - center)) < T::zero() {
            -normal
          } else {
            normal
          }
        })
        .collect()
    };

    Self {
      geometry_type,
      spanning_corners: topology.spanning_corners(),
      volume: T::lit(topology.volume()),
      topology,
      table,
      corners,
      barycenters,
      embeddings,
      integration_normals,
    }
  }

  pub fn dim(&self) -> Dim {
    self.topology.dim()
  }
  pub fn geometry_type(&self) -> GeometryType {
    self.geometry_type
  }
  pub fn topology(&self) -> &Topology {
    &self.topology
  }

  fn entity(&self, i: usize, codim: Codim) -> Result<&SubEntity> {
    if codim > self.dim() {
      return Err(Error::out_of_range("codimension", codim, self.dim() + 1));
    }
    self
      .table
      .get(codim, i)
      .ok_or_else(|| Error::out_of_range("subentity", i, self.size(codim)))
  }

  /// Number of subentities of codimension `codim`.
  pub fn size(&self, codim: Codim) -> usize {
    self.table.size(codim)
  }

  /// Number of codim `cc` subentities of the element contained in subentity
  /// `(i, c)`. Zero if `cc < c`.
  pub fn sub_size(&self, i: usize, c: Codim, cc: Codim) -> Result<usize> {
    self.sub_entities(i, c, cc).map(<[usize]>::len)
  }

  /// Element index of the `ii`-th codim `cc` subentity of subentity `(i, c)`.
  ///
  /// Both `cc` and the returned index are relative to the element itself, not
  /// to subentity `(i, c)`.
  pub fn sub_entity(&self, i: usize, c: Codim, ii: usize, cc: Codim) -> Result<usize> {
    let subs = self.sub_entities(i, c, cc)?;
    subs
      .get(ii)
      .copied()
      .ok_or_else(|| Error::out_of_range("sub-subentity", ii, subs.len()))
  }

  /// Element indices of all codim `cc` subentities of subentity `(i, c)`.
  pub fn sub_entities(&self, i: usize, c: Codim, cc: Codim) -> Result<&[usize]> {
    let entity = self.entity(i, c)?;
    entity
      .sub_entities
      .get(cc)
      .map(Vec::as_slice)
      .ok_or_else(|| Error::out_of_range("codimension", cc, self.dim() + 1))
  }

  /// Geometry type of subentity `(i, c)`.
  pub fn sub_type(&self, i: usize, c: Codim) -> Result<GeometryType> {
    self.entity(i, c).map(|e| e.geometry_type)
  }

  /// Barycenter of the corners of subentity `(i, c)`.
  pub fn position(&self, i: usize, c: Codim) -> Result<&Coord<T>> {
    self.entity(i, c)?;
    Ok(&self.barycenters[c][i])
  }

  pub fn center(&self) -> &Coord<T> {
    &self.barycenters[0][0]
  }

  pub fn ncorners(&self) -> usize {
    self.corners.len()
  }
  pub fn corners(&self) -> &[Coord<T>] {
    &self.corners
  }
  pub fn corner(&self, i: usize) -> Result<&Coord<T>> {
    self
      .corners
      .get(i)
      .ok_or_else(|| Error::out_of_range("corner", i, self.ncorners()))
  }

  /// For every local direction `k`, the corner located at the unit vector `e_k`.
  pub(crate) fn spanning_corners(&self) -> &[usize] {
    &self.spanning_corners
  }

  pub fn volume(&self) -> T {
    self.volume
  }

  /// Whether `local` lies in the reference element (up to a small tolerance).
  ///
  /// Non-finite coordinates and coordinates of the wrong dimension are outside.
  pub fn check_inside<'a>(&self, local: impl Into<CoordRef<'a, T>>) -> bool {
    let local = local.into();
    if local.len() != self.dim() || local.iter().any(|x| !x.is_finite()) {
      return false;
    }

    let tolerance = T::lit(INSIDE_TOLERANCE_FACTOR) * T::machine_epsilon();
    let mut factor = T::one();
    let mut topology = &self.topology;
    while let Some(base) = topology.base() {
      let xn = local[topology.dim() - 1];
      if !(xn > -tolerance && factor - xn > -tolerance) {
        return false;
      }
      if let Topology::Pyramid(_) = topology {
        factor -= xn;
      }
      topology = base;
    }
    true
  }

  /// Outer normal of face `face` whose length is the face's integration element.
  pub fn integration_outer_normal(&self, face: usize) -> Result<&Coord<T>> {
    self
      .integration_normals
      .get(face)
      .ok_or_else(|| Error::out_of_range("face", face, self.integration_normals.len()))
  }

  /// The embedding of subentity `(i, c)` into this reference element.
  pub fn geometry(&self, i: usize, c: Codim) -> Result<AffineGeometry<T>> {
    let sub_type = self.sub_type(i, c)?;
    let embedding = &self.embeddings[c][i];
    AffineGeometry::from_jacobian_transposed(
      ReferenceElement::of(sub_type)?,
      embedding.origin.clone(),
      embedding.jacobian_transposed.clone(),
    )
  }
}

fn embed<T: Scalar>(entity: &SubEntity, corners: &[Coord<T>]) -> Embedding<T> {
  let dim = corners[0].len();
  let sub_topology = entity
    .geometry_type
    .topology()
    .expect("subentities have a topology");
  let origin = corners[entity.corners[0]].clone();
  let spanning = sub_topology.spanning_corners();
  let mut jacobian_transposed = Matrix::zeros(spanning.len(), dim);
  for (k, &local) in spanning.iter().enumerate() {
    let direction = &corners[entity.corners[local]] - &origin;
    jacobian_transposed.set_row(k, &direction.transpose());
  }
  Embedding {
    origin,
    jacobian_transposed,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    geometry::Geometry,
    geometry_type::{HEXAHEDRON, PRISM, PYRAMID, QUADRILATERAL, TETRAHEDRON, TRIANGLE},
    topology::{normalize, num_topologies},
  };

  use approx::assert_relative_eq;

  fn all_types(max_dim: Dim) -> impl Iterator<Item = GeometryType> {
    (0..=max_dim).flat_map(|dim| {
      (0..num_topologies(dim) as u32)
        .filter(|&id| normalize(id) == id)
        .map(move |id| GeometryType::from_id(dim, id).unwrap())
    })
  }

  fn coord(values: &[f64]) -> Coord<f64> {
    Coord::from_row_slice(values)
  }

  #[test]
  fn cube_and_simplex_sizes() {
    let cube = ReferenceElement::<f64>::of(HEXAHEDRON).unwrap();
    assert_eq!((0..=3).map(|c| cube.size(c)).collect::<Vec<_>>(), [1, 6, 12, 8]);
    let tet = ReferenceElement::<f64>::of(TETRAHEDRON).unwrap();
    assert_eq!((0..=3).map(|c| tet.size(c)).collect::<Vec<_>>(), [1, 4, 6, 4]);
    assert_eq!(tet.size(4), 0);
  }

  #[test]
  fn sub_entity_queries() {
    let triangle = ReferenceElement::<f64>::of(TRIANGLE).unwrap();
    assert_eq!(triangle.sub_entities(2, 1, 2).unwrap(), [1, 2]);
    assert_eq!(triangle.sub_entity(1, 1, 1, 2).unwrap(), 2);
    assert_eq!(triangle.sub_size(0, 0, 1).unwrap(), 3);
    assert_eq!(triangle.sub_size(0, 1, 0).unwrap(), 0);
    assert_eq!(triangle.sub_type(0, 1).unwrap(), GeometryType::simplex(1));

    let prism = ReferenceElement::<f64>::of(PRISM).unwrap();
    let face_types: Vec<_> = (0..5).map(|i| prism.sub_type(i, 1).unwrap()).collect();
    assert_eq!(
      face_types,
      [QUADRILATERAL, QUADRILATERAL, QUADRILATERAL, TRIANGLE, TRIANGLE]
    );
  }

  #[test]
  fn out_of_range() {
    let quad = ReferenceElement::<f64>::of(QUADRILATERAL).unwrap();
    assert!(matches!(
      quad.position(4, 1),
      Err(Error::OutOfRangeIndex { index: 4, bound: 4, .. })
    ));
    assert!(quad.sub_type(0, 3).is_err());
    assert!(quad.sub_entity(0, 1, 2, 2).is_err());
    assert!(quad.sub_entities(0, 1, 3).is_err());
    assert!(quad.corner(4).is_err());
    assert!(quad.integration_outer_normal(4).is_err());
    assert!(ReferenceElement::<f64>::of(GeometryType::cube(0))
      .unwrap()
      .integration_outer_normal(0)
      .is_err());
  }

  #[test]
  fn none_has_no_reference_element() {
    let none = GeometryType::none(2);
    assert_eq!(
      ReferenceElement::<f64>::of(none).unwrap_err(),
      Error::NoReferenceElement(none)
    );
  }

  #[test]
  fn shared() {
    let a = ReferenceElement::<f64>::of(PYRAMID).unwrap();
    let b = reference_element::<f64>(PYRAMID).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    let single = reference_element::<f32>(PYRAMID).unwrap();
    assert_eq!(single.geometry_type(), a.geometry_type());
  }

  #[test]
  fn volumes() {
    let volume = |gt| ReferenceElement::<f64>::of(gt).unwrap().volume();
    assert_relative_eq!(volume(GeometryType::cube(0)), 1.0);
    assert_relative_eq!(volume(TRIANGLE), 0.5);
    assert_relative_eq!(volume(QUADRILATERAL), 1.0);
    assert_relative_eq!(volume(TETRAHEDRON), 1.0 / 6.0);
    assert_relative_eq!(volume(PYRAMID), 1.0 / 3.0);
    assert_relative_eq!(volume(PRISM), 0.5);
    assert_relative_eq!(volume(GeometryType::simplex(4)), 1.0 / 24.0);
  }

  #[test]
  fn triangle_containment() {
    let triangle = ReferenceElement::<f64>::of(TRIANGLE).unwrap();
    assert!(triangle.check_inside(&coord(&[0.2, 0.2])));
    assert!(!triangle.check_inside(&coord(&[0.9, 0.9])));
    assert!(triangle.check_inside(&coord(&[0.0, 0.5])));
    assert!(triangle.check_inside(&coord(&[0.5, 0.5])));
    assert!(!triangle.check_inside(&coord(&[-1e-3, 0.5])));
    assert!(!triangle.check_inside(&coord(&[f64::NAN, 0.1])));
    assert!(!triangle.check_inside(&coord(&[f64::INFINITY, 0.1])));
    assert!(!triangle.check_inside(&coord(&[0.1])));
  }

  #[test]
  fn composite_containment() {
    let pyramid = ReferenceElement::<f64>::of(PYRAMID).unwrap();
    assert!(pyramid.check_inside(&coord(&[0.4, 0.4, 0.2])));
    assert!(pyramid.check_inside(&coord(&[0.5, 0.5, 0.5])));
    assert!(!pyramid.check_inside(&coord(&[0.6, 0.5, 0.5])));
    let prism = ReferenceElement::<f64>::of(PRISM).unwrap();
    assert!(prism.check_inside(&coord(&[0.5, 0.5, 1.0])));
    assert!(!prism.check_inside(&coord(&[0.5, 0.6, 0.5])));
    assert!(!prism.check_inside(&coord(&[0.1, 0.1, 1.1])));
  }

  #[test]
  fn corners_are_inside() {
    for gt in all_types(4) {
      let refelem = ReferenceElement::<f64>::of(gt).unwrap();
      for corner in refelem.corners() {
        assert!(refelem.check_inside(corner));
      }
      for codim in 0..=refelem.dim() {
        for i in 0..refelem.size(codim) {
          assert!(refelem.check_inside(refelem.position(i, codim).unwrap()));
        }
      }
    }
  }

  #[test]
  fn embeddings_hit_barycenters() {
    for gt in all_types(4) {
      let refelem = ReferenceElement::<f64>::of(gt).unwrap();
      for codim in 0..=refelem.dim() {
        for i in 0..refelem.size(codim) {
          let embedding = refelem.geometry(i, codim).unwrap();
          let sub_center = embedding.reference_element().center().clone();
          assert_relative_eq!(
            embedding.global(&sub_center),
            refelem.position(i, codim).unwrap().clone(),
            epsilon = 1e-14
          );
        }
      }
    }
  }

  #[test]
  fn embeddings_map_corners() {
    for gt in all_types(4) {
      let refelem = ReferenceElement::<f64>::of(gt).unwrap();
      let dim = refelem.dim();
      for codim in 0..=dim {
        for i in 0..refelem.size(codim) {
          let embedding = refelem.geometry(i, codim).unwrap();
          let sub = embedding.reference_element();
          for (ii, local) in sub.corners().iter().enumerate() {
            let corner = refelem.sub_entity(i, codim, ii, dim).unwrap();
            assert_relative_eq!(
              embedding.global(local),
              refelem.corners()[corner].clone(),
              epsilon = 1e-14
            );
          }
        }
      }
    }
  }

  #[test]
  fn integration_normals() {
    let triangle = ReferenceElement::<f64>::of(TRIANGLE).unwrap();
    let normals: Vec<_> = (0..3)
      .map(|f| triangle.integration_outer_normal(f).unwrap().clone())
      .collect();
    assert_relative_eq!(normals[0], coord(&[0.0, -1.0]));
    assert_relative_eq!(normals[1], coord(&[-1.0, 0.0]));
    assert_relative_eq!(normals[2], coord(&[1.0, 1.0]));

    let line = ReferenceElement::<f64>::of(GeometryType::cube(1)).unwrap();
    assert_relative_eq!(line.integration_outer_normal(0).unwrap().clone(), coord(&[-1.0]));
    assert_relative_eq!(line.integration_outer_normal(1).unwrap().clone(), coord(&[1.0]));
  }

  /// The closed surface integral of a constant vanishes.
  #[test]
  fn integration_normals_balance() {
    for gt in all_types(4).filter(|gt| gt.dim() > 0) {
      let refelem = ReferenceElement::<f64>::of(gt).unwrap();
      let mut sum = Coord::zeros(refelem.dim());
      for face in 0..refelem.size(1) {
        let face_volume = refelem.geometry(face, 1).unwrap().reference_element().volume();
        sum += refelem.integration_outer_normal(face).unwrap() * face_volume;
      }
      assert_relative_eq!(sum, Coord::zeros(refelem.dim()), epsilon = 1e-14);
    }
  }
}
