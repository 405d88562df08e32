extern crate nalgebra as na;

use refgeom::{
  geometry_type::{QUADRILATERAL, TRIANGLE},
  topology::{normalize, num_topologies},
  AffineGeometry, Error, Geometry, GeometryType, MultiLinearGeometry, NewtonConfig,
  ReferenceElement,
};

use approx::assert_relative_eq;

type Coord = na::DVector<f64>;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

fn all_types(max_dim: usize) -> Vec<GeometryType> {
  (0..=max_dim)
    .flat_map(|dim| {
      (0..num_topologies(dim) as u32)
        .filter(|&id| normalize(id) == id)
        .map(move |id| GeometryType::from_id(dim, id).unwrap())
    })
    .collect()
}

/// The center and the midpoints between the center and every corner.
fn interior_points(refelem: &ReferenceElement<f64>) -> Vec<Coord> {
  let center = refelem.center();
  std::iter::once(center.clone())
    .chain(refelem.corners().iter().map(|c| (center + c) / 2.0))
    .collect()
}

/// A smooth perturbation of the identity, keeping the mapped cells regular.
fn bend(x: &Coord) -> Coord {
  let dim = x.len();
  Coord::from_fn(dim, |i, _| {
    let next = x[(i + 1) % dim];
    x[i] + 0.2 * next + 0.1 * x[i] * next + 0.5
  })
}

/// A fixed affine map into one dimension higher.
fn embed(x: &Coord) -> Coord {
  let dim = x.len();
  Coord::from_fn(dim + 1, |i, _| {
    if i < dim {
      2.0 * x[i] + 0.3 * x[(i + 1) % dim]
    } else {
      x.iter().sum::<f64>() - 1.0
    }
  })
}

#[test]
fn multilinear_round_trip() {
  init_tracing();
  for gt in all_types(3) {
    let refelem = ReferenceElement::<f64>::of(gt).unwrap();
    let corners = refelem.corners().iter().map(bend).collect();
    let geometry = MultiLinearGeometry::new(refelem.clone(), corners).unwrap();
    for x in interior_points(&refelem) {
      let y = geometry.global(&x);
      let local = geometry.local(&y).unwrap();
      assert_relative_eq!(local, x, epsilon = 1e-10);
    }
  }
}

#[test]
fn affine_round_trip() {
  for gt in all_types(4) {
    let refelem = ReferenceElement::<f64>::of(gt).unwrap();
    let vertices: Vec<_> = refelem.corners().iter().map(embed).collect();
    let affine = AffineGeometry::from_vertices(refelem.clone(), &vertices).unwrap();
    let multilinear = MultiLinearGeometry::new(refelem.clone(), vertices).unwrap();
    assert!(multilinear.is_affine(), "{gt}");
    assert_relative_eq!(affine.volume(), multilinear.volume(), epsilon = 1e-12);
    for x in interior_points(&refelem) {
      let y = affine.global(&x);
      assert_relative_eq!(multilinear.global(&x), y.clone(), epsilon = 1e-12);
      assert_relative_eq!(affine.local(&y).unwrap(), x.clone(), epsilon = 1e-12);
      assert_relative_eq!(multilinear.local(&y).unwrap(), x, epsilon = 1e-12);
    }
  }
}

#[test]
fn corners_are_interpolated() {
  for gt in all_types(4) {
    let refelem = ReferenceElement::<f64>::of(gt).unwrap();
    let corners: Vec<_> = refelem.corners().iter().map(bend).collect();
    let geometry = MultiLinearGeometry::new(refelem.clone(), corners.clone()).unwrap();
    for (local, corner) in refelem.corners().iter().zip(&corners) {
      assert_relative_eq!(geometry.global(local), corner.clone(), epsilon = 1e-12);
    }
  }
}

#[test]
fn quadrature_volume_of_bent_square() {
  // x -> (x0 + x0 x1, x1) maps the unit square onto a trapezoid of area 1.5
  let corners = vec![
    Coord::from_vec(vec![0.0, 0.0]),
    Coord::from_vec(vec![1.0, 0.0]),
    Coord::from_vec(vec![0.0, 1.0]),
    Coord::from_vec(vec![2.0, 1.0]),
  ];
  let geometry = MultiLinearGeometry::from_type(QUADRILATERAL, corners).unwrap();
  assert!(!geometry.is_affine());
  assert_relative_eq!(geometry.volume(), 1.5, epsilon = 1e-14);
}

#[test]
fn unit_simplices() {
  let triangle = AffineGeometry::from_type_and_jacobian_transposed(
    TRIANGLE,
    Coord::zeros(2),
    na::DMatrix::identity(2, 2),
  )
  .unwrap();
  assert_relative_eq!(triangle.volume(), 0.5);
  let square = AffineGeometry::from_type_and_jacobian_transposed(
    QUADRILATERAL,
    Coord::zeros(2),
    na::DMatrix::identity(2, 2),
  )
  .unwrap();
  assert_relative_eq!(square.volume(), 1.0);
}

#[test]
fn failures_are_not_masked() {
  init_tracing();
  let degenerate = AffineGeometry::from_type_and_vertices(
    TRIANGLE,
    &[
      Coord::from_vec(vec![0.0, 0.0]),
      Coord::from_vec(vec![1.0, 0.0]),
      Coord::from_vec(vec![2.0, 0.0]),
    ],
  )
  .unwrap();
  assert_eq!(
    degenerate.local(&Coord::from_vec(vec![0.5, 0.0])),
    Err(Error::SingularJacobian)
  );

  let refelem = ReferenceElement::<f64>::of(QUADRILATERAL).unwrap();
  let corners: Vec<_> = refelem.corners().iter().map(bend).collect();
  let geometry = MultiLinearGeometry::new(refelem, corners)
    .unwrap()
    .with_config(NewtonConfig {
      max_iterations: 2,
      tolerance_factor: 0.0,
    });
  let target = geometry.global(&Coord::from_vec(vec![0.9, 0.1]));
  match geometry.local(&target) {
    Err(Error::ConvergenceFailure {
      iterations,
      update_norm,
    }) => {
      assert_eq!(iterations, 2);
      assert!(update_norm > 0.0);
    }
    other => panic!("expected convergence failure, got {other:?}"),
  }
}
