use crate::{
  error::{Error, Result},
  linalg::Coord,
  topology::Topology,
  Dim, Scalar,
};

/// Gauss-Legendre nodes and weights on `[-1, 1]`, indexed by number of points.
const GAUSS_LEGENDRE: [&[(f64, f64)]; 5] = [
  &[(0.0, 2.0)],
  &[(-0.577_350_269_189_625_8, 1.0), (0.577_350_269_189_625_8, 1.0)],
  &[
    (-0.774_596_669_241_483_4, 0.555_555_555_555_555_6),
    (0.0, 0.888_888_888_888_888_9),
    (0.774_596_669_241_483_4, 0.555_555_555_555_555_6),
  ],
  &[
    (-0.861_136_311_594_052_6, 0.347_854_845_137_453_9),
    (-0.339_981_043_584_856_3, 0.652_145_154_862_546_1),
    (0.339_981_043_584_856_3, 0.652_145_154_862_546_1),
    (0.861_136_311_594_052_6, 0.347_854_845_137_453_9),
  ],
  &[
    (-0.906_179_845_938_664, 0.236_926_885_056_189_1),
    (-0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (0.0, 0.568_888_888_888_888_9),
    (0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (0.906_179_845_938_664, 0.236_926_885_056_189_1),
  ],
];

/// A quadrature rule on a reference element.
///
/// Built from a Gauss-Legendre rule on `[0, 1]`: prism steps take the tensor
/// product, pyramid steps collapse the base towards the apex. A rule with `n`
/// points per direction integrates polynomials of degree `2n - 1` exactly on
/// cubes and the weights sum to the reference volume whenever `2n >= dim`.
#[derive(Debug, Clone)]
pub struct QuadRule {
  /// One node per column.
  nodes: na::DMatrix<f64>,
  weights: na::DVector<f64>,
}
impl QuadRule {
  pub const MAX_POINTS: usize = GAUSS_LEGENDRE.len();

  /// The rule for `topology` using `npoints` points per direction.
  pub fn for_topology(topology: &Topology, npoints: usize) -> Result<Self> {
    if npoints == 0 || npoints > Self::MAX_POINTS {
      return Err(Error::out_of_range("quadrature points", npoints, Self::MAX_POINTS + 1));
    }
    let line: Vec<(f64, f64)> = GAUSS_LEGENDRE[npoints - 1]
      .iter()
      .map(|&(x, w)| ((x + 1.0) / 2.0, w / 2.0))
      .collect();

    let points = collapsed_points(topology, &line);
    let dim = topology.dim();
    let nodes = na::DMatrix::from_fn(dim, points.len(), |i, q| points[q].0[i]);
    let weights = na::DVector::from_iterator(points.len(), points.iter().map(|p| p.1));
    Ok(Self { nodes, weights })
  }

  pub fn dim(&self) -> Dim {
    self.nodes.nrows()
  }
  pub fn npoints(&self) -> usize {
    self.weights.len()
  }
  pub fn nodes(&self) -> &na::DMatrix<f64> {
    &self.nodes
  }
  pub fn weights(&self) -> &na::DVector<f64> {
    &self.weights
  }

  /// Approximates the integral of `f` over the reference element.
  pub fn apply<T, F>(&self, mut f: F) -> T
  where
    T: Scalar,
    F: FnMut(&Coord<T>) -> T,
  {
    self
      .nodes
      .column_iter()
      .zip(self.weights.iter())
      .fold(T::zero(), |acc, (node, &w)| {
        let node = Coord::from_iterator(node.len(), node.iter().map(|&x| T::lit(x)));
        acc + T::lit(w) * f(&node)
      })
  }
}

fn collapsed_points(topology: &Topology, line: &[(f64, f64)]) -> Vec<(Vec<f64>, f64)> {
  match topology {
    Topology::Point => vec![(Vec::new(), 1.0)],
    Topology::Prism(base) => {
      let base_points = collapsed_points(base, line);
      line
        .iter()
        .flat_map(|&(z, wz)| {
          base_points.iter().map(move |(x, w)| {
            let mut point = x.clone();
            point.push(z);
            (point, w * wz)
          })
        })
        .collect()
    }
    Topology::Pyramid(base) => {
      let jacobian_exponent = base.dim() as i32;
      let base_points = collapsed_points(base, line);
      line
        .iter()
        .flat_map(|&(z, wz)| {
          let scale = 1.0 - z;
          base_points.iter().map(move |(x, w)| {
            let mut point: Vec<f64> = x.iter().map(|xi| xi * scale).collect();
            point.push(z);
            (point, w * wz * scale.powi(jacobian_exponent))
          })
        })
        .collect()
    }
  }
}
