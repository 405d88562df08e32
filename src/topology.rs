//! Topology codec.
//!
//! A reference-cell topology of dimension `dim` is generated from the point by
//! `dim` extension steps. Step `k` (creating dimension `k + 1`) is recorded in
//! bit `k` of the topology id: `0` for a prism extension, `1` for a pyramid
//! extension. Both extensions of the point give the interval, so bit 0 carries
//! no information and is always kept clear.

use crate::{Codim, Dim};

/// Upper bound (exclusive) on the dimensions representable by a `u32` id.
pub const MAX_DIM: Dim = 32;

/// Number of distinct (unnormalized) topology ids in dimension `dim`.
pub const fn num_topologies(dim: Dim) -> u64 {
  1u64 << dim
}

/// Clears the ambiguous first extension bit.
pub const fn normalize(id: u32) -> u32 {
  id & !1
}

/// Whether construction step `step` is a pyramid extension.
///
/// Step 0 counts as both conical and prismatic.
pub const fn is_conical_step(id: u32, step: usize) -> bool {
  step == 0 || (id >> step) & 1 == 1
}

/// Whether construction step `step` is a prism extension.
pub const fn is_prismatic_step(id: u32, step: usize) -> bool {
  step == 0 || (id >> step) & 1 == 0
}

/// The id of the `dim - 1` dimensional base topology.
pub const fn base_id(id: u32, dim: Dim) -> u32 {
  if dim == 0 {
    0
  } else {
    id & ((1u32 << (dim - 1)) - 1)
  }
}

/// Id of a pure pyramid chain (the simplex) in dimension `dim`.
pub const fn simplex_id(dim: Dim) -> u32 {
  if dim <= 1 {
    0
  } else {
    normalize(((1u64 << dim) - 1) as u32)
  }
}

/// Id of a pure prism chain (the cube) in dimension `dim`.
pub const fn cube_id(_dim: Dim) -> u32 {
  0
}

/// A single extension step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
  Prism,
  Pyramid,
}

/// Tagged construction tree of a reference-cell topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
  Point,
  Prism(Box<Topology>),
  Pyramid(Box<Topology>),
}

impl Topology {
  /// Decodes a topology id. Bits at or above `dim` are ignored.
  pub fn decode(dim: Dim, id: u32) -> Self {
    (0..dim).fold(Topology::Point, |base, step| {
      if step > 0 && (id >> step) & 1 == 1 {
        Topology::Pyramid(Box::new(base))
      } else {
        Topology::Prism(Box::new(base))
      }
    })
  }

  pub fn encode(&self) -> u32 {
    match self {
      Topology::Point => 0,
      Topology::Prism(base) => base.encode(),
      Topology::Pyramid(base) => normalize(base.encode() | (1 << base.dim())),
    }
  }

  pub fn simplex(dim: Dim) -> Self {
    Self::decode(dim, simplex_id(dim))
  }
  pub fn cube(dim: Dim) -> Self {
    Self::decode(dim, cube_id(dim))
  }

  pub fn dim(&self) -> Dim {
    match self {
      Topology::Point => 0,
      Topology::Prism(base) | Topology::Pyramid(base) => base.dim() + 1,
    }
  }

  pub fn base(&self) -> Option<&Topology> {
    match self {
      Topology::Point => None,
      Topology::Prism(base) | Topology::Pyramid(base) => Some(base),
    }
  }

  pub fn extension(&self) -> Option<Extension> {
    match self {
      Topology::Point => None,
      Topology::Prism(_) => Some(Extension::Prism),
      Topology::Pyramid(_) => Some(Extension::Pyramid),
    }
  }

  /// Number of subentities of codimension `codim`.
  pub fn size(&self, codim: Codim) -> usize {
    let dim = self.dim();
    if codim > dim {
      return 0;
    }
    match self {
      _ if codim == 0 => 1,
      Topology::Point => 1,
      Topology::Prism(base) => {
        let lateral = if codim < dim { base.size(codim) } else { 0 };
        lateral + 2 * base.size(codim - 1)
      }
      Topology::Pyramid(base) => {
        let lifted = if codim < dim { base.size(codim) } else { 1 };
        base.size(codim - 1) + lifted
      }
    }
  }

  /// Number of corners.
  pub fn ncorners(&self) -> usize {
    self.size(self.dim())
  }

  /// Topology of subentity `(i, codim)`.
  ///
  /// Panics if `(i, codim)` does not exist.
  pub fn sub_topology(&self, codim: Codim, i: usize) -> Topology {
    assert!(i < self.size(codim), "subentity ({i}, {codim}) out of range");
    match self {
      _ if codim == 0 => self.clone(),
      Topology::Point => unreachable!(),
      Topology::Prism(base) => {
        let lateral = if codim < self.dim() { base.size(codim) } else { 0 };
        let cap = base.size(codim - 1);
        if i < lateral {
          Topology::Prism(Box::new(base.sub_topology(codim, i)))
        } else if i < lateral + cap {
          base.sub_topology(codim - 1, i - lateral)
        } else {
          base.sub_topology(codim - 1, i - lateral - cap)
        }
      }
      Topology::Pyramid(base) => {
        let bottom = base.size(codim - 1);
        if i < bottom {
          base.sub_topology(codim - 1, i)
        } else if codim < self.dim() {
          Topology::Pyramid(Box::new(base.sub_topology(codim, i - bottom)))
        } else {
          Topology::Point
        }
      }
    }
  }

  /// Corners of subentity `(i, codim)` in the numbering of `self`, listed in
  /// the corner order of the subentity's own reference element.
  ///
  /// Panics if `(i, codim)` does not exist.
  pub fn sub_corners(&self, codim: Codim, i: usize) -> Vec<usize> {
    assert!(i < self.size(codim), "subentity ({i}, {codim}) out of range");
    match self {
      _ if codim == 0 => (0..self.ncorners()).collect(),
      Topology::Point => unreachable!(),
      Topology::Prism(base) => {
        let nbase = base.ncorners();
        let lateral = if codim < self.dim() { base.size(codim) } else { 0 };
        let cap = base.size(codim - 1);
        if i < lateral {
          let bottom = base.sub_corners(codim, i);
          let top = bottom.iter().map(|c| c + nbase).collect::<Vec<_>>();
          bottom.into_iter().chain(top).collect()
        } else if i < lateral + cap {
          base.sub_corners(codim - 1, i - lateral)
        } else {
          base
            .sub_corners(codim - 1, i - lateral - cap)
            .into_iter()
            .map(|c| c + nbase)
            .collect()
        }
      }
      Topology::Pyramid(base) => {
        let apex = base.ncorners();
        let bottom = base.size(codim - 1);
        if i < bottom {
          base.sub_corners(codim - 1, i)
        } else if codim < self.dim() {
          let mut corners = base.sub_corners(codim, i - bottom);
          corners.push(apex);
          corners
        } else {
          vec![apex]
        }
      }
    }
  }

  /// Reference volume: 1 for cubes, `1/dim!` for simplices.
  pub fn volume(&self) -> f64 {
    match self {
      Topology::Point => 1.0,
      Topology::Prism(base) => base.volume(),
      Topology::Pyramid(base) => base.volume() / self.dim() as f64,
    }
  }

  /// Reference corner coordinates, as plain sequences.
  pub fn corner_coords(&self) -> Vec<Vec<f64>> {
    match self {
      Topology::Point => vec![vec![]],
      Topology::Prism(base) => {
        let base_corners = base.corner_coords();
        let lift = |height: f64| {
          base_corners.iter().map(move |c| {
            let mut c = c.clone();
            c.push(height);
            c
          })
        };
        lift(0.0).chain(lift(1.0)).collect()
      }
      Topology::Pyramid(base) => {
        let dim = self.dim();
        let mut corners: Vec<_> = base
          .corner_coords()
          .into_iter()
          .map(|mut c| {
            c.push(0.0);
            c
          })
          .collect();
        let mut apex = vec![0.0; dim];
        apex[dim - 1] = 1.0;
        corners.push(apex);
        corners
      }
    }
  }

  /// For every local direction `k`, the index of the corner located at the
  /// unit vector `e_k`. Corner 0 is always the origin.
  pub fn spanning_corners(&self) -> Vec<usize> {
    match self {
      Topology::Point => vec![],
      // first top corner (prism) or apex (pyramid)
      Topology::Prism(base) | Topology::Pyramid(base) => {
        let mut spanning = base.spanning_corners();
        spanning.push(base.ncorners());
        spanning
      }
    }
  }
}
