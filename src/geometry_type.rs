//! Unique labels for the types of entities that can occur in a grid.

use crate::{
  error::{Error, Result},
  topology::{self, Topology, MAX_DIM},
  Dim,
};

use std::{fmt, hash, str::FromStr};

/// Classification of a [`GeometryType`] by its generative structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
  Simplex,
  Cube,
  Pyramid,
  Prism,
  /// Any other prism/pyramid chain, e.g. a prism over a pyramid.
  Extended,
  /// A placeholder for entities without a reference element (e.g. polygons).
  None,
}

impl BasicType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BasicType::Simplex => "simplex",
      BasicType::Cube => "cube",
      BasicType::Pyramid => "pyramid",
      BasicType::Prism => "prism",
      BasicType::Extended => "extended",
      BasicType::None => "none",
    }
  }
}

impl fmt::Display for BasicType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BasicType {
  type Err = Error;
  fn from_str(s: &str) -> Result<Self> {
    match s.trim() {
      "simplex" => Ok(BasicType::Simplex),
      "cube" => Ok(BasicType::Cube),
      "pyramid" => Ok(BasicType::Pyramid),
      "prism" => Ok(BasicType::Prism),
      "extended" => Ok(BasicType::Extended),
      "none" => Ok(BasicType::None),
      _ => Err(Error::InvalidTopologyName(s.to_owned())),
    }
  }
}

/// A reference-cell shape, encoded as dimension plus topology id.
///
/// See [`crate::topology`] for the meaning of the id bits.
#[derive(Debug, Clone, Copy, Eq)]
pub struct GeometryType {
  dim: Dim,
  topology_id: u32,
  none: bool,
}

pub const VERTEX: GeometryType = GeometryType::simplex(0);
pub const LINE: GeometryType = GeometryType::simplex(1);
pub const TRIANGLE: GeometryType = GeometryType::simplex(2);
pub const QUADRILATERAL: GeometryType = GeometryType::cube(2);
pub const TETRAHEDRON: GeometryType = GeometryType::simplex(3);
pub const PYRAMID: GeometryType = GeometryType::pyramid(QUADRILATERAL);
pub const PRISM: GeometryType = GeometryType::prism(TRIANGLE);
pub const HEXAHEDRON: GeometryType = GeometryType::cube(3);

impl GeometryType {
  const fn from_parts(dim: Dim, topology_id: u32, none: bool) -> Self {
    assert!(dim < MAX_DIM, "dimension too large for a topology id");
    Self {
      dim,
      topology_id: topology::normalize(topology_id),
      none,
    }
  }

  pub const fn simplex(dim: Dim) -> Self {
    Self::from_parts(dim, topology::simplex_id(dim), false)
  }
  pub const fn cube(dim: Dim) -> Self {
    Self::from_parts(dim, topology::cube_id(dim), false)
  }
  /// A type without a reference element.
  pub const fn none(dim: Dim) -> Self {
    Self::from_parts(dim, 0, true)
  }

  /// Prismatic extension of `base` into one dimension higher.
  pub const fn prism(base: GeometryType) -> Self {
    assert!(!base.none, "cannot extend a none type");
    Self::from_parts(base.dim + 1, base.topology_id, false)
  }
  /// Conical extension of `base` into one dimension higher.
  pub const fn pyramid(base: GeometryType) -> Self {
    assert!(!base.none, "cannot extend a none type");
    Self::from_parts(base.dim + 1, base.topology_id | (1 << base.dim), false)
  }

  /// Type from an explicit topology id.
  pub fn from_id(dim: Dim, topology_id: u32) -> Result<Self> {
    if dim >= MAX_DIM || u64::from(topology_id) >= topology::num_topologies(dim) {
      return Err(Error::InvalidTopologyId {
        dim: dim as u64,
        id: u64::from(topology_id),
      });
    }
    Ok(Self::from_parts(dim, topology_id, false))
  }

  pub fn from_topology(topology: &Topology) -> Self {
    Self::from_parts(topology.dim(), topology.encode(), false)
  }

  pub const fn dim(&self) -> Dim {
    self.dim
  }
  pub const fn topology_id(&self) -> u32 {
    self.topology_id
  }

  /// The construction tree, `None` for none types.
  pub fn topology(&self) -> Option<Topology> {
    (!self.none).then(|| Topology::decode(self.dim, self.topology_id))
  }

  pub const fn is_none(&self) -> bool {
    self.none
  }
  pub const fn is_simplex(&self) -> bool {
    !self.none && self.topology_id == topology::simplex_id(self.dim)
  }
  pub const fn is_cube(&self) -> bool {
    !self.none && self.topology_id == topology::cube_id(self.dim)
  }
  /// Prism over a simplex of dimension at least two.
  pub const fn is_prism(&self) -> bool {
    !self.none
      && self.dim >= 3
      && topology::is_prismatic_step(self.topology_id, self.dim - 1)
      && topology::base_id(self.topology_id, self.dim) == topology::simplex_id(self.dim - 1)
  }
  /// Pyramid over a cube of dimension at least two.
  pub const fn is_pyramid(&self) -> bool {
    !self.none
      && self.dim >= 3
      && topology::is_conical_step(self.topology_id, self.dim - 1)
      && topology::base_id(self.topology_id, self.dim) == topology::cube_id(self.dim - 1)
  }

  pub const fn is_vertex(&self) -> bool {
    !self.none && self.dim == 0
  }
  pub const fn is_line(&self) -> bool {
    !self.none && self.dim == 1
  }
  pub const fn is_triangle(&self) -> bool {
    self.dim == 2 && self.is_simplex()
  }
  pub const fn is_quadrilateral(&self) -> bool {
    self.dim == 2 && self.is_cube()
  }
  pub const fn is_tetrahedron(&self) -> bool {
    self.dim == 3 && self.is_simplex()
  }
  pub const fn is_hexahedron(&self) -> bool {
    self.dim == 3 && self.is_cube()
  }

  /// Whether the last construction step was a pyramid extension.
  pub const fn is_conical(&self) -> bool {
    self.dim > 0 && self.is_conical_at(self.dim - 1)
  }
  /// Whether construction step `step` was a pyramid extension.
  pub const fn is_conical_at(&self, step: usize) -> bool {
    !self.none && step < self.dim && topology::is_conical_step(self.topology_id, step)
  }
  /// Whether the last construction step was a prism extension.
  pub const fn is_prismatic(&self) -> bool {
    self.dim > 0 && self.is_prismatic_at(self.dim - 1)
  }
  /// Whether construction step `step` was a prism extension.
  pub const fn is_prismatic_at(&self, step: usize) -> bool {
    !self.none && step < self.dim && topology::is_prismatic_step(self.topology_id, step)
  }

  pub const fn basic_type(&self) -> BasicType {
    if self.is_none() {
      BasicType::None
    } else if self.is_simplex() {
      BasicType::Simplex
    } else if self.is_cube() {
      BasicType::Cube
    } else if self.is_pyramid() {
      BasicType::Pyramid
    } else if self.is_prism() {
      BasicType::Prism
    } else {
      BasicType::Extended
    }
  }

  /// Equality that knows point and interval have a unique topology.
  pub const fn equals(&self, other: &GeometryType) -> bool {
    self.none == other.none
      && self.dim == other.dim
      && (self.none || self.dim <= 1 || self.topology_id == other.topology_id)
  }

  /// Packs the type into a single integer identifier.
  pub const fn to_id(&self) -> u64 {
    self.dim as u64 | (self.none as u64) << 32 | (self.topology_id as u64) << 33
  }

  /// Inverse of [`GeometryType::to_id`].
  pub fn try_from_id(id: u64) -> Result<Self> {
    let dim = id & 0xffff_ffff;
    let none = (id >> 32) & 1 == 1;
    let topology_id = id >> 33;
    let invalid = Error::InvalidTopologyId {
      dim,
      id: topology_id,
    };
    let topology_id = u32::try_from(topology_id).map_err(|_| invalid.clone())?;
    let gt = Self::from_id(dim as Dim, topology_id).map_err(|_| invalid.clone())?;
    match none {
      false => Ok(gt),
      true if topology_id == 0 => Ok(Self::none(gt.dim)),
      true => Err(invalid),
    }
  }
}

impl PartialEq for GeometryType {
  fn eq(&self, other: &Self) -> bool {
    self.equals(other)
  }
}

impl hash::Hash for GeometryType {
  fn hash<H: hash::Hasher>(&self, state: &mut H) {
    self.none.hash(state);
    self.dim.hash(state);
    if !self.none && self.dim > 1 {
      self.topology_id.hash(state);
    }
  }
}

impl fmt::Display for GeometryType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.basic_type() {
      BasicType::Extended => write!(f, "(extended, {}, {})", self.dim, self.topology_id),
      basic => write!(f, "({basic}, {})", self.dim),
    }
  }
}

impl FromStr for GeometryType {
  type Err = Error;
  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidTopologyName(s.to_owned());
    let inner = s
      .trim()
      .strip_prefix('(')
      .and_then(|s| s.strip_suffix(')'))
      .ok_or_else(invalid)?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let (basic, dim) = match parts.as_slice() {
      [basic, dim] | [basic, dim, _] => (basic.parse::<BasicType>().map_err(|_| invalid())?, *dim),
      _ => return Err(invalid()),
    };
    let dim: Dim = dim.parse().map_err(|_| invalid())?;
    if dim >= MAX_DIM {
      return Err(invalid());
    }

    match (basic, parts.len()) {
      (BasicType::Simplex, 2) => Ok(Self::simplex(dim)),
      (BasicType::Cube, 2) => Ok(Self::cube(dim)),
      (BasicType::None, 2) => Ok(Self::none(dim)),
      (BasicType::Prism, 2) if dim >= 3 => Ok(Self::prism(Self::simplex(dim - 1))),
      (BasicType::Pyramid, 2) if dim >= 3 => Ok(Self::pyramid(Self::cube(dim - 1))),
      (BasicType::Extended, 3) => {
        let id: u32 = parts[2].parse().map_err(|_| invalid())?;
        Self::from_id(dim, id).map_err(|_| invalid())
      }
      _ => Err(invalid()),
    }
  }
}
