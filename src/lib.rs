//! Reference elements and element geometries for mesh-based numerical methods.
//!
//! Every cell shape is generated from the point by a chain of prism and pyramid
//! extensions. [`GeometryType`] encodes such a chain, [`ReferenceElement`] derives
//! the complete subentity structure from it, and [`AffineGeometry`] /
//! [`MultiLinearGeometry`] map a reference element into physical space.

extern crate nalgebra as na;

pub mod error;
pub mod geometry;
pub mod geometry_type;
pub mod linalg;
pub mod quadrature;
pub mod reference_element;
pub mod scalar;
pub mod topology;

pub use error::{Error, Result};
pub use geometry::{
  affine::AffineGeometry,
  multilinear::{MultiLinearGeometry, NewtonConfig},
  Geometry,
};
pub use geometry_type::{BasicType, GeometryType};
pub use reference_element::{reference_element, ReferenceElement};
pub use scalar::Scalar;

pub type Dim = usize;
pub type Codim = usize;
