/// Real scalar type the geometries are generic over.
///
/// Implemented for `f32` and `f64`.
pub trait Scalar: na::RealField + Copy {
  /// The machine epsilon of the type.
  fn machine_epsilon() -> Self {
    <Self as approx::AbsDiffEq>::default_epsilon()
  }

  /// Converts a literal into the scalar type.
  fn lit(value: f64) -> Self {
    na::convert(value)
  }

  /// Lossy conversion to `f64`, used for diagnostics.
  fn to_f64_lossy(self) -> f64;
}

impl Scalar for f64 {
  fn to_f64_lossy(self) -> f64 {
    self
  }
}
impl Scalar for f32 {
  fn to_f64_lossy(self) -> f64 {
    self as f64
  }
}
