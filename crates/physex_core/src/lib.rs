/// The `physex_core` crate holds the engine behind the physics coursework
/// exercises. Numeric code is generic over `Scalar`, so the same compiled
/// expression evaluates on `f64` or on dual numbers for derivatives.
///
/// Key components:
/// - **Symbolic**: `symb_anafis` expressions plus shared helpers, matrices and a 2D printer.
/// - **Bytecode**: a stack VM that evaluates symbolic expressions over any `Scalar`.
/// - **Solve**: Gauss–Newton search for parameters that make an expression vanish identically.
/// - **Isosurface**: marching-cubes extraction of implicit surfaces.
/// - **Exercises**: the five worksheet operations, each returning a printable report.
pub mod autodiff;
pub mod bytecode;
pub mod exercises;
pub mod isosurface;
pub mod solve;
pub mod symbolic;
pub mod traits;
