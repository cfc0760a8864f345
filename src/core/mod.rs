//! Core building blocks: operator traits, padded grid vectors and vector primitives.

pub mod primitives;
pub mod traits;
pub mod vector;

pub use primitives::{
    axpy_in_place, axpy_in_place_range, dot, dot_range, norm_squared, norm_squared_range,
};
pub use traits::{LinearOperator, NonlinearOperator};
pub use vector::GridVector;
