//! Stencil operators for the backward-Euler diffusion step `(I - τ ∇·c∇) x = b`.
//!
//! All variants share [`StencilCoefficients`] and differ only in how the interface
//! coefficients are derived:
//! - [`UniformStencil`]: one scalar diffusivity.
//! - [`VaryingStencil`]: a per-cell diffusivity field, blended by harmonic mean.
//! - [`NonlinearStencil`]: diffusivity computed from the current state through a
//!   [`StateTransform`], refreshed by `set_state`.

pub mod coefficients;
pub mod nonlinear;
pub mod transform;
pub mod uniform;
pub mod varying;

pub use coefficients::{StencilCoefficients, StencilRow, harmonic_mean};
pub use nonlinear::NonlinearStencil;
pub use transform::{Exponential, Identity, PowerLaw, Scale, StateTransform};
pub use uniform::UniformStencil;
pub use varying::VaryingStencil;
