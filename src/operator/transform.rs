//! Pointwise maps from the solution state to a diffusivity.

/// A pointwise diffusivity law `c = f(s)`.
pub trait StateTransform: Send + Sync {
    fn apply(&self, s: f64) -> f64;
}

/// `c = s`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

/// `c = k·s`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale(pub f64);

/// `c = s^p`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw(pub f64);

/// `c = s·eˢ`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Exponential;

impl StateTransform for Identity {
    fn apply(&self, s: f64) -> f64 {
        s
    }
}

impl StateTransform for Scale {
    fn apply(&self, s: f64) -> f64 {
        self.0 * s
    }
}

impl StateTransform for PowerLaw {
    fn apply(&self, s: f64) -> f64 {
        if self.0 == 2.0 { s * s } else { s.powf(self.0) }
    }
}

impl StateTransform for Exponential {
    fn apply(&self, s: f64) -> f64 {
        s * s.exp()
    }
}

impl<F> StateTransform for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn apply(&self, s: f64) -> f64 {
        self(s)
    }
}
