//! Geometry and transport algorithms

pub mod spherical;
pub mod local_frame;
pub mod projection;

pub use local_frame::{LocalBasis, LocalFrameBuilder, Perturbation};
pub use projection::VectorProjector;
