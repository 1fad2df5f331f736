//! Layout resolution: device composition, width normalization and the
//! service that ties them to the override registry.

pub mod device;
pub mod normalize;
pub mod service;

pub use device::{DeviceSpecialization, PAD_PRO_EXTENDED_MIN_WIDTH};
pub use service::{LayoutResolutionService, ResolveError};
