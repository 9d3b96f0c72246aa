//! Image value objects.
//!
//! The core never decodes file formats: the surrounding shell turns
//! PNG/BMP files into an [`Image`] before calling in, and every stage
//! returns new images instead of mutating its inputs.

mod buffer;
mod luma;

pub use buffer::{Channels, Image, ImageError};
pub use luma::{LumaPlane, LUMA_WEIGHTS};
