pub mod draft;
pub mod invoice;

pub use draft::*;
pub use invoice::*;
