// Pagewarden watermarking document viewer library

pub mod access;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod progress;
pub mod protection;
pub mod render;
pub mod source;
pub mod viewer;
pub mod watermark;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ViewerError;
