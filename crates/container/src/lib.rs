//! In-memory access to packaged EPUB documents.
//!
//! A [`Container`] is read in full, inspected for DRM, modified in place
//! and finally written back with [`Container::commit`]. Files added through
//! [`Container::add_file`] are registered in the package manifest so that
//! reading systems keep them when repackaging.

mod container;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
mod xml;

pub use crate::container::{CONTAINER_XML, Container, ENCRYPTION_XML, MIMETYPE, Probe, RIGHTS_XML};
