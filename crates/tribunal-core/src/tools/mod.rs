//! Collaborator layer: the I/O-bound utilities the pipeline consumes.
//!
//! Everything here is invoked from detective boundaries, which convert
//! failures into negative evidence. Nothing in this module reaches into the
//! orchestration graph.

pub mod doc;
pub mod repo;
