//! Procedurally generated meshes.

pub mod sphere;
