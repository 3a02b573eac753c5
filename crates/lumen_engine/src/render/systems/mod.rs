//! Rendering systems that produce per-frame GPU data

pub mod lighting;
