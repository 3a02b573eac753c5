//! Foundation module - math, timing and logging utilities used by every subsystem

pub mod logging;
pub mod math;
pub mod time;
