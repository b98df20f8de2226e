//! Host-side pieces of the scene viewer: logger setup and window-event decoding.

pub mod input;
pub mod logging;
