//! # Rendering Module
//!
//! Text rendering of the crawl for terminal play.

pub mod display;

pub use display::*;
