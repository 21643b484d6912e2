//! turbine-wasm: HTTP message accumulator for WASM
//!
//! Parses into flat offset tables so JavaScript can slice the input
//! buffer without copying strings across the boundary.

pub mod layout;

#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

pub use layout::{
    MessageLayout, UrlLayout, FLAG_CHUNKED, FLAG_HEADERS_COMPLETE, FLAG_KEEP_ALIVE,
    FLAG_MESSAGE_COMPLETE, FLAG_UPGRADE,
};
