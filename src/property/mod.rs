//! Property codec.
//!
//! This module provides the dynamically typed property bag exchanged with
//! the engine and the typed accessors resources use to decode it.

mod map;
mod value;
mod wire;

pub use map::PropertyMap;
pub use value::{Archive, Asset, PropertyValue};
pub use wire::{
    ARCHIVE_SIGNATURE, ASSET_SIGNATURE, SECRET_SIGNATURE, SIGNATURE_KEY, UNKNOWN_SENTINEL,
};
