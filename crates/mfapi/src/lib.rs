#![doc = include_str!("../../../README.md")]
//!

//! This crate re-exports the mfapi client library.

pub use mfapi_core::*;
