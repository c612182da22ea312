//! Wire types for the gallows game protocol.
//!
//! This crate contains the serde-serializable types exchanged with the game
//! server. These types represent the "protocol layer" - the shapes of data
//! as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with protocol**: Exactly two shapes cross the wire
//! - **Stable**: Changes only when the wire protocol changes
//!
//! The framing that delimits these messages within the byte stream lives in
//! `gallows-runtime`; this crate only knows about payloads.

pub mod guess;
pub mod state;

pub use guess::*;
pub use state::*;
