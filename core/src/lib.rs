//! A pure QUIC transport-layer wire codec (RFC 9000): varints, packet
//! headers, frames, transport parameters, and the transport error catalog.
//!
//! Nothing in this crate performs I/O, allocates for parsing, or keeps
//! protocol state across calls. Every entry point borrows from or writes
//! into a caller-provided buffer and returns. AEAD, header protection,
//! congestion control, loss detection, and stream reassembly are all
//! external collaborators this crate hands borrowed data to, never
//! implements itself.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod frame;
pub mod packet;
pub mod transport_parameters;
pub mod varint;

pub use error::{CodecError, CodecResult, TransportError};
pub use frame::Frame;
pub use packet::{EncryptionLevel, PacketDescriptor, PacketNumberSpace};
pub use varint::VarInt;
