//! # Packet Envelope
//!
//! The outermost framing of every top-level message:
//!
//! ```text
//! +------------+--------------------------------------+
//! | type: u8   | payload (LZ4 block or raw bytes)      |
//! +------------+--------------------------------------+
//! ```
//!
//! Whether the payload is compressed is a static property of the packet
//! type. The envelope carries no length or checksum; message boundaries are
//! the transport's job.
//!
//! Packet types are registered explicitly in a [`PacketRegistry`], so an
//! unknown discriminant is always reported to the caller.

mod codec;
mod packet;
mod registry;

pub use codec::{DecodedPacket, PacketCodec};
pub use packet::{Packet, PacketDescriptor};
pub use registry::PacketRegistry;
