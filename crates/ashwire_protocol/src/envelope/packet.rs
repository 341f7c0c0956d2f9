//! Packet type declarations.

use crate::serialize::Serializable;

/// A top-level message with a fixed discriminant.
///
/// Payload layout comes from the [`Serializable`] impl; this trait only adds
/// the static envelope properties.
pub trait Packet: Serializable {
    /// Discriminant byte written before the payload.
    const ID: u8;

    /// Human-readable name, used in logs.
    const NAME: &'static str;

    /// Whether the payload is LZ4-compressed on the wire.
    const COMPRESSED: bool = false;

    /// Envelope properties of this packet type.
    #[must_use]
    fn descriptor() -> PacketDescriptor {
        PacketDescriptor::of::<Self>()
    }
}

/// Envelope properties of one registered packet type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PacketDescriptor {
    /// Discriminant byte.
    pub id: u8,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether the payload is compressed.
    pub compressed: bool,
}

impl PacketDescriptor {
    /// Descriptor of packet type `P`.
    #[inline]
    #[must_use]
    pub const fn of<P: Packet>() -> Self {
        Self {
            id: P::ID,
            name: P::NAME,
            compressed: P::COMPRESSED,
        }
    }
}
