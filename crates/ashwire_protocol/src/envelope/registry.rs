//! Discriminant table.

use std::fmt;

use super::packet::{Packet, PacketDescriptor};
use crate::error::{CodecError, CodecResult};

/// Maps discriminant bytes to packet descriptors.
///
/// Built once at startup and shared read-only afterwards.
///
/// # Example
///
/// ```rust
/// use ashwire_protocol::{BitReader, BitWriter, CodecResult, Packet, PacketRegistry, Serializable};
///
/// struct Ping(u32);
///
/// impl Serializable for Ping {
///     fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
///         writer.write_u32(self.0)
///     }
///     fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
///         Ok(Self(reader.read_u32()?))
///     }
/// }
///
/// impl Packet for Ping {
///     const ID: u8 = 0x07;
///     const NAME: &'static str = "ping";
/// }
///
/// let registry = PacketRegistry::new().with::<Ping>().unwrap();
/// assert_eq!(registry.lookup(0x07).unwrap().name, "ping");
/// assert!(registry.lookup(0x08).is_err());
/// ```
#[derive(Clone)]
pub struct PacketRegistry {
    table: [Option<PacketDescriptor>; 256],
    count: usize,
}

impl PacketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: [None; 256],
            count: 0,
        }
    }

    /// Registers packet type `P`.
    ///
    /// # Errors
    ///
    /// [`CodecError::DuplicatePacketType`] if the discriminant is taken.
    pub fn register<P: Packet>(&mut self) -> CodecResult<()> {
        self.insert(PacketDescriptor::of::<P>())
    }

    /// Registers packet type `P`, builder style.
    ///
    /// # Errors
    ///
    /// [`CodecError::DuplicatePacketType`] if the discriminant is taken.
    pub fn with<P: Packet>(mut self) -> CodecResult<Self> {
        self.register::<P>()?;
        Ok(self)
    }

    /// Registers a descriptor directly.
    ///
    /// # Errors
    ///
    /// [`CodecError::DuplicatePacketType`] if the discriminant is taken.
    pub fn insert(&mut self, descriptor: PacketDescriptor) -> CodecResult<()> {
        let slot = &mut self.table[usize::from(descriptor.id)];
        if slot.is_some() {
            return Err(CodecError::DuplicatePacketType(descriptor.id));
        }
        *slot = Some(descriptor);
        self.count += 1;
        Ok(())
    }

    /// Looks up a discriminant.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownPacketType`] if nothing is registered under `id`.
    #[inline]
    pub fn lookup(&self, id: u8) -> CodecResult<PacketDescriptor> {
        self.table[usize::from(id)].ok_or(CodecError::UnknownPacketType(id))
    }

    /// Returns true if `id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: u8) -> bool {
        self.table[usize::from(id)].is_some()
    }

    /// Number of registered packet types.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing is registered.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Registered descriptors in discriminant order.
    pub fn iter(&self) -> impl Iterator<Item = &PacketDescriptor> {
        self.table.iter().flatten()
    }
}

impl Default for PacketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::{BitReader, BitWriter};
    use crate::serialize::Serializable;

    struct Login;
    struct Logout;
    struct Impostor;

    macro_rules! empty_packet {
        ($ty:ident, $id:expr, $name:expr, $compressed:expr) => {
            impl Serializable for $ty {
                fn serialize(&self, _: &mut BitWriter) -> CodecResult<()> {
                    Ok(())
                }
                fn deserialize(_: &mut BitReader<'_>) -> CodecResult<Self> {
                    Ok(Self)
                }
            }

            impl Packet for $ty {
                const ID: u8 = $id;
                const NAME: &'static str = $name;
                const COMPRESSED: bool = $compressed;
            }
        };
    }

    empty_packet!(Login, 0x01, "login", false);
    empty_packet!(Logout, 0x02, "logout", true);
    empty_packet!(Impostor, 0x01, "impostor", false);

    #[test]
    fn test_register_and_lookup() {
        let registry = PacketRegistry::new()
            .with::<Login>()
            .unwrap()
            .with::<Logout>()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup(0x01).unwrap(), Login::descriptor());
        assert!(registry.lookup(0x02).unwrap().compressed);
        assert!(registry.contains(0x02));
        assert!(!registry.contains(0x03));
    }

    #[test]
    fn test_unknown_discriminant() {
        let registry = PacketRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(0xEE), Err(CodecError::UnknownPacketType(0xEE)));
    }

    #[test]
    fn test_duplicate_discriminant() {
        let mut registry = PacketRegistry::new();
        registry.register::<Login>().unwrap();
        assert_eq!(
            registry.register::<Impostor>(),
            Err(CodecError::DuplicatePacketType(0x01))
        );
        assert_eq!(registry.lookup(0x01).unwrap().name, "login");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_iter_in_discriminant_order() {
        let registry = PacketRegistry::new()
            .with::<Logout>()
            .unwrap()
            .with::<Login>()
            .unwrap();
        let ids: Vec<u8> = registry.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0x01, 0x02]);
    }
}
