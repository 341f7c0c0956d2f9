//! Envelope encoder and decoder.

use ashwire_core::{BufferPool, PooledBuffer};

use super::packet::{Packet, PacketDescriptor};
use super::registry::PacketRegistry;
use crate::bits::{BitReader, BitWriter};
use crate::compression::{decompress, CompressedLength};
use crate::config::{CodecConfig, DecompressionConfig};
use crate::error::{CodecError, CodecResult};

/// Encodes and decodes packet envelopes.
///
/// Bundles the buffer pool, the discriminant table and the decompression
/// sizing policy. Cheap to share: clone the pool, not the codec, when a
/// second thread needs its own writers.
///
/// # Example
///
/// ```rust
/// use ashwire_protocol::{
///     BitReader, BitWriter, CodecResult, Packet, PacketCodec, PacketRegistry, Serializable,
/// };
///
/// #[derive(Debug, PartialEq)]
/// struct Chat(String);
///
/// impl Serializable for Chat {
///     fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
///         writer.write_str(&self.0)
///     }
///     fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
///         Ok(Self(reader.read_string()?))
///     }
/// }
///
/// impl Packet for Chat {
///     const ID: u8 = 0x10;
///     const NAME: &'static str = "chat";
///     const COMPRESSED: bool = true;
/// }
///
/// let codec = PacketCodec::new(PacketRegistry::new().with::<Chat>().unwrap());
/// let wire = codec.encode(&Chat("praise the sun".into())).unwrap();
/// assert_eq!(wire[0], 0x10);
///
/// let decoded = codec.decode(&wire).unwrap();
/// assert_eq!(decoded.read::<Chat>().unwrap(), Chat("praise the sun".into()));
/// ```
#[derive(Debug)]
pub struct PacketCodec {
    pool: BufferPool,
    registry: PacketRegistry,
    decompression: DecompressionConfig,
}

impl PacketCodec {
    /// Creates a codec with a default pool and default tuning.
    #[must_use]
    pub fn new(registry: PacketRegistry) -> Self {
        Self::with_config(registry, CodecConfig::default())
    }

    /// Creates a codec from loaded configuration.
    #[must_use]
    pub fn with_config(registry: PacketRegistry, config: CodecConfig) -> Self {
        tracing::debug!(
            packet_types = registry.len(),
            max_attempts = config.decompression.max_attempts,
            "packet codec ready"
        );
        Self {
            pool: BufferPool::with_config(config.pool),
            registry,
            decompression: config.decompression,
        }
    }

    /// Creates a codec over an existing pool, with its own decompression
    /// sizing.
    #[must_use]
    pub fn with_pool(
        registry: PacketRegistry,
        pool: &BufferPool,
        decompression: DecompressionConfig,
    ) -> Self {
        Self {
            pool: pool.clone(),
            registry,
            decompression,
        }
    }

    /// The pool every encoded buffer and decoded payload comes from.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Sizing policy applied to compressed payloads.
    #[inline]
    #[must_use]
    pub fn decompression(&self) -> &DecompressionConfig {
        &self.decompression
    }

    /// The discriminant table.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    /// Writes the discriminant of `P`, then its payload, compressed if `P`
    /// says so.
    ///
    /// The packet type does not have to be registered to be encoded.
    ///
    /// # Errors
    ///
    /// Errors raised by the payload's `serialize` or by compression.
    pub fn encode<P: Packet>(&self, packet: &P) -> CodecResult<PooledBuffer> {
        let mut writer = BitWriter::new(&self.pool);
        writer.write_u8(P::ID)?;
        if P::COMPRESSED {
            writer.write_compressed(CompressedLength::Omitted, |w| packet.serialize(w))?;
        } else {
            packet.serialize(&mut writer)?;
        }

        tracing::trace!(packet = P::NAME, id = P::ID, bytes = writer.len(), "encoded packet");
        Ok(writer.into_buffer())
    }

    /// Reads the discriminant and prepares a reader over the payload.
    ///
    /// A compressed payload is decompressed here into a pooled buffer; a raw
    /// payload is read in place.
    ///
    /// # Errors
    ///
    /// - [`CodecError::NotEnoughData`] for an empty span.
    /// - [`CodecError::UnknownPacketType`] for an unregistered discriminant.
    /// - [`CodecError::BufferTooSmall`] or [`CodecError::Decompress`] for a
    ///   compressed payload that cannot be decoded.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> CodecResult<DecodedPacket<'a>> {
        let Some((&id, payload)) = bytes.split_first() else {
            return Err(CodecError::NotEnoughData {
                requested_bits: 8,
                available_bits: 0,
            });
        };
        let descriptor = self.registry.lookup(id)?;

        let reader = if descriptor.compressed {
            let output = decompress(
                &self.pool,
                payload,
                self.decompression.initial_guess(payload.len()),
                self.decompression.max_attempts,
            )?;
            BitReader::from_buffer(output, &self.pool)
        } else {
            BitReader::new(payload, &self.pool)
        };

        tracing::trace!(
            packet = descriptor.name,
            id,
            wire_bytes = bytes.len(),
            payload_bytes = reader.len(),
            "decoded packet"
        );
        Ok(DecodedPacket { descriptor, reader })
    }
}

/// A packet whose discriminant has been read and whose payload is ready.
#[derive(Debug)]
pub struct DecodedPacket<'a> {
    descriptor: PacketDescriptor,
    reader: BitReader<'a>,
}

impl<'a> DecodedPacket<'a> {
    /// Discriminant byte.
    #[inline]
    #[must_use]
    pub const fn packet_type(&self) -> u8 {
        self.descriptor.id
    }

    /// Registered properties of the packet type.
    #[inline]
    #[must_use]
    pub const fn descriptor(&self) -> PacketDescriptor {
        self.descriptor
    }

    /// Returns true if this is a `P`.
    #[inline]
    #[must_use]
    pub const fn is<P: Packet>(&self) -> bool {
        self.descriptor.id == P::ID
    }

    /// Reader positioned at the start of the (decompressed) payload.
    #[inline]
    pub fn reader(&mut self) -> &mut BitReader<'a> {
        &mut self.reader
    }

    /// Takes the payload reader.
    #[inline]
    #[must_use]
    pub fn into_reader(self) -> BitReader<'a> {
        self.reader
    }

    /// Deserializes the payload as `P`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::PacketMismatch`] if the discriminant is not `P::ID`.
    /// - Errors from `P::deserialize`.
    pub fn read<P: Packet>(mut self) -> CodecResult<P> {
        if !self.is::<P>() {
            return Err(CodecError::PacketMismatch {
                expected: P::ID,
                found: self.descriptor.id,
            });
        }
        P::deserialize(&mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Serializable;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    struct Move {
        entity: u32,
        x: f32,
        y: f32,
        running: bool,
    }

    impl Serializable for Move {
        fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
            writer.write_u32(self.entity)?;
            writer.write_f32(self.x)?;
            writer.write_f32(self.y)?;
            writer.write_bit(self.running)
        }

        fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
            Ok(Self {
                entity: reader.read_u32()?,
                x: reader.read_f32()?,
                y: reader.read_f32()?,
                running: reader.read_bit()?,
            })
        }
    }

    impl Packet for Move {
        const ID: u8 = 0x21;
        const NAME: &'static str = "move";
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Roster {
        members: Vec<Uuid>,
    }

    impl Serializable for Roster {
        fn serialize(&self, writer: &mut BitWriter) -> CodecResult<()> {
            writer.write_u16(u16::try_from(self.members.len()).unwrap())?;
            self.members.iter().try_for_each(|id| writer.write(id))
        }

        fn deserialize(reader: &mut BitReader<'_>) -> CodecResult<Self> {
            let count = reader.read_u16()?;
            let members = (0..count).map(|_| reader.read()).collect::<CodecResult<_>>()?;
            Ok(Self { members })
        }
    }

    impl Packet for Roster {
        const ID: u8 = 0x40;
        const NAME: &'static str = "roster";
        const COMPRESSED: bool = true;
    }

    fn codec() -> PacketCodec {
        PacketCodec::new(
            PacketRegistry::new()
                .with::<Move>()
                .unwrap()
                .with::<Roster>()
                .unwrap(),
        )
    }

    #[test]
    fn test_raw_packet_layout() {
        let codec = codec();
        let packet = Move {
            entity: 9,
            x: 1.0,
            y: -1.0,
            running: true,
        };
        let wire = codec.encode(&packet).unwrap();

        assert_eq!(wire[0], 0x21);
        assert_eq!(&wire[1..5], &[0, 0, 0, 9]);
        assert_eq!(&wire[5..9], &1.0f32.to_be_bytes());
        assert_eq!(wire.len(), 1 + 4 + 4 + 4 + 1);
        assert_eq!(wire[13], 0x80);

        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded.packet_type(), 0x21);
        assert!(!decoded.descriptor().compressed);
        assert_eq!(decoded.read::<Move>().unwrap(), packet);
    }

    #[test]
    fn test_compressed_packet_roundtrip() {
        let codec = codec();
        let roster = Roster {
            members: (0..200).map(|i| Uuid::from_u128(i % 4)).collect(),
        };
        let wire = codec.encode(&roster).unwrap();
        assert_eq!(wire[0], 0x40);
        assert!(wire.len() < 1 + 2 + 200 * 16);

        let decoded = codec.decode(&wire).unwrap();
        assert!(decoded.is::<Roster>());
        assert_eq!(decoded.read::<Roster>().unwrap(), roster);
    }

    #[test]
    fn test_unknown_type_reported() {
        let codec = codec();
        let err = codec.decode(&[0x99, 1, 2, 3]).unwrap_err();
        assert_eq!(err, CodecError::UnknownPacketType(0x99));
    }

    #[test]
    fn test_empty_span() {
        let codec = codec();
        assert!(matches!(
            codec.decode(&[]),
            Err(CodecError::NotEnoughData { requested_bits: 8, .. })
        ));
    }

    #[test]
    fn test_read_as_wrong_type() {
        let codec = codec();
        let wire = codec
            .encode(&Roster {
                members: vec![Uuid::nil()],
            })
            .unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(
            decoded.read::<Move>(),
            Err(CodecError::PacketMismatch {
                expected: 0x21,
                found: 0x40
            })
        );
    }

    #[test]
    fn test_shared_pool_keeps_decompression_config() {
        let pool = BufferPool::new();
        let registry = || PacketRegistry::new().with::<Roster>().unwrap();
        let tight = PacketCodec::with_pool(
            registry(),
            &pool,
            DecompressionConfig {
                max_attempts: 1,
                initial_ratio: 1,
            },
        );
        assert_eq!(tight.decompression().max_attempts, 1);

        let roster = Roster {
            members: vec![Uuid::nil(); 200],
        };
        let wire = tight.encode(&roster).unwrap();
        assert!(matches!(
            tight.decode(&wire),
            Err(CodecError::BufferTooSmall { attempts: 1, .. })
        ));

        let roomy = PacketCodec::with_pool(
            registry(),
            &pool,
            DecompressionConfig {
                max_attempts: 8,
                initial_ratio: 4,
            },
        );
        let decoded = roomy.decode(&wire).unwrap();
        assert_eq!(decoded.read::<Roster>().unwrap(), roster);

        drop(wire);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_buffers_return_to_pool() {
        let codec = codec();
        for _ in 0..10 {
            let wire = codec
                .encode(&Roster {
                    members: vec![Uuid::from_u128(u128::MAX); 8],
                })
                .unwrap();
            let decoded = codec.decode(&wire).unwrap();
            decoded.read::<Roster>().unwrap();
        }
        let stats = codec.pool().stats();
        assert_eq!(stats.outstanding, 0);
        assert!(stats.reuses > 0);
    }
}
