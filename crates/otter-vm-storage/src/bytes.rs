//! Width- and order-parametrized access to raw bytes
//!
//! Every multi-byte read or write in the binary views goes through
//! [`read_bits`] / [`write_bits`]. Bytes are assembled into a `u64` bit
//! pattern explicitly; nothing reinterprets a byte slice as a wider type.

/// Byte order of a multi-byte access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
    /// Order of the host platform
    #[default]
    Native,
}

impl Endianness {
    /// `littleEndian` argument of the DataView accessors
    pub fn from_little_endian(little: bool) -> Self {
        if little { Self::Little } else { Self::Big }
    }

    /// Whether this order stores the low byte first on the current host
    pub fn is_little(self) -> bool {
        match self {
            Self::Little => true,
            Self::Big => false,
            Self::Native => cfg!(target_endian = "little"),
        }
    }
}

/// Read `size` bytes at `offset` as an unsigned bit pattern.
///
/// Caller guarantees `offset + size <= data.len()` and `size <= 8`.
pub fn read_bits(data: &[u8], offset: usize, size: usize, order: Endianness) -> u64 {
    let bytes = &data[offset..offset + size];
    if order.is_little() {
        bytes.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u64)
    } else {
        bytes.iter().fold(0, |acc, &b| (acc << 8) | b as u64)
    }
}

/// Write the low `size` bytes of `bits` at `offset`.
pub fn write_bits(data: &mut [u8], offset: usize, size: usize, bits: u64, order: Endianness) {
    let bytes = &mut data[offset..offset + size];
    let little = order.is_little();
    for (i, byte) in bytes.iter_mut().enumerate() {
        let shift = if little { i } else { size - 1 - i };
        *byte = (bits >> (shift * 8)) as u8;
    }
}
