use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a slide file.
///
/// This abstraction lets the TIFF parser work on local files and in-memory
/// buffers alike. Implementations must be thread-safe.
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging and errors).
    ///
    /// For local files this is the path as given to `open`.
    fn identifier(&self) -> &str;

    /// Check that `len` bytes at `offset` lie inside the resource.
    fn check_range(&self, offset: u64, len: usize) -> Result<(), IoError> {
        let size = self.size();
        match offset.checked_add(len as u64) {
            Some(end) if end <= size => Ok(()),
            _ => Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size,
            }),
        }
    }
}

// =============================================================================
// Endian Helpers
// =============================================================================

macro_rules! endian_reader {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $from:ident) => {
        $(#[$doc])*
        ///
        /// # Panics
        /// Panics if the slice is shorter than the integer width.
        #[inline]
        pub fn $name(bytes: &[u8]) -> $ty {
            const N: usize = std::mem::size_of::<$ty>();
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            <$ty>::$from(buf)
        }
    };
}

endian_reader!(
    /// Read a little-endian u16 from the start of a byte slice.
    read_u16_le, u16, from_le_bytes
);
endian_reader!(
    /// Read a big-endian u16 from the start of a byte slice.
    read_u16_be, u16, from_be_bytes
);
endian_reader!(
    /// Read a little-endian u32 from the start of a byte slice.
    read_u32_le, u32, from_le_bytes
);
endian_reader!(
    /// Read a big-endian u32 from the start of a byte slice.
    read_u32_be, u32, from_be_bytes
);
endian_reader!(
    /// Read a little-endian u64 from the start of a byte slice.
    read_u64_le, u64, from_le_bytes
);
endian_reader!(
    /// Read a big-endian u64 from the start of a byte slice.
    read_u64_be, u64, from_be_bytes
);
