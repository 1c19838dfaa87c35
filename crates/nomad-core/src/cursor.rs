use crate::error::LayoutError;

/// Bounds-checked little-endian reader over a borrowed byte slice.
///
/// Every read either returns exactly the requested bytes or fails with
/// `LayoutError::Truncated`; the cursor never advances on failure.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current offset from the start of the underlying slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        if n > self.remaining() {
            return Err(LayoutError::Truncated {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Copy a plain-old-data value out of the stream. Alignment is not required.
    pub fn read_pod<T: bytemuck::Pod>(&mut self) -> Result<T, LayoutError> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32, LayoutError> {
        self.read_pod::<i32>().map(i32::from_le)
    }

    pub fn read_u32(&mut self) -> Result<u32, LayoutError> {
        self.read_pod::<u32>().map(u32::from_le)
    }

    pub fn read_i64(&mut self) -> Result<i64, LayoutError> {
        self.read_pod::<i64>().map(i64::from_le)
    }

    /// Split off a sub-reader covering the next `n` bytes.
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>, LayoutError> {
        self.read_bytes(n).map(ByteReader::new)
    }
}
