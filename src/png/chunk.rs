//! PNG chunk framing: length, type, payload, CRC-32.

use super::crc32::Crc32;
use crate::error::{Error, Result};

/// A chunk borrowed from the input stream, alive only during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
}

/// Sequential chunk reader over the byte stream following the signature.
///
/// Each call to [`ChunkReader::next_chunk`] validates the chunk's CRC-32
/// (computed over type and payload) before returning it.
pub struct ChunkReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        ChunkReader { input, pos: 0 }
    }

    /// Read and validate the next chunk.
    pub fn next_chunk(&mut self) -> Result<Chunk<'a>> {
        let header_end = self.pos.checked_add(8).ok_or(Error::Truncated)?;
        if header_end > self.input.len() {
            return Err(Error::Truncated);
        }
        let length = u32::from_be_bytes(self.input[self.pos..self.pos + 4].try_into().unwrap());
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&self.input[self.pos + 4..self.pos + 8]);

        let data_start = header_end;
        let data_end = data_start
            .checked_add(length as usize)
            .ok_or(Error::Truncated)?;
        let crc_end = data_end.checked_add(4).ok_or(Error::Truncated)?;
        if crc_end > self.input.len() {
            return Err(Error::Truncated);
        }

        let data = &self.input[data_start..data_end];
        let stored = u32::from_be_bytes(self.input[data_end..crc_end].try_into().unwrap());

        let mut crc = Crc32::new();
        crc.update(&kind);
        crc.update(data);
        if crc.finalize() != stored {
            return Err(Error::CrcMismatch { chunk: kind });
        }

        self.pos = crc_end;
        Ok(Chunk { kind, data })
    }
}

/// Append one chunk (length, type, payload, CRC) to `output`.
pub fn write_chunk(output: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    output.extend_from_slice(&(data.len() as u32).to_be_bytes());
    output.extend_from_slice(kind);
    output.extend_from_slice(data);

    let mut crc = Crc32::new();
    crc.update(kind);
    crc.update(data);
    output.extend_from_slice(&crc.finalize().to_be_bytes());
}
