use std::io::{Read, Write};
use std::mem::size_of;

use crate::error::StorageFault;

pub(super) const RECORD_HEADER_LEN: usize = size_of::<u64>() + blake3::OUT_LEN;

/// Header written ahead of every record payload: the payload length and the
/// blake3 hash of the payload, validated when the record is read back.
pub(super) struct RecordFileHeader {
    pub(super) payload_len: u64,
    pub(super) payload_hash: blake3::Hash,
}

impl RecordFileHeader {
    pub(super) fn for_payload(payload: &[u8]) -> Self {
        Self {
            payload_len: payload.len() as u64,
            payload_hash: blake3::hash(payload),
        }
    }

    pub(super) fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize, std::io::Error> {
        let mut num_written = write_u64(writer, self.payload_len)?;
        num_written += write_hash(writer, &self.payload_hash)?;
        Ok(num_written)
    }

    pub(super) fn deserialize<R: Read>(reader: &mut R) -> Result<Self, StorageFault> {
        let payload_len = read_u64(reader)?;
        let payload_hash = read_hash(reader)?;
        Ok(Self {
            payload_len,
            payload_hash,
        })
    }
}

fn write_u64<W: Write>(writer: &mut W, v: u64) -> Result<usize, std::io::Error> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(size_of::<u64>())
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, std::io::Error> {
    let mut buf = [0u8; size_of::<u64>()];
    reader.read_exact(&mut buf[..])?;
    Ok(u64::from_le_bytes(buf))
}

fn write_hash<W: Write>(writer: &mut W, hash: &blake3::Hash) -> Result<usize, std::io::Error> {
    writer.write_all(hash.as_bytes())?;
    Ok(blake3::OUT_LEN)
}

fn read_hash<R: Read>(reader: &mut R) -> Result<blake3::Hash, std::io::Error> {
    let mut buf = [0u8; blake3::OUT_LEN];
    reader.read_exact(&mut buf)?;
    Ok(blake3::Hash::from_bytes(buf))
}
