//! Collection file record format
//!
//! Each document is stored as one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record including this field)
//! +------------------+
//! | Document Body    | (UTF-8 JSON object)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over length + body)
//! +------------------+
//! ```
//!
//! A file is a plain sequence of records. Any framing or checksum failure is
//! reported as corruption; nothing is skipped.

use crc32fast::Hasher;

use super::errors::{StoreError, StoreResult};
use super::Document;

/// Length prefix plus checksum
const RECORD_OVERHEAD: usize = 4 + 4;

/// CRC32 (IEEE) over the given bytes
pub(crate) fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Serialize one document into a framed record
pub(crate) fn encode(document: &Document) -> StoreResult<Vec<u8>> {
    let body = serde_json::to_vec(document)
        .map_err(|e| StoreError::Io(format!("failed to serialize document: {}", e)))?;

    let record_length = u32::try_from(RECORD_OVERHEAD + body.len())
        .map_err(|_| StoreError::Io("document too large for one record".to_string()))?;

    let mut record = Vec::with_capacity(record_length as usize);
    record.extend_from_slice(&record_length.to_le_bytes());
    record.extend_from_slice(&body);
    let checksum = compute_checksum(&record);
    record.extend_from_slice(&checksum.to_le_bytes());

    Ok(record)
}

/// Parse every record of a collection file
pub(crate) fn decode_all(data: &[u8]) -> StoreResult<Vec<Document>> {
    let mut documents = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let (document, consumed) = decode_at(data, offset)?;
        documents.push(document);
        offset += consumed;
    }

    Ok(documents)
}

fn decode_at(data: &[u8], offset: usize) -> StoreResult<(Document, usize)> {
    let corruption = |reason: &str| StoreError::Corruption {
        offset: offset as u64,
        reason: reason.to_string(),
    };

    let remaining = &data[offset..];
    if remaining.len() < RECORD_OVERHEAD {
        return Err(corruption("truncated record header"));
    }

    let record_length =
        u32::from_le_bytes([remaining[0], remaining[1], remaining[2], remaining[3]]) as usize;
    if record_length < RECORD_OVERHEAD {
        return Err(corruption("record length below minimum"));
    }
    if record_length > remaining.len() {
        return Err(corruption("truncated record"));
    }

    let checksum_at = record_length - 4;
    let stored = u32::from_le_bytes([
        remaining[checksum_at],
        remaining[checksum_at + 1],
        remaining[checksum_at + 2],
        remaining[checksum_at + 3],
    ]);
    if compute_checksum(&remaining[..checksum_at]) != stored {
        return Err(corruption("checksum mismatch"));
    }

    let document: Document = serde_json::from_slice(&remaining[4..checksum_at])
        .map_err(|e| corruption(&format!("invalid document body: {}", e)))?;

    Ok((document, record_length))
}
