//! Version 0 blob encoding.
//!
//! A blob is 4096 field elements of 32 bytes. The two high-order bits of every field
//! element must be zero, so each one carries 31 full bytes plus 6 bits. Four field
//! elements form a round that packs 127 bytes of data. The first round also carries
//! a version byte and a 3-byte big-endian length.

use alloy_eips::eip4844::BYTES_PER_BLOB;
use alloy_primitives::Bytes;
use thiserror::Error;

/// Maximum number of data bytes a single blob can carry.
pub const MAX_BLOB_DATA_SIZE: usize = (4 * 31 + 3) * 1024 - 4;

/// Encoding version stored in the second byte of the blob.
pub const BLOB_ENCODING_VERSION: u8 = 0;

/// Number of 4-field-element rounds in a blob.
const ROUNDS: usize = 1024;

/// Size of a field element in bytes.
const FIELD_ELEMENT_SIZE: usize = 32;

/// Mask of the bits that must be clear in the first byte of every field element.
const HIGH_BITS_MASK: u8 = 0b1100_0000;

/// Errors produced while encoding or decoding a blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    /// The blob does not have the EIP-4844 size.
    #[error("invalid blob size: expected {BYTES_PER_BLOB} bytes, got {0}")]
    InvalidSize(usize),

    /// The version byte is not supported.
    #[error("unsupported blob encoding version {0}")]
    InvalidVersion(u8),

    /// The encoded length does not fit in a blob.
    #[error("invalid blob data length {0}, max is {MAX_BLOB_DATA_SIZE}")]
    InvalidLength(usize),

    /// A field element has its high-order bits set.
    #[error("invalid field element at blob offset {0}")]
    InvalidFieldElement(usize),

    /// Decoded data past the declared length is non-zero.
    #[error("non-zero data past declared length at output offset {0}")]
    ExtraneousOutput(usize),

    /// Unused blob bytes are non-zero.
    #[error("non-zero data in unused blob area at offset {0}")]
    ExtraneousInput(usize),

    /// Input data does not fit in a blob.
    #[error("data too large for a blob: {0} bytes")]
    DataTooLarge(usize),
}

/// Decodes a version 0 blob into the data it carries.
pub fn decode_blob(blob: &[u8]) -> Result<Bytes, BlobError> {
    if blob.len() != BYTES_PER_BLOB {
        return Err(BlobError::InvalidSize(blob.len()));
    }
    if blob[1] != BLOB_ENCODING_VERSION {
        return Err(BlobError::InvalidVersion(blob[1]));
    }

    let length = u32::from_be_bytes([0, blob[2], blob[3], blob[4]]) as usize;
    if length > MAX_BLOB_DATA_SIZE {
        return Err(BlobError::InvalidLength(length));
    }

    // Sized to a whole number of rounds so the final field element never truncates.
    let mut output = vec![0u8; ROUNDS * 127];

    // Round 0: the first field element has only 27 data bytes after version and length.
    if blob[0] & HIGH_BITS_MASK != 0 {
        return Err(BlobError::InvalidFieldElement(0));
    }
    output[..27].copy_from_slice(&blob[5..FIELD_ELEMENT_SIZE]);

    let mut encoded = [0u8; 4];
    encoded[0] = blob[0];
    let mut opos = 28;
    let mut ipos = FIELD_ELEMENT_SIZE;
    for slot in encoded.iter_mut().skip(1) {
        *slot = decode_field_element(blob, &mut output, &mut opos, &mut ipos)?;
    }
    opos = reassemble(opos, &encoded, &mut output);

    for _ in 1..ROUNDS {
        if opos >= length {
            break;
        }
        for slot in &mut encoded {
            *slot = decode_field_element(blob, &mut output, &mut opos, &mut ipos)?;
        }
        opos = reassemble(opos, &encoded, &mut output);
    }

    if let Some(offset) = output[length..].iter().position(|b| *b != 0) {
        return Err(BlobError::ExtraneousOutput(length + offset));
    }
    if let Some(offset) = blob[ipos..].iter().position(|b| *b != 0) {
        return Err(BlobError::ExtraneousInput(ipos + offset));
    }

    output.truncate(length);
    Ok(output.into())
}

/// Copies the 31 low bytes of the field element at `ipos` into the output and returns
/// its first byte.
fn decode_field_element(
    blob: &[u8],
    output: &mut [u8],
    opos: &mut usize,
    ipos: &mut usize,
) -> Result<u8, BlobError> {
    let first = blob[*ipos];
    if first & HIGH_BITS_MASK != 0 {
        return Err(BlobError::InvalidFieldElement(*ipos));
    }
    output[*opos..*opos + 31].copy_from_slice(&blob[*ipos + 1..*ipos + FIELD_ELEMENT_SIZE]);
    *opos += FIELD_ELEMENT_SIZE;
    *ipos += FIELD_ELEMENT_SIZE;
    Ok(first)
}

/// Rebuilds the three bytes spread across the 6-bit prefixes of a round.
fn reassemble(opos: usize, encoded: &[u8; 4], output: &mut [u8]) -> usize {
    let opos = opos - 1;
    let x = (encoded[0] & 0b0011_1111) | ((encoded[1] & 0b0011_0000) << 2);
    let y = (encoded[1] & 0b0000_1111) | ((encoded[3] & 0b0000_1111) << 4);
    let z = (encoded[2] & 0b0011_1111) | ((encoded[3] & 0b0011_0000) << 2);
    output[opos - FIELD_ELEMENT_SIZE] = z;
    output[opos - 2 * FIELD_ELEMENT_SIZE] = y;
    output[opos - 3 * FIELD_ELEMENT_SIZE] = x;
    opos
}

/// Encodes `data` into a version 0 blob.
pub fn encode_blob(data: &[u8]) -> Result<Bytes, BlobError> {
    if data.len() > MAX_BLOB_DATA_SIZE {
        return Err(BlobError::DataTooLarge(data.len()));
    }

    let mut blob = vec![0u8; BYTES_PER_BLOB];
    let mut reader = DataReader { data, offset: 0 };
    let mut writer = 0usize;
    let mut chunk = [0u8; 31];

    for round in 0..ROUNDS {
        if round == 0 {
            let length = (data.len() as u32).to_be_bytes();
            chunk[0] = BLOB_ENCODING_VERSION;
            chunk[1..4].copy_from_slice(&length[1..]);
            chunk[4..].fill(0);
            reader.read_into(&mut chunk[4..]);
        } else {
            reader.read_into(&mut chunk);
        }
        let x = reader.read_byte();
        write_field_element(&mut blob, &mut writer, x & 0b0011_1111, &chunk);

        reader.read_into(&mut chunk);
        let y = reader.read_byte();
        write_field_element(
            &mut blob,
            &mut writer,
            (y & 0b0000_1111) | ((x & 0b1100_0000) >> 2),
            &chunk,
        );

        reader.read_into(&mut chunk);
        let z = reader.read_byte();
        write_field_element(&mut blob, &mut writer, z & 0b0011_1111, &chunk);

        reader.read_into(&mut chunk);
        write_field_element(
            &mut blob,
            &mut writer,
            ((z & 0b1100_0000) >> 2) | ((y & 0b1111_0000) >> 4),
            &chunk,
        );
    }

    Ok(blob.into())
}

fn write_field_element(blob: &mut [u8], writer: &mut usize, prefix: u8, chunk: &[u8; 31]) {
    blob[*writer] = prefix;
    blob[*writer + 1..*writer + FIELD_ELEMENT_SIZE].copy_from_slice(chunk);
    *writer += FIELD_ELEMENT_SIZE;
}

/// Sequential reader that yields zeroes once the input is exhausted.
struct DataReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl DataReader<'_> {
    fn read_byte(&mut self) -> u8 {
        let Some(byte) = self.data.get(self.offset) else {
            return 0;
        };
        self.offset += 1;
        *byte
    }

    fn read_into(&mut self, buf: &mut [u8]) {
        let remaining = &self.data[self.offset.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        buf[n..].fill(0);
        self.offset += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx_list(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_decode_recovers_encoded_tx_list() {
        let data = sample_tx_list(4321);
        let blob = encode_blob(&data).unwrap();
        assert_eq!(blob.len(), BYTES_PER_BLOB);
        assert_eq!(decode_blob(&blob).unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_decode_empty_and_full_blobs() {
        let empty = encode_blob(&[]).unwrap();
        assert!(decode_blob(&empty).unwrap().is_empty());

        let full = sample_tx_list(MAX_BLOB_DATA_SIZE);
        let blob = encode_blob(&full).unwrap();
        assert_eq!(decode_blob(&blob).unwrap().as_ref(), full.as_slice());
    }

    #[test]
    fn test_high_bits_of_every_field_element_are_clear() {
        let blob = encode_blob(&vec![0xff; MAX_BLOB_DATA_SIZE]).unwrap();
        assert!(blob.chunks(FIELD_ELEMENT_SIZE).all(|fe| fe[0] & HIGH_BITS_MASK == 0));
    }

    #[test]
    fn test_encode_rejects_oversized_data() {
        let err = encode_blob(&vec![1; MAX_BLOB_DATA_SIZE + 1]).unwrap_err();
        assert_eq!(err, BlobError::DataTooLarge(MAX_BLOB_DATA_SIZE + 1));
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        assert_eq!(decode_blob(&[0u8; 64]).unwrap_err(), BlobError::InvalidSize(64));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut blob = encode_blob(b"hello").unwrap().to_vec();
        blob[1] = 1;
        assert_eq!(decode_blob(&blob).unwrap_err(), BlobError::InvalidVersion(1));
    }

    #[test]
    fn test_decode_rejects_oversized_length() {
        let mut blob = vec![0u8; BYTES_PER_BLOB];
        blob[2..5].copy_from_slice(&[0xff, 0xff, 0xff]);
        assert_eq!(decode_blob(&blob).unwrap_err(), BlobError::InvalidLength(0x00ff_ffff));
    }

    #[test]
    fn test_decode_rejects_invalid_field_element() {
        let mut blob = encode_blob(&sample_tx_list(200)).unwrap().to_vec();
        blob[FIELD_ELEMENT_SIZE] |= 0b1000_0000;
        assert_eq!(
            decode_blob(&blob).unwrap_err(),
            BlobError::InvalidFieldElement(FIELD_ELEMENT_SIZE)
        );
    }

    #[test]
    fn test_decode_rejects_data_past_declared_length() {
        let mut blob = encode_blob(&sample_tx_list(10)).unwrap().to_vec();
        // Output byte 20 lives at blob offset 25 in the first field element.
        blob[25] = 0x01;
        assert_eq!(decode_blob(&blob).unwrap_err(), BlobError::ExtraneousOutput(20));
    }

    #[test]
    fn test_decode_rejects_data_in_unused_field_elements() {
        let mut blob = encode_blob(&sample_tx_list(10)).unwrap().to_vec();
        let last = BYTES_PER_BLOB - 1;
        blob[last] = 0x01;
        assert_eq!(decode_blob(&blob).unwrap_err(), BlobError::ExtraneousInput(last));
    }
}
