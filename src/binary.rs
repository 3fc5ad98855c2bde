// SPDX-License-Identifier: MIT
//! Length-prefixed binary record format
//!
//! Little-endian throughout:
//!
//! ```text
//! Header:  i16  magic          = 0x2526
//!          u32  record_count
//! Repeated record_count times:
//!          i16  day
//!          i16  month
//!          i32  year
//!          u16  brand_len       (UTF-16 code units)
//!          brand_len * 2 bytes  (brand name, UTF-16 LE)
//!          i32  price
//! ```

use crate::error::{ConvertError, Result};
use crate::format::Format;
use crate::processor::{FormatProcessor, ProcessorCore};
use crate::record::{CarRecord, RecordHandle};

/// Binary format magic constant
pub const BINARY_MAGIC: i16 = 0x2526;

/// Header size in bytes: magic + record count
pub const HEADER_SIZE: usize = 6;

/// Minimum size of one record: fixed fields plus price, empty brand name
pub const RECORD_MIN_SIZE: usize = 14;

/// Offset of the brand length field within a record
const BRAND_LEN_OFFSET: usize = 8;

/// Encodes records in collection order: header, then each record's fields
/// with no padding or alignment.
///
/// Infallible: record invariants guarantee every field fits its wire type.
pub fn encode(records: &[RecordHandle]) -> Vec<u8> {
    let total_size: usize = HEADER_SIZE
        + records
            .iter()
            .map(|r| RECORD_MIN_SIZE + 2 * r.borrow().brand_name().encode_utf16().count())
            .sum::<usize>();
    let mut buffer = Vec::with_capacity(total_size);

    buffer.extend_from_slice(&BINARY_MAGIC.to_le_bytes());
    buffer.extend_from_slice(&(records.len() as u32).to_le_bytes());

    for record in records {
        let record = record.borrow();
        buffer.extend_from_slice(&(record.day() as i16).to_le_bytes());
        buffer.extend_from_slice(&(record.month() as i16).to_le_bytes());
        buffer.extend_from_slice(&record.year().to_le_bytes());

        let brand_len = record.brand_name().encode_utf16().count() as u16;
        buffer.extend_from_slice(&brand_len.to_le_bytes());
        for unit in record.brand_name().encode_utf16() {
            buffer.extend_from_slice(&unit.to_le_bytes());
        }

        buffer.extend_from_slice(&record.price().to_le_bytes());
    }

    debug_assert_eq!(buffer.len(), total_size);
    buffer
}

/// Parses a complete binary payload.
///
/// Total failure semantics: the magic must match, every record's bounds must
/// check out and every decoded field must satisfy the record invariants, or
/// the whole parse fails with `InvalidFormat`. A partially parsed set is
/// never returned.
pub fn decode(bytes: &[u8]) -> Result<Vec<CarRecord>> {
    if bytes.len() < HEADER_SIZE {
        return Err(ConvertError::InvalidFormat(format!(
            "binary payload of {} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let magic = i16::from_le_bytes(bytes[0..2].try_into().unwrap());
    if magic != BINARY_MAGIC {
        return Err(ConvertError::InvalidFormat(format!(
            "magic mismatch: expected 0x{:04X}, got 0x{:04X}",
            BINARY_MAGIC, magic
        )));
    }
    let record_count = u32::from_le_bytes(bytes[2..6].try_into().unwrap()) as usize;

    // an adversarial count cannot reserve more than the payload could hold
    let max_possible = (bytes.len() - HEADER_SIZE) / RECORD_MIN_SIZE;
    let mut records = Vec::with_capacity(record_count.min(max_possible));

    let mut pos = HEADER_SIZE;
    for index in 0..record_count {
        let (record, size) = decode_record(bytes, pos, index)?;
        records.push(record);
        pos += size;
    }
    Ok(records)
}

/// Decodes one record at `pos`, returning it together with its encoded size
fn decode_record(bytes: &[u8], pos: usize, index: usize) -> Result<(CarRecord, usize)> {
    if bytes.len() < pos + RECORD_MIN_SIZE {
        return Err(truncated(index));
    }
    let brand_len = u16::from_le_bytes(
        bytes[pos + BRAND_LEN_OFFSET..pos + BRAND_LEN_OFFSET + 2]
            .try_into()
            .unwrap(),
    ) as usize;
    let record_size = RECORD_MIN_SIZE + brand_len * 2;
    if bytes.len() < pos + record_size {
        return Err(truncated(index));
    }

    let day = i16::from_le_bytes(bytes[pos..pos + 2].try_into().unwrap());
    let month = i16::from_le_bytes(bytes[pos + 2..pos + 4].try_into().unwrap());
    let year = i32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap());
    if day <= 0 || month <= 0 {
        return Err(ConvertError::InvalidFormat(format!(
            "record {} has invalid date {:02}.{:02}.{:04}",
            index, day, month, year
        )));
    }

    let name_start = pos + BRAND_LEN_OFFSET + 2;
    let units: Vec<u16> = bytes[name_start..name_start + brand_len * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let brand_name = String::from_utf16_lossy(&units);

    let price_start = name_start + brand_len * 2;
    let price = i32::from_le_bytes(bytes[price_start..price_start + 4].try_into().unwrap());
    if price < 0 {
        return Err(ConvertError::InvalidFormat(format!(
            "record {} has negative price {}",
            index, price
        )));
    }

    let mut record = CarRecord::new();
    record.set_date(day as u32, month as u32, year)?;
    record.set_brand_name(&brand_name);
    record
        .set_price(price)
        .map_err(|_| ConvertError::InvalidFormat(format!("record {} has invalid price", index)))?;
    Ok((record, record_size))
}

fn truncated(index: usize) -> ConvertError {
    ConvertError::InvalidFormat(format!("binary payload is truncated at record {}", index))
}

/// Processor for the length-prefixed binary format
pub struct BinaryProcessor {
    core: ProcessorCore,
}

impl BinaryProcessor {
    pub fn new() -> Self {
        Self {
            core: ProcessorCore::new(),
        }
    }
}

impl Default for BinaryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProcessor for BinaryProcessor {
    fn format(&self) -> Format {
        Format::Binary
    }

    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn encode_records(&self) -> Result<Vec<u8>> {
        Ok(encode(self.records()?))
    }

    fn decode_records(&self, bytes: &[u8]) -> Result<Vec<CarRecord>> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MAX_BRAND_NAME_LEN;

    fn handles(records: Vec<CarRecord>) -> Vec<RecordHandle> {
        records.into_iter().map(CarRecord::into_handle).collect()
    }

    fn scenario_records() -> Vec<RecordHandle> {
        handles(vec![
            CarRecord::with_values(1, 1, 2001, "brand1", 1111).unwrap(),
            CarRecord::with_values(2, 2, 2002, "brand2", 2222).unwrap(),
        ])
    }

    #[test]
    fn test_scenario_round_trip_preserves_fields_and_order() {
        let records = scenario_records();
        let bytes = encode(&records);
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].date_string(), "01.01.2001");
        assert_eq!(decoded[0].brand_name(), "brand1");
        assert_eq!(decoded[0].price(), 1111);
        assert_eq!(decoded[1].date_string(), "02.02.2002");
        assert_eq!(decoded[1].brand_name(), "brand2");
        assert_eq!(decoded[1].price(), 2222);
    }

    #[test]
    fn test_encode_exact_byte_layout() {
        let records = handles(vec![
            CarRecord::with_values(1, 1, 2001, "brand1", 1111).unwrap()
        ]);
        let bytes = encode(&records);

        // header
        assert_eq!(&bytes[0..2], &[0x26, 0x25]);
        assert_eq!(&bytes[2..6], &1u32.to_le_bytes());
        // fixed record fields
        assert_eq!(&bytes[6..8], &1i16.to_le_bytes());
        assert_eq!(&bytes[8..10], &1i16.to_le_bytes());
        assert_eq!(&bytes[10..14], &2001i32.to_le_bytes());
        assert_eq!(&bytes[14..16], &6u16.to_le_bytes());
        // UTF-16 LE brand name
        let name: Vec<u8> = "brand1"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(&bytes[16..28], name.as_slice());
        assert_eq!(&bytes[28..32], &1111i32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_SIZE + RECORD_MIN_SIZE + 12);
    }

    #[test]
    fn test_round_trip_byte_equality() {
        let records = scenario_records();
        let bytes = encode(&records);
        let reencoded = encode(&handles(decode(&bytes).unwrap()));
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn test_empty_collection_is_header_only() {
        let bytes = encode(&[]);
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_minimum_header_with_zero_count_parses_empty() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&BINARY_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_shorter_than_header_fails() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0x26, 0x25, 0x00]).is_err());
    }

    #[test]
    fn test_magic_mismatch_fails() {
        let mut bytes = encode(&scenario_records());
        bytes[0] = 0x00;
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_one_byte_short_fails() {
        let bytes = encode(&scenario_records());
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_count_beyond_payload_fails() {
        let mut bytes = encode(&scenario_records());
        // claim one more record than the payload holds
        bytes[2..6].copy_from_slice(&3u32.to_le_bytes());
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_empty_brand_name_round_trips() {
        let records = handles(vec![CarRecord::with_values(5, 6, 2020, "", 0).unwrap()]);
        let bytes = encode(&records);
        assert_eq!(bytes.len(), HEADER_SIZE + RECORD_MIN_SIZE);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded[0].brand_name(), "");
        assert_eq!(decoded[0].price(), 0);
    }

    #[test]
    fn test_maximum_brand_name_round_trips() {
        let name = "x".repeat(MAX_BRAND_NAME_LEN);
        let records = handles(vec![
            CarRecord::with_values(1, 1, 2001, &name, 1).unwrap()
        ]);
        let bytes = encode(&records);
        assert_eq!(
            bytes.len(),
            HEADER_SIZE + RECORD_MIN_SIZE + 2 * MAX_BRAND_NAME_LEN
        );

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded[0].brand_name(), name);
    }

    #[test]
    fn test_non_ascii_brand_name_round_trips() {
        let records = handles(vec![
            CarRecord::with_values(1, 1, 2001, "Škoda Octavia", 100).unwrap()
        ]);
        let decoded = decode(&encode(&records)).unwrap();
        assert_eq!(decoded[0].brand_name(), "Škoda Octavia");
    }

    #[test]
    fn test_invalid_date_in_payload_fails() {
        let mut bytes = encode(&scenario_records());
        // 30.02 is never a valid date
        bytes[6..8].copy_from_slice(&30i16.to_le_bytes());
        bytes[8..10].copy_from_slice(&2i16.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_negative_price_in_payload_fails() {
        let records = handles(vec![CarRecord::with_values(1, 1, 2001, "", 7).unwrap()]);
        let mut bytes = encode(&records);
        let price_start = bytes.len() - 4;
        bytes[price_start..].copy_from_slice(&(-7i32).to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_processor_get_data_round_trip() {
        let mut processor = BinaryProcessor::new();
        processor.add_new_data_item(1, 1, 2001, "brand1", 1111).unwrap();
        processor.add_new_data_item(2, 2, 2002, "brand2", 2222).unwrap();

        let bytes = processor.get_data().unwrap();
        let decoded = processor.decode_records(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(*processor.record(0).unwrap().borrow(), decoded[0]);
        assert_eq!(*processor.record(1).unwrap().borrow(), decoded[1]);
    }
}
