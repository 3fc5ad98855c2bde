// SPDX-License-Identifier: MIT
//! End-to-end conversion tests across the binary and XML formats

use std::fs;
use std::path::Path;

use record_converter::{CarRecord, Format, FormatConverter, FormatProcessor};

fn scenario_records() -> Vec<CarRecord> {
    vec![
        CarRecord::with_values(1, 1, 2001, "brand1", 1111).unwrap(),
        CarRecord::with_values(2, 2, 2002, "brand2", 2222).unwrap(),
    ]
}

fn fill(converter: &mut FormatConverter, format: Format) -> record_converter::ProcessorHandle {
    let processor = converter.create_format_processor(format).unwrap();
    for record in scenario_records() {
        let handle = record.into_handle();
        processor.borrow_mut().add_data_item(&handle, false).unwrap();
    }
    processor
}

fn assert_scenario(records: &[record_converter::RecordHandle]) {
    assert_eq!(records.len(), 2);
    let first = records[0].borrow();
    assert_eq!(first.date_string(), "01.01.2001");
    assert_eq!(first.brand_name(), "brand1");
    assert_eq!(first.price(), 1111);
    let second = records[1].borrow();
    assert_eq!(second.date_string(), "02.02.2002");
    assert_eq!(second.brand_name(), "brand2");
    assert_eq!(second.price(), 2222);
}

#[test]
fn binary_to_xml_and_back_preserves_fields() {
    let dir = tempfile::tempdir().unwrap();
    let binary_path = dir.path().join("records.bin");
    let xml_path = dir.path().join("records.xml");
    let round_trip_path = dir.path().join("roundtrip.bin");

    let mut converter = FormatConverter::new();
    let source = fill(&mut converter, Format::Binary);
    assert!(source.borrow().save_to_file(&binary_path).unwrap());
    converter.pool_mut().release(&source).unwrap();

    assert!(converter.convert(&binary_path, &xml_path, Format::Xml).unwrap());
    assert!(converter
        .convert(&xml_path, &round_trip_path, Format::Binary)
        .unwrap());

    // the round-tripped binary is byte-identical to the original
    assert_eq!(
        fs::read(&binary_path).unwrap(),
        fs::read(&round_trip_path).unwrap()
    );

    let verify = converter.create_format_processor(Format::Binary).unwrap();
    verify.borrow_mut().read_from_file(&round_trip_path).unwrap();
    assert_scenario(verify.borrow().records().unwrap());
    converter.pool_mut().release(&verify).unwrap();
}

#[test]
fn convert_processor_between_every_format_pair() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = FormatConverter::new();

    for (input_format, output_format) in [
        (Format::Binary, Format::Binary),
        (Format::Binary, Format::Xml),
        (Format::Xml, Format::Binary),
        (Format::Xml, Format::Xml),
    ] {
        let output_path = dir.path().join(format!(
            "out_{}_{}.{}",
            input_format.extension(),
            output_format.extension(),
            output_format.extension()
        ));
        let input = fill(&mut converter, input_format);
        assert!(converter
            .convert_processor(&input, &output_path, output_format)
            .unwrap());
        converter.pool_mut().release(&input).unwrap();

        let verify = converter.create_format_processor(output_format).unwrap();
        verify.borrow_mut().read_from_file(&output_path).unwrap();
        assert_scenario(verify.borrow().records().unwrap());
        converter.pool_mut().release(&verify).unwrap();
    }
}

#[test]
fn save_without_replace_is_idempotent_across_formats() {
    let dir = tempfile::tempdir().unwrap();
    let mut converter = FormatConverter::new();

    for format in [Format::Binary, Format::Xml] {
        let path = dir.path().join(format!("records.{}", format.extension()));
        let processor = fill(&mut converter, format);
        assert!(processor.borrow().save_to_file(&path).unwrap());
        let saved = fs::read(&path).unwrap();

        processor
            .borrow_mut()
            .add_new_data_item(3, 3, 2003, "brand3", 3333)
            .unwrap();
        assert!(!processor
            .borrow()
            .save_to_file_opts(&path, false, false)
            .unwrap());
        assert_eq!(fs::read(&path).unwrap(), saved);
        converter.pool_mut().release(&processor).unwrap();
    }
}

#[test]
fn released_processors_are_reused_across_conversions() {
    let dir = tempfile::tempdir().unwrap();
    let binary_path = dir.path().join("records.bin");
    let xml_path = dir.path().join("records.xml");

    let mut converter = FormatConverter::new();
    let source = fill(&mut converter, Format::Binary);
    assert!(source.borrow().save_to_file(&binary_path).unwrap());
    converter.pool_mut().release(&source).unwrap();

    assert_eq!(converter.pool().cached_count(Format::Binary), 1);
    assert!(converter.convert(&binary_path, &xml_path, Format::Xml).unwrap());
    // input and output processors both returned to their queues
    assert_eq!(converter.pool().cached_count(Format::Binary), 1);
    assert_eq!(converter.pool().cached_count(Format::Xml), 1);
}

#[test]
fn converters_with_separate_pools_are_isolated() {
    let mut first = FormatConverter::new();
    let mut second = FormatConverter::new();

    let processor = first.create_format_processor(Format::Binary).unwrap();
    first.pool_mut().release(&processor).unwrap();

    assert_eq!(first.pool().cached_count(Format::Binary), 1);
    assert_eq!(second.pool().cached_count(Format::Binary), 0);

    first.pool_mut().clear();
    assert_eq!(first.pool().cached_count(Format::Binary), 0);
    let _ = second.create_format_processor(Format::Binary).unwrap();
}

#[test]
fn read_replaces_previous_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.bin");

    let mut converter = FormatConverter::new();
    let writer = converter.create_format_processor(Format::Binary).unwrap();
    writer
        .borrow_mut()
        .add_new_data_item(5, 5, 2005, "solo", 5)
        .unwrap();
    assert!(writer.borrow().save_to_file(&path).unwrap());
    converter.pool_mut().release(&writer).unwrap();

    let reader = fill(&mut converter, Format::Binary);
    assert_eq!(reader.borrow().len().unwrap(), 2);
    reader.borrow_mut().read_from_file(&path).unwrap();
    assert_eq!(reader.borrow().len().unwrap(), 1);
    assert_eq!(reader.borrow().record(0).unwrap().borrow().brand_name(), "solo");
    converter.pool_mut().release(&reader).unwrap();
}

#[test]
fn decode_failure_leaves_collection_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.bin");
    fs::write(&path, b"\x26\x25\xff\xff\xff\xff").unwrap();

    let mut converter = FormatConverter::new();
    let processor = fill(&mut converter, Format::Binary);
    assert!(processor.borrow_mut().read_from_file(&path).is_err());
    // no partial record sets: the old collection is still intact
    assert_scenario(processor.borrow().records().unwrap());
    converter.pool_mut().release(&processor).unwrap();
}

#[test]
fn xml_file_is_schema_shaped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.xml");

    let mut converter = FormatConverter::new();
    let processor = fill(&mut converter, Format::Xml);
    assert!(processor.borrow().save_to_file(&path).unwrap());
    converter.pool_mut().release(&processor).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<Document>"));
    assert_eq!(text.matches("<Car>").count(), 2);
}

#[test]
fn missing_input_file_is_an_error_not_empty_data() {
    let mut converter = FormatConverter::new();
    let missing = Path::new("definitely-does-not-exist.bin");
    assert!(converter
        .convert(missing, Path::new("out.xml"), Format::Xml)
        .is_err());
}
