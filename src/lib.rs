// SPDX-License-Identifier: MIT
//! # Record Converter
//!
//! Converts sequences of car sales records (date, brand name, price) between
//! a custom length-prefixed binary format and an XML document, through a
//! shared in-memory model with a pooled processor lifecycle.
//!
//! ## Format Overview
//!
//! Both on-disk representations carry the same fixed-shape records. The
//! binary layout is the intricate one:
//!
//! ```text
//! Binary record format (little-endian)
//! ====================================
//!
//! Header (6 bytes):
//! - Magic: 0x2526 (2 bytes)
//! - Record count (4 bytes)
//!
//! Each record (14 bytes + brand name):
//! - Day (2 bytes)
//! - Month (2 bytes)
//! - Year (4 bytes)
//! - Brand name length in UTF-16 code units (2 bytes)
//! - Brand name, UTF-16 LE (length * 2 bytes)
//! - Price (4 bytes)
//! ```
//!
//! The XML representation is a `Document` root with one `Car` element per
//! record, carrying `Date` (`dd.mm.yyyy`), `BrandName` and `Price` children.
//!
//! ## Processor Lifecycle
//!
//! Processors are pooled per format. A processor is either **active**
//! (usable) or **cached** (released to the pool); every data-touching
//! operation on a cached processor fails with `InvalidState` until the pool
//! hands the same instance out again. The pool is an explicit owned value,
//! so tests and embedders get isolation for free.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use record_converter::{Format, FormatConverter, FormatProcessor};
//!
//! let mut converter = FormatConverter::new();
//!
//! let processor = converter.create_format_processor(Format::Binary).unwrap();
//! processor
//!     .borrow_mut()
//!     .add_new_data_item(1, 1, 2001, "brand1", 1111)
//!     .unwrap();
//! processor
//!     .borrow()
//!     .save_to_file(Path::new("records.bin"))
//!     .unwrap();
//!
//! converter
//!     .convert(Path::new("records.bin"), Path::new("records.xml"), Format::Xml)
//!     .unwrap();
//! ```
//!
//! The crate is deliberately single-threaded: processor handles are
//! `Rc<RefCell<..>>` and therefore `!Send`, which makes the pool contract
//! compile-time enforced instead of lock-protected.

pub mod binary;
pub mod converter;
pub mod error;
pub mod format;
pub mod pool;
pub mod processor;
pub mod record;
pub mod xml;

// Re-export main types
pub use binary::{BinaryProcessor, BINARY_MAGIC, HEADER_SIZE, RECORD_MIN_SIZE};
pub use converter::FormatConverter;
pub use error::{ConvertError, Result};
pub use format::{Format, MAX_BRAND_NAME_LEN};
pub use pool::{ProcessorHandle, ProcessorPool};
pub use processor::{CollectionChange, FormatProcessor, ProcessorState};
pub use record::{is_valid_date, CarRecord, ListenerId, RecordField, RecordHandle};
pub use xml::XmlProcessor;
