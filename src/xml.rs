// SPDX-License-Identifier: MIT
//! XML record format: a `Document` root holding `Car` elements
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <Document>
//!   <Car>
//!     <Date>01.01.2001</Date>
//!     <BrandName>brand1</BrandName>
//!     <Price>1111</Price>
//!   </Car>
//! </Document>
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::format::Format;
use crate::processor::{FormatProcessor, ProcessorCore};
use crate::record::{CarRecord, RecordHandle};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Document")]
struct XmlDocument {
    #[serde(rename = "Car", default)]
    cars: Vec<XmlCar>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlCar {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "BrandName")]
    brand_name: String,
    #[serde(rename = "Price")]
    price: i32,
}

/// Serializes records into an XML document with declaration
pub fn encode(records: &[RecordHandle]) -> Result<Vec<u8>> {
    let document = XmlDocument {
        cars: records
            .iter()
            .map(|record| {
                let record = record.borrow();
                XmlCar {
                    date: record.date_string(),
                    brand_name: record.brand_name().to_owned(),
                    price: record.price(),
                }
            })
            .collect(),
    };
    let body = quick_xml::se::to_string(&document)
        .map_err(|e| ConvertError::InvalidFormat(format!("XML serialization failed: {}", e)))?;
    Ok(format!("{}\n{}", XML_DECLARATION, body).into_bytes())
}

/// Parses an XML document, re-validating every field through the record
/// setters; any violation fails the whole parse.
pub fn decode(bytes: &[u8]) -> Result<Vec<CarRecord>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ConvertError::InvalidFormat(format!("XML document is not UTF-8: {}", e)))?;
    let document: XmlDocument = quick_xml::de::from_str(text)
        .map_err(|e| ConvertError::InvalidFormat(format!("XML document is invalid: {}", e)))?;

    let mut records = Vec::with_capacity(document.cars.len());
    for (index, car) in document.cars.into_iter().enumerate() {
        if car.price < 0 {
            return Err(ConvertError::InvalidFormat(format!(
                "Car element {} has negative price {}",
                index, car.price
            )));
        }
        let mut record = CarRecord::new();
        record.set_date_str(&car.date)?;
        record.set_brand_name(&car.brand_name);
        record.set_price(car.price).map_err(|_| {
            ConvertError::InvalidFormat(format!("Car element {} has invalid price", index))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Processor for the XML document format
pub struct XmlProcessor {
    core: ProcessorCore,
}

impl XmlProcessor {
    pub fn new() -> Self {
        Self {
            core: ProcessorCore::new(),
        }
    }
}

impl Default for XmlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProcessor for XmlProcessor {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn core(&self) -> &ProcessorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessorCore {
        &mut self.core
    }

    fn encode_records(&self) -> Result<Vec<u8>> {
        encode(self.records()?)
    }

    fn decode_records(&self, bytes: &[u8]) -> Result<Vec<CarRecord>> {
        decode(bytes)
    }
}
