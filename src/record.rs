// SPDX-License-Identifier: MIT
//! Fixed car sales record shared by all format processors

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{Datelike, NaiveDate};

use crate::error::{ConvertError, Result};
use crate::format::{DATE_FORMAT, MAX_BRAND_NAME_LEN};

/// Fallback parse formats tried after the canonical `dd.mm.yyyy` form
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Shared, reference-identified handle to a record.
///
/// Collections deduplicate by handle identity (`Rc::ptr_eq`), so the same
/// record instance cannot be inserted twice while equal-but-distinct
/// instances can.
pub type RecordHandle = Rc<RefCell<CarRecord>>;

/// Opaque handle identifying a registered change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(raw: u64) -> Self {
        ListenerId(raw)
    }
}

/// Record field named by a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Date,
    Day,
    Month,
    Year,
    BrandName,
    Price,
}

type RecordListener = Box<dyn FnMut(RecordField)>;

/// One date/brand/price tuple with validated mutation and change
/// notification.
///
/// Invariants: the date is always a valid proleptic Gregorian calendar date
/// with year in `[1, 9999]`; the brand name never exceeds 65 535 UTF-16 code
/// units; the price is never negative.
pub struct CarRecord {
    date: NaiveDate,
    brand_name: String,
    price: i32,
    listeners: Vec<(ListenerId, RecordListener)>,
    next_listener_id: u64,
}

/// Checks a (day, month, year) triple against proleptic Gregorian calendar
/// rules, including leap years, with year restricted to `[1, 9999]`.
pub fn is_valid_date(day: u32, month: u32, year: i32) -> bool {
    (1..=9999).contains(&year) && NaiveDate::from_ymd_opt(year, month, day).is_some()
}

impl CarRecord {
    /// Creates an empty record: date 01.01.0001, empty brand, zero price
    pub fn new() -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(1, 1, 1).expect("01.01.0001 is a valid date"),
            brand_name: String::new(),
            price: 0,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Convenience constructor building a validated record in one call
    pub fn with_values(day: u32, month: u32, year: i32, brand_name: &str, price: i32) -> Result<Self> {
        let mut record = Self::new();
        record.set_date(day, month, year)?;
        record.set_brand_name(brand_name);
        record.set_price(price)?;
        Ok(record)
    }

    /// Wraps the record in a shared handle for collection use
    pub fn into_handle(self) -> RecordHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Date in the canonical `dd.mm.yyyy` form
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn brand_name(&self) -> &str {
        &self.brand_name
    }

    pub fn price(&self) -> i32 {
        self.price
    }

    /// Parses and applies a date string.
    ///
    /// The canonical fixed-width `dd.mm.yyyy` form is tried first, then the
    /// locale-neutral fallbacks. Fails with `InvalidFormat` when no parse
    /// succeeds or the parsed year falls outside `[1, 9999]`.
    pub fn set_date_str(&mut self, date: &str) -> Result<()> {
        let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .ok()
            .or_else(|| {
                FALLBACK_DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
            })
            .filter(|d| (1..=9999).contains(&d.year()))
            .ok_or_else(|| {
                ConvertError::InvalidFormat(format!("date '{}' is not in a valid format", date))
            })?;
        self.date = parsed;
        self.notify(&[
            RecordField::Date,
            RecordField::Year,
            RecordField::Month,
            RecordField::Day,
        ]);
        Ok(())
    }

    /// Applies a full (day, month, year) date after calendar validation
    pub fn set_date(&mut self, day: u32, month: u32, year: i32) -> Result<()> {
        self.date = Self::checked_date(day, month, year)?;
        self.notify(&[
            RecordField::Date,
            RecordField::Year,
            RecordField::Month,
            RecordField::Day,
        ]);
        Ok(())
    }

    /// Sets the day, validating the resulting full date
    pub fn set_day(&mut self, day: u32) -> Result<()> {
        self.date = Self::checked_date(day, self.month(), self.year())?;
        self.notify(&[RecordField::Date, RecordField::Day]);
        Ok(())
    }

    /// Sets the month, validating the resulting full date
    pub fn set_month(&mut self, month: u32) -> Result<()> {
        self.date = Self::checked_date(self.day(), month, self.year())?;
        self.notify(&[RecordField::Date, RecordField::Month]);
        Ok(())
    }

    /// Sets the year, validating the resulting full date
    pub fn set_year(&mut self, year: i32) -> Result<()> {
        self.date = Self::checked_date(self.day(), self.month(), year)?;
        self.notify(&[RecordField::Date, RecordField::Year]);
        Ok(())
    }

    /// Sets the brand name, silently truncating to 65 535 UTF-16 code units
    pub fn set_brand_name(&mut self, brand_name: &str) {
        let unit_count = brand_name.encode_utf16().count();
        self.brand_name = if unit_count <= MAX_BRAND_NAME_LEN {
            brand_name.to_owned()
        } else {
            let units: Vec<u16> = brand_name
                .encode_utf16()
                .take(MAX_BRAND_NAME_LEN)
                .collect();
            String::from_utf16_lossy(&units)
        };
        self.notify(&[RecordField::BrandName]);
    }

    /// Sets the price; negative values fail with `OutOfRange`
    pub fn set_price(&mut self, price: i32) -> Result<()> {
        if price < 0 {
            return Err(ConvertError::OutOfRange(format!(
                "price must be non-negative, got {}",
                price
            )));
        }
        self.price = price;
        self.notify(&[RecordField::Price]);
        Ok(())
    }

    /// Registers a change listener; the returned id removes it again
    pub fn add_change_listener(&mut self, listener: RecordListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes a previously registered listener; false if the id is unknown
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Detaches every change listener
    pub fn dispose(&mut self) {
        self.listeners.clear();
    }

    fn checked_date(day: u32, month: u32, year: i32) -> Result<NaiveDate> {
        if !(1..=9999).contains(&year) {
            return Err(ConvertError::InvalidFormat(format!(
                "date is invalid: {:02}.{:02}.{:04}",
                day, month, year
            )));
        }
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            ConvertError::InvalidFormat(format!(
                "date is invalid: {:02}.{:02}.{:04}",
                day, month, year
            ))
        })
    }

    fn notify(&mut self, fields: &[RecordField]) {
        for (_, listener) in self.listeners.iter_mut() {
            for field in fields {
                listener(*field);
            }
        }
    }
}

impl Default for CarRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CarRecord {
    /// Deep copy of the value fields; listeners are never carried over
    fn clone(&self) -> Self {
        Self {
            date: self.date,
            brand_name: self.brand_name.clone(),
            price: self.price,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }
}

impl PartialEq for CarRecord {
    /// Value equality over date, brand name and price
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date && self.brand_name == other.brand_name && self.price == other.price
    }
}

impl fmt::Debug for CarRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarRecord")
            .field("date", &self.date_string())
            .field("brand_name", &self.brand_name)
            .field("price", &self.price)
            .finish()
    }
}

impl fmt::Display for CarRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Date: {}; BrandName: {}; Price: {}",
            self.date_string(),
            self.brand_name,
            self.price
        )
    }
}
