// SPDX-License-Identifier: MIT
//! Format processor trait and the shared record collection behind it

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::format::{Format, BACKUP_FILE_SUFFIX, TEMP_FILE_SUFFIX};
use crate::record::{CarRecord, ListenerId, RecordHandle};

/// Lifecycle state of a processor instance.
///
/// Fresh and re-acquired processors are `Active`; releasing a processor to
/// the pool flips it to `Cached`, where every data-touching operation fails
/// until re-acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Active,
    Cached,
}

/// Change notification fired by the record collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Added(usize),
    Removed(usize),
    Cleared,
}

pub type CollectionListener = Box<dyn FnMut(CollectionChange)>;

/// Record collection, listener registry and lifecycle state shared by all
/// processor implementations.
pub struct ProcessorCore {
    state: ProcessorState,
    records: Vec<RecordHandle>,
    listeners: Vec<(ListenerId, CollectionListener)>,
    next_listener_id: u64,
}

impl ProcessorCore {
    pub fn new() -> Self {
        Self {
            state: ProcessorState::Active,
            records: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub(crate) fn state(&self) -> ProcessorState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProcessorState) {
        self.state = state;
    }

    pub(crate) fn detach_all_listeners(&mut self) {
        self.listeners.clear();
    }

    fn notify(&mut self, change: CollectionChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change);
        }
    }
}

impl Default for ProcessorCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful object bundling a record collection with format-specific
/// encode/decode logic.
///
/// Implementations provide the codec hooks (`encode_records`,
/// `decode_records`) and their fixed format; all collection and file
/// behavior is shared. Every data-touching operation checks the lifecycle
/// state first and fails with `InvalidState` while the processor is cached.
pub trait FormatProcessor {
    /// The processor's fixed format; never `Format::Unknown`
    fn format(&self) -> Format;

    /// Shared collection and lifecycle state; used by the pool
    fn core(&self) -> &ProcessorCore;

    fn core_mut(&mut self) -> &mut ProcessorCore;

    /// Serializes the current collection into the format's byte layout
    fn encode_records(&self) -> Result<Vec<u8>>;

    /// Parses a complete byte payload into records; total failure semantics,
    /// never a partial result
    fn decode_records(&self, bytes: &[u8]) -> Result<Vec<CarRecord>>;

    /// Current lifecycle state
    fn state(&self) -> ProcessorState {
        self.core().state()
    }

    /// Fails with `InvalidState` unless the processor is active
    fn ensure_active(&self) -> Result<()> {
        match self.core().state() {
            ProcessorState::Active => Ok(()),
            ProcessorState::Cached => Err(ConvertError::InvalidState(format!(
                "{} processor is cached; re-acquire it from the pool before use",
                self.format()
            ))),
        }
    }

    /// Checks whether a format token names this processor's format.
    ///
    /// Allowed while cached; format identity does not touch data.
    fn supports_format(&self, candidate: &str) -> bool {
        self.format().matches_token(candidate)
    }

    fn len(&self) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.core().records.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Bounds-checked indexed access into the collection
    fn record(&self, index: usize) -> Result<RecordHandle> {
        self.ensure_active()?;
        let records = &self.core().records;
        records.get(index).map(Rc::clone).ok_or_else(|| {
            ConvertError::OutOfRange(format!(
                "index {} out of bounds for {} records",
                index,
                records.len()
            ))
        })
    }

    /// The full collection in insertion order
    fn records(&self) -> Result<&[RecordHandle]> {
        self.ensure_active()?;
        Ok(&self.core().records)
    }

    /// Appends a record handle, or a deep clone of it.
    ///
    /// Inserting the same handle twice without cloning fails with
    /// `InvalidState`; equal-but-distinct records are fine.
    fn add_data_item(&mut self, item: &RecordHandle, clone_input: bool) -> Result<()> {
        self.ensure_active()?;
        let already_present = self.core().records.iter().any(|r| Rc::ptr_eq(r, item));
        if already_present && !clone_input {
            return Err(ConvertError::InvalidState(
                "record is already in the collection; use the clone option to insert a copy"
                    .to_string(),
            ));
        }
        let handle = if clone_input {
            item.borrow().clone().into_handle()
        } else {
            Rc::clone(item)
        };
        let core = self.core_mut();
        core.records.push(handle);
        let index = core.records.len() - 1;
        core.notify(CollectionChange::Added(index));
        Ok(())
    }

    /// Builds a validated record and appends it
    fn add_new_data_item(
        &mut self,
        day: u32,
        month: u32,
        year: i32,
        brand_name: &str,
        price: i32,
    ) -> Result<()> {
        self.ensure_active()?;
        let record = CarRecord::with_values(day, month, year, brand_name, price)?;
        let core = self.core_mut();
        core.records.push(record.into_handle());
        let index = core.records.len() - 1;
        core.notify(CollectionChange::Added(index));
        Ok(())
    }

    /// Removes a record by handle identity.
    ///
    /// A record that is not present is a normal negative result, not an
    /// error.
    fn remove_data_item(&mut self, item: &RecordHandle) -> Result<bool> {
        self.ensure_active()?;
        let core = self.core_mut();
        match core.records.iter().position(|r| Rc::ptr_eq(r, item)) {
            Some(index) => {
                core.records.remove(index);
                core.notify(CollectionChange::Removed(index));
                Ok(true)
            }
            None => {
                debug!("cannot remove a record that is not in the collection");
                Ok(false)
            }
        }
    }

    /// Replaces the collection with the given records
    fn set_data(&mut self, items: &[RecordHandle], clone_items: bool) -> Result<()> {
        self.clear_data()?;
        for item in items {
            self.add_data_item(item, clone_items)?;
        }
        Ok(())
    }

    /// Disposes and removes every record
    fn clear_data(&mut self) -> Result<()> {
        self.ensure_active()?;
        let core = self.core_mut();
        for record in &core.records {
            record.borrow_mut().dispose();
        }
        core.records.clear();
        core.notify(CollectionChange::Cleared);
        Ok(())
    }

    /// Complete serialized byte representation of the collection
    fn get_data(&self) -> Result<Vec<u8>> {
        self.ensure_active()?;
        self.encode_records()
    }

    /// Reads and parses a file, replacing the collection on success.
    ///
    /// A missing file is an argument error, not "no data"; a decode failure
    /// propagates and never leaves a partially populated collection.
    fn read_from_file(&mut self, path: &Path) -> Result<()> {
        self.ensure_active()?;
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(ConvertError::InvalidArgument(format!(
                "cannot read from non-existing file '{}'",
                path.display()
            )));
        }
        let bytes = fs::read(path)?;
        let decoded = self.decode_records(&bytes)?;
        debug!(
            path = %path.display(),
            records = decoded.len(),
            format = %self.format(),
            "parsed records from file"
        );
        self.clear_data()?;
        let core = self.core_mut();
        for record in decoded {
            core.records.push(record.into_handle());
            let index = core.records.len() - 1;
            core.notify(CollectionChange::Added(index));
        }
        Ok(())
    }

    /// Saves with replacement enabled and no backup
    fn save_to_file(&self, path: &Path) -> Result<bool> {
        self.save_to_file_opts(path, true, false)
    }

    /// Writes the serialized collection to `path` via a temporary sibling.
    ///
    /// When the target exists and `replace` is false the save cleanly does
    /// not happen and `Ok(false)` is returned, leaving the target untouched.
    /// With `make_backup`, the pre-existing target is copied to a `.bak`
    /// sibling before being replaced. The temporary file is removed on every
    /// path.
    fn save_to_file_opts(&self, path: &Path, replace: bool, make_backup: bool) -> Result<bool> {
        self.ensure_active()?;
        if path.as_os_str().is_empty() {
            return Err(ConvertError::InvalidArgument(
                "cannot save to an empty path".to_string(),
            ));
        }
        let bytes = self.encode_records()?;
        let temp_path = sibling_path(path, TEMP_FILE_SUFFIX);
        if temp_path.exists() {
            fs::remove_file(&temp_path)?;
        }
        if let Err(e) = fs::write(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        if path.exists() && !replace {
            debug!(
                path = %path.display(),
                "replacement disabled for existing target, save skipped"
            );
            fs::remove_file(&temp_path)?;
            return Ok(false);
        }
        if path.exists() {
            if make_backup {
                fs::copy(path, sibling_path(path, BACKUP_FILE_SUFFIX))?;
            }
            fs::remove_file(path)?;
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        debug!(
            path = %path.display(),
            bytes = bytes.len(),
            format = %self.format(),
            "saved records to file"
        );
        Ok(true)
    }

    /// Registers a collection change listener
    fn add_data_changed_listener(&mut self, listener: CollectionListener) -> Result<ListenerId> {
        self.ensure_active()?;
        let core = self.core_mut();
        let id = ListenerId::new(core.next_listener_id);
        core.next_listener_id += 1;
        core.listeners.push((id, listener));
        Ok(id)
    }

    /// Removes a collection change listener; false if the id is unknown
    fn remove_data_changed_listener(&mut self, id: ListenerId) -> Result<bool> {
        self.ensure_active()?;
        let core = self.core_mut();
        let before = core.listeners.len();
        core.listeners.retain(|(lid, _)| *lid != id);
        Ok(core.listeners.len() != before)
    }
}

/// Appends a suffix to a path without touching its extension handling
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}
