// SPDX-License-Identifier: MIT
//! Per-format pooling of disposed processor instances

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::binary::BinaryProcessor;
use crate::error::{ConvertError, Result};
use crate::format::Format;
use crate::processor::{FormatProcessor, ProcessorState};
use crate::xml::XmlProcessor;

/// Shared handle to a pooled processor.
///
/// `Rc<RefCell<..>>` keeps the crate single-threaded by construction; the
/// handle is `!Send`, so the pool never needs synchronization.
pub type ProcessorHandle = Rc<RefCell<Box<dyn FormatProcessor>>>;

pub(crate) type ProcessorCtor = fn() -> Box<dyn FormatProcessor>;

fn new_binary_processor() -> Box<dyn FormatProcessor> {
    Box::new(BinaryProcessor::new())
}

fn new_xml_processor() -> Box<dyn FormatProcessor> {
    Box::new(XmlProcessor::new())
}

/// Compile-time table of every registered processor constructor
pub(crate) const PROCESSOR_REGISTRY: &[(Format, ProcessorCtor)] = &[
    (Format::Binary, new_binary_processor as ProcessorCtor),
    (Format::Xml, new_xml_processor as ProcessorCtor),
];

/// Registry of cached (released) processor instances awaiting reuse, keyed
/// by format.
///
/// An explicit owned value rather than process-global state: each converter
/// (or test) owns its own pool.
pub struct ProcessorPool {
    cache: HashMap<Format, VecDeque<ProcessorHandle>>,
}

impl ProcessorPool {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Returns an active processor for `format`: the front of the format's
    /// cache queue (FIFO) when one exists, a freshly constructed instance
    /// otherwise. `Unknown` and unregistered formats fail with
    /// `InvalidArgument`.
    pub fn acquire(&mut self, format: Format) -> Result<ProcessorHandle> {
        if let Some(handle) = self.cache.get_mut(&format).and_then(VecDeque::pop_front) {
            handle
                .borrow_mut()
                .core_mut()
                .set_state(ProcessorState::Active);
            debug!(%format, "reusing cached processor");
            return Ok(handle);
        }
        let constructor = PROCESSOR_REGISTRY
            .iter()
            .find(|(registered, _)| *registered == format)
            .map(|(_, constructor)| *constructor)
            .ok_or_else(|| {
                ConvertError::InvalidArgument(format!("format {} is not supported", format))
            })?;
        debug!(%format, "constructing new processor");
        Ok(Rc::new(RefCell::new(constructor())))
    }

    /// Returns a processor to the pool: detaches its listeners, clears and
    /// disposes its records, flips it to `Cached` and enqueues it under its
    /// format. Releasing an already-cached processor fails with
    /// `InvalidState`.
    pub fn release(&mut self, processor: &ProcessorHandle) -> Result<()> {
        let format = {
            let mut guard = processor.borrow_mut();
            if guard.state() == ProcessorState::Cached {
                return Err(ConvertError::InvalidState(
                    "processor is already cached".to_string(),
                ));
            }
            guard.core_mut().detach_all_listeners();
            guard.clear_data()?;
            guard.core_mut().set_state(ProcessorState::Cached);
            guard.format()
        };
        self.cache
            .entry(format)
            .or_default()
            .push_back(Rc::clone(processor));
        debug!(%format, "processor returned to pool");
        Ok(())
    }

    /// Discards every cached instance immediately; active instances are
    /// unaffected. Primarily for test isolation.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached instances for `format`
    pub fn cached_count(&self, format: Format) -> usize {
        self.cache.get(&format).map_or(0, VecDeque::len)
    }
}

impl Default for ProcessorPool {
    fn default() -> Self {
        Self::new()
    }
}
