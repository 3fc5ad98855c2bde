// SPDX-License-Identifier: MIT
//! Format discovery and read→convert→write pipelines

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use crate::format::{self, Format};
use crate::pool::{ProcessorHandle, ProcessorPool, PROCESSOR_REGISTRY};
use crate::processor::FormatProcessor;

/// Drives conversions between the registered formats.
///
/// Holds one template processor per registry entry — templates exist only to
/// answer `supports_format` during extension lookups — plus the pool that
/// actual working instances are acquired from and released to.
pub struct FormatConverter {
    pool: ProcessorPool,
    templates: Vec<Box<dyn FormatProcessor>>,
}

impl FormatConverter {
    pub fn new() -> Self {
        Self::with_pool(ProcessorPool::new())
    }

    /// Builds a converter around an existing pool
    pub fn with_pool(pool: ProcessorPool) -> Self {
        let templates = PROCESSOR_REGISTRY
            .iter()
            .map(|(_, constructor)| constructor())
            .collect();
        Self { pool, templates }
    }

    pub fn pool(&self) -> &ProcessorPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ProcessorPool {
        &mut self.pool
    }

    /// Acquires a working processor for `format` from the pool.
    ///
    /// `Unknown` and unregistered formats fail with `InvalidArgument`.
    pub fn create_format_processor(&mut self, format: Format) -> Result<ProcessorHandle> {
        if !self.templates.iter().any(|t| t.format() == format) {
            return Err(ConvertError::InvalidArgument(format!(
                "format {} is not supported",
                format
            )));
        }
        self.pool.acquire(format)
    }

    /// Converts the records of an already-populated processor into
    /// `output_format` at `output_path`.
    ///
    /// The output processor is acquired, filled with deep copies of the
    /// input's records, saved and released on every path. Returns whether
    /// the save happened.
    pub fn convert_processor(
        &mut self,
        input: &ProcessorHandle,
        output_path: &Path,
        output_format: Format,
    ) -> Result<bool> {
        if output_path.as_os_str().is_empty() {
            return Err(ConvertError::InvalidArgument(
                "cannot save converted data at an empty path".to_string(),
            ));
        }
        let output = self.create_format_processor(output_format)?;
        let result = copy_and_save(input, &output, output_path);
        let released = self.pool.release(&output);
        result.and_then(|saved| released.map(|()| saved))
    }

    /// Converts a file, inferring the input format from its extension.
    ///
    /// An unrecognized extension is a normal negative result (`Ok(false)`),
    /// not an error.
    pub fn convert(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        output_format: Format,
    ) -> Result<bool> {
        match self.try_get_supported_format_from_path(input_path)? {
            Some(input_format) => {
                self.convert_with_format(input_path, input_format, output_path, output_format)
            }
            None => {
                warn!(
                    path = %input_path.display(),
                    "no registered format matches the input file extension"
                );
                Ok(false)
            }
        }
    }

    /// Converts a file with an explicitly specified input format
    pub fn convert_with_format(
        &mut self,
        input_path: &Path,
        input_format: Format,
        output_path: &Path,
        output_format: Format,
    ) -> Result<bool> {
        let input = self.create_format_processor(input_format)?;
        // drop the RefMut before convert_processor borrows the input again
        let read_result = {
            let mut guard = input.borrow_mut();
            guard.read_from_file(input_path)
        };
        let result = read_result
            .and_then(|()| self.convert_processor(&input, output_path, output_format));
        let released = self.pool.release(&input);
        let outcome = result.and_then(|saved| released.map(|()| saved));
        if let Ok(saved) = &outcome {
            debug!(
                input = %input_path.display(),
                output = %output_path.display(),
                %input_format,
                %output_format,
                saved = *saved,
                "conversion finished"
            );
        }
        outcome
    }

    /// Determines a registered format from a file path's extension.
    ///
    /// The path must name an existing file; an extension no registered
    /// format claims is a normal negative result (`Ok(None)`).
    pub fn try_get_supported_format_from_path(&self, path: &Path) -> Result<Option<Format>> {
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(ConvertError::InvalidArgument(format!(
                "extension cannot be determined for non-existing file '{}'",
                path.display()
            )));
        }
        let path_str = path.to_string_lossy();
        let Some(extension) = format::path_extension(&path_str) else {
            return Ok(None);
        };
        Ok(self
            .templates
            .iter()
            .find(|template| template.supports_format(extension))
            .map(|template| template.format()))
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-copies the input's records into the output processor and saves
fn copy_and_save(
    input: &ProcessorHandle,
    output: &ProcessorHandle,
    output_path: &Path,
) -> Result<bool> {
    let records = {
        let guard = input.borrow();
        guard.records()?.to_vec()
    };
    let mut output = output.borrow_mut();
    output.set_data(&records, true)?;
    output.save_to_file(output_path)
}
