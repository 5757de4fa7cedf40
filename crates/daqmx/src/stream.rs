//! Shared plumbing for stream readers and writers.

use ndarray::Array2;

use crate::constants::FillMode;
use crate::driver::{Driver, TaskHandle};
use crate::error::{error_codes, DaqError, ErrorKind, Result};
use crate::task::Task;

pub(crate) const FILL: FillMode = FillMode::GroupByChannel;

/// Task reference plus the shape-verification toggle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamBase<'a> {
    pub(crate) task: &'a Task,
    pub(crate) verify_array_shape: bool,
}

impl<'a> StreamBase<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self {
            task,
            verify_array_shape: true,
        }
    }

    /// Channels a read addresses.
    pub(crate) fn read_channels(&self) -> Result<usize> {
        self.task.handle()?;
        let n = self.task.read_channels()?.len();
        if n == 0 {
            return Err(self.task.annotate(DaqError::read(
                error_codes::NO_CHANS_IN_TASK,
                "The task contains no channels to read.",
                0,
            )));
        }
        Ok(n)
    }

    /// Channels a write addresses.
    pub(crate) fn write_channels(&self) -> Result<usize> {
        self.task.handle()?;
        let n = self.task.write_channels().len();
        if n == 0 {
            return Err(self.task.annotate(DaqError::write(
                error_codes::NO_CHANS_IN_TASK,
                "The task contains no channels to write.",
                0,
            )));
        }
        Ok(n)
    }

    /// Fail when verification is on and `provided` differs from `required`.
    pub(crate) fn verify(&self, verb: &str, provided: &[usize], required: &[usize]) -> Result<()> {
        if !self.verify_array_shape || provided == required {
            return Ok(());
        }
        Err(self.task.annotate(DaqError::invalid_argument(
            error_codes::UNKNOWN,
            format!(
                "{verb} cannot be performed because the array passed into this function is not shaped correctly. \
                 You must pass in an array of the correct shape based on the number of channels in task and the \
                 number of samples per channel.\n\nShape of array provided: {provided:?}\nShape of array required: {required:?}"
            ),
        )))
    }

    /// Run a read transfer, classifying failures as read errors.
    pub(crate) fn read<T>(&self, call: impl FnOnce(&dyn Driver, TaskHandle) -> Result<T>) -> Result<T> {
        self.task
            .with_handle(call)
            .map_err(|e| self.task.annotate(e.into_kind(ErrorKind::Read)))
    }

    /// Run a write transfer, classifying failures as write errors.
    pub(crate) fn write<T>(&self, call: impl FnOnce(&dyn Driver, TaskHandle) -> Result<T>) -> Result<T> {
        self.task
            .with_handle(call)
            .map_err(|e| self.task.annotate(e.into_kind(ErrorKind::Write)))
    }
}

fn not_contiguous() -> DaqError {
    DaqError::invalid_argument(
        error_codes::UNKNOWN,
        "The array must be contiguous in standard (row-major) layout.",
    )
}

/// The array's elements in channel-major order.
pub(crate) fn rows<T>(data: &Array2<T>) -> Result<&[T]> {
    data.as_slice().ok_or_else(not_contiguous)
}

pub(crate) fn rows_mut<T>(data: &mut Array2<T>) -> Result<&mut [T]> {
    data.as_slice_mut().ok_or_else(not_contiguous)
}

pub(crate) fn samples_of(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        DaqError::invalid_argument(error_codes::NUM_SAMPS_WRONG, "Too many samples for one transfer.")
    })
}

/// Accessors for the verification toggle of a reader or writer.
macro_rules! stream_common {
    ($ty:ident) => {
        impl<'a> $ty<'a> {
            /// Bind to `task`. Array shapes are verified by default.
            pub fn new(task: &'a $crate::task::Task) -> Self {
                Self {
                    base: $crate::stream::StreamBase::new(task),
                }
            }

            /// Whether array shapes are checked before each transfer.
            pub fn verify_array_shape(&self) -> bool {
                self.base.verify_array_shape
            }

            /// Turn shape checks off to save a little time per call.
            pub fn set_verify_array_shape(&mut self, verify: bool) {
                self.base.verify_array_shape = verify;
            }
        }
    };
}

pub(crate) use stream_common;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_requires_standard_layout() {
        let data = Array2::<f64>::zeros((2, 3));
        assert_eq!(rows(&data).unwrap().len(), 6);
        let mut view = Array2::<f64>::zeros((3, 2));
        view.swap_axes(0, 1);
        assert!(rows(&view).is_err());
    }
}
