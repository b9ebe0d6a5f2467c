//! Row builders for streaming data.
//!
//! Converts frequency spectrum snapshots (or any flat row of values) into
//! data items, and keeps a scrolling history of recent rows in a proxy:
//! the newest row sits at `z = 0` and older rows move back one unit per push.

use glam::Vec3;
use tracing::trace;

use crate::error::{Error, Result};
use crate::item::{DataArray, DataItem};
use crate::proxy::ScatterDataProxy;

/// One frequency component of a spectrum snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectrumElement {
    /// Frequency in Hz.
    pub frequency: f32,
    /// Amplitude, typically normalized to `[0, 1]`.
    pub amplitude: f32,
}

impl SpectrumElement {
    /// Create a spectrum element.
    #[must_use]
    pub const fn new(frequency: f32, amplitude: f32) -> Self {
        Self { frequency, amplitude }
    }
}

/// Bins spectrum elements into equal-width frequency bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBuilder {
    low_freq: f32,
    high_freq: f32,
    bands: usize,
}

impl SpectrumBuilder {
    /// Create a builder covering `[low_freq, high_freq)` with `bands` bands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] if the range is empty or `bands` is zero.
    pub fn new(low_freq: f32, high_freq: f32, bands: usize) -> Result<Self> {
        // NaN bounds never form a range.
        if low_freq.is_nan() || high_freq.is_nan() || high_freq <= low_freq {
            return Err(Error::ConfigInvalid {
                key: "spectrum.high_freq".to_string(),
                message: format!("must exceed low_freq ({low_freq})"),
            });
        }
        if bands == 0 {
            return Err(Error::ConfigInvalid {
                key: "spectrum.bands".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(Self {
            low_freq,
            high_freq,
            bands,
        })
    }

    /// Number of bands.
    #[must_use]
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Width of one band in Hz.
    #[must_use]
    pub fn band_width(&self) -> f32 {
        (self.high_freq - self.low_freq) / self.bands as f32
    }

    /// Band a frequency falls into, or `None` outside the covered range.
    #[must_use]
    pub fn band_index(&self, frequency: f32) -> Option<usize> {
        if frequency < self.low_freq || frequency >= self.high_freq {
            return None;
        }
        let index = ((frequency - self.low_freq) / self.band_width()) as usize;
        Some(index.min(self.bands - 1))
    }

    /// Per-band level: the maximum amplitude seen in each band, zero for
    /// bands with no elements.
    #[must_use]
    pub fn levels(&self, spectrum: &[SpectrumElement]) -> Vec<f32> {
        let mut levels = vec![0.0f32; self.bands];
        for element in spectrum {
            if let Some(band) = self.band_index(element.frequency) {
                levels[band] = levels[band].max(element.amplitude);
            }
        }
        levels
    }

    /// One item per band at `(band, level, row)`.
    #[must_use]
    pub fn row_items(&self, levels: &[f32], row: f32) -> DataArray {
        row_from_values(levels, row)
    }
}

/// Convert a flat row of values into items at `(column, value, row)`.
/// The value is also stored as the item's auxiliary value.
#[must_use]
pub fn row_from_values(values: &[f32], row: f32) -> DataArray {
    values
        .iter()
        .enumerate()
        .map(|(column, &value)| DataItem::from_xyz(column as f32, value, row).with_value(value))
        .collect()
}

/// Scrolling window of the most recent spectrum rows.
#[derive(Debug)]
pub struct SpectrumHistory {
    builder: SpectrumBuilder,
    history_rows: usize,
    proxy: ScatterDataProxy,
}

impl SpectrumHistory {
    /// Create an empty history keeping at most `history_rows` rows.
    #[must_use]
    pub fn new(builder: SpectrumBuilder, history_rows: usize) -> Self {
        Self {
            builder,
            history_rows: history_rows.max(1),
            proxy: ScatterDataProxy::new(),
        }
    }

    /// Add a snapshot as the newest row, dropping the oldest row when full.
    ///
    /// # Errors
    ///
    /// Propagates proxy range errors; none occur while the proxy is only
    /// modified through this history.
    pub fn push(&mut self, spectrum: &[SpectrumElement]) -> Result<()> {
        let bands = self.builder.bands();
        let row = self.builder.row_items(&self.builder.levels(spectrum), 0.0);

        self.proxy.insert_items(0, &row)?;
        let keep = self.history_rows * bands;
        if self.proxy.item_count() > keep {
            self.proxy.remove_items(keep, usize::MAX)?;
        }

        let shifted: DataArray = self.proxy.array()[bands..]
            .iter()
            .map(|item| item.with_position(item.position() + Vec3::Z))
            .collect();
        self.proxy.set_items(bands, &shifted)?;
        trace!(rows = self.rows(), "spectrum row pushed");
        Ok(())
    }

    /// Number of rows currently held.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.proxy.item_count() / self.builder.bands()
    }

    /// Maximum number of rows held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.history_rows
    }

    /// The proxy holding the history items.
    #[must_use]
    pub fn proxy(&self) -> &ScatterDataProxy {
        &self.proxy
    }
}
