use std::io::{self, Write};

use crate::core::histogram::{IntensityHistogram, INTENSITY_LEVELS};
use crate::equalization::error::EqualizeError;

/// Largest representable intensity, as used for scaling the cumulative sum.
const MAX_INTENSITY: f64 = 255.0;

/**
 * Lookup table from an input intensity to its remapped intensity. Entries are
 * `u8`, so they always lie on [0, 255].
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityMapping {
    table_entries: [u8; INTENSITY_LEVELS],
}

impl IntensityMapping {
    pub fn identity() -> Self {
        let mut table_entries = [0u8; INTENSITY_LEVELS];
        for (intensity, entry) in table_entries.iter_mut().enumerate() {
            *entry = intensity as u8;
        }
        IntensityMapping { table_entries }
    }

    /**
     * Histogram-equalizing table: `mapping[i] = floor(c_i / T * 255)`, where `c_i` is
     * the cumulative count through bin `i` and `T` is the total count. The scaling is
     * done in floating point and then truncated toward zero.
     *
     * Fails on an empty histogram, where `T == 0`.
     */
    pub fn equalizing(histogram: &IntensityHistogram) -> Result<Self, EqualizeError> {
        let total = histogram.total_count();
        if total == 0 {
            return Err(EqualizeError::EmptyImage);
        }
        let mut table_entries = [0u8; INTENSITY_LEVELS];
        let mut cumulative_sum: u64 = 0;
        for (entry, &count) in table_entries.iter_mut().zip(histogram.bin_counts().iter()) {
            cumulative_sum += count;
            let scaled = (cumulative_sum as f64) / (total as f64) * MAX_INTENSITY;
            // cumulative_sum <= total, so this never exceeds 255
            *entry = scaled as u8;
        }
        Ok(IntensityMapping { table_entries })
    }

    pub fn map(&self, intensity: u8) -> u8 {
        self.table_entries[intensity as usize]
    }

    /// Replace every pixel in place with its mapped value.
    pub fn apply(&self, pixels: &mut [u8]) {
        for pixel in pixels.iter_mut() {
            *pixel = self.table_entries[*pixel as usize];
        }
    }

    pub fn table_entries(&self) -> &[u8; INTENSITY_LEVELS] {
        &self.table_entries
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Print every entry that changes its input to the writer
    pub fn display<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "Intensity mapping:")?;
        if self.is_identity() {
            writeln!(writer, "  identity")?;
        }
        for (intensity, &mapped) in self.table_entries.iter().enumerate() {
            if intensity as u8 != mapped {
                writeln!(writer, "  {}  -->  {}", intensity, mapped)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }
}
