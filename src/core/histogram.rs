use std::io::{self, Write};

/// Number of distinct 8-bit intensity levels.
pub const INTENSITY_LEVELS: usize = 256;

/**
 * Occurrence count for each 8-bit intensity level. A local histogram covers one
 * worker's partition; the global histogram is the elementwise sum of all of them.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityHistogram {
    bin_counts: [u64; INTENSITY_LEVELS],
}

impl Default for IntensityHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl IntensityHistogram {
    /// Constructor, all bins zero.
    pub fn new() -> Self {
        IntensityHistogram {
            bin_counts: [0; INTENSITY_LEVELS],
        }
    }

    /// Count every pixel of a partition. Does not touch the pixels.
    pub fn from_pixels(pixels: &[u8]) -> Self {
        let mut histogram = Self::new();
        for &pixel in pixels {
            histogram.insert(pixel);
        }
        histogram
    }

    pub fn insert(&mut self, intensity: u8) {
        self.bin_counts[intensity as usize] += 1;
    }

    /// Elementwise sum: add every bin of `other` into `self`.
    pub fn accumulate(&mut self, other: &IntensityHistogram) {
        for (count, other_count) in self.bin_counts.iter_mut().zip(other.bin_counts.iter()) {
            *count += other_count;
        }
    }

    /// @return: the total number of pixels that have been inserted
    /// into the histogram. This is the sum of the count in all bins.
    pub fn total_count(&self) -> u64 {
        self.bin_counts.iter().sum()
    }

    pub fn bin_count(&self, intensity: u8) -> u64 {
        self.bin_counts[intensity as usize]
    }

    pub fn bin_counts(&self) -> &[u64; INTENSITY_LEVELS] {
        &self.bin_counts
    }

    /**
     * @return: fraction of the population at or below `intensity`, on [0,1].
     *
     * Note: an empty histogram reports zero everywhere.
     */
    pub fn percentile(&self, intensity: u8) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let accumulated: u64 = self.bin_counts[..=(intensity as usize)].iter().sum();
        (accumulated as f64) / (total as f64)
    }

    /// Print the non-empty bins to the writer
    pub fn display<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "Histogram:")?;
        let total = self.total_count();
        let percent_scale = if total == 0 {
            0.0
        } else {
            100.0 / (total as f64)
        };
        writeln!(writer, "  total count: {}", total)?;
        for (intensity, &count) in self.bin_counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            writeln!(
                writer,
                "  bins[{}] --> {}  ({:.2}%)",
                intensity,
                count,
                (count as f64) * percent_scale
            )?;
        }
        writeln!(writer)?;
        Ok(())
    }
}
