use crate::core::histogram::IntensityHistogram;
use crate::core::image_utils::PixelBuffer;
use crate::core::lookup_table::IntensityMapping;

use super::collective::{run_worker_pipeline, Collective, WorkerContext};
use super::error::{CollectiveError, EqualizeError};
use super::{EqualizationReport, Strategy};

/// Group of one: every collective is a no-op hand-back.
pub struct SoloCollective {
    context: WorkerContext,
}

impl Default for SoloCollective {
    fn default() -> Self {
        SoloCollective {
            context: WorkerContext::new(0, 1),
        }
    }
}

impl Collective for SoloCollective {
    fn context(&self) -> WorkerContext {
        self.context
    }

    fn reduce_histograms(
        &mut self,
        local: IntensityHistogram,
    ) -> Result<Option<IntensityHistogram>, CollectiveError> {
        Ok(Some(local))
    }

    fn broadcast_mapping(
        &mut self,
        mapping: Option<IntensityMapping>,
    ) -> Result<IntensityMapping, CollectiveError> {
        mapping.ok_or(CollectiveError::MappingUnavailable)
    }

    fn gather_partition(&mut self, _remapped: &[u8]) -> Result<(), CollectiveError> {
        Ok(())
    }
}

/// Equalize the whole buffer on the calling thread.
pub fn equalize_sequential(buffer: &mut PixelBuffer) -> Result<EqualizationReport, EqualizeError> {
    if buffer.is_empty() {
        return Err(EqualizeError::EmptyImage);
    }
    let outcome = run_worker_pipeline(&mut SoloCollective::default(), &mut buffer.pixels)?;
    EqualizationReport::from_coordinator(Strategy::Sequential, 1, buffer.pixel_count(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_four_levels() {
        let mut buffer = PixelBuffer::new(4, 1, vec![0, 85, 170, 255]);
        let report = equalize_sequential(&mut buffer).unwrap();

        assert_eq!(buffer.pixels, vec![63, 127, 191, 255]);
        assert_eq!(report.processed_pixels, 4);
        assert_eq!(report.untouched_pixels, 0);
        assert_eq!(report.global_histogram.total_count(), 4);
    }

    #[test]
    fn test_sequential_empty_buffer() {
        let mut buffer = PixelBuffer::new(0, 0, Vec::new());
        assert!(matches!(
            equalize_sequential(&mut buffer),
            Err(EqualizeError::EmptyImage)
        ));
    }
}
