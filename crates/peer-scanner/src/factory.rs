use configuration::{DetectorKind, PeerSettings};

use crate::detector::{OutlierDetector, TukeyFenceDetector};
use crate::error::PeerError;
use crate::forest::IsolationForest;

/// Creates the outlier detector selected by the `[peer]` configuration.
pub fn create_detector(settings: &PeerSettings) -> Result<Box<dyn OutlierDetector>, PeerError> {
    match settings.detector {
        DetectorKind::IsolationForest => Ok(Box::new(IsolationForest::new(
            settings.trees,
            settings.max_samples,
            settings.contamination,
            settings.seed,
        )?)),
        DetectorKind::Tukey => Ok(Box::new(TukeyFenceDetector::new(settings.tukey_k)?)),
    }
}
