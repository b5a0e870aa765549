use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The closed set of labels a classified value can carry.
///
/// The serialized strings are stable; downstream renderers key their colours
/// and legends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyStatus {
    Normal,
    NegativeValue,
    NewItem,
    NotEnoughData,
    HighSpike,
    LowSpike,
    SpikeVsConstant,
    PeerHighOutlier,
    PeerLowOutlier,
}

impl AnomalyStatus {
    pub const ALL: [AnomalyStatus; 9] = [
        AnomalyStatus::Normal,
        AnomalyStatus::NegativeValue,
        AnomalyStatus::NewItem,
        AnomalyStatus::NotEnoughData,
        AnomalyStatus::HighSpike,
        AnomalyStatus::LowSpike,
        AnomalyStatus::SpikeVsConstant,
        AnomalyStatus::PeerHighOutlier,
        AnomalyStatus::PeerLowOutlier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::Normal => "NORMAL",
            AnomalyStatus::NegativeValue => "NEGATIVE_VALUE",
            AnomalyStatus::NewItem => "NEW_ITEM",
            AnomalyStatus::NotEnoughData => "NOT_ENOUGH_DATA",
            AnomalyStatus::HighSpike => "HIGH_SPIKE",
            AnomalyStatus::LowSpike => "LOW_SPIKE",
            AnomalyStatus::SpikeVsConstant => "SPIKE_VS_CONSTANT",
            AnomalyStatus::PeerHighOutlier => "PEER_HIGH_OUTLIER",
            AnomalyStatus::PeerLowOutlier => "PEER_LOW_OUTLIER",
        }
    }

    /// Statuses worth highlighting in a historical crosstab: real spikes and
    /// negative balances. New items and constant-series jumps are left out.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AnomalyStatus::HighSpike | AnomalyStatus::LowSpike | AnomalyStatus::NegativeValue
        )
    }

    pub fn is_peer(&self) -> bool {
        matches!(self, AnomalyStatus::PeerHighOutlier | AnomalyStatus::PeerLowOutlier)
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnomalyStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// Which scan produced a finding. Lets a consumer merge the rolling and peer
/// logs into one sheet and still tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    TimeSeriesRoll,
    PeerGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip_through_serde() {
        let json = serde_json::to_string(&AnomalyStatus::SpikeVsConstant).unwrap();
        assert_eq!(json, "\"SPIKE_VS_CONSTANT\"");
        let back: AnomalyStatus = serde_json::from_str("\"PEER_LOW_OUTLIER\"").unwrap();
        assert_eq!(back, AnomalyStatus::PeerLowOutlier);
    }

    #[test]
    fn display_matches_serialized_form() {
        for status in AnomalyStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.to_string());
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("high_spike".parse::<AnomalyStatus>().unwrap(), AnomalyStatus::HighSpike);
        assert!("Low_Drop".parse::<AnomalyStatus>().is_err());
    }

    #[test]
    fn critical_set_is_spikes_and_negatives() {
        let critical: Vec<_> = AnomalyStatus::ALL.into_iter().filter(|s| s.is_critical()).collect();
        assert_eq!(
            critical,
            vec![AnomalyStatus::NegativeValue, AnomalyStatus::HighSpike, AnomalyStatus::LowSpike]
        );
    }
}
