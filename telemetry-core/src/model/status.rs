// Moisture status bands used by dashboards.

use serde::{Deserialize, Serialize};

use crate::envelope::DEFAULT_SENSOR;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoistureStatus {
    Critical,
    Dry,
    Optimal,
    Wet,
}

impl MoistureStatus {
    pub fn classify(percent: u64) -> Self {
        match percent {
            0..=19 => MoistureStatus::Critical,
            20..=39 => MoistureStatus::Dry,
            40..=69 => MoistureStatus::Optimal,
            _ => MoistureStatus::Wet,
        }
    }

    /// Only soil moisture readings are banded; other sensor kinds carry no status.
    pub fn for_sensor(sensor: &str, value: u64) -> Option<Self> {
        (sensor == DEFAULT_SENSOR).then(|| Self::classify(value))
    }
}
