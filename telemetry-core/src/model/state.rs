// Latest accepted reading together with the accepted-message counter.

use serde::{Deserialize, Serialize};

use super::DecryptedReading;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedState {
    pub message_count: u64,
    pub reading: Option<DecryptedReading>,
}

impl CountedState {
    pub fn value(&self) -> Option<u64> {
        self.reading.as_ref().map(|reading| reading.value)
    }
}
