// Envelope verification: authenticated decryption followed by reading decode.
// Invariants: plaintext never leaves this module except as a decoded value of an authenticated message.

use zeroize::Zeroize;

use crate::aead::{self, Key, Nonce};
use crate::envelope::{self, CipherEnvelope};
use crate::error::IngestError;
use crate::model::{DecryptedReading, ReadingWidth};

/// Cipher parameters shared by every message of a deployment; the nonce is static.
#[derive(Clone, Debug)]
pub struct SensorCipher {
    key: Key,
    nonce: Nonce,
    associated_data: Vec<u8>,
    width: ReadingWidth,
}

impl SensorCipher {
    pub fn new(key: Key, nonce: Nonce, associated_data: Vec<u8>, width: ReadingWidth) -> Self {
        Self {
            key,
            nonce,
            associated_data,
            width,
        }
    }

    /// Authenticates and decodes the numeric value carried by `envelope`.
    pub fn open_value(&self, envelope: &CipherEnvelope) -> Result<u64, IngestError> {
        // decrypt only fails on a short input or tag mismatch
        let mut plaintext = aead::decrypt(
            &self.key,
            &self.nonce,
            &self.associated_data,
            &envelope.ciphertext,
        )
        .map_err(|_| IngestError::AuthenticationFailure)?;
        let value = self.width.decode(&plaintext);
        plaintext.zeroize();
        value
    }

    pub fn open(
        &self,
        envelope: CipherEnvelope,
        received_at_ms: u64,
    ) -> Result<DecryptedReading, IngestError> {
        let value = self.open_value(&envelope)?;
        Ok(DecryptedReading::new(
            value,
            envelope.sensor,
            envelope.unit,
            envelope.encrypted_hex,
            received_at_ms,
        ))
    }

    pub fn seal_value(&self, value: u64) -> Result<Vec<u8>, IngestError> {
        let mut plaintext = self.width.encode(value)?;
        let sealed = aead::encrypt(&self.key, &self.nonce, &self.associated_data, &plaintext);
        plaintext.zeroize();
        Ok(sealed)
    }

    /// Produces the JSON envelope a field device would publish for `value`.
    pub fn seal_envelope(&self, value: u64, sensor: &str, unit: &str) -> Result<String, IngestError> {
        let sealed = self.seal_value(value)?;
        envelope::encode(&sealed, sensor, unit)
    }
}
