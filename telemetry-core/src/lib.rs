// Shared Ascon decryption, envelope handling and reading models.

pub mod aead;
pub mod envelope;
pub mod error;
pub mod model;
pub mod verify;
