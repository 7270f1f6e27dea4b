// Ascon authenticated encryption (v1.2 parameter sets).
// Invariants: plaintext is released only after the tag check passes; key material is never
// formatted and is zeroized on drop.

mod permutation;

use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use permutation::{State, STATE_BYTES};

pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AeadError {
    #[error("authentication failed")]
    AuthenticationFailure,
    #[error("invalid key length for {variant}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        variant: Variant,
        expected: usize,
        actual: usize,
    },
    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    #[error("unknown ascon variant: {0}")]
    UnknownVariant(String),
}

/// Ascon parameter set. Round counts and rate must match the sender exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Ascon128,
    Ascon128a,
    Ascon80pq,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Ascon128 => "Ascon-128",
            Variant::Ascon128a => "Ascon-128a",
            Variant::Ascon80pq => "Ascon-80pq",
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            Variant::Ascon80pq => 20,
            Variant::Ascon128 | Variant::Ascon128a => 16,
        }
    }

    /// Rate in bytes.
    pub fn rate(&self) -> usize {
        match self {
            Variant::Ascon128a => 16,
            Variant::Ascon128 | Variant::Ascon80pq => 8,
        }
    }

    pub fn init_rounds(&self) -> usize {
        12
    }

    pub fn block_rounds(&self) -> usize {
        match self {
            Variant::Ascon128a => 8,
            Variant::Ascon128 | Variant::Ascon80pq => 6,
        }
    }

    pub fn tag_len(&self) -> usize {
        TAG_LEN
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = AeadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascon-128" | "ascon128" => Ok(Variant::Ascon128),
            "ascon-128a" | "ascon128a" => Ok(Variant::Ascon128a),
            "ascon-80pq" | "ascon80pq" => Ok(Variant::Ascon80pq),
            _ => Err(AeadError::UnknownVariant(value.to_string())),
        }
    }
}

/// Secret key bound to the variant it was validated for.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    #[zeroize(skip)]
    variant: Variant,
    bytes: Vec<u8>,
}

impl Key {
    pub fn new(variant: Variant, bytes: &[u8]) -> Result<Self, AeadError> {
        if bytes.len() != variant.key_len() {
            return Err(AeadError::InvalidKeyLength {
                variant,
                expected: variant.key_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            variant,
            bytes: bytes.to_vec(),
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("variant", &self.variant)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AeadError> {
        let bytes: [u8; NONCE_LEN] =
            bytes
                .try_into()
                .map_err(|_| AeadError::InvalidNonceLength {
                    expected: NONCE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// Encrypts `plaintext` and returns the ciphertext with the tag appended.
pub fn encrypt(key: &Key, nonce: &Nonce, associated_data: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let variant = key.variant();
    let rate = variant.rate();
    let mut state = initialize(key, nonce);
    absorb_associated_data(&mut state, variant, associated_data);

    let mut out = Vec::with_capacity(plaintext.len() + TAG_LEN);
    let mut blocks = plaintext.chunks_exact(rate);
    for block in &mut blocks {
        state.xor_bytes(0, block);
        push_rate(&state, &mut out, block.len());
        state.permute(variant.block_rounds());
    }
    let last = blocks.remainder();
    state.xor_bytes(0, last);
    push_rate(&state, &mut out, last.len());
    state.xor_bytes(last.len(), &[0x80]);

    let tag = finalize(&mut state, key);
    out.extend_from_slice(&tag);
    out
}

/// Decrypts `ciphertext_with_tag`, returning the plaintext only if the tag verifies.
///
/// Inputs shorter than the tag and any tag mismatch both yield
/// [`AeadError::AuthenticationFailure`]; no other error is produced.
pub fn decrypt(
    key: &Key,
    nonce: &Nonce,
    associated_data: &[u8],
    ciphertext_with_tag: &[u8],
) -> Result<Vec<u8>, AeadError> {
    let variant = key.variant();
    let Some(split) = ciphertext_with_tag.len().checked_sub(TAG_LEN) else {
        return Err(AeadError::AuthenticationFailure);
    };
    let (ciphertext, received_tag) = ciphertext_with_tag.split_at(split);
    let rate = variant.rate();

    let mut state = initialize(key, nonce);
    absorb_associated_data(&mut state, variant, associated_data);

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut blocks = ciphertext.chunks_exact(rate);
    for block in &mut blocks {
        recover_block(&mut state, block, &mut plaintext);
        state.permute(variant.block_rounds());
    }
    let last = blocks.remainder();
    recover_block(&mut state, last, &mut plaintext);
    state.xor_bytes(last.len(), &[0x80]);

    let mut tag = finalize(&mut state, key);
    let verified: bool = tag[..].ct_eq(received_tag).into();
    tag.zeroize();
    if !verified {
        plaintext.zeroize();
        return Err(AeadError::AuthenticationFailure);
    }
    Ok(plaintext)
}

fn initialize(key: &Key, nonce: &Nonce) -> State {
    let variant = key.variant();
    let key = key.as_bytes();

    let mut seed = [0u8; STATE_BYTES];
    seed[0] = (key.len() * 8) as u8;
    seed[1] = (variant.rate() * 8) as u8;
    seed[2] = variant.init_rounds() as u8;
    seed[3] = variant.block_rounds() as u8;
    let key_start = STATE_BYTES - NONCE_LEN - key.len();
    seed[key_start..STATE_BYTES - NONCE_LEN].copy_from_slice(key);
    seed[STATE_BYTES - NONCE_LEN..].copy_from_slice(nonce.as_bytes());

    let mut state = State::from_bytes(&seed);
    seed.zeroize();
    state.permute(variant.init_rounds());
    state.xor_bytes(STATE_BYTES - key.len(), key);
    state
}

fn absorb_associated_data(state: &mut State, variant: Variant, associated_data: &[u8]) {
    if !associated_data.is_empty() {
        let mut blocks = associated_data.chunks_exact(variant.rate());
        for block in &mut blocks {
            state.xor_bytes(0, block);
            state.permute(variant.block_rounds());
        }
        let last = blocks.remainder();
        state.xor_bytes(0, last);
        state.xor_bytes(last.len(), &[0x80]);
        state.permute(variant.block_rounds());
    }
    // domain separation between associated data and message
    state.xor_bytes(STATE_BYTES - 1, &[0x01]);
}

fn recover_block(state: &mut State, block: &[u8], plaintext: &mut Vec<u8>) {
    for (pos, &cipher_byte) in block.iter().enumerate() {
        plaintext.push(state.byte(pos) ^ cipher_byte);
        state.set_byte(pos, cipher_byte);
    }
}

fn push_rate(state: &State, out: &mut Vec<u8>, len: usize) {
    let start = out.len();
    out.resize(start + len, 0);
    state.copy_bytes(0, &mut out[start..]);
}

fn finalize(state: &mut State, key: &Key) -> [u8; TAG_LEN] {
    let variant = key.variant();
    let key = key.as_bytes();
    state.xor_bytes(variant.rate(), key);
    state.permute(variant.init_rounds());
    state.xor_bytes(STATE_BYTES - TAG_LEN, &key[key.len() - TAG_LEN..]);

    let mut tag = [0u8; TAG_LEN];
    state.copy_bytes(STATE_BYTES - TAG_LEN, &mut tag);
    tag
}
