// Ascon permutation over the 320-bit sponge state.
// Invariants: words are loaded big-endian; reduced-round calls run the tail of the 12-round schedule.

use zeroize::{Zeroize, ZeroizeOnDrop};

pub const STATE_BYTES: usize = 40;
pub const MAX_ROUNDS: usize = 12;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct State {
    words: [u64; 5],
}

impl State {
    pub fn from_bytes(bytes: &[u8; STATE_BYTES]) -> Self {
        let mut words = [0u64; 5];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            *word = load_word(chunk);
        }
        Self { words }
    }

    pub fn permute(&mut self, rounds: usize) {
        debug_assert!(rounds <= MAX_ROUNDS);
        for round in (MAX_ROUNDS - rounds)..MAX_ROUNDS {
            self.round(round_constant(round));
        }
    }

    /// XORs `bytes` into the state starting at byte offset `offset`.
    pub fn xor_bytes(&mut self, offset: usize, bytes: &[u8]) {
        for (index, &byte) in bytes.iter().enumerate() {
            let pos = offset + index;
            self.words[pos / 8] ^= u64::from(byte) << byte_shift(pos);
        }
    }

    pub fn byte(&self, pos: usize) -> u8 {
        (self.words[pos / 8] >> byte_shift(pos)) as u8
    }

    /// Overwrites a single state byte, used when ciphertext replaces the rate.
    pub fn set_byte(&mut self, pos: usize, value: u8) {
        let shift = byte_shift(pos);
        let word = &mut self.words[pos / 8];
        *word = (*word & !(0xFFu64 << shift)) | (u64::from(value) << shift);
    }

    pub fn copy_bytes(&self, offset: usize, out: &mut [u8]) {
        for (index, slot) in out.iter_mut().enumerate() {
            *slot = self.byte(offset + index);
        }
    }

    fn round(&mut self, constant: u64) {
        let s = &mut self.words;

        s[2] ^= constant;

        // substitution layer
        s[0] ^= s[4];
        s[4] ^= s[3];
        s[2] ^= s[1];
        let t = [
            !s[0] & s[1],
            !s[1] & s[2],
            !s[2] & s[3],
            !s[3] & s[4],
            !s[4] & s[0],
        ];
        for i in 0..5 {
            s[i] ^= t[(i + 1) % 5];
        }
        s[1] ^= s[0];
        s[0] ^= s[4];
        s[3] ^= s[2];
        s[2] = !s[2];

        // linear diffusion layer
        s[0] ^= s[0].rotate_right(19) ^ s[0].rotate_right(28);
        s[1] ^= s[1].rotate_right(61) ^ s[1].rotate_right(39);
        s[2] ^= s[2].rotate_right(1) ^ s[2].rotate_right(6);
        s[3] ^= s[3].rotate_right(10) ^ s[3].rotate_right(17);
        s[4] ^= s[4].rotate_right(7) ^ s[4].rotate_right(41);
    }
}

fn round_constant(round: usize) -> u64 {
    let round = round as u64;
    0xF0 - round * 0x10 + round
}

fn byte_shift(pos: usize) -> u32 {
    (56 - 8 * (pos % 8)) as u32
}

fn load_word(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_state() -> State {
        let mut bytes = [0u8; STATE_BYTES];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = index as u8;
        }
        State::from_bytes(&bytes)
    }

    #[test]
    fn round_constants_follow_schedule() {
        assert_eq!(round_constant(0), 0xF0);
        assert_eq!(round_constant(6), 0x96);
        assert_eq!(round_constant(11), 0x4B);
    }

    #[test]
    fn bytes_are_loaded_big_endian() {
        let state = counting_state();
        assert_eq!(state.words[0], 0x0001_0203_0405_0607);
        assert_eq!(state.byte(9), 9);
        assert_eq!(state.byte(39), 39);
    }

    #[test]
    fn zero_rounds_leave_state_untouched() {
        let mut state = counting_state();
        state.permute(0);
        assert_eq!(state.words, counting_state().words);
    }

    #[test]
    fn reduced_rounds_differ_from_full_rounds() {
        let mut full = counting_state();
        let mut reduced = counting_state();
        full.permute(12);
        reduced.permute(6);
        assert_ne!(full.words, reduced.words);
        assert_ne!(full.words, counting_state().words);
    }

    #[test]
    fn set_byte_replaces_only_target_byte() {
        let mut state = counting_state();
        state.set_byte(3, 0xAA);
        assert_eq!(state.byte(3), 0xAA);
        assert_eq!(state.byte(2), 2);
        assert_eq!(state.byte(4), 4);
    }

    #[test]
    fn xor_bytes_is_self_inverse() {
        let mut state = counting_state();
        state.xor_bytes(5, b"soil");
        assert_ne!(state.words, counting_state().words);
        state.xor_bytes(5, b"soil");
        assert_eq!(state.words, counting_state().words);
    }
}
