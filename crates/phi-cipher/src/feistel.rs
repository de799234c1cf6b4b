//! Keyed Feistel permutation over small-radix symbol strings.
//!
//! A balanced Feistel network in the style of FF1: the symbol string is
//! split into two halves and each round adds a keyed pseudo-random
//! function of one half to the other, modulo the radix. HMAC-SHA256 is the
//! round function. Ten rounds with alternating halves give a permutation
//! over strings of any length at a fixed radix; a single-symbol string is
//! handled with a keyed additive shift since a Feistel split needs at
//! least two symbols.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Feistel round count. Even, so halves end in their original positions.
const ROUNDS: u8 = 10;

/// Encrypts `symbols` (each in `0..radix`) in place under `subkey`,
/// bound to `tweak`.
pub(crate) fn encrypt(subkey: &[u8; 32], tweak: &[u8], radix: u8, symbols: &mut [u8]) {
    match symbols.len() {
        0 => {}
        1 => {
            let shift = prf(subkey, tweak, ROUNDS, &[], 1, radix)[0];
            symbols[0] = (symbols[0] + shift) % radix;
        }
        n => {
            let split = n / 2;
            let mut left = symbols[..split].to_vec();
            let mut right = symbols[split..].to_vec();

            for round in 0..ROUNDS {
                let f = prf(subkey, tweak, round, &right, left.len(), radix);
                for (l, f) in left.iter_mut().zip(&f) {
                    *l = (*l + f) % radix;
                }
                std::mem::swap(&mut left, &mut right);
            }

            symbols[..split].copy_from_slice(&left);
            symbols[split..].copy_from_slice(&right);
        }
    }
}

/// Inverts [`encrypt`] for the same subkey, tweak, and radix.
pub(crate) fn decrypt(subkey: &[u8; 32], tweak: &[u8], radix: u8, symbols: &mut [u8]) {
    match symbols.len() {
        0 => {}
        1 => {
            let shift = prf(subkey, tweak, ROUNDS, &[], 1, radix)[0];
            symbols[0] = (symbols[0] + radix - shift) % radix;
        }
        n => {
            let split = n / 2;
            let mut left = symbols[..split].to_vec();
            let mut right = symbols[split..].to_vec();

            for round in (0..ROUNDS).rev() {
                std::mem::swap(&mut left, &mut right);
                let f = prf(subkey, tweak, round, &right, left.len(), radix);
                for (l, f) in left.iter_mut().zip(&f) {
                    *l = (*l + radix - f) % radix;
                }
            }

            symbols[..split].copy_from_slice(&left);
            symbols[split..].copy_from_slice(&right);
        }
    }
}

/// Keyed pseudo-random function: HMAC-SHA256 over the tweak, round number,
/// and the driving half, expanded block-by-block until `out_len` symbols in
/// `0..radix` are produced.
fn prf(subkey: &[u8; 32], tweak: &[u8], round: u8, input: &[u8], out_len: usize, radix: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(out_len);
    let mut block: u32 = 0;

    while out.len() < out_len {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(subkey)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(tweak);
        mac.update(&[round]);
        mac.update(&(input.len() as u32).to_be_bytes());
        mac.update(input);
        mac.update(&block.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        for byte in digest {
            if out.len() == out_len {
                break;
            }
            out.push(byte % radix);
        }
        block += 1;
    }
    out
}
