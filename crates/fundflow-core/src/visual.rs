//! # Visual Attributes
//!
//! Display attributes derived from ledger data: node colour and radius, edge
//! stroke width, and the text shown on nodes and edges.
//!
//! Sizes are logarithmic in whole CKB so that balances spanning many orders
//! of magnitude stay readable. The amount is divided down to whole units in
//! integer arithmetic first; only the final logarithm is floating point.

#![allow(clippy::float_arithmetic)]

use crate::Amount;
use crate::primitives::SHANNONS_PER_CKB;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Saturation and lightness are fixed; only the hue varies per node.
const SATURATION: u8 = 65;
const LIGHTNESS: u8 = 45;

// =============================================================================
// COLOUR
// =============================================================================

/// An HSL colour in CSS notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Hsl {
    /// Derive the colour from a 256-bit seed read as a big-endian integer.
    ///
    /// The hue is `seed mod 360`, computed byte by byte so the full width
    /// of the seed contributes.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let hue = seed
            .iter()
            .fold(0u32, |acc, &b| (acc * 256 + u32::from(b)) % 360);
        Self {
            hue: hue as u16,
            saturation: SATURATION,
            lightness: LIGHTNESS,
        }
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({} {}% {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

// =============================================================================
// SIZES
// =============================================================================

/// `log10` of an amount in whole CKB, with `-inf` for anything under 1 CKB.
fn log10_ckb(amount: Amount) -> f64 {
    let whole = amount.value() / SHANNONS_PER_CKB;
    (whole as f64).log10()
}

/// Node circle radius: `max(-2, log10(balance)) * 4 + 24`.
#[must_use]
pub fn node_radius(balance: Amount) -> f64 {
    log10_ckb(balance).max(-2.0) * 4.0 + 24.0
}

/// Edge stroke width: `(max(0, log10(value)) * 0.3 + 1)^2`.
#[must_use]
pub fn edge_stroke_width(value: Amount) -> f64 {
    let base = log10_ckb(value).max(0.0) * 0.3 + 1.0;
    base * base
}

// =============================================================================
// TEXT
// =============================================================================

/// Whole CKB with comma thousands separators, e.g. `1,234,567`.
#[must_use]
pub fn format_amount(amount: Amount) -> String {
    let digits = (amount.value() / SHANNONS_PER_CKB).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Abbreviate an address as `first6..last4`.
#[must_use]
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}..{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ckb(n: u128) -> Amount {
        Amount::new(n * SHANNONS_PER_CKB)
    }

    #[test]
    fn hue_is_seed_mod_360() {
        let mut seed = [0u8; 32];
        seed[31] = 200;
        assert_eq!(Hsl::from_seed(&seed).hue, 200);

        // 0x0200 = 512 -> 152
        seed[30] = 2;
        seed[31] = 0;
        assert_eq!(Hsl::from_seed(&seed).hue, 152);
    }

    #[test]
    fn hsl_renders_css() {
        let color = Hsl {
            hue: 12,
            saturation: 65,
            lightness: 45,
        };
        assert_eq!(color.to_string(), "hsl(12 65% 45%)");
    }

    #[test]
    fn radius_scales_with_log_balance() {
        assert!((node_radius(ckb(1)) - 24.0).abs() < 1e-9);
        assert!((node_radius(ckb(1000)) - 36.0).abs() < 1e-9);
        // Below one whole CKB the radius bottoms out at -2 * 4 + 24
        assert!((node_radius(Amount::ZERO) - 16.0).abs() < 1e-9);
        assert!((node_radius(Amount::new(5)) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn stroke_width_clamped_at_one() {
        assert!((edge_stroke_width(Amount::new(1)) - 1.0).abs() < 1e-9);
        // log10(100) = 2 -> (0.6 + 1)^2
        assert!((edge_stroke_width(ckb(100)) - 2.56).abs() < 1e-9);
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(Amount::ZERO), "0");
        assert_eq!(format_amount(ckb(999)), "999");
        assert_eq!(format_amount(ckb(1000)), "1,000");
        assert_eq!(format_amount(ckb(1_234_567)), "1,234,567");
        // Fractions are truncated
        assert_eq!(format_amount(Amount::new(150_000_000)), "1");
    }

    #[test]
    fn short_address_keeps_ends() {
        assert_eq!(short_address("ckb1qzda0cr08m85hc8jlnfp3zer7xu"), "ckb1qz..r7xu");
        assert_eq!(short_address("short"), "short");
    }
}
