//! # Net Flow Classification
//!
//! Decides, for one transaction seen from one address, which way value moved
//! and which counterparties the graph should link to.
//!
//! - `spend` = sum of inputs owned by the address's script
//! - `got` = sum of outputs owned by the address's script
//! - `spend > got` is a net outflow to the other output owners
//! - `got > spend` is a net inflow from the other input owners
//! - equal volumes produce no edge
//!
//! The address itself is never its own counterparty, so change outputs and
//! self-transfers do not create self-loops.

use crate::{Amount, CellRef, Script, TransactionDetail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// =============================================================================
// DIRECTION
// =============================================================================

/// Net direction of a transaction for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// The address lost this much net value.
    Outflow(Amount),
    /// The address gained this much net value.
    Inflow(Amount),
    /// Pass-through or self-transfer; nothing to record.
    Balanced,
}

/// Spend and receive volumes of one address within one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxFlow {
    pub spend: Amount,
    pub got: Amount,
}

impl TxFlow {
    /// Measure the volumes `script` spent and received in `detail`.
    #[must_use]
    pub fn measure(detail: &TransactionDetail, script: &Script) -> Self {
        Self {
            spend: owned_by(&detail.inputs, script),
            got: owned_by(&detail.outputs, script),
        }
    }

    #[must_use]
    pub fn direction(&self) -> FlowDirection {
        if let Some(net) = self.spend.checked_sub(self.got).filter(|n| !n.is_zero()) {
            FlowDirection::Outflow(net)
        } else if let Some(net) = self.got.checked_sub(self.spend).filter(|n| !n.is_zero()) {
            FlowDirection::Inflow(net)
        } else {
            FlowDirection::Balanced
        }
    }
}

fn owned_by(cells: &[CellRef], script: &Script) -> Amount {
    cells
        .iter()
        .filter(|c| &c.owner == script)
        .map(|c| c.amount)
        .sum()
}

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// How a net amount is spread over the counterparty edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAttribution {
    /// Every counterparty edge receives the whole net amount.
    #[default]
    FullNet,
    /// Split the net amount in proportion to each counterparty's share of the
    /// other side. The shares sum exactly to the net amount.
    Proportional,
}

impl FromStr for FlowAttribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "proportional" => Ok(Self::Proportional),
            "full_net" | "full-net" => Ok(Self::FullNet),
            other => Err(format!(
                "unknown attribution '{other}' (expected proportional or full_net)"
            )),
        }
    }
}

/// One counterparty of a transaction and the amount its edge receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterparty {
    pub script: Script,
    pub amount: Amount,
}

/// Result of classifying one transaction for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub direction: FlowDirection,
    /// Distinct counterparties in script order. Empty when balanced.
    pub counterparties: Vec<Counterparty>,
}

/// Classify `detail` from the point of view of `script`.
///
/// Outflow counterparties are the other output owners, inflow counterparties
/// the other input owners. Counterparties whose share rounds to zero are
/// dropped, since edges carry strictly positive amounts.
#[must_use]
pub fn classify(
    detail: &TransactionDetail,
    script: &Script,
    attribution: FlowAttribution,
) -> Classified {
    let direction = TxFlow::measure(detail, script).direction();
    let (net, side) = match direction {
        FlowDirection::Outflow(net) => (net, &detail.outputs),
        FlowDirection::Inflow(net) => (net, &detail.inputs),
        FlowDirection::Balanced => {
            return Classified {
                direction,
                counterparties: Vec::new(),
            };
        }
    };

    let mut weights: BTreeMap<&Script, Amount> = BTreeMap::new();
    for cell in side.iter().filter(|c| &c.owner != script) {
        let w = weights.entry(&cell.owner).or_default();
        *w = w.saturating_add(cell.amount);
    }

    let shares = match attribution {
        FlowAttribution::FullNet => weights.keys().map(|s| (*s, net)).collect(),
        FlowAttribution::Proportional => split_proportional(net, &weights),
    };

    Classified {
        direction,
        counterparties: shares
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(script, amount)| Counterparty {
                script: script.clone(),
                amount,
            })
            .collect(),
    }
}

/// Largest-share rounding: floor every share, then hand the remainder to the
/// heaviest counterparty (first in script order on ties).
fn split_proportional<'a>(
    net: Amount,
    weights: &BTreeMap<&'a Script, Amount>,
) -> Vec<(&'a Script, Amount)> {
    if weights.is_empty() {
        return Vec::new();
    }

    let total: u128 = weights.values().map(|w| w.value()).sum();
    // Zero-valued cells only: split evenly
    let weight_of = |w: Amount| if total == 0 { 1 } else { w.value() };
    let denominator = if total == 0 {
        weights.len() as u128
    } else {
        total
    };

    let mut shares: Vec<(&Script, Amount)> = weights
        .iter()
        .map(|(script, w)| {
            let share = mul_div(net.value(), weight_of(*w), denominator);
            (*script, Amount::new(share))
        })
        .collect();

    let assigned: u128 = shares.iter().map(|(_, a)| a.value()).sum();
    let remainder = net.value().saturating_sub(assigned);
    if remainder > 0 {
        let mut heaviest = 0;
        let mut heaviest_weight = 0;
        for (i, w) in weights.values().enumerate() {
            if i == 0 || weight_of(*w) > heaviest_weight {
                heaviest = i;
                heaviest_weight = weight_of(*w);
            }
        }
        if let Some((_, amount)) = shares.get_mut(heaviest) {
            *amount = amount.saturating_add(Amount::new(remainder));
        }
    }
    shares
}

/// `a * b / c` rounded down, exact for any `c > 0`.
///
/// The product is taken in 256 bits and divided bit by bit. A quotient that
/// does not fit `u128` saturates; shares never hit that since `b <= c`.
fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    if let Some(product) = a.checked_mul(b) {
        return product / c;
    }
    let (hi, lo) = widening_mul(a, b);
    let mut quotient: u128 = 0;
    let mut rem: u128 = 0;
    for i in (0..256u32).rev() {
        let bit = if i >= 128 {
            (hi >> (i - 128)) & 1
        } else {
            (lo >> i) & 1
        };
        if quotient >> 127 == 1 {
            return u128::MAX;
        }
        quotient <<= 1;
        let carry = rem >> 127 == 1;
        rem = (rem << 1) | bit;
        // With a carry the true remainder is above 2^128 > c
        if carry || rem >= c {
            rem = rem.wrapping_sub(c);
            quotient |= 1;
        }
    }
    quotient
}

/// Full 256-bit product as `(high, low)` halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

// =============================================================================
// TESTS
// =============================================================================
