//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Fundflow core.
//!
//! These are compiled into the binary. The link distance and the page limit
//! are defaults that the user may retune at runtime through `tuning`; the
//! rest are fixed.

/// Shannons per whole CKB. Amounts are displayed and sized in whole units.
pub const SHANNONS_PER_CKB: u128 = 100_000_000;

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Default number of transactions requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Upper bound for a page request. Larger pages are rejected by `tuning`.
pub const MAX_PAGE_LIMIT: u32 = 10_000;

/// Label used when a script matches no known classification.
pub const UNKNOWN_SCRIPT_LABEL: &str = "Unknown";

// =============================================================================
// LAYOUT
// =============================================================================

/// Default rest distance of the link springs.
pub const DEFAULT_LINK_DISTANCE: f64 = 450.0;

/// Many-body charge strength. Negative means repulsion.
///
/// Large on purpose: unrelated clusters must end up visually apart.
pub const CHARGE_STRENGTH: f64 = -6000.0;

/// Link spring stiffness.
pub const LINK_STRENGTH: f64 = 3.0;

/// Alpha never decays below this target, keeping the simulation warm.
pub const ALPHA_TARGET: f64 = 0.005;

/// Reference floor used to derive the alpha decay rate (300 ticks to reach it from 1).
pub const ALPHA_MIN: f64 = 0.001;

/// Fraction of velocity lost each tick.
pub const VELOCITY_DECAY: f64 = 0.4;

/// Strength of the centering translation (1.0 recentres fully each tick).
pub const CENTER_STRENGTH: f64 = 1.0;

/// Radius step of the phyllotaxis spiral used to seed new nodes.
pub const INITIAL_RADIUS: f64 = 10.0;

// =============================================================================
// RENDERING
// =============================================================================

/// Padding added around the node bounding box when fitting the view.
pub const VIEW_PADDING: f64 = 100.0;

/// Minimum zoom factor; interactive zoom is clamped here.
pub const MIN_ZOOM: f64 = 0.5;

/// Edge labels sit at `bias * source + (1 - bias) * target`.
pub const EDGE_LABEL_SOURCE_BIAS: f64 = 0.3;

/// Wall-clock cadence at which the view is refitted, independent of tick rate.
pub const REFIT_INTERVAL_MS: u64 = 2000;
