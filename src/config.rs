//! Global configuration for runtime parsing behavior.
//!
//! Switches here are set once at startup and read during parsing. They hold
//! no per-call state, so the parser stays re-entrant.

use std::sync::atomic::{AtomicBool, Ordering};

/// Smallest prefix length accepted when legacy mask bounds are enabled.
pub const LEGACY_MIN_PREFIX_LEN: u8 = 8;

/// Global flag restricting mask lengths to `/8`..`/32`.
///
/// Older list loaders refused anything wider than a `/8`. Enabling this makes
/// every operation treat `/0`..`/7` as malformed so that lists accepted here
/// are also accepted there.
static LEGACY_MASK_BOUNDS: AtomicBool = AtomicBool::new(false);

/// Enable or disable legacy mask bounds.
///
/// # Example
///
/// ```
/// use iplist_normalize::config;
///
/// config::set_legacy_mask_bounds(true);
/// assert!(!config::mask_in_bounds(4));
/// config::set_legacy_mask_bounds(false);
/// assert!(config::mask_in_bounds(4));
/// ```
#[inline]
pub fn set_legacy_mask_bounds(enabled: bool) {
    LEGACY_MASK_BOUNDS.store(enabled, Ordering::Release);
}

/// Check if legacy mask bounds are enabled.
#[inline]
pub fn is_legacy_mask_bounds() -> bool {
    LEGACY_MASK_BOUNDS.load(Ordering::Acquire)
}

/// Whether a prefix length is acceptable under the current configuration.
#[inline]
pub fn mask_in_bounds(prefix_len: u8) -> bool {
    let min = if is_legacy_mask_bounds() {
        LEGACY_MIN_PREFIX_LEN
    } else {
        0
    };
    (min..=32).contains(&prefix_len)
}
