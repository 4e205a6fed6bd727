//! Hash-keyed fallback palette.
//!
//! Used only when the vision model returns no usable colors. The palette is
//! derived from the encoded bytes, not from pixel data.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use shared::{ColorPalette, MAX_PALETTE_COLORS};

const BASE_COLORS: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7",
    "#DDA0DD", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E9",
    "#F8C471", "#82E0AA", "#F1948A", "#AED6F1", "#D7BDE2",
    "#FAD7A0", "#ABEBC6", "#F9E79F", "#D5A6BD", "#A9CCE3",
];

const NEUTRAL_DOMINANT: &str = "#000000";
const NEUTRAL_REST: [&str; 5] = ["#FFFFFF", "#808080", "#FF0000", "#00FF00", "#0000FF"];

/// Rolling `hash * 31 + c` over the text with 32-bit signed wrap-around,
/// returned as its absolute value.
pub fn rolling_hash(text: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in text.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Seed taken from the base64 text of the upload, which the request builder
/// has already produced.
pub fn palette_seed(image_base64: &str) -> u64 {
    u64::from(rolling_hash(image_base64) % 1000)
}

/// Deterministic palette for the given base64-encoded image.
pub fn fallback_palette(image_base64: &str) -> ColorPalette {
    let colors = shuffled_colors(palette_seed(image_base64));
    ColorPalette::new(colors).unwrap_or_else(|| {
        log::warn!("Fallback palette generation produced no colors, using neutral palette");
        neutral_palette()
    })
}

pub fn neutral_palette() -> ColorPalette {
    ColorPalette::with_dominant(NEUTRAL_DOMINANT, NEUTRAL_REST.iter().map(|c| c.to_string()))
}

/// `StdRng` output is only guaranteed stable for a given `rand` release, so the
/// order for a seed is fixed by the locked `rand` version, not across upgrades.
fn shuffled_colors(seed: u64) -> Vec<String> {
    let mut colors: Vec<String> = BASE_COLORS.iter().map(|c| c.to_string()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    colors.shuffle(&mut rng);
    colors.truncate(MAX_PALETTE_COLORS);
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rolling_hash_matches_reference_values() {
        assert_eq!(rolling_hash(""), 0);
        assert_eq!(rolling_hash("A"), 65);
        // "AA==" is the base64 text of a single zero byte.
        assert_eq!(rolling_hash("AA=="), 2_000_832);
        assert_eq!(palette_seed("AA=="), 832);
        assert_eq!(palette_seed("/w=="), 488);
    }

    #[test]
    fn rolling_hash_wraps_instead_of_overflowing() {
        let long = "z".repeat(10_000);
        assert!(rolling_hash(&long) <= 1 << 31);
    }

    #[test]
    fn palette_is_deterministic() {
        let image = "iVBORw0KGgpzb21lIGltYWdlIGJ5dGVz";
        assert_eq!(fallback_palette(image), fallback_palette(image));
    }

    #[test]
    fn palette_has_eight_distinct_base_colors() {
        let palette = fallback_palette("AQIDBA==");
        assert_eq!(palette.colors().len(), MAX_PALETTE_COLORS);
        assert_eq!(palette.dominant_color(), palette.colors()[0]);

        let unique: HashSet<&String> = palette.colors().iter().collect();
        assert_eq!(unique.len(), MAX_PALETTE_COLORS);
        assert!(palette.colors().iter().all(|c| BASE_COLORS.contains(&c.as_str())));
    }

    #[test]
    fn order_depends_on_the_seed() {
        assert_ne!(shuffled_colors(832), shuffled_colors(488));
        assert_ne!(fallback_palette("AA=="), fallback_palette("/w=="));
    }

    #[test]
    fn every_seed_gives_a_repeatable_order() {
        for seed in 0..1000 {
            let colors = shuffled_colors(seed);
            assert_eq!(colors, shuffled_colors(seed));
            let unique: HashSet<&String> = colors.iter().collect();
            assert_eq!(unique.len(), MAX_PALETTE_COLORS);
        }
    }

    #[test]
    fn empty_image_still_gets_a_palette() {
        let palette = fallback_palette("");
        assert_eq!(palette.colors().len(), MAX_PALETTE_COLORS);
    }

    #[test]
    fn neutral_palette_starts_with_black() {
        let palette = neutral_palette();
        assert_eq!(palette.colors().len(), 6);
        assert_eq!(palette.dominant_color(), "#000000");
    }
}
