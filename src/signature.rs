//! Content fingerprints used to spot recipes the generator already proposed.

use crate::nutritional_matcher::normalize_text;
use crate::recipe_parser::Recipe;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

/// Only the leading ingredients take part in the fingerprint.
const SIGNATURE_INGREDIENTS: usize = 8;

/// 32-bit FNV-1a over the UTF-16 code units of `input`.
///
/// Hashing UTF-16 units keeps non-ASCII signatures equal to those already
/// stored in existing state documents.
pub fn fnv1a_32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Lower-case base-36 rendering of `value`.
pub fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Stable fingerprint of a recipe's title, cuisine family and first eight
/// ingredient names (normalized and sorted).
pub fn recipe_signature(recipe: &Recipe) -> String {
    let title = recipe.title.to_lowercase();
    let family = recipe.cuisine_family.to_lowercase();
    let mut names: Vec<String> = recipe
        .ingredients
        .iter()
        .take(SIGNATURE_INGREDIENTS)
        .map(|i| normalize_text(&i.name))
        .collect();
    names.sort();
    let key = format!("{}#{}#{}", title.trim(), family.trim(), names.join("|"));
    to_base36(fnv1a_32(&key))
}
