//! SKU generation.
//!
//! A SKU is `{category}-{name}-{value1}-{value2}-...-{suffix}`. The first
//! segments are derived from the catalog data and repeat across wizard runs,
//! so a random four character suffix is appended and callers check it
//! against persisted SKUs with [`generate_unique_sku`].

use rand::Rng;

use crate::domain::aggregates::category::Category;
use crate::domain::value_objects::{Sku, SkuError, SKU_MAX_LEN};

pub const GENERIC_CATEGORY_CODE: &str = "GEN";
pub const SUFFIX_LEN: usize = 4;
/// Longest stem that still leaves room for `-{suffix}`.
pub const STEM_MAX_LEN: usize = SKU_MAX_LEN - 1 - SUFFIX_LEN;
/// Slug-derived category codes are cut to this when a stem overflows.
const SHORT_CATEGORY_LEN: usize = 4;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Abbreviations for size and side words, keyed by title-cased value.
const VALUE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("Left", "L"),
    ("Right", "R"),
    ("Small", "S"),
    ("Medium", "M"),
    ("Large", "L"),
    ("Extra Small", "XS"),
    ("Extra Large", "XL"),
];

/// Category segment: explicit code, then uppercased slug, then `GEN`.
pub fn category_code(category: Option<&Category>) -> String {
    let Some(category) = category else { return GENERIC_CATEGORY_CODE.to_string() };
    if let Some(code) = category.sku_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        return code.to_uppercase();
    }
    let slug: String = category.slug.trim().chars().filter_map(ascii_fold).collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() { GENERIC_CATEGORY_CODE.to_string() } else { slug.to_uppercase() }
}

/// Name segment: first three letters of a single word, or the initials of several.
pub fn name_token(name: &str) -> String {
    let words: Vec<String> = name
        .split_whitespace()
        .map(|w| w.chars().filter_map(ascii_fold).filter(char::is_ascii_alphanumeric).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect();
    let token: String = match words.as_slice() {
        [] => return "PRD".to_string(),
        [single] => single.chars().take(3).collect(),
        many => many.iter().filter_map(|w| w.chars().next()).collect(),
    };
    token.to_uppercase()
}

/// Value segment: the abbreviation table, else the first three letters.
pub fn value_token(value: &str) -> String {
    let titled = title_case(value.trim());
    if let Some((_, short)) = VALUE_ABBREVIATIONS.iter().find(|(word, _)| *word == titled) {
        return (*short).to_string();
    }
    let token: String = value
        .trim()
        .chars()
        .filter_map(ascii_fold)
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect();
    if token.is_empty() { "X".to_string() } else { token.to_uppercase() }
}

/// The deterministic part of a SKU, without the random suffix.
///
/// Never longer than [`STEM_MAX_LEN`]. An overflowing stem first gets a
/// short category code, then loses value tokens from the end.
pub fn sku_stem<S: AsRef<str>>(category: Option<&Category>, product_name: &str, values: &[S]) -> String {
    let mut segments = vec![category_code(category), name_token(product_name)];
    segments.extend(values.iter().map(|v| value_token(v.as_ref())));
    if stem_len(&segments) > STEM_MAX_LEN {
        segments[0] = shorten(&segments[0], SHORT_CATEGORY_LEN);
    }
    while segments.len() > 2 && stem_len(&segments) > STEM_MAX_LEN {
        segments.pop();
    }
    let stem = segments.join("-");
    if stem.len() > STEM_MAX_LEN { shorten(&stem, STEM_MAX_LEN) } else { stem }
}

fn stem_len(segments: &[String]) -> usize {
    segments.iter().map(String::len).sum::<usize>() + segments.len().saturating_sub(1)
}

/// Segments are ASCII, so byte and char lengths agree.
fn shorten(segment: &str, max: usize) -> String {
    let cut: String = segment.chars().take(max).collect();
    cut.trim_end_matches('-').to_string()
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Appends a random suffix to `stem`. Uniqueness is the caller's concern.
pub fn generate_sku<R: Rng + ?Sized>(stem: &str, rng: &mut R) -> Result<Sku, SkuError> {
    Sku::new(format!("{stem}-{}", random_suffix(rng)))
}

/// Draws suffixes until `is_taken` rejects none, giving up after `max_attempts`.
pub fn generate_unique_sku<R, F>(stem: &str, rng: &mut R, max_attempts: u32, mut is_taken: F) -> Result<Sku, SkuError>
where
    R: Rng + ?Sized,
    F: FnMut(&Sku) -> bool,
{
    for attempt in 1..=max_attempts {
        let sku = generate_sku(stem, rng)?;
        if !is_taken(&sku) {
            return Ok(sku);
        }
        tracing::debug!(%sku, attempt, "SKU collision, drawing a new suffix");
    }
    Err(SkuError::Exhausted(max_attempts))
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn ascii_fold(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        _ => return None,
    };
    Some(folded)
}
