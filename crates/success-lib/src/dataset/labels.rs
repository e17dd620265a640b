//! Outcome label normalization
//!
//! Source data encodes outcomes as 0/1/2 or as free-form Spanish/English
//! tier names with varying case, accents and separators ("Alto éxito",
//! "medio_exito", "LOW"). Everything is folded onto [`OutcomeLabel`].

use crate::models::OutcomeLabel;
use unicode_normalization::UnicodeNormalization;

const LOW_TERMS: &[&str] = &["bajo", "baja", "low"];
const MEDIUM_TERMS: &[&str] = &["medio", "media", "medium"];
const HIGH_TERMS: &[&str] = &["alto", "alta", "high"];

/// Map a raw outcome value onto a canonical class, or `None` if unrecognized.
///
/// Integral numerics 0/1/2 pass through. Strings are lower-cased,
/// accent-stripped and split into alphanumeric words; the first tier with
/// a word in its vocabulary wins, checked in Low, Medium, High order.
pub fn normalize_label(raw: &str) -> Option<OutcomeLabel> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.fract() == 0.0 && (0.0..=2.0).contains(&v) {
            return OutcomeLabel::from_index(v as usize);
        }
        return None;
    }

    let folded = fold(trimmed);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let tiers = [
        (OutcomeLabel::Low, LOW_TERMS),
        (OutcomeLabel::Medium, MEDIUM_TERMS),
        (OutcomeLabel::High, HIGH_TERMS),
    ];
    tiers
        .iter()
        .find(|(_, terms)| words.iter().any(|w| terms.contains(w)))
        .map(|(label, _)| *label)
}

/// Lower-case, strip accents (NFKD then drop non-ASCII) and unify separators
fn fold(s: &str) -> String {
    s.nfkd()
        .filter(char::is_ascii)
        .map(|c| match c {
            '_' | '-' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_variants() {
        for raw in ["Alto éxito", "ALTO", "alto", "2", "2.0", "alto_exito", "High", "éxito: alta"] {
            assert_eq!(normalize_label(raw), Some(OutcomeLabel::High), "{}", raw);
        }
    }

    #[test]
    fn test_low_and_medium_variants() {
        for raw in ["Bajo éxito", "bajo exito", "0", " low "] {
            assert_eq!(normalize_label(raw), Some(OutcomeLabel::Low), "{}", raw);
        }
        for raw in ["Medio éxito", "MEDIO_EXITO", "1", "medium"] {
            assert_eq!(normalize_label(raw), Some(OutcomeLabel::Medium), "{}", raw);
        }
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(normalize_label("tal vez"), None);
        assert_eq!(normalize_label("Falta evaluar"), None);
        assert_eq!(normalize_label("faltante"), None);
        assert_eq!(normalize_label("follow-up"), None);
        assert_eq!(normalize_label("slowdown"), None);
        assert_eq!(normalize_label("3"), None);
        assert_eq!(normalize_label("1.5"), None);
        assert_eq!(normalize_label(""), None);
    }

    #[test]
    fn test_fold_strips_accents() {
        assert_eq!(fold("Éxito-Rápido"), "exito rapido");
    }
}
