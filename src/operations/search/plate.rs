//! License-plate normalization and fuzzy matching.
//!
//! OCR output is noisy: Cyrillic lookalikes, O/0 and I/1 confusions, stray
//! punctuation. Both sides of a comparison are folded into the same
//! restricted alphabet before scoring, so visually identical plates compare
//! equal regardless of which alphabet the OCR picked.

use strsim::normalized_levenshtein;

/// The alphabet of a normalized plate (Latin letters that have Cyrillic
/// lookalikes, plus digits).
const ALLOWED_PLATE_CHARS: &str = "ABEKMHOPCTYX0123456789";

/// Cyrillic letters that appear on plates, mapped to their Latin lookalikes.
const CYRILLIC_TO_LATIN: &[(char, char)] = &[
    ('А', 'A'),
    ('В', 'B'),
    ('Е', 'E'),
    ('К', 'K'),
    ('М', 'M'),
    ('Н', 'H'),
    ('О', 'O'),
    ('Р', 'P'),
    ('С', 'C'),
    ('Т', 'T'),
    ('У', 'Y'),
    ('Х', 'X'),
];

/// Fold raw plate text into the canonical form: uppercase, whitespace and
/// punctuation stripped, Cyrillic mapped to Latin, common OCR confusions
/// resolved, everything outside the plate alphabet dropped. `None` when
/// nothing survives.
pub fn normalize_plate(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let mut cleaned = String::new();

    for ch in text.trim().to_uppercase().chars() {
        if ch.is_whitespace() {
            continue;
        }

        if ch.is_ascii_digit() {
            cleaned.push(ch);
            continue;
        }

        let mut ch = if ('А'..='Я').contains(&ch) || ch == 'Ё' {
            match CYRILLIC_TO_LATIN.iter().find(|(cyr, _)| *cyr == ch) {
                Some((_, lat)) => *lat,
                None => continue,
            }
        } else {
            ch
        };

        ch = match ch {
            'Q' => 'O',
            'I' | 'L' => '1',
            'Z' => '2',
            'S' => '5',
            other => other,
        };

        if ALLOWED_PLATE_CHARS.contains(ch) {
            cleaned.push(ch);
        }
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Similarity in `[0, 1]` between a query plate and a stored plate: 1.0 on
/// exact normalized match, otherwise normalized edit similarity, floored to
/// 0 below `min_similarity`.
pub fn plate_score(query_plate: &str, stored_plate: &str, min_similarity: f64) -> f64 {
    let (Some(query), Some(stored)) = (normalize_plate(query_plate), normalize_plate(stored_plate))
    else {
        return 0.0;
    };

    if query == stored {
        return 1.0;
    }

    let score = normalized_levenshtein(&query, &stored);
    if score < min_similarity {
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyrillic_and_latin_spellings_normalize_identically() {
        // Visually identical plates in the two alphabets.
        assert_eq!(
            normalize_plate("А123ВС77"),
            normalize_plate("A123BC77"),
        );
    }

    #[test]
    fn ocr_confusions_are_folded() {
        assert_eq!(normalize_plate("AI23BC77").as_deref(), Some("A123BC77"));
        assert_eq!(normalize_plate("AL23BC77").as_deref(), Some("A123BC77"));
        assert_eq!(normalize_plate("A12ZBC77").as_deref(), Some("A122BC77"));
    }

    #[test]
    fn punctuation_and_whitespace_are_stripped() {
        assert_eq!(normalize_plate(" a 123-bc.77 ").as_deref(), Some("A123BC77"));
    }

    #[test]
    fn empty_and_unusable_text_normalizes_to_none() {
        assert_eq!(normalize_plate(""), None);
        assert_eq!(normalize_plate("---"), None);
    }

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(plate_score("А123ВС77", "A123BC77", 0.4), 1.0);
    }

    #[test]
    fn near_match_scores_between_floor_and_one() {
        let score = plate_score("A123BC77", "A123BC99", 0.4);
        assert!(score > 0.4 && score < 1.0);
    }

    #[test]
    fn distant_plates_floor_to_zero() {
        assert_eq!(plate_score("A123BC77", "X999YY11", 0.4), 0.0);
    }
}
