//! Free-text query parsing.
//!
//! A search query like "red car A123BC77" carries more than text: an object
//! type filter, colour filters and a plate string. Those are pulled out
//! before the cleaned text goes to the embedding extractor, and drive which
//! score components apply during fusion.

use once_cell::sync::Lazy;
use regex::Regex;

use super::frame::ObjectType;

/// Structured form of a user query. Every field except `cleaned_text` is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub object_type: Option<ObjectType>,
    /// Generic colour filter (transport body, or a person when no clothing
    /// region was named).
    pub color: Option<String>,
    pub upper_color: Option<String>,
    pub lower_color: Option<String>,
    pub plate: Option<String>,
    pub cleaned_text: String,
}

impl ParsedQuery {
    pub fn has_color_filter(&self) -> bool {
        self.color.is_some() || self.upper_color.is_some() || self.lower_color.is_some()
    }
}

const PERSON_KEYWORDS: &[&str] = &[
    "person", "people", "human", "man", "woman", "boy", "girl", "pedestrian", "человек",
    "человека", "мужчина", "женщина", "парень", "девушка", "пешеход",
];

const TRANSPORT_KEYWORDS: &[&str] = &[
    "car",
    "cars",
    "auto",
    "vehicle",
    "truck",
    "bus",
    "van",
    "машина",
    "авто",
    "грузовик",
    "автобус",
    "легковая",
    "фура",
    "микроавтобус",
    "транспорт",
];

const UPPER_CLOTHES_STEMS: &[&str] = &[
    "jacket", "shirt", "coat", "hoodie", "sweater", "vest", "куртк", "футболк", "кофт",
    "пиджак", "пальт", "жилет", "худи", "толстовк", "свитер", "верх",
];

const LOWER_CLOTHES_STEMS: &[&str] = &[
    "pants", "trousers", "jeans", "skirt", "shorts", "штан", "джинс", "брюк", "юбк", "шорт",
    "низ",
];

/// Base colour name to the token stems that select it.
const COLOR_STEMS: &[(&str, &[&str])] = &[
    ("black", &["black", "черн", "чёрн"]),
    ("white", &["white", "бел"]),
    ("gray", &["gray", "grey", "сер"]),
    ("red", &["red", "красн", "бордов"]),
    ("orange", &["orange", "оранжев"]),
    ("yellow", &["yellow", "желт", "жёлт"]),
    ("green", &["green", "зелен", "зелён"]),
    ("blue", &["blue", "син", "голуб"]),
    ("brown", &["brown", "коричнев"]),
    ("purple", &["purple", "фиолет", "пурпур"]),
    ("pink", &["pink", "розов"]),
];

/// Registration-number shape: letter, three digits, two letters, a two- or
/// three-digit region code, with optional separators.
static PLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-ZА-Я])[ -]?(\d{3})[ -]?([A-ZА-Я]{2})[ -]?(\d{2,3})\b")
        .expect("plate pattern is valid")
});

/// How far (in tokens) a colour may sit from a clothing keyword and still be
/// attached to it.
const MAX_COLOR_DISTANCE: usize = 3;

pub fn parse_query(text: &str) -> ParsedQuery {
    let normalized = normalize_text(text);

    let (plate, text_without_plate) = extract_plate(&normalized);
    let object_type = detect_type(&normalized);
    let (colors, tokens) = detect_colors(&normalized);

    let (upper_color, lower_color, generic_color) =
        split_colors_by_clothes(&colors, &tokens, object_type);

    let color = if upper_color.is_some() || lower_color.is_some() {
        None
    } else {
        generic_color
    };

    ParsedQuery {
        object_type,
        color,
        upper_color,
        lower_color,
        plate,
        cleaned_text: text_without_plate.trim().to_string(),
    }
}

fn normalize_text(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_plate(text: &str) -> (Option<String>, String) {
    let Some(caps) = PLATE_REGEX.captures(text) else {
        return (None, text.to_string());
    };

    let normalized = format!("{}{}{}{}", &caps[1], &caps[2], &caps[3], &caps[4])
        .to_uppercase()
        .replace('Ё', "Е");

    let whole = caps.get(0).expect("capture 0 always present");
    let mut remainder = String::with_capacity(text.len());
    remainder.push_str(&text[..whole.start()]);
    remainder.push_str(&text[whole.end()..]);

    (Some(normalized), remainder.trim().to_string())
}

fn detect_type(text: &str) -> Option<ObjectType> {
    let person_hits = keyword_hits(text, PERSON_KEYWORDS);
    let transport_hits = keyword_hits(text, TRANSPORT_KEYWORDS);

    match person_hits.cmp(&transport_hits) {
        std::cmp::Ordering::Greater => Some(ObjectType::Person),
        std::cmp::Ordering::Less => Some(ObjectType::Transport),
        // No hits, or an ambiguous tie.
        std::cmp::Ordering::Equal => None,
    }
}

fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

fn detect_colors(text: &str) -> (Vec<(usize, &'static str)>, Vec<String>) {
    let tokens: Vec<String> = text.split(' ').map(|t| t.to_string()).collect();
    let mut found = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let token = token.trim_matches(|c: char| ",.!?;:".contains(c));
        if let Some(color) = match_color(token) {
            found.push((idx, color));
        }
    }

    (found, tokens)
}

fn match_color(token: &str) -> Option<&'static str> {
    for (name, stems) in COLOR_STEMS {
        if stems.iter().any(|stem| token.contains(stem)) {
            return Some(name);
        }
    }
    None
}

fn split_colors_by_clothes(
    colors: &[(usize, &'static str)],
    tokens: &[String],
    object_type: Option<ObjectType>,
) -> (Option<String>, Option<String>, Option<String>) {
    if object_type != Some(ObjectType::Person) || colors.is_empty() {
        let generic = colors.first().map(|(_, c)| c.to_string());
        return (None, None, generic);
    }

    let mut upper_color = None;
    let mut lower_color = None;

    for (idx, token) in tokens.iter().enumerate() {
        let token = token.trim_matches(|c: char| ",.!?;:".contains(c));

        if upper_color.is_none() && matches_any_stem(token, UPPER_CLOTHES_STEMS) {
            upper_color = closest_color(colors, idx).map(str::to_string);
        }
        if lower_color.is_none() && matches_any_stem(token, LOWER_CLOTHES_STEMS) {
            lower_color = closest_color(colors, idx).map(str::to_string);
        }
    }

    let generic = if upper_color.is_none() && lower_color.is_none() {
        colors.first().map(|(_, c)| c.to_string())
    } else {
        None
    };

    (upper_color, lower_color, generic)
}

fn matches_any_stem(token: &str, stems: &[&str]) -> bool {
    stems.iter().any(|stem| token.contains(stem))
}

fn closest_color(colors: &[(usize, &'static str)], index: usize) -> Option<&'static str> {
    colors
        .iter()
        .map(|(color_idx, color)| (color_idx.abs_diff(index), *color))
        .filter(|(distance, _)| *distance <= MAX_COLOR_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, color)| color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_filters() {
        let parsed = parse_query("busy intersection at night");
        assert_eq!(parsed.object_type, None);
        assert_eq!(parsed.color, None);
        assert_eq!(parsed.plate, None);
        assert_eq!(parsed.cleaned_text, "busy intersection at night");
    }

    #[test]
    fn red_car_parses_type_and_color() {
        let parsed = parse_query("red car");
        assert_eq!(parsed.object_type, Some(ObjectType::Transport));
        assert_eq!(parsed.color.as_deref(), Some("red"));
        assert!(parsed.has_color_filter());
    }

    #[test]
    fn plate_is_extracted_and_removed_from_text() {
        let parsed = parse_query("white car A123BC77 near the gate");
        assert_eq!(parsed.plate.as_deref(), Some("A123BC77"));
        assert!(!parsed.cleaned_text.contains("123"));
        assert_eq!(parsed.object_type, Some(ObjectType::Transport));
    }

    #[test]
    fn person_clothing_colors_attach_to_regions() {
        let parsed = parse_query("man in a black jacket and blue jeans");
        assert_eq!(parsed.object_type, Some(ObjectType::Person));
        assert_eq!(parsed.upper_color.as_deref(), Some("black"));
        assert_eq!(parsed.lower_color.as_deref(), Some("blue"));
        assert_eq!(parsed.color, None);
    }

    #[test]
    fn person_with_bare_color_keeps_generic_filter() {
        let parsed = parse_query("woman in green");
        assert_eq!(parsed.object_type, Some(ObjectType::Person));
        assert_eq!(parsed.color.as_deref(), Some("green"));
        assert_eq!(parsed.upper_color, None);
    }

    #[test]
    fn ambiguous_type_mentions_cancel_out() {
        let parsed = parse_query("person next to a car");
        assert_eq!(parsed.object_type, None);
    }
}
