//! HSV colour matching.
//!
//! Scores how well a stored HSV signature matches a named base colour.
//! Chromatic colours are judged primarily on circular hue distance with
//! soft saturation/value gates (shadows and highlights on real footage move
//! S and V a lot); white/gray/black are judged on S/V alone; brown gets its
//! own stricter gates since it is mostly a dark orange.

use crate::domain::HsvColor;

/// Reference hues in degrees for the chromatic colours.
const HUE_REF: &[(&str, f64)] = &[
    ("red", 0.0),
    ("orange", 30.0),
    ("yellow", 55.0),
    ("green", 120.0),
    ("blue", 220.0),
    ("purple", 275.0),
    ("brown", 25.0),
];

/// Score in `[0, 1]` for how well `color` matches the named `query_color`.
/// Unknown colour names score 0.
pub fn color_score(query_color: &str, color: HsvColor) -> f64 {
    let name = query_color.trim().to_lowercase();
    let h = f64::from(color.h).clamp(0.0, 360.0);
    let s = f64::from(color.s).clamp(0.0, 1.0);
    let v = f64::from(color.v).clamp(0.0, 1.0);

    match name.as_str() {
        "white" => white_score(s, v),
        "gray" => gray_score(s, v),
        "black" => black_score(v),
        "pink" => chromatic_score(330.0, false, h, s, v),
        _ => match HUE_REF.iter().find(|(n, _)| *n == name) {
            Some((_, ref_h)) => chromatic_score(*ref_h, name == "brown", h, s, v),
            None => 0.0,
        },
    }
}

fn circular_hue_distance(h: f64, ref_h: f64) -> f64 {
    let raw = (h - ref_h).abs();
    raw.min(360.0 - raw)
}

/// Linear falloff: 1.0 at 0 degrees, 0.0 from 40 degrees on.
fn hue_score(d_h: f64) -> f64 {
    if d_h >= 40.0 {
        return 0.0;
    }
    1.0 - d_h / 40.0
}

fn chromatic_s_score(s: f64) -> f64 {
    if s <= 0.05 {
        0.0
    } else if s >= 0.5 {
        1.0
    } else {
        (s - 0.05) / (0.5 - 0.05)
    }
}

fn chromatic_v_score(v: f64) -> f64 {
    if v <= 0.1 {
        0.4
    } else if v <= 0.4 {
        0.4 + (v - 0.1) * (1.0 - 0.4) / (0.4 - 0.1)
    } else if v <= 0.8 {
        1.0
    } else if v <= 0.95 {
        1.0 - (v - 0.8) * (1.0 - 0.5) / (0.95 - 0.8)
    } else {
        0.5
    }
}

/// Brown needs brightness in a narrow band: too dark reads as black, too
/// bright as orange.
fn brown_v_score(v: f64) -> f64 {
    if v <= 0.1 || v >= 0.8 {
        0.0
    } else if v <= 0.4 {
        (v - 0.1) / (0.4 - 0.1)
    } else {
        (0.8 - v) / (0.8 - 0.4)
    }
}

fn brown_s_score(s: f64) -> f64 {
    if s <= 0.3 {
        0.0
    } else if s >= 0.8 {
        1.0
    } else {
        (s - 0.3) / (0.8 - 0.3)
    }
}

fn chromatic_score(ref_h: f64, is_brown: bool, h: f64, s: f64, v: f64) -> f64 {
    let hue_component = hue_score(circular_hue_distance(h, ref_h));

    let score = if is_brown {
        hue_component * brown_s_score(s) * brown_v_score(v)
    } else {
        // Averaging S and V keeps a shadowed but clearly saturated colour
        // from collapsing to zero on brightness alone.
        let sv = (chromatic_s_score(s) + chromatic_v_score(v)) / 2.0;
        hue_component * sv
    };

    score.clamp(0.0, 1.0)
}

fn white_score(s: f64, v: f64) -> f64 {
    let s_component = if s <= 0.1 {
        1.0
    } else if s >= 0.4 {
        0.0
    } else {
        1.0 - (s - 0.1) / (0.4 - 0.1)
    };

    let v_component = if v <= 0.4 {
        0.0
    } else if v >= 0.7 {
        1.0
    } else {
        (v - 0.4) / (0.7 - 0.4)
    };

    (s_component * v_component).clamp(0.0, 1.0)
}

fn gray_score(s: f64, v: f64) -> f64 {
    let s_component = if s <= 0.0 {
        1.0
    } else if s >= 0.4 {
        0.0
    } else {
        1.0 - s / 0.4
    };

    // Triangular around mid brightness.
    let v_component = if v <= 0.2 || v >= 0.9 {
        0.0
    } else if v <= 0.5 {
        (v - 0.2) / (0.5 - 0.2)
    } else {
        (0.9 - v) / (0.9 - 0.5)
    };

    (s_component * v_component).clamp(0.0, 1.0)
}

fn black_score(v: f64) -> f64 {
    if v <= 0.12 {
        1.0
    } else if v >= 0.5 {
        0.0
    } else {
        1.0 - (v - 0.12) / (0.5 - 0.12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsv(h: f32, s: f32, v: f32) -> HsvColor {
        HsvColor { h, s, v }
    }

    #[test]
    fn saturated_red_scores_high_for_red() {
        assert!(color_score("red", hsv(2.0, 0.8, 0.6)) > 0.9);
    }

    #[test]
    fn red_scores_zero_for_blue() {
        assert_eq!(color_score("blue", hsv(2.0, 0.8, 0.6)), 0.0);
    }

    #[test]
    fn hue_wraps_around_for_red() {
        // 355 degrees is 5 degrees from red's reference at 0.
        assert!(color_score("red", hsv(355.0, 0.9, 0.6)) > 0.8);
    }

    #[test]
    fn dark_pixel_matches_black_not_white() {
        let dark = hsv(0.0, 0.05, 0.08);
        assert_eq!(color_score("black", dark), 1.0);
        assert_eq!(color_score("white", dark), 0.0);
    }

    #[test]
    fn bright_desaturated_pixel_matches_white() {
        let bright = hsv(0.0, 0.03, 0.9);
        assert!(color_score("white", bright) > 0.9);
        assert_eq!(color_score("black", bright), 0.0);
    }

    #[test]
    fn unknown_color_scores_zero() {
        assert_eq!(color_score("chartreuse", hsv(90.0, 0.8, 0.6)), 0.0);
    }
}
