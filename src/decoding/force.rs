/// Load cell force extraction from decoded text messages
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{ForceValues, Measure};

lazy_static! {
    static ref MIN_FORCE: Regex = Regex::new(r"min force:\s*(?P<value>-?\d+(?:\.\d+)?)").unwrap();
    static ref MAX_FORCE: Regex = Regex::new(r"max force:\s*(?P<value>-?\d+(?:\.\d+)?)").unwrap();
    static ref MEAN_FORCE: Regex = Regex::new(r"mean force:\s*(?P<value>-?\d+(?:\.\d+)?)").unwrap();
}

fn capture(pattern: &Regex, text: &str) -> Measure {
    pattern
        .captures(text)
        .and_then(|caps| caps.name("value"))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .into()
}

// Unicode format characters (category Cf)
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{AD}'
            | '\u{600}'..='\u{605}'
            | '\u{61C}'
            | '\u{6DD}'
            | '\u{70F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

/// Printable in the usual sense: no controls, no format characters and
/// no whitespace other than a plain space.
fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace() || is_format(c))
}

/// Extract `min force:`, `max force:` and `mean force:` values.
///
/// Non-printable characters are stripped first. Each field is searched for
/// independently; a missing field is `Measure::Absent`.
pub fn extract_force_values(text: &str) -> ForceValues {
    let cleaned: String = text.chars().filter(|&c| is_printable(c)).collect();

    ForceValues {
        min: capture(&MIN_FORCE, &cleaned),
        max: capture(&MAX_FORCE, &cleaned),
        mean: capture(&MEAN_FORCE, &cleaned),
    }
}
