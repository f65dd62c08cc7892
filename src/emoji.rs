//! Emoji shortcode substitution
//!
//! Replaces `:shortcode:` sequences with the matching glyph, e.g.
//! `":tada: it's a girl"` becomes `"🎉 it's a girl"`. Unknown shortcodes
//! are left untouched.

use regex::Regex;
use std::sync::OnceLock;

fn shortcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":[a-zA-Z0-9_+\-]+:").expect("shortcode pattern is valid"))
}

/// Substitute every known shortcode in `text`
pub fn parse(text: &str) -> String {
    let pattern = shortcode_pattern();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(m) = pattern.find_at(text, pos) {
        let name = &m.as_str()[1..m.as_str().len() - 1];
        match emojis::get_by_shortcode(name) {
            Some(emoji) => {
                out.push_str(&text[copied..m.start()]);
                out.push_str(emoji.as_str());
                copied = m.end();
                pos = m.end();
            }
            // the closing colon may open the next shortcode
            None => pos = m.end() - 1,
        }
    }

    out.push_str(&text[copied..]);
    out
}
