//! Utterance normalization: lowercase, whitespace collapse, contraction
//! expansion and synonym folding. The original text is kept alongside the
//! normalized form because entity extraction wants the original casing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::patterns::PatternLibrary;

/// An input utterance in both its original and normalized forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub raw: String,
    pub normalized: String,
}

// Fixed contraction table, applied on the lowercased text.
const CONTRACTIONS: &[(&str, &str)] = &[
    ("don't", "do not"),
    ("dont", "do not"),
    ("doesn't", "does not"),
    ("doesnt", "does not"),
    ("didn't", "did not"),
    ("didnt", "did not"),
    ("can't", "cannot"),
    ("cant", "cannot"),
    ("won't", "will not"),
    ("wont", "will not"),
    ("isn't", "is not"),
    ("isnt", "is not"),
    ("aren't", "are not"),
    ("arent", "are not"),
    ("we're", "we are"),
    ("we've", "we have"),
    ("i'm", "i am"),
    ("it's", "it is"),
    ("what's", "what is"),
    ("whats", "what is"),
    ("there's", "there is"),
    ("theres", "there is"),
    ("how's", "how is"),
    ("let's", "let us"),
];

static CONTRACTION_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CONTRACTIONS
        .iter()
        .map(|(pat, rep)| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(pat)))
                .expect("contraction table regex");
            (re, *rep)
        })
        .collect()
});

/// Normalize `text` against `lib`'s synonym table.
pub fn prepare(lib: &PatternLibrary, text: &str) -> Utterance {
    let mut normalized = condense(text);
    for (re, replacement) in CONTRACTION_RES.iter() {
        if re.is_match(&normalized) {
            normalized = re.replace_all(&normalized, *replacement).into_owned();
        }
    }
    for (re, canonical) in lib.synonyms() {
        if re.is_match(&normalized) {
            normalized = re.replace_all(&normalized, canonical.as_str()).into_owned();
        }
    }
    Utterance {
        raw: text.to_string(),
        normalized,
    }
}

/// Lowercase and collapse runs of whitespace to single spaces.
fn condense(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = true;
    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            for low in ch.to_lowercase() {
                out.push(low);
            }
            last_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}
