//! Entity extraction: ordered regex lists per entity type, run against the
//! original (case-preserving) text. The first matching pattern wins for each
//! type; extraction never fails, it just leaves fields empty.

use regex::Regex;
use serde::Serialize;

use crate::patterns::PatternLibrary;

/// Entities pulled from one utterance. Absent fields are omitted from the
/// serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_reference: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub urgency: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Entities {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.quantity.is_none()
            && self.product_name.is_none()
            && self.order_number.is_none()
            && self.shipment_number.is_none()
            && self.location.is_none()
            && self.time_reference.is_none()
            && !self.urgency
    }
}

// Capture words that are never product names on their own.
const PRODUCT_STOPWORDS: &[&str] = &[
    "stock",
    "inventory",
    "any",
    "some",
    "item",
    "items",
    "product",
    "products",
    "goods",
    "stuff",
    "unit",
    "units",
    "the",
    "order",
    "shipment",
    "everything",
    "anything",
];

/// Extract all entity types from `text`.
pub fn extract(lib: &PatternLibrary, text: &str) -> Entities {
    let pats = lib.entity_patterns();
    Entities {
        sku: first_capture(&pats.sku, text).map(|s| s.to_uppercase()),
        quantity: extract_quantity(&pats.quantity, text),
        product_name: extract_product_name(&pats.product_name, text),
        order_number: first_capture(&pats.order_number, text).map(|s| s.to_uppercase()),
        shipment_number: first_capture(&pats.shipment_number, text).map(|s| s.to_uppercase()),
        location: first_capture(&pats.location, text).map(|s| s.to_uppercase()),
        time_reference: first_capture(&pats.time_reference, text).map(|s| s.to_lowercase()),
        urgency: lib.tone().urgency.is_match(text),
    }
}

/// First non-empty capture across an ordered pattern list.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    for re in patterns {
        if let Some(caps) = re.captures(text) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(0)) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Quantities that fail to parse as `u32` are discarded and the next
/// pattern gets a chance.
fn extract_quantity(patterns: &[Regex], text: &str) -> Option<u32> {
    for re in patterns {
        if let Some(caps) = re.captures(text) {
            if let Some(m) = caps.get(1) {
                if let Ok(n) = m.as_str().parse::<u32>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

fn extract_product_name(patterns: &[Regex], text: &str) -> Option<String> {
    let trimmed = text.trim();
    for re in patterns {
        if let Some(caps) = re.captures(trimmed) {
            if let Some(m) = caps.get(1) {
                if let Some(name) = clean_product_name(m.as_str()) {
                    return Some(name);
                }
            }
        }
    }
    None
}

/// Strip punctuation, reject stopwords and too-short captures, title-case
/// the rest.
fn clean_product_name(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '?' | '!' | '.' | ','))
        .collect();
    let trimmed = stripped.trim();
    if trimmed.len() < 3 {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if PRODUCT_STOPWORDS.contains(&lower.as_str()) {
        return None;
    }
    Some(title_case(trimmed))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
