//! Physical reference objects a participant can hold against the screen.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Width of an ID-1 card (credit card) in millimetres.
pub const CREDIT_CARD_WIDTH_MM: f64 = 85.60;

/// Height of an ID-1 card (credit card) in millimetres.
pub const CREDIT_CARD_HEIGHT_MM: f64 = 53.98;

/// Mapping from preset names to (width_mm, height_mm).
pub static REFERENCE_OBJECTS: Lazy<HashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // ISO/IEC 7810 ID-1: bank cards, driving licences, ID cards
    m.insert("credit_card", (CREDIT_CARD_WIDTH_MM, CREDIT_CARD_HEIGHT_MM));
    m.insert("id_card", (CREDIT_CARD_WIDTH_MM, CREDIT_CARD_HEIGHT_MM));
    m.insert("信用卡", (CREDIT_CARD_WIDTH_MM, CREDIT_CARD_HEIGHT_MM));
    m.insert("身份证", (CREDIT_CARD_WIDTH_MM, CREDIT_CARD_HEIGHT_MM));

    // Compact disc
    m.insert("cd", (120.0, 120.0));

    // Paper
    m.insert("a4", (210.0, 297.0));
    m.insert("letter", (215.9, 279.4));

    // Banknotes
    m.insert("euro_10", (127.0, 67.0));
    m.insert("us_dollar", (156.0, 66.3));

    m
});

/// Get the dimensions of a reference object by preset name.
pub fn get_reference(name: &str) -> Option<(f64, f64)> {
    REFERENCE_OBJECTS
        .get(name)
        .or_else(|| REFERENCE_OBJECTS.get(name.to_lowercase().as_str()))
        .copied()
}
