//! Configuration module for the chinrest calibration.

mod i18n;
mod references;

pub use i18n::{get_messages, Messages};
pub use references::{
    get_reference, CREDIT_CARD_HEIGHT_MM, CREDIT_CARD_WIDTH_MM, REFERENCE_OBJECTS,
};
