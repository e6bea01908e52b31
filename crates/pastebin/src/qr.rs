//! QR codes for server and paste URLs.

use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};

use crate::error::{AppError, Result};

fn encode(url: &str) -> Result<QrCode> {
    QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|e| AppError::Encoding(e.to_string()))
}

/// Renders `url` with half-height block characters for the terminal.
///
/// # Errors
///
/// Returns `AppError::Encoding` if the URL does not fit in a QR code.
pub fn terminal(url: &str) -> Result<String> {
    Ok(encode(url)?
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Renders `url` as an inline `<svg>` element.
///
/// # Errors
///
/// Returns `AppError::Encoding` if the URL does not fit in a QR code.
pub fn svg(url: &str) -> Result<String> {
    let document = encode(url)?
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .quiet_zone(true)
        .build();
    // Drop the XML prolog so the element can sit inside HTML.
    Ok(document
        .find("<svg")
        .map_or_else(|| document.clone(), |start| document[start..].to_string()))
}
