//! Printable bottle label: QR code carrying the private key.
//!
//! The QR payload is the literal `0x`-prefixed hex private key, encoded with
//! the highest error-correction level so a worn physical label still scans.
//! Decoding is not this crate's job: scanners hand the transfer workflow
//! already-decoded text.

use std::fmt;

use alloy_primitives::Address;
use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use zeroize::Zeroizing;

use crate::identity::BottleKey;

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("QR encoding failed: {0:?}")]
    Encode(qrcode::types::QrError),
}

/// A rendered label for one bottle.
pub struct Label {
    pub name: String,
    pub description: String,
    pub capacity: String,
    pub bottle_address: Address,
    payload: Zeroizing<String>,
    code: QrCode,
}

impl Label {
    pub fn new(
        key: &BottleKey,
        name: impl Into<String>,
        description: impl Into<String>,
        capacity: impl Into<String>,
        bottle_address: Address,
    ) -> Result<Self, LabelError> {
        let payload = key.to_hex();
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
            .map_err(LabelError::Encode)?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            capacity: capacity.into(),
            bottle_address,
            payload,
            code,
        })
    }

    /// The exact text a scanner will decode from the printed code.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// SVG rendering of the QR code, suitable for printing.
    pub fn svg(&self) -> String {
        self.code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build()
    }

    /// Compact terminal rendering of the QR code.
    pub fn terminal(&self) -> String {
        self.code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Dark)
            .light_color(unicode::Dense1x2::Light)
            .build()
    }

    /// The textual part of the printed label.
    pub fn sheet(&self) -> String {
        format!(
            "{}\nDescription: {}\nCapacity: {}\nBottle address: {}\nAuthentic product - do not duplicate",
            self.name, self.description, self.capacity, self.bottle_address
        )
    }
}

// The payload is the private key; Debug output redacts it.
impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("capacity", &self.capacity)
            .field("bottle_address", &self.bottle_address)
            .field("payload", &"<redacted>")
            .finish()
    }
}
