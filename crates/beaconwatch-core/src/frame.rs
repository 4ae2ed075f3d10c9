//! Eddystone frame decoding.
//!
//! Service data published under the Eddystone UUID (`0xFEAA`) starts with a
//! frame type byte:
//!
//! | Byte   | Frame | Layout after the type byte                        |
//! |--------|-------|---------------------------------------------------|
//! | `0x00` | UID   | tx power, 10-byte namespace, 6-byte instance, RFU |
//! | `0x10` | URL   | tx power, scheme prefix, encoded URL              |
//! | `0x20` | TLM   | version, version-specific telemetry               |
//! | `0x30` | EID   | tx power, 8-byte ephemeral identifier             |
//!
//! [`decode`] never fails: anything it cannot classify becomes
//! [`Frame::Unknown`].

use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetryReadings;

/// Frame type byte of a UID frame.
pub const FRAME_TYPE_UID: u8 = 0x00;
/// Frame type byte of a URL frame.
pub const FRAME_TYPE_URL: u8 = 0x10;
/// Frame type byte of a TLM frame.
pub const FRAME_TYPE_TLM: u8 = 0x20;
/// Frame type byte of an EID frame.
pub const FRAME_TYPE_EID: u8 = 0x30;

const UID_MIN_LEN: usize = 18;
const EID_MIN_LEN: usize = 10;
const URL_MIN_LEN: usize = 3;
const TLM_MIN_LEN: usize = 2;

/// URL scheme prefixes, indexed by the scheme byte.
const URL_SCHEMES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];

/// URL expansion codes, indexed by the encoded byte.
const URL_EXPANSIONS: [&str; 14] = [
    ".com/", ".org/", ".edu/", ".net/", ".info/", ".biz/", ".gov/", ".com", ".org", ".edu",
    ".net", ".info", ".biz", ".gov",
];

/// A decoded Eddystone frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Eddystone-UID.
    Uid(UidFrame),
    /// Eddystone-EID.
    Eid(EidFrame),
    /// Eddystone-URL.
    Url(UrlFrame),
    /// Eddystone-TLM.
    Telemetry(TelemetryFrame),
    /// Too short, unknown type, or an invalid URL scheme.
    Unknown,
}

/// UID frame contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidFrame {
    /// Calibrated tx power at 0 m.
    pub tx_power: i8,
    /// Namespace identifier.
    pub namespace: [u8; 10],
    /// Instance identifier.
    pub instance: [u8; 6],
}

/// EID frame contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EidFrame {
    /// Calibrated tx power at 0 m.
    pub tx_power: i8,
    /// Ephemeral identifier, opaque.
    pub ephemeral_id: [u8; 8],
}

/// URL frame contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFrame {
    /// Calibrated tx power at 0 m.
    pub tx_power: i8,
    /// Expanded URL.
    pub url: String,
}

/// TLM frame contents, kept as the raw service data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TelemetryFrame {
    data: Vec<u8>,
}

impl TelemetryFrame {
    /// Wrap raw TLM service data.
    #[must_use]
    pub const fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The raw service data, frame type byte included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// TLM version byte.
    #[must_use]
    pub fn version(&self) -> Option<u8> {
        self.data.get(1).copied()
    }

    /// Decode unencrypted telemetry fields.
    ///
    /// Returns `None` for encrypted or truncated telemetry.
    #[must_use]
    pub fn readings(&self) -> Option<TelemetryReadings> {
        TelemetryReadings::parse(&self.data)
    }
}

/// Decode Eddystone service data.
#[must_use]
pub fn decode(service_data: &[u8]) -> Frame {
    let Some(&frame_type) = service_data.first() else {
        return Frame::Unknown;
    };

    match frame_type {
        FRAME_TYPE_UID => decode_uid(service_data),
        FRAME_TYPE_EID => decode_eid(service_data),
        FRAME_TYPE_URL => decode_url(service_data),
        FRAME_TYPE_TLM if service_data.len() >= TLM_MIN_LEN => {
            Frame::Telemetry(TelemetryFrame::new(service_data.to_vec()))
        }
        _ => Frame::Unknown,
    }
}

fn decode_uid(data: &[u8]) -> Frame {
    if data.len() < UID_MIN_LEN {
        return Frame::Unknown;
    }
    let mut namespace = [0u8; 10];
    namespace.copy_from_slice(&data[2..12]);
    let mut instance = [0u8; 6];
    instance.copy_from_slice(&data[12..18]);

    Frame::Uid(UidFrame {
        tx_power: tx_power(data[1]),
        namespace,
        instance,
    })
}

fn decode_eid(data: &[u8]) -> Frame {
    if data.len() < EID_MIN_LEN {
        return Frame::Unknown;
    }
    let mut ephemeral_id = [0u8; 8];
    ephemeral_id.copy_from_slice(&data[2..10]);

    Frame::Eid(EidFrame {
        tx_power: tx_power(data[1]),
        ephemeral_id,
    })
}

fn decode_url(data: &[u8]) -> Frame {
    if data.len() < URL_MIN_LEN {
        return Frame::Unknown;
    }
    let Some(scheme) = URL_SCHEMES.get(usize::from(data[2])) else {
        return Frame::Unknown;
    };

    let mut url = String::from(*scheme);
    for &byte in &data[3..] {
        match URL_EXPANSIONS.get(usize::from(byte)) {
            Some(expansion) => url.push_str(expansion),
            None => url.push(char::from(byte)),
        }
    }

    Frame::Url(UrlFrame {
        tx_power: tx_power(data[1]),
        url,
    })
}

#[allow(clippy::cast_possible_wrap)]
const fn tx_power(byte: u8) -> i8 {
    byte as i8
}

/// Encode a URL into the scheme byte plus compressed body of a URL frame.
///
/// Expansion codes are matched longest first. Returns `None` when the URL
/// has no supported scheme prefix or contains non-ASCII characters.
#[must_use]
pub fn encode_url(url: &str) -> Option<Vec<u8>> {
    // Longest scheme first so "http://www." wins over "http://".
    let (scheme, rest) = [1u8, 0, 3, 2].iter().find_map(|&code| {
        url.strip_prefix(URL_SCHEMES[usize::from(code)])
            .map(|rest| (code, rest))
    })?;
    if !rest.is_ascii() {
        return None;
    }

    let mut encoded = vec![scheme];
    let mut remaining = rest;
    while !remaining.is_empty() {
        let expansion = URL_EXPANSIONS
            .iter()
            .enumerate()
            .filter(|(_, text)| remaining.starts_with(*text))
            .max_by_key(|(_, text)| text.len());

        match expansion {
            Some((code, text)) => {
                #[allow(clippy::cast_possible_truncation)]
                encoded.push(code as u8);
                remaining = &remaining[text.len()..];
            }
            None => {
                encoded.push(remaining.as_bytes()[0]);
                remaining = &remaining[1..];
            }
        }
    }

    Some(encoded)
}

/// Build complete URL frame service data for `url`.
#[must_use]
pub fn url_frame_bytes(tx_power: i8, url: &str) -> Option<Vec<u8>> {
    let encoded = encode_url(url)?;
    let mut data = Vec::with_capacity(encoded.len() + 2);
    data.push(FRAME_TYPE_URL);
    data.extend_from_slice(&tx_power.to_be_bytes());
    data.extend(encoded);
    Some(data)
}
