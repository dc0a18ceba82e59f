//! Encoded polyline codec.
//!
//! Coordinates are scaled by 1e5, delta-encoded against the previous point,
//! zig-zag folded so the sign lands in bit 0, then emitted as 5-bit groups
//! (least significant first). Every group but the last carries the `0x20`
//! continuation bit and each group is offset by 63 into printable ASCII.

use crate::models::Coordinate;
use thiserror::Error;

const PRECISION: f64 = 1e5;
const ASCII_OFFSET: u8 = 63;
const CONTINUATION_BIT: u64 = 0x20;
const GROUP_MASK: u64 = 0x1f;
const GROUP_BITS: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolylineError {
    #[error("polyline ends mid-value at byte {position}")]
    Truncated { position: usize },

    #[error("invalid polyline byte 0x{byte:02x} at position {position}")]
    InvalidCharacter { position: usize, byte: u8 },

    #[error("polyline value starting at byte {position} overflows 64 bits")]
    Overflow { position: usize },

    #[error("decoded point {index} is out of range: ({lat}, {lng})")]
    OutOfRange { index: usize, lat: f64, lng: f64 },
}

/// Decode a polyline string into coordinates.
///
/// Malformed input is rejected as a whole; a partial prefix is never returned.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::with_capacity(bytes.len() / 4);
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut index = 0;

    while index < bytes.len() {
        let (delta_lat, next) = decode_value(bytes, index)?;
        // A latitude with no longitude after it
        if next >= bytes.len() {
            return Err(PolylineError::Truncated { position: next });
        }
        let (delta_lng, next) = decode_value(bytes, next)?;

        lat = lat
            .checked_add(delta_lat)
            .ok_or(PolylineError::Overflow { position: index })?;
        lng = lng
            .checked_add(delta_lng)
            .ok_or(PolylineError::Overflow { position: index })?;

        let lat_deg = lat as f64 / PRECISION;
        let lng_deg = lng as f64 / PRECISION;
        let coordinate =
            Coordinate::new(lat_deg, lng_deg).map_err(|_| PolylineError::OutOfRange {
                index: coordinates.len(),
                lat: lat_deg,
                lng: lng_deg,
            })?;
        coordinates.push(coordinate);
        index = next;
    }

    Ok(coordinates)
}

/// Read one signed value starting at `start`; returns it with the index of
/// the first byte after it.
fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut index = start;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or(PolylineError::Truncated { position: index })?;
        if !(ASCII_OFFSET..=ASCII_OFFSET + 0x3f).contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                position: index,
                byte,
            });
        }
        if shift >= u64::BITS {
            return Err(PolylineError::Overflow { position: start });
        }

        let group = u64::from(byte - ASCII_OFFSET);
        let bits = group & GROUP_MASK;
        // The last group only partly fits; any bit shifted past 64 is lost
        if (bits << shift) >> shift != bits {
            return Err(PolylineError::Overflow { position: start });
        }
        result |= bits << shift;
        shift += GROUP_BITS;
        index += 1;

        if group & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let magnitude = (result >> 1) as i64;
    let value = if result & 1 == 1 { !magnitude } else { magnitude };
    Ok((value, index))
}

/// Encode coordinates as a polyline string (5 decimal places).
pub fn encode(coordinates: &[Coordinate]) -> String {
    let mut encoded = String::with_capacity(coordinates.len() * 8);
    let mut previous_lat: i64 = 0;
    let mut previous_lng: i64 = 0;

    for coordinate in coordinates {
        let lat = scale(coordinate.lat());
        let lng = scale(coordinate.lng());
        encode_value(lat - previous_lat, &mut encoded);
        encode_value(lng - previous_lng, &mut encoded);
        previous_lat = lat;
        previous_lng = lng;
    }

    encoded
}

fn scale(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}

fn encode_value(delta: i64, out: &mut String) {
    let shifted = delta << 1;
    let mut value = (if delta < 0 { !shifted } else { shifted }) as u64;

    while value >= CONTINUATION_BIT {
        let group = ((value & GROUP_MASK) | CONTINUATION_BIT) as u8;
        out.push(char::from(group + ASCII_OFFSET));
        value >>= GROUP_BITS;
    }
    out.push(char::from(value as u8 + ASCII_OFFSET));
}
