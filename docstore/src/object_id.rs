use crate::common::{Value, OBJECT_ID_BYTE_LEN, OBJECT_ID_HEX_LEN};
use crate::errors::{ErrorKind, StoreError, StoreResult};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::RngCore;
use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicU32, Ordering};

static PROCESS_RANDOM: Lazy<[u8; 5]> = Lazy::new(|| {
    let mut bytes = [0u8; 5];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::thread_rng().next_u32()));

/// The database-native document identifier: a 12-byte value rendered as a
/// 24-character lowercase hex string in portable form.
///
/// Generated ids are composed of a 4-byte big-endian timestamp (seconds), a
/// 5-byte per-process random value, and a 3-byte monotonically increasing
/// counter, so they are unique across documents and roughly time-ordered.
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::object_id::ObjectId;
///
/// // Auto-generate an id
/// let id = ObjectId::new();
///
/// // Round-trip through the portable hex form
/// let parsed = ObjectId::parse_hex(&id.to_hex())?;
/// assert_eq!(parsed, id);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy, serde::Deserialize, serde::Serialize)]
pub struct ObjectId {
    bytes: [u8; OBJECT_ID_BYTE_LEN],
}

impl ObjectId {
    /// Generates a new unique `ObjectId`.
    pub fn new() -> Self {
        let mut bytes = [0u8; OBJECT_ID_BYTE_LEN];
        let timestamp = Utc::now().timestamp() as u32;
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_RANDOM);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        ObjectId { bytes }
    }

    /// Creates an `ObjectId` from raw bytes.
    pub fn from_bytes(bytes: [u8; OBJECT_ID_BYTE_LEN]) -> Self {
        ObjectId { bytes }
    }

    /// Parses an `ObjectId` from its portable 24-hex-character form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 hexadecimal
    /// characters. Callers that must never fail on malformed input go
    /// through [`to_native`] instead, which degrades to pass-through.
    pub fn parse_hex(hex: &str) -> StoreResult<ObjectId> {
        if hex.len() != OBJECT_ID_HEX_LEN {
            return Err(StoreError::new(
                &format!("Invalid id length: expected {} hex characters, got {}", OBJECT_ID_HEX_LEN, hex.len()),
                ErrorKind::InvalidOperation,
            ));
        }

        let mut bytes = [0u8; OBJECT_ID_BYTE_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| {
                StoreError::new(
                    &format!("Invalid hex character in id: {}", pair),
                    ErrorKind::InvalidOperation,
                )
            })?;
        }
        Ok(ObjectId { bytes })
    }

    /// Returns the portable lowercase hex representation of this id.
    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(OBJECT_ID_HEX_LEN);
        for byte in &self.bytes {
            hex.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            hex.push(char::from_digit((byte & 0x0f) as u32, 16).unwrap_or('0'));
        }
        hex
    }

    /// Returns the raw bytes of this id.
    pub fn bytes(&self) -> &[u8; OBJECT_ID_BYTE_LEN] {
        &self.bytes
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Returns true if the string is eligible for native id conversion:
/// exactly 24 hexadecimal characters.
pub fn looks_like_object_id(value: &str) -> bool {
    value.len() == OBJECT_ID_HEX_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Converts a portable value to its database-native id form where possible.
///
/// A string of exactly 24 hexadecimal characters becomes a [Value::Id]. Any
/// other value, including malformed id-like strings, passes through
/// unchanged; conversion never fails. This keeps non-hex id schemes
/// (arbitrary strings, numbers, already-native ids) working transparently.
pub fn to_native(value: Value) -> Value {
    if let Value::String(ref s) = value {
        if looks_like_object_id(s) {
            match ObjectId::parse_hex(s) {
                Ok(id) => return Value::Id(id),
                // malformed input degrades to pass-through, never an error
                Err(_) => return value,
            }
        }
    }
    value
}

/// Converts a native or other id value to its portable string form.
///
/// A [Value::Id] yields its hex representation; everything else is
/// stringified with default conversion.
pub fn to_portable(value: &Value) -> String {
    match value {
        Value::Id(id) => id.to_hex(),
        other => other.to_string(),
    }
}
