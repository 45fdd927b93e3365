//! Message codec: a stable per-schema name plus CDR-style (de)serialization
//! (spec §3 "Message codec", grounded on `ros2_types::traits::CdrSerde`).

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// CDR encapsulation header: representation id (CDR_LE) + two reserved bytes.
const CDR_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// A user-facing message type: a stable schema name plus wire (de)serialization.
///
/// A blanket implementation is provided for any `T: Serialize + DeserializeOwned`,
/// so ordinary serde-derived structs implement `Message` for free.
pub trait Message: Send + Sync + 'static {
    /// A stable name identifying this schema, used only for discovery metadata
    /// (the liveliness key's trailing type segment) and diagnostics.
    fn schema_name() -> &'static str
    where
        Self: Sized;

    fn to_bytes(&self) -> Result<Vec<u8>>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

impl<T> Message for T
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn schema_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(CDR_HEADER.len());
        buf.extend_from_slice(&CDR_HEADER);
        let body = cdr_encoding::to_vec(self).map_err(|e| Error::Type(format!("cdr encode failed: {e}")))?;
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CDR_HEADER.len() {
            return Err(Error::Type("payload shorter than cdr header".to_string()));
        }
        cdr_encoding::from_bytes(&bytes[CDR_HEADER.len()..])
            .map(|(value, _size): (Self, usize)| value)
            .map_err(|e| Error::Type(format!("cdr decode failed: {e}")))
    }
}

/// Bundles the nested request/response schemas a service requires (spec §4.7).
pub trait ServiceSchema: Send + Sync + 'static {
    type Request: Message;
    type Response: Message;
}

/// Bundles the nested goal/result/feedback schemas an action requires (spec §4.8).
///
/// `Result` additionally requires `Clone + Default`: `Clone` because a
/// terminal result must be handed back to every `get_result` caller, not
/// consumed by the first; `Default` because an execute callback that returns
/// without reaching a terminal state is auto-aborted with a default result
/// (spec §9).
pub trait ActionSchema: Send + Sync + 'static {
    type Goal: Message;
    type Result: Message + Clone + Default;
    type Feedback: Message;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: f64,
        y: f64,
    }

    #[test]
    fn roundtrip_struct() {
        let p = Point { x: 1.5, y: -2.0 };
        let bytes = p.to_bytes().unwrap();
        let back = Point::from_bytes(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn short_payload_is_type_error() {
        let err = Point::from_bytes(&[0, 1]).unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }
}
