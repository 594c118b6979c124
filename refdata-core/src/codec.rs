//! Payload codec for entity blobs.
//!
//! Entities are stored as JSON documents of their business fields. The
//! round-trip law holds for those fields; version metadata is skipped on
//! both sides and restored from storage metadata by the read path.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Blob, CodecError, RefDataEntity, RefDataResult};

/// Serialize an entity's business fields into a storage blob.
pub fn serialize<T: RefDataEntity>(entity: &T) -> RefDataResult<Blob> {
    encode(T::TABLE, entity)
}

/// Deserialize a storage blob into an entity with default version metadata.
pub fn deserialize<T: RefDataEntity>(blob: &[u8]) -> RefDataResult<T> {
    decode(T::TABLE, blob)
}

fn encode<V: Serialize>(table: &str, value: &V) -> RefDataResult<Blob> {
    serde_json::to_vec(value).map_err(|e| {
        CodecError::Serialize {
            table: table.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn decode<V: DeserializeOwned>(table: &str, blob: &[u8]) -> RefDataResult<V> {
    serde_json::from_slice(blob).map_err(|e| {
        CodecError::Deserialize {
            table: table.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Desk, RefDataError, User, VersionMeta};
    use chrono::Utc;

    #[test]
    fn test_roundtrip_drops_meta() {
        let mut user = User::new("Evan", "James", "A1", 30);
        user.meta = VersionMeta::fetched(Utc::now(), "loader");

        let blob = serialize(&user).unwrap();
        let back: User = deserialize(&blob).unwrap();

        assert_eq!(back.firstname, "Evan");
        assert_eq!(back.surname, "James");
        assert_eq!(back.desk, "A1");
        assert_eq!(back.age, 30);
        assert_eq!(back.meta, VersionMeta::default());
    }

    #[test]
    fn test_corrupt_blob_is_codec_error() {
        let result: RefDataResult<User> = deserialize(b"\x00not json");
        match result {
            Err(RefDataError::Codec(CodecError::Deserialize { table, .. })) => {
                assert_eq!(table, "Users");
            }
            other => panic!("expected deserialize error, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_mismatch_is_codec_error() {
        let desk = Desk::new("A1", "Rates", "EMEA");
        let blob = serialize(&desk).unwrap();
        let result: RefDataResult<User> = deserialize(&blob);
        assert!(matches!(
            result,
            Err(RefDataError::Codec(CodecError::Deserialize { .. }))
        ));
    }
}
