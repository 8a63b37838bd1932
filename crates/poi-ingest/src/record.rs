//! Point-of-interest record as exchanged between peers
//!
//! The struct doubles as the protobuf wire message: each field carries its
//! tag so a frame payload decodes straight into a [`Record`].

use poi_common::checksum::sha256_hex;
use serde::{Deserialize, Serialize};

/// One point-of-interest observation received from a peer
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Sending device number; scopes "latest known" lookups
    #[prost(string, tag = "1")]
    pub source_id: String,
    #[prost(string, tag = "2")]
    pub subscriber_id: String,
    #[prost(double, tag = "3")]
    pub latitude: f64,
    #[prost(double, tag = "4")]
    pub longitude: f64,
    /// Epoch milliseconds
    #[prost(int64, tag = "5")]
    pub timestamp: i64,
    #[prost(string, tag = "6")]
    pub timezone: String,
    #[prost(string, tag = "7")]
    pub title: String,
    #[prost(string, tag = "8")]
    pub description: String,
    #[prost(string, tag = "9")]
    pub category: String,
    /// Reference to the photo attached on the sending device
    #[prost(string, tag = "10")]
    pub photo: String,
}

impl Record {
    /// Content hash the store uses as its uniqueness key.
    ///
    /// Fields are length-prefixed before hashing so adjacent strings cannot
    /// shift bytes between each other and collide.
    pub fn content_hash(&self) -> String {
        let mut canonical = Vec::with_capacity(128);

        for text in [
            &self.source_id,
            &self.subscriber_id,
            &self.timezone,
            &self.title,
            &self.description,
            &self.category,
            &self.photo,
        ] {
            canonical.extend_from_slice(&(text.len() as u64).to_le_bytes());
            canonical.extend_from_slice(text.as_bytes());
        }
        canonical.extend_from_slice(&self.latitude.to_bits().to_le_bytes());
        canonical.extend_from_slice(&self.longitude.to_bits().to_le_bytes());
        canonical.extend_from_slice(&self.timestamp.to_le_bytes());

        sha256_hex(&canonical)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use prost::Message;

    fn sample() -> Record {
        Record {
            source_id: "555-0100".to_string(),
            subscriber_id: "sid-1".to_string(),
            latitude: -34.9285,
            longitude: 138.6007,
            timestamp: 1_350_000_000_000,
            timezone: "Australia/Adelaide".to_string(),
            title: "Water point".to_string(),
            description: "Tank behind the hall".to_string(),
            category: "water".to_string(),
            photo: "IMG_0042.jpg".to_string(),
        }
    }

    #[test]
    fn test_hash_is_stable_and_field_sensitive() {
        let record = sample();
        assert_eq!(record.content_hash(), sample().content_hash());
        assert_eq!(record.content_hash().len(), 64);

        let mut moved = sample();
        moved.latitude += 0.0001;
        assert_ne!(record.content_hash(), moved.content_hash());
    }

    #[test]
    fn test_hash_separates_adjacent_fields() {
        let mut a = sample();
        a.title = "ab".to_string();
        a.description = "c".to_string();
        let mut b = sample();
        b.title = "a".to_string();
        b.description = "bc".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_wire_tags() {
        let record = Record {
            source_id: "1".to_string(),
            timestamp: 5,
            ..Default::default()
        };
        // tag 1 length-delimited "1", tag 5 varint 5
        assert_eq!(record.encode_to_vec(), vec![0x0a, 0x01, b'1', 0x28, 0x05]);
    }

    #[test]
    fn test_json_defaults_missing_fields() {
        let record: Record =
            serde_json::from_str(r#"{"source_id":"555-0100","timestamp":42}"#).unwrap();
        assert_eq!(record.timestamp, 42);
        assert!(record.title.is_empty());
    }
}
