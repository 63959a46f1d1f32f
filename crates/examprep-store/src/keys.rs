//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in column families.

use chrono::{DateTime, Utc};
use examprep_core::{PaperId, TransactionId, UserId};

/// Create a user key from a user ID.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a contact index key (email or phone).
#[must_use]
pub fn contact_key(contact: &str) -> Vec<u8> {
    contact.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, transactions for a user will be sorted by time.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all rows of a user in a by-user index.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the transaction ID from a user-transaction index key.
///
/// Returns `None` if the key is shorter than 32 bytes.
#[must_use]
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

/// Create a user-paper index key.
///
/// Format: `user_id (16 bytes) || created_at millis (8 bytes, big endian) || paper_id (16 bytes)`
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn user_paper_key(user_id: &UserId, created_at: DateTime<Utc>, paper_id: &PaperId) -> Vec<u8> {
    // Flip the sign bit so that negative timestamps sort before positive ones.
    let millis = (created_at.timestamp_millis() as u64) ^ (1 << 63);
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(paper_id.as_bytes());
    key
}

/// Extract the paper ID from a user-paper index key.
///
/// Returns `None` if the key is shorter than 40 bytes.
#[must_use]
pub fn extract_paper_id_from_user_key(key: &[u8]) -> Option<PaperId> {
    let bytes: [u8; 16] = key.get(24..40)?.try_into().ok()?;
    Some(PaperId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Create a key for any UUID-backed record.
#[must_use]
pub fn uuid_key(uuid: &uuid::Uuid) -> Vec<u8> {
    uuid.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_length() {
        let user_id = UserId::generate();
        let key = user_key(&user_id);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn user_transaction_key_format() {
        let user_id = UserId::generate();
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user_id, &tx_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(&key[16..], tx_id.to_bytes());
        assert_eq!(extract_transaction_id_from_user_key(&key), Some(tx_id));
        assert_eq!(extract_transaction_id_from_user_key(&key[..20]), None);
    }

    #[test]
    fn user_paper_keys_sort_by_creation() {
        let user_id = UserId::generate();
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::seconds(1);
        let a = user_paper_key(&user_id, earlier, &PaperId::generate());
        let b = user_paper_key(&user_id, later, &PaperId::generate());
        assert!(a < b);
        assert!(a.starts_with(&user_prefix(&user_id)));
    }

    #[test]
    fn extract_paper_id_roundtrip() {
        let user_id = UserId::generate();
        let paper_id = PaperId::generate();
        let key = user_paper_key(&user_id, Utc::now(), &paper_id);
        assert_eq!(extract_paper_id_from_user_key(&key), Some(paper_id));
    }
}
