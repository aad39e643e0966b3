//! Stake lifecycle tracking: pure data the engine emits and consumes.
//!
//! Records live in an arena keyed by stake transaction hash with a
//! secondary index from the change output key, so matching a returning
//! PROTOCOL transaction is a lookup rather than a back-pointer chase.
//!
//! The JSON encoding is a storage contract: 64-bit integers travel as
//! base-10 strings, optional 32-byte keys as nullable hex.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use salvium_types::TxType;

use crate::hash::tx_hash;
use crate::types::Transaction;
use crate::TxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    Locked,
    Returned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    #[serde(rename = "stakeTxHash", with = "hex_key")]
    pub stake_tx_hash: [u8; 32],
    #[serde(rename = "stakeHeight", with = "string_u64")]
    pub stake_height: u64,
    #[serde(rename = "amountStaked", with = "string_u64")]
    pub amount_staked: u64,
    #[serde(rename = "changeOutputKey", with = "hex_key")]
    pub change_output_key: [u8; 32],
    pub status: StakeStatus,
    #[serde(rename = "returnTxHash", with = "opt_hex_key", default)]
    pub return_tx_hash: Option<[u8; 32]>,
    #[serde(rename = "returnHeight", with = "opt_string_u64", default)]
    pub return_height: Option<u64>,
    #[serde(rename = "returnAmount", with = "opt_string_u64", default)]
    pub return_amount: Option<u64>,
}

/// Event the builder side emits when a stake transaction is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeEvent {
    pub stake_tx_hash: [u8; 32],
    pub stake_height: u64,
    pub amount_staked: u64,
    pub change_output_key: [u8; 32],
}

impl StakeEvent {
    /// Derive the event from a freshly built stake transaction.
    pub fn from_transaction(tx: &Transaction, height: u64) -> Result<Option<Self>, TxError> {
        if tx.prefix.tx_type != TxType::Stake {
            return Ok(None);
        }
        let change_output_key = tx
            .prefix
            .outputs
            .first()
            .map(|o| *o.key())
            .ok_or_else(|| TxError::InvalidInput("stake tx without its change output".into()))?;
        Ok(Some(Self {
            stake_tx_hash: tx_hash(tx)?,
            stake_height: height,
            amount_staked: tx.prefix.amount_burnt,
            change_output_key,
        }))
    }
}

/// Event the validator side emits when a PROTOCOL transaction pays a
/// tracked stake back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnEvent {
    pub stake_tx_hash: [u8; 32],
    pub return_tx_hash: [u8; 32],
    pub return_height: u64,
    pub return_amount: u64,
}

/// Arena of stake records with hash and change-output-key indexes.
#[derive(Default)]
pub struct StakeLedger {
    records: Vec<StakeRecord>,
    by_hash: HashMap<[u8; 32], usize>,
    by_change_key: HashMap<[u8; 32], usize>,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a record.
    pub fn put_stake(&mut self, record: StakeRecord) {
        match self.by_hash.get(&record.stake_tx_hash) {
            Some(&idx) => {
                self.by_change_key.remove(&self.records[idx].change_output_key);
                self.by_change_key.insert(record.change_output_key, idx);
                self.records[idx] = record;
            }
            None => {
                let idx = self.records.len();
                self.by_hash.insert(record.stake_tx_hash, idx);
                self.by_change_key.insert(record.change_output_key, idx);
                self.records.push(record);
            }
        }
    }

    /// Record a fresh stake from its builder event.
    pub fn record_stake(&mut self, event: &StakeEvent) {
        self.put_stake(StakeRecord {
            stake_tx_hash: event.stake_tx_hash,
            stake_height: event.stake_height,
            amount_staked: event.amount_staked,
            change_output_key: event.change_output_key,
            status: StakeStatus::Locked,
            return_tx_hash: None,
            return_height: None,
            return_amount: None,
        });
    }

    pub fn get_stake(&self, stake_tx_hash: &[u8; 32]) -> Option<&StakeRecord> {
        self.by_hash.get(stake_tx_hash).map(|&i| &self.records[i])
    }

    pub fn get_stakes(&self, status: Option<StakeStatus>) -> Vec<&StakeRecord> {
        self.records
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect()
    }

    /// Look up a stake by the change output key a PROTOCOL return pays to.
    pub fn match_change_key(&self, change_output_key: &[u8; 32]) -> Option<&StakeRecord> {
        self.by_change_key
            .get(change_output_key)
            .map(|&i| &self.records[i])
    }

    /// Mark a stake as paid out. Returns false for unknown hashes.
    pub fn mark_stake_returned(&mut self, event: &ReturnEvent) -> bool {
        let Some(&idx) = self.by_hash.get(&event.stake_tx_hash) else {
            return false;
        };
        let record = &mut self.records[idx];
        record.status = StakeStatus::Returned;
        record.return_tx_hash = Some(event.return_tx_hash);
        record.return_height = Some(event.return_height);
        record.return_amount = Some(event.return_amount);
        true
    }

    /// Match a PROTOCOL transaction against tracked stakes and produce the
    /// return event, if any output pays a known change key.
    pub fn match_protocol_return(
        &self,
        tx: &Transaction,
        height: u64,
    ) -> Result<Option<ReturnEvent>, TxError> {
        if tx.prefix.tx_type != TxType::Protocol {
            return Ok(None);
        }
        for output in &tx.prefix.outputs {
            if let Some(record) = self.match_change_key(output.key()) {
                return Ok(Some(ReturnEvent {
                    stake_tx_hash: record.stake_tx_hash,
                    return_tx_hash: tx_hash(tx)?,
                    return_height: height,
                    return_amount: output.amount(),
                }));
            }
        }
        Ok(None)
    }

    /// Drop every record staked above `height` (chain rollback).
    pub fn delete_stakes_above(&mut self, height: u64) {
        let kept: Vec<StakeRecord> = self
            .records
            .drain(..)
            .filter(|r| r.stake_height <= height)
            .collect();
        self.by_hash.clear();
        self.by_change_key.clear();
        for record in kept {
            self.put_stake(record);
        }
    }

    pub fn to_json(&self) -> Result<String, TxError> {
        serde_json::to_string(&self.records).map_err(|e| TxError::Serialize(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, TxError> {
        let records: Vec<StakeRecord> =
            serde_json::from_str(json).map_err(|e| TxError::Parse(e.to_string()))?;
        let mut ledger = Self::new();
        for record in records {
            ledger.put_stake(record);
        }
        Ok(ledger)
    }
}

// ─── Serde field encodings ──────────────────────────────────────────────────

mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

mod opt_string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_str(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|s| s.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

mod opt_hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<[u8; 32]>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_str(&hex::encode(v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<[u8; 32]>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|s| {
            let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
            bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u8, height: u64) -> StakeRecord {
        StakeRecord {
            stake_tx_hash: [seed; 32],
            stake_height: height,
            amount_staked: 100_000_000_000,
            change_output_key: [seed ^ 0xFF; 32],
            status: StakeStatus::Locked,
            return_tx_hash: None,
            return_height: None,
            return_amount: None,
        }
    }

    #[test]
    fn put_get_and_index() {
        let mut ledger = StakeLedger::new();
        ledger.put_stake(record(1, 100));
        ledger.put_stake(record(2, 200));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.get_stake(&[1; 32]).is_some());
        assert!(ledger.match_change_key(&[1 ^ 0xFF; 32]).is_some());
        assert!(ledger.get_stake(&[9; 32]).is_none());
    }

    #[test]
    fn replace_updates_change_index() {
        let mut ledger = StakeLedger::new();
        ledger.put_stake(record(1, 100));
        let mut replaced = record(1, 100);
        replaced.change_output_key = [0xAB; 32];
        ledger.put_stake(replaced);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.match_change_key(&[1 ^ 0xFF; 32]).is_none());
        assert!(ledger.match_change_key(&[0xAB; 32]).is_some());
    }

    #[test]
    fn mark_returned_lifecycle() {
        let mut ledger = StakeLedger::new();
        ledger.put_stake(record(3, 500));
        let event = ReturnEvent {
            stake_tx_hash: [3; 32],
            return_tx_hash: [0x77; 32],
            return_height: 22_100,
            return_amount: 100_000_123_456,
        };
        assert!(ledger.mark_stake_returned(&event));
        let r = ledger.get_stake(&[3; 32]).unwrap();
        assert_eq!(r.status, StakeStatus::Returned);
        assert_eq!(r.return_height, Some(22_100));
        assert_eq!(ledger.get_stakes(Some(StakeStatus::Locked)).len(), 0);
        assert_eq!(ledger.get_stakes(Some(StakeStatus::Returned)).len(), 1);

        let unknown = ReturnEvent {
            stake_tx_hash: [4; 32],
            ..event
        };
        assert!(!ledger.mark_stake_returned(&unknown));
    }

    #[test]
    fn delete_above_height() {
        let mut ledger = StakeLedger::new();
        ledger.put_stake(record(1, 100));
        ledger.put_stake(record(2, 200));
        ledger.put_stake(record(3, 300));
        ledger.delete_stakes_above(200);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.get_stake(&[3; 32]).is_none());
        // Indexes rebuilt for the survivors.
        assert!(ledger.match_change_key(&[2 ^ 0xFF; 32]).is_some());
    }

    #[test]
    fn json_contract_round_trip() {
        let mut ledger = StakeLedger::new();
        let mut r = record(5, 1234);
        r.status = StakeStatus::Returned;
        r.return_tx_hash = Some([6; 32]);
        r.return_height = Some(23_000);
        r.return_amount = Some(7);
        ledger.put_stake(r.clone());
        ledger.put_stake(record(8, 99));

        let json = ledger.to_json().unwrap();
        // Integers are strings, keys hex, absent returns null.
        assert!(json.contains("\"stakeHeight\":\"1234\""));
        assert!(json.contains(&format!("\"stakeTxHash\":\"{}\"", hex::encode([5u8; 32]))));
        assert!(json.contains("\"returnTxHash\":null"));

        let restored = StakeLedger::from_json(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get_stake(&[5; 32]), Some(&r));
    }
}
