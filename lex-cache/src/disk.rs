//! LMDB-backed disk tier (§4.1): one unnamed database, keys are
//! `"{namespace}\0{key}"` so a namespace can be range-scanned and so two
//! namespaces never collide on the same key string.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use heed::types::Bytes as HeedBytes;
use heed::{Database, Env, EnvOpenOptions};
use lex_core::{Compression, LexError, LexResult};

use crate::compress::{compression_from_tag, compression_tag};

const SEPARATOR: u8 = 0x00;

pub(crate) struct DiskTier {
    env: Env,
    db: Database<HeedBytes, HeedBytes>,
}

impl DiskTier {
    pub fn open<P: AsRef<Path>>(path: P, map_size_bytes: usize) -> LexResult<Self> {
        std::fs::create_dir_all(&path).map_err(|e| disk_error("create cache dir", &e))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_bytes.max(1 << 20))
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| disk_error("open lmdb env", &e))?;

        let mut wtxn = env.write_txn().map_err(|e| disk_error("open write txn", &e))?;
        let db = env
            .create_database(&mut wtxn, None)
            .map_err(|e| disk_error("create db", &e))?;
        wtxn.commit().map_err(|e| disk_error("commit db creation", &e))?;

        Ok(Self { env, db })
    }

    pub fn get(&self, namespace: &str, key: &str) -> LexResult<Option<(Compression, Option<DateTime<Utc>>, Vec<u8>)>> {
        let rtxn = self.env.read_txn().map_err(|e| disk_error("open read txn", &e))?;
        let composite = composite_key(namespace, key);
        let record = self
            .db
            .get(&rtxn, &composite)
            .map_err(|e| disk_error("get", &e))?;
        match record {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put(
        &self,
        namespace: &str,
        key: &str,
        compression: Compression,
        expires_at: Option<DateTime<Utc>>,
        payload: &[u8],
    ) -> LexResult<()> {
        let mut wtxn = self.env.write_txn().map_err(|e| disk_error("open write txn", &e))?;
        let composite = composite_key(namespace, key);
        let record = encode_record(compression, expires_at, payload);
        self.db
            .put(&mut wtxn, &composite, &record)
            .map_err(|e| disk_error("put", &e))?;
        wtxn.commit().map_err(|e| disk_error("commit put", &e))?;
        Ok(())
    }

    pub fn remove(&self, namespace: &str, key: &str) -> LexResult<()> {
        let mut wtxn = self.env.write_txn().map_err(|e| disk_error("open write txn", &e))?;
        let composite = composite_key(namespace, key);
        self.db
            .delete(&mut wtxn, &composite)
            .map_err(|e| disk_error("delete", &e))?;
        wtxn.commit().map_err(|e| disk_error("commit delete", &e))?;
        Ok(())
    }
}

fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut composite = Vec::with_capacity(namespace.len() + key.len() + 1);
    composite.extend_from_slice(namespace.as_bytes());
    composite.push(SEPARATOR);
    composite.extend_from_slice(key.as_bytes());
    composite
}

fn encode_record(compression: Compression, expires_at: Option<DateTime<Utc>>, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 9);
    buf.push(compression_tag(compression));
    let expires_millis: i64 = expires_at.map(|t| t.timestamp_millis()).unwrap_or(-1);
    buf.extend_from_slice(&expires_millis.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn decode_record(bytes: &[u8]) -> LexResult<(Compression, Option<DateTime<Utc>>, Vec<u8>)> {
    if bytes.len() < 9 {
        return Err(LexError::Storage {
            reason: "disk cache record too short".to_string(),
        });
    }
    let compression = compression_from_tag(bytes[0])?;
    let millis = i64::from_le_bytes(bytes[1..9].try_into().expect("checked length above"));
    let expires_at = if millis < 0 {
        None
    } else {
        Some(Utc.timestamp_millis_opt(millis).single().ok_or_else(|| LexError::Storage {
            reason: "disk cache record has an invalid expiry timestamp".to_string(),
        })?)
    };
    Ok((compression, expires_at, bytes[9..].to_vec()))
}

fn disk_error(step: &str, err: &dyn std::fmt::Display) -> LexError {
    LexError::Storage {
        reason: format!("disk cache {step}: {err}"),
    }
}
