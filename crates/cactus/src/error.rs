//! 💀 Error kinds — every way a cactus sale can go sideways, with a name tag.
//!
//! Everything still travels as `anyhow::Error` with context strings stacked on top,
//! but the bottom of each chain is one of these, so callers (and tests) can
//! `downcast_ref::<CactusError>()` and find out which kind of bad day it was. 🦆
//!
//! Not in here: per-document bulk rejections. Those are data, not errors.
//! They live in [`crate::bulk::BulkReport`] and the run keeps going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CactusError {
    /// 📡 Could not reach or resolve the search service. Fatal.
    #[error("💀 Could not connect to the search service at '{url}': {reason}")]
    Connection { url: String, reason: String },

    /// 📐 The mapping document refused to become JSON. Not expected. Fatal.
    #[error("💀 Could not build the schema document: {0}")]
    Schema(String),

    /// 🏗️ The service said no to creating the index (usually: it already exists).
    #[error("💀 Index '{index}' could not be created ({status}): {body}")]
    IndexCreation {
        index: String,
        status: u16,
        body: String,
    },

    /// 📦 The bulk request as a whole never landed (transport error or non-2xx).
    #[error("💀 Bulk request failed: {0}")]
    BulkRequest(String),

    /// 🔧 Any other admin call that came back unhappy (refresh, delete).
    #[error("💀 The search service rejected '{operation}' ({status}): {body}")]
    RemoteService {
        operation: String,
        status: u16,
        body: String,
    },

    /// 📊 The aggregation query was rejected, lost mid-flight, or came back without buckets.
    #[error("💀 Aggregation query failed: {0}")]
    Query(String),

    /// ⚠️ Configuration that cannot produce a valid run.
    #[error("💀 Invalid configuration: {0}")]
    InvalidConfig(String),
}
