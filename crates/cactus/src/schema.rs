//! 📐 Schema — the mapping we hand Elasticsearch before a single cactus is sold.
//!
//! Four fields. Two of them strings that must match exactly (`keyword`), one number,
//! one date. The mapping is declared once, sent once with the create-index request,
//! and never touched again. It is the most stable relationship in this codebase. 🦆

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::error::CactusError;

/// 🏷️ The storage types this dataset needs. Elasticsearch has dozens. We need three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 💰 Floating point. For prices that end in .99 and dreams.
    Double,
    /// 📅 Calendar dates. `yyyy-MM-dd` on the wire.
    Date,
    /// 🔑 Exact-match, non-tokenized. "Prickly Pear" stays "Prickly Pear".
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// 📐 Field name → storage type. Built by [`declare_schema`], immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDeclaration {
    pub properties: BTreeMap<String, FieldMapping>,
}

// 📦 `{"mappings":{"properties":{...}}}` — the create-index envelope.
#[derive(Serialize)]
struct CreateIndexBody<'a> {
    mappings: &'a SchemaDeclaration,
}

/// 🚀 Declare the sales mapping. Pure: call it twice, get the same thing twice.
pub fn declare_schema() -> SchemaDeclaration {
    let properties = [
        ("price", FieldType::Double),
        ("date", FieldType::Date),
        ("state", FieldType::Keyword),
        ("category", FieldType::Keyword),
    ]
    .into_iter()
    .map(|(name, field_type)| (name.to_string(), FieldMapping { field_type }))
    .collect();

    SchemaDeclaration { properties }
}

impl SchemaDeclaration {
    /// 📦 Render the body for `PUT /{index}`.
    ///
    /// 💀 Fails with [`CactusError::Schema`] if serde refuses. It won't. But if it does,
    /// we'd rather hear about it here than get a 400 with a stack trace from the cluster.
    pub fn to_request_body(&self) -> Result<String> {
        let body = serde_json::to_string(&CreateIndexBody { mappings: self })
            .map_err(|err| CactusError::Schema(err.to_string()))?;
        Ok(body)
    }
}
