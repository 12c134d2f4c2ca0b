//! Core domain types for asset onboarding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Entity type recorded for every onboarded asset.
pub const ASSET_ENTITY_TYPE: &str = "asset";

/// Name of the serialization the repository service accepts.
pub const RDF_N3: &str = "rdf_n3";

/// Name of the precomputed id-map entry in transformation output.
pub const ID_MAP: &str = "id_map";

// ---------------------------------------------------------------------------
// ErrorDetail
// ---------------------------------------------------------------------------

/// One entry of an `errors` array, as produced by this service and its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// Component the error originated from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetRecord / IdMap
// ---------------------------------------------------------------------------

/// A source-system identifier attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceId {
    pub source_id: String,
    pub source_id_type: String,
}

/// Audit record for one onboarded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Always [`ASSET_ENTITY_TYPE`].
    pub entity_type: String,
    /// Identifier local to the transformed data.
    pub entity_id: String,
    /// Canonical cross-organisation identifier.
    pub hub_key: String,
    #[serde(default)]
    pub source_ids: Vec<SourceId>,
}

/// Asset records keyed by hub key.
///
/// Iteration follows first-insertion order. Re-inserting an existing hub key
/// replaces the record in place. Serializes as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<AssetRecord>", into = "Vec<AssetRecord>")]
pub struct IdMap {
    records: Vec<AssetRecord>,
    index: HashMap<String, usize>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the one it replaced, if any.
    pub fn insert(&mut self, record: AssetRecord) -> Option<AssetRecord> {
        match self.index.get(&record.hub_key) {
            Some(&pos) => Some(std::mem::replace(&mut self.records[pos], record)),
            None => {
                self.index.insert(record.hub_key.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, hub_key: &str) -> Option<&AssetRecord> {
        self.index.get(hub_key).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<AssetRecord> {
        self.records
    }
}

impl From<Vec<AssetRecord>> for IdMap {
    fn from(records: Vec<AssetRecord>) -> Self {
        let mut map = Self::new();
        for record in records {
            map.insert(record);
        }
        map
    }
}

impl From<IdMap> for Vec<AssetRecord> {
    fn from(map: IdMap) -> Self {
        map.into_records()
    }
}

// ---------------------------------------------------------------------------
// TransformResult
// ---------------------------------------------------------------------------

/// Successful output of the transformation service.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// HTTP status reported by the transformation service.
    pub status: u16,
    /// Serialization name (e.g. [`RDF_N3`]) to serialized content.
    pub outputs: BTreeMap<String, String>,
    /// Id-map already computed by the transformation service, if it sent one.
    pub id_map: Option<IdMap>,
}

impl TransformResult {
    /// Look up a serialization by name.
    pub fn serialization(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for use in an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}
