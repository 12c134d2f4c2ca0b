//! Statement extraction from transformed N-Triples/N3 output.
//!
//! The transformation service emits one block of statements per asset, blocks
//! separated by a blank line. Inside a block:
//! - `<…/ns/id/ID> rdf:type <…/op/1.1/Asset>` names the asset
//! - `_:L <…/op/1.1/id_type> <…/ns/hub…/TYPE>` types a blank node
//! - `_:L <…/op/1.1/value> "VALUE"` gives the blank node its identifier value

use std::sync::LazyLock;

use onboarding_shared::SourceId;
use regex::Regex;
use tracing::warn;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// A line containing only whitespace, i.e. the block delimiter.
static BLOCK_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("block separator regex"));

/// `<http://openpermissions.org/ns/id/ID> rdf:type op:Asset`.
static ENTITY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"<http://openpermissions\.org/ns/id/([^>]*)> ",
        r"<http://www\.w3\.org/1999/02/22-rdf-syntax-ns#type> ",
        r"<http://openpermissions\.org/ns/op/1\.1/Asset>",
    ))
    .expect("entity id regex")
});

/// `_:LABEL op:id_type <http://openpermissions.org/ns/hub…/TYPE>`.
static SOURCE_ID_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"_:(\S+) <http://openpermissions\.org/ns/op/1\.1/id_type> ",
        r"<http://openpermissions\.org/ns/hub[^/]*/([^>]+)>",
    ))
    .expect("source id type regex")
});

/// `_:LABEL op:value "VALUE"`, honouring backslash escapes inside the literal.
static SOURCE_ID_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"_:(\S+) <http://openpermissions\.org/ns/op/1\.1/value> "#,
        r#""((?:[^"\\]|\\.)*)""#,
    ))
    .expect("source id value regex")
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifiers pulled out of one asset block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBlock {
    pub entity_id: String,
    pub source_ids: Vec<SourceId>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Split a serialization into its non-blank blocks.
pub fn split_blocks(serialized: &str) -> impl Iterator<Item = &str> {
    BLOCK_SEPARATOR_RE
        .split(serialized)
        .filter(|block| !block.trim().is_empty())
}

/// Extract the asset described by `block`.
///
/// Returns `None` when no statement types a resource as an Asset. Blank-node
/// labels that have a value but no type (or the reverse) are dropped.
pub fn parse_block(block: &str) -> Option<AssetBlock> {
    let entity_id = ENTITY_ID_RE.captures(block)?.get(1)?.as_str().to_string();

    let types = labelled(&SOURCE_ID_TYPE_RE, block, |raw| raw.to_string());
    // values are kept exactly as written, escapes included
    let values = labelled(&SOURCE_ID_VALUE_RE, block, |raw| raw.to_string());

    let mut source_ids = Vec::with_capacity(values.len());
    for (label, value) in &values {
        match lookup(&types, label) {
            Some(id_type) => source_ids.push(SourceId {
                source_id: value.clone(),
                source_id_type: id_type.clone(),
            }),
            None => warn!(%entity_id, %label, "blank node has a value but no id_type, dropping"),
        }
    }
    for (label, _) in &types {
        if lookup(&values, label).is_none() {
            warn!(%entity_id, %label, "blank node has an id_type but no value, dropping");
        }
    }

    Some(AssetBlock {
        entity_id,
        source_ids,
    })
}

/// Collect `(label, object)` pairs in discovery order. A repeated label keeps
/// its first position and takes the last object seen.
fn labelled(re: &Regex, block: &str, object: impl Fn(&str) -> String) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for caps in re.captures_iter(block) {
        let (Some(label), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = object(raw.as_str());
        match pairs.iter_mut().find(|(l, _)| l == label.as_str()) {
            Some(existing) => existing.1 = value,
            None => pairs.push((label.as_str().to_string(), value)),
        }
    }
    pairs
}

fn lookup<'a>(pairs: &'a [(String, String)], label: &str) -> Option<&'a String> {
    pairs.iter().find(|(l, _)| l == label).map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r#"<http://openpermissions.org/ns/id/0a1b2c> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://openpermissions.org/ns/op/1.1/Asset> .
<http://openpermissions.org/ns/id/0a1b2c> <http://openpermissions.org/ns/op/1.1/alsoIdentifiedBy> _:b0 .
_:b0 <http://openpermissions.org/ns/op/1.1/id_type> <http://openpermissions.org/ns/hub/examplecopictureid> .
_:b0 <http://openpermissions.org/ns/op/1.1/value> "100123" ."#;

    #[test]
    fn splits_on_blank_lines() {
        let text = "a .\nb .\n\nc .\n   \nd .\n\n";
        let blocks: Vec<_> = split_blocks(text).collect();
        assert_eq!(blocks, ["a .\nb .", "c .", "d ."]);
    }

    #[test]
    fn parses_entity_and_source_id() {
        let asset = parse_block(BLOCK).expect("asset block");
        assert_eq!(asset.entity_id, "0a1b2c");
        assert_eq!(
            asset.source_ids,
            vec![SourceId {
                source_id: "100123".into(),
                source_id_type: "examplecopictureid".into(),
            }]
        );
    }

    #[test]
    fn block_without_asset_type_is_none() {
        let block = "_:b0 <http://openpermissions.org/ns/op/1.1/value> \"1\" .";
        assert!(parse_block(block).is_none());
    }

    #[test]
    fn orphan_labels_are_dropped() {
        let block = format!(
            "{BLOCK}\n_:b1 <http://openpermissions.org/ns/op/1.1/value> \"only-value\" .\n\
             _:b2 <http://openpermissions.org/ns/op/1.1/id_type> <http://openpermissions.org/ns/hub/isbn> ."
        );
        let asset = parse_block(&block).expect("asset block");
        assert_eq!(asset.source_ids.len(), 1);
        assert_eq!(asset.source_ids[0].source_id, "100123");
    }

    #[test]
    fn hub_namespace_variants_match() {
        let block = "<http://openpermissions.org/ns/id/e1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://openpermissions.org/ns/op/1.1/Asset> .\n\
                     _:x <http://openpermissions.org/ns/op/1.1/id_type> <http://openpermissions.org/ns/hub1.1/isbn> .\n\
                     _:x <http://openpermissions.org/ns/op/1.1/value> \"978-3\" .";
        let asset = parse_block(block).expect("asset block");
        assert_eq!(asset.source_ids[0].source_id_type, "isbn");
    }

    #[test]
    fn escaped_literal_is_kept_verbatim() {
        let block = "<http://openpermissions.org/ns/id/e1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://openpermissions.org/ns/op/1.1/Asset> .\n\
                     _:x <http://openpermissions.org/ns/op/1.1/id_type> <http://openpermissions.org/ns/hub/title> .\n\
                     _:x <http://openpermissions.org/ns/op/1.1/value> \"say \\\"cheese\\\"\" .";
        let asset = parse_block(block).expect("asset block");
        assert_eq!(asset.source_ids[0].source_id, r#"say \"cheese\""#);
    }
}
