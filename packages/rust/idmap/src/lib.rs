//! Hub key derivation for transformed asset data.
//!
//! When the transformation service does not hand back an id-map itself, the
//! onboarding pipeline derives one here: every asset block in every
//! serialization becomes an [`AssetRecord`] keyed by its [`HubKey`].

mod extract;
mod hubkey;

use onboarding_shared::{ASSET_ENTITY_TYPE, AssetRecord, HubIdentity, IdMap, TransformResult};
use tracing::{debug, instrument, warn};

pub use extract::{AssetBlock, parse_block, split_blocks};
pub use hubkey::{HubKey, HubKeyError, SCHEMA_VERSION};

/// Build the id-map for `result` in `repository_id`.
///
/// Serializations are visited in name order and blocks in document order.
/// Blocks that do not describe an Asset are skipped. If an entity id appears
/// more than once, the later block's record replaces the earlier one.
#[instrument(skip_all, fields(repository_id = %repository_id, serializations = result.outputs.len()))]
pub fn derive(result: &TransformResult, repository_id: &str, identity: &HubIdentity) -> IdMap {
    let mut id_map = IdMap::new();

    for (name, serialized) in &result.outputs {
        for block in split_blocks(serialized) {
            let Some(asset) = parse_block(block) else {
                warn!(serialization = %name, "could not find entity_id in triple data, skipping block");
                continue;
            };

            let hub_key =
                HubKey::new(identity, repository_id, ASSET_ENTITY_TYPE, &asset.entity_id);
            let record = AssetRecord {
                entity_type: ASSET_ENTITY_TYPE.to_string(),
                entity_id: asset.entity_id,
                hub_key: hub_key.to_string(),
                source_ids: asset.source_ids,
            };

            if let Some(previous) = id_map.insert(record) {
                debug!(entity_id = %previous.entity_id, "entity repeated, keeping later block");
            }
        }
    }

    debug!(assets = id_map.len(), "derived id-map");
    id_map
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    const REPOSITORY_ID: &str = "2e9ce79cfa710e80878920c98e076aa9";

    fn identity() -> HubIdentity {
        HubIdentity {
            resolver_id: "copyrighthub.org".into(),
            hub_id: "hub1".into(),
        }
    }

    fn result_with(outputs: &[(&str, &str)]) -> TransformResult {
        TransformResult {
            status: 200,
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            id_map: None,
        }
    }

    fn load_fixture() -> String {
        std::fs::read_to_string("../../../fixtures/rdf/transform.nt").expect("read rdf fixture")
    }

    fn asset_block(entity_id: &str, value: &str) -> String {
        format!(
            "<http://openpermissions.org/ns/id/{entity_id}> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://openpermissions.org/ns/op/1.1/Asset> .\n\
             _:v <http://openpermissions.org/ns/op/1.1/id_type> <http://openpermissions.org/ns/hub/pictureid> .\n\
             _:v <http://openpermissions.org/ns/op/1.1/value> \"{value}\" ."
        )
    }

    #[test]
    fn fixture_yields_one_record_per_asset() {
        let fixture = load_fixture();
        let id_map = derive(&result_with(&[("rdf_n3", &fixture)]), REPOSITORY_ID, &identity());

        // Four blocks, one of which is an Offer.
        assert_eq!(id_map.len(), 3);
        let keys: HashSet<_> = id_map.iter().map(|r| r.hub_key.clone()).collect();
        assert_eq!(keys.len(), 3);

        let first = id_map.iter().next().expect("first record");
        assert_eq!(first.entity_type, "asset");
        assert_eq!(first.entity_id, "4d1f0e8c2b6a4a7f9e3c5b1d2a8f6e01");
        assert_eq!(
            first.hub_key,
            format!("https://copyrighthub.org/s1/hub1/{REPOSITORY_ID}/asset/4d1f0e8c2b6a4a7f9e3c5b1d2a8f6e01")
        );
        assert_eq!(first.source_ids.len(), 2);
        assert_eq!(first.source_ids[1].source_id_type, "isbn");
    }

    #[test]
    fn orphan_value_is_excluded() {
        let fixture = load_fixture();
        let id_map = derive(&result_with(&[("rdf_n3", &fixture)]), REPOSITORY_ID, &identity());
        let last = id_map.iter().last().expect("last record");
        assert_eq!(last.source_ids.len(), 1);
        assert_eq!(last.source_ids[0].source_id, "100125");
    }

    #[test]
    fn derive_is_deterministic() {
        let fixture = load_fixture();
        let result = result_with(&[("rdf_n3", &fixture)]);
        let a = derive(&result, REPOSITORY_ID, &identity());
        let b = derive(&result, REPOSITORY_ID, &identity());
        assert_eq!(a, b);
    }

    #[test]
    fn n_distinct_blocks_give_n_records() {
        let text = (0..5)
            .map(|i| asset_block(&format!("e{i}"), &format!("v{i}")))
            .collect::<Vec<_>>()
            .join("\n\n");
        let id_map = derive(&result_with(&[("rdf_n3", &text)]), REPOSITORY_ID, &identity());
        assert_eq!(id_map.len(), 5);
    }

    #[test]
    fn malformed_block_does_not_abort_the_rest() {
        let text = format!(
            "{}\n\n_:junk <http://example.org/p> \"x\" .\n\n{}",
            asset_block("e1", "v1"),
            asset_block("e2", "v2")
        );
        let id_map = derive(&result_with(&[("rdf_n3", &text)]), REPOSITORY_ID, &identity());
        let ids: Vec<_> = id_map.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, ["e1", "e2"]);
    }

    #[test]
    fn later_block_replaces_earlier_record() {
        let first = asset_block("e1", "old");
        let second = asset_block("e1", "new");
        let id_map = derive(
            &result_with(&[("a_first", &first), ("b_second", &second)]),
            REPOSITORY_ID,
            &identity(),
        );
        assert_eq!(id_map.len(), 1);
        let record = id_map.iter().next().expect("record");
        assert_eq!(record.source_ids[0].source_id, "new");
    }

    #[test]
    fn empty_output_gives_empty_map() {
        let id_map = derive(&result_with(&[("rdf_n3", "\n\n")]), REPOSITORY_ID, &identity());
        assert!(id_map.is_empty());
    }
}
