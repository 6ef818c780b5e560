//! Build stored templates from FLIX JSON documents

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use super::Template;
use crate::canonical::{canonicalize, AddressBook, TemplateHashes};
use crate::network::Network;
use crate::ParseError;

/// Errors that can occur when turning a FLIX document into a template
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("template document is missing '{0}'")]
    MissingField(&'static str),

    #[error("template cadence does not parse: {}", crate::format_parse_errors(.0))]
    Parse(Vec<ParseError>),
}

/// Per-network address books declared by a FLIX document's dependencies
///
/// Accepts both the legacy placeholder map
/// (`{"0xFTADDRESS": {"FungibleToken": {"testnet": {"address": ..}}}}`) and
/// the contract list form (`[{"contracts": [{"contract": .., "networks": [..]}]}]`).
pub fn address_books_from_flix(body: &Value) -> HashMap<Network, AddressBook> {
    let mut books: HashMap<Network, AddressBook> = HashMap::new();
    let mut add = |network: &str, keys: &[&str], address: Option<&str>| {
        let (Ok(network), Some(address)) = (network.parse::<Network>(), address) else {
            return;
        };
        let book = books.entry(network).or_default();
        for key in keys {
            book.insert(*key, address);
        }
    };

    match body.pointer("/data/dependencies") {
        Some(Value::Object(placeholders)) => {
            for (placeholder, contracts) in placeholders {
                let Some(contracts) = contracts.as_object() else {
                    continue;
                };
                for (contract, networks) in contracts {
                    let Some(networks) = networks.as_object() else {
                        continue;
                    };
                    for (network, pin) in networks {
                        let address = pin.get("address").and_then(Value::as_str);
                        add(network, &[placeholder.as_str(), contract.as_str()], address);
                    }
                }
            }
        }
        Some(Value::Array(groups)) => {
            let contracts = groups
                .iter()
                .filter_map(|g| g.get("contracts").and_then(Value::as_array))
                .flatten();
            for contract in contracts {
                let Some(name) = contract.get("contract").and_then(Value::as_str) else {
                    continue;
                };
                let networks = contract
                    .get("networks")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten();
                for pin in networks {
                    let network = pin.get("network").and_then(Value::as_str).unwrap_or("");
                    let address = pin.get("address").and_then(Value::as_str);
                    add(network, &[name], address);
                }
            }
        }
        _ => {}
    }

    books
}

/// Build a template from a FLIX document, computing all three digests
///
/// `defaults` supplies addresses for contracts the document does not pin;
/// the document's own dependencies take precedence.
pub fn template_from_flix(
    body: Value,
    defaults: &HashMap<Network, AddressBook>,
) -> Result<Template, IngestError> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or(IngestError::MissingField("id"))?
        .to_string();

    let cadence = match body.pointer("/data/cadence") {
        Some(Value::String(source)) => source.as_str(),
        Some(Value::Object(cadence)) => cadence
            .get("body")
            .and_then(Value::as_str)
            .ok_or(IngestError::MissingField("data.cadence.body"))?,
        _ => return Err(IngestError::MissingField("data.cadence")),
    };

    let form = canonicalize(cadence).map_err(IngestError::Parse)?;

    let mut books = defaults.clone();
    for (network, book) in address_books_from_flix(&body) {
        books.entry(network).or_default().extend(&book);
    }

    let hashes = TemplateHashes::compute(&form, &books);
    Ok(Template { id, body, hashes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{hash, HashFlavor, NetworkContext};
    use serde_json::json;

    fn legacy_flix() -> Value {
        json!({
            "f_type": "InteractionTemplate",
            "f_version": "1.0.0",
            "id": "tmpl-transfer",
            "data": {
                "type": "transaction",
                "cadence": "import FungibleToken from 0xFUNGIBLETOKENADDRESS\ntransaction(amount: UFix64) { prepare(signer: AuthAccount) {} }",
                "dependencies": {
                    "0xFUNGIBLETOKENADDRESS": {
                        "FungibleToken": {
                            "testnet": { "address": "0x9a0766d93b6608b7", "fq_address": "A.9a0766d93b6608b7.FungibleToken" },
                            "mainnet": { "address": "0xf233dcee88fe0abe", "fq_address": "A.f233dcee88fe0abe.FungibleToken" }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_legacy_dependencies() {
        let books = address_books_from_flix(&legacy_flix());
        assert_eq!(
            books[&Network::Testnet].get("0xFUNGIBLETOKENADDRESS"),
            Some("0x9a0766d93b6608b7")
        );
        assert_eq!(
            books[&Network::Mainnet].get("FungibleToken"),
            Some("0xf233dcee88fe0abe")
        );
    }

    #[test]
    fn test_contract_list_dependencies() {
        let body = json!({
            "data": {
                "dependencies": [{
                    "contracts": [{
                        "contract": "NonFungibleToken",
                        "networks": [
                            { "network": "testnet", "address": "0x631e88ae7f1d7c20" },
                            { "network": "emulator", "address": "0xf8d6e0586b0a20c7" }
                        ]
                    }]
                }]
            }
        });
        let books = address_books_from_flix(&body);
        assert_eq!(books.len(), 1);
        assert_eq!(
            books[&Network::Testnet].get("NonFungibleToken"),
            Some("0x631e88ae7f1d7c20")
        );
    }

    #[test]
    fn test_template_hashes_match_concrete_source() {
        let template = template_from_flix(legacy_flix(), &HashMap::new()).expect("Should ingest");
        let concrete = canonicalize(
            "import FungibleToken from 0x9a0766d93b6608b7\ntransaction(amount: UFix64) { prepare(signer: AuthAccount) {} }",
        )
        .expect("Should parse");
        let ctx = NetworkContext::for_network(Network::Testnet, AddressBook::default());
        assert_eq!(template.hash(HashFlavor::Testnet), Some(&hash(&concrete, &ctx)));
        assert_ne!(
            template.hash(HashFlavor::Testnet),
            template.hash(HashFlavor::Mainnet)
        );
    }

    #[test]
    fn test_cadence_body_object_form() {
        let body = json!({
            "id": "tmpl-script",
            "data": { "cadence": { "body": "access(all) fun main(): Int { return 1 }" } }
        });
        let template = template_from_flix(body, &HashMap::new()).expect("Should ingest");
        assert_eq!(template.id, "tmpl-script");
        assert!(template.hash(HashFlavor::AddressAgnostic).is_some());
    }

    #[test]
    fn test_missing_id() {
        let body = json!({ "data": { "cadence": "fun main() {}" } });
        assert!(matches!(
            template_from_flix(body, &HashMap::new()),
            Err(IngestError::MissingField("id"))
        ));
    }

    #[test]
    fn test_unparsable_cadence() {
        let body = json!({ "id": "x", "data": { "cadence": "fun main() {" } });
        assert!(matches!(
            template_from_flix(body, &HashMap::new()),
            Err(IngestError::Parse(_))
        ));
    }
}
