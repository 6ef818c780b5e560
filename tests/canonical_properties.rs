//! Integration tests for canonical hashing

use std::collections::HashMap;

use flix_resolver::canonical::TemplateHashes;
use flix_resolver::{canonicalize, hash_source, AddressBook, Network, NetworkContext};

const MINT: &str = r#"
import NonFungibleToken from 0x631e88ae7f1d7c20
import FLOAT from 0x0afe396ebc8eee65

transaction(eventId: UInt64, host: Address) {
    let collection: &FLOAT.Collection
    prepare(acct: AuthAccount) {
        self.collection = acct.borrow<&FLOAT.Collection>(from: FLOAT.FLOATCollectionStoragePath)
            ?? panic("Could not borrow the Collection from the signer.")
    }
    execute {
        log("claimed")
    }
}
"#;

fn contexts() -> Vec<NetworkContext> {
    vec![
        NetworkContext::for_network(Network::Testnet, AddressBook::default()),
        NetworkContext::for_network(Network::Mainnet, AddressBook::default()),
        NetworkContext::address_agnostic(),
    ]
}

#[test]
fn test_whitespace_and_comments_do_not_change_digest() {
    let noisy = MINT
        .replace("\n", "\n\n")
        .replace("{", "{ /* open */")
        .replace("prepare(", "prepare (  ")
        + "// end of transaction\n";
    for ctx in contexts() {
        assert_eq!(hash_source(MINT, &ctx), hash_source(&noisy, &ctx));
    }
}

#[test]
fn test_comment_only_differences_hash_equal() {
    let plain = "fun main() {}";
    let commented = "/* header */ fun main() { /* a /* nested */ still comment */ }";
    for ctx in contexts() {
        let expected = hash_source(plain, &ctx).expect("Should parse");
        assert_eq!(hash_source(commented, &ctx), Ok(expected));
    }
}

#[test]
fn test_unterminated_comment_is_parse_error() {
    let result = hash_source("fun main() {} /* never closed", &NetworkContext::address_agnostic());
    assert!(result.is_err());
}

#[test]
fn test_grouped_and_split_imports_hash_equal() {
    let grouped = "import A, B from 0x01\naccess(all) fun main() {}";
    let split = "import A from 0x01\nimport B from 0x01\naccess(all) fun main() {}";
    for ctx in contexts() {
        assert_eq!(hash_source(grouped, &ctx), hash_source(split, &ctx));
    }
}

#[test]
fn test_addresses_only_affect_address_aware_digests() {
    let mainnet = MINT
        .replace("0x631e88ae7f1d7c20", "0x1d7e57aa55817448")
        .replace("0x0afe396ebc8eee65", "0x2d4c3caffbeab845");

    let agnostic = NetworkContext::address_agnostic();
    assert_eq!(hash_source(MINT, &agnostic), hash_source(&mainnet, &agnostic));

    let testnet = NetworkContext::for_network(Network::Testnet, AddressBook::default());
    assert_ne!(hash_source(MINT, &testnet), hash_source(&mainnet, &testnet));
}

#[test]
fn test_body_change_changes_every_digest() {
    let changed = MINT.replace("claimed", "minted");
    for ctx in contexts() {
        assert_ne!(hash_source(MINT, &ctx), hash_source(&changed, &ctx));
    }
}

#[test]
fn test_placeholders_resolve_through_address_book() {
    let placeholder = MINT
        .replace("0x631e88ae7f1d7c20", "0xNONFUNGIBLETOKEN")
        .replace("0x0afe396ebc8eee65", "0xFLOAT");
    let book: AddressBook = [
        ("0xNONFUNGIBLETOKEN", "0x631e88ae7f1d7c20"),
        ("0xFLOAT", "0x0afe396ebc8eee65"),
    ]
    .into_iter()
    .collect();

    let form = canonicalize(&placeholder).expect("Should parse");
    let hashes = TemplateHashes::compute(&form, &HashMap::from([(Network::Testnet, book)]));

    let concrete = NetworkContext::for_network(Network::Testnet, AddressBook::default());
    assert_eq!(
        hashes.testnet,
        Some(hash_source(MINT, &concrete).expect("Should parse"))
    );
}

#[test]
fn test_string_imports_resolve_by_contract_name() {
    let string_imports = MINT
        .replace("import NonFungibleToken from 0x631e88ae7f1d7c20", "import \"NonFungibleToken\"")
        .replace("import FLOAT from 0x0afe396ebc8eee65", "import \"FLOAT\"");
    let book: AddressBook = [
        ("NonFungibleToken", "0x631e88ae7f1d7c20"),
        ("FLOAT", "0x0afe396ebc8eee65"),
    ]
    .into_iter()
    .collect();

    let ctx = NetworkContext::for_network(Network::Testnet, book);
    let concrete = NetworkContext::for_network(Network::Testnet, AddressBook::default());
    assert_eq!(hash_source(&string_imports, &ctx), hash_source(MINT, &concrete));
}

#[test]
fn test_digest_is_sha3_hex() {
    let digest = hash_source("fun main() {}", &NetworkContext::address_agnostic())
        .expect("Should parse");
    assert_eq!(digest.as_str().len(), 64);
    assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}
