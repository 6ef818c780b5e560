//! The shipped configuration and data files load and agree with each other

use std::path::Path;

use flix_resolver::generate::GeneratorConfig;
use flix_resolver::{
    AliasResolution, AliasTable, AuditorRegistry, HashFlavor, InMemoryTemplateStore, Network,
    ServiceConfig, TemplateStore,
};

#[tokio::test]
async fn test_default_config_data_loads() {
    let config = ServiceConfig::from_file(Path::new("config.toml")).expect("Should parse");
    let aliases = AliasTable::from_file(&config.names_path).expect("Should load aliases");
    let registry = AuditorRegistry::from_file(&config.auditors_path).expect("Should load auditors");
    let store = InMemoryTemplateStore::load_dir(&config.templates_dir, &config.address_books)
        .expect("Should load templates");

    assert!(registry.auditors_for(Network::Testnet).is_some());

    let AliasResolution::Resolved(id) = aliases.resolve("transfer-flow") else {
        panic!("alias should resolve");
    };
    let template = store.get_by_id(&id).await.unwrap().expect("template exists");
    for flavor in [HashFlavor::Testnet, HashFlavor::Mainnet, HashFlavor::AddressAgnostic] {
        assert!(template.hash(flavor).is_some());
    }
}

#[test]
fn test_generator_config_parses() {
    let config = GeneratorConfig::from_file(Path::new("generate.toml")).expect("Should parse");
    assert_eq!(config.repositories.len(), 3);
}
