use cairn_blocks::{BlockDef, BlockId, BlockRegistry, RegistryError};
use proptest::prelude::*;

#[test]
fn duplicate_and_empty_names_are_rejected() {
    let mut reg = BlockRegistry::new();
    let id = reg.register(BlockDef::solid("marble")).expect("first");
    assert_eq!(id, BlockId(1));
    assert_eq!(
        reg.register(BlockDef::solid("marble")),
        Err(RegistryError::Duplicate("marble".into()))
    );
    assert_eq!(reg.register(BlockDef::solid("")), Err(RegistryError::EmptyName));
    assert_eq!(reg.register(BlockDef::solid("air")), Err(RegistryError::Duplicate("air".into())));
}

#[test]
fn unknown_name_falls_back_to_air() {
    let reg = BlockRegistry::with_defaults();
    assert!(reg.lookup("no_such_block").is_air());
    assert!(reg.get(BlockId(9_999)).is_air());
}

#[test]
fn toml_defaults_fill_missing_fields() {
    let reg = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "glass"
        transparent = true
        material = "glass"

        [[blocks]]
        name = "fern"
        plant = true
        obstacle = false
        transparent = true
    "#,
    )
    .expect("registry");
    let glass = reg.lookup("glass");
    assert!(glass.is_transparent() && glass.is_obstacle() && glass.is_visible());
    assert_eq!(glass.material.as_deref(), Some("glass"));
    let fern = reg.lookup("fern");
    assert!(fern.is_plant() && !fern.is_obstacle());
}

#[test]
fn toml_duplicate_is_an_error() {
    let err = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "a"
        [[blocks]]
        name = "a"
    "#,
    );
    assert!(err.is_err());
}

proptest! {
    // ids are dense, stable and round-trip through names
    #[test]
    fn ids_round_trip_names(names in proptest::collection::hash_set("[a-z]{1,12}", 1..40)) {
        let mut reg = BlockRegistry::new();
        let mut issued = Vec::new();
        for n in names.iter().filter(|n| n.as_str() != "air") {
            let id = reg.register(BlockDef::solid(n.clone())).unwrap();
            issued.push((n.clone(), id));
        }
        for (i, (n, id)) in issued.iter().enumerate() {
            prop_assert_eq!(id.0 as usize, i + 1);
            prop_assert_eq!(reg.id_by_name(n), Some(*id));
            prop_assert_eq!(reg.name(*id), n.as_str());
        }
    }
}
