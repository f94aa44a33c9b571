use pokedex_core::db::open_db_in_memory;
use pokedex_core::{
    NewPokemon, PokemonFilter, PokemonFindQuery, PokemonId, PokemonPatch, PokemonSortField,
    PokemonStore, SqlitePokemonStore, StoreError,
};
use rusqlite::params;
use serde_json::json;

#[test]
fn insert_returns_record_with_initial_meta() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);

    let created = store
        .insert(
            &NewPokemon::new(1, "bulbasaur").with_attribute("types", json!(["grass", "poison"])),
        )
        .unwrap();
    let meta = created.meta.expect("insert should return metadata");
    assert_eq!(meta.version, 0);
    assert_eq!(meta.created_at, meta.updated_at);

    let loaded = store
        .find_one(&PokemonFilter::Id(created.id))
        .unwrap()
        .unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn insert_reports_unique_violations_as_constraint_errors() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    store.insert(&NewPokemon::new(1, "bulbasaur")).unwrap();

    let err = store.insert(&NewPokemon::new(1, "ivysaur")).unwrap_err();
    assert_eq!(
        err,
        StoreError::ConstraintViolation {
            field: "no".to_string(),
            value: json!(1),
        }
    );
}

#[test]
fn find_supports_filter_sort_and_projection() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    for (no, name) in [(3, "venusaur"), (1, "bulbasaur"), (2, "ivysaur")] {
        store.insert(&NewPokemon::new(no, name)).unwrap();
    }

    let by_name = store
        .find(&PokemonFindQuery {
            sort: PokemonSortField::Name,
            ..PokemonFindQuery::default()
        })
        .unwrap();
    let names: Vec<&str> = by_name.iter().map(|pokemon| pokemon.name.as_str()).collect();
    assert_eq!(names, vec!["bulbasaur", "ivysaur", "venusaur"]);
    assert!(by_name.iter().all(|pokemon| pokemon.meta.is_some()));

    let filtered = store
        .find(&PokemonFindQuery {
            filter: Some(PokemonFilter::No(2)),
            exclude_meta: true,
            ..PokemonFindQuery::default()
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "ivysaur");
    assert!(filtered[0].meta.is_none());

    let skipped = store
        .find(&PokemonFindQuery {
            skip: 2,
            ..PokemonFindQuery::default()
        })
        .unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].no, 3);
}

#[test]
fn update_by_id_merges_attributes_and_bumps_version() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    let created = store
        .insert(
            &NewPokemon::new(133, "eevee")
                .with_attribute("type", "normal")
                .with_attribute("height", 3),
        )
        .unwrap();

    let patch = PokemonPatch::default()
        .with_no(134)
        .with_attribute("type", "water");
    assert_eq!(store.update_by_id(created.id, &patch).unwrap(), 1);

    let loaded = store
        .find_one(&PokemonFilter::No(134))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.name, "eevee");
    assert_eq!(loaded.attributes["type"], json!("water"));
    assert_eq!(loaded.attributes["height"], json!(3));
    assert_eq!(loaded.meta.unwrap().version, 1);
}

#[test]
fn update_and_delete_report_zero_for_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    let missing = PokemonId::new_v4();

    assert_eq!(
        store
            .update_by_id(missing, &PokemonPatch::default().with_name("ghost"))
            .unwrap(),
        0
    );
    assert_eq!(store.delete_by_id(missing).unwrap(), 0);
}

#[test]
fn failed_update_leaves_record_untouched() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    store.insert(&NewPokemon::new(1, "bulbasaur")).unwrap();
    let second = store.insert(&NewPokemon::new(2, "ivysaur")).unwrap();

    let patch = PokemonPatch::default()
        .with_no(1)
        .with_attribute("evolved", true);
    let err = store.update_by_id(second.id, &patch).unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation { ref field, .. } if field == "no"));

    let loaded = store
        .find_one(&PokemonFilter::Id(second.id))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.no, 2);
    assert!(loaded.attributes.get("evolved").is_none());
    assert_eq!(loaded.meta.unwrap().version, 0);
}

#[test]
fn corrupted_attributes_are_reported_instead_of_masked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    let created = store.insert(&NewPokemon::new(1, "bulbasaur")).unwrap();

    conn.execute(
        "UPDATE pokemon SET attributes = 'not json' WHERE id = ?1;",
        params![created.id.to_string()],
    )
    .unwrap();

    let err = store
        .find_one(&PokemonFilter::Name("bulbasaur".to_string()))
        .unwrap_err();
    assert!(matches!(err, StoreError::Other(ref detail) if detail.contains("attributes")));
}

#[test]
fn delete_by_id_removes_exactly_one_record() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePokemonStore::new(&conn);
    let first = store.insert(&NewPokemon::new(1, "bulbasaur")).unwrap();
    store.insert(&NewPokemon::new(2, "ivysaur")).unwrap();

    assert_eq!(store.delete_by_id(first.id).unwrap(), 1);
    assert!(store
        .find_one(&PokemonFilter::Id(first.id))
        .unwrap()
        .is_none());
    assert_eq!(store.find(&PokemonFindQuery::default()).unwrap().len(), 1);
}
