use plexus_store::{Class, Collection, EngineError, PropertyFilter};

use crate::common::seeded_engine;

fn with_generator(engine: &plexus_store::Engine) {
    engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
}

#[test]
fn single_property_insert_and_read() {
    let engine = seeded_engine();
    with_generator(&engine);
    engine
        .add_property(
            Collection::Generators,
            Class::System,
            "System",
            Class::Generator,
            "Gen1",
            "Max Capacity",
            "100",
            None,
            None,
            None,
        )
        .unwrap();

    let properties = engine.get_object_properties(Class::Generator, "Gen1", PropertyFilter::default()).unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].property_name, "Max Capacity");
    assert_eq!(properties[0].value, "100");
    assert_eq!(properties[0].bands, vec![1]);
}

#[test]
fn scenario_tag_surfaces_on_read_back() {
    let engine = seeded_engine();
    with_generator(&engine);
    engine.add_scenario("Base", None).unwrap();
    engine
        .add_property(
            Collection::Generators,
            Class::System,
            "System",
            Class::Generator,
            "Gen1",
            "Max Capacity",
            "100",
            None,
            Some("Base"),
            None,
        )
        .unwrap();

    let properties = engine.get_object_properties(Class::Generator, "Gen1", PropertyFilter::default()).unwrap();
    assert_eq!(properties[0].scenarios, vec!["Base".to_string()]);
}

#[test]
fn property_names_filter_narrows_the_result() {
    let engine = seeded_engine();
    with_generator(&engine);
    engine
        .add_property(Collection::Generators, Class::System, "System", Class::Generator, "Gen1", "Max Capacity", "100", None, None, None)
        .unwrap();

    let filter = PropertyFilter { property_names: Some(&["Max Capacity".to_string()]), ..Default::default() };
    let properties = engine.get_object_properties(Class::Generator, "Gen1", filter).unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "Gen1");

    let filter = PropertyFilter { property_names: Some(&["Heat Rate".to_string()]), ..Default::default() };
    assert!(engine.get_object_properties(Class::Generator, "Gen1", filter).is_err());
}

#[test]
fn iterate_properties_visits_every_chunk() {
    let engine = seeded_engine();
    with_generator(&engine);
    engine
        .add_property(Collection::Generators, Class::System, "System", Class::Generator, "Gen1", "Max Capacity", "100", Some(1), None, None)
        .unwrap();
    engine
        .add_property(Collection::Generators, Class::System, "System", Class::Generator, "Gen1", "Max Capacity", "200", Some(2), None, None)
        .unwrap();

    let mut seen = Vec::new();
    let filter = PropertyFilter { chunk_size: Some(1), ..Default::default() };
    engine
        .iterate_properties(Class::Generator, "Gen1", filter, |record| {
            seen.push(record.value);
            Ok(())
        })
        .unwrap();
    seen.sort();
    assert_eq!(seen, vec!["100".to_string(), "200".to_string()]);
}

#[test]
fn object_with_no_properties_errors() {
    let engine = seeded_engine();
    with_generator(&engine);
    let err = engine.get_object_properties(Class::Generator, "Gen1", PropertyFilter::default());
    assert!(matches!(err, Err(EngineError::NoPropertiesError { .. })));
}

#[test]
fn bulk_property_ingest_skips_records_naming_unknown_memberships() {
    use std::collections::HashMap;
    use plexus_store::Value;

    let engine = seeded_engine();
    with_generator(&engine);

    let records = vec![
        HashMap::from([
            ("parent_class".to_string(), Value::Text("System".into())),
            ("parent_object_name".to_string(), Value::Text("System".into())),
            ("collection".to_string(), Value::Text("Generators".into())),
            ("child_class".to_string(), Value::Text("Generator".into())),
            ("child_object_name".to_string(), Value::Text("Gen1".into())),
            ("property_name".to_string(), Value::Text("Max Capacity".into())),
            ("value".to_string(), Value::Text("50".into())),
        ]),
        HashMap::from([
            ("parent_class".to_string(), Value::Text("System".into())),
            ("parent_object_name".to_string(), Value::Text("System".into())),
            ("collection".to_string(), Value::Text("Generators".into())),
            ("child_class".to_string(), Value::Text("Generator".into())),
            ("child_object_name".to_string(), Value::Text("GenMissing".into())),
            ("property_name".to_string(), Value::Text("Max Capacity".into())),
            ("value".to_string(), Value::Text("50".into())),
        ]),
    ];
    let inserted = engine.add_properties_from_records(&records).unwrap();
    assert_eq!(inserted, 1);
}

#[test]
fn malformed_record_missing_required_key_fails_the_batch() {
    use std::collections::HashMap;
    use plexus_store::Value;

    let engine = seeded_engine();
    with_generator(&engine);
    let records = vec![HashMap::from([
        ("parent_class".to_string(), Value::Text("System".into())),
    ])];
    let err = engine.add_properties_from_records(&records);
    assert!(matches!(err, Err(EngineError::KeyError { .. })));
}
