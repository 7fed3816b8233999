use plexus_store::{Class, Collection, PropertyFilter};

use crate::common::seeded_engine;

#[test]
fn exported_database_reimports_with_the_same_objects() {
    let engine = seeded_engine();
    engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
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

    let dir = tempfile::tempdir().unwrap();
    let xml_path = dir.path().join("model.xml");
    engine.to_xml(&xml_path).unwrap();

    let reimported = plexus_store::Engine::from_xml(&xml_path, None).unwrap();
    assert!(reimported.check_object_exists(Class::Generator, "Gen1").unwrap());
    let properties = reimported.get_object_properties(Class::Generator, "Gen1", PropertyFilter::default()).unwrap();
    assert_eq!(properties[0].value, "100");
}

#[test]
fn from_xml_rejects_a_missing_file() {
    let err = plexus_store::Engine::from_xml(std::path::Path::new("/no/such/file.xml"), None);
    assert!(err.is_err());
}
