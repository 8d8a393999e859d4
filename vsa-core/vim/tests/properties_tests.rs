//! 属性采集测试

mod common;

use common::FakeEndpoint;
use vsa_vim::*;

fn names() -> Vec<String> {
    vec!["name".to_string()]
}

#[tokio::test]
async fn test_get_by_ids_skips_unknown_id() {
    let fake = FakeEndpoint::new();
    fake.add_entity(EntityKind::VirtualMachine, "vm-1", "web01");
    fake.add_entity(EntityKind::VirtualMachine, "vm-2", "db01");
    let session = fake.session();

    let ids = vec!["vm-1".to_string(), "vm-missing".to_string()];
    let outcome = session
        .properties()
        .get("VirtualMachine", &names(), &ids)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.detail.keys().collect::<Vec<_>>(), vec!["vm-1"]);
    assert_eq!(outcome.detail["vm-1"]["name"], "web01");

    assert_eq!(fake.calls_to("CreateListView").len(), 1);
    assert_eq!(fake.calls_to("ModifyListView").len(), 1);
    assert_eq!(fake.calls_to("DestroyView").len(), 1);
    assert_eq!(fake.open_views(), 0);
}

#[tokio::test]
async fn test_get_by_ids_all_found() {
    let fake = FakeEndpoint::new();
    fake.add_entity(EntityKind::VirtualMachine, "vm-1", "web01");
    fake.add_entity(EntityKind::VirtualMachine, "vm-2", "db01");
    let session = fake.session();

    let ids = vec!["vm-2".to_string(), "vm-1".to_string()];
    let outcome = session
        .properties()
        .get("VirtualMachine", &names(), &ids)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.detail.len(), 2);
    assert_eq!(outcome.detail["vm-2"]["name"], "db01");
}

#[tokio::test]
async fn test_get_without_ids_walks_inventory() {
    let fake = FakeEndpoint::new();
    fake.add_entity(EntityKind::HostSystem, "host-1", "esx01");
    fake.add_entity(EntityKind::VirtualMachine, "vm-1", "web01");
    let session = fake.session();

    let outcome = session.properties().get("HostSystem", &[], &[]).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.detail.keys().collect::<Vec<_>>(), vec!["host-1"]);
    assert!(fake.calls_to("CreateListView").is_empty());
}

#[tokio::test]
async fn test_explicit_unknown_id_fails_whole_query() {
    let fake = FakeEndpoint::new();
    fake.add_entity(EntityKind::VirtualMachine, "vm-1", "web01");
    let session = fake.session();

    let query = PropertyQuery::new("VirtualMachine")
        .with_paths(["name"])
        .with_ids(vec!["vm-1".to_string(), "vm-missing".to_string()]);

    assert!(matches!(session.retrieve(&query).await, Err(VimError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_type_name_rejected() {
    let fake = FakeEndpoint::new();
    let session = fake.session();

    let result = session.properties().collect("../Folder", &[], &[]).await;
    assert!(matches!(result, Err(VimError::Validation(_))));
    assert_eq!(fake.retrievals(), 0);
}
