//! 标签客户端测试

mod common;

use serde_json::json;

use common::FakeVcenter;
use vsa_tagging::*;

const CATEGORY_PATH: &str = "/rest/com/vmware/cis/tagging/category";
const TAG_PATH: &str = "/rest/com/vmware/cis/tagging/tag";

fn vm(id: &str) -> ObjectId {
    ObjectId::new("VirtualMachine", id)
}

#[tokio::test]
async fn test_category_get_or_create_twice_creates_once() {
    let fake = FakeVcenter::new();
    let client = fake.client();
    let spec = CategorySpec::new("env").with_cardinality(Cardinality::Single);

    let first = client.category().get_or_create(&spec).await.unwrap();
    let second = client.category().get_or_create(&spec).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.name, "env");
    assert_eq!(fake.creates(CATEGORY_PATH).len(), 1);
    assert_eq!(fake.categories().len(), 1);
}

#[tokio::test]
async fn test_tag_get_or_create_returns_full_tag() {
    let fake = FakeVcenter::new();
    let category_id = fake.add_category("env", Cardinality::Single);
    let client = fake.client();

    let spec = TagSpec::new("prod", category_id.clone()).with_description("production");
    let tag = client.tag().get_or_create(&spec).await.unwrap();
    assert_eq!(tag.name, "prod");
    assert_eq!(tag.category_id, category_id);

    let again = client.tag().get_or_create(&spec).await.unwrap();
    assert_eq!(again.id, tag.id);
    assert_eq!(fake.creates(TAG_PATH).len(), 1);

    let payload = fake.creates(TAG_PATH)[0].payload.clone().unwrap();
    assert_eq!(payload["create_spec"]["description"], "production");
}

#[tokio::test]
async fn test_find_by_name_returns_none() {
    let fake = FakeVcenter::new();
    let category_id = fake.add_category("env", Cardinality::Single);
    fake.add_tag("prod", &category_id);
    let client = fake.client();

    assert!(client.category().find_by_name("owner").await.unwrap().is_none());
    assert!(client
        .tag()
        .find_by_name("dev", Some(&category_id))
        .await
        .unwrap()
        .is_none());
    assert!(client.tag().find_by_name("prod", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_tag_name_scoped_to_category() {
    let fake = FakeVcenter::new();
    let env = fake.add_category("env", Cardinality::Single);
    let tier = fake.add_category("tier", Cardinality::Single);
    fake.add_tag("prod", &env);
    let in_tier = fake.add_tag("prod", &tier);
    let client = fake.client();

    let tag = client.tag().find_by_name("prod", Some(&tier)).await.unwrap().unwrap();
    assert_eq!(tag.id, in_tier);
}

#[tokio::test]
async fn test_replace_detaches_same_category_then_attaches() {
    let fake = FakeVcenter::new();
    let env = fake.add_category("env", Cardinality::Single);
    let owner = fake.add_category("owner", Cardinality::Multiple);
    let target = fake.add_tag("prod", &env);
    let previous = fake.add_tag("dev", &env);
    let unrelated = fake.add_tag("alice", &owner);

    fake.attach(&previous, vm("vm-1"));
    fake.attach(&unrelated, vm("vm-1"));
    let client = fake.client();

    client.association().replace(&target, &vm("vm-1")).await.unwrap();

    let detaches = fake.actions("detach");
    assert_eq!(detaches.len(), 1);
    assert!(detaches[0].endpoint.contains(&previous));
    assert_eq!(detaches[0].payload, Some(json!({"object_id": {"id": "vm-1", "type": "VirtualMachine"}})));

    let attaches = fake.actions("attach");
    assert_eq!(attaches.len(), 1);
    assert!(attaches[0].endpoint.contains(&target));

    let mut attached = fake.attached(&vm("vm-1"));
    attached.sort();
    let mut expected = vec![unrelated, target];
    expected.sort();
    assert_eq!(attached, expected);
}

#[tokio::test]
async fn test_detach_category_returns_detached_tags() {
    let fake = FakeVcenter::new();
    let env = fake.add_category("env", Cardinality::Multiple);
    let a = fake.add_tag("a", &env);
    let b = fake.add_tag("b", &env);
    fake.attach(&a, vm("vm-1"));
    fake.attach(&b, vm("vm-1"));
    let client = fake.client();

    let detached = client
        .association()
        .detach_category(&env, &vm("vm-1"))
        .await
        .unwrap();

    let names: Vec<_> = detached.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(fake.attached(&vm("vm-1")).is_empty());
}

#[tokio::test]
async fn test_attach_multiple_and_list_attached_objects() {
    let fake = FakeVcenter::new();
    let env = fake.add_category("env", Cardinality::Multiple);
    let a = fake.add_tag("a", &env);
    let b = fake.add_tag("b", &env);
    let client = fake.client();

    client
        .association()
        .attach_multiple(&[a.clone(), b.clone()], &vm("vm-7"))
        .await
        .unwrap();

    let request = &fake.actions("attach-multiple-tags-to-object")[0];
    assert_eq!(request.payload.as_ref().unwrap()["tag_ids"], json!([&a, &b]));

    let objects = client.association().list_attached_objects(&a).await.unwrap();
    assert_eq!(objects, vec![vm("vm-7")]);
}

fn bulk_fixture() -> std::sync::Arc<FakeVcenter> {
    let fake = FakeVcenter::new();
    fake.add_object(InventoryType::Cluster, "domain-c1", "cls1", &[]);
    fake.add_object(InventoryType::Cluster, "domain-c2", "cls2", &[]);
    fake.add_object(InventoryType::VirtualMachine, "vm-1", "a", &[(InventoryType::Cluster, "domain-c1")]);
    fake.add_object(InventoryType::VirtualMachine, "vm-2", "b", &[(InventoryType::Cluster, "domain-c1")]);
    fake.add_object(InventoryType::VirtualMachine, "vm-3", "c", &[(InventoryType::Cluster, "domain-c2")]);
    fake
}

fn bulk_request(action: BulkAction) -> BulkTagRequest {
    BulkTagRequest {
        query_type: InventoryType::Cluster,
        query_name: "cls1".to_string(),
        bulk_type: InventoryType::VirtualMachine,
        category: "env".to_string(),
        tag: "prod".to_string(),
        cardinality: Cardinality::Single,
        action,
    }
}

#[tokio::test]
async fn test_tag_bulk_attach_to_cluster_vms() {
    let fake = bulk_fixture();
    let client = fake.client();

    let results = client.bulk().tag_bulk(&bulk_request(BulkAction::Attach)).await.unwrap();

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(
        json,
        json!([
            {"id": "vm-1", "name": "a", "type": "VirtualMachine", "response": null},
            {"id": "vm-2", "name": "b", "type": "VirtualMachine", "response": null},
        ])
    );

    let lookup = fake
        .requests()
        .into_iter()
        .find(|r| r.endpoint == "/rest/vcenter/vm")
        .unwrap();
    assert_eq!(
        lookup.params,
        vec![("filter.clusters.1".to_string(), "domain-c1".to_string())]
    );

    assert_eq!(fake.actions("attach").len(), 2);
    assert_eq!(fake.categories().len(), 1);
    assert_eq!(fake.tags().len(), 1);
    assert!(fake.attached(&vm("vm-3")).is_empty());
}

#[tokio::test]
async fn test_tag_bulk_replace() {
    let fake = bulk_fixture();
    let env = fake.add_category("env", Cardinality::Single);
    let dev = fake.add_tag("dev", &env);
    fake.attach(&dev, vm("vm-1"));
    let client = fake.client();

    let results = client.bulk().tag_bulk(&bulk_request(BulkAction::Replace)).await.unwrap();
    assert_eq!(results.len(), 2);

    let prod = client.lookup().tag_id("env", "prod").await.unwrap();
    assert_eq!(fake.attached(&vm("vm-1")), vec![prod.clone()]);
    assert_eq!(fake.attached(&vm("vm-2")), vec![prod]);
}

#[tokio::test]
async fn test_tag_bulk_partial_failure_keeps_earlier_results() {
    let fake = bulk_fixture();
    fake.fail_attach_for("vm-2");
    let client = fake.client();

    let err = client
        .bulk()
        .tag_bulk(&bulk_request(BulkAction::Attach))
        .await
        .unwrap_err();
    assert!(matches!(err, TaggingError::ApiError(500, _)));

    let prod = client.lookup().tag_id("env", "prod").await.unwrap();
    assert_eq!(fake.attached(&vm("vm-1")), vec![prod]);
}

#[tokio::test]
async fn test_tag_bulk_unknown_container() {
    let fake = bulk_fixture();
    let client = fake.client();

    let mut request = bulk_request(BulkAction::Attach);
    request.query_name = "cls9".to_string();

    let err = client.bulk().tag_bulk(&request).await.unwrap_err();
    assert!(matches!(err, TaggingError::NotFound(_)));
    assert!(fake.categories().is_empty());
}

#[tokio::test]
async fn test_object_find_by_name_ambiguous() {
    let fake = bulk_fixture();
    fake.add_object(InventoryType::VirtualMachine, "vm-9", "a", &[]);
    let client = fake.client();

    let err = client
        .inventory()
        .find_by_name(InventoryType::VirtualMachine, "a")
        .await
        .unwrap_err();
    assert!(matches!(err, TaggingError::Ambiguous(_)));

    let found = client
        .inventory()
        .find_by_name(InventoryType::Cluster, "cls2")
        .await
        .unwrap();
    assert_eq!(found.id, "domain-c2");
}

#[tokio::test]
async fn test_detach_bulk_messages() {
    let fake = bulk_fixture();
    let client = fake.client();

    let outcome = client.bulk().detach_bulk(&bulk_request(BulkAction::Detach)).await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!([false, "Category doesn't exist: category=env"])
    );

    fake.add_category("env", Cardinality::Single);
    let outcome = client.bulk().detach_bulk(&bulk_request(BulkAction::Detach)).await.unwrap();
    assert_eq!(
        outcome.detail,
        Lookup::Missing("Tag doesn't exist: category=env tag=prod".to_string())
    );

    assert!(fake.actions("detach").is_empty());
    assert_eq!(fake.tags().len(), 0);
}

#[tokio::test]
async fn test_detach_bulk_removes_tags() {
    let fake = bulk_fixture();
    let env = fake.add_category("env", Cardinality::Single);
    let prod = fake.add_tag("prod", &env);
    fake.attach(&prod, vm("vm-1"));
    fake.attach(&prod, vm("vm-3"));
    let client = fake.client();

    let outcome = client.bulk().detach_bulk(&bulk_request(BulkAction::Attach)).await.unwrap();
    assert!(outcome.success);
    assert_eq!(fake.actions("detach").len(), 2);
    assert!(fake.attached(&vm("vm-1")).is_empty());
    assert_eq!(fake.attached(&vm("vm-3")), vec![prod]);
}

#[tokio::test]
async fn test_attach_or_create() {
    let fake = FakeVcenter::new();
    let client = fake.client();
    let category = CategorySpec::new("owner").with_cardinality(Cardinality::Multiple);

    client
        .bulk()
        .attach_or_create(&category, "alice", Some("owner alice"), &vm("vm-1"), false)
        .await
        .unwrap();

    let created = &fake.creates(CATEGORY_PATH)[0];
    assert_eq!(
        created.payload.as_ref().unwrap()["create_spec"]["cardinality"],
        "MULTIPLE"
    );
    assert_eq!(fake.attached(&vm("vm-1")).len(), 1);
}

#[tokio::test]
async fn test_tag_values() {
    let fake = FakeVcenter::new();
    let env = fake.add_category("env", Cardinality::Single);
    let owner = fake.add_category("owner", Cardinality::Multiple);
    let prod = fake.add_tag("prod", &env);
    let alice = fake.add_tag("alice", &owner);
    fake.attach(&prod, vm("vm-1"));
    fake.attach(&alice, vm("vm-1"));
    let client = fake.client();

    let outcome = client.lookup().tag_values("env", &vm("vm-1")).await.unwrap();
    assert_eq!(serde_json::to_value(&outcome).unwrap(), json!([true, ["prod"]]));

    let outcome = client.lookup().tag_values("env", &vm("vm-2")).await.unwrap();
    assert_eq!(
        outcome.detail,
        Lookup::Missing("No tags found on object: 'vm-2' with category: 'env'!".to_string())
    );

    let outcome = client.lookup().tag_values("site", &vm("vm-1")).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(
        outcome.detail,
        Lookup::Missing("Category: 'site' not found!".to_string())
    );

    let grouped = client.lookup().tags_by_category(&vm("vm-1")).await.unwrap();
    assert_eq!(grouped["env"], vec!["prod"]);
    assert_eq!(grouped["owner"], vec!["alice"]);

    let err = client
        .lookup()
        .tag_values_for_objects("env", "VirtualMachine", &["vm-1".to_string(), "vm-2".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, TaggingError::NotFound(_)));
}

#[tokio::test]
async fn test_logout() {
    let fake = FakeVcenter::new();
    let client = fake.client();

    client.logout().await.unwrap();
    let requests = fake.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].endpoint, SESSION_PATH);
}
