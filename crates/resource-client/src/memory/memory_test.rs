//! Unit tests for the in-memory store

#[cfg(test)]
mod tests {
    use crate::error::ResourceError;
    use crate::memory::{MemoryResourceClient, Operation};
    use crate::models::*;
    use crate::resource_trait::ResourceClientTrait;
    use serde_json::json;

    const WIDGET: ResourceType = ResourceType::new_static("demo", "v1", "Widget");
    const GADGET: ResourceType = ResourceType::new_static("demo", "v1", "Gadget");
    const UNKNOWN: ResourceType = ResourceType::new_static("demo", "v1", "Unknown");

    fn tenancy() -> Tenancy {
        Tenancy::new("default", "default")
    }

    fn widget_id(name: &str) -> ResourceId {
        ResourceId::new(WIDGET, tenancy(), name)
    }

    fn client() -> MemoryResourceClient {
        MemoryResourceClient::new([WIDGET, GADGET])
    }

    async fn put(client: &MemoryResourceClient, name: &str, size: u64) -> Resource {
        client
            .write(Resource::new(widget_id(name), &json!({ "size": size })).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_uid_and_first_generation() {
        let client = client();
        let written = put(&client, "w1", 1).await;

        assert!(written.id.uid.is_some());
        assert_eq!(written.generation, 1);
        assert!(written.version > 0);
    }

    #[tokio::test]
    async fn test_generation_only_moves_on_data_change() {
        let client = client();
        let first = put(&client, "w1", 1).await;

        let same = put(&client, "w1", 1).await;
        assert_eq!(same.generation, first.generation);
        assert!(same.version > first.version);
        assert_eq!(same.id.uid, first.id.uid);

        let changed = put(&client, "w1", 2).await;
        assert_eq!(changed.generation, first.generation + 1);
    }

    #[tokio::test]
    async fn test_write_with_stale_version_conflicts() {
        let client = client();
        let first = put(&client, "w1", 1).await;
        put(&client, "w1", 2).await;

        let mut stale = Resource::new(widget_id("w1"), &json!({ "size": 3 })).unwrap();
        stale.version = first.version;
        let err = client.write(stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_write_preserves_status() {
        let client = client();
        let written = put(&client, "w1", 1).await;
        client
            .write_status(&written.id, "ctl", Status::new(1, vec![]))
            .await
            .unwrap();

        let rewritten = put(&client, "w1", 5).await;
        assert!(rewritten.status.contains_key("ctl"));
    }

    #[tokio::test]
    async fn test_write_status_bumps_version_only() {
        let client = client();
        let written = put(&client, "w1", 1).await;

        let updated = client
            .write_status(&written.id, "ctl", Status::new(1, vec![]))
            .await
            .unwrap();

        assert_eq!(updated.generation, written.generation);
        assert!(updated.version > written.version);
        assert!(updated.status["ctl"].updated_at.is_some());
    }

    #[tokio::test]
    async fn test_read_with_stale_uid_is_not_found() {
        let client = client();
        let first = put(&client, "w1", 1).await;
        client.delete(&first.id, None).await.unwrap();
        put(&client, "w1", 1).await;

        let err = client.read(&first.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(client.read(&widget_id("w1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unregistered_type_is_invalid_argument() {
        let client = client();
        let id = ResourceId::new(UNKNOWN, tenancy(), "x");

        let err = client.read(&id).await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument(_)));
        let err = client.list(&UNKNOWN, None, None).await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_tenancy_and_prefix() {
        let client = client();
        put(&client, "api-1", 1).await;
        put(&client, "api-2", 1).await;
        put(&client, "web-1", 1).await;
        client
            .write(
                Resource::new(
                    ResourceId::new(WIDGET, Tenancy::new("default", "other"), "api-3"),
                    &json!({}),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let names = |rs: Vec<Resource>| rs.into_iter().map(|r| r.id.name).collect::<Vec<_>>();

        let scoped = client.list(&WIDGET, Some(&tenancy()), Some("api-")).await.unwrap();
        assert_eq!(names(scoped), vec!["api-1", "api-2"]);

        let everything = client.list(&WIDGET, Some(&tenancy()), Some("")).await.unwrap();
        assert_eq!(everything.len(), 3);

        let all_tenancies = client.list(&WIDGET, None, Some("api-")).await.unwrap();
        assert_eq!(all_tenancies.len(), 3);
    }

    #[tokio::test]
    async fn test_list_by_owner_matches_key_and_uid() {
        let client = client();
        let owner = put(&client, "owner", 1).await;

        let child = |name: &str, owner: ResourceId| {
            Resource::new(ResourceId::new(GADGET, tenancy(), name), &json!({}))
                .unwrap()
                .with_owner(owner)
        };
        client.write(child("by-key", widget_id("owner"))).await.unwrap();
        client.write(child("by-uid", owner.id.clone())).await.unwrap();
        let mut stale = owner.id.clone();
        stale.uid = Some("previous-incarnation".to_string());
        client.write(child("stale", stale)).await.unwrap();

        let children = client.list_by_owner(&owner.id).await.unwrap();
        let names: Vec<_> = children.iter().map(|r| r.id.name.as_str()).collect();
        assert_eq!(names, vec!["by-key", "by-uid"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_creates_tombstone() {
        let client = client();
        let written = put(&client, "w1", 1).await;

        client.delete(&written.id, None).await.unwrap();
        client.delete(&written.id, None).await.unwrap();

        let tombstones = client.list(&TOMBSTONE_TYPE, None, None).await.unwrap();
        assert_eq!(tombstones.len(), 1);
        let tombstone: Tombstone = tombstones[0].decode().unwrap();
        assert_eq!(tombstone.owner, written.id);
    }

    #[tokio::test]
    async fn test_deleting_tombstone_leaves_no_tombstone() {
        let client = client();
        let written = put(&client, "w1", 1).await;
        client.delete(&written.id, None).await.unwrap();
        let tombstone = client.list(&TOMBSTONE_TYPE, None, None).await.unwrap().remove(0);

        client.delete(&tombstone.id, None).await.unwrap();
        assert_eq!(client.count(&TOMBSTONE_TYPE), 0);
    }

    #[tokio::test]
    async fn test_cas_delete_with_stale_version_conflicts() {
        let client = client();
        let first = put(&client, "w1", 1).await;
        put(&client, "w1", 2).await;

        let err = client.delete(&first.id, Some(first.version)).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(client.read(&widget_id("w1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fault_injection_is_one_shot() {
        let client = client();
        put(&client, "w1", 1).await;
        client.fail_next(Operation::Read, ResourceError::Unavailable("down".to_string()));

        let err = client.read(&widget_id("w1")).await.unwrap_err();
        assert!(matches!(err, ResourceError::Unavailable(_)));
        assert!(client.read(&widget_id("w1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let client = client();
        let mut events = client.subscribe();

        let written = put(&client, "w1", 1).await;
        client.delete(&written.id, None).await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), WatchEvent::Upsert(r) if r.id.name == "w1"));
        assert!(matches!(events.recv().await.unwrap(), WatchEvent::Delete(r) if r.id.name == "w1"));
        let tombstone = events.recv().await.unwrap();
        assert!(tombstone.resource().id.is_type(&TOMBSTONE_TYPE));
    }

    #[test]
    fn test_status_equivalence_ignores_timestamp() {
        let condition = Condition::new("Ready", ConditionState::True, "Ok", "");
        let mut a = Status::new(3, vec![condition.clone()]);
        let b = Status::new(3, vec![condition]);
        a.updated_at = Some(chrono::Utc::now());

        assert!(a.equivalent(&b));
        assert!(!Status::new(4, vec![]).equivalent(&b));
    }
}
