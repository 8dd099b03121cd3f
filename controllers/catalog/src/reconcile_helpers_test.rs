//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use crate::reconcile_helpers::*;
    use crate::test_utils::*;
    use catalog_types::{Health, Node, NODE_TYPE};
    use resource_client::{
        Condition, ConditionState, Operation, Resource, ResourceError, ResourceId, Status,
    };

    #[tokio::test]
    async fn test_read_if_exists() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);

        assert!(read_if_exists(&rt, &node_id("n1")).await.unwrap().is_none());

        write_node(&client, "n1").await;
        assert!(read_if_exists(&rt, &node_id("n1")).await.unwrap().is_some());

        client.fail_next(Operation::Read, ResourceError::Unavailable("down".to_string()));
        assert!(read_if_exists(&rt, &node_id("n1")).await.is_err());
    }

    #[tokio::test]
    async fn test_aggregate_owned_health() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;

        assert_eq!(
            aggregate_owned_health(&rt, &node.id).await.unwrap(),
            Health::Passing
        );

        write_health_status(&client, &node.id, "a", Health::Passing).await;
        write_health_status(&client, &node.id, "b", Health::Warning).await;
        write_health_status(&client, &node_id("other"), "c", Health::Critical).await;
        assert_eq!(
            aggregate_owned_health(&rt, &node.id).await.unwrap(),
            Health::Warning
        );
    }

    #[tokio::test]
    async fn test_aggregate_ignores_other_child_types() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;

        // A node owning another node is unusual but must not be decoded as a check
        let child = Resource::new(ResourceId::new(NODE_TYPE, node_tenancy(), "child"), &Node::default())
            .unwrap()
            .with_owner(node.id.clone());
        client.seed(vec![child]).unwrap();

        assert_eq!(
            aggregate_owned_health(&rt, &node.id).await.unwrap(),
            Health::Passing
        );
    }

    #[tokio::test]
    async fn test_write_status_if_changed() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;
        let status = Status::new(
            1,
            vec![Condition::new("Healthy", ConditionState::True, "HEALTH_PASSING", "ok")],
        );

        assert!(write_status_if_changed(&rt, &node, "test", status.clone()).await.unwrap());

        let node = read(&client, &node.id).await;
        let version = node.version;
        assert!(!write_status_if_changed(&rt, &node, "test", status).await.unwrap());
        assert_eq!(read(&client, &node.id).await.version, version);
    }
}
