//! Unit tests for node health reconciliation

#[cfg(test)]
mod tests {
    use crate::reconciler::node_health::NodeHealthReconciler;
    use crate::runtime::{Action, Reconciler};
    use crate::test_utils::*;
    use catalog_types::status::{
        recorded_health, HEALTHY_CONDITION, NODE_HEALTHY_MESSAGE, NODE_HEALTH_STATUS_KEY,
        NODE_UNHEALTHY_MESSAGE,
    };
    use catalog_types::{Health, Node};
    use resource_client::{
        ConditionState, Operation, Resource, ResourceClientTrait, ResourceError,
    };

    #[tokio::test]
    async fn test_missing_node_is_noop() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);

        let action = NodeHealthReconciler::new()
            .reconcile(&rt, &request(&node_id("gone")))
            .await
            .unwrap();
        assert_eq!(action, Action::Done);
    }

    #[tokio::test]
    async fn test_no_checks_is_passing() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;

        NodeHealthReconciler::new()
            .reconcile(&rt, &request(&node.id))
            .await
            .unwrap();

        let node = read(&client, &node.id).await;
        let status = node.status_for(NODE_HEALTH_STATUS_KEY).unwrap();
        let condition = status.condition(HEALTHY_CONDITION).unwrap();
        assert_eq!(condition.state, ConditionState::True);
        assert_eq!(condition.reason, "HEALTH_PASSING");
        assert_eq!(condition.message, NODE_HEALTHY_MESSAGE);
        assert_eq!(status.observed_generation, node.generation);
    }

    #[tokio::test]
    async fn test_worst_check_wins() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;
        write_health_status(&client, &node.id, "a", Health::Passing).await;
        write_health_status(&client, &node.id, "b", Health::Warning).await;

        NodeHealthReconciler::new()
            .reconcile(&rt, &request(&node.id))
            .await
            .unwrap();

        let node = read(&client, &node.id).await;
        assert_eq!(recorded_health(&node, NODE_HEALTH_STATUS_KEY), Ok(Health::Warning));
        let condition = node
            .status_for(NODE_HEALTH_STATUS_KEY)
            .and_then(|s| s.condition(HEALTHY_CONDITION))
            .unwrap();
        assert_eq!(condition.state, ConditionState::False);
        assert_eq!(condition.message, NODE_UNHEALTHY_MESSAGE);
    }

    #[tokio::test]
    async fn test_second_reconcile_does_not_write() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;
        write_health_status(&client, &node.id, "a", Health::Critical).await;
        let reconciler = NodeHealthReconciler::new();

        reconciler.reconcile(&rt, &request(&node.id)).await.unwrap();
        let version = read(&client, &node.id).await.version;

        reconciler.reconcile(&rt, &request(&node.id)).await.unwrap();
        assert_eq!(read(&client, &node.id).await.version, version);
    }

    #[tokio::test]
    async fn test_generation_change_is_recorded() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;
        let reconciler = NodeHealthReconciler::new();
        reconciler.reconcile(&rt, &request(&node.id)).await.unwrap();

        let mut updated = read(&client, &node.id).await;
        updated.data = serde_json::to_value(Node {
            addresses: vec![catalog_types::NodeAddress {
                host: "10.0.0.9".to_string(),
                external: false,
            }],
        })
        .unwrap();
        let updated: Resource = client.write(updated).await.unwrap();
        assert_eq!(updated.generation, 2);

        reconciler.reconcile(&rt, &request(&node.id)).await.unwrap();
        let node = read(&client, &node.id).await;
        assert_eq!(
            node.status_for(NODE_HEALTH_STATUS_KEY).unwrap().observed_generation,
            2
        );
    }

    #[tokio::test]
    async fn test_list_error_is_propagated() {
        let client = create_test_client();
        let rt = create_test_runtime(&client);
        let node = write_node(&client, "n1").await;
        let unavailable = ResourceError::Unavailable("store down".to_string());
        client.fail_next(Operation::ListByOwner, unavailable.clone());

        let err = NodeHealthReconciler::new()
            .reconcile(&rt, &request(&node.id))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ControllerError::Resource(e) if e == unavailable));
        assert!(read(&client, &node.id).await.status.is_empty());
    }
}
