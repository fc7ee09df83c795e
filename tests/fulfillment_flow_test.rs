// ==========================================
// Fulfillment flow tests
// ==========================================
// Coordinator against a temp SQLite database:
// plan selection, expiry, shortfall policy, retries and fatal errors
// ==========================================


#[cfg(test)]
mod fulfillment_flow_test {
    use async_trait::async_trait;
    use blood_bank_allocation::config::{
        AllocationSettings, CandidateOrder, ConfigManager, StaticAllocationConfig,
    };
    use blood_bank_allocation::config::config_keys;
    use blood_bank_allocation::domain::{AllocationLog, DonationUnit, RequestStatus};
    use blood_bank_allocation::engine::{
        FulfillmentError, FulfillmentEvent, FulfillmentEventPublisher, FulfillmentEventType,
        FulfillmentRepositories, InventorySnapshotProvider, OptionalEventPublisher, ProviderError,
        RequestFulfillmentCoordinator, SqliteSnapshotProvider,
    };
    use std::error::Error;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // Setup
    // ==========================================

    struct TestEnv {
        _temp_file: NamedTempFile,
        repos: FulfillmentRepositories,
        coordinator: RequestFulfillmentCoordinator<StaticAllocationConfig>,
    }

    fn setup_with(settings: AllocationSettings, events: OptionalEventPublisher) -> TestEnv {
        let (temp_file, db_path) = create_test_db().unwrap();
        let repos = FulfillmentRepositories::open(&db_path).unwrap();
        let provider = Arc::new(SqliteSnapshotProvider::new(repos.unit_repo.clone()));

        let coordinator = RequestFulfillmentCoordinator::new(
            repos.clone(),
            provider,
            Arc::new(StaticAllocationConfig(settings)),
            events,
        );

        TestEnv {
            _temp_file: temp_file,
            repos,
            coordinator,
        }
    }

    fn setup() -> TestEnv {
        setup_with(AllocationSettings::default(), OptionalEventPublisher::none())
    }

    struct FailingProvider;

    #[async_trait]
    impl InventorySnapshotProvider for FailingProvider {
        async fn fetch_successful_collections(&self) -> Result<Vec<DonationUnit>, ProviderError> {
            Err(ProviderError::Unavailable("inventory service timed out".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<FulfillmentEvent>>,
    }

    impl FulfillmentEventPublisher for RecordingPublisher {
        fn publish(&self, event: FulfillmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    // ==========================================
    // Plan selection
    // ==========================================

    #[tokio::test]
    async fn test_b_positive_example_scenario() {
        let env = setup();
        seed_units(
            &env.repos.unit_repo,
            &[
                unit("B-LIVE", "B+", 2, 3),
                unit("O-POS", "O+", 5, 3),
                unit("B-OLD", "B+", 10, 40),
            ],
        );
        let request_id = seed_request(&env.repos.request_repo, "B+", 3);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.status, RequestStatus::Confirmed);
        assert_eq!(result.units_deducted, 3);
        assert_eq!(result.units_committed, 2);
        assert_eq!(result.units_still_needed, 0);
        assert_eq!(result.units_deducted_by_type.get("B+"), Some(&2));
        assert_eq!(result.units_deducted_by_type.get("O+"), Some(&1));
        assert!(!result.is_degraded());

        assert_eq!(remaining(&env.repos.unit_repo, "B-LIVE"), 0);
        assert_eq!(remaining(&env.repos.unit_repo, "O-POS"), 4);
        assert_eq!(remaining(&env.repos.unit_repo, "B-OLD"), 10);
    }

    #[tokio::test]
    async fn test_exact_match_preferred_over_universal_donor() {
        let env = setup();
        seed_units(
            &env.repos.unit_repo,
            &[unit("ONEG", "O-", 10, 1), unit("OPOS", "O+", 10, 1)],
        );
        let request_id = seed_request(&env.repos.request_repo, "O+", 4);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.units_deducted_by_type.get("O+"), Some(&4));
        assert!(result.units_deducted_by_type.get("O-").is_none());
        assert_eq!(remaining(&env.repos.unit_repo, "ONEG"), 10);
        assert_eq!(remaining(&env.repos.unit_repo, "OPOS"), 6);
    }

    #[tokio::test]
    async fn test_substitution_consumes_lowest_priority_first() {
        let env = setup();
        seed_units(
            &env.repos.unit_repo,
            &[
                unit("AB-P", "AB+", 1, 2),
                unit("A-N", "A-", 5, 2),
                unit("B-N", "B-", 5, 2),
                unit("O-N", "O-", 3, 2),
            ],
        );
        let request_id = seed_request(&env.repos.request_repo, "AB+", 6);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        // 1 exact AB+, then O- (priority 1) exhausted, then B- (3) before A- (5)
        assert_eq!(result.units_deducted, 6);
        assert_eq!(remaining(&env.repos.unit_repo, "AB-P"), 0);
        assert_eq!(remaining(&env.repos.unit_repo, "O-N"), 0);
        assert_eq!(remaining(&env.repos.unit_repo, "B-N"), 3);
        assert_eq!(remaining(&env.repos.unit_repo, "A-N"), 5);
    }

    #[tokio::test]
    async fn test_expired_exact_match_never_selected() {
        let env = setup();
        seed_units(
            &env.repos.unit_repo,
            &[unit("A-OLD", "A+", 10, 35), unit("A-FRESH", "A+", 1, 34)],
        );
        let request_id = seed_request(&env.repos.request_repo, "A+", 2);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.units_deducted, 1);
        assert_eq!(result.units_still_needed, 1);
        assert_eq!(remaining(&env.repos.unit_repo, "A-OLD"), 10);
        assert_eq!(remaining(&env.repos.unit_repo, "A-FRESH"), 0);
    }

    #[tokio::test]
    async fn test_expiry_first_order_from_config_table() {
        let (temp_file, db_path) = create_test_db().unwrap();
        let repos = FulfillmentRepositories::open(&db_path).unwrap();
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_global_config_value(config_keys::EXACT_MATCH_ORDER, "EXPIRY_FIRST")
            .unwrap();

        let coordinator = RequestFulfillmentCoordinator::new(
            repos.clone(),
            Arc::new(SqliteSnapshotProvider::new(repos.unit_repo.clone())),
            Arc::new(config),
            OptionalEventPublisher::none(),
        );

        seed_units(
            &repos.unit_repo,
            &[unit("NEWER", "B-", 4, 2), unit("OLDER", "B-", 4, 30)],
        );
        let request_id = seed_request(&repos.request_repo, "B-", 3);

        coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(remaining(&repos.unit_repo, "OLDER"), 1);
        assert_eq!(remaining(&repos.unit_repo, "NEWER"), 4);
        drop(temp_file);
    }

    // ==========================================
    // Shortfall policy
    // ==========================================

    #[tokio::test]
    async fn test_shortfall_still_confirms_by_default() {
        let env = setup();
        seed_units(&env.repos.unit_repo, &[unit("O-N", "O-", 2, 1)]);
        let request_id = seed_request(&env.repos.request_repo, "O-", 5);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.status, RequestStatus::Confirmed);
        assert!(result.has_shortfall());
        assert!(result.is_degraded());
        assert_eq!(result.units_still_needed, 3);
    }

    #[tokio::test]
    async fn test_shortfall_leaves_pending_when_configured() {
        let settings = AllocationSettings {
            confirm_on_shortfall: false,
            ..Default::default()
        };
        let env = setup_with(settings, OptionalEventPublisher::none());
        seed_units(&env.repos.unit_repo, &[unit("O-N", "O-", 2, 1)]);
        let request_id = seed_request(&env.repos.request_repo, "O-", 5);

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.status, RequestStatus::Pending);
        assert!(!result.success);
        assert_eq!(result.units_deducted, 2);

        let stored = env.repos.request_repo.find_by_id(request_id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    // ==========================================
    // Retries and fatal errors
    // ==========================================

    #[tokio::test]
    async fn test_confirmed_request_is_not_refulfilled() {
        let env = setup();
        seed_units(&env.repos.unit_repo, &[unit("A-P", "A+", 10, 1)]);
        let request_id = seed_request(&env.repos.request_repo, "A+", 2);

        env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();
        assert_eq!(remaining(&env.repos.unit_repo, "A-P"), 8);

        let err = env
            .coordinator
            .fulfill_at(request_id, test_now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::InvalidRequestState {
                status: RequestStatus::Confirmed,
                ..
            }
        ));
        assert_eq!(remaining(&env.repos.unit_repo, "A-P"), 8);
        assert_eq!(env.repos.allocation_log_repo.list_by_request(request_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_retry_deducts_only_the_remainder() {
        let settings = AllocationSettings {
            confirm_on_shortfall: false,
            ..Default::default()
        };
        let env = setup_with(settings, OptionalEventPublisher::none());
        seed_units(&env.repos.unit_repo, &[unit("O-N", "O-", 2, 1)]);
        let request_id = seed_request(&env.repos.request_repo, "O-", 5);

        let first = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();
        assert_eq!(first.units_deducted, 2);
        assert_eq!(first.units_still_needed, 3);
        assert_eq!(first.status, RequestStatus::Pending);

        // restock well beyond what is still owed
        seed_units(&env.repos.unit_repo, &[unit("O-R", "O-", 10, 1)]);

        let second = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();
        assert_eq!(second.units_previously_deducted, 2);
        assert_eq!(second.units_planned, 3);
        assert_eq!(second.units_deducted, 3);
        assert_eq!(second.units_still_needed, 0);
        assert_eq!(second.status, RequestStatus::Confirmed);

        assert!(first.units_deducted + second.units_deducted <= 5);
        assert_eq!(remaining(&env.repos.unit_repo, "O-R"), 7);

        let logged: u32 = env
            .repos
            .allocation_log_repo
            .list_by_request(request_id)
            .unwrap()
            .iter()
            .map(|log| log.units_taken)
            .sum();
        assert_eq!(logged, 5);

        let stored = env.repos.request_repo.find_by_id(request_id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_pending_retry_with_full_log_only_confirms() {
        let env = setup();
        seed_units(&env.repos.unit_repo, &[unit("AB-P", "AB+", 6, 1)]);
        let request_id = seed_request(&env.repos.request_repo, "AB+", 3);

        // an earlier attempt deducted everything but never flipped the status
        env.repos
            .allocation_log_repo
            .insert_batch(&[AllocationLog {
                log_id: "earlier-attempt".to_string(),
                request_id,
                unit_key: "AB-P".to_string(),
                blood_type: bt("AB+"),
                units_taken: 3,
                logged_at: test_now(),
            }])
            .unwrap();

        let result = env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.units_previously_deducted, 3);
        assert_eq!(result.units_planned, 0);
        assert_eq!(result.units_deducted, 0);
        assert_eq!(result.status, RequestStatus::Confirmed);
        assert!(!result.is_degraded());
        assert_eq!(remaining(&env.repos.unit_repo, "AB-P"), 6);
    }

    #[tokio::test]
    async fn test_oversized_shelf_life_setting_does_not_abort_fulfillment() {
        let (temp_file, db_path) = create_test_db().unwrap();
        let repos = FulfillmentRepositories::open(&db_path).unwrap();
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_global_config_value(config_keys::SHELF_LIFE_DAYS, "100000000")
            .unwrap();

        let coordinator = RequestFulfillmentCoordinator::new(
            repos.clone(),
            Arc::new(SqliteSnapshotProvider::new(repos.unit_repo.clone())),
            Arc::new(config),
            OptionalEventPublisher::none(),
        );

        // 40 days old: expired under the 35 day default
        seed_units(
            &repos.unit_repo,
            &[unit("STALE", "A-", 4, 40), unit("FRESH", "A-", 4, 1)],
        );
        let request_id = seed_request(&repos.request_repo, "A-", 2);

        let result = coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        assert_eq!(result.units_deducted, 2);
        assert_eq!(remaining(&repos.unit_repo, "STALE"), 4);
        assert_eq!(remaining(&repos.unit_repo, "FRESH"), 2);
        drop(temp_file);
    }

    #[tokio::test]
    async fn test_missing_request_is_fatal() {
        let env = setup();
        let err = env.coordinator.fulfill_at(404, test_now()).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::RequestNotFound(404)));
    }

    #[tokio::test]
    async fn test_provider_failure_mutates_nothing() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = FulfillmentRepositories::open(&db_path).unwrap();
        seed_units(&repos.unit_repo, &[unit("A-P", "A+", 10, 1)]);
        let request_id = seed_request(&repos.request_repo, "A+", 2);

        let coordinator = RequestFulfillmentCoordinator::new(
            repos.clone(),
            Arc::new(FailingProvider),
            Arc::new(StaticAllocationConfig::default()),
            OptionalEventPublisher::none(),
        );

        let err = coordinator.fulfill_at(request_id, test_now()).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::ProviderUnavailable(_)));
        assert_eq!(remaining(&repos.unit_repo, "A-P"), 10);
        let stored = repos.request_repo.find_by_id(request_id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    // ==========================================
    // Audit log and events
    // ==========================================

    #[tokio::test]
    async fn test_committed_entries_are_logged_and_published() {
        let publisher = Arc::new(RecordingPublisher::default());
        let env = setup_with(
            AllocationSettings::default(),
            OptionalEventPublisher::with_publisher(publisher.clone()),
        );
        seed_units(
            &env.repos.unit_repo,
            &[unit("B-P", "B+", 1, 1), unit("B-N", "B-", 1, 1)],
        );
        let request_id = seed_request(&env.repos.request_repo, "B+", 2);

        env.coordinator.fulfill_at(request_id, test_now()).await.unwrap();

        let logs = env.repos.allocation_log_repo.list_by_request(request_id).unwrap();
        let mut keys: Vec<&str> = logs.iter().map(|l| l.unit_key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["B-N", "B-P"]);
        assert!(logs.iter().all(|l| l.units_taken == 1 && l.logged_at == test_now()));

        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_id, request_id);
        assert_eq!(events[0].event_type, FulfillmentEventType::Fulfilled);
    }

    #[tokio::test]
    async fn test_preview_is_read_only_and_oldest_first() {
        let env = setup();
        seed_units(
            &env.repos.unit_repo,
            &[
                unit("NEW", "A-", 3, 1),
                unit("MID", "O-", 3, 10),
                unit("OLD", "A-", 3, 20),
                unit("EXPIRED", "A-", 3, 50),
                unit("WRONG", "B-", 3, 25),
            ],
        );
        let request_id = seed_request(&env.repos.request_repo, "A-", 2);

        let candidates = env.coordinator.preview_at(request_id, test_now()).await.unwrap();

        let keys: Vec<&str> = candidates.iter().map(|c| c.unit.unit_key.as_str()).collect();
        assert_eq!(keys, vec!["OLD", "MID"]);

        // two rows for two units, though together they hold six
        let volume: u32 = candidates.iter().map(|c| c.unit.remaining_volume).sum();
        assert_eq!(volume, 6);
        assert_eq!(candidates[0].expires_at, days_ago(20) + chrono::Duration::days(35));
        assert_eq!(remaining(&env.repos.unit_repo, "OLD"), 3);

        let stored = env.repos.request_repo.find_by_id(request_id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[test]
    fn test_candidate_order_default_is_snapshot() {
        assert_eq!(AllocationSettings::default().candidate_order, CandidateOrder::Snapshot);
    }
}
