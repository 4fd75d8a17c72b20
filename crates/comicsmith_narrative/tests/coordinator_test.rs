//! Tests for the generation coordinator: retry, fallback, concurrency and cancellation.

mod test_utils;

use comicsmith_core::{
    FailureReason, GenerationConstraints, GenerationRequest, GenerationStatus, PanelId,
};
use comicsmith_error::ProviderErrorKind;
use comicsmith_narrative::{FallbackChain, GenerationCoordinator, ProviderEntry, RunCancellation};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use test_utils::{MockImageProvider, chain, fast_policy, generation};

fn requests(n: u32) -> Vec<GenerationRequest> {
    (1..=n)
        .map(|i| {
            GenerationRequest::new(
                PanelId::new(1, i),
                format!("panel {} prompt", i),
                GenerationConstraints::default(),
            )
        })
        .collect()
}

fn server_error() -> ProviderErrorKind {
    ProviderErrorKind::Server {
        status_code: 503,
        message: "overloaded".to_string(),
    }
}

#[tokio::test]
async fn test_every_request_gets_one_result() {
    let provider = MockImageProvider::new_success("primary");
    let coordinator = GenerationCoordinator::new(generation(3, 1000));

    let results = coordinator
        .run(requests(5), &chain(&[provider.clone()], 3), &RunCancellation::new())
        .await;

    assert_eq!(results.len(), 5);
    for (i, (panel_id, result)) in results.iter().enumerate() {
        assert_eq!(*panel_id, PanelId::new(1, i as u32 + 1));
        assert_eq!(result.panel_id, *panel_id);
        assert_eq!(result.status(), GenerationStatus::Succeeded);
        assert_eq!(result.provider_used.as_deref(), Some("primary"));
        assert_eq!(result.attempts, 1);
    }
    assert_eq!(provider.call_count(), 5);
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_budget() {
    let provider = MockImageProvider::new_fail_then_succeed(
        "primary",
        2,
        ProviderErrorKind::Timeout("slow".to_string()),
    );
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let results = coordinator
        .run(requests(1), &chain(&[provider.clone()], 3), &RunCancellation::new())
        .await;

    let result = &results[&PanelId::new(1, 1)];
    assert_eq!(result.status(), GenerationStatus::Succeeded);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.total_attempts, 3);
    assert_eq!(provider.call_count(), 3);
}

fn patient_policy(name: &str) -> comicsmith_rate_limit::ProviderConfig {
    comicsmith_rate_limit::ProviderConfig {
        initial_backoff_ms: 10,
        max_backoff_ms: 30_000,
        ..fast_policy(name, 3)
    }
}

fn rate_limited(after: Duration) -> ProviderErrorKind {
    ProviderErrorKind::RateLimited {
        retry_after: Some(after),
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_delays_the_next_attempt() {
    let provider =
        MockImageProvider::new_fail_then_succeed("primary", 1, rate_limited(Duration::from_secs(7)));
    let chain = FallbackChain::new(vec![ProviderEntry::new(
        Arc::new(provider.clone()),
        patient_policy("primary"),
    )]);
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let started = Instant::now();
    let results = coordinator
        .run(requests(1), &chain, &RunCancellation::new())
        .await;

    assert_eq!(results[&PanelId::new(1, 1)].status(), GenerationStatus::Succeeded);
    assert_eq!(provider.call_count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_is_capped_at_max_backoff() {
    let provider = MockImageProvider::new_fail_then_succeed(
        "primary",
        1,
        rate_limited(Duration::from_secs(3600)),
    );
    let policy = comicsmith_rate_limit::ProviderConfig {
        max_backoff_ms: 2_000,
        ..patient_policy("primary")
    };
    let chain = FallbackChain::new(vec![ProviderEntry::new(Arc::new(provider.clone()), policy)]);
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let started = Instant::now();
    let results = coordinator
        .run(requests(1), &chain, &RunCancellation::new())
        .await;

    assert_eq!(results[&PanelId::new(1, 1)].attempts, 2);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(2));
    assert!(waited < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_without_retry_after_backoff_stays_short() {
    let provider = MockImageProvider::new_fail_then_succeed(
        "primary",
        1,
        ProviderErrorKind::RateLimited { retry_after: None },
    );
    let chain = FallbackChain::new(vec![ProviderEntry::new(
        Arc::new(provider.clone()),
        patient_policy("primary"),
    )]);
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let started = Instant::now();
    coordinator
        .run(requests(1), &chain, &RunCancellation::new())
        .await;

    assert_eq!(provider.call_count(), 2);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_exhausted_retries_fall_back_to_next_provider() {
    let primary = MockImageProvider::new_error("primary", server_error());
    let backup = MockImageProvider::new_success("backup");
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let results = coordinator
        .run(
            requests(1),
            &chain(&[primary.clone(), backup.clone()], 3),
            &RunCancellation::new(),
        )
        .await;

    let result = &results[&PanelId::new(1, 1)];
    assert_eq!(result.status(), GenerationStatus::Succeeded);
    assert_eq!(result.provider_used.as_deref(), Some("backup"));
    assert_eq!(result.attempts, 1);
    assert_eq!(result.total_attempts, 4);
    assert_eq!(primary.call_count(), 3);
    assert_eq!(backup.call_count(), 1);
}

#[tokio::test]
async fn test_permanent_failure_skips_retries() {
    let primary = MockImageProvider::new_error(
        "primary",
        ProviderErrorKind::ContentPolicy("prompt rejected".to_string()),
    );
    let backup = MockImageProvider::new_success("backup");
    let coordinator = GenerationCoordinator::new(generation(1, 1000));

    let results = coordinator
        .run(
            requests(1),
            &chain(&[primary.clone(), backup.clone()], 5),
            &RunCancellation::new(),
        )
        .await;

    let result = &results[&PanelId::new(1, 1)];
    assert_eq!(result.provider_used.as_deref(), Some("backup"));
    assert_eq!(result.total_attempts, 2);
    assert_eq!(primary.call_count(), 1);
}

#[tokio::test]
async fn test_exhausted_chain_fails_the_panel_only() {
    let primary = MockImageProvider::new_error("primary", server_error());
    let backup = MockImageProvider::new_error(
        "backup",
        ProviderErrorKind::InvalidRequest("unsupported size".to_string()),
    );
    let coordinator = GenerationCoordinator::new(generation(2, 1000));

    let results = coordinator
        .run(
            requests(2),
            &chain(&[primary.clone(), backup.clone()], 2),
            &RunCancellation::new(),
        )
        .await;

    assert_eq!(results.len(), 2);
    for result in results.values() {
        assert_eq!(result.status(), GenerationStatus::Failed);
        assert_eq!(result.provider_used.as_deref(), Some("backup"));
        assert_eq!(result.attempts, 1);
        assert_eq!(result.total_attempts, 3);
        match result.failure() {
            Some(FailureReason::Exhausted { last_error }) => {
                assert!(last_error.contains("unsupported size"));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_empty_chain_fails_every_request() {
    let coordinator = GenerationCoordinator::new(generation(2, 1000));

    let results = coordinator
        .run(requests(3), &FallbackChain::default(), &RunCancellation::new())
        .await;

    assert_eq!(results.len(), 3);
    assert!(
        results
            .values()
            .all(|result| result.failure() == Some(&FailureReason::NoProviders))
    );
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let provider = MockImageProvider::new_success("primary").gated();
    let coordinator = GenerationCoordinator::new(generation(2, 1000));
    let chain = chain(&[provider.clone()], 1);

    let run = tokio::spawn({
        let coordinator = coordinator.clone();
        let chain = chain.clone();
        async move {
            coordinator
                .run(requests(5), &chain, &RunCancellation::new())
                .await
        }
    });

    provider.wait_for_calls(2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(provider.call_count(), 2);

    provider.release(5);
    let results = run.await.unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.values().all(|r| r.status() == GenerationStatus::Succeeded));
    assert_eq!(provider.max_in_flight(), 2);
}

#[tokio::test]
async fn test_provider_concurrency_cap_is_shared_by_workers() {
    let provider = MockImageProvider::new_success("primary").gated();
    let policy = comicsmith_rate_limit::ProviderConfig {
        max_concurrent: Some(1),
        ..fast_policy("primary", 1)
    };
    let chain = FallbackChain::new(vec![ProviderEntry::new(Arc::new(provider.clone()), policy)]);
    let coordinator = GenerationCoordinator::new(generation(3, 1000));

    let run = tokio::spawn({
        let chain = chain.clone();
        async move {
            coordinator
                .run(requests(3), &chain, &RunCancellation::new())
                .await
        }
    });

    provider.wait_for_calls(1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(provider.call_count(), 1);

    provider.release(3);
    let results = run.await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_rate_limit_caps_calls_per_window() {
    let provider = MockImageProvider::new_success("primary");
    let policy = comicsmith_rate_limit::ProviderConfig {
        requests_per_window: Some(2),
        window_secs: 1,
        ..fast_policy("primary", 1)
    };
    let chain = FallbackChain::new(vec![ProviderEntry::new(Arc::new(provider.clone()), policy)]);
    let coordinator = GenerationCoordinator::new(generation(3, 1000));

    let run = tokio::spawn({
        let chain = chain.clone();
        async move {
            coordinator
                .run(requests(3), &chain, &RunCancellation::new())
                .await
        }
    });

    // Three workers are free, but only two calls fit in the first second
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(provider.call_count(), 2);

    let results = run.await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_cancellation_lets_in_flight_work_finish() {
    let provider = MockImageProvider::new_success("primary").gated();
    let coordinator = GenerationCoordinator::new(generation(2, 5000));
    let chain = chain(&[provider.clone()], 1);
    let cancellation = RunCancellation::new();

    let run = tokio::spawn({
        let chain = chain.clone();
        let cancellation = cancellation.clone();
        async move { coordinator.run(requests(5), &chain, &cancellation).await }
    });

    provider.wait_for_calls(2).await;
    cancellation.cancel();
    provider.release(2);

    let results = run.await.unwrap();
    assert_eq!(results.len(), 5);
    let succeeded: Vec<_> = results
        .values()
        .filter(|r| r.status() == GenerationStatus::Succeeded)
        .map(|r| r.panel_id)
        .collect();
    assert_eq!(succeeded, vec![PanelId::new(1, 1), PanelId::new(1, 2)]);
    assert_eq!(results.values().filter(|r| r.is_cancelled()).count(), 3);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_grace_period_abandons_stuck_work() {
    let provider = MockImageProvider::new_success("primary").gated();
    let coordinator = GenerationCoordinator::new(generation(2, 50));
    let chain = chain(&[provider.clone()], 1);
    let cancellation = RunCancellation::new();

    let run = tokio::spawn({
        let chain = chain.clone();
        let cancellation = cancellation.clone();
        async move { coordinator.run(requests(4), &chain, &cancellation).await }
    });

    provider.wait_for_calls(2).await;
    cancellation.cancel();

    let results = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should finish after the grace period")
        .unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.values().all(|r| r.is_cancelled()));
}

#[tokio::test]
async fn test_cancelled_before_start_dispatches_nothing() {
    let provider = MockImageProvider::new_success("primary");
    let coordinator = GenerationCoordinator::new(generation(2, 1000));
    let cancellation = RunCancellation::new();
    cancellation.cancel();

    let results = coordinator
        .run(requests(3), &chain(&[provider.clone()], 1), &cancellation)
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.values().all(|r| r.is_cancelled()));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_panel_ids_keep_first_result() {
    let provider = MockImageProvider::new_success("primary");
    let coordinator = GenerationCoordinator::new(generation(1, 1000));
    let mut batch = requests(1);
    batch.push(batch[0].clone());

    let results = coordinator
        .run(batch, &chain(&[provider.clone()], 1), &RunCancellation::new())
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[&PanelId::new(1, 1)].status(), GenerationStatus::Succeeded);
}
