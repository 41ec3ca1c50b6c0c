//! End-to-end quota flows against the in-memory store, plus store-outage
//! behavior via an unreachable store double.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use quotaguard::{
    CounterKey, CounterStore, InMemoryCounterStore, OutagePolicy, QuotaConfig, QuotaController,
    StoreUnavailable, WindowCounter, WindowPolicy, BURST_WINDOW, SUSTAINED_WINDOW,
};

/// Store double that always reports an outage.
#[derive(Debug, Default)]
struct UnreachableStore;

#[async_trait]
impl CounterStore for UnreachableStore {
    async fn increment_and_expire(
        &self,
        _key: &CounterKey,
        _window: Duration,
    ) -> Result<WindowCounter, StoreUnavailable> {
        Err(StoreUnavailable::new("connection timed out"))
    }

    async fn peek(&self, _key: &CounterKey) -> Result<WindowCounter, StoreUnavailable> {
        Err(StoreUnavailable::new("connection timed out"))
    }

    async fn reset(&self, _key: &CounterKey) -> Result<(), StoreUnavailable> {
        Err(StoreUnavailable::new("connection timed out"))
    }
}

/// Layer counting events at a given level, for telemetry assertions.
struct EventCounter {
    level: Level,
    count: Arc<AtomicUsize>,
}

impl<S: tracing::Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == self.level {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn burst_controller(max_count: u64) -> QuotaController {
    let config =
        QuotaConfig::default().with_default_policy(BURST_WINDOW, WindowPolicy::new(60, max_count));
    QuotaController::new(Arc::new(InMemoryCounterStore::new()), config).unwrap()
}

#[tokio::test]
async fn full_window_is_consumed_then_denied() {
    // policy burst = (60s, 20)
    let controller = burst_controller(20);

    for i in 1..=20 {
        let decision = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
        assert!(decision.allowed, "call {i} should be allowed");
        assert_eq!(decision.current_count, i);
        assert_eq!(decision.remaining_count, 20 - i);
    }

    let denied = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.current_count, 21);
    assert_eq!(denied.remaining_count, 0);
}

#[tokio::test]
async fn store_outage_fails_open_and_emits_error_event() {
    let errors = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(EventCounter {
        level: Level::ERROR,
        count: Arc::clone(&errors),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let controller =
        QuotaController::new(Arc::new(UnreachableStore), QuotaConfig::default()).unwrap();

    let decision = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.current_count, 0);
    assert_eq!(decision.remaining_count, 20);
    assert_eq!(decision.reset_secs, 60);
    assert_eq!(errors.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn store_outage_fails_closed_when_configured() {
    let config = QuotaConfig::default().with_outage_policy(OutagePolicy::FailClosed);
    let controller = QuotaController::new(Arc::new(UnreachableStore), config).unwrap();

    let decision = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.remaining_count, 0);
    assert_eq!(decision.reset_secs, 60);
}

#[tokio::test]
async fn denial_emits_warning_event() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(EventCounter {
        level: Level::WARN,
        count: Arc::clone(&warnings),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let controller = burst_controller(1);
    controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert_eq!(warnings.load(Ordering::Relaxed), 0);

    controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert_eq!(warnings.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn status_never_consumes_quota() {
    let controller = burst_controller(5);

    controller.check("tenant-A", BURST_WINDOW).await.unwrap();

    for _ in 0..10 {
        let status = controller.status("tenant-A", &[BURST_WINDOW]).await.unwrap();
        assert_eq!(status[BURST_WINDOW].current_count, 1);
        assert_eq!(status[BURST_WINDOW].remaining_count, 4);
    }

    let decision = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert_eq!(decision.current_count, 2);
}

#[tokio::test(start_paused = true)]
async fn window_expiry_restores_a_fresh_window() {
    let controller = burst_controller(3);

    for _ in 0..3 {
        controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    }
    let denied = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(!denied.allowed);

    tokio::time::advance(Duration::from_secs(61)).await;

    let fresh = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(fresh.allowed);
    assert_eq!(fresh.current_count, 1);
}

#[tokio::test]
async fn check_all_charges_every_window() {
    let config = QuotaConfig::default()
        .with_default_policy(BURST_WINDOW, WindowPolicy::new(60, 2))
        .with_default_policy(SUSTAINED_WINDOW, WindowPolicy::new(3600, 100));
    let controller =
        QuotaController::new(Arc::new(InMemoryCounterStore::new()), config).unwrap();
    let windows = [BURST_WINDOW, SUSTAINED_WINDOW];

    for _ in 0..2 {
        let outcome = controller.check_all("tenant-A", &windows).await.unwrap();
        assert!(outcome.allowed);
    }

    // Burst is exhausted; the aggregate flips but sustained keeps charging.
    let outcome = controller.check_all("tenant-A", &windows).await.unwrap();
    assert!(!outcome.allowed);
    assert!(!outcome.per_window[BURST_WINDOW].allowed);
    assert!(outcome.per_window[SUSTAINED_WINDOW].allowed);
    assert_eq!(outcome.per_window[SUSTAINED_WINDOW].current_count, 3);

    let status = controller
        .status("tenant-A", &[SUSTAINED_WINDOW])
        .await
        .unwrap();
    assert_eq!(status[SUSTAINED_WINDOW].current_count, 3);
}

#[tokio::test]
async fn reset_starts_a_new_window() {
    let controller = burst_controller(2);

    controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    controller.check("tenant-A", BURST_WINDOW).await.unwrap();

    controller
        .reset("tenant-A", &[BURST_WINDOW, SUSTAINED_WINDOW])
        .await
        .unwrap();

    let decision = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.current_count, 1);
}

#[tokio::test]
async fn tenants_do_not_share_counters() {
    let controller = burst_controller(1);

    let a = controller.check("tenant-A", BURST_WINDOW).await.unwrap();
    let b = controller.check("tenant-B", BURST_WINDOW).await.unwrap();

    assert!(a.allowed);
    assert!(b.allowed);
    assert_eq!(b.current_count, 1);
}
