//! Integration tests for the chapter loader and player transport.
//!
//! These wire the real router (over in-memory cache storage and a scripted
//! HTTP client) and the real balance service (over the in-memory document
//! store) under the transport, and drive the full unlock/load/playback flow.

use async_trait::async_trait;
use bridge_desktop::{MemoryCacheStorage, MemoryDocumentStore};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::SystemClock;
use bytes::Bytes;
use core_cache::{CacheRouter, NamedCacheStore, RouterConfig};
use core_catalog::{BookId, CatalogItem};
use core_entitlement::{
    BalanceService, DocumentBalanceService, PrincipalId, TransactionKind,
};
use core_player::{
    AudioHandle, AutoConfirm, ChapterLoader, PlaybackAdapter, PlayerConfig, PlayerError,
    PlayerTransport, TransportNotice, TransportState, UnlockPrompt,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Scripted HTTP client with an offline switch.
#[derive(Default)]
struct ScriptedHttpClient {
    responses: Mutex<HashMap<String, (u16, Bytes)>>,
    offline: AtomicBool,
}

impl ScriptedHttpClient {
    fn serve(&self, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, Bytes::from(body.to_string())));
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("offline".to_string()));
        }
        match self.responses.lock().unwrap().get(&request.url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                headers: HashMap::new(),
                body: body.clone(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            }),
        }
    }
}

/// Recording playback adapter whose `start` can be made to fail.
#[derive(Default)]
struct FakeAdapter {
    calls: Mutex<Vec<String>>,
    fail_start: AtomicBool,
}

impl FakeAdapter {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl PlaybackAdapter for FakeAdapter {
    async fn start(
        &self,
        _source: &AudioHandle,
        _speed: f32,
        _volume: f32,
    ) -> core_player::Result<()> {
        self.record("start");
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(PlayerError::PlaybackFailed("device unavailable".to_string()));
        }
        Ok(())
    }

    async fn pause(&self) -> core_player::Result<()> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> core_player::Result<()> {
        self.record("resume");
        Ok(())
    }

    async fn stop(&self) -> core_player::Result<()> {
        self.record("stop");
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> core_player::Result<()> {
        self.record("seek");
        Ok(())
    }

    async fn set_volume(&self, _volume: f32) -> core_player::Result<()> {
        self.record("set_volume");
        Ok(())
    }

    async fn set_rate(&self, _rate: f32) -> core_player::Result<()> {
        self.record("set_rate");
        Ok(())
    }

    async fn position(&self) -> core_player::Result<Duration> {
        Ok(Duration::from_millis(1500))
    }
}

/// Prompt that declines every unlock.
struct Decline;

#[async_trait]
impl UnlockPrompt for Decline {
    async fn confirm_unlock(&self, _item: &CatalogItem, _chapter: u32, _cost: u64) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const DELIVERY_HOST: &str = "https://cdn.example.dev";

fn item(total_chapters: u32) -> CatalogItem {
    CatalogItem {
        id: BookId::new("book-1"),
        title: "The Long Road".to_string(),
        author: "A. Writer".to_string(),
        cover_url: "https://cdn.example.com/cover.jpg".to_string(),
        audio_slug: "the-long-road".to_string(),
        total_chapters,
        plays: 0,
        rating: 4.5,
        created_at: 0,
    }
}

fn chapter_url(n: u32) -> String {
    format!("{}/the-long-road/chapter-{}.mp3", DELIVERY_HOST, n)
}

struct Fixture {
    transport: PlayerTransport,
    http: Arc<ScriptedHttpClient>,
    adapter: Arc<FakeAdapter>,
    balance: Arc<DocumentBalanceService>,
    principal: PrincipalId,
}

async fn fixture_with_prompt(
    initial_coins: u64,
    prompt: Arc<dyn UnlockPrompt>,
) -> Fixture {
    let http = Arc::new(ScriptedHttpClient::default());
    let router_config = RouterConfig::new("v1").with_audio_host("cdn.example.dev");
    let store = NamedCacheStore::new(Arc::new(MemoryCacheStorage::new()), &router_config);
    let router = Arc::new(CacheRouter::new(router_config, store, http.clone()).unwrap());

    let documents = Arc::new(MemoryDocumentStore::new());
    let balance = Arc::new(DocumentBalanceService::new(documents, Arc::new(SystemClock)));
    let principal = PrincipalId::new("user-1");
    balance
        .ensure_user(&principal, "user@example.com")
        .await
        .unwrap();
    if initial_coins > 0 {
        balance
            .grant(&principal, initial_coins, "Seed balance")
            .await
            .unwrap();
    }

    let loader = ChapterLoader::new(
        PlayerConfig::new(DELIVERY_HOST),
        router,
        Some(balance.clone() as Arc<dyn BalanceService>),
        prompt,
        principal.clone(),
    )
    .unwrap();

    let adapter = Arc::new(FakeAdapter::default());
    let transport = PlayerTransport::new(loader, adapter.clone());

    Fixture {
        transport,
        http,
        adapter,
        balance,
        principal,
    }
}

async fn fixture(initial_coins: u64) -> Fixture {
    fixture_with_prompt(initial_coins, Arc::new(AutoConfirm)).await
}

impl Fixture {
    fn serve_chapters(&self, total: u32) {
        for n in 1..=total {
            self.http
                .serve(&chapter_url(n), 200, &format!("chapter-{}-bytes", n));
        }
    }

    async fn coins(&self) -> u64 {
        self.balance
            .entitlement_of(&self.principal)
            .await
            .unwrap()
            .coins
    }
}

// ---------------------------------------------------------------------------
// Gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn out_of_range_chapters_fail_without_mutating_session() {
    let mut f = fixture(100).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();

    for bad in [0, 4, 99] {
        let err = f.transport.open_chapter(bad).await.unwrap_err();
        assert!(matches!(err, PlayerError::OutOfRange { .. }));
    }

    let session = f.transport.session().unwrap();
    let unlocked: Vec<u32> = session.unlocked_chapters().collect();
    assert_eq!(unlocked, vec![1]);
    assert_eq!(f.coins().await, 100);
}

#[tokio::test]
async fn first_chapter_is_free() {
    let mut f = fixture(0).await;
    f.serve_chapters(3);

    f.transport.open_item(item(3)).await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Loaded);
    assert_eq!(f.coins().await, 0);

    // No coin_usage transaction was written.
    let history = f.balance.history(&f.principal, 10).await.unwrap();
    assert!(history.iter().all(|t| t.kind != TransactionKind::CoinUsage));
}

#[tokio::test]
async fn locked_chapter_debits_ten_coins() {
    let mut f = fixture(15).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();

    f.transport.open_chapter(2).await.unwrap();

    assert_eq!(f.coins().await, 5);
    let session = f.transport.session().unwrap();
    let unlocked: Vec<u32> = session.unlocked_chapters().collect();
    assert_eq!(unlocked, vec![1, 2]);

    let history = f.balance.history(&f.principal, 10).await.unwrap();
    let debit = history
        .iter()
        .find(|t| t.kind == TransactionKind::CoinUsage)
        .unwrap();
    assert_eq!(debit.amount, -10);
    assert!(debit.description.contains("Chapter 2"));
    assert!(debit.description.contains("The Long Road"));
}

#[tokio::test]
async fn reopening_an_unlocked_chapter_does_not_debit_again() {
    let mut f = fixture(15).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();

    f.transport.open_chapter(2).await.unwrap();
    f.transport.open_chapter(1).await.unwrap();
    f.transport.open_chapter(2).await.unwrap();

    assert_eq!(f.coins().await, 5);
}

#[tokio::test]
async fn insufficient_balance_leaves_everything_unchanged() {
    let mut f = fixture(5).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();

    let err = f.transport.open_chapter(2).await.unwrap_err();
    assert!(matches!(
        err,
        PlayerError::InsufficientBalance {
            balance: 5,
            required: 10
        }
    ));

    assert_eq!(f.coins().await, 5);
    let session = f.transport.session().unwrap();
    assert!(!session.is_unlocked(2));
    assert_eq!(session.current_chapter(), 1);
}

#[tokio::test]
async fn declined_prompt_is_a_normal_abort() {
    let mut f = fixture_with_prompt(100, Arc::new(Decline)).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();

    let err = f.transport.open_chapter(2).await.unwrap_err();
    assert!(err.is_user_abort());
    assert_eq!(f.coins().await, 100);
    assert!(!f.transport.session().unwrap().is_unlocked(2));
}

#[tokio::test]
async fn membership_unlocks_without_debit() {
    let mut f = fixture(5).await;
    f.serve_chapters(3);
    f.balance.activate_membership(&f.principal).await.unwrap();

    f.transport.open_item(item(3)).await.unwrap();
    f.transport.open_chapter(3).await.unwrap();

    assert_eq!(f.coins().await, 5);
    assert!(f.transport.session().unwrap().is_unlocked(3));
}

#[tokio::test]
async fn missing_balance_service_unlocks_without_debit() {
    let http = Arc::new(ScriptedHttpClient::default());
    let router_config = RouterConfig::new("v1").with_audio_host("cdn.example.dev");
    let store = NamedCacheStore::new(Arc::new(MemoryCacheStorage::new()), &router_config);
    let router = Arc::new(CacheRouter::new(router_config, store, http.clone()).unwrap());

    let loader = ChapterLoader::new(
        PlayerConfig::new(DELIVERY_HOST),
        router,
        None,
        Arc::new(AutoConfirm),
        PrincipalId::new("user-1"),
    )
    .unwrap();
    let adapter = Arc::new(FakeAdapter::default());
    let mut transport = PlayerTransport::new(loader, adapter);

    http.serve(&chapter_url(1), 200, "one");
    http.serve(&chapter_url(2), 200, "two");
    transport.open_item(item(3)).await.unwrap();
    transport.open_chapter(2).await.unwrap();
    assert!(transport.session().unwrap().is_unlocked(2));
}

#[tokio::test]
async fn balance_service_fault_does_not_unlock() {
    use chrono::{DateTime, Utc};
    use core_entitlement::{EntitlementError, EntitlementState, TransactionRecord};

    /// Balance service whose backing store is down.
    struct FailingBalance;

    fn down<T>() -> core_entitlement::Result<T> {
        Err(EntitlementError::Storage(BridgeError::OperationFailed(
            "store down".to_string(),
        )))
    }

    #[async_trait]
    impl BalanceService for FailingBalance {
        async fn entitlement_of(
            &self,
            _principal: &PrincipalId,
        ) -> core_entitlement::Result<EntitlementState> {
            down()
        }

        async fn debit(
            &self,
            _principal: &PrincipalId,
            _amount: u64,
            _description: &str,
        ) -> core_entitlement::Result<core_entitlement::DebitOutcome> {
            down()
        }

        async fn grant(
            &self,
            _principal: &PrincipalId,
            _coins: u64,
            _description: &str,
        ) -> core_entitlement::Result<u64> {
            down()
        }

        async fn activate_membership(
            &self,
            _principal: &PrincipalId,
        ) -> core_entitlement::Result<DateTime<Utc>> {
            down()
        }

        async fn cancel_auto_renew(&self, _principal: &PrincipalId) -> core_entitlement::Result<()> {
            down()
        }

        async fn history(
            &self,
            _principal: &PrincipalId,
            _limit: usize,
        ) -> core_entitlement::Result<Vec<TransactionRecord>> {
            down()
        }
    }

    let http = Arc::new(ScriptedHttpClient::default());
    let router_config = RouterConfig::new("v1").with_audio_host("cdn.example.dev");
    let store = NamedCacheStore::new(Arc::new(MemoryCacheStorage::new()), &router_config);
    let router = Arc::new(CacheRouter::new(router_config, store, http.clone()).unwrap());

    let loader = ChapterLoader::new(
        PlayerConfig::new(DELIVERY_HOST),
        router,
        Some(Arc::new(FailingBalance)),
        Arc::new(AutoConfirm),
        PrincipalId::new("user-1"),
    )
    .unwrap();
    let mut transport = PlayerTransport::new(loader, Arc::new(FakeAdapter::default()));

    http.serve(&chapter_url(1), 200, "one");
    transport.open_item(item(3)).await.unwrap();

    let err = transport.open_chapter(2).await.unwrap_err();
    assert!(matches!(err, PlayerError::DebitFailed(_)));
    assert!(!transport.session().unwrap().is_unlocked(2));
}

#[tokio::test]
async fn debit_then_failed_fetch_keeps_the_unlock_and_does_not_recharge() {
    let mut f = fixture(15).await;
    f.http.serve(&chapter_url(1), 200, "one");
    // Chapter 2 is never served: the fetch 404s.
    f.transport.open_item(item(3)).await.unwrap();

    let err = f.transport.open_chapter(2).await.unwrap_err();
    assert!(matches!(err, PlayerError::AudioUnavailable { chapter: 2 }));

    // The debit went through and the unlock is recorded, but the transport
    // still points at chapter 1.
    assert_eq!(f.coins().await, 5);
    let session = f.transport.session().unwrap();
    assert!(session.is_unlocked(2));
    assert_eq!(session.current_chapter(), 1);

    // Retry after the endpoint recovers: no second charge.
    f.http.serve(&chapter_url(2), 200, "two");
    f.transport.open_chapter(2).await.unwrap();
    assert_eq!(f.coins().await, 5);
    assert_eq!(f.transport.session().unwrap().current_chapter(), 2);
}

// ---------------------------------------------------------------------------
// Transport state machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn play_pause_cycle() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();

    f.transport.play().await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Playing);

    f.transport.pause().await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Paused);
    // Position captured from the adapter on pause
    assert_eq!(f.transport.session().unwrap().position_ms, 1500);

    f.transport.play().await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Playing);
    assert_eq!(f.adapter.calls(), vec!["start", "pause", "resume"]);
}

#[tokio::test]
async fn start_failure_reverts_to_paused() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();
    f.adapter.set_fail_start(true);

    let err = f.transport.play().await.unwrap_err();
    assert!(matches!(err, PlayerError::PlaybackFailed(_)));
    assert_eq!(f.transport.state(), TransportState::Paused);
    assert!(!f.transport.session().unwrap().is_playing);
}

#[tokio::test]
async fn play_with_no_item_fails() {
    let mut f = fixture(0).await;
    let err = f.transport.play().await.unwrap_err();
    assert!(matches!(err, PlayerError::NoItemLoaded));
}

#[tokio::test]
async fn boundary_chapters_are_noop_notifications() {
    let mut f = fixture(100).await;
    f.serve_chapters(2);
    f.transport.open_item(item(2)).await.unwrap();

    assert_eq!(
        f.transport.previous().await.unwrap(),
        TransportNotice::AtFirstChapter
    );
    assert_eq!(f.transport.session().unwrap().current_chapter(), 1);

    f.transport.open_chapter(2).await.unwrap();
    assert_eq!(
        f.transport.next().await.unwrap(),
        TransportNotice::NoMoreChapters
    );
    assert_eq!(f.transport.session().unwrap().current_chapter(), 2);
}

#[tokio::test]
async fn next_resumes_playback_when_playing() {
    let mut f = fixture(100).await;
    f.serve_chapters(3);
    f.transport.open_item(item(3)).await.unwrap();
    f.transport.play().await.unwrap();

    let notice = f.transport.next().await.unwrap();
    assert_eq!(notice, TransportNotice::Advanced { chapter: 2 });
    assert_eq!(f.transport.state(), TransportState::Playing);
}

#[tokio::test]
async fn auto_advance_plays_the_next_chapter() {
    let mut f = fixture(100).await;
    f.serve_chapters(2);
    f.transport.open_item(item(2)).await.unwrap();
    f.transport.play().await.unwrap();

    let notice = f.transport.on_chapter_ended().await.unwrap();
    assert_eq!(notice, TransportNotice::Advanced { chapter: 2 });
    assert_eq!(f.transport.state(), TransportState::Playing);
    assert_eq!(f.transport.session().unwrap().current_chapter(), 2);
}

#[tokio::test]
async fn ended_on_last_chapter_stays_ended() {
    let mut f = fixture(100).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();
    f.transport.play().await.unwrap();

    let notice = f.transport.on_chapter_ended().await.unwrap();
    assert_eq!(notice, TransportNotice::NoMoreChapters);
    assert_eq!(f.transport.state(), TransportState::Ended);
}

#[tokio::test]
async fn speed_cycles_and_wraps() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();

    let mut speeds = Vec::new();
    for _ in 0..5 {
        speeds.push(f.transport.cycle_speed().await.unwrap());
    }
    assert_eq!(speeds, vec![1.25, 1.5, 1.75, 2.0, 1.0]);
}

#[tokio::test]
async fn volume_is_validated() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();

    f.transport.set_volume(0.5).await.unwrap();
    assert!((f.transport.session().unwrap().volume - 0.5).abs() < f32::EPSILON);

    let err = f.transport.set_volume(1.5).await.unwrap_err();
    assert!(matches!(err, PlayerError::InvalidVolume(_)));
}

#[tokio::test]
async fn close_destroys_the_session() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();
    f.transport.play().await.unwrap();

    f.transport.close().await;
    assert_eq!(f.transport.state(), TransportState::Idle);
    assert!(f.transport.session().is_none());
    assert!(f.adapter.calls().contains(&"stop".to_string()));
}

#[tokio::test]
async fn offline_playback_of_a_cached_chapter() {
    let mut f = fixture(0).await;
    f.serve_chapters(1);
    f.transport.open_item(item(1)).await.unwrap();

    // Network goes away; the chapter was cached by the router on first load.
    f.http.set_offline(true);
    f.transport.open_chapter(1).await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Loaded);

    let source = f.transport.session().unwrap().source().unwrap();
    assert_eq!(
        source.bytes().map(|b| b.as_ref()),
        Some(b"chapter-1-bytes".as_ref())
    );
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_unlock_and_autoplay_scenario() {
    // Catalog item with three chapters, fresh session, balance of 5.
    let mut f = fixture(5).await;
    f.serve_chapters(3);

    // Chapter 1 opens without a debit.
    f.transport.open_item(item(3)).await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Loaded);
    assert_eq!(f.coins().await, 5);

    // Chapter 2 with balance 5 fails.
    let err = f.transport.open_chapter(2).await.unwrap_err();
    assert!(matches!(err, PlayerError::InsufficientBalance { .. }));

    // Top up to 15; chapter 2 now unlocks, balance drops to 5.
    f.balance.grant(&f.principal, 10, "Top up").await.unwrap();
    f.transport.open_chapter(2).await.unwrap();
    assert_eq!(f.coins().await, 5);
    let unlocked: Vec<u32> = f
        .transport
        .session()
        .unwrap()
        .unlocked_chapters()
        .collect();
    assert_eq!(unlocked, vec![1, 2]);

    // Natural end of chapter 2 auto-attempts chapter 3; balance 5 < 10, so
    // playback remains ended at chapter 2 instead of silently advancing.
    f.transport.play().await.unwrap();
    let err = f.transport.on_chapter_ended().await.unwrap_err();
    assert!(matches!(err, PlayerError::InsufficientBalance { .. }));
    assert_eq!(f.transport.state(), TransportState::Ended);
    assert_eq!(f.transport.session().unwrap().current_chapter(), 2);
    assert!(!f.transport.session().unwrap().is_unlocked(3));
    assert_eq!(f.coins().await, 5);
}
