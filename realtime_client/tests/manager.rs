use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use realtime_client::{
    events::ConnectionHooks,
    AppState,
    ChannelState,
    CycleOutcome,
    NetworkStatus,
    RealtimeConfig,
    RealtimeConnectionManager,
    RealtimeError,
    RealtimeTransport,
    ReconnectTrigger,
    Session,
    SessionSource,
};
use tokio::time::{sleep, Instant};

const RESUBSCRIBE_TIME: Duration = Duration::from_millis(100);

#[derive(Default)]
struct TransportState {
    channels: Vec<ChannelState>,
    tokens: Vec<String>,
    resubscribes: usize,
    refuse: bool,
}

/// Channels that re-join after a short round trip.
#[derive(Clone, Default)]
struct FakeTransport(Arc<Mutex<TransportState>>);

impl FakeTransport {
    fn with_channels(channels: &[ChannelState]) -> Self {
        let t = Self::default();
        t.0.lock().unwrap().channels = channels.to_vec();
        t
    }

    fn set_channels(&self, channels: &[ChannelState]) {
        self.0.lock().unwrap().channels = channels.to_vec();
    }

    fn resubscribes(&self) -> usize {
        self.0.lock().unwrap().resubscribes
    }

    fn tokens(&self) -> Vec<String> {
        self.0.lock().unwrap().tokens.clone()
    }
}

impl RealtimeTransport for FakeTransport {
    fn set_auth(&self, access_token: &str) {
        self.0.lock().unwrap().tokens.push(access_token.to_string());
    }

    fn channel_states(&self) -> Vec<ChannelState> {
        self.0.lock().unwrap().channels.clone()
    }

    async fn resubscribe_all(&self) -> Result<usize, RealtimeError> {
        sleep(RESUBSCRIBE_TIME).await;
        let mut state = self.0.lock().unwrap();
        if state.refuse {
            return Err(RealtimeError::TransportError("socket closed".into()));
        }
        state.resubscribes += 1;
        state.channels.iter_mut().for_each(|c| *c = ChannelState::Joined);
        Ok(state.channels.len())
    }
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    refreshes: usize,
}

#[derive(Clone, Default)]
struct FakeSessions(Arc<Mutex<SessionState>>);

impl FakeSessions {
    fn expiring_in(token: &str, secs: i64) -> Self {
        let s = Self::default();
        s.0.lock().unwrap().session = Some(Session::new(token, Some(Utc::now() + chrono::Duration::seconds(secs))));
        s
    }

    fn refreshes(&self) -> usize {
        self.0.lock().unwrap().refreshes
    }
}

impl SessionSource for FakeSessions {
    async fn current_session(&self) -> Result<Option<Session>, RealtimeError> {
        Ok(self.0.lock().unwrap().session.clone())
    }

    async fn refresh_session(&self) -> Result<Option<Session>, RealtimeError> {
        let mut state = self.0.lock().unwrap();
        state.refreshes += 1;
        let fresh = Session::new("fresh-token", Some(Utc::now() + chrono::Duration::hours(1)));
        state.session = Some(fresh.clone());
        Ok(Some(fresh))
    }
}

type Manager = RealtimeConnectionManager<FakeTransport, FakeSessions>;

fn manager(transport: &FakeTransport, sessions: &FakeSessions) -> Manager {
    RealtimeConnectionManager::new(transport.clone(), sessions.clone(), RealtimeConfig::default())
}

const TWO_CHANNELS: [ChannelState; 2] = [ChannelState::Joined, ChannelState::Joined];

#[tokio::test(start_paused = true)]
async fn auth_changes_reach_the_transport() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let manager = manager(&transport, &FakeSessions::default());
    manager.on_auth_state_change(Some(&Session::new("token-1", None)));
    manager.on_auth_state_change(None);
    manager.on_auth_state_change(Some(&Session::new("token-2", None)));
    assert_eq!(transport.tokens(), vec!["token-1", "token-2"]);
    assert_eq!(transport.resubscribes(), 0);
}

#[tokio::test(start_paused = true)]
async fn resume_settles_before_reconnecting() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let sessions = FakeSessions::expiring_in("current-token", 3600);
    let manager = manager(&transport, &sessions);
    assert_eq!(manager.on_app_state_change(AppState::Background).await, CycleOutcome::NotNeeded);

    let (outcome, _) = tokio::join!(manager.on_app_state_change(AppState::Active), async {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.resubscribes(), 0, "still settling");
        sleep(Duration::from_millis(300)).await;
        assert_eq!(transport.resubscribes(), 1);
    });
    assert_eq!(outcome, CycleOutcome::Reconnected { channels: 2 });
    // The session was far from expiry. Its token is handed over as is.
    assert_eq!(sessions.refreshes(), 0);
    assert_eq!(transport.tokens(), vec!["current-token"]);
    assert!(!manager.guard().is_in_flight());
}

#[tokio::test(start_paused = true)]
async fn resume_refreshes_a_session_about_to_expire() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let sessions = FakeSessions::expiring_in("stale-token", 30);
    let manager = manager(&transport, &sessions);
    manager.on_app_state_change(AppState::Inactive).await;
    let outcome = manager.on_app_state_change(AppState::Active).await;
    assert_eq!(outcome, CycleOutcome::Reconnected { channels: 2 });
    assert_eq!(sessions.refreshes(), 1);
    assert_eq!(transport.tokens(), vec!["fresh-token"]);
}

#[tokio::test(start_paused = true)]
async fn only_foregrounding_triggers_a_cycle() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let manager = manager(&transport, &FakeSessions::default());
    assert_eq!(manager.on_app_state_change(AppState::Active).await, CycleOutcome::NotNeeded);
    assert_eq!(manager.on_app_state_change(AppState::Inactive).await, CycleOutcome::NotNeeded);
    assert_eq!(manager.on_app_state_change(AppState::Background).await, CycleOutcome::NotNeeded);
    assert_eq!(transport.resubscribes(), 0);
    assert_eq!(manager.app_state(), AppState::Background);
}

#[tokio::test(start_paused = true)]
async fn network_regain_reconnects_without_settling() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let sessions = FakeSessions::expiring_in("current-token", 3600);
    let manager = manager(&transport, &sessions);
    assert_eq!(manager.on_network_change(NetworkStatus::offline()).await, CycleOutcome::NotNeeded);
    let unreachable = NetworkStatus { is_connected: true, is_internet_reachable: Some(false) };
    assert_eq!(manager.on_network_change(unreachable).await, CycleOutcome::NotNeeded);
    assert_eq!(transport.resubscribes(), 0);

    let start = Instant::now();
    let unknown = NetworkStatus { is_connected: true, is_internet_reachable: None };
    assert_eq!(manager.on_network_change(unknown).await, CycleOutcome::Reconnected { channels: 2 });
    assert!(start.elapsed() < RealtimeConfig::default().settle_delay);
    assert_eq!(transport.tokens(), vec!["current-token"]);
}

#[tokio::test(start_paused = true)]
async fn trigger_storm_runs_one_cycle() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&[ChannelState::Joined, ChannelState::Closed]);
    let sessions = FakeSessions::expiring_in("current-token", 3600);
    let manager = manager(&transport, &sessions);
    manager.on_app_state_change(AppState::Background).await;

    let (resume, network, sweep, again) = tokio::join!(
        manager.on_app_state_change(AppState::Active),
        manager.on_network_change(NetworkStatus::online()),
        manager.health_check(),
        manager.on_network_change(NetworkStatus::online()),
    );
    assert_eq!(resume, CycleOutcome::Reconnected { channels: 2 });
    assert_eq!(network, CycleOutcome::Debounced);
    assert_eq!(sweep, CycleOutcome::Debounced);
    assert_eq!(again, CycleOutcome::Debounced);
    assert_eq!(transport.resubscribes(), 1);

    // Dropped triggers are not replayed, and the window still holds after the cycle ends
    sleep(Duration::from_millis(500)).await;
    assert_eq!(manager.on_network_change(NetworkStatus::online()).await, CycleOutcome::Debounced);
    assert_eq!(transport.resubscribes(), 1);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(manager.on_network_change(NetworkStatus::online()).await, CycleOutcome::Reconnected { channels: 2 });
    assert_eq!(transport.resubscribes(), 2);
}

#[tokio::test(start_paused = true)]
async fn health_sweep_repairs_broken_channels_in_the_foreground() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let manager = manager(&transport, &FakeSessions::default());
    tokio::select! {
        _ = manager.run_health_sweep() => panic!("the sweep never ends"),
        _ = async {
            sleep(Duration::from_secs(3)).await;
            transport.set_channels(&[ChannelState::Joined, ChannelState::Errored]);
            sleep(Duration::from_secs(3)).await;
            assert_eq!(transport.resubscribes(), 0, "first sweep is at 7s");
            sleep(Duration::from_millis(1500)).await;
            assert_eq!(transport.resubscribes(), 1);
            assert_eq!(transport.channel_states(), TWO_CHANNELS.to_vec());

            manager.on_app_state_change(AppState::Background).await;
            transport.set_channels(&[ChannelState::Closed, ChannelState::Closed]);
            sleep(Duration::from_secs(14)).await;
            assert_eq!(transport.resubscribes(), 1, "no sweeps in the background");
        } => {},
    }
}

#[tokio::test(start_paused = true)]
async fn connection_events() {
    let _ = env_logger::try_init();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut hooks = ConnectionHooks::default();
    let (lost, restored, reconnected) = (Arc::clone(&seen), Arc::clone(&seen), Arc::clone(&seen));
    hooks
        .on_connection_lost(move |ev| {
            let seen = Arc::clone(&lost);
            Box::pin(async move { seen.lock().unwrap().push(format!("lost: {}", ev.reason)) })
        })
        .on_connection_restored(move |ev| {
            let seen = Arc::clone(&restored);
            Box::pin(async move { seen.lock().unwrap().push(format!("restored: {}", ev.live_channels)) })
        })
        .on_reconnected(move |ev| {
            let seen = Arc::clone(&reconnected);
            Box::pin(async move {
                assert_eq!(ev.trigger, ReconnectTrigger::HealthSweep);
                seen.lock().unwrap().push(format!("reconnected: {}", ev.channels))
            })
        });
    let transport = FakeTransport::with_channels(&TWO_CHANNELS);
    let manager = RealtimeConnectionManager::new_with_hooks(
        transport.clone(),
        FakeSessions::default(),
        RealtimeConfig::default(),
        hooks,
    );
    assert_eq!(manager.health_check().await, CycleOutcome::NotNeeded);
    assert!(manager.connection_status().is_connected);

    transport.set_channels(&[ChannelState::Closed, ChannelState::Errored]);
    assert_eq!(manager.health_check().await, CycleOutcome::Reconnected { channels: 2 });
    assert!(!manager.connection_status().is_connected);
    assert_eq!(manager.health_check().await, CycleOutcome::NotNeeded);
    assert!(manager.connection_status().is_connected);

    assert_eq!(*seen.lock().unwrap(), vec![
        "restored: 2",
        "lost: No active realtime channels",
        "reconnected: 2",
        "restored: 2"
    ]);
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_releases_the_guard() {
    let _ = env_logger::try_init();
    let transport = FakeTransport::with_channels(&[ChannelState::Errored]);
    transport.0.lock().unwrap().refuse = true;
    let manager = manager(&transport, &FakeSessions::default());
    let outcome = manager.health_check().await;
    assert_eq!(outcome, CycleOutcome::Failed(RealtimeError::TransportError("socket closed".into())));
    assert!(!manager.guard().is_in_flight());
    assert!(manager.connection_status().connection_error.unwrap().contains("socket closed"));

    transport.0.lock().unwrap().refuse = false;
    sleep(Duration::from_secs(2)).await;
    assert_eq!(manager.health_check().await, CycleOutcome::Reconnected { channels: 1 });
}
