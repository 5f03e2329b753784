//! Shared helpers for track player integration tests
//!
//! `MockEngine` records every call and hands its notifier to an
//! `EngineProbe`, so tests can script engine reports.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use trackplayer::{
    BufferPolicy, Engine, EngineError, EngineNotifier, LoadGeneration, MediaUrl, PlaybackState,
    PlayerEvent, PlayerOptions, Telemetry, Track, TrackPlayer,
};

// ===== Mock Engine =====

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Start,
    Load { url: String, generation: LoadGeneration },
    Play,
    Pause,
    Stop,
    Seek(Duration),
    SetRate(f32),
    SetVolume(f32),
    Release,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<EngineCall>,
    notifier: Option<EngineNotifier>,
    generation: LoadGeneration,
    auto_ready: bool,
    fail_start: bool,
    fail_load: bool,
}

/// Test-side view of a `MockEngine`
#[derive(Clone, Default)]
pub struct EngineProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// URLs handed to `load`, in order
    pub fn loads(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Load { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Generation of the latest load
    pub fn generation(&self) -> LoadGeneration {
        self.lock().generation
    }

    pub fn notifier(&self) -> EngineNotifier {
        self.lock().notifier.clone().expect("engine not started")
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.lock().fail_load = fail;
    }

    // Reports for the latest load

    pub fn ready(&self) {
        self.notifier().on_ready(self.generation());
    }

    pub fn telemetry(&self, position_secs: f64) {
        self.notifier().on_telemetry(
            self.generation(),
            Telemetry {
                position: Duration::from_secs_f64(position_secs),
                buffered: Duration::from_secs_f64(position_secs + 10.0),
                duration: None,
                rate: 1.0,
            },
        );
    }

    pub fn buffering(&self, buffering: bool) {
        self.notifier()
            .on_buffering_changed(self.generation(), buffering);
    }

    pub fn item_ended(&self) {
        self.notifier().on_item_ended(self.generation());
    }

    pub fn fatal(&self, reason: &str) {
        self.notifier().on_fatal_error(self.generation(), reason);
    }
}

pub struct MockEngine {
    probe: EngineProbe,
}

impl MockEngine {
    /// Engine that answers every load with `on_ready` right away
    pub fn auto_ready() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        probe.lock().auto_ready = true;
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    /// Engine that only reports what the test tells it to
    pub fn manual() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    fn record(&self, call: EngineCall) {
        self.probe.lock().calls.push(call);
    }
}

impl Engine for MockEngine {
    fn start(&mut self, _policy: &BufferPolicy, notifier: EngineNotifier) -> Result<(), EngineError> {
        let mut state = self.probe.lock();
        if state.fail_start {
            return Err(EngineError::StartFailed("no audio device".to_string()));
        }
        state.calls.push(EngineCall::Start);
        state.notifier = Some(notifier);
        Ok(())
    }

    fn load(&mut self, track: &Track, generation: LoadGeneration) -> Result<(), EngineError> {
        let mut state = self.probe.lock();
        state.calls.push(EngineCall::Load {
            url: track.url().as_str().to_string(),
            generation,
        });
        state.generation = generation;

        if state.fail_load {
            return Err(EngineError::Rejected("unsupported format".to_string()));
        }
        if state.auto_ready {
            if let Some(notifier) = &state.notifier {
                notifier.on_ready(generation);
            }
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Pause);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Stop);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), EngineError> {
        self.record(EngineCall::Seek(position));
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), EngineError> {
        self.record(EngineCall::SetRate(rate));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.record(EngineCall::SetVolume(volume));
        Ok(())
    }

    fn release(&mut self) {
        self.record(EngineCall::Release);
    }
}

// ===== Helpers =====

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn track(id: &str) -> Track {
    Track::new(MediaUrl::remote(&url_of(id)).unwrap())
        .with_title(id)
        .with_artist("Test Artist")
        .with_duration(Duration::from_secs(180))
}

pub fn url_of(id: &str) -> String {
    format!("https://example.com/{}.mp3", id)
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

/// Player with an auto-ready engine, already set up
pub async fn started_player() -> (TrackPlayer, EngineProbe) {
    started_player_with(PlayerOptions::default()).await
}

pub async fn started_player_with(options: PlayerOptions) -> (TrackPlayer, EngineProbe) {
    init_tracing();
    let (engine, probe) = MockEngine::auto_ready();
    let player = TrackPlayer::init(engine, options).unwrap();
    player.setup_with_defaults().await.unwrap();
    (player, probe)
}

/// Command round trip; engine reports sent before it are applied by then
pub async fn settle(player: &TrackPlayer) {
    let mode = player.repeat_mode().unwrap();
    player.set_repeat_mode(mode).await.unwrap();
}

pub async fn wait_for_state(player: &TrackPlayer, state: PlaybackState) {
    let mut snapshots = player.watch();
    tokio::time::timeout(
        Duration::from_secs(2),
        snapshots.wait_for(|snapshot| snapshot.state == state),
    )
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}", state))
    .unwrap();
}

/// Everything emitted so far
pub fn drain(events: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Playback states from a batch of events
pub fn states(events: &[PlayerEvent]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::PlaybackState { state } => Some(state.clone()),
            _ => None,
        })
        .collect()
}
