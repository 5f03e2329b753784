//! Owner task
//!
//! The single writer of the queue, the state machine and the engine.
//! Commands and engine notifications are applied one at a time. After each
//! one the committed snapshot is replaced as a whole, then the caller is
//! answered, so a caller that sees its reply also sees its effect.

use crate::buffer::{BufferConfig, BufferPolicy};
use crate::command::{Ack, Command, Reply};
use crate::config::{OptionsUpdate, PlayerOptions};
use crate::engine::{Engine, EngineError, EngineEvent, EngineMessage, EngineNotifier, LoadGeneration, Telemetry};
use crate::error::{PlayerError, Result};
use crate::events::{NowPlaying, PlayerEvent};
use crate::queue::{ActiveChange, Queue};
use crate::state::{PlaybackState, StateMachine, Trigger};
use crate::track::{MetadataPatch, RatingType, Track};
use crate::types::{PlayerSnapshot, Progress, RepeatMode};
use crate::volume::Volume;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

/// Item the engine is loaded with
#[derive(Debug, Clone)]
struct LoadedItem {
    /// Queue position; `None` for a preview load
    index: Option<usize>,
    track: Track,
}

/// Host adjustments to the now-playing projection
#[derive(Debug, Clone, Default)]
enum NowPlayingOverride {
    #[default]
    None,
    Patch(MetadataPatch),
    Hidden,
}

pub(crate) struct PlayerOwner<E: Engine> {
    engine: E,
    initialized: bool,
    policy: Option<BufferPolicy>,

    queue: Queue,
    queue_view: Arc<[Track]>,
    machine: StateMachine,
    loaded: Option<LoadedItem>,

    generation: LoadGeneration,
    pending_ack: Option<oneshot::Sender<()>>,
    ack_due: bool,

    progress: Progress,
    engine_buffering: bool,
    volume: Volume,
    rate: f32,
    play_when_ready: bool,
    repeat_mode: RepeatMode,
    rating_type: RatingType,
    engine_ack_timeout_ms: u64,

    now_playing_override: NowPlayingOverride,
    last_now_playing: Option<NowPlaying>,

    commands: mpsc::Receiver<Command>,
    engine_tx: mpsc::UnboundedSender<EngineMessage>,
    engine_rx: mpsc::UnboundedReceiver<EngineMessage>,
    snapshot: watch::Sender<PlayerSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
}

impl<E: Engine> PlayerOwner<E> {
    pub(crate) fn new(
        engine: E,
        options: &PlayerOptions,
        commands: mpsc::Receiver<Command>,
        snapshot: watch::Sender<PlayerSnapshot>,
        events: broadcast::Sender<PlayerEvent>,
    ) -> Self {
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();

        Self {
            engine,
            initialized: false,
            policy: None,
            queue: Queue::new(),
            queue_view: Arc::from(Vec::new()),
            machine: StateMachine::new(),
            loaded: None,
            generation: LoadGeneration::default(),
            pending_ack: None,
            ack_due: false,
            progress: Progress::default(),
            engine_buffering: false,
            volume: Volume::new(options.volume),
            rate: options.rate,
            play_when_ready: options.play_when_ready,
            repeat_mode: options.repeat_mode,
            rating_type: options.rating_type,
            engine_ack_timeout_ms: options.engine_ack_timeout_ms,
            now_playing_override: NowPlayingOverride::None,
            last_now_playing: None,
            commands,
            engine_tx,
            engine_rx,
            snapshot,
            events,
        }
    }

    /// Run until teardown or until every handle is dropped
    pub(crate) async fn run(mut self) {
        debug!("Player owner started");
        self.publish();

        loop {
            let flow = tokio::select! {
                biased;

                // Engine reports go first so one sent before a command is
                // applied before it.
                Some(message) = self.engine_rx.recv() => {
                    self.handle_engine(message);
                    ControlFlow::Continue(())
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => ControlFlow::Break(()),
                },
            };

            if flow.is_break() {
                break;
            }
        }

        if self.initialized {
            self.teardown();
            self.publish();
        }
        debug!("Player owner stopped");
    }

    // ===== Commands =====

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(command = command.name(), "Applying command");

        if !self.initialized {
            match command {
                Command::Setup { buffer, reply } => {
                    let result = self.setup(buffer);
                    self.respond(reply, result);
                }
                other => other.reject(PlayerError::NotInitialized),
            }
            return ControlFlow::Continue(());
        }

        match command {
            Command::Setup { reply, .. } => self.respond(reply, Err(PlayerError::AlreadyInitialized)),
            Command::Teardown { reply } => {
                self.teardown();
                self.respond(reply, Ok(()));
                return ControlFlow::Break(());
            }

            Command::Add {
                tracks,
                insert_before,
                reply,
            } => {
                let result = self.add(tracks, insert_before);
                self.respond(reply, result);
            }
            Command::Remove { indexes, reply } => {
                let result = self.remove(&indexes);
                self.respond(reply, result);
            }
            Command::Move { from, to, reply } => {
                let result = self.move_track(from, to);
                self.respond(reply, result);
            }
            Command::RemoveUpcoming { reply } => {
                self.remove_upcoming();
                self.respond(reply, Ok(()));
            }
            Command::SetQueue { tracks, reply } => {
                self.set_queue(tracks);
                self.respond(reply, Ok(()));
            }
            Command::UpdateMetadata {
                index,
                patch,
                reply,
            } => {
                let result = self.update_metadata(index, &patch);
                self.respond(reply, result);
            }

            Command::Load { track, reply } => {
                let ack = self.begin_load(None, track, None);
                self.respond(reply, Ok(ack));
            }
            Command::Skip {
                index,
                initial_position,
                reply,
            } => {
                let result = self.skip(index, initial_position);
                self.respond(reply, result);
            }
            Command::SkipToNext {
                initial_position,
                reply,
            } => {
                let ack = self.skip_to_next(initial_position);
                self.respond(reply, Ok(ack));
            }
            Command::SkipToPrevious {
                initial_position,
                reply,
            } => {
                let ack = self.skip_to_previous(initial_position);
                self.respond(reply, Ok(ack));
            }
            Command::Play { reply } => {
                let result = self.play();
                self.respond(reply, result);
            }
            Command::Pause { reply } => {
                let result = self.set_play_when_ready(false);
                self.respond(reply, result);
            }
            Command::Stop { reply } => {
                let result = self.stop();
                self.respond(reply, result);
            }
            Command::Reset { reply } => {
                self.reset();
                self.respond(reply, Ok(()));
            }
            Command::Retry { reply } => {
                let result = self.retry();
                self.respond(reply, result);
            }
            Command::SeekTo { position, reply } => {
                let result = self.seek_to(position);
                self.respond(reply, result);
            }
            Command::SeekBy { offset, reply } => {
                let result = self.seek_by(offset);
                self.respond(reply, result);
            }

            Command::SetVolume { volume, reply } => {
                let result = self.set_volume(volume);
                self.respond(reply, result);
            }
            Command::SetRate { rate, reply } => {
                let result = self.set_rate(rate);
                self.respond(reply, result);
            }
            Command::SetPlayWhenReady {
                play_when_ready,
                reply,
            } => {
                let result = self.set_play_when_ready(play_when_ready);
                self.respond(reply, result);
            }
            Command::SetRepeatMode { mode, reply } => {
                debug!(?mode, "Repeat mode set");
                self.repeat_mode = mode;
                self.respond(reply, Ok(()));
            }
            Command::UpdateOptions { update, reply } => {
                self.update_options(update);
                self.respond(reply, Ok(()));
            }

            Command::UpdateNowPlaying { patch, reply } => {
                let result = self.override_now_playing(NowPlayingOverride::Patch(patch));
                self.respond(reply, result);
            }
            Command::ClearNowPlaying { reply } => {
                let result = self.override_now_playing(NowPlayingOverride::Hidden);
                self.respond(reply, result);
            }
        }

        ControlFlow::Continue(())
    }

    fn respond<T>(&mut self, reply: Reply<T>, result: Result<T>) {
        if let Err(error) = &result {
            debug!(code = error.code(), %error, "Command rejected");
        }

        self.commit();
        if reply.send(result).is_err() {
            trace!("Caller went away before the reply");
        }
    }

    // ===== Lifecycle =====

    fn setup(&mut self, buffer: BufferConfig) -> Result<()> {
        let policy = buffer.resolve()?;

        let notifier = EngineNotifier::new(self.engine_tx.clone());
        self.engine.start(&policy, notifier).map_err(engine_fatal)?;

        if let Err(error) = self.engine.set_volume(self.volume.level()) {
            warn!(%error, "Engine rejected initial volume");
        }
        if let Err(error) = self.engine.set_rate(self.rate) {
            warn!(%error, "Engine rejected initial rate");
        }

        self.policy = Some(policy);
        self.initialized = true;
        info!(
            min_buffer_ms = policy.min_buffer_ms(),
            max_buffer_ms = policy.max_buffer_ms(),
            play_buffer_ms = policy.play_buffer_ms(),
            back_buffer_ms = policy.back_buffer_ms(),
            "Player set up"
        );

        self.transition(Trigger::SetupCompleted);
        Ok(())
    }

    fn teardown(&mut self) {
        self.generation = self.generation.next();
        self.pending_ack = None;
        self.ack_due = false;

        if let Err(error) = self.engine.stop() {
            warn!(%error, "Engine failed to stop during teardown");
        }
        self.engine.release();

        self.initialized = false;
        self.loaded = None;
        self.last_now_playing = None;
        info!("Player torn down");
    }

    // ===== Queue =====

    fn add(&mut self, tracks: Vec<Track>, insert_before: Option<usize>) -> Result<()> {
        let count = tracks.len();
        let insert_before = insert_before.unwrap_or(self.queue.len());

        self.queue.add(tracks, insert_before)?;
        self.sync_loaded_index();
        debug!(count, insert_before, "Tracks added");

        self.queue_changed();
        Ok(())
    }

    fn remove(&mut self, indexes: &[usize]) -> Result<()> {
        let change = self.queue.remove(indexes)?;
        debug!(?indexes, ?change, "Tracks removed");
        self.queue_changed();

        if !self.loaded_from_queue() {
            return Ok(());
        }

        match change {
            ActiveChange::Replaced(index) => {
                if let Some(track) = self.queue.get(index).cloned() {
                    // Nobody waits for this load.
                    drop(self.begin_load(Some(index), track, None));
                }
            }
            ActiveChange::Cleared => self.unload(),
            ActiveChange::Shifted(_) | ActiveChange::Unchanged => self.sync_loaded_index(),
        }

        Ok(())
    }

    fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue.move_track(from, to)?;
        self.sync_loaded_index();
        self.queue_changed();
        Ok(())
    }

    fn remove_upcoming(&mut self) {
        let removed = self.queue.remove_upcoming();
        debug!(removed, "Upcoming tracks removed");
        if removed > 0 {
            self.queue_changed();
        }
    }

    fn set_queue(&mut self, tracks: Vec<Track>) {
        if self.loaded_from_queue() {
            self.unload();
        }

        self.queue.clear();
        self.queue.append(tracks);
        self.queue_changed();
    }

    fn update_metadata(&mut self, index: usize, patch: &MetadataPatch) -> Result<()> {
        let merged = self.track_at(index)?.merged(patch);
        self.queue.replace(index, merged.clone())?;
        self.rebuild_queue_view();

        if let Some(item) = self.loaded.as_mut().filter(|item| item.index == Some(index)) {
            item.track = merged;
        }
        self.refresh_now_playing();
        Ok(())
    }

    fn queue_changed(&mut self) {
        self.rebuild_queue_view();
        self.emit(PlayerEvent::QueueChanged {
            length: self.queue.len(),
        });
    }

    fn rebuild_queue_view(&mut self) {
        self.queue_view = Arc::from(self.queue.tracks());
    }

    fn track_at(&self, index: usize) -> Result<Track> {
        self.queue
            .get(index)
            .cloned()
            .ok_or(PlayerError::IndexOutOfBounds {
                index,
                len: self.queue.len(),
            })
    }

    fn loaded_from_queue(&self) -> bool {
        matches!(self.loaded, Some(LoadedItem { index: Some(_), .. }))
    }

    /// Keep a loaded queue item pointing at the queue cursor after edits
    fn sync_loaded_index(&mut self) {
        let active = self.queue.active_index();
        if let Some(item) = self.loaded.as_mut().filter(|item| item.index.is_some()) {
            item.index = active;
        }
    }

    // ===== Playback =====

    fn skip(&mut self, index: usize, initial_position: Option<Duration>) -> Result<Option<Ack>> {
        let Some(index) = self.queue.set_active(index)? else {
            return Ok(None);
        };
        let track = self.track_at(index)?;
        Ok(Some(self.begin_load(Some(index), track, initial_position)))
    }

    fn skip_to_next(&mut self, initial_position: Option<Duration>) -> Option<Ack> {
        let len = self.queue.len();
        if len == 0 {
            return None;
        }

        let next = match self.queue.active_index() {
            None => Some(0),
            Some(active) if active + 1 < len => Some(active + 1),
            Some(_) if self.repeat_mode == RepeatMode::Queue => Some(0),
            Some(_) => None,
        };

        match next {
            Some(index) => self.skip(index, initial_position).ok().flatten(),
            None => {
                self.end_of_queue();
                None
            }
        }
    }

    fn skip_to_previous(&mut self, initial_position: Option<Duration>) -> Option<Ack> {
        match self.queue.active_index() {
            Some(active) if active > 0 => self.skip(active - 1, initial_position).ok().flatten(),
            _ => None,
        }
    }

    fn end_of_queue(&mut self) {
        if let Err(error) = self.engine.pause() {
            warn!(%error, "Engine failed to pause at end of queue");
        }

        if self.transition(Trigger::EndOfQueue) {
            self.emit(PlayerEvent::QueueEnded {
                index: self.queue.active_index(),
                track: self.queue.active_track().cloned(),
                position: self.progress.position,
            });
        }
    }

    fn play(&mut self) -> Result<Option<Ack>> {
        if self.loaded.is_some() {
            self.set_play_when_ready(true)?;
            return Ok(None);
        }

        self.play_when_ready = true;
        if self.queue.is_empty() {
            return Ok(None);
        }

        let index = self.queue.active_index().unwrap_or(0);
        self.skip(index, None)
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        let state = self.machine.state();

        if play_when_ready {
            let resumable = matches!(
                state,
                PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Stopped
            );
            if self.loaded.is_some() && resumable {
                self.engine.play().map_err(engine_fatal)?;
                self.transition(Trigger::Play {
                    buffering: self.engine_buffering,
                });
            }
        } else if state.is_playing() {
            self.engine.pause().map_err(engine_fatal)?;
            self.transition(Trigger::Pause);
        }

        self.play_when_ready = play_when_ready;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // Keep the failed position for retry.
        if self.machine.state().error_reason().is_some() {
            return Ok(());
        }

        self.engine.stop().map_err(engine_fatal)?;

        self.pending_ack = None;
        self.ack_due = false;
        self.play_when_ready = false;
        self.progress.position = 0.0;
        self.transition(Trigger::Stop);
        self.refresh_now_playing();
        Ok(())
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.queue_changed();
        self.play_when_ready = false;
        self.unload();
    }

    fn retry(&mut self) -> Result<Option<Ack>> {
        let item = self.loaded.clone().ok_or(PlayerError::NoCurrentItem)?;
        if self.machine.state().error_reason().is_none() {
            return Ok(None);
        }

        let position = self.progress.position;
        debug!(position, "Retrying current item");
        self.transition(Trigger::Retry);

        let resume_at = Duration::try_from_secs_f64(position)
            .ok()
            .filter(|resume_at| !resume_at.is_zero());
        Ok(Some(self.begin_load(item.index, item.track, resume_at)))
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.loaded.is_none() {
            return Err(PlayerError::NoCurrentItem);
        }

        self.engine.seek(position).map_err(engine_fatal)?;
        self.progress.position = position.as_secs_f64();
        self.refresh_now_playing();
        Ok(())
    }

    fn seek_by(&mut self, offset: f64) -> Result<()> {
        if self.loaded.is_none() {
            return Err(PlayerError::NoCurrentItem);
        }

        let mut target = (self.progress.position + offset).max(0.0);
        if self.progress.duration > 0.0 {
            target = target.min(self.progress.duration);
        }
        let target = Duration::try_from_secs_f64(target).map_err(|_| PlayerError::InvalidValue {
            name: "offset",
            value: offset,
        })?;
        self.seek_to(target)
    }

    fn set_volume(&mut self, volume: Volume) -> Result<()> {
        self.engine
            .set_volume(volume.level())
            .map_err(engine_fatal)?;
        self.volume = volume;
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.engine.set_rate(rate).map_err(engine_fatal)?;
        self.rate = rate;
        Ok(())
    }

    fn update_options(&mut self, update: OptionsUpdate) {
        if let Some(rating_type) = update.rating_type {
            self.rating_type = rating_type;
        }
        if let Some(timeout_ms) = update.engine_ack_timeout_ms {
            self.engine_ack_timeout_ms = timeout_ms;
        }
        debug!(
            rating_type = ?self.rating_type,
            engine_ack_timeout_ms = self.engine_ack_timeout_ms,
            "Options updated"
        );
    }

    /// Hand a new item to the engine
    ///
    /// Bumps the load generation, so anything the engine still reports about
    /// the previous item is dropped. A pending acknowledgement for the
    /// previous load is released as superseded.
    fn begin_load(
        &mut self,
        index: Option<usize>,
        track: Track,
        initial_position: Option<Duration>,
    ) -> Ack {
        let last = self.loaded.take();
        let last_position = self.progress.position;

        self.generation = self.generation.next();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending_ack = Some(ack_tx);
        self.ack_due = false;

        self.progress = Progress {
            position: initial_position.map_or(0.0, |p| p.as_secs_f64()),
            duration: track.duration().map_or(0.0, |d| d.as_secs_f64()),
            buffered: 0.0,
        };
        self.engine_buffering = false;
        self.now_playing_override = NowPlayingOverride::None;
        self.loaded = Some(LoadedItem {
            index,
            track: track.clone(),
        });

        debug!(
            generation = self.generation.value(),
            ?index,
            url = track.url().as_str(),
            "Loading track"
        );
        self.transition(Trigger::Load);

        let changed = last
            .as_ref()
            .map_or(true, |last| last.index != index || last.track != track);
        if changed {
            self.emit(PlayerEvent::ActiveTrackChanged {
                index,
                track: Some(track.clone()),
                last_index: last.as_ref().and_then(|item| item.index),
                last_track: last.map(|item| item.track),
                last_position,
            });
        }

        match self.engine.load(&track, self.generation) {
            Ok(()) => {
                if let Some(position) = initial_position {
                    if let Err(error) = self.engine.seek(position) {
                        warn!(%error, "Engine rejected initial seek");
                    }
                }
            }
            Err(error) => self.fail(error.to_string()),
        }

        self.refresh_now_playing();
        ack_rx
    }

    /// Drop the loaded item and stop the engine
    fn unload(&mut self) {
        self.generation = self.generation.next();
        self.pending_ack = None;
        self.ack_due = false;

        let last = self.loaded.take();
        let last_position = self.progress.position;

        if let Err(error) = self.engine.stop() {
            warn!(%error, "Engine failed to stop while unloading");
        }

        self.progress = Progress::default();
        self.engine_buffering = false;
        self.now_playing_override = NowPlayingOverride::None;
        self.transition(Trigger::Unload);

        if let Some(last) = last {
            self.emit(PlayerEvent::ActiveTrackChanged {
                index: None,
                track: None,
                last_index: last.index,
                last_track: Some(last.track),
                last_position,
            });
        }
        self.refresh_now_playing();
    }

    fn fail(&mut self, reason: String) {
        warn!(%reason, "Playback failed");
        let error = PlayerError::EngineFatal {
            reason: reason.clone(),
        };

        self.transition(Trigger::FatalError(reason));
        self.emit(PlayerEvent::PlaybackError {
            code: error.code().to_string(),
            message: error.to_string(),
        });
        self.ack_due = true;
    }

    // ===== Engine notifications =====

    fn handle_engine(&mut self, message: EngineMessage) {
        if !self.initialized || self.loaded.is_none() || message.generation != self.generation {
            trace!(
                generation = message.generation.value(),
                current = self.generation.value(),
                event = ?message.event,
                "Dropping stale engine event"
            );
            return;
        }

        match message.event {
            EngineEvent::Ready => self.on_engine_ready(),
            EngineEvent::Telemetry(telemetry) => self.on_telemetry(telemetry),
            EngineEvent::BufferingChanged(buffering) => {
                self.engine_buffering = buffering;
                self.transition(Trigger::BufferingChanged(buffering));
            }
            EngineEvent::ItemEnded => self.on_item_ended(),
            EngineEvent::FatalError(reason) => self.fail(reason),
        }

        self.commit();
    }

    fn on_engine_ready(&mut self) {
        self.ack_due = true;

        if !self.transition(Trigger::EngineReady) || !self.play_when_ready {
            return;
        }

        match self.engine.play() {
            Ok(()) => {
                self.transition(Trigger::Play {
                    buffering: self.engine_buffering,
                });
            }
            Err(error) => self.fail(error.to_string()),
        }
    }

    fn on_telemetry(&mut self, telemetry: Telemetry) {
        self.progress.position = telemetry.position.as_secs_f64();
        self.progress.buffered = telemetry.buffered.as_secs_f64();
        if telemetry.rate.is_finite() && telemetry.rate > 0.0 {
            self.rate = telemetry.rate;
        }

        if let Some(duration) = telemetry.duration {
            let duration = duration.as_secs_f64();
            if duration != self.progress.duration {
                self.progress.duration = duration;
                self.refresh_now_playing();
            }
        }
    }

    fn on_item_ended(&mut self) {
        if !self.machine.state().is_playing() {
            trace!("Ignoring item end outside playback");
            return;
        }
        let Some(item) = self.loaded.clone() else {
            return;
        };

        if self.repeat_mode == RepeatMode::Track {
            debug!("Repeating current track");
            self.transition(Trigger::ItemEnded { has_next: true });
            drop(self.begin_load(item.index, item.track, None));
            return;
        }

        let next = item.index.and_then(|active| {
            if active + 1 < self.queue.len() {
                Some(active + 1)
            } else if self.repeat_mode == RepeatMode::Queue {
                Some(0)
            } else {
                None
            }
        });

        match next {
            Some(index) => {
                debug!(index, "Advancing to next track");
                self.transition(Trigger::ItemEnded { has_next: true });
                if let Err(error) = self.skip(index, None) {
                    warn!(%error, "Auto-advance failed");
                }
            }
            None => {
                self.transition(Trigger::ItemEnded { has_next: false });
                self.emit(PlayerEvent::QueueEnded {
                    index: item.index,
                    track: Some(item.track),
                    position: self.progress.position,
                });
            }
        }
    }

    // ===== Outward =====

    fn override_now_playing(&mut self, value: NowPlayingOverride) -> Result<()> {
        if self.loaded.is_none() {
            return Err(PlayerError::NoCurrentItem);
        }

        self.now_playing_override = value;
        self.refresh_now_playing();
        Ok(())
    }

    /// Apply a trigger; returns whether the state changed
    fn transition(&mut self, trigger: Trigger) -> bool {
        let Some(transition) = self.machine.apply(trigger) else {
            return false;
        };

        debug!(
            from = transition.from.name(),
            to = transition.to.name(),
            "Playback state changed"
        );
        self.emit(PlayerEvent::PlaybackState {
            state: transition.to,
        });
        self.refresh_now_playing();
        true
    }

    fn project_now_playing(&self) -> Option<NowPlaying> {
        let item = self.loaded.as_ref()?;
        let patch = match &self.now_playing_override {
            NowPlayingOverride::Hidden => return None,
            NowPlayingOverride::Patch(patch) => Some(patch),
            NowPlayingOverride::None => None,
        };

        let duration = (self.progress.duration > 0.0).then_some(self.progress.duration);
        Some(NowPlaying::project(
            &item.track,
            patch,
            self.machine.state(),
            self.progress.position,
            duration,
        ))
    }

    fn refresh_now_playing(&mut self) {
        let now_playing = self.project_now_playing();
        if now_playing != self.last_now_playing {
            self.last_now_playing.clone_from(&now_playing);
            self.emit(PlayerEvent::NowPlayingChanged { now_playing });
        }
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine.
        self.events.send(event).ok();
    }

    /// Publish the snapshot, then release a settled load acknowledgement
    fn commit(&mut self) {
        self.publish();

        if self.ack_due {
            self.ack_due = false;
            if let Some(ack) = self.pending_ack.take() {
                ack.send(()).ok();
            }
        }
    }

    fn publish(&mut self) {
        let snapshot = PlayerSnapshot {
            initialized: self.initialized,
            queue: Arc::clone(&self.queue_view),
            active_index: self.queue.active_index(),
            active_track: self.loaded.as_ref().map(|item| item.track.clone()),
            state: self.machine.state().clone(),
            progress: self.progress,
            volume: self.volume.level(),
            rate: self.rate,
            play_when_ready: self.play_when_ready,
            repeat_mode: self.repeat_mode,
            buffer_policy: self.policy,
            now_playing: self.project_now_playing(),
            rating_type: self.rating_type,
            engine_ack_timeout_ms: self.engine_ack_timeout_ms,
        };
        self.snapshot.send_replace(snapshot);
    }
}

fn engine_fatal(error: EngineError) -> PlayerError {
    warn!(%error, "Engine rejected command");
    PlayerError::EngineFatal {
        reason: error.to_string(),
    }
}
