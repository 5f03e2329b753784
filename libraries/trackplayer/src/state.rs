//! Playback state machine
//!
//! Driven by two independent sources: explicit commands and asynchronous
//! engine notifications. Pairs that cannot happen in a given state are
//! no-ops rather than errors, so callers racing against async setup never
//! have to special-case them.
//!
//! ```text
//! Idle ──setup──▶ Ready ──play──▶ Playing ⇄ Buffering
//!                   ▲               │
//!                 ready           pause ──▶ Paused ──play──▶ Playing
//!                   │
//! load/skip/retry ──▶ Loading
//! Playing ──item end, no next──▶ Ended
//! any ──fatal──▶ Error ──retry──▶ Loading
//! ```

use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum PlaybackState {
    /// Not set up yet
    Idle,

    /// Engine is loading an item
    Loading,

    /// Item loaded, not playing
    Ready,

    /// Playing audio
    Playing,

    /// Paused mid-track
    Paused,

    /// Waiting for enough buffered data
    Buffering,

    /// Stopped by command
    Stopped,

    /// Reached the end with nothing left to play
    Ended,

    /// Fatal engine failure
    Error(String),
}

impl PlaybackState {
    /// Stable lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Ended => "ended",
            PlaybackState::Error(_) => "error",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Buffering)
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            PlaybackState::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Playback state as reported to the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStateInfo {
    pub state: String,
    pub error_reason: Option<String>,
}

impl From<&PlaybackState> for PlaybackStateInfo {
    fn from(state: &PlaybackState) -> Self {
        Self {
            state: state.name().to_string(),
            error_reason: state.error_reason().map(str::to_string),
        }
    }
}

/// Things that can move the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Setup finished
    SetupCompleted,

    /// Play command; `buffering` is the engine's last buffering report
    Play { buffering: bool },

    /// Pause command
    Pause,

    /// Stop command
    Stop,

    /// Retry command
    Retry,

    /// A new item is being loaded (skip, load, auto-advance)
    Load,

    /// Engine finished loading the current item
    EngineReady,

    /// Engine buffering report
    BufferingChanged(bool),

    /// Engine reached the end of the current item
    ItemEnded { has_next: bool },

    /// Skip past the last item
    EndOfQueue,

    /// Engine reported an unrecoverable error
    FatalError(String),

    /// Current item unloaded (reset, active item removed)
    Unload,
}

/// A state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: PlaybackState,
    pub to: PlaybackState,
}

/// Finite-state model of the engine lifecycle
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: PlaybackState,
}

impl StateMachine {
    /// Start in `Idle`
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Apply a trigger
    ///
    /// Returns the transition when the state actually changed; unreachable
    /// pairs and self-loops return `None` so no duplicate event goes out.
    pub fn apply(&mut self, trigger: Trigger) -> Option<Transition> {
        let next = Self::next_state(&self.state, trigger)?;
        if next == self.state {
            return None;
        }

        let from = std::mem::replace(&mut self.state, next.clone());
        Some(Transition { from, to: next })
    }

    fn next_state(state: &PlaybackState, trigger: Trigger) -> Option<PlaybackState> {
        use PlaybackState as S;

        // Nothing but setup leaves Idle.
        if *state == S::Idle {
            return (trigger == Trigger::SetupCompleted).then_some(S::Ready);
        }

        match (state, trigger) {
            (_, Trigger::FatalError(reason)) => Some(S::Error(reason)),
            (_, Trigger::Load) => Some(S::Loading),
            (_, Trigger::Unload) => Some(S::Stopped),

            (S::Ready | S::Paused | S::Stopped, Trigger::Play { buffering }) => {
                Some(if buffering { S::Buffering } else { S::Playing })
            }
            (S::Playing, Trigger::BufferingChanged(true)) => Some(S::Buffering),
            (S::Buffering, Trigger::BufferingChanged(false)) => Some(S::Playing),
            (S::Playing | S::Buffering, Trigger::Pause) => Some(S::Paused),
            (S::Error(_), Trigger::Stop) => None,
            (_, Trigger::Stop) => Some(S::Stopped),
            (S::Error(_), Trigger::Retry) => Some(S::Loading),
            (S::Loading, Trigger::EngineReady) => Some(S::Ready),
            (S::Playing | S::Buffering, Trigger::ItemEnded { has_next }) => {
                Some(if has_next { S::Loading } else { S::Ended })
            }
            (S::Ended, Trigger::EndOfQueue) => None,
            (_, Trigger::EndOfQueue) => Some(S::Ended),

            _ => None,
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_in(state: PlaybackState) -> StateMachine {
        StateMachine { state }
    }

    #[test]
    fn starts_idle_and_only_setup_leaves_it() {
        let mut machine = StateMachine::new();
        assert_eq!(*machine.state(), PlaybackState::Idle);

        assert!(machine.apply(Trigger::Pause).is_none());
        assert!(machine.apply(Trigger::Play { buffering: false }).is_none());
        assert!(machine.apply(Trigger::Load).is_none());

        let transition = machine.apply(Trigger::SetupCompleted).unwrap();
        assert_eq!(transition.from, PlaybackState::Idle);
        assert_eq!(transition.to, PlaybackState::Ready);
    }

    #[test]
    fn play_goes_to_buffering_when_engine_is_starved() {
        for from in [
            PlaybackState::Ready,
            PlaybackState::Paused,
            PlaybackState::Stopped,
        ] {
            let mut machine = machine_in(from.clone());
            machine.apply(Trigger::Play { buffering: true });
            assert_eq!(*machine.state(), PlaybackState::Buffering, "from {:?}", from);

            let mut machine = machine_in(from.clone());
            machine.apply(Trigger::Play { buffering: false });
            assert_eq!(*machine.state(), PlaybackState::Playing, "from {:?}", from);
        }
    }

    #[test]
    fn buffering_round_trip() {
        let mut machine = machine_in(PlaybackState::Playing);
        machine.apply(Trigger::BufferingChanged(true));
        assert_eq!(*machine.state(), PlaybackState::Buffering);
        machine.apply(Trigger::BufferingChanged(false));
        assert_eq!(*machine.state(), PlaybackState::Playing);

        // Buffering reports while paused change nothing
        let mut machine = machine_in(PlaybackState::Paused);
        assert!(machine.apply(Trigger::BufferingChanged(true)).is_none());
    }

    #[test]
    fn pause_twice_reports_one_transition() {
        let mut machine = machine_in(PlaybackState::Playing);
        assert!(machine.apply(Trigger::Pause).is_some());
        assert!(machine.apply(Trigger::Pause).is_none());
        assert_eq!(*machine.state(), PlaybackState::Paused);
    }

    #[test]
    fn stop_from_anything_but_error() {
        for from in [
            PlaybackState::Ready,
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Buffering,
            PlaybackState::Ended,
        ] {
            let mut machine = machine_in(from.clone());
            machine.apply(Trigger::Stop);
            assert_eq!(*machine.state(), PlaybackState::Stopped, "from {:?}", from);
        }

        let mut machine = machine_in(PlaybackState::Error("boom".into()));
        assert!(machine.apply(Trigger::Stop).is_none());
    }

    #[test]
    fn error_needs_explicit_exit() {
        let mut machine = machine_in(PlaybackState::Playing);
        machine.apply(Trigger::FatalError("network".into()));
        assert_eq!(*machine.state(), PlaybackState::Error("network".into()));

        assert!(machine.apply(Trigger::Play { buffering: false }).is_none());
        assert!(machine.apply(Trigger::Pause).is_none());
        assert!(machine.apply(Trigger::EngineReady).is_none());

        machine.apply(Trigger::Retry);
        assert_eq!(*machine.state(), PlaybackState::Loading);
        machine.apply(Trigger::EngineReady);
        assert_eq!(*machine.state(), PlaybackState::Ready);
    }

    #[test]
    fn ended_needs_explicit_exit() {
        let mut machine = machine_in(PlaybackState::Playing);
        machine.apply(Trigger::ItemEnded { has_next: false });
        assert_eq!(*machine.state(), PlaybackState::Ended);

        assert!(machine.apply(Trigger::Play { buffering: false }).is_none());
        assert!(machine.apply(Trigger::Retry).is_none());

        machine.apply(Trigger::Load);
        assert_eq!(*machine.state(), PlaybackState::Loading);
    }

    #[test]
    fn item_end_with_next_auto_advances() {
        let mut machine = machine_in(PlaybackState::Buffering);
        machine.apply(Trigger::ItemEnded { has_next: true });
        assert_eq!(*machine.state(), PlaybackState::Loading);

        // A late end report while paused is ignored
        let mut machine = machine_in(PlaybackState::Paused);
        assert!(machine.apply(Trigger::ItemEnded { has_next: true }).is_none());
    }

    #[test]
    fn ready_only_counts_while_loading() {
        let mut machine = machine_in(PlaybackState::Stopped);
        assert!(machine.apply(Trigger::EngineReady).is_none());
        assert_eq!(*machine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn unload_leaves_error_too() {
        let mut machine = machine_in(PlaybackState::Error("decode".into()));
        machine.apply(Trigger::Unload);
        assert_eq!(*machine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn end_of_queue_ends_once() {
        let mut machine = machine_in(PlaybackState::Paused);
        assert!(machine.apply(Trigger::EndOfQueue).is_some());
        assert!(machine.apply(Trigger::EndOfQueue).is_none());
        assert_eq!(*machine.state(), PlaybackState::Ended);
    }

    #[test]
    fn state_info_carries_error_reason() {
        let info = PlaybackStateInfo::from(&PlaybackState::Error("decoder crashed".into()));
        assert_eq!(info.state, "error");
        assert_eq!(info.error_reason.as_deref(), Some("decoder crashed"));

        let info = PlaybackStateInfo::from(&PlaybackState::Paused);
        assert_eq!(info.state, "paused");
        assert_eq!(info.error_reason, None);
    }
}
