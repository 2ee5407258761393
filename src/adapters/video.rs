//! Embeddable video player platform.
//!
//! The platform creates players bound to a page element and reports their
//! lifecycle through an event channel. Position is never pushed: consumers
//! pull it with [`PlayerHandle::current_time`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ViewerError;

/// Player lifecycle state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map the platform's numeric state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }
}

/// Callback payloads delivered by a player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Player is ready; duration in seconds
    Ready { duration: f64 },
    StateChange(PlayerState),
    Error(String),
}

/// Embed options passed to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    pub playsinline: bool,
    pub controls: bool,
    pub related_videos: bool,
    pub show_info: bool,
    pub fullscreen_button: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            playsinline: true,
            controls: false,
            related_videos: false,
            show_info: false,
            fullscreen_button: false,
        }
    }
}

impl PlayerOptions {
    /// Options as embed parameters
    pub fn player_vars(&self) -> Vec<(&'static str, u8)> {
        vec![
            ("playsinline", self.playsinline as u8),
            ("controls", self.controls as u8),
            ("rel", self.related_videos as u8),
            ("showinfo", self.show_info as u8),
            ("fs", self.fullscreen_button as u8),
        ]
    }
}

/// Control surface of one created player
pub trait PlayerHandle: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);
    fn mute(&self);
    fn unmute(&self);
    fn set_volume(&self, volume: u8);
    /// Playback position in seconds
    fn current_time(&self) -> f64;
    /// Tear down the player; further calls are ignored
    fn destroy(&self);
}

/// Trait for video embed platforms
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    fn name(&self) -> &str;

    /// Create a player for `video_id` inside `element_id`.
    ///
    /// Lifecycle callbacks are delivered on `events`.
    async fn create_player(
        &self,
        element_id: &str,
        video_id: &str,
        options: PlayerOptions,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Result<Arc<dyn PlayerHandle>, ViewerError>;
}

#[derive(Debug)]
struct Playback {
    state: PlayerState,
    /// Position when `started_at` was set, or the frozen position
    position: f64,
    started_at: Option<Instant>,
    volume: u8,
    muted: bool,
    destroyed: bool,
}

impl Playback {
    fn position_now(&self, duration: f64) -> f64 {
        let elapsed = self
            .started_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.position + elapsed).min(duration)
    }
}

/// Clock-driven player that plays nothing.
///
/// Position advances with tokio's clock while playing, so paused test time
/// drives it deterministically. Reaching the end is noticed when the
/// position is next sampled, at which point `Ended` is emitted once.
#[derive(Debug)]
pub struct SimulatedPlayer {
    video_id: String,
    duration: f64,
    playback: Mutex<Playback>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    current_time_calls: AtomicUsize,
}

impl SimulatedPlayer {
    fn new(video_id: &str, duration: f64, events: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self {
            video_id: video_id.to_string(),
            duration,
            playback: Mutex::new(Playback {
                state: PlayerState::Unstarted,
                position: 0.0,
                started_at: None,
                volume: 100,
                muted: false,
                destroyed: false,
            }),
            events,
            current_time_calls: AtomicUsize::new(0),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn state(&self) -> PlayerState {
        self.with_playback(|p| p.state).unwrap_or(PlayerState::Unstarted)
    }

    pub fn volume(&self) -> u8 {
        self.with_playback(|p| p.volume).unwrap_or(0)
    }

    pub fn is_muted(&self) -> bool {
        self.with_playback(|p| p.muted).unwrap_or(false)
    }

    pub fn is_destroyed(&self) -> bool {
        self.with_playback(|p| p.destroyed).unwrap_or(true)
    }

    /// How many times the position has been sampled
    pub fn current_time_calls(&self) -> usize {
        self.current_time_calls.load(Ordering::SeqCst)
    }

    fn with_playback<T>(&self, f: impl FnOnce(&mut Playback) -> T) -> Option<T> {
        self.playback.lock().ok().map(|mut p| f(&mut p))
    }

    fn emit(&self, state: PlayerState) {
        // Receiver gone means the consumer was torn down
        let _ = self.events.send(PlayerEvent::StateChange(state));
    }
}

impl PlayerHandle for SimulatedPlayer {
    fn play(&self) {
        let duration = self.duration;
        let changed = self.with_playback(|p| {
            if p.destroyed || p.state == PlayerState::Playing {
                return false;
            }
            if p.position >= duration {
                p.position = 0.0;
            }
            p.started_at = Some(Instant::now());
            p.state = PlayerState::Playing;
            true
        });

        if changed == Some(true) {
            self.emit(PlayerState::Playing);
        }
    }

    fn pause(&self) {
        let duration = self.duration;
        let changed = self.with_playback(|p| {
            if p.destroyed || p.state != PlayerState::Playing {
                return false;
            }
            p.position = p.position_now(duration);
            p.started_at = None;
            p.state = PlayerState::Paused;
            true
        });

        if changed == Some(true) {
            self.emit(PlayerState::Paused);
        }
    }

    fn seek_to(&self, seconds: f64) {
        let duration = self.duration;
        let left_end = self.with_playback(|p| {
            if p.destroyed {
                return false;
            }
            p.position = seconds.clamp(0.0, duration);
            if p.started_at.is_some() {
                p.started_at = Some(Instant::now());
            }
            if p.state == PlayerState::Ended {
                p.state = PlayerState::Paused;
                return true;
            }
            false
        });

        if left_end == Some(true) {
            self.emit(PlayerState::Paused);
        }
    }

    fn mute(&self) {
        self.with_playback(|p| p.muted = true);
    }

    fn unmute(&self) {
        self.with_playback(|p| p.muted = false);
    }

    fn set_volume(&self, volume: u8) {
        self.with_playback(|p| p.volume = volume.min(100));
    }

    fn current_time(&self) -> f64 {
        self.current_time_calls.fetch_add(1, Ordering::SeqCst);

        let duration = self.duration;
        let sample = self.with_playback(|p| {
            let position = p.position_now(duration);
            let ended = p.state == PlayerState::Playing && position >= duration;
            if ended {
                p.position = duration;
                p.started_at = None;
                p.state = PlayerState::Ended;
            }
            (position, ended)
        });

        match sample {
            Some((position, ended)) => {
                if ended {
                    self.emit(PlayerState::Ended);
                }
                position
            }
            None => 0.0,
        }
    }

    fn destroy(&self) {
        self.with_playback(|p| {
            p.destroyed = true;
            p.started_at = None;
        });
        debug!(video_id = %self.video_id, "Destroyed simulated player");
    }
}

/// Platform creating [`SimulatedPlayer`]s of a fixed duration
#[derive(Debug, Default)]
pub struct SimulatedPlatform {
    duration: f64,
    players: Mutex<Vec<Arc<SimulatedPlayer>>>,
}

impl SimulatedPlatform {
    /// Create a platform whose videos last `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            players: Mutex::new(Vec::new()),
        }
    }

    /// Most recently created player
    pub fn last_player(&self) -> Option<Arc<SimulatedPlayer>> {
        self.players.lock().ok().and_then(|p| p.last().cloned())
    }

    pub fn players_created(&self) -> usize {
        self.players.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VideoPlatform for SimulatedPlatform {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn create_player(
        &self,
        element_id: &str,
        video_id: &str,
        options: PlayerOptions,
        events: mpsc::UnboundedSender<PlayerEvent>,
    ) -> Result<Arc<dyn PlayerHandle>, ViewerError> {
        debug!(element_id, video_id, vars = ?options.player_vars(), "Creating simulated player");

        let player = Arc::new(SimulatedPlayer::new(video_id, self.duration, events.clone()));
        self.players
            .lock()
            .map_err(|_| ViewerError::load("video player", "player registry poisoned"))?
            .push(Arc::clone(&player));

        let _ = events.send(PlayerEvent::Ready {
            duration: self.duration,
        });

        Ok(player)
    }
}
