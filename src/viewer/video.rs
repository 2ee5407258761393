//! Video transport control.
//!
//! [`VideoTransport`] drives one embedded player: play/pause, volume, seek
//! and fullscreen. The player never pushes its position, so while it is
//! playing the transport owns a poll task that samples the position on a
//! fixed interval. There is at most one poll per transport and it is
//! cancelled on pause, end, unmount and drop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{PlayerEvent, PlayerHandle, PlayerOptions, PlayerState, VideoPlatform};
use crate::error::ViewerError;

/// Element the player is embedded into
pub const PLAYER_ELEMENT_ID: &str = "youtube-player";

/// Placeholder text for URLs without a recognizable video id
pub const INVALID_VIDEO_MESSAGE: &str = "Invalid video URL";

const VIDEO_ID_LEN: usize = 11;

const MARKERS: [&[u8]; 4] = [b"v/", b"embed/", b"watch?v=", b"&v="];

/// Extract the platform video id from a share, embed or watch URL.
///
/// The id follows the last of `youtu.be/`, `v/`, `u/<w>/`, `embed/`,
/// `watch?v=` or `&v=` and runs to the next `#`, `&` or `?`. Only ids of
/// exactly 11 characters are accepted.
pub fn extract_video_id(url: &str) -> Option<String> {
    let bytes = url.as_bytes();
    let mut id_start = None;

    for i in 0..bytes.len() {
        if let Some(len) = marker_len(&bytes[i..]) {
            id_start = Some(i + len);
        }
    }

    let start = id_start?;
    let rest = &url[start..];
    let end = rest
        .find(|c: char| matches!(c, '#' | '&' | '?'))
        .unwrap_or(rest.len());
    let id = &rest[..end];

    (id.chars().count() == VIDEO_ID_LEN).then(|| id.to_string())
}

/// Length of the marker starting at the head of `s`, if any
fn marker_len(s: &[u8]) -> Option<usize> {
    // `youtu.be/` with the dot matching any byte
    if s.len() >= 9 && &s[..5] == b"youtu" && &s[6..9] == b"be/" {
        return Some(9);
    }
    // `u/<word char>/`
    if s.len() >= 4 && s[0] == b'u' && s[1] == b'/' && is_word_byte(s[2]) && s[3] == b'/' {
        return Some(4);
    }
    for marker in MARKERS {
        if s.starts_with(marker) {
            return Some(marker.len());
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Volume level, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: u8 = 100;

    pub fn new(volume: i32) -> Self {
        Self(volume.clamp(0, i32::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Transport tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSettings {
    pub poll_interval: Duration,
    pub skip_seconds: f64,
    pub initial_volume: Volume,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            skip_seconds: 10.0,
            initial_volume: Volume::default(),
        }
    }
}

/// Where the player is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// Player requested, not ready yet
    Unstarted,
    Ready,
    Playing,
    Paused,
    Buffering,
    Cued,
    Ended,
    /// Player torn down
    Destroyed,
}

/// Observable transport state
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTransportState {
    pub playing: bool,
    pub volume: Volume,
    pub muted: bool,
    /// Duration in seconds, known once the player is ready
    pub duration: f64,
    pub fullscreen: bool,
    pub phase: PlayerPhase,
    /// Last error reported by the platform
    pub error: Option<String>,
}

/// Position poll owned by a transport. Aborts its task when dropped.
///
/// The task also stops on its own once a sample reaches `duration`, so an
/// ended video is not sampled again even if its events are never pumped.
struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    fn spawn(
        player: Arc<dyn PlayerHandle>,
        position: Arc<watch::Sender<f64>>,
        interval: Duration,
        duration: f64,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let sample = player.current_time();
                position.send_replace(sample);
                if duration > 0.0 && sample >= duration {
                    debug!(sample, duration, "Poll reached the end");
                    break;
                }
            }
        });

        Self { handle }
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Transport control for one mounted player
pub struct VideoTransport {
    video_id: String,
    player: Option<Arc<dyn PlayerHandle>>,
    events: mpsc::UnboundedReceiver<PlayerEvent>,
    position: Arc<watch::Sender<f64>>,
    poll: Option<PollTask>,
    state: VideoTransportState,
    settings: TransportSettings,
}

impl std::fmt::Debug for VideoTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTransport")
            .field("video_id", &self.video_id)
            .field("state", &self.state)
            .field("polling", &self.poll.is_some())
            .finish_non_exhaustive()
    }
}

impl VideoTransport {
    /// Create the player for `video_id` on `platform`.
    ///
    /// A platform failure still yields a transport: it stays `Unstarted`,
    /// records the error and ignores every control.
    #[instrument(skip(platform, settings), fields(platform_name = platform.name()))]
    pub async fn mount(
        platform: &dyn VideoPlatform,
        video_id: &str,
        settings: TransportSettings,
    ) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let (position, _) = watch::channel(0.0);

        let (player, error) = match platform
            .create_player(PLAYER_ELEMENT_ID, video_id, PlayerOptions::default(), tx)
            .await
        {
            Ok(player) => (Some(player), None),
            Err(e) => {
                warn!(error = %e, "Could not create player");
                (None, Some(e.to_string()))
            }
        };

        let mut transport = Self {
            video_id: video_id.to_string(),
            player,
            events,
            position: Arc::new(position),
            poll: None,
            state: VideoTransportState {
                playing: false,
                volume: settings.initial_volume,
                muted: false,
                duration: 0.0,
                fullscreen: false,
                phase: PlayerPhase::Unstarted,
                error,
            },
            settings,
        };
        transport.pump();
        transport
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn state(&self) -> &VideoTransportState {
        &self.state
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// Last sampled position in seconds
    pub fn position(&self) -> f64 {
        *self.position.borrow()
    }

    /// Receiver that observes every position update
    pub fn subscribe_position(&self) -> watch::Receiver<f64> {
        self.position.subscribe()
    }

    /// `m:ss / m:ss` progress label
    pub fn progress_label(&self) -> String {
        format!(
            "{} / {}",
            crate::domain::format_timestamp(self.position()),
            crate::domain::format_timestamp(self.state.duration)
        )
    }

    /// Apply every player event that has already arrived
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next player event and apply it.
    ///
    /// Returns `None` once the player side of the channel is gone.
    pub async fn next_event(&mut self) -> Option<PlayerEvent> {
        let event = self.events.recv().await?;
        self.handle_event(event.clone());
        Some(event)
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        if self.state.phase == PlayerPhase::Destroyed {
            return;
        }

        match event {
            PlayerEvent::Ready { duration } => {
                debug!(duration, "Player ready");
                self.state.duration = duration.max(0.0);
                self.state.phase = PlayerPhase::Ready;
                if let Some(player) = &self.player {
                    player.set_volume(self.state.volume.value());
                }
            }
            PlayerEvent::StateChange(state) => self.on_state_change(state),
            PlayerEvent::Error(message) => {
                warn!(video_id = %self.video_id, error = %message, "Player error");
                self.state.error = Some(message);
            }
        }
    }

    fn on_state_change(&mut self, state: PlayerState) {
        debug!(?state, "Player state changed");
        match state {
            PlayerState::Playing => {
                self.state.playing = true;
                self.state.phase = PlayerPhase::Playing;
                self.start_poll();
            }
            PlayerState::Paused => {
                self.state.playing = false;
                self.state.phase = PlayerPhase::Paused;
                self.stop_poll();
            }
            PlayerState::Ended => {
                self.state.playing = false;
                self.state.phase = PlayerPhase::Ended;
                self.stop_poll();
                self.position.send_replace(self.state.duration);
            }
            PlayerState::Buffering => self.state.phase = PlayerPhase::Buffering,
            PlayerState::Cued => self.state.phase = PlayerPhase::Cued,
            PlayerState::Unstarted => self.state.phase = PlayerPhase::Unstarted,
        }
    }

    fn start_poll(&mut self) {
        let Some(player) = &self.player else {
            return;
        };
        // Replacing the handle aborts any previous poll
        self.poll = Some(PollTask::spawn(
            Arc::clone(player),
            Arc::clone(&self.position),
            self.settings.poll_interval,
            self.state.duration,
        ));
    }

    fn stop_poll(&mut self) {
        self.poll = None;
    }

    /// Whether the position poll is still sampling the player
    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(PollTask::is_running)
    }

    /// Play or pause; ignored until the player exists
    pub fn toggle_play(&mut self) {
        let Some(player) = &self.player else {
            return;
        };
        if self.state.playing {
            player.pause();
        } else {
            player.play();
        }
        self.pump();
    }

    /// Seek to `seconds`, clamped to the video
    pub fn seek(&mut self, seconds: f64) {
        let Some(player) = &self.player else {
            return;
        };
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, self.state.duration)
        } else {
            0.0
        };
        player.seek_to(target);
        self.position.send_replace(target);
        self.pump();
    }

    pub fn skip_backward(&mut self) {
        self.seek(self.position() - self.settings.skip_seconds);
    }

    pub fn skip_forward(&mut self) {
        self.seek(self.position() + self.settings.skip_seconds);
    }

    /// Set the volume. Zero mutes; a positive volume lifts an existing mute.
    pub fn set_volume(&mut self, volume: i32) {
        let Some(player) = &self.player else {
            return;
        };
        let volume = Volume::new(volume);
        player.set_volume(volume.value());
        self.state.volume = volume;

        if volume.is_zero() {
            player.mute();
            self.state.muted = true;
        } else if self.state.muted {
            player.unmute();
            self.state.muted = false;
        }
    }

    pub fn toggle_mute(&mut self) {
        let Some(player) = &self.player else {
            return;
        };
        if self.state.muted {
            player.unmute();
        } else {
            player.mute();
        }
        self.state.muted = !self.state.muted;
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.state.fullscreen = !self.state.fullscreen;
        self.state.fullscreen
    }

    /// Cancel the poll and destroy the player
    pub fn unmount(&mut self) {
        self.stop_poll();
        if let Some(player) = self.player.take() {
            player.destroy();
            info!(video_id = %self.video_id, "Unmounted video player");
        }
        self.state.playing = false;
        self.state.phase = PlayerPhase::Destroyed;
    }
}

impl Drop for VideoTransport {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Video viewer: a transport, or a placeholder for unusable URLs
#[derive(Debug)]
pub enum VideoViewer {
    Player(Box<VideoTransport>),
    Invalid { url: String },
}

impl VideoViewer {
    /// Extract the id from `url` and mount a player for it
    pub async fn mount(
        platform: &dyn VideoPlatform,
        url: &str,
        settings: TransportSettings,
    ) -> Self {
        match extract_video_id(url) {
            Some(video_id) => {
                let transport = VideoTransport::mount(platform, &video_id, settings).await;
                Self::Player(Box::new(transport))
            }
            None => {
                warn!(url, "No video id in URL");
                Self::Invalid {
                    url: url.to_string(),
                }
            }
        }
    }

    pub fn transport(&self) -> Option<&VideoTransport> {
        match self {
            Self::Player(transport) => Some(&**transport),
            Self::Invalid { .. } => None,
        }
    }

    pub fn transport_mut(&mut self) -> Option<&mut VideoTransport> {
        match self {
            Self::Player(transport) => Some(&mut **transport),
            Self::Invalid { .. } => None,
        }
    }

    /// Placeholder text, if no player could be mounted
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Player(_) => None,
            Self::Invalid { .. } => Some(INVALID_VIDEO_MESSAGE),
        }
    }

    /// Error for an unusable URL
    pub fn invalid_url_error(url: &str) -> ViewerError {
        ViewerError::InvalidInput(format!("{}: {}", INVALID_VIDEO_MESSAGE, url))
    }
}
