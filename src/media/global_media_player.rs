use serenity::async_trait;
use serenity::model::prelude::{ChannelId, GuildId};
use serenity::prelude::Mentionable;
use songbird::input::{Input, Restartable};
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, EventContext, EventHandler, TrackEvent};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::controls::buttons;
use crate::utils::{config, message_context::MessageContext};

use super::media_info::MediaInfo;
use super::settings::{PlayerSettings, Setting};
use super::track_queue::{RepeatMode, TrackEnd, TrackQueue};

type Signaler = Arc<(async_std::sync::Mutex<bool>, async_std::sync::Condvar)>;
type VoiceCall = Arc<serenity::prelude::Mutex<Call>>;

const NOT_CONNECTED: &str = "Not connected to a voice channel!";
const NOTHING_PLAYING: &str = "No music currently playing!";

struct MediaEventHandler {
    signaler: Signaler,
}

impl MediaEventHandler {
    fn new(signaler: Signaler) -> Self {
        MediaEventHandler { signaler }
    }
}

#[derive(Clone)]
pub struct MediaItem {
    pub info: MediaInfo,
    pub message_ctx: MessageContext,
}

pub struct QueuePage {
    pub now_playing: Option<MediaInfo>,
    pub tracks: Vec<MediaInfo>,
    /// Upcoming tracks, not counting the one playing.
    pub total: usize,
}

struct PlayerState {
    running: bool,
    now_playing: Option<(MediaItem, TrackHandle)>,
    /// Taken off the queue, waiting for its yt-dlp source.
    loading: Option<MediaItem>,
    /// How to file the loading track instead of playing it.
    pending_end: Option<TrackEnd>,
    /// Bumped for every track started, used to spot stale buttons.
    serial: u64,
    end: TrackEnd,
    queue: TrackQueue<MediaItem>,
    volume: u8,
    paused: bool,
    manual_pause: bool,
}

/// What asking the current track to stop amounts to.
enum EndRequest<'a> {
    Stop(&'a TrackHandle),
    /// The track is still loading and will be filed without playing.
    Pending,
    Idle,
}

impl PlayerState {
    fn new(history_length: usize, volume: u8) -> Self {
        PlayerState {
            running: true,
            now_playing: None,
            loading: None,
            pending_end: None,
            serial: 0,
            end: TrackEnd::Finished,
            queue: TrackQueue::new(history_length),
            volume,
            paused: false,
            manual_pause: false,
        }
    }

    /// The playing track, or the one about to play.
    fn current_item(&self) -> Option<MediaItem> {
        match &self.now_playing {
            Some((item, _)) => Some(item.clone()),
            None => self.loading.clone(),
        }
    }

    fn request_end(&mut self, end: TrackEnd) -> EndRequest<'_> {
        if self.now_playing.is_none() {
            if self.loading.is_none() {
                return EndRequest::Idle;
            }
            self.pending_end = Some(end);
            return EndRequest::Pending;
        }

        self.end = end;
        match &self.now_playing {
            Some((_, track_handle)) => EndRequest::Stop(track_handle),
            None => EndRequest::Idle,
        }
    }

    /// The current track followed by every upcoming one.
    fn snapshot(&self) -> Vec<MediaItem> {
        self.current_item()
            .into_iter()
            .chain(self.queue.page(0, self.queue.len()))
            .collect()
    }
}

pub struct ChannelMediaPlayer {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    announcements: MessageContext,
    settings: PlayerSettings,
    call: VoiceCall,
    /// Set once the playback loop has exited.
    stopped: AtomicBool,
    lock_protected_state: (async_std::sync::Mutex<PlayerState>, async_std::sync::Condvar),
}

type GuildMediaPlayerMap =
    async_std::sync::Mutex<HashMap<serenity::model::prelude::GuildId, Arc<ChannelMediaPlayer>>>;

type ImportSet = Arc<std::sync::Mutex<HashSet<GuildId>>>;

/// Marks a guild as importing a playlist until dropped.
pub struct ImportGuard {
    guild_id: GuildId,
    imports: ImportSet,
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        if let Ok(mut imports) = self.imports.lock() {
            imports.remove(&self.guild_id);
        }
    }
}

#[derive(Default)]
pub struct GlobalMediaPlayer {
    guild_media_player_map: GuildMediaPlayerMap,
    settings: async_std::sync::Mutex<PlayerSettings>,
    imports: ImportSet,
}

impl GlobalMediaPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, guild_id: GuildId) -> Result<Arc<ChannelMediaPlayer>, String> {
        let guild_map = self.guild_media_player_map.lock().await;

        guild_map
            .get(&guild_id)
            .filter(|media_player| !media_player.is_stopped())
            .cloned()
            .ok_or_else(|| NOT_CONNECTED.to_string())
    }

    pub async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.get(guild_id).await.is_ok()
    }

    pub async fn settings(&self) -> PlayerSettings {
        *self.settings.lock().await
    }

    /// Flips a setting for players started from now on.
    pub async fn toggle_setting(&self, setting: Setting) -> bool {
        self.settings.lock().await.toggle(setting)
    }

    /// `None` while another playlist import runs in this guild.
    pub fn begin_import(&self, guild_id: GuildId) -> Option<ImportGuard> {
        let mut imports = self.imports.lock().ok()?;

        if !imports.insert(guild_id) {
            return None;
        }

        Some(ImportGuard {
            guild_id,
            imports: self.imports.clone(),
        })
    }

    pub fn is_importing(&self, guild_id: GuildId) -> bool {
        self.imports
            .lock()
            .map(|imports| imports.contains(&guild_id))
            .unwrap_or(false)
    }

    pub async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.get(guild_id).await.ok().map(|p| p.voice_channel)
    }

    pub async fn start(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        voice_channel_handler: Arc<serenity::prelude::Mutex<Call>>,
        announcements: MessageContext,
    ) -> Result<(), String> {
        let settings = self.settings().await;
        let mut guild_map = self.guild_media_player_map.lock().await;

        if let Some(media_player) = guild_map.get(&guild_id) {
            if !media_player.is_stopped() {
                return Err(String::from(
                    "Already connected to a voice channel in this server!",
                ));
            }
        }

        info!("[player] starting player for guild {}", guild_id);

        guild_map.insert(
            guild_id,
            ChannelMediaPlayer::create_and_initialize(
                guild_id,
                voice_channel,
                voice_channel_handler,
                announcements,
                settings,
            ),
        );

        Ok(())
    }

    pub async fn quit(&self, guild_id: GuildId) -> Result<(), String> {
        let media_player = self.guild_media_player_map.lock().await.remove(&guild_id);

        match media_player {
            Some(media_player) => {
                media_player.quit().await;
                Ok(())
            }
            None => Err(String::from(NOT_CONNECTED)),
        }
    }

    /// Drops the guild's player once the bot is out of voice. Returns whether
    /// a running player was torn down, meaning someone else removed the bot.
    pub async fn disconnected(&self, guild_id: GuildId) -> bool {
        let media_player = self.guild_media_player_map.lock().await.remove(&guild_id);

        match media_player {
            Some(media_player) if !media_player.is_stopped() => {
                media_player.quit().await;
                media_player
                    .announcements
                    .send_info(
                        "I was manually disconnected from the voice channel, clearing queue... 🗑️",
                    )
                    .await;
                true
            }
            _ => false,
        }
    }

    pub async fn enqueue_next(
        &self,
        guild_id: GuildId,
        info: MediaInfo,
        message_ctx: MessageContext,
    ) -> Result<(), String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                state.queue.push_next(MediaItem { info, message_ctx });
                Ok(())
            })
            .await
    }

    pub async fn enqueue_batch(
        &self,
        guild_id: GuildId,
        infos: Vec<MediaInfo>,
        message_ctx: MessageContext,
    ) -> Result<(), String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                state.queue.extend(infos.into_iter().map(|info| MediaItem {
                    info,
                    message_ctx: message_ctx.clone(),
                }));
                Ok(())
            })
            .await
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<(), String> {
        self.get(guild_id).await?.stop_current(TrackEnd::Skipped).await
    }

    pub async fn back(&self, guild_id: GuildId) -> Result<(), String> {
        self.get(guild_id).await?.back().await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), String> {
        self.get(guild_id).await?.set_paused(true, true).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), String> {
        self.get(guild_id).await?.set_paused(false, true).await
    }

    /// Returns whether the track is now paused.
    pub async fn toggle_pause(&self, guild_id: GuildId) -> Result<bool, String> {
        let media_player = self.get(guild_id).await?;
        let paused = media_player.is_paused().await;

        media_player.set_paused(!paused, true).await?;

        Ok(!paused)
    }

    pub async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<(), String> {
        self.get(guild_id).await?.set_volume(volume).await
    }

    pub async fn seek(&self, guild_id: GuildId, time: i64) -> Result<(), String> {
        self.get(guild_id).await?.seek(time).await
    }

    /// Returns the number of shuffled tracks.
    pub async fn shuffle(&self, guild_id: GuildId) -> Result<usize, String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                if state.queue.is_empty() {
                    return Err("There are no tracks in the queue to shuffle!".to_string());
                }

                state.queue.shuffle();
                Ok(state.queue.len())
            })
            .await
    }

    pub async fn set_repeat_mode(&self, guild_id: GuildId, mode: RepeatMode) -> Result<(), String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                state.queue.repeat_mode = mode;
                Ok(())
            })
            .await
    }

    pub async fn clear(&self, guild_id: GuildId) -> Result<(), String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                if state.queue.is_empty() {
                    return Err("The queue is already empty!".to_string());
                }

                state.queue.clear();
                Ok(())
            })
            .await
    }

    /// Removes the track at a 0-based position of the upcoming queue.
    pub async fn remove(&self, guild_id: GuildId, position: usize) -> Result<MediaInfo, String> {
        let media_player = self.get(guild_id).await?;
        media_player
            .edit(|state| {
                let length = state.queue.len();
                state
                    .queue
                    .remove(position)
                    .map(|item| item.info)
                    .ok_or_else(|| invalid_position(position, length))
            })
            .await
    }

    /// Plays the track at a 0-based position of the upcoming queue right away.
    pub async fn jump(&self, guild_id: GuildId, position: usize) -> Result<MediaInfo, String> {
        self.get(guild_id).await?.jump(position).await
    }

    /// The current track and the upcoming ones, in play order.
    pub async fn snapshot(&self, guild_id: GuildId) -> Result<Vec<MediaInfo>, String> {
        let media_player = self.get(guild_id).await?;
        let state = media_player.lock_protected_state.0.lock().await;

        Ok(state.snapshot().into_iter().map(|item| item.info).collect())
    }

    /// Reads `length` upcoming tracks from `start`.
    pub async fn read_queue(
        &self,
        guild_id: GuildId,
        start: usize,
        length: usize,
    ) -> Result<QueuePage, String> {
        let media_player = self.get(guild_id).await?;
        let state = media_player.lock_protected_state.0.lock().await;

        Ok(QueuePage {
            now_playing: state.now_playing.as_ref().map(|(item, _)| item.info.clone()),
            tracks: state
                .queue
                .page(start, length)
                .into_iter()
                .map(|item| item.info)
                .collect(),
            total: state.queue.len(),
        })
    }

    /// The playing track and its position in seconds.
    pub async fn now_playing(&self, guild_id: GuildId) -> Result<Option<(MediaInfo, i64)>, String> {
        self.get(guild_id).await?.now_playing().await
    }

    /// Whether the track with this serial is still the one playing.
    pub async fn is_current(&self, guild_id: GuildId, serial: u64) -> bool {
        match self.get(guild_id).await {
            Ok(media_player) => {
                let state = media_player.lock_protected_state.0.lock().await;
                state.now_playing.is_some() && state.serial == serial
            }
            Err(_) => false,
        }
    }

    /// Pauses when the voice channel empties out and resumes when someone
    /// comes back, unless a user paused the track. Leaves instead of pausing
    /// when the player was started with `leave_on_empty`.
    pub async fn listeners_changed(&self, guild_id: GuildId, listeners: usize) -> Result<(), String> {
        let media_player = self.get(guild_id).await?;

        if listeners == 0 && media_player.settings.leave_on_empty {
            self.guild_media_player_map.lock().await.remove(&guild_id);

            media_player
                .announcements
                .send_info(format!(
                    "Nobody is in voice channel {}, leaving the voice channel... ❌",
                    media_player.voice_channel.mention()
                ))
                .await;
            media_player.quit().await;
            media_player.hang_up().await;

            return Ok(());
        }

        media_player.listeners_changed(listeners).await
    }
}

fn invalid_position(position: usize, length: usize) -> String {
    format!(
        "Position {} is not in the queue. The queue contains {} track(s).",
        position + 1,
        length
    )
}

#[async_trait]
impl EventHandler for MediaEventHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let (mutex, condvar) = &*self.signaler;

        let mut guard = mutex.lock().await;
        *guard = true;
        condvar.notify_one();

        None
    }
}

impl ChannelMediaPlayer {
    fn create_and_initialize(
        guild_id: GuildId,
        voice_channel: ChannelId,
        voice_channel_handler: VoiceCall,
        announcements: MessageContext,
        settings: PlayerSettings,
    ) -> Arc<Self> {
        let media_player = Arc::new(ChannelMediaPlayer {
            guild_id,
            voice_channel,
            announcements,
            settings,
            call: voice_channel_handler.clone(),
            stopped: AtomicBool::new(false),
            lock_protected_state: (
                async_std::sync::Mutex::new(PlayerState::new(
                    config::player::history_length(guild_id),
                    config::player::default_volume(guild_id),
                )),
                async_std::sync::Condvar::new(),
            ),
        });

        tokio::spawn(Self::media_player_run(
            voice_channel_handler,
            media_player.clone(),
        ));

        media_player
    }

    /// Runs `f` on the state and wakes the playback loop.
    async fn edit<T, F>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&mut PlayerState) -> Result<T, String>,
    {
        let (state_lock, state_condvar) = &self.lock_protected_state;
        let mut guard = state_lock.lock().await;

        let result = f(&mut *guard);
        state_condvar.notify_one();

        result
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn is_paused(&self) -> bool {
        self.lock_protected_state.0.lock().await.paused
    }

    async fn stop_current(&self, end: TrackEnd) -> Result<(), String> {
        let mut guard = self.lock_protected_state.0.lock().await;

        match guard.request_end(end) {
            EndRequest::Stop(track_handle) => track_handle.stop().map_err(|err| {
                error!("Error skipping track: {:?}", err);
                "Unable to skip the track".to_string()
            }),
            EndRequest::Pending => Ok(()),
            EndRequest::Idle => Err(NOTHING_PLAYING.to_string()),
        }
    }

    async fn back(&self) -> Result<(), String> {
        let (state_lock, state_condvar) = &self.lock_protected_state;
        let mut guard = state_lock.lock().await;

        let current = guard.current_item();
        guard.queue.back(current)?;

        match guard.request_end(TrackEnd::Rewound) {
            EndRequest::Stop(track_handle) => {
                if let Err(err) = track_handle.stop() {
                    error!("Error rewinding track: {:?}", err);
                }
            }
            EndRequest::Pending => {}
            EndRequest::Idle => state_condvar.notify_one(),
        }

        Ok(())
    }

    async fn jump(&self, position: usize) -> Result<MediaInfo, String> {
        let (state_lock, state_condvar) = &self.lock_protected_state;
        let mut guard = state_lock.lock().await;

        let length = guard.queue.len();
        let info = match guard.queue.jump(position) {
            Some(item) => item.info.clone(),
            None => return Err(invalid_position(position, length)),
        };

        match guard.request_end(TrackEnd::Skipped) {
            EndRequest::Stop(track_handle) => {
                if let Err(err) = track_handle.stop() {
                    error!("Error jumping track: {:?}", err);
                }
            }
            EndRequest::Pending => {}
            EndRequest::Idle => state_condvar.notify_one(),
        }

        Ok(info)
    }

    async fn set_paused(&self, paused: bool, manual: bool) -> Result<(), String> {
        let mut guard = self.lock_protected_state.0.lock().await;
        let state = &mut *guard;

        let track_handle = match &state.now_playing {
            Some((_, track_handle)) => track_handle,
            None => return Err(NOTHING_PLAYING.to_string()),
        };

        if state.paused == paused {
            return Err(if paused {
                "The music is already paused!".to_string()
            } else {
                "The music is already playing!".to_string()
            });
        }

        let result = if paused {
            track_handle.pause()
        } else {
            track_handle.play()
        };

        match result {
            Ok(_) => {
                state.paused = paused;
                state.manual_pause = paused && manual;
                Ok(())
            }
            Err(err) => {
                error!("Error changing pause state: {:?}", err);
                Err("Unable to change the pause state".to_string())
            }
        }
    }

    async fn set_volume(&self, volume: u8) -> Result<(), String> {
        let mut guard = self.lock_protected_state.0.lock().await;
        let state = &mut *guard;

        if state.volume == volume {
            return Err(format!("Volume is already set to {}!", volume));
        }

        if let Some((_, track_handle)) = &state.now_playing {
            if let Err(err) = track_handle.set_volume(volume as f32 / 100.0) {
                error!("Error setting volume: {:?}", err);
                return Err("Failed to set volume".to_string());
            }
        }

        state.volume = volume;

        Ok(())
    }

    async fn seek(&self, time: i64) -> Result<(), String> {
        let state = self.lock_protected_state.0.lock().await;

        match &state.now_playing {
            Some((media_item, track_handle)) => {
                if time < media_item.info.duration {
                    match track_handle.seek_time(Duration::from_secs(time as u64)) {
                        Ok(_) => Ok(()),
                        Err(err) => Err(format!("Unable to seek track: {:?}", err)),
                    }
                } else {
                    Err("Unable to seek track: time out of range".to_string())
                }
            }
            None => Err(String::from("Cannot seek, not playing a song.")),
        }
    }

    async fn now_playing(&self) -> Result<Option<(MediaInfo, i64)>, String> {
        let state = self.lock_protected_state.0.lock().await;

        match &state.now_playing {
            Some((media_item, track_handle)) => match track_handle.get_info().await {
                Ok(trackstate) => {
                    let position = trackstate.position.as_secs() as i64;
                    Ok(Some((media_item.info.clone(), position)))
                }
                Err(trackerror) => Err(format!(
                    "Unable to get current song info from Track: {}",
                    trackerror
                )),
            },
            None => Ok(None),
        }
    }

    async fn listeners_changed(&self, listeners: usize) -> Result<(), String> {
        let (playing, paused, manual_pause) = {
            let state = self.lock_protected_state.0.lock().await;
            (state.now_playing.is_some(), state.paused, state.manual_pause)
        };

        if !playing || manual_pause {
            return Ok(());
        }

        if listeners == 0 && !paused {
            self.set_paused(true, false).await?;
            self.announcements
                .send_info(format!(
                    "Nobody is in voice channel {}, pausing the music... ❌",
                    self.voice_channel.mention()
                ))
                .await;
        } else if listeners > 0 && paused {
            self.set_paused(false, false).await?;
            self.announcements
                .send_info("Continuing the music ✅")
                .await;
        }

        Ok(())
    }

    async fn quit(&self) {
        let (state_lock, state_condvar) = &self.lock_protected_state;
        let mut guard = state_lock.lock().await;
        let state = &mut *guard;

        state.running = false;
        state.queue.clear();

        if let Some((_, track_handle)) = &state.now_playing {
            state.end = TrackEnd::Skipped;
            if let Err(e) = track_handle.stop() {
                error!("unable to stop track to quit media player, {:?}", e);
            }
        }

        state_condvar.notify_one();
    }

    async fn hang_up(&self) {
        if let Err(err) = self.call.lock().await.leave().await {
            warn!("Unable to leave voice in guild {}: {:?}", self.guild_id, err);
        }
    }

    /// Forgets the loading track after its source failed.
    async fn abandon_loading(&self) {
        let mut state = self.lock_protected_state.0.lock().await;
        state.loading = None;
        state.pending_end = None;
    }

    async fn announce(&self, item: &MediaItem, serial: u64) {
        let description = format!(
            "Started playing **{}** in {} 🎧",
            item.info.title,
            self.voice_channel.mention()
        );

        item.message_ctx
            .send_message(|m| {
                m.content("")
                    .embed(|e| {
                        e.description(&description)
                            .color(config::colors::track_start());
                        MessageContext::format_embed_links(e, &item.info)
                    })
                    .components(|c| buttons::create_control_buttons(c, serial))
            })
            .await;
    }

    async fn media_player_run(
        voice_channel_handler: VoiceCall,
        shared_channel_media_player: Arc<ChannelMediaPlayer>,
    ) {
        let guild_id = shared_channel_media_player.guild_id;
        let settings = shared_channel_media_player.settings;
        let (state_lock, state_condvar) = &shared_channel_media_player.lock_protected_state;
        let mut leave_voice = false;

        'medialoop: loop {
            let end_signaler: Signaler = Arc::new((
                async_std::sync::Mutex::new(false),
                async_std::sync::Condvar::new(),
            ));

            // wait for the queue to not be empty
            let next_song = {
                let mut state = state_lock.lock().await;
                while state.running && state.queue.is_empty() {
                    state = state_condvar.wait(state).await;
                }

                if !state.running {
                    break 'medialoop;
                }

                match state.queue.pop_next() {
                    Some(next_song) => {
                        state.loading = Some(next_song.clone());
                        state.pending_end = None;
                        next_song
                    }
                    None => continue 'medialoop,
                }
            };

            let message_ctx = next_song.message_ctx.clone();
            let source = match Restartable::ytdl(next_song.info.url.clone(), false).await {
                Ok(source) => source,
                Err(why) => {
                    error!("Error creating source: {:?}", why);
                    shared_channel_media_player.abandon_loading().await;

                    message_ctx
                        .send_error("Error playing track: yt-dlp or ffmpeg failed")
                        .await;

                    continue 'medialoop;
                }
            };
            let (track, track_handle) = songbird::create_player(Input::from(source));

            for track_event in [TrackEvent::End, TrackEvent::Error] {
                if let Err(err) = track_handle.add_event(
                    Event::Track(track_event),
                    MediaEventHandler::new(end_signaler.clone()),
                ) {
                    error!("Error on track_handle.add_event {:?}", err);
                    shared_channel_media_player.abandon_loading().await;

                    message_ctx
                        .send_error("Error playing track: Unable to initialize TrackEvent handler.")
                        .await;

                    continue 'medialoop;
                }
            }

            let (serial, announce) = {
                let mut guard = state_lock.lock().await;
                let state = &mut *guard;

                state.loading = None;

                if !state.running {
                    break 'medialoop;
                }

                // skipped, rewound or jumped over while loading
                if let Some(end) = state.pending_end.take() {
                    debug!(
                        "[player] dropping {} in guild {} before it started",
                        next_song.info.title, guild_id
                    );
                    state.queue.finish(next_song, end);
                    continue 'medialoop;
                }

                if let Err(err) = track_handle.set_volume(state.volume as f32 / 100.0) {
                    warn!("Unable to set volume: {:?}", err);
                }

                state.serial += 1;
                state.end = TrackEnd::Finished;
                state.paused = false;
                state.manual_pause = false;
                state.now_playing = Some((next_song.clone(), track_handle.clone()));

                info!("[player] playing {} in guild {}", next_song.info.title, guild_id);

                voice_channel_handler.lock().await.play(track);

                (
                    state.serial,
                    state.queue.repeat_mode == RepeatMode::Off || settings.announce_repeats,
                )
            };

            if announce {
                shared_channel_media_player
                    .announce(&next_song, serial)
                    .await;
            }

            // wait for song to finish
            {
                let (end_mutex, end_condvar) = &*end_signaler;
                let mut end_guard = end_mutex.lock().await;
                while !*end_guard {
                    end_guard = end_condvar.wait(end_guard).await;
                }
            }

            let queue_finished = {
                let mut guard = state_lock.lock().await;
                let state = &mut *guard;

                let end = state.end;
                let finished = state.now_playing.take();
                if let Some((item, _)) = finished {
                    state.queue.finish(item, end);
                }

                if !state.running {
                    break 'medialoop;
                }

                let queue_finished = state.queue.is_empty();
                if queue_finished && settings.leave_on_end {
                    state.running = false;
                    leave_voice = true;
                }

                queue_finished
            };

            if queue_finished {
                message_ctx
                    .send_info("I finished reading the whole queue ✅")
                    .await;
            }

            if leave_voice {
                break 'medialoop;
            }
        }

        {
            let mut state = state_lock.lock().await;
            state.now_playing = None;
            state.loading = None;
        }

        shared_channel_media_player
            .stopped
            .store(true, Ordering::Release);

        if leave_voice {
            info!("[player] queue ended, leaving voice in guild {}", guild_id);
            shared_channel_media_player.hang_up().await;
        }

        info!("[player] player for guild {} stopped", guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::http::Http;

    fn item(title: &str) -> MediaItem {
        MediaItem {
            info: MediaInfo {
                title: title.to_string(),
                ..Default::default()
            },
            message_ctx: MessageContext {
                channel: ChannelId(1),
                http: Arc::new(Http::new("")),
            },
        }
    }

    fn titles(items: &[MediaItem]) -> Vec<&str> {
        items.iter().map(|item| item.info.title.as_str()).collect()
    }

    mod request_end {
        use super::*;

        #[test]
        fn idle_without_track() {
            let mut state = PlayerState::new(10, 50);

            assert!(matches!(state.request_end(TrackEnd::Skipped), EndRequest::Idle));
            assert_eq!(state.pending_end, None);
        }

        #[test]
        fn pending_while_loading() {
            let mut state = PlayerState::new(10, 50);
            state.loading = Some(item("a"));

            assert!(matches!(state.request_end(TrackEnd::Skipped), EndRequest::Pending));
            assert_eq!(state.pending_end, Some(TrackEnd::Skipped));
            assert_eq!(state.end, TrackEnd::Finished);
        }

        #[test]
        fn loading_track_is_filed_once_dropped() {
            let mut state = PlayerState::new(10, 50);
            state.queue.push(item("a"));
            state.queue.push(item("b"));

            let loading = state.queue.pop_next().map(|next| {
                state.loading = Some(next.clone());
                next
            });
            state.request_end(TrackEnd::Skipped);

            if let (Some(next), Some(end)) = (loading, state.pending_end.take()) {
                state.queue.finish(next, end);
            }
            state.loading = None;

            assert_eq!(titles(&state.snapshot()), vec!["b"]);
            assert_eq!(state.queue.back(None), Ok(()));
            assert_eq!(titles(&state.snapshot()), vec!["a", "b"]);
        }
    }

    #[test]
    fn snapshot_starts_with_current_track() {
        let mut state = PlayerState::new(10, 50);
        assert!(state.snapshot().is_empty());

        state.queue.extend([item("b"), item("c")]);
        state.loading = Some(item("a"));

        assert_eq!(titles(&state.snapshot()), vec!["a", "b", "c"]);
        assert_eq!(state.queue.len(), 2);
    }

    mod imports {
        use super::*;

        #[test]
        fn one_import_per_guild() {
            let player = GlobalMediaPlayer::new();

            let guard = player.begin_import(GuildId(1));
            assert!(guard.is_some());
            assert!(player.is_importing(GuildId(1)));
            assert!(player.begin_import(GuildId(1)).is_none());
            assert!(player.begin_import(GuildId(2)).is_some());

            drop(guard);
            assert!(!player.is_importing(GuildId(1)));
            assert!(player.begin_import(GuildId(1)).is_some());
        }
    }

    #[tokio::test]
    async fn settings_toggle_for_next_player() {
        let player = GlobalMediaPlayer::new();

        assert!(player.toggle_setting(Setting::LeaveOnEnd).await);
        assert!(!player.toggle_setting(Setting::SelfDeaf).await);

        let settings = player.settings().await;
        assert!(settings.leave_on_end);
        assert!(!settings.self_deaf);
        assert!(!settings.leave_on_empty);
    }

    #[tokio::test]
    async fn no_player_in_guild() {
        let player = GlobalMediaPlayer::new();

        assert!(!player.is_connected(GuildId(1)).await);
        assert!(!player.disconnected(GuildId(1)).await);
        assert_eq!(player.skip(GuildId(1)).await, Err(NOT_CONNECTED.to_string()));
        assert_eq!(player.snapshot(GuildId(1)).await, Err(NOT_CONNECTED.to_string()));
        assert_eq!(
            player.listeners_changed(GuildId(1), 0).await,
            Err(NOT_CONNECTED.to_string())
        );
    }
}
