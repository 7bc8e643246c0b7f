use std::sync::Arc;

use poise::serenity_prelude as serenity;

use super::global_media_player::GlobalMediaPlayer;

pub struct MediaPlayerKey;

impl serenity::TypeMapKey for MediaPlayerKey {
    type Value = Arc<GlobalMediaPlayer>;
}

pub trait MediaPlayerInit {
    /// Shares one player map between commands and gateway events.
    fn register_media_player(self, media_player: Arc<GlobalMediaPlayer>) -> Self;
}

impl MediaPlayerInit for serenity::ClientBuilder {
    fn register_media_player(self, media_player: Arc<GlobalMediaPlayer>) -> Self {
        self.type_map_insert::<MediaPlayerKey>(media_player)
    }
}

pub async fn get_media_player(ctx: &serenity::Context) -> Option<Arc<GlobalMediaPlayer>> {
    ctx.data.read().await.get::<MediaPlayerKey>().cloned()
}
