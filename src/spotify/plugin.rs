use serenity::{
    client::{ClientBuilder, Context},
    prelude::TypeMapKey,
};

use std::sync::Arc;

use super::SpotifyClient;

pub struct SpotifyPluginKey;

impl TypeMapKey for SpotifyPluginKey {
    type Value = Arc<SpotifyClient>;
}

pub trait SpotifyPluginInit {
    /// Playlists stay disabled when no client is given.
    fn register_spotify_plugin(self, client: Option<Arc<SpotifyClient>>) -> Self;
}

impl SpotifyPluginInit for ClientBuilder {
    fn register_spotify_plugin(self, client: Option<Arc<SpotifyClient>>) -> Self {
        match client {
            Some(client) => self.type_map_insert::<SpotifyPluginKey>(client),
            None => self,
        }
    }
}

pub async fn get_spotify_plugin(ctx: &Context) -> Option<Arc<SpotifyClient>> {
    ctx.data.read().await.get::<SpotifyPluginKey>().cloned()
}
