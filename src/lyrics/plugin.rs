use serenity::{
    client::{ClientBuilder, Context},
    prelude::TypeMapKey,
};

use std::sync::Arc;

use super::LyricsCatalog;

pub struct LyricsPluginKey;

impl TypeMapKey for LyricsPluginKey {
    type Value = Arc<dyn LyricsCatalog>;
}

pub trait LyricsPluginInit {
    fn register_lyrics_plugin(self, plugin: Arc<dyn LyricsCatalog>) -> Self;
}

impl LyricsPluginInit for ClientBuilder {
    fn register_lyrics_plugin(self, plugin: Arc<dyn LyricsCatalog>) -> Self {
        self.type_map_insert::<LyricsPluginKey>(plugin)
    }
}

pub async fn get_lyrics_plugin(ctx: &Context) -> Option<Arc<dyn LyricsCatalog>> {
    let data = ctx.data.read().await;

    data.get::<LyricsPluginKey>().cloned()
}
