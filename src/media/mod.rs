pub mod commands;
pub mod global_media_player;
pub mod media_info;
pub mod metadata;
pub mod plugin;
pub mod search;
pub mod settings;
pub mod track_queue;
