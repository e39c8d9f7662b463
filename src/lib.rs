pub mod config;
pub mod format;
pub mod imdb;
pub mod lookup;
pub mod mdl;
pub mod tg;
