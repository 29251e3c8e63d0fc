//! Playlist rendering and retention: the pure renderer (C3) and the three
//! live playlist retention strategies (C6) that feed it.

pub mod manager;
pub mod render;
