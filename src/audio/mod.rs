pub mod loader;
pub mod playback;
