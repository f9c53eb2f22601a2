pub mod tile_loader;
pub mod web_surface;
