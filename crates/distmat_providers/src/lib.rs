pub mod cache;
pub mod google_geocoding_api;
pub mod google_maps_api;
pub mod matrix_grid;
pub mod matrix_service;
pub mod travel_mode;
