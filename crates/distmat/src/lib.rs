pub mod distance_result;
pub mod error;
pub mod loader;
pub mod matrix_builder;
pub mod municipality;
pub mod pairs;
pub mod result_writer;

