pub mod any_dataset;
pub mod performance;
pub mod sample_size;
