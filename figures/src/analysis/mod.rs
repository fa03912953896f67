pub mod export;
pub mod performance_plot;
pub mod prisma;
pub mod sample_size_plot;
pub mod statistics;
