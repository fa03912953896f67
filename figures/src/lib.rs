//! Figures for the multimodal-versus-unimodal systematic review: the PRISMA
//! flowchart, the sample-size violin plot and the AUC comparison scatter.

pub mod analysis;
pub mod data_handling;
pub mod helper_functions;
pub mod models;
