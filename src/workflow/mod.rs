pub mod changelog;
pub mod synthesize;
