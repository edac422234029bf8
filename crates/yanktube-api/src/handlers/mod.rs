pub mod download;
pub mod metadata;
mod relay;
