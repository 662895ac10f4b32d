pub mod app;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod graphics;
pub mod input;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod sky;

pub use app::SkyApp;
pub use config::SkyConfig;

use anyhow::Result;

#[derive(thiserror::Error, Debug)]
pub enum SkydomeError {
    #[error("Graphics error: {0}")]
    Graphics(String),
    #[error("Shader '{label}' failed to compile: {message}")]
    ShaderCompile { label: String, message: String },
    #[error("Texture '{key}' could not be decoded: {message}")]
    TextureDecode { key: String, message: String },
    #[error("Asset loading error: {0}")]
    AssetLoading(String),
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Ephemeris error: {0}")]
    Ephemeris(#[from] catalog::ephemeris::EphemerisError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SkydomeResult<T> = Result<T, SkydomeError>;
