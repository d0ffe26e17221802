pub mod assets;
pub mod download;
pub mod health;
pub mod upload;
