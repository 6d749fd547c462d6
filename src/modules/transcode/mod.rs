pub mod encoder;
pub mod events;
pub mod ladder;
pub mod manifest;
pub mod processor;
pub mod uploader;
pub mod workspace;
