// Library interface for newscast modules
// This allows tests and other binaries to import modules

pub mod audio;
pub mod ingestion;
pub mod llm;
pub mod processing;
pub mod server;
pub mod voice;
