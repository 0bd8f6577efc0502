// ABOUTME: Shared configuration constants for coderunner crates
// ABOUTME: Re-exports environment variable names and their default values

pub mod constants;

pub use constants::*;
