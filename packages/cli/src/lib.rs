// ABOUTME: Support library for the coderunner binary
// ABOUTME: Logging setup and terminal rendering of execution results and sandbox listings

pub mod logging;
pub mod report;
