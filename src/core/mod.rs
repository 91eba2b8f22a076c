pub mod diff;
pub mod parser;
pub mod report;
pub mod runner;
pub mod snapshot;
