pub mod accumulate;
pub mod authors;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod history;
pub mod identity;
pub mod lang;
pub mod merge;
pub mod model;
pub mod ownership;
pub mod rollup;
pub mod runner;
pub mod store;
pub mod subsystems;
pub mod summary;
pub mod timeline;
pub mod year;
