pub mod ads;
pub mod api;
pub mod config;
pub mod display;
pub mod runtime;
pub mod sink;
pub mod storage;
