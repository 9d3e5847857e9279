pub mod classify;
pub mod config;
pub mod controller;
pub mod job;
pub mod listing;
pub mod logging;
pub mod pool;
pub mod resume_db;
pub mod signing;
pub mod storage;
pub mod transfer;
