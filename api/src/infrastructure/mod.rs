pub mod db;
pub mod github;
pub mod packages;
pub mod storage;
