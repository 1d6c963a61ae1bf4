pub mod dto;
pub mod errors;
pub mod ports;
pub mod registry;
pub mod repository;
pub mod snippets;
pub mod use_cases;
pub mod webhook_auth;
