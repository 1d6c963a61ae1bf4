pub mod install_from_repository;
pub mod list;
pub mod uninstall;
pub mod update_settings;
