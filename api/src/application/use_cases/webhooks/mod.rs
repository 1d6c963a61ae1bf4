pub mod handle_webhook;
