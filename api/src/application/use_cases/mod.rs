pub mod installations;
pub mod snippets;
pub mod webhooks;
