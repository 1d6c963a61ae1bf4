// Module layout (Clean Architecture style)
// - bootstrap: configuration and startup
// - infrastructure: option stores, GitHub and filesystem adapters
// - presentation: HTTP handlers and routing
// - application: ports, use cases and the installation registry
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

#[cfg(test)]
pub mod test_support;
