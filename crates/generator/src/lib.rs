// Static pre-rendering of a client-routed app with Leptos SSR.
// A RouteTree is flattened into output targets, and a PageRenderer turns
// each target's route path into a complete HTML document that the client
// bundle hydrates.

pub mod loader;
pub mod markdown;
pub mod render;
pub mod routes;
pub mod shell;
pub mod site;

pub use loader::{FnLoader, Loader, LoaderOutput};
pub use render::PageRenderer;
pub use routes::{RouteContext, RouteMatch, RouteNode, RouteTree};
pub use shell::Shell;
