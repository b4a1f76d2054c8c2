use async_trait::async_trait;
use prerender_kit_core::Params;
use std::future::Future;

/// What a route loader produced for one render
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderOutput {
    /// Data handed to the route's view and embedded for hydration
    Data(serde_json::Value),
    /// Send the visitor elsewhere instead of rendering the page
    Redirect(String),
}

/// Async data source attached to a route node.
///
/// Every loader on the matched chain runs before any view renders.
/// Returning an error fails the render of the whole page.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, params: &Params) -> anyhow::Result<LoaderOutput>;
}

/// Adapts an async closure into a [`Loader`]
pub struct FnLoader<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<LoaderOutput>> + Send,
{
    async fn load(&self, params: &Params) -> anyhow::Result<LoaderOutput> {
        (self.0)(params.clone()).await
    }
}
