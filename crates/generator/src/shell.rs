// The HTML document wrapped around every rendered page.

use leptos::prelude::*;
use prerender_kit_core::config::SiteConfig;
use prerender_kit_core::{Error, Result};

pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// `id` of the script element carrying loader data for hydration
pub const DATA_SCRIPT_ID: &str = "__prerender_data";

const LIVE_RELOAD_SCRIPT: &str = "new EventSource('/_reload').onmessage = () => location.reload();";

#[derive(Debug, Clone)]
pub struct Shell {
    site: SiteConfig,
    live_reload: bool,
}

impl Shell {
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site,
            live_reload: false,
        }
    }

    /// Add the preview server's reload listener to every page
    pub fn with_live_reload(mut self, enabled: bool) -> Self {
        self.live_reload = enabled;
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Page title: `"{page} | {site}"` when the page supplies one
    pub fn title(&self, page_title: Option<&str>) -> String {
        match page_title {
            Some(page) if !page.is_empty() && page != self.site.title => {
                format!("{} | {}", page, self.site.title)
            }
            _ => self.site.title.clone(),
        }
    }

    /// Wrap a rendered app in the full document.
    ///
    /// `hydration_data` is embedded as inert JSON next to the mount point so
    /// the client entry can pick it up without refetching.
    pub fn document(
        &self,
        app: AnyView,
        page_title: Option<&str>,
        hydration_data: &serde_json::Value,
    ) -> Result<AnyView> {
        let data = script_safe_json(hydration_data)?;
        let title = self.title(page_title);
        let lang = self.site.lang.clone();
        let description = self.site.description.clone();
        let mount_id = self.site.mount_id.clone();
        let entry = self.site.entry_client.clone();
        let live_reload = self.live_reload;

        Ok(view! {
            <html lang=lang>
                <head>
                    <meta charset="utf-8"/>
                    <meta name="viewport" content="width=device-width, initial-scale=1"/>
                    <title>{title}</title>
                    {description.map(|d| view! { <meta name="description" content=d/> })}
                </head>
                <body>
                    <div id=mount_id>{app}</div>
                    <script type="application/json" id=DATA_SCRIPT_ID inner_html=data></script>
                    <script type="module" src=entry></script>
                    {live_reload.then(|| view! { <script inner_html=LIVE_RELOAD_SCRIPT></script> })}
                </body>
            </html>
        }
        .into_any())
    }

    /// Minimal page that forwards the browser to `location`
    pub fn redirect(&self, location: &str) -> AnyView {
        let lang = self.site.lang.clone();
        let refresh = format!("0; url={}", location);
        let canonical = location.to_string();
        let href = location.to_string();
        let text = location.to_string();

        view! {
            <html lang=lang>
                <head>
                    <meta charset="utf-8"/>
                    <meta http-equiv="refresh" content=refresh/>
                    <link rel="canonical" href=canonical/>
                    <title>"Redirecting"</title>
                </head>
                <body>
                    <a href=href>"Redirecting to " {text}</a>
                </body>
            </html>
        }
        .into_any()
    }
}

/// Serialize JSON so it cannot terminate the surrounding `<script>`
fn script_safe_json(value: &serde_json::Value) -> Result<String> {
    let json = serde_json::to_string(value).map_err(|e| Error::Serialize(e.to_string()))?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}
