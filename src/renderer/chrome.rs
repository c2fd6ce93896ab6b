//! Headless Chrome renderer.

use super::scripts;
use super::{ImageElement, RenderError, Renderer};
use crate::config::RendererConfig;
use crate::types::CompiledAttributes;
use headless_chrome::browser::tab::Tab;
use headless_chrome::types::Bounds;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Extra time the browser connection is kept alive beyond the script timeout.
const CONNECTION_GRACE: Duration = Duration::from_secs(30);

/// Reply envelope produced by [`scripts::envelope`].
#[derive(Debug, Deserialize)]
struct ScriptReply {
    #[serde(default)]
    ok: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timed_out: bool,
}

#[derive(Debug, Deserialize)]
struct ApplyReply {
    #[serde(default)]
    missing: Vec<String>,
    #[serde(default)]
    markup: Option<String>,
}

/// Renderer backed by one headless Chrome process and one tab.
pub struct ChromeRenderer {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    script_timeout: Duration,
}

impl ChromeRenderer {
    /// Launch Chrome with a single tab.
    pub fn launch(config: &RendererConfig) -> Result<Self, RenderError> {
        let script_timeout = config.script_timeout();
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1280, config.probe_height)))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(script_timeout + CONNECTION_GRACE)
            .args(vec![
                OsStr::new("--force-device-scale-factor=1"),
                OsStr::new("--allow-file-access-from-files"),
            ])
            .build()
            .map_err(|e| RenderError::Launch(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| RenderError::Launch(format!("failed to start Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| RenderError::Launch(format!("failed to open tab: {e}")))?;
        tab.set_default_timeout(script_timeout + CONNECTION_GRACE);
        info!("Chrome launched");

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
            script_timeout,
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>, RenderError> {
        self.tab
            .as_ref()
            .ok_or_else(|| RenderError::Script("renderer already closed".into()))
    }

    /// Run a script body inside the timeout envelope and decode its value.
    fn run<T: DeserializeOwned>(&self, body: &str) -> Result<T, RenderError> {
        let script = scripts::envelope(body, self.script_timeout);
        let remote = self
            .tab()?
            .evaluate(&script, true)
            .map_err(|e| evaluate_error(e, self.script_timeout))?;

        let raw = remote
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| RenderError::Script("script returned no value".into()))?;
        let reply: ScriptReply = serde_json::from_str(raw)
            .map_err(|e| RenderError::Script(format!("malformed script reply: {e}")))?;

        if reply.timed_out {
            return Err(RenderError::Timeout(self.script_timeout));
        }
        if let Some(error) = reply.error {
            return Err(RenderError::Script(error));
        }
        serde_json::from_value(reply.ok.unwrap_or(serde_json::Value::Null))
            .map_err(|e| RenderError::Script(format!("unexpected script result: {e}")))
    }
}

impl Renderer for ChromeRenderer {
    fn load(&mut self, document: &Path) -> Result<(), RenderError> {
        let load_error = |reason: String| RenderError::Load {
            path: document.to_path_buf(),
            reason,
        };
        let absolute = document
            .canonicalize()
            .map_err(|e| load_error(e.to_string()))?;
        let url = format!("file://{}", absolute.display());

        let tab = self.tab()?;
        tab.navigate_to(&url)
            .map_err(|e| load_error(e.to_string()))?
            .wait_until_navigated()
            .map_err(|e| load_error(e.to_string()))?;
        debug!("navigated to {url}");
        Ok(())
    }

    fn await_ready(&mut self) -> Result<(), RenderError> {
        let state: String = self.run(scripts::AWAIT_READY)?;
        debug!("document readyState={state}");
        Ok(())
    }

    fn resize_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.tab()?
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(width as f64),
                height: Some(height as f64),
            })
            .map_err(|e| RenderError::Script(format!("failed to resize viewport: {e}")))?;
        Ok(())
    }

    fn image_elements(&mut self) -> Result<Vec<ImageElement>, RenderError> {
        self.run(scripts::IMAGE_ELEMENTS)
    }

    fn measure(&mut self) -> Result<BTreeMap<String, String>, RenderError> {
        self.run(scripts::MEASURE)
    }

    fn apply_attributes(&mut self, compiled: &CompiledAttributes) -> Result<String, RenderError> {
        let json = serde_json::to_string(compiled)
            .map_err(|e| RenderError::Script(format!("failed to encode attributes: {e}")))?;
        let reply: ApplyReply = self.run(&scripts::apply(&json))?;
        if let Some(id) = reply.missing.into_iter().next() {
            return Err(RenderError::MissingAttributes(id));
        }
        reply
            .markup
            .ok_or_else(|| RenderError::Script("no markup returned".into()))
    }

    fn close(&mut self) {
        if let Some(tab) = self.tab.take() {
            tab.close(false).ok();
        }
        // Dropping the Browser terminates the Chrome process
        if self.browser.take().is_some() {
            info!("Chrome closed");
        }
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a failed `Runtime.evaluate` call. The call itself timing out means a
/// page script blocked the envelope's own timer, which is still a timeout.
fn evaluate_error(err: anyhow::Error, script_timeout: Duration) -> RenderError {
    if err.is::<Timeout>() {
        RenderError::Timeout(script_timeout)
    } else {
        RenderError::Script(err.to_string())
    }
}
