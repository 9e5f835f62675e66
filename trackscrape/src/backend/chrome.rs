use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrome_browser::{ChromeBrowser, ChromeBrowserTab, ChromeLaunchOptions};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::guard::{CloseGuard, Shutdown};
use crate::engine::page::{Activation, ActivationPath, NodePath, Page, PageError, PageSource};

/// Launch settings for the headless browser.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub proxy: Option<String>,
    /// Upper bound for every single page operation.
    pub op_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            op_timeout: Duration::from_secs(10),
        }
    }
}

/**
    Create a browser instance from config.
*/
pub async fn create_browser(config: &BrowserConfig) -> Result<ChromeBrowser> {
    let mut options = ChromeLaunchOptions::default()
        .headless(config.headless)
        .devtools(false)
        .enable_gpu(config.headless);

    if let Some(ref proxy) = config.proxy {
        options = options.proxy_server(proxy);
    }

    ChromeBrowser::new(options).await
}

/// Launches one browser per acquired page.
#[derive(Debug, Clone, Default)]
pub struct ChromeSource {
    config: BrowserConfig,
}

impl ChromeSource {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

impl PageSource for ChromeSource {
    type Page = ChromePage;

    fn acquire(&self, url: &str) -> impl Future<Output = Result<ChromePage, PageError>> + Send {
        let config = self.config.clone();
        let url = url.to_string();

        async move {
            info!(url = %url, headless = config.headless, "launching browser");
            let mut guard = CloseGuard::new(config.op_timeout);
            let browser = guard.hold(create_browser(&config).await.map_err(browser_error)?);

            let Some(tab) = browser.get_tab(0).await else {
                guard.close().await;
                return Err(PageError::Browser("No browser tab available".to_string()));
            };

            if let Err(e) = tab.navigate(&url).await {
                guard.close().await;
                return Err(browser_error(e));
            }
            debug!(url = %url, "page navigated");

            Ok(ChromePage {
                tab,
                browser: Mutex::new(guard),
                released: AtomicBool::new(false),
                op_timeout: config.op_timeout,
            })
        }
    }
}

impl Shutdown for ChromeBrowser {
    async fn shutdown(self) {
        let _ = self.close().await;
    }
}

fn browser_error(e: anyhow::Error) -> PageError {
    PageError::Browser(format!("{e:#}"))
}

/**
    A page rendered in a dedicated headless browser.

    Node paths are resolved inside the page on every call, so a handle stays
    usable across re-renders as long as the structure above it is unchanged.
    Every script evaluation is bounded by `op_timeout`, and so is each step
    of closing the browser.
*/
pub struct ChromePage {
    tab: ChromeBrowserTab,
    browser: Mutex<CloseGuard<ChromeBrowser>>,
    released: AtomicBool,
    op_timeout: Duration,
}

// ── In-page scripts ─────────────────────────────────────────────────────────
//
// Each script answers with one envelope: `{ ok: value }`, `{ invalid: true }`
// for an unparsable selector, `{ detached: true }` when the node path no
// longer resolves, or `{ error: message }`.

const RESOLVE_FN: &str = r#"
    const resolvePath = (steps) => {
        let node = document;
        for (const [selector, index] of steps) {
            const next = node.querySelectorAll(selector)[index];
            if (!next) return null;
            node = next;
        }
        return node;
    };"#;

fn path_script(path: Option<&NodePath>, body: &str) -> String {
    let steps: Vec<Value> = path
        .map(|p| {
            p.steps()
                .iter()
                .map(|s| json!([s.selector, s.index]))
                .collect()
        })
        .unwrap_or_default();
    let steps = Value::Array(steps);

    format!(
        r#"(() => {{
    {RESOLVE_FN}
    try {{
        const node = resolvePath({steps});
        if (!node) return {{ detached: true }};
        {body}
    }} catch (e) {{
        if (e && e.name === 'SyntaxError') return {{ invalid: true }};
        return {{ error: String(e) }};
    }}
}})()"#
    )
}

fn query_script(scope: Option<&NodePath>, selector: &str) -> String {
    let selector = Value::from(selector);
    path_script(
        scope,
        &format!("return {{ ok: node.querySelectorAll({selector}).length }};"),
    )
}

fn text_script(node: &NodePath) -> String {
    path_script(
        Some(node),
        "return { ok: (node.innerText ?? node.textContent ?? '').trim() };",
    )
}

fn attribute_script(node: &NodePath, name: &str) -> String {
    let name = Value::from(name);
    path_script(Some(node), &format!("return {{ ok: node.getAttribute({name}) }};"))
}

fn click_script(selector: &str) -> String {
    let selector = Value::from(selector);
    path_script(
        None,
        &format!(
            "const el = document.querySelector({selector});
        if (!el) return {{ ok: false }};
        el.click();
        return {{ ok: true }};"
        ),
    )
}

/// Scrolls in viewport steps, capped, then back to the top.
const SCROLL_SCRIPT: &str = r#"(async () => {
    const pause = () => new Promise(r => setTimeout(r, 150));
    const step = Math.max(window.innerHeight, 200);
    for (let i = 0, y = 0; i < 40 && y < document.body.scrollHeight; i++, y += step) {
        window.scrollTo(0, y);
        await pause();
    }
    window.scrollTo(0, 0);
    return { ok: true };
})()"#;

impl ChromePage {
    async fn eval(&self, script: String, await_promise: bool) -> Result<Value, PageError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(PageError::Released);
        }

        match tokio::time::timeout(self.op_timeout, self.tab.eval_json(script, await_promise)).await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(browser_error(e)),
            Err(_) => Err(PageError::Timeout(self.op_timeout)),
        }
    }

    /// Evaluate an envelope script and unwrap its `ok` value.
    async fn eval_envelope(
        &self,
        script: String,
        await_promise: bool,
        selector: &str,
        node: Option<&NodePath>,
    ) -> Result<Value, PageError> {
        let value = self.eval(script, await_promise).await?;
        open_envelope(value, selector, node)
    }

    async fn primary_click(&self, selector: &str) -> Result<Activation, PageError> {
        let present = self
            .eval_envelope(query_script(None, selector), false, selector, None)
            .await?;
        if present.as_u64().unwrap_or(0) == 0 {
            return Ok(Activation::NotFound);
        }

        let click = async {
            let element = self.tab.wait_for_selector(selector).await?;
            element.click().await?;
            anyhow::Ok(())
        };
        match tokio::time::timeout(self.op_timeout, click).await {
            Ok(Ok(())) => Ok(Activation::Performed),
            Ok(Err(e)) => Err(browser_error(e)),
            Err(_) => Err(PageError::Timeout(self.op_timeout)),
        }
    }
}

fn open_envelope(value: Value, selector: &str, node: Option<&NodePath>) -> Result<Value, PageError> {
    let mut envelope = match value {
        Value::Object(envelope) => envelope,
        other => {
            return Err(PageError::Browser(format!(
                "unexpected script result: {other}"
            )));
        }
    };

    if let Some(ok) = envelope.remove("ok") {
        return Ok(ok);
    }
    if envelope.contains_key("invalid") {
        return Err(PageError::InvalidSelector(selector.to_string()));
    }
    if envelope.contains_key("detached") {
        let node = node.map(ToString::to_string).unwrap_or_default();
        return Err(PageError::Detached(node));
    }

    let message = envelope
        .remove("error")
        .and_then(|v| v.as_str().map(ToString::to_string))
        .unwrap_or_else(|| "unknown script error".to_string());
    Err(PageError::Browser(message))
}

impl Page for ChromePage {
    async fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<NodePath>, PageError> {
        let count = self
            .eval_envelope(query_script(scope, selector), false, selector, scope)
            .await?
            .as_u64()
            .unwrap_or(0) as usize;

        Ok((0..count)
            .map(|index| NodePath::child(scope, selector, index))
            .collect())
    }

    async fn read_text(&self, node: &NodePath) -> Result<String, PageError> {
        let value = self
            .eval_envelope(text_script(node), false, "", Some(node))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn read_attribute(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let value = self
            .eval_envelope(attribute_script(node, name), false, "", Some(node))
            .await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn activate(
        &self,
        selector: &str,
        path: ActivationPath,
    ) -> Result<Activation, PageError> {
        match path {
            ActivationPath::Primary => self.primary_click(selector).await,
            ActivationPath::Direct => {
                let clicked = self
                    .eval_envelope(click_script(selector), false, selector, None)
                    .await?;
                if clicked.as_bool().unwrap_or(false) {
                    Ok(Activation::Performed)
                } else {
                    Ok(Activation::NotFound)
                }
            }
        }
    }

    async fn scroll_through(&self) -> Result<(), PageError> {
        self.eval_envelope(SCROLL_SCRIPT.to_string(), true, "", None)
            .await
            .map(|_| ())
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);

        let mut browser = self.browser.lock().await;
        if !browser.is_held() {
            return;
        }

        let blank = self.tab.navigate("about:blank");
        if tokio::time::timeout(self.op_timeout, blank).await.is_err() {
            warn!(timeout = ?self.op_timeout, "leaving page timed out");
        }
        browser.close().await;
    }
}
