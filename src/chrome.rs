use std::{
    path::Path,
    time::{Duration, Instant},
};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, ReloadParams};
use chromiumoxide::page::Page;
use futures::StreamExt;

use crate::{
    driver::{PageDriver, Size},
    error::{MaplapseError, MaplapseResult},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`PageDriver`] backed by a real Chrome instance over the DevTools protocol.
///
/// The pipeline is strictly sequential, so the async chromiumoxide client is
/// wrapped in a blocking facade: the driver owns a small tokio runtime and
/// every trait call is a `block_on`. The CDP event handler runs on the
/// runtime's worker thread.
pub struct ChromeDriver {
    rt: tokio::runtime::Runtime,
    browser: Browser,
    page: Option<Page>,
}

impl ChromeDriver {
    /// Launch a headed Chrome, optionally reusing an existing user profile so
    /// the page sees an authenticated session.
    pub fn launch(profile_dir: Option<&Path>) -> MaplapseResult<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| MaplapseError::driver(format!("failed to start tokio runtime: {e}")))?;

        let (browser, mut handler) = rt.block_on(async {
            let mut builder = BrowserConfig::builder().with_head().args(vec![
                "--hide-scrollbars",
                "--disable-session-crashed-bubble",
                "--hide-crash-restore-bubble",
            ]);
            if let Some(dir) = profile_dir {
                builder = builder.user_data_dir(dir);
            }
            let cfg = builder
                .build()
                .map_err(|e| MaplapseError::driver(format!("bad browser config: {e}")))?;
            Browser::launch(cfg)
                .await
                .map_err(|e| MaplapseError::driver(format!("failed to launch Chrome: {e}")))
        })?;

        rt.spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            rt,
            browser,
            page: None,
        })
    }

    fn page(&self) -> MaplapseResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| MaplapseError::driver("no page open"))
    }

    fn eval<T: serde::de::DeserializeOwned>(&self, js: String) -> MaplapseResult<T> {
        let page = self.page()?;
        self.rt.block_on(async {
            let result = page
                .evaluate(js)
                .await
                .map_err(|e| MaplapseError::driver(format!("script evaluation failed: {e}")))?;
            result
                .into_value()
                .map_err(|e| MaplapseError::driver(format!("unexpected script result: {e}")))
        })
    }

    fn eval_void(&self, js: String) -> MaplapseResult<()> {
        let page = self.page()?;
        self.rt.block_on(async {
            page.evaluate(js)
                .await
                .map_err(|e| MaplapseError::driver(format!("script evaluation failed: {e}")))?;
            Ok(())
        })
    }

    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
        predicate_js: &str,
        what: &str,
    ) -> MaplapseResult<()> {
        let sel = js_string(selector);
        let js = format!(
            "(function() {{ const el = document.querySelector({sel}); {predicate_js} }})()"
        );
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(js.clone())? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MaplapseError::wait_timeout(format!(
                    "element '{selector}' did not become {what} within {}s",
                    timeout.as_secs()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// JSON-quote a string for embedding into a script.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("strings always serialize")
}

const VISIBLE_JS: &str = "if (!el) return false; \
     const r = el.getBoundingClientRect(); \
     const s = window.getComputedStyle(el); \
     return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';";

const CLICKABLE_JS: &str = "if (!el || el.disabled) return false; \
     const r = el.getBoundingClientRect(); \
     const s = window.getComputedStyle(el); \
     return r.width > 0 && r.height > 0 && s.display !== 'none' \
         && s.visibility !== 'hidden' && s.pointerEvents !== 'none';";

impl PageDriver for ChromeDriver {
    fn open(&mut self, url: &str) -> MaplapseResult<()> {
        let page = self.rt.block_on(async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| MaplapseError::driver(format!("failed to open '{url}': {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| MaplapseError::driver(format!("navigation to '{url}' failed: {e}")))?;
            Ok::<_, MaplapseError>(page)
        })?;
        self.page = Some(page);
        Ok(())
    }

    fn refresh(&mut self) -> MaplapseResult<()> {
        let page = self.page()?;
        self.rt.block_on(async {
            page.execute(ReloadParams::default())
                .await
                .map_err(|e| MaplapseError::driver(format!("page reload failed: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| MaplapseError::driver(format!("reload navigation failed: {e}")))?;
            Ok(())
        })
    }

    fn close(&mut self) -> MaplapseResult<()> {
        if let Some(page) = self.page.take() {
            let _ = self.rt.block_on(page.close());
        }
        self.rt
            .block_on(self.browser.close())
            .map_err(|e| MaplapseError::driver(format!("failed to close browser: {e}")))?;
        Ok(())
    }

    fn wait_visible(&mut self, selector: &str, timeout: Duration) -> MaplapseResult<()> {
        self.wait_for(selector, timeout, VISIBLE_JS, "visible")
    }

    fn wait_clickable(&mut self, selector: &str, timeout: Duration) -> MaplapseResult<()> {
        self.wait_for(selector, timeout, CLICKABLE_JS, "clickable")
    }

    fn click(&mut self, selector: &str) -> MaplapseResult<()> {
        let page = self.page()?;
        self.rt.block_on(async {
            let el = page
                .find_element(selector)
                .await
                .map_err(|e| MaplapseError::driver(format!("element '{selector}' not found: {e}")))?;
            el.click()
                .await
                .map_err(|e| MaplapseError::driver(format!("click on '{selector}' failed: {e}")))?;
            Ok(())
        })
    }

    fn element_size(&mut self, selector: &str) -> MaplapseResult<Size> {
        let sel = js_string(selector);
        let (w, h): (f64, f64) = self.eval(format!(
            "(function() {{ const r = document.querySelector({sel}).getBoundingClientRect(); \
             return [r.width, r.height]; }})()"
        ))?;
        Ok(Size::new(w.round() as u32, h.round() as u32))
    }

    fn element_text(&mut self, selector: &str) -> MaplapseResult<String> {
        let page = self.page()?;
        self.rt.block_on(async {
            let el = page
                .find_element(selector)
                .await
                .map_err(|e| MaplapseError::driver(format!("element '{selector}' not found: {e}")))?;
            let text = el.inner_text().await.map_err(|e| {
                MaplapseError::driver(format!("reading text of '{selector}' failed: {e}"))
            })?;
            Ok(text.unwrap_or_default())
        })
    }

    fn element_screenshot(&mut self, selector: &str) -> MaplapseResult<Vec<u8>> {
        let page = self.page()?;
        self.rt.block_on(async {
            let el = page
                .find_element(selector)
                .await
                .map_err(|e| MaplapseError::driver(format!("element '{selector}' not found: {e}")))?;
            el.screenshot(CaptureScreenshotFormat::Png)
                .await
                .map_err(|e| {
                    MaplapseError::driver(format!("screenshot of '{selector}' failed: {e}"))
                })
        })
    }

    fn css_value(&mut self, selector: &str, property: &str) -> MaplapseResult<String> {
        let sel = js_string(selector);
        let prop = js_string(property);
        self.eval(format!(
            "(function() {{ const el = document.querySelector({sel}); \
             return window.getComputedStyle(el).getPropertyValue({prop}); }})()"
        ))
    }

    fn set_style(&mut self, selector: &str, property: &str, value: &str) -> MaplapseResult<()> {
        let sel = js_string(selector);
        let prop = js_string(property);
        let val = js_string(value);
        self.eval_void(format!(
            "for (const el of document.querySelectorAll({sel})) \
             el.style.setProperty({prop}, {val});"
        ))
    }

    fn set_css_size(&mut self, selector: &str, size: Size) -> MaplapseResult<()> {
        let sel = js_string(selector);
        self.eval_void(format!(
            "(function() {{ const el = document.querySelector({sel}); \
             el.style.width = '{}px'; el.style.height = '{}px'; }})()",
            size.width, size.height
        ))
    }

    fn window_size(&mut self) -> MaplapseResult<Size> {
        let (w, h): (u32, u32) = self.eval("[window.outerWidth, window.outerHeight]".into())?;
        Ok(Size::new(w, h))
    }

    fn set_window_size(&mut self, size: Size) -> MaplapseResult<()> {
        let page = self.page()?;
        self.rt.block_on(async {
            let win = page
                .execute(GetWindowForTargetParams::default())
                .await
                .map_err(|e| MaplapseError::driver(format!("window lookup failed: {e}")))?;
            let bounds = Bounds::builder()
                .width(i64::from(size.width))
                .height(i64::from(size.height))
                .build();
            page.execute(SetWindowBoundsParams::new(win.window_id.clone(), bounds))
                .await
                .map_err(|e| MaplapseError::driver(format!("window resize failed: {e}")))?;
            Ok(())
        })
    }

    fn screen_size(&mut self) -> MaplapseResult<Size> {
        let (w, h): (u32, u32) = self.eval("[screen.availWidth, screen.availHeight]".into())?;
        Ok(Size::new(w, h))
    }
}
