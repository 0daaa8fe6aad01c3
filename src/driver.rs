use std::time::Duration;

use crate::error::MaplapseResult;

/// Size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Remote-control capability over one live browser page.
///
/// Elements are addressed by CSS selector on every call; the driver resolves
/// them against the current DOM, so callers never hold stale element handles
/// across page mutations. Any backend implementing this trait is
/// substitutable, including a fully synthetic one for tests.
pub trait PageDriver {
    fn open(&mut self, url: &str) -> MaplapseResult<()>;

    /// Full page reload. Required after window resizes, which can reset the
    /// page's layout state.
    fn refresh(&mut self) -> MaplapseResult<()>;

    fn close(&mut self) -> MaplapseResult<()>;

    /// Block until the element is rendered and visible, or fail with
    /// [`MaplapseError::WaitTimeout`](crate::MaplapseError::WaitTimeout).
    fn wait_visible(&mut self, selector: &str, timeout: Duration) -> MaplapseResult<()>;

    /// Block until the element is visible and enabled, or fail with
    /// [`MaplapseError::WaitTimeout`](crate::MaplapseError::WaitTimeout).
    fn wait_clickable(&mut self, selector: &str, timeout: Duration) -> MaplapseResult<()>;

    fn click(&mut self, selector: &str) -> MaplapseResult<()>;

    fn element_size(&mut self, selector: &str) -> MaplapseResult<Size>;

    fn element_text(&mut self, selector: &str) -> MaplapseResult<String>;

    /// PNG-encoded screenshot of a single element.
    fn element_screenshot(&mut self, selector: &str) -> MaplapseResult<Vec<u8>>;

    /// Computed CSS property value, e.g. the native `display` of an overlay.
    fn css_value(&mut self, selector: &str, property: &str) -> MaplapseResult<String>;

    /// Set an inline style property on every element matching the selector.
    fn set_style(&mut self, selector: &str, property: &str, value: &str) -> MaplapseResult<()>;

    /// Force an element's CSS width/height, bypassing the window size.
    fn set_css_size(&mut self, selector: &str, size: Size) -> MaplapseResult<()>;

    fn window_size(&mut self) -> MaplapseResult<Size>;

    fn set_window_size(&mut self, size: Size) -> MaplapseResult<()>;

    /// Available screen resolution of the environment the browser runs in.
    fn screen_size(&mut self) -> MaplapseResult<Size>;
}

/// Scriptable in-memory [`PageDriver`] used by the page and loop unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use image::{Rgba, RgbaImage};

    use super::{PageDriver, Size};
    use crate::error::{MaplapseError, MaplapseResult};
    use crate::page::{
        BODY_SELECTOR, CANVAS_SELECTOR, DATE_LABEL_SELECTOR, NEXT_DATE_SELECTOR, SIDEBAR_SELECTOR,
    };

    pub(crate) struct StubPage {
        pub window: Size,
        pub body: Size,
        pub sidebar: Size,
        pub screen: Size,
        pub canvas: Size,
        /// Residual the canvas misses the target by after the first window
        /// resize; consumed once.
        pub canvas_shortfall: (i64, i64),
        pub display_values: HashMap<String, String>,
        pub date_texts: Vec<String>,
        pub date_index: usize,
        pub frame_color: Rgba<u8>,

        pub styles: HashMap<(String, String), String>,
        pub css_sizes: HashMap<String, Size>,
        pub clicks: Vec<String>,
        pub window_size_calls: Vec<Size>,
        pub refresh_count: usize,
        pub screenshot_count: usize,
        pub wait_visible_count: usize,
    }

    impl Default for StubPage {
        fn default() -> Self {
            Self {
                window: Size::new(1016, 900),
                body: Size::new(1000, 800),
                sidebar: Size::new(400, 800),
                screen: Size::new(1920, 1080),
                canvas: Size::new(320, 200),
                canvas_shortfall: (0, 0),
                display_values: HashMap::new(),
                date_texts: Vec::new(),
                date_index: 0,
                frame_color: Rgba([120, 130, 140, 255]),
                styles: HashMap::new(),
                css_sizes: HashMap::new(),
                clicks: Vec::new(),
                window_size_calls: Vec::new(),
                refresh_count: 0,
                screenshot_count: 0,
                wait_visible_count: 0,
            }
        }
    }

    pub(crate) struct StubDriver {
        state: Arc<Mutex<StubPage>>,
    }

    impl StubDriver {
        pub(crate) fn new(page: StubPage) -> (Self, Arc<Mutex<StubPage>>) {
            let state = Arc::new(Mutex::new(page));
            (
                Self {
                    state: state.clone(),
                },
                state,
            )
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, StubPage> {
            self.state.lock().unwrap()
        }
    }

    impl PageDriver for StubDriver {
        fn open(&mut self, _url: &str) -> MaplapseResult<()> {
            Ok(())
        }

        fn refresh(&mut self) -> MaplapseResult<()> {
            self.lock().refresh_count += 1;
            Ok(())
        }

        fn close(&mut self) -> MaplapseResult<()> {
            Ok(())
        }

        fn wait_visible(&mut self, _selector: &str, _timeout: Duration) -> MaplapseResult<()> {
            self.lock().wait_visible_count += 1;
            Ok(())
        }

        fn wait_clickable(&mut self, _selector: &str, _timeout: Duration) -> MaplapseResult<()> {
            Ok(())
        }

        fn click(&mut self, selector: &str) -> MaplapseResult<()> {
            let mut s = self.lock();
            s.clicks.push(selector.to_string());
            if selector == NEXT_DATE_SELECTOR {
                s.date_index += 1;
            }
            Ok(())
        }

        fn element_size(&mut self, selector: &str) -> MaplapseResult<Size> {
            let s = self.lock();
            match selector {
                BODY_SELECTOR => Ok(s.body),
                SIDEBAR_SELECTOR => Ok(s.sidebar),
                CANVAS_SELECTOR => Ok(s.canvas),
                other => Err(MaplapseError::driver(format!("no stub size for '{other}'"))),
            }
        }

        fn element_text(&mut self, selector: &str) -> MaplapseResult<String> {
            let s = self.lock();
            if selector != DATE_LABEL_SELECTOR {
                return Err(MaplapseError::driver(format!("no stub text for '{selector}'")));
            }
            s.date_texts
                .get(s.date_index)
                .cloned()
                .ok_or_else(|| MaplapseError::driver("stub ran out of date labels"))
        }

        fn element_screenshot(&mut self, selector: &str) -> MaplapseResult<Vec<u8>> {
            let mut s = self.lock();
            if selector != CANVAS_SELECTOR {
                return Err(MaplapseError::driver(format!(
                    "no stub screenshot for '{selector}'"
                )));
            }
            s.screenshot_count += 1;
            let img = RgbaImage::from_pixel(s.canvas.width, s.canvas.height, s.frame_color);
            let mut buf = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| MaplapseError::driver(format!("stub png encode failed: {e}")))?;
            Ok(buf)
        }

        fn css_value(&mut self, selector: &str, property: &str) -> MaplapseResult<String> {
            let s = self.lock();
            if property != "display" {
                return Err(MaplapseError::driver(format!("no stub css '{property}'")));
            }
            Ok(s.display_values
                .get(selector)
                .cloned()
                .unwrap_or_else(|| "block".to_string()))
        }

        fn set_style(&mut self, selector: &str, property: &str, value: &str) -> MaplapseResult<()> {
            self.lock().styles.insert(
                (selector.to_string(), property.to_string()),
                value.to_string(),
            );
            Ok(())
        }

        fn set_css_size(&mut self, selector: &str, size: Size) -> MaplapseResult<()> {
            let mut s = self.lock();
            s.css_sizes.insert(selector.to_string(), size);
            if selector == CANVAS_SELECTOR {
                s.canvas = size;
            }
            Ok(())
        }

        fn window_size(&mut self) -> MaplapseResult<Size> {
            Ok(self.lock().window)
        }

        fn set_window_size(&mut self, size: Size) -> MaplapseResult<()> {
            let mut s = self.lock();
            s.window_size_calls.push(size);
            // Outer chrome stays constant; the canvas tracks the window minus
            // sidebar and chrome, minus a one-shot shortfall.
            let chrome = (
                i64::from(s.window.width) - i64::from(s.body.width),
                i64::from(s.window.height) - i64::from(s.body.height),
            );
            let shortfall = std::mem::take(&mut s.canvas_shortfall);
            s.canvas = Size::new(
                (i64::from(size.width) - i64::from(s.sidebar.width) - chrome.0 - shortfall.0)
                    .max(0) as u32,
                (i64::from(size.height) - chrome.1 - shortfall.1).max(0) as u32,
            );
            s.body = Size::new(
                (i64::from(size.width) - chrome.0).max(0) as u32,
                (i64::from(size.height) - chrome.1).max(0) as u32,
            );
            s.window = size;
            Ok(())
        }

        fn screen_size(&mut self) -> MaplapseResult<Size> {
            Ok(self.lock().screen)
        }
    }
}
