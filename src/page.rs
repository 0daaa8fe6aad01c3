use std::time::Duration;

use image::RgbaImage;

use crate::{
    driver::{PageDriver, Size},
    error::{MaplapseError, MaplapseResult},
};

/// Session-scoped bound for every wait; a timeout is fatal for the run.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(60);

// CSS selectors for the timeline UI. Version-specific and brittle by the
// nature of scraping; updating them is the expected maintenance cost.
pub const CANVAS_SELECTOR: &str = "div.map-wrapper";
pub const SIDEBAR_SELECTOR: &str = "div.map-page-content-wrapper";
pub const BODY_SELECTOR: &str = "body";
pub const DATE_LABEL_SELECTOR: &str = "#map-page > div.map-page-content-wrapper > div > div > div \
     > div.timeline-header > div > div.timeline-title";
pub const NEXT_DATE_SELECTOR: &str = "i.timeline-header-button.next-date-range-button.\
     material-icons-extended.material-icon-with-ripple.rtl-mirrored";

const ZOOM_IN_SELECTOR: &str =
    "#map > div > div > div:nth-child(13) > div > div > div > button:nth-child(1)";
const ZOOM_OUT_SELECTOR: &str =
    "#map > div > div > div:nth-child(13) > div > div > div > button:nth-child(3)";
const TOGGLE_MAP_SELECTOR: &str =
    "#map > div > div > div:nth-child(16) > div:nth-child(2) > div:nth-child(1) > button";
const TOGGLE_SATELLITE_SELECTOR: &str =
    "#map > div > div > div:nth-child(16) > div:nth-child(2) > div:nth-child(2) > button";

/// Overlay chrome hidden during capture so frames contain only the map.
const ACCOUNT_SETTINGS_SELECTOR: &str = "#gb > div";
const MAP_SETTINGS_SELECTOR: &str =
    "#map > div > div > div:nth-child(16) > div.map-controls-container";
const ZOOM_CLUSTER_SELECTOR: &str = "#map > div > div > div:nth-child(13) > div > div";
const LAYER_CLUSTER_SELECTOR: &str = "#map > div > div > div:nth-child(16) > div:nth-child(2)";

const CONTROL_SELECTORS: [&str; 4] = [
    ZOOM_IN_SELECTOR,
    ZOOM_OUT_SELECTOR,
    TOGGLE_MAP_SELECTOR,
    TOGGLE_SATELLITE_SELECTOR,
];

const OVERLAY_SELECTORS: [&str; 4] = [
    ACCOUNT_SETTINGS_SELECTOR,
    MAP_SETTINGS_SELECTOR,
    ZOOM_CLUSTER_SELECTOR,
    LAYER_CLUSTER_SELECTOR,
];

/// One raw capture: the canvas pixels plus the date label exactly as the
/// page rendered it, not yet interpreted.
pub struct CapturedFrame {
    pub image: RgbaImage,
    pub date_text: String,
}

/// The control and overlay elements located on the live page, with each
/// overlay's original `display` value captured at acquisition time.
///
/// Any window resize or script-driven canvas resize can change element
/// identity or geometry, so the set is re-acquired after every such mutation
/// rather than leaving staleness to the caller.
struct MapControls {
    overlay: Vec<(&'static str, String)>,
}

impl MapControls {
    fn acquire(driver: &mut dyn PageDriver) -> MaplapseResult<Self> {
        for sel in CONTROL_SELECTORS {
            driver.wait_visible(sel, WAIT_TIMEOUT)?;
        }
        let mut overlay = Vec::with_capacity(OVERLAY_SELECTORS.len());
        for sel in OVERLAY_SELECTORS {
            driver.wait_visible(sel, WAIT_TIMEOUT)?;
            // Native display differs per element (block, flex, ...); restore
            // exactly what was there, not a hardcoded default.
            let display = driver.css_value(sel, "display")?;
            overlay.push((sel, display));
        }
        Ok(Self { overlay })
    }
}

/// Drives the remote timeline page: geometry, chrome visibility, day
/// advancement, and raw frame extraction.
pub struct MapPage<D: PageDriver> {
    driver: D,
    controls: Option<MapControls>,
}

impl<D: PageDriver> MapPage<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            controls: None,
        }
    }

    pub fn open(&mut self, url: &str) -> MaplapseResult<()> {
        self.driver.open(url)?;
        self.controls = Some(MapControls::acquire(&mut self.driver)?);
        Ok(())
    }

    pub fn close(&mut self) -> MaplapseResult<()> {
        self.driver.close()
    }

    /// Resize the browser window so the map canvas lands exactly on `target`.
    ///
    /// Window size = canvas size + sidebar width + outer-chrome correction,
    /// where the correction (window minus body) is measured live because
    /// browser chrome metrics vary by environment. Fails before any capture
    /// if the computed window cannot fit the available screen.
    pub fn resize_window(&mut self, target: Size) -> MaplapseResult<()> {
        let window = self.driver.window_size()?;
        let body = self.driver.element_size(BODY_SELECTOR)?;
        let correction = (
            i64::from(window.width) - i64::from(body.width),
            i64::from(window.height) - i64::from(body.height),
        );
        let sidebar = self.driver.element_size(SIDEBAR_SELECTOR)?;

        let want_w = i64::from(target.width) + i64::from(sidebar.width) + correction.0;
        let want_h = i64::from(target.height) + correction.1;

        let screen = self.driver.screen_size()?;
        if want_w > i64::from(screen.width) || want_h > i64::from(screen.height) {
            return Err(MaplapseError::geometry(format!(
                "capture size {}x{} needs a {want_w}x{want_h} window, \
                 but only {}x{} is available",
                target.width, target.height, screen.width, screen.height
            )));
        }

        self.driver
            .set_window_size(Size::new(want_w as u32, want_h as u32))?;

        // Window chrome and canvas size are not always linearly related; if
        // the canvas missed the target, nudge the window by the residual.
        let canvas = self.driver.element_size(CANVAS_SELECTOR)?;
        let diff = (
            i64::from(target.width) - i64::from(canvas.width),
            i64::from(target.height) - i64::from(canvas.height),
        );
        if diff != (0, 0) {
            let window = self.driver.window_size()?;
            self.driver.set_window_size(Size::new(
                (i64::from(window.width) + diff.0) as u32,
                (i64::from(window.height) + diff.1) as u32,
            ))?;
        }

        // Window resizes can reset page layout state entirely.
        self.driver.refresh()?;
        self.controls = Some(MapControls::acquire(&mut self.driver)?);
        Ok(())
    }

    /// Re-assert the canvas CSS size directly. Steady-state counterpart of
    /// [`resize_window`](Self::resize_window): zooms and layer toggles can
    /// silently perturb the canvas between iterations.
    pub fn resize_map(&mut self, target: Size) -> MaplapseResult<()> {
        self.driver.set_css_size(CANVAS_SELECTOR, target)?;
        self.controls = Some(MapControls::acquire(&mut self.driver)?);
        Ok(())
    }

    pub fn hide_chrome(&mut self) -> MaplapseResult<()> {
        let controls = self.controls.as_ref().ok_or_else(Self::not_opened)?;
        for (sel, _) in &controls.overlay {
            self.driver.set_style(sel, "display", "none")?;
        }
        Ok(())
    }

    pub fn show_chrome(&mut self) -> MaplapseResult<()> {
        let controls = self.controls.as_ref().ok_or_else(Self::not_opened)?;
        for (sel, display) in &controls.overlay {
            self.driver.set_style(sel, "display", display)?;
        }
        Ok(())
    }

    pub fn advance_day(&mut self) -> MaplapseResult<()> {
        self.driver.wait_clickable(NEXT_DATE_SELECTOR, WAIT_TIMEOUT)?;
        self.driver.click(NEXT_DATE_SELECTOR)
    }

    pub fn zoom_in(&mut self) -> MaplapseResult<()> {
        self.wait_and_click(ZOOM_IN_SELECTOR)
    }

    pub fn zoom_out(&mut self) -> MaplapseResult<()> {
        self.wait_and_click(ZOOM_OUT_SELECTOR)
    }

    pub fn toggle_map(&mut self) -> MaplapseResult<()> {
        self.wait_and_click(TOGGLE_MAP_SELECTOR)
    }

    pub fn toggle_satellite(&mut self) -> MaplapseResult<()> {
        self.wait_and_click(TOGGLE_SATELLITE_SELECTOR)
    }

    /// Read the canvas pixels and the current date label, un-interpreted.
    pub fn capture_frame(&mut self) -> MaplapseResult<CapturedFrame> {
        let png = self.driver.element_screenshot(CANVAS_SELECTOR)?;
        let image = image::load_from_memory(&png)
            .map_err(|e| MaplapseError::driver(format!("canvas screenshot is not an image: {e}")))?
            .to_rgba8();
        let date_text = self.driver.element_text(DATE_LABEL_SELECTOR)?;
        Ok(CapturedFrame { image, date_text })
    }

    fn wait_and_click(&mut self, selector: &str) -> MaplapseResult<()> {
        self.driver.wait_clickable(selector, WAIT_TIMEOUT)?;
        self.driver.click(selector)
    }

    fn not_opened() -> MaplapseError {
        MaplapseError::driver("page not opened (controls not acquired)")
    }
}
