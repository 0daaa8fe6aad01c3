#![forbid(unsafe_code)]

pub mod caption;
pub mod chrome;
pub mod config;
pub mod date;
pub mod driver;
pub mod encode;
pub mod error;
pub mod page;
pub mod scrape;
pub mod text;

pub use caption::{Annotation, CaptionStyle, Compositor, DATE_FORMAT, DrawnCaption};
pub use chrome::ChromeDriver;
pub use config::Config;
pub use date::{DateTextParser, LocaleCalendarNames};
pub use driver::{PageDriver, Size};
pub use encode::VideoEncoder;
pub use error::{MaplapseError, MaplapseResult};
pub use page::{CapturedFrame, MapPage};
pub use scrape::{ScrapeOptions, Scraper, frame_filename};
pub use text::{BBox, FontRaster, TextRaster};
