//! Video viewing - recording views and the home-page counter.

mod home_page;
mod record;

pub use home_page::{home_page_aggregator, HomePage, HOME_PAGE, HOME_PAGE_AGGREGATOR};
pub use record::{record_viewing, viewing_stream_name, VideoViewed, VIDEO_VIEWED};

pub const VIEWING_CATEGORY: &str = "viewing";
