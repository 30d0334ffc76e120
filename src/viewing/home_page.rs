//! Home page - total videos watched across all users.

use serde::{Deserialize, Serialize};

use super::{VIDEO_VIEWED, VIEWING_CATEGORY};
use crate::aggregator::Aggregator;
use crate::checkpoint::CheckpointStore;
use crate::reader::MessageReader;
use crate::read_model::{ReadModel, ReadModelStore, ReadModelsExt};
use crate::store::BackingStore;

pub const HOME_PAGE: &str = "home";
pub const HOME_PAGE_AGGREGATOR: &str = "home-page";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePage {
    pub page_name: String,
    pub videos_watched: u64,
    /// Global position of the last `VideoViewed` counted.
    pub last_view_processed: i64,
}

impl HomePage {
    pub fn initial() -> Self {
        HomePage {
            page_name: HOME_PAGE.to_string(),
            videos_watched: 0,
            last_view_processed: 0,
        }
    }

    /// Count the view at `global_position` unless it was counted already.
    pub fn count_view(&self, global_position: i64) -> Option<HomePage> {
        if self.last_view_processed >= global_position {
            return None;
        }
        Some(HomePage {
            videos_watched: self.videos_watched + 1,
            last_view_processed: global_position,
            ..self.clone()
        })
    }
}

impl ReadModel for HomePage {
    const COLLECTION: &'static str = "pages";

    fn id(&self) -> &str {
        &self.page_name
    }
}

/// Aggregator over `viewing` maintaining the `pages/home` row.
pub fn home_page_aggregator<B, R, C>(
    reader: MessageReader<B>,
    read_models: R,
    checkpoints: C,
) -> Aggregator<B, C>
where
    B: BackingStore,
    R: ReadModelStore + Clone + 'static,
    C: CheckpointStore,
{
    let seed_store = read_models.clone();
    Aggregator::new(HOME_PAGE_AGGREGATOR, VIEWING_CATEGORY, reader, checkpoints)
        .on_init(move || {
            seed_store
                .read_models::<HomePage>()
                .insert_if_absent(&HomePage::initial())?;
            Ok(())
        })
        .on(VIDEO_VIEWED, move |message| {
            let global_position = message.global_position;
            let written = read_models
                .read_models::<HomePage>()
                .modify(HOME_PAGE, |page| page.count_view(global_position))?;
            if written.is_none() {
                tracing::debug!(global_position, "view already counted");
            }
            Ok(())
        })
}
