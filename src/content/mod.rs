//! Content selection: loading Shabads and Banis, and the live pointer state
//!
//! Loading goes through the corpus on the blocking pool; [`ContentState`]
//! then applies the loaded content synchronously so a single lock covers the
//! whole mutation.

pub mod state;

pub use state::{ContentChanges, ContentState};

use crate::corpus::{query, Content, SharedCorpus};
use crate::{PresenterError, Result};

/// Load a Shabad by id.
pub async fn load_shabad(corpus: &SharedCorpus, id: &str) -> Result<Content> {
    let id = id.to_string();
    let what = format!("shabad {}", id);

    query(corpus, move |corpus| corpus.shabad(&id))
        .await?
        .map(Content::Shabad)
        .ok_or(PresenterError::ContentNotFound { what })
}

/// Load a Bani by id.
pub async fn load_bani(corpus: &SharedCorpus, id: i64) -> Result<Content> {
    query(corpus, move |corpus| corpus.bani(id))
        .await?
        .map(Content::Bani)
        .ok_or_else(|| PresenterError::ContentNotFound {
            what: format!("bani {}", id),
        })
}

/// Load the Shabad at an exact order id.
pub async fn load_shabad_by_order_id(corpus: &SharedCorpus, order_id: i64) -> Result<Content> {
    query(corpus, move |corpus| corpus.shabad_by_order_id(order_id))
        .await?
        .map(Content::Shabad)
        .ok_or_else(|| PresenterError::ContentNotFound {
            what: format!("shabad with order id {}", order_id),
        })
}
