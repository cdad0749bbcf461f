//! Content module - post models, list pagination and reading time

mod list;
mod post;
pub mod reading_time;

pub use list::{summaries, PostListState};
pub use post::{
    summary_fields, Banner, ContentBlock, NavPost, Navigation, PostDetail, PostSummary,
};
