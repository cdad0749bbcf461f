//! Data fetching for the list and detail pages
//!
//! Every entry point takes the content client explicitly and returns plain
//! data; rendering happens in the generator.

mod home;
mod post;

pub use home::{fetch_all_summaries, fetch_home, fetch_more, list_options, HomePage, MorePosts};
pub use post::{fetch_post, neighbor_options, PostOutcome, PostPage};

/// Where an unknown post sends the visitor
pub const HOME_PATH: &str = "/";
