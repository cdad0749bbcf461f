//! List posts of the content repository

use anyhow::Result;

use crate::helpers::{post_path, DateFormatter, PUBLICATION_FORMAT};
use crate::pages;
use crate::prismic::ContentClient;
use crate::Site;

/// Print every post, following all list pages
pub async fn run(site: &Site, client: &dyn ContentClient) -> Result<()> {
    let posts = pages::fetch_all_summaries(client, &site.config.prismic).await?;
    let dates = DateFormatter::new(&site.config.language, &site.config.timezone);

    println!("Posts ({}):", posts.len());
    for post in posts {
        let date = dates
            .format_opt(post.first_publication_date.as_ref(), PUBLICATION_FORMAT)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} - {} by {} [{}]",
            date,
            post.title,
            post.author,
            post_path(&post.uid)
        );
    }

    Ok(())
}
