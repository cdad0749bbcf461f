//! Generator module - renders pages with the built-in Tera templates and
//! writes the static site

use anyhow::{Context as _, Result};
use percent_encoding::percent_decode_str;
use std::fs;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::cache::Rendered;
use crate::content::PostSummary;
use crate::helpers::{full_url_for, list_page_path, post_path, redirect_page, DateFormatter};
use crate::i18n::I18n;
use crate::pages::{self, HomePage, PostOutcome, PostPage, HOME_PATH};
use crate::prismic::ContentClient;
use crate::templates::{NavigationData, PostData, SiteData, SummaryData, TemplateRenderer};
use crate::widgets::{exit_preview, CommentWidget, ScriptSlots, COMMENTS_SLOT};
use crate::Site;

/// Seconds between reloads of the loading placeholder
const PLACEHOLDER_REFRESH_SECS: u32 = 2;

/// One page of list entries, as fetched by the "load more" button
#[derive(Debug, Clone, Serialize)]
pub struct MorePage {
    /// Rendered list entries
    pub html: String,
    /// URL of the following page, if any
    pub next: Option<String>,
}

/// Page renderer and static site writer
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
    i18n: I18n,
    dates: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let mut i18n = I18n::new(&site.config.language);
        i18n.load_languages(&site.i18n_dir)?;
        let renderer = TemplateRenderer::new(&i18n)?;
        let dates = DateFormatter::new(&site.config.language, &site.config.timezone);

        Ok(Self {
            site: site.clone(),
            renderer,
            i18n,
            dates,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Create a base context with common variables
    fn create_base_context(&self, route: Option<&str>, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&self.site.config));
        context.insert(
            "canonical",
            &route.map(|route| full_url_for(&self.site.config, route)),
        );
        context.insert(
            "exit_preview",
            &exit_preview(preview, &self.i18n.get("exit_preview")),
        );
        context
    }

    fn summary_data(&self, posts: &[PostSummary]) -> Vec<SummaryData> {
        posts
            .iter()
            .map(|post| SummaryData::new(post, &self.dates, &self.i18n))
            .collect()
    }

    /// Render the post list page
    ///
    /// `load_more` is the URL the button fetches the second page from; the
    /// button is left out without one.
    pub fn render_home(&self, home: &HomePage, load_more: Option<&str>) -> Result<String> {
        let mut context = self.create_base_context(Some(HOME_PATH), home.preview);
        context.insert("posts", &self.summary_data(home.posts.items()));
        context.insert("load_more", &load_more);
        self.renderer.render("index.html", &context)
    }

    /// Render a page fetched by "load more"
    pub fn render_more(&self, posts: &[PostSummary], next: Option<String>) -> Result<MorePage> {
        Ok(MorePage {
            html: self.render_summaries(posts)?,
            next,
        })
    }

    /// Render list entries only, as appended by "load more"
    pub fn render_summaries(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.create_base_context(None, false);
        context.insert("posts", &self.summary_data(posts));
        self.renderer.render("summaries.html", &context)
    }

    /// Render a post page
    ///
    /// The comment thread is mounted for the duration of the render and torn
    /// down with it.
    pub fn render_post(&self, page: &PostPage) -> Result<String> {
        let slots = ScriptSlots::new();
        let _comments = CommentWidget::new(&self.site.config.comments).attach(&slots)?;

        let navigation = NavigationData {
            previous: page.navigation.previous.as_ref().map(Into::into),
            next: page.navigation.next.as_ref().map(Into::into),
        };

        let route = post_path(&page.detail.uid);
        let mut context = self.create_base_context(Some(&route), page.preview);
        context.insert(
            "post",
            &PostData::new(&page.detail, page.reading_time, &self.dates, &self.i18n),
        );
        context.insert("navigation", &navigation);
        context.insert("comments", &slots.render(COMMENTS_SLOT));
        self.renderer.render("post.html", &context)
    }

    /// Render whatever a post route resolved to
    pub fn render_outcome(&self, outcome: &PostOutcome) -> Result<Rendered> {
        match outcome {
            PostOutcome::Render(page) => Ok(Rendered::Html(self.render_post(page)?)),
            PostOutcome::Redirect(location) => Ok(Rendered::Redirect(location.clone())),
        }
    }

    /// Render the page shown while a post is generated
    pub fn render_placeholder(&self) -> Result<String> {
        let mut context = self.create_base_context(None, false);
        context.insert("refresh_secs", &PLACEHOLDER_REFRESH_SECS);
        self.renderer.render("loading.html", &context)
    }

    /// Fetch and render every page, write them to the public directory
    ///
    /// Returns the rendered output keyed by route.
    pub async fn generate(&self, client: &dyn ContentClient) -> Result<Vec<(String, Rendered)>> {
        let prismic = &self.site.config.prismic;
        fs::create_dir_all(&self.site.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.site.public_dir))?;

        self.copy_static_assets()?;

        let mut generated = Vec::new();

        let home = pages::fetch_home(client, prismic, None)
            .await
            .context("Failed to fetch the post list")?;
        let load_more = home.posts.cursor().map(|_| list_page_path(2));
        let index = Rendered::Html(self.render_home(&home, load_more.as_deref())?);
        self.write_page(HOME_PATH, &index)?;
        generated.push((HOME_PATH.to_string(), index));

        // Later list pages become JSON files next to the index
        let mut cursor = home.posts.cursor().map(str::to_string);
        let mut summaries = home.posts.into_items();
        let mut page = 2;
        while let Some(current) = cursor {
            let more = pages::fetch_more(client, &current)
                .await
                .with_context(|| format!("Failed to fetch list page {}", page))?;
            let next = more.next_page.as_ref().map(|_| list_page_path(page + 1));
            let chunk = self.render_more(&more.posts, next)?;
            self.write_file(&list_page_path(page), &serde_json::to_string(&chunk)?)?;
            summaries.extend(more.posts);
            cursor = more.next_page;
            page += 1;
        }
        tracing::info!("Found {} posts", summaries.len());

        for summary in &summaries {
            if !is_single_segment(&summary.uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", summary.uid);
                continue;
            }
            let outcome = pages::fetch_post(client, prismic, &summary.uid, None)
                .await
                .with_context(|| format!("Failed to fetch post {:?}", summary.uid))?;
            let rendered = self.render_outcome(&outcome)?;
            let route = post_path(&summary.uid);
            self.write_page(&route, &rendered)?;
            tracing::debug!("Generated post: {}", route);
            generated.push((route, rendered));
        }

        Ok(generated)
    }

    /// Output file of a route, `/post/a%20b` -> `public/post/a b/index.html`
    fn output_path(&self, route: &str) -> PathBuf {
        let mut path = self.site.public_dir.clone();
        for segment in route.split('/').filter(|s| !s.is_empty()) {
            path.push(percent_decode_str(segment).decode_utf8_lossy().as_ref());
        }
        path.join("index.html")
    }

    fn write_page(&self, route: &str, rendered: &Rendered) -> Result<()> {
        let content = match rendered {
            Rendered::Html(html) => html.clone(),
            Rendered::Redirect(location) => redirect_page(location),
        };
        write_output(&self.output_path(route), &content)
    }

    /// Write a file at a path below the public directory
    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(path.trim_start_matches('/'));
        write_output(&output_path, content)
    }

    /// Copy static assets (images, styles) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.site.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        tracing::info!("Copied {} static files", copied);
        Ok(())
    }
}

fn write_output(output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(output_path, content)
        .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
    tracing::debug!("Generated: {:?}", output_path);
    Ok(())
}

/// Whether a uid can be used as one directory name
fn is_single_segment(uid: &str) -> bool {
    let mut components = Path::new(uid).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::{MemoryClient, RawDocument};

    fn doc(id: &str, uid: &str, published: &str) -> RawDocument {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "uid": uid,
            "type": "posts",
            "first_publication_date": published,
            "last_publication_date": published,
            "data": {
                "title": format!("Title of {}", uid),
                "subtitle": "Pensando em sincronização",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "content": [
                    { "heading": "Proin et varius",
                      "body": [ { "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] } ] }
                ]
            }
        }))
        .unwrap()
    }

    fn site(dir: &Path) -> Site {
        let mut site = Site::new(dir).unwrap();
        site.config.comments.repo = "owner/comments".to_string();
        site
    }

    fn client() -> MemoryClient {
        MemoryClient::new(vec![
            doc("1", "first-post", "2021-03-15T19:25:28+0000"),
            doc("2", "second-post", "2021-03-25T19:25:28+0000"),
        ])
    }

    #[tokio::test]
    async fn test_generate_writes_all_pages() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static/styles")).unwrap();
        fs::write(dir.path().join("static/styles/global.css"), "body {}").unwrap();

        let site = site(dir.path());
        let generator = Generator::new(&site).unwrap();
        let generated = generator.generate(&client()).await.unwrap();

        let routes: Vec<_> = generated.iter().map(|(route, _)| route.as_str()).collect();
        assert_eq!(routes, ["/", "/post/first-post", "/post/second-post"]);

        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Title of first-post"));
        assert!(index.contains("Carregar mais posts"));

        let post =
            fs::read_to_string(site.public_dir.join("post/first-post/index.html")).unwrap();
        assert!(post.contains("<title>Title of first-post | spacetraveling</title>"));
        assert!(post.contains("Title of second-post"));
        assert!(post.contains("Próximo post"));
        assert!(post.contains("utteranc.es"));
        assert!(post.contains("1 min"));
        assert!(post.contains(r#"<link rel="canonical""#));

        assert!(site.public_dir.join("styles/global.css").exists());
    }

    #[tokio::test]
    async fn test_static_index_loads_more_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let client = MemoryClient::new(vec![
            doc("1", "first-post", "2021-03-15T19:25:28+0000"),
            doc("2", "second-post", "2021-03-25T19:25:28+0000"),
            doc("3", "third-post", "2021-04-05T19:25:28+0000"),
        ]);
        Generator::new(&site).unwrap().generate(&client).await.unwrap();

        let index = fs::read_to_string(site.public_dir.join("index.html"))
            .unwrap()
            .replace("&#x2F;", "/");
        assert!(index.contains(r#"data-next="/posts/page/2.json""#));
        assert!(!index.contains("/api/"));

        let page: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(site.public_dir.join("posts/page/2.json")).unwrap(),
        )
        .unwrap();
        assert!(page["html"].as_str().unwrap().contains("Title of second-post"));
        assert_eq!(page["next"], "/posts/page/3.json");

        let last: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(site.public_dir.join("posts/page/3.json")).unwrap(),
        )
        .unwrap();
        assert!(last["html"].as_str().unwrap().contains("Title of third-post"));
        assert!(last["next"].is_null());
        assert!(!site.public_dir.join("posts/page/4.json").exists());
        assert!(site.public_dir.join("post/third-post/index.html").exists());
    }

    #[tokio::test]
    async fn test_redirect_outcome_writes_redirect_page() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let rendered = generator
            .render_outcome(&PostOutcome::Redirect("/".to_string()))
            .unwrap();
        generator.write_page("/post/gone", &rendered).unwrap();

        let html =
            fs::read_to_string(dir.path().join("public/post/gone/index.html")).unwrap();
        assert!(html.contains(r#"<meta http-equiv="refresh" content="0; url=/">"#));
    }

    #[tokio::test]
    async fn test_preview_page_shows_exit_link() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let outcome = pages::fetch_post(
            &client(),
            &generator.site().config.prismic,
            "second-post",
            Some("preview-ref".to_string()),
        )
        .await
        .unwrap();
        let Rendered::Html(html) = generator.render_outcome(&outcome).unwrap() else {
            panic!("expected html");
        };
        assert!(html.contains("Sair do modo Preview"));
        assert!(html.contains("Post anterior"));
    }

    #[test]
    fn test_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let html = generator.render_placeholder().unwrap();
        assert!(html.contains("Carregando..."));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let public = dir.path().join("public");
        assert_eq!(generator.output_path("/"), public.join("index.html"));
        assert_eq!(
            generator.output_path("/post/a%20b"),
            public.join("post").join("a b").join("index.html")
        );
    }

    #[test]
    fn test_single_segment() {
        assert!(is_single_segment("como-utilizar-hooks"));
        assert!(!is_single_segment("../etc"));
        assert!(!is_single_segment("a/b"));
        assert!(!is_single_segment(""));
    }
}
