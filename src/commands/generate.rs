//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::prismic::ContentClient;
use crate::Site;

/// Render every page into the public directory
pub async fn run(site: &Site, client: &dyn ContentClient) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(site)?;
    let generated = generator.generate(client).await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} pages in {:.2}s",
        generated.len(),
        duration.as_secs_f64()
    );
    Ok(())
}
