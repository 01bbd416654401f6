//! Image availability checks and pulls.
//!
//! Covers asking the daemon whether an image is known locally (matched on
//! the repository portion of its tags) and pulling an image while draining
//! the streamed progress frames into a single terminal outcome.

use crate::client::DockClient;
use crate::progress::FrameAggregator;
use crate::{Error, Result};
use bollard::query_parameters::{CreateImageOptionsBuilder, ListImagesOptions};
use futures::stream::StreamExt;
use regex::Regex;
use tracing::{debug, info};

/// Matches running containers by their image reference.
#[derive(Debug, Clone)]
pub enum ImageMatcher {
    /// Exact string equality against the image reference.
    Exact(String),
    /// Regular-expression match against the image reference.
    Pattern(Regex),
}

impl ImageMatcher {
    /// Whether the given image reference matches.
    pub fn matches(&self, image: &str) -> bool {
        match self {
            Self::Exact(name) => name == image,
            Self::Pattern(pattern) => pattern.is_match(image),
        }
    }
}

impl From<&str> for ImageMatcher {
    fn from(name: &str) -> Self {
        Self::Exact(name.to_string())
    }
}

impl From<String> for ImageMatcher {
    fn from(name: String) -> Self {
        Self::Exact(name)
    }
}

impl From<Regex> for ImageMatcher {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

/// Image operations on a daemon connection.
#[derive(Clone)]
pub struct ImageManager {
    client: DockClient,
}

impl ImageManager {
    /// Create a new image manager on a shared connection handle.
    pub fn new(client: DockClient) -> Self {
        Self { client }
    }

    /// Check whether an image with the given repository name is known to
    /// the daemon.
    ///
    /// Matches the portion of each repo tag before the first `:` — so
    /// `thenativeweb/app` matches `thenativeweb/app:latest` and
    /// `thenativeweb/app:1.2`, but not `thenativeweb/app-extra:latest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty name or [`Error::Query`] if
    /// the image listing fails.
    pub async fn has_image(&self, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Err(Error::Config("name is missing".to_string()));
        }

        let images = self
            .client
            .docker()
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(Error::Query)?;

        Ok(images
            .iter()
            .any(|image| repository_matches(&image.repo_tags, name)))
    }

    /// Pull an image from its registry.
    ///
    /// Progress frames are drained to completion even once an error frame
    /// has decided the outcome, so the shared connection is never left with
    /// unread frames. Exactly one outcome is reported per call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty name or [`Error::Pull`]
    /// carrying the first error message seen on the stream.
    pub async fn download_image(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Config("name is missing".to_string()));
        }

        info!("Pulling image: {}", name);

        let options = CreateImageOptionsBuilder::default()
            .from_image(name)
            .build();
        let mut stream = self
            .client
            .docker()
            .create_image(Some(options), None, None);

        let mut aggregator = FrameAggregator::new();

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(progress) => {
                    if let Some(error) = progress.error {
                        aggregator.record_error(error);
                    } else if let Some(status) = progress.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => aggregator.record_error(e.to_string()),
            }
        }

        aggregator.finish().map_err(Error::Pull)?;
        info!("Successfully pulled image: {}", name);
        Ok(())
    }
}

/// Whether any repo tag's repository portion (before the first `:`) equals
/// the given name.
fn repository_matches(repo_tags: &[String], name: &str) -> bool {
    repo_tags
        .iter()
        .any(|tag| tag.split(':').next() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_portion_must_match_exactly() {
        let tags = vec![
            "thenativeweb/app:latest".to_string(),
            "thenativeweb/app:1.2".to_string(),
        ];

        assert!(repository_matches(&tags, "thenativeweb/app"));
        assert!(!repository_matches(&tags, "thenativeweb/app-extra"));
        assert!(!repository_matches(&tags, "thenativeweb"));
    }

    #[test]
    fn untagged_images_do_not_match() {
        assert!(!repository_matches(&[], "thenativeweb/app"));
    }

    #[test]
    fn exact_matcher_compares_the_full_reference() {
        let matcher = ImageMatcher::from("thenativeweb/app");
        assert!(matcher.matches("thenativeweb/app"));
        assert!(!matcher.matches("thenativeweb/app:latest"));
    }

    #[test]
    fn pattern_matcher_uses_the_regex() {
        let matcher = ImageMatcher::from(Regex::new(r"^thenativeweb/").unwrap());
        assert!(matcher.matches("thenativeweb/app"));
        assert!(matcher.matches("thenativeweb/other"));
        assert!(!matcher.matches("library/alpine"));
    }

    #[tokio::test]
    #[ignore] // Requires a local Docker/Podman daemon
    async fn pull_of_missing_image_reports_one_error() {
        let client = DockClient::open_local().unwrap();
        let images = ImageManager::new(client);
        let result = images
            .download_image("thenativeweb/xxx-dockhand-test-xxx")
            .await;
        assert!(matches!(result, Err(Error::Pull(_))));
    }
}
