//! Best-effort media metadata for new links
//!
//! When a target points at a known music or video host, the creation
//! transaction asks an external metadata service about it before committing.
//! The lookup is bounded by a timeout and every failure is logged and turned
//! into "no enrichment"; it can never fail a link creation.

use std::time::Duration;

use url::Url;

use crate::error::EnrichmentError;
use crate::model::MediaInfo;

/// Hosts whose links the metadata service knows how to describe
///
/// Matches the host itself and any subdomain of it.
const MEDIA_HOSTS: &[&str] = &[
    "open.spotify.com",
    "music.apple.com",
    "soundcloud.com",
    "youtube.com",
    "youtu.be",
    "music.youtube.com",
    "bandcamp.com",
    "tidal.com",
    "deezer.com",
];

/// Returns true if `target` is a link the metadata service can describe.
pub fn is_enrichable(target: &Url) -> bool {
    let Some(host) = target.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    MEDIA_HOSTS.iter().any(|media| {
        host == *media
            || host
                .strip_suffix(media)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[derive(Clone)]
pub struct Enricher {
    http: reqwest::Client,
    endpoint: Option<Url>,
    timeout: Duration,
}

impl Enricher {
    /// Creates an enricher calling `endpoint`; `None` (or an endpoint that
    /// does not parse) disables enrichment.
    pub fn new(endpoint: Option<&str>, timeout: Duration) -> Self {
        let endpoint = endpoint.and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(endpoint = raw, %err, "invalid enrichment endpoint, enrichment disabled");
                None
            }
        });

        let http = reqwest::Client::builder()
            .user_agent(concat!("chatlink/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint,
            timeout,
        }
    }

    /// Looks up metadata for `target`.
    ///
    /// Returns `None` when enrichment is disabled, the target is not on a
    /// media host, or the lookup fails in any way.
    pub async fn lookup(&self, target: &Url) -> Option<MediaInfo> {
        let endpoint = self.endpoint.as_ref()?;
        if !is_enrichable(target) {
            return None;
        }

        match self.fetch(endpoint, target).await {
            Ok(info) => {
                tracing::debug!(target = %target, "attached media info");
                Some(info)
            }
            Err(err) => {
                tracing::warn!(target = %target, %err, "media info lookup failed, continuing without it");
                None
            }
        }
    }

    async fn fetch(&self, endpoint: &Url, target: &Url) -> Result<MediaInfo, EnrichmentError> {
        let mut request_url = endpoint.clone();
        request_url
            .query_pairs_mut()
            .append_pair("link", target.as_str());

        let request = async {
            let response = self.http.get(request_url).send().await?.error_for_status()?;
            Ok::<_, EnrichmentError>(response.json::<MediaInfo>().await?)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| EnrichmentError::Timeout(self.timeout.as_millis()))?
    }
}
