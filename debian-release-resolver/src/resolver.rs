// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolution of package releases across repository components.

[ReleaseResolver] ties everything together: a repository location expands to
component URLs, each component's `Packages` index is brought up to date in the
[IndexCache] and then scanned for the package. Per-component results are
merged, in component order, into a single [ReleaseResult].

A component that fails is logged and skipped. Resolution only fails as a
whole if the location is invalid or if every component failed.
*/

use {
    crate::{
        cache::IndexCache,
        config::ResolverConfig,
        control::parse_index_file,
        error::{ResolverError, Result},
        memo::TtlCache,
        release::ReleaseResult,
        repository::{
            location::{ComponentUrl, RepositoryLocation},
            IndexTransport, SchemeTransport,
        },
    },
    futures::StreamExt,
    log::{debug, error, warn},
    std::{sync::Arc, time::Duration},
};

/// Memoization namespace of parsed indices.
pub const PARSE_CACHE_NAMESPACE: &str = "debian-release-resolver/packages";

/// Default time parse results are retained in memory.
pub const DEFAULT_PARSE_CACHE_TTL: Duration = Duration::from_secs(86400);

/// Default number of components processed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What became of a single component.
#[derive(Debug)]
pub enum ComponentOutcome {
    /// The package is in the component's index.
    Found(ReleaseResult),
    /// The component's index was read but does not have the package.
    NotFound,
    /// The component's index could not be obtained or read.
    Failed(ResolverError),
}

/// The outcome of resolving a package in one component.
#[derive(Debug)]
pub struct ComponentResolution {
    pub component: ComponentUrl,
    pub outcome: ComponentOutcome,
}

/// A component whose homepage disagreed with the aggregate's.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HomepageMismatch {
    pub component: ComponentUrl,
    /// Homepage of the aggregate, which is kept.
    pub kept: Option<String>,
    /// Homepage of the component, which is ignored.
    pub ignored: Option<String>,
}

/// Per-component resolutions merged into one.
#[derive(Debug, Default)]
pub struct FoldedResults {
    /// The merged result. [None] if no component has the package.
    pub result: Option<ReleaseResult>,
    /// Components whose homepage was ignored, in component order.
    pub homepage_mismatches: Vec<HomepageMismatch>,
}

/// Merge per-component resolutions into a single result.
///
/// The first found result seeds the aggregate. Later ones append their
/// releases. A homepage differing from the aggregate's is logged, recorded
/// and ignored.
///
/// Failed components are logged and skipped. Errors if there were components
/// and all of them failed.
pub fn fold_component_results(
    location: &str,
    resolutions: impl IntoIterator<Item = ComponentResolution>,
) -> Result<FoldedResults> {
    let mut folded = FoldedResults::default();
    let mut total = 0;
    let mut failed = 0;

    for resolution in resolutions {
        total += 1;

        match resolution.outcome {
            ComponentOutcome::Found(result) => match folded.result.as_mut() {
                Some(aggregate) => {
                    let ignored = result.homepage.clone();

                    if aggregate.merge(result) {
                        warn!(
                            "homepage mismatch in {}: {:?} != {:?}; keeping the former",
                            resolution.component, aggregate.homepage, ignored
                        );

                        folded.homepage_mismatches.push(HomepageMismatch {
                            component: resolution.component,
                            kept: aggregate.homepage.clone(),
                            ignored,
                        });
                    }
                }
                None => {
                    folded.result = Some(result);
                }
            },
            ComponentOutcome::NotFound => {
                debug!("package not in {}", resolution.component);
            }
            ComponentOutcome::Failed(e) => {
                error!("skipping {}: {}", resolution.component, e);
                failed += 1;
            }
        }
    }

    if total > 0 && failed == total {
        Err(ResolverError::NoIndexAvailable(location.to_string()))
    } else {
        Ok(folded)
    }
}

/// Resolves releases of packages from Debian repositories.
pub struct ReleaseResolver {
    transport: Arc<dyn IndexTransport>,
    cache: IndexCache,
    parsed: TtlCache<Option<ReleaseResult>>,
    concurrency: usize,
}

impl ReleaseResolver {
    /// Construct an instance reading through a transport into an index cache.
    pub fn new(transport: Arc<dyn IndexTransport>, cache: IndexCache) -> Self {
        Self {
            transport,
            cache,
            parsed: TtlCache::new(DEFAULT_PARSE_CACHE_TTL),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Construct an instance from a [ResolverConfig].
    ///
    /// The index cache directory is created if missing.
    pub async fn from_config(config: &ResolverConfig) -> Result<Self> {
        let transport = SchemeTransport::new(config.user_agent.as_deref())?;
        let cache = IndexCache::new(&config.cache_dir, config.compressions.clone()).await?;

        let mut res = Self::new(Arc::new(transport), cache);
        res.set_parse_cache_ttl(config.parse_cache_ttl());
        res.set_concurrency(config.effective_concurrency());

        Ok(res)
    }

    /// Set how long parse results are retained in memory.
    ///
    /// Previously memoized results are discarded.
    pub fn set_parse_cache_ttl(&mut self, ttl: Duration) {
        self.parsed = TtlCache::new(ttl);
    }

    /// Set the maximum number of components processed at once.
    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.concurrency = concurrency.max(1);
    }

    /// The cache holding decompressed indices.
    pub fn index_cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Resolve a package in a single component.
    ///
    /// Parse results are memoized per index freshness token, so an index that
    /// was not refreshed is not scanned again.
    pub async fn resolve_component(
        &self,
        component: &ComponentUrl,
        package: &str,
    ) -> Result<Option<ReleaseResult>> {
        let index = self
            .cache
            .fetch_index(self.transport.as_ref(), component)
            .await?;

        let key = format!(
            "{}:{}:{}",
            index.path.display(),
            package,
            index.fresh_at_millis()
        );

        self.parsed
            .get_or_try_compute(PARSE_CACHE_NAMESPACE, &key, async {
                debug!("scanning {} for {}", index.path.display(), package);
                parse_index_file(&index.path, package).await
            })
            .await
            .map_err(|e| Arc::try_unwrap(e).unwrap_or_else(ResolverError::Shared))
    }

    /// Resolve a package in every component of a location.
    ///
    /// Resolutions are in component order regardless of completion order.
    pub async fn resolve_components(
        &self,
        location: &RepositoryLocation,
        package: &str,
    ) -> Result<Vec<ComponentResolution>> {
        let components = location.component_urls()?;

        Ok(futures::stream::iter(components)
            .map(|component| async move {
                let outcome = match self.resolve_component(&component, package).await {
                    Ok(Some(result)) => ComponentOutcome::Found(result),
                    Ok(None) => ComponentOutcome::NotFound,
                    Err(e) => ComponentOutcome::Failed(e),
                };

                ComponentResolution { component, outcome }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await)
    }

    /// Resolve releases of a package at a repository location, with details.
    pub async fn resolve_folded(&self, location: &str, package: &str) -> Result<FoldedResults> {
        let location = RepositoryLocation::parse(location)?;

        let resolutions = self.resolve_components(&location, package).await?;

        fold_component_results(location.location(), resolutions)
    }

    /// Resolve releases of a package at a repository location.
    ///
    /// Resolves to [None] if no component has the package.
    pub async fn resolve(&self, location: &str, package: &str) -> Result<Option<ReleaseResult>> {
        Ok(self.resolve_folded(location, package).await?.result)
    }
}
