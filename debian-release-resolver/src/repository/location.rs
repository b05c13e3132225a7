// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parameterized repository locations.

A repository location is the URL of a repository root carrying query
parameters that select what to read from it. e.g.
`https://deb.debian.org/debian?suite=stable&components=main,contrib&binaryArch=amd64`.

| Parameter | Meaning |
|---|---|
| `components` | Comma delimited component names. Required. |
| `binaryArch` | Architecture of binary packages. Required. |
| `release` | Release codename. e.g. `bookworm`. |
| `suite` | Release alias. e.g. `stable`. Only consulted if `release` is absent. |

Each component resolves to the directory holding its binary package indices,
`<root>/dists/<release>/<component>/binary-<arch>`.
*/

use {
    crate::{
        error::{ResolverError, Result},
        io::Compression,
    },
    std::{fmt::Formatter, str::FromStr},
    url::Url,
};

/// Query parameter holding component names.
pub const COMPONENTS_PARAMETER: &str = "components";

/// Query parameter holding the binary architecture.
pub const BINARY_ARCH_PARAMETER: &str = "binaryArch";

/// Query parameters selecting the release, in priority order.
pub const RELEASE_SELECTOR_PARAMETERS: [&str; 2] = ["release", "suite"];

fn is_recognized_parameter(name: &str) -> bool {
    name == COMPONENTS_PARAMETER
        || name == BINARY_ARCH_PARAMETER
        || RELEASE_SELECTOR_PARAMETERS.contains(&name)
}

/// A parsed repository location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepositoryLocation {
    /// The location as it was given to us.
    location: String,
    /// Root URL of the repository, with recognized parameters removed.
    root_url: Url,
    components: Vec<String>,
    binary_arch: String,
    release: String,
}

impl RepositoryLocation {
    /// Parse a repository location string.
    ///
    /// Fails if the string isn't a URL usable as a base or if a required
    /// parameter is missing. Empty parameter values count as missing.
    pub fn parse(location: &str) -> Result<Self> {
        let mut root_url =
            Url::parse(location).map_err(|e| ResolverError::InvalidRepositoryLocation {
                location: location.to_string(),
                reason: e.to_string(),
            })?;

        if root_url.cannot_be_a_base() {
            return Err(ResolverError::InvalidRepositoryLocation {
                location: location.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let pairs = root_url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect::<Vec<_>>();

        let parameter = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
        };

        let missing = |parameter| ResolverError::MissingLocationParameter {
            location: location.to_string(),
            parameter,
        };

        let mut components: Vec<String> = vec![];
        for component in parameter(COMPONENTS_PARAMETER)
            .ok_or_else(|| missing(COMPONENTS_PARAMETER))?
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            if !components.iter().any(|c| c == component) {
                components.push(component.to_string());
            }
        }

        if components.is_empty() {
            return Err(missing(COMPONENTS_PARAMETER));
        }

        let binary_arch = parameter(BINARY_ARCH_PARAMETER)
            .ok_or_else(|| missing(BINARY_ARCH_PARAMETER))?
            .to_string();

        let release = RELEASE_SELECTOR_PARAMETERS
            .iter()
            .find_map(|name| parameter(*name))
            .ok_or_else(|| ResolverError::NoReleaseSelector(location.to_string()))?
            .to_string();

        let retained = pairs
            .iter()
            .filter(|(k, _)| !is_recognized_parameter(k))
            .collect::<Vec<_>>();

        if retained.is_empty() {
            root_url.set_query(None);
        } else {
            root_url.query_pairs_mut().clear().extend_pairs(retained);
        }

        Ok(Self {
            location: location.to_string(),
            root_url,
            components,
            binary_arch,
            release,
        })
    }

    /// The location string this instance was parsed from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Root URL of the repository.
    ///
    /// Only `components`, `binaryArch`, `release` and `suite` are removed.
    /// Every other query parameter, including ones other location consumers
    /// may attach meaning to, is preserved and sent to the repository.
    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    /// Names of components, in the order they were specified.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|s| s.as_str())
    }

    /// The binary architecture.
    pub fn binary_arch(&self) -> &str {
        &self.binary_arch
    }

    /// The resolved release selector value.
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Derive the [ComponentUrl] for a named component.
    pub fn component_url(&self, component: &str) -> Result<ComponentUrl> {
        let mut url = self.root_url.clone();

        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|_| ResolverError::InvalidRepositoryLocation {
                        location: self.location.clone(),
                        reason: "URL cannot be used as a base".to_string(),
                    })?;

            // Release and component values like `bullseye/updates` span directories.
            segments
                .pop_if_empty()
                .push("dists")
                .extend(self.release.split('/').filter(|s| !s.is_empty()))
                .extend(component.split('/').filter(|s| !s.is_empty()))
                .push(&format!("binary-{}", self.binary_arch));
        }

        Ok(ComponentUrl {
            component: component.to_string(),
            url,
        })
    }

    /// Derive the [ComponentUrl] of every component, in component order.
    pub fn component_urls(&self) -> Result<Vec<ComponentUrl>> {
        self.components()
            .map(|component| self.component_url(component))
            .collect::<Result<Vec<_>>>()
    }
}

impl FromStr for RepositoryLocation {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse a repository location and derive its component URLs.
pub fn resolve_component_urls(location: &str) -> Result<Vec<ComponentUrl>> {
    RepositoryLocation::parse(location)?.component_urls()
}

/// URL of the directory holding the binary package indices of one component.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ComponentUrl {
    component: String,
    url: Url,
}

impl ComponentUrl {
    /// Name of the component.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The URL of the component's index directory.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL of the component's index directory, as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// URL of the `Packages` index compressed in a given format.
    pub fn packages_url(&self, compression: Compression) -> Result<Url> {
        let mut url = self.url.clone();

        url.path_segments_mut()
            .map_err(|_| ResolverError::InvalidRepositoryLocation {
                location: self.url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?
            .push(&format!("Packages{}", compression.extension()));

        Ok(url)
    }
}

impl std::fmt::Display for ComponentUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
