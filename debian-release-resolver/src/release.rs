// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolved package releases. */

use {
    crate::control::{PackageStanza, StanzaField},
    serde::{Deserialize, Serialize},
};

/// A single known release of a package.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Release {
    /// The version string, as it appears in the index.
    pub version: String,
}

/// Known releases of a package and metadata about it.
///
/// Releases retain the order they were discovered in. They are neither sorted
/// nor deduplicated.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReleaseResult {
    pub releases: Vec<Release>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl ReleaseResult {
    /// Construct an instance from a matched stanza.
    ///
    /// A release is only recorded if the stanza has a `Version`.
    pub fn from_stanza(stanza: &PackageStanza) -> Self {
        Self {
            releases: stanza
                .get(&StanzaField::Version)
                .map(|version| Release {
                    version: version.clone(),
                })
                .into_iter()
                .collect(),
            homepage: stanza.get(&StanzaField::Homepage).cloned(),
        }
    }

    /// Iterate over the version strings of releases.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.releases.iter().map(|r| r.version.as_str())
    }

    /// Append the releases of another result to this one.
    ///
    /// Our homepage is kept. Returns whether the other homepage disagreed with it.
    pub fn merge(&mut self, other: ReleaseResult) -> bool {
        let conflict = self.homepage != other.homepage;
        self.releases.extend(other.releases);

        conflict
    }
}
