// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolve package releases from Debian repositories.

This crate answers the question *which versions of package X does this Debian
repository publish?* It reads binary package indices (`Packages` files)
straight from repositories, keeping a local cache of them so that repeated
queries against an unchanged repository cost a single conditional request per
component.

The canonical home of this crate is <https://github.com/indygreg/PyOxidizer>. Please file issues
and pull requests there.

# A Tour of Functionality

Repositories are addressed by *repository locations*: the URL of a repository
root with query parameters selecting the release, components and binary
architecture. e.g.
`https://deb.debian.org/debian?suite=stable&components=main,contrib&binaryArch=amd64`.
[repository::location::RepositoryLocation] parses these and derives the URL of
each component's index directory ([repository::location::ComponentUrl]).

All remote reads go through the [repository::IndexTransport] trait.
[repository::http::HttpTransport] (behind the `http` feature) and
[repository::filesystem::FilesystemTransport] implement it for HTTP and local
repositories. [repository::SchemeTransport] picks between them by URL scheme.
[repository::fetch::fetch_compressed_index] downloads an index only if the
remote copy changed since a given time.

[cache::IndexCache] maintains decompressed indices on disk, named by the
SHA-256 of their component URL. Decompression primitives live in [io].

[control] scans an index for the stanza describing a package, stopping as soon
as it is found. Its output is a [release::ReleaseResult].

[resolver::ReleaseResolver] ties these together, processing components
concurrently and merging their results in component order. Parse results are
memoized in a [memo::TtlCache]. [config::ResolverConfig] holds the knobs.

# Crate Features

The optional and enabled-by-default `http` feature enables HTTP client
support for reading repositories.
*/

pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod io;
pub mod memo;
pub mod release;
pub mod repository;
pub mod resolver;
#[cfg(test)]
mod testutil;
