// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Streaming extraction of package stanzas from `Packages` indices.

A `Packages` index is a series of paragraphs (stanzas) separated by blank
lines. Each stanza is a set of `Key: value` fields describing one binary
package. See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>.

Only the handful of fields needed to describe releases are retained. Folded
and multiline values are not reassembled: continuation lines are ignored.
*/

use {
    crate::{error::Result, io::open_read, release::ReleaseResult},
    futures::{AsyncBufRead, AsyncBufReadExt},
    std::{collections::HashMap, path::Path},
    strum::IntoEnumIterator,
    strum_macros::{AsRefStr, Display, EnumIter},
};

/// Stanza fields we extract.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
pub enum StanzaField {
    Package,
    Version,
    Homepage,
}

/// Recognized fields of a single stanza.
pub type PackageStanza = HashMap<StanzaField, String>;

/// Attempt to interpret a line as a recognized field.
///
/// Field names are case sensitive. Fields are tested in declaration order and
/// the first match wins.
pub fn match_line(line: &str) -> Option<(StanzaField, &str)> {
    StanzaField::iter().find_map(|field| {
        line.strip_prefix(field.as_ref())
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|value| (field, value.trim()))
    })
}

/// Find the stanza for a package in a `Packages` index stream.
///
/// Stops reading once the package is found. The final stanza does not need to
/// be followed by a blank line. Lines are decoded as UTF-8, replacing invalid
/// sequences.
pub async fn find_package_stanza<R>(reader: &mut R, package: &str) -> Result<Option<PackageStanza>>
where
    R: AsyncBufRead + Unpin,
{
    let mut stanza = PackageStanza::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();

        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);

        if line.trim().is_empty() {
            if is_package(&stanza, package) {
                return Ok(Some(stanza));
            }

            stanza.clear();
        } else if let Some((field, value)) = match_line(&line) {
            stanza.insert(field, value.to_string());
        }
    }

    Ok(if is_package(&stanza, package) {
        Some(stanza)
    } else {
        None
    })
}

fn is_package(stanza: &PackageStanza, package: &str) -> bool {
    stanza.get(&StanzaField::Package).map(|p| p.as_str()) == Some(package)
}

/// Resolve releases of a package from a decompressed `Packages` index file.
pub async fn parse_index_file(path: &Path, package: &str) -> Result<Option<ReleaseResult>> {
    let mut reader = Box::pin(open_read(path).await?);

    Ok(find_package_stanza(&mut reader, package)
        .await?
        .map(|stanza| ReleaseResult::from_stanza(&stanza)))
}

#[cfg(test)]
mod test {
    use {super::*, indoc::indoc};

    const INDEX: &str = indoc! {"
        Package: A
        Version: 1.0
        Homepage: h1
        Description: first package
         continued description

        Package: B
        Version: 2.0
    "};

    async fn find(data: &str, package: &str) -> Option<PackageStanza> {
        let mut reader = futures::io::Cursor::new(data.as_bytes().to_vec());
        find_package_stanza(&mut reader, package).await.unwrap()
    }

    #[test]
    fn line_matching() {
        assert_eq!(match_line("Package: foo\n"), Some((StanzaField::Package, "foo")));
        assert_eq!(match_line("Version:1.0"), Some((StanzaField::Version, "1.0")));
        assert_eq!(
            match_line("Homepage: https://foo.example/ \r\n"),
            Some((StanzaField::Homepage, "https://foo.example/"))
        );
        assert_eq!(match_line("Package-Type: udeb"), None);
        assert_eq!(match_line("package: foo"), None);
        assert_eq!(match_line(" Package: foo"), None);
        assert_eq!(match_line("Description: foo"), None);
    }

    #[tokio::test]
    async fn find_stanzas() {
        let a = find(INDEX, "A").await.unwrap();
        assert_eq!(a.get(&StanzaField::Version).unwrap(), "1.0");
        assert_eq!(a.get(&StanzaField::Homepage).unwrap(), "h1");

        // Last stanza without a trailing blank line.
        let b = find(INDEX.trim_end(), "B").await.unwrap();
        assert_eq!(b.get(&StanzaField::Version).unwrap(), "2.0");
        assert!(b.get(&StanzaField::Homepage).is_none());

        assert!(find(INDEX, "C").await.is_none());
        assert!(find("", "A").await.is_none());
    }

    #[tokio::test]
    async fn fields_do_not_leak_between_stanzas() {
        let data = indoc! {"
            Package: A
            Version: 1.0
            Homepage: h1

            Package: B
        "};

        let b = find(data, "B").await.unwrap();
        assert!(b.get(&StanzaField::Version).is_none());
        assert!(b.get(&StanzaField::Homepage).is_none());
    }

    #[tokio::test]
    async fn crlf_and_whitespace_delimiters() {
        let data = "Package: A\r\nVersion: 1.0\r\n  \r\nPackage: B\r\nVersion: 2.0\r\n";

        assert_eq!(
            find(data, "A").await.unwrap().get(&StanzaField::Version).unwrap(),
            "1.0"
        );
        assert_eq!(
            find(data, "B").await.unwrap().get(&StanzaField::Version).unwrap(),
            "2.0"
        );
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_scan() {
        let data = b"Package: X\nVersion: 0.1\nDescription: caf\xe9\n\nPackage: A\nVersion: 1.0\n";
        let mut reader = futures::io::Cursor::new(data.to_vec());

        let a = find_package_stanza(&mut reader, "A").await.unwrap().unwrap();
        assert_eq!(a.get(&StanzaField::Version).unwrap(), "1.0");

        let data = b"Package: A\nVersion: 1.0\nHomepage: https://caf\xe9.example/\n";
        let mut reader = futures::io::Cursor::new(data.to_vec());

        let a = find_package_stanza(&mut reader, "A").await.unwrap().unwrap();
        assert_eq!(
            a.get(&StanzaField::Homepage).unwrap(),
            "https://caf\u{fffd}.example/"
        );
    }

    #[tokio::test]
    async fn later_field_replaces_earlier() {
        let data = indoc! {"
            Package: A
            Version: 1.0
            Version: 1.1
        "};

        assert_eq!(
            find(data, "A").await.unwrap().get(&StanzaField::Version).unwrap(),
            "1.1"
        );
    }

    #[tokio::test]
    async fn parse_file() -> Result<()> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("Packages");
        std::fs::write(&path, INDEX)?;

        let a = parse_index_file(&path, "A").await?.unwrap();
        assert_eq!(a.versions().collect::<Vec<_>>(), vec!["1.0"]);
        assert_eq!(a.homepage.as_deref(), Some("h1"));

        let b = parse_index_file(&path, "B").await?.unwrap();
        assert_eq!(b.versions().collect::<Vec<_>>(), vec!["2.0"]);
        assert_eq!(b.homepage, None);

        assert!(parse_index_file(&path, "C").await?.is_none());

        assert!(parse_index_file(&td.path().join("missing"), "A")
            .await
            .is_err());

        Ok(())
    }
}
