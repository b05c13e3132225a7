// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Time-bounded memoization. */

use {
    moka::future::Cache,
    std::{future::Future, sync::Arc, time::Duration},
};

/// An in-memory cache whose entries expire a fixed duration after insertion.
///
/// Keys are scoped to a namespace. Concurrent misses on the same key share a
/// single computation.
#[derive(Clone)]
pub struct TtlCache<V> {
    cache: Cache<String, V>,
    ttl: Duration,
}

fn scoped_key(namespace: &str, key: &str) -> String {
    format!("{}\0{}", namespace, key)
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Construct an instance whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
            ttl,
        }
    }

    /// How long entries are retained.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Obtain a value that has not expired.
    pub async fn get(&self, namespace: &str, key: &str) -> Option<V> {
        self.cache.get(&scoped_key(namespace, key)).await
    }

    /// Store a value.
    pub async fn insert(&self, namespace: &str, key: &str, value: V) {
        self.cache.insert(scoped_key(namespace, key), value).await;
    }

    /// Obtain a cached value or compute and store it.
    ///
    /// Errors from `compute` are returned and nothing is stored. Callers
    /// waiting on the same computation all receive the shared error.
    pub async fn get_or_try_compute<F, E>(
        &self,
        namespace: &str,
        key: &str,
        compute: F,
    ) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.cache
            .try_get_with(scoped_key(namespace, key), compute)
            .await
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    const DAY: Duration = Duration::from_secs(86400);

    #[tokio::test]
    async fn computes_once() {
        let cache = TtlCache::<String>::new(DAY);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_compute("ns", "key", async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>("value".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "value");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("ns", "key").await.as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn errors_not_stored() {
        let cache = TtlCache::<u32>::new(DAY);

        let res = cache
            .get_or_try_compute("ns", "key", async {
                Err::<u32, _>(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            })
            .await;
        assert_eq!(res.unwrap_err().to_string(), "boom");
        assert!(cache.get("ns", "key").await.is_none());

        let res = cache
            .get_or_try_compute("ns", "key", async { Ok::<_, std::io::Error>(42) })
            .await;
        assert_eq!(res.unwrap(), 42);
    }

    #[tokio::test]
    async fn namespaces() {
        let cache = TtlCache::<u32>::new(DAY);
        cache.insert("a", "key", 1).await;
        cache.insert("b", "key", 2).await;

        assert_eq!(cache.get("a", "key").await, Some(1));
        assert_eq!(cache.get("b", "key").await, Some(2));
        assert_eq!(cache.get("c", "key").await, None);
        assert_eq!(cache.ttl(), DAY);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = TtlCache::<u32>::new(Duration::from_millis(50));
        cache.insert("ns", "key", 1).await;
        assert_eq!(cache.get("ns", "key").await, Some(1));

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(cache.get("ns", "key").await, None);

        let value = cache
            .get_or_try_compute("ns", "key", async { Ok::<_, std::io::Error>(2) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }
}
