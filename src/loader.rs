//! The creation function a cache calls on a miss.

/// Builds a resource for a key.
///
/// Any `FnMut(&K) -> Result<T, E>` is a loader. Loaders that need a backend
/// context (a device, a file system root) carry it as their own state
/// instead of reaching for a global:
///
/// ```
/// use resource_cache::{CacheConfig, Loader, ResourceCache};
///
/// struct ShaderLoader {
///     compiled: u32,
/// }
///
/// impl Loader<String> for ShaderLoader {
///     type Resource = String;
///     type Error = std::convert::Infallible;
///
///     fn load(&mut self, key: &String) -> Result<String, Self::Error> {
///         self.compiled += 1;
///         Ok(format!("program<{key}>"))
///     }
/// }
///
/// let mut cache: ResourceCache<String, _> =
///     ResourceCache::new(CacheConfig::default(), ShaderLoader { compiled: 0 });
/// let p = cache.get("blit").unwrap();
/// assert_eq!(&*p, "program<blit>");
/// assert_eq!(cache.loader().compiled, 1);
/// ```
pub trait Loader<K> {
    type Resource;
    type Error;

    /// Called exactly once per cache miss. An error is handed back to the
    /// caller of `get` as is; nothing is cached for the key.
    fn load(&mut self, key: &K) -> Result<Self::Resource, Self::Error>;
}

impl<K, T, E, F> Loader<K> for F
where
    F: FnMut(&K) -> Result<T, E>,
{
    type Resource = T;
    type Error = E;

    fn load(&mut self, key: &K) -> Result<T, E> {
        self(key)
    }
}
