use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::assets::decode::{DecodedImage, decode_image};
use crate::foundation::error::{ImageLoadError, KomaError, KomaResult};

/// Source of raw image bytes for a URL.
///
/// Implementations must honour `timeout` for a single attempt; retries are handled by
/// [`ImageLoader`].
pub trait ImageFetcher: Send + Sync {
    /// Fetch the encoded bytes behind `url`.
    fn fetch(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>>;
}

/// Normalize a relative asset path: forward slashes, no `.`/empty segments, no `..`.
pub(crate) fn normalize_rel_path(source: &str) -> KomaResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(KomaError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(KomaError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(KomaError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(KomaError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Reads `file://` URLs and paths relative to an assets root.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    /// Fetcher resolving relative paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Assets root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> anyhow::Result<PathBuf> {
        if let Some(rest) = url.strip_prefix("file://") {
            // file:///abs/path and file://relative/path both map onto the local filesystem.
            let p = Path::new(rest);
            if p.is_absolute() {
                return Ok(p.to_path_buf());
            }
            return Ok(self.root.join(normalize_rel_path(rest)?));
        }
        Ok(self.root.join(normalize_rel_path(url)?))
    }
}

impl ImageFetcher for FsFetcher {
    fn fetch(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(url)?;
        std::fs::read(&path).with_context(|| format!("read image file '{}'", path.display()))
    }
}

/// Decode a `data:` URL into its payload bytes.
///
/// Base64 payloads (`;base64,`) are decoded; anything else is percent-decoded.
pub fn decode_data_url(url: &str) -> anyhow::Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .context("data URL must start with 'data:'")?;
    let (meta, payload) = rest
        .split_once(',')
        .context("data URL is missing the ',' separator")?;
    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        return STANDARD
            .decode(cleaned.as_bytes())
            .context("decode base64 data URL payload");
    }
    percent_decode(payload)
}

fn percent_decode(s: &str) -> anyhow::Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            let Some(b) = hex else {
                bail!("invalid percent escape at byte {i}");
            };
            out.push(b);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Blocking HTTP(S) fetcher.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Build a client with a short connect timeout.
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        let bytes = resp.bytes().with_context(|| format!("read body of {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Dispatches on URL scheme: `data:`, `http(s)://`, otherwise the filesystem.
#[derive(Clone, Debug)]
pub struct DefaultFetcher {
    fs: FsFetcher,
    #[cfg(feature = "http")]
    http: Option<HttpFetcher>,
}

impl DefaultFetcher {
    /// Fetcher with relative paths resolved under `assets_root`.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            fs: FsFetcher::new(assets_root),
            #[cfg(feature = "http")]
            http: match HttpFetcher::new() {
                Ok(h) => Some(h),
                Err(e) => {
                    tracing::warn!(error = %e, "http client unavailable; remote images will fail");
                    None
                }
            },
        }
    }
}

impl ImageFetcher for DefaultFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            #[cfg(feature = "http")]
            {
                let Some(http) = &self.http else {
                    bail!("http client unavailable for {url}");
                };
                return http.fetch(url, timeout);
            }
            #[cfg(not(feature = "http"))]
            bail!("remote image '{url}' requires the 'http' feature");
        }
        self.fs.fetch(url, timeout)
    }
}

/// Image loading policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageLoadOpts {
    /// Timeout for a single attempt.
    pub timeout: Duration,
    /// Total attempts before giving up (at least 1).
    pub attempts: u32,
    /// Linear backoff step: the wait after failed attempt `n` is `n * backoff_step`.
    pub backoff_step: Duration,
    /// Oversampling applied when rasterizing SVG sources.
    pub svg_scale: f32,
}

impl Default for ImageLoadOpts {
    fn default() -> Self {
        let timeout_ms = std::env::var("KOMA_IMAGE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(10_000);
        let attempts = std::env::var("KOMA_IMAGE_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(3);
        Self {
            timeout: Duration::from_millis(timeout_ms),
            attempts,
            backoff_step: Duration::from_millis(250),
            svg_scale: 3.0,
        }
    }
}

impl ImageLoadOpts {
    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the attempt count (clamped to at least 1).
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Override the backoff step.
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Override the SVG oversampling factor.
    pub fn with_svg_scale(mut self, scale: f32) -> Self {
        self.svg_scale = scale;
        self
    }
}

type LoadResult = Result<Arc<DecodedImage>, ImageLoadError>;
type Slot = Arc<OnceLock<LoadResult>>;

/// Memoizing URL → [`DecodedImage`] loader shared across threads.
///
/// A second caller for a URL that is already loading blocks on the same slot instead of
/// fetching again. Failures are returned to every waiter and then evicted, so a later call
/// retries from scratch.
pub struct ImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    opts: ImageLoadOpts,
    cache: Mutex<HashMap<String, Slot>>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("opts", &self.opts)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl ImageLoader {
    /// Loader over `fetcher` with `opts`.
    pub fn new(fetcher: Arc<dyn ImageFetcher>, opts: ImageLoadOpts) -> Self {
        Self {
            fetcher,
            opts,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loader over a [`DefaultFetcher`] rooted at `assets_root`, default options.
    pub fn with_assets_root(assets_root: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(DefaultFetcher::new(assets_root)),
            ImageLoadOpts::default(),
        )
    }

    /// Active options.
    pub fn opts(&self) -> &ImageLoadOpts {
        &self.opts
    }

    /// Load and decode `url`, joining any in-flight load of the same URL.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load(&self, url: &str) -> LoadResult {
        let slot = {
            let mut cache = self.cache.lock();
            if let Some(slot) = cache.get(url) {
                tracing::debug!("image cache hit");
                slot.clone()
            } else {
                let slot = Slot::default();
                cache.insert(url.to_owned(), slot.clone());
                slot
            }
        };

        let result = slot.get_or_init(|| self.load_uncached(url)).clone();

        if result.is_err() {
            let mut cache = self.cache.lock();
            if cache.get(url).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                cache.remove(url);
            }
        }
        result
    }

    /// Load every URL in parallel, ignoring failures; results stay cached for [`load`](Self::load).
    pub fn prefetch<'a>(&self, urls: impl IntoIterator<Item = &'a str>) {
        let mut urls: Vec<&str> = urls.into_iter().collect();
        urls.sort_unstable();
        urls.dedup();
        urls.par_iter().for_each(|url| {
            if let Err(e) = self.load(url) {
                tracing::debug!(error = %e, "prefetch failed");
            }
        });
    }

    /// Number of cached (or in-flight) entries.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop every cached image.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn load_uncached(&self, url: &str) -> LoadResult {
        let attempts = self.opts.attempts.max(1);
        if url.trim().is_empty() {
            return Err(ImageLoadError {
                url: url.to_owned(),
                attempts: 0,
                message: "empty image url".to_owned(),
            });
        }

        let mut last = String::new();
        for attempt in 1..=attempts {
            let outcome = self
                .fetcher
                .fetch(url, self.opts.timeout)
                .and_then(|bytes| {
                    decode_image(&bytes, self.opts.svg_scale).map_err(anyhow::Error::from)
                });
            match outcome {
                Ok(img) => return Ok(Arc::new(img)),
                Err(e) => {
                    last = format!("{e:#}");
                    tracing::debug!(attempt, error = %last, "image load attempt failed");
                    if attempt < attempts {
                        std::thread::sleep(self.opts.backoff_step * attempt);
                    }
                }
            }
        }

        Err(ImageLoadError {
            url: url.to_owned(),
            attempts,
            message: last,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
