//! Lazily resolved, failure-resettable attribute cache.
//!
//! The cache moves between three states under a lock:
//!
//! - `Empty`: nothing known. The next `get` starts a fetch.
//! - `Resolving`: a fetch is in flight; every non-forced caller awaits the
//!   same shared future and sees the same outcome. A forced caller starts a
//!   newer generation, and only the newest generation may settle the state.
//! - `Ready`: snapshot available; `get(false)` returns it under a read lock.
//!
//! A failed fetch drops back to `Empty`, so the next caller tries again.

use crate::error::{ClientError, Result};
use crate::protocol::{HEADER_AUTHORIZATION, PARAM_ATTRS};
use eas_queue_core::{Attributes, AttributesCodec, Tags};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where attribute snapshots come from.
pub trait AttributeSource: Send + Sync + 'static {
    fn fetch(&self) -> BoxFuture<'static, Result<Attributes>>;
}

type FetchOutcome = std::result::Result<Arc<Attributes>, Arc<ClientError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

enum CacheState {
    Empty,
    Resolving { generation: u64, fetch: SharedFetch },
    Ready(Arc<Attributes>),
}

struct Inner {
    state: CacheState,
    generation: u64,
}

/// Shared cache of the server's attribute snapshot.
pub struct AttributeCache {
    source: Arc<dyn AttributeSource>,
    inner: RwLock<Inner>,
}

impl AttributeCache {
    pub fn new(source: Arc<dyn AttributeSource>) -> Self {
        Self {
            source,
            inner: RwLock::new(Inner {
                state: CacheState::Empty,
                generation: 0,
            }),
        }
    }

    /// Current snapshot, fetching it if needed. `force` always starts a new
    /// fetch; one already in flight is superseded and its result discarded.
    pub async fn get(&self, force: bool) -> Result<Arc<Attributes>> {
        if !force {
            if let CacheState::Ready(attrs) = &self.inner.read().await.state {
                return Ok(attrs.clone());
            }
        }

        let (generation, fetch) = {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;
            match &inner.state {
                CacheState::Ready(attrs) if !force => return Ok(attrs.clone()),
                CacheState::Resolving { generation, fetch } if !force => {
                    (*generation, fetch.clone())
                }
                _ => {
                    inner.generation += 1;
                    let fetch = self.start_fetch();
                    inner.state = CacheState::Resolving {
                        generation: inner.generation,
                        fetch: fetch.clone(),
                    };
                    (inner.generation, fetch)
                }
            }
        };

        let outcome = fetch.await;

        let mut inner = self.inner.write().await;
        let current = matches!(
            &inner.state,
            CacheState::Resolving { generation: g, .. } if *g == generation
        );
        if current {
            inner.state = match &outcome {
                Ok(attrs) => CacheState::Ready(attrs.clone()),
                Err(_) => CacheState::Empty,
            };
        }
        outcome.map_err(ClientError::Attributes)
    }

    #[cfg(test)]
    async fn is_ready(&self) -> bool {
        matches!(self.inner.read().await.state, CacheState::Ready(_))
    }

    fn start_fetch(&self) -> SharedFetch {
        tracing::debug!("fetching queue attributes");
        self.source
            .fetch()
            .map(|result| match result {
                Ok(attrs) => Ok(Arc::new(attrs)),
                Err(e) => {
                    tracing::debug!("attribute fetch failed: {}", e);
                    Err(Arc::new(e))
                }
            })
            .boxed()
            .shared()
    }
}

/// Fetches attributes with `GET <queue>?_attrs_=true`.
pub struct HttpAttributeSource {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
    codec: Arc<dyn AttributesCodec>,
}

impl HttpAttributeSource {
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        token: Option<String>,
        codec: Arc<dyn AttributesCodec>,
    ) -> Self {
        let url = crate::protocol::target(
            base_url,
            &[(PARAM_ATTRS, "true".to_string())],
            &Tags::new(),
        );
        Self {
            http,
            url,
            token: token.filter(|t| !t.is_empty()),
            codec,
        }
    }
}

impl AttributeSource for HttpAttributeSource {
    fn fetch(&self) -> BoxFuture<'static, Result<Attributes>> {
        let http = self.http.clone();
        let url = self.url.clone();
        let token = self.token.clone();
        let codec = self.codec.clone();
        async move {
            let mut request = http
                .get(url.clone())
                .header(reqwest::header::ACCEPT, codec.media_type());
            if let Some(token) = token {
                request = request.header(HEADER_AUTHORIZATION, token);
            }
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            if status != reqwest::StatusCode::OK {
                return Err(ClientError::Protocol {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                });
            }
            Ok(codec.decode(&body)?)
        }
        .boxed()
    }
}
