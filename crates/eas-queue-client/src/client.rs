//! Queue client.
//!
//! Every request is built from the queue URL plus query parameters and
//! carries the user identity under the header names published in the
//! server's attributes. Synchronous operations make exactly one round trip
//! and never retry; watches are handed to the transports in [`crate::watch`].

use crate::attributes::{AttributeCache, HttpAttributeSource};
use crate::config::{QueueConfig, WatchMode};
use crate::error::{ClientError, Result};
use crate::protocol::{self, *};
use crate::watch::{PullTransport, PushConnector, ReconnectingWatcher, Watcher};
use eas_queue_core::{
    Attributes, AttributesCodec, Frame, FrameCodec, NegativeCode, Priority, QueueUser, Tags,
};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode, Url};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Client for one queue.
pub struct QueueClient {
    http: reqwest::Client,
    base_url: Url,
    user: QueueUser,
    extra_headers: BTreeMap<String, String>,
    watch_mode: WatchMode,
    attributes: Arc<AttributeCache>,
    frame_codec: Arc<dyn FrameCodec>,
}

impl QueueClient {
    /// Client using the codecs named by the config's wire format.
    pub fn new(config: QueueConfig) -> Result<Self> {
        let format = config.wire_format;
        Self::with_codecs(config, format.frame_codec(), format.attributes_codec())
    }

    pub fn with_codecs(
        config: QueueConfig,
        frame_codec: Arc<dyn FrameCodec>,
        attributes_codec: Arc<dyn AttributesCodec>,
    ) -> Result<Self> {
        let base_url = config.base_url()?;
        let user = config.user();
        let http = reqwest::Client::new();
        let source = HttpAttributeSource::new(
            http.clone(),
            &base_url,
            user.token().map(str::to_string),
            attributes_codec,
        );
        tracing::debug!("queue client for {} as {}", base_url, user);

        Ok(Self {
            http,
            base_url,
            user,
            extra_headers: config.extra_headers,
            watch_mode: config.watch_mode,
            attributes: Arc::new(AttributeCache::new(Arc::new(source))),
            frame_codec,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user(&self) -> &QueueUser {
        &self.user
    }

    pub fn watch_mode(&self) -> WatchMode {
        self.watch_mode
    }

    /// Re-fetch the server attributes.
    pub async fn attributes(&self) -> Result<Arc<Attributes>> {
        self.attributes.get(true).await
    }

    /// Enqueue `data`. Returns its index and the server's request id.
    pub async fn put(&self, data: impl Into<Vec<u8>>, tags: &Tags) -> Result<(u64, String)> {
        self.put_with_priority(data, tags, Priority::NORMAL).await
    }

    /// Enqueue with a priority. Prioritized data reaches watchers before
    /// normal data.
    ///
    /// The response body must hold the assigned index. A `204 No Content`
    /// is accepted as a status but, having no body, fails with
    /// [`ClientError::InvalidIndex`].
    pub async fn put_with_priority(
        &self,
        data: impl Into<Vec<u8>>,
        tags: &Tags,
        priority: Priority,
    ) -> Result<(u64, String)> {
        let url = protocol::target(&self.base_url, &[], tags);
        let request = self.http.post(url.clone()).body(data.into());
        let request = self.with_identity(request).await?;
        let request = self.with_authorization(request);
        let request = self.with_priority(request, priority).await?;
        let request = self.with_extra_headers(request);

        let response = request.send().await?;
        let status = response.status();
        let request_id = response
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            return Err(unexpected(&url, status, body));
        }

        let index = body
            .trim()
            .parse()
            .map_err(|_| ClientError::InvalidIndex(body.clone()))?;
        Ok((index, request_id))
    }

    /// Read up to `length` frames starting at `index` (0 = queue head),
    /// waiting at most `timeout` for data.
    pub async fn get(
        &self,
        index: u64,
        length: usize,
        timeout: Duration,
        auto_delete: bool,
        tags: &Tags,
    ) -> Result<Vec<Frame>> {
        tags.validate()?;
        let url = protocol::target(
            &self.base_url,
            &[
                (PARAM_INDEX, index.to_string()),
                (PARAM_LENGTH, length.to_string()),
                (PARAM_TIMEOUT, format_timeout(timeout)),
                (PARAM_RAW, flag(false)),
                (PARAM_AUTO_DELETE, flag(auto_delete)),
            ],
            tags,
        );
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, self.frame_codec.media_type());
        let request = self.with_identity(request).await?;
        let request = self.with_authorization(request);

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(unexpected(&url, status, String::from_utf8_lossy(&body)));
        }
        Ok(self.frame_codec.decode_list(&body)?)
    }

    pub async fn get_by_index(&self, index: u64) -> Result<Vec<Frame>> {
        self.get(index, 1, Duration::ZERO, true, &Tags::new()).await
    }

    pub async fn get_by_request_id(&self, request_id: &str) -> Result<Vec<Frame>> {
        let tags = Tags::new().with(TAG_REQUEST_ID, request_id);
        self.get(0, 1, Duration::ZERO, true, &tags).await
    }

    /// Commit `indexes` so they are not delivered again.
    pub async fn commit(&self, indexes: &[u64]) -> Result<()> {
        let url = self.target(&[(PARAM_INDEXES, join_indexes(indexes))]);
        let request = self.http.put(url.clone());
        self.execute(url, request).await
    }

    /// Reject `indexes` with a result code and reason.
    pub async fn negative(&self, code: NegativeCode, reason: &str, indexes: &[u64]) -> Result<()> {
        let url = self.target(&[
            (PARAM_INDEXES, join_indexes(indexes)),
            (PARAM_NEGATIVE, flag(true)),
        ]);
        let form = [(FORM_REASON, reason.to_string()), (FORM_CODE, code.to_string())];
        let request = self.http.put(url.clone()).form(&form);
        let request = self.with_extra_headers(request);
        self.execute(url, request).await
    }

    /// Delete `indexes` and their content.
    pub async fn delete(&self, indexes: &[u64]) -> Result<()> {
        let url = self.target(&[(PARAM_INDEXES, join_indexes(indexes))]);
        let request = self.http.delete(url.clone());
        self.execute(url, request).await
    }

    /// Drop everything before `index` (exclusive).
    pub async fn truncate(&self, index: u64) -> Result<()> {
        let url = self.target(&[(PARAM_INDEX, index.to_string()), (PARAM_TRUNC, flag(true))]);
        let request = self.http.delete(url.clone());
        self.execute(url, request).await
    }

    /// Mark the end of the stream.
    pub async fn end(&self, force: bool) -> Result<()> {
        let mut params = vec![(PARAM_EOS, flag(true))];
        if force {
            params.push((PARAM_FORCE, flag(true)));
        }
        let url = self.target(&params);
        let request = self.http.post(url.clone());
        self.execute(url, request).await
    }

    pub async fn watch(
        &self,
        index: u64,
        window: u64,
        index_only: bool,
        auto_commit: bool,
    ) -> Result<Watcher> {
        self.watch_by_tag(index, window, index_only, auto_commit, &Tags::new())
            .await
    }

    /// Stream frames starting at `index`, at most `window` unacknowledged at
    /// a time, filtered by `tags`.
    pub async fn watch_by_tag(
        &self,
        index: u64,
        window: u64,
        index_only: bool,
        auto_commit: bool,
        tags: &Tags,
    ) -> Result<Watcher> {
        tags.validate()?;
        let url = protocol::target(
            &self.base_url,
            &[
                (PARAM_INDEX, index.to_string()),
                (PARAM_WINDOW, window.to_string()),
                (PARAM_INDEX_ONLY, flag(index_only)),
                (PARAM_AUTO_COMMIT, flag(auto_commit)),
                (PARAM_WATCH, flag(true)),
            ],
            tags,
        );

        match self.watch_mode {
            WatchMode::Push => self.watch_push(url).await,
            WatchMode::Pull => self.watch_pull(url).await,
        }
    }

    async fn watch_push(&self, mut url: Url) -> Result<Watcher> {
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::InvalidUrl(format!("{url}: cannot switch to {scheme}")))?;

        let attrs = self.attributes.get(true).await?;
        let uid_header = attrs
            .user_header()
            .ok_or_else(|| ClientError::MalformedAttributes((*attrs).clone()))?;

        let mut headers = vec![
            (uid_header.to_string(), self.user.uid().to_string()),
            (ACCEPT.to_string(), self.frame_codec.media_type().to_string()),
        ];
        if let Some(token) = self.user.token() {
            headers.push((HEADER_AUTHORIZATION.to_string(), token.to_string()));
        }
        if let Some(gid_header) = attrs.group_header() {
            headers.push((gid_header.to_string(), self.user.gid().to_string()));
        }

        let connector = PushConnector::new(url, headers, self.frame_codec.clone())?;
        let watcher = ReconnectingWatcher::connect(connector, CancellationToken::new()).await?;
        Ok(Watcher::push(watcher))
    }

    async fn watch_pull(&self, url: Url) -> Result<Watcher> {
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, self.frame_codec.media_type());
        let request = self.with_identity(request).await?;
        let request = self.with_authorization(request);

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(unexpected(&url, status, body));
        }
        let transport = PullTransport::from_response(
            response,
            self.frame_codec.clone(),
            CancellationToken::new(),
        );
        Ok(Watcher::pull(transport))
    }

    fn target(&self, params: &[(&str, String)]) -> Url {
        protocol::target(&self.base_url, params, &Tags::new())
    }

    /// Send a request that expects `200 OK` and no meaningful body.
    async fn execute(&self, url: Url, request: RequestBuilder) -> Result<()> {
        let request = self.with_identity(request).await?;
        let request = self.with_authorization(request);
        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(unexpected(&url, status, body));
        }
        Ok(())
    }

    async fn with_identity(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let attrs = self.attributes.get(false).await?;
        let uid_header = attrs
            .user_header()
            .ok_or_else(|| ClientError::MalformedAttributes((*attrs).clone()))?;
        let mut request = request.header(uid_header, self.user.uid());
        if let Some(gid_header) = attrs.group_header() {
            request = request.header(gid_header, self.user.gid());
        }
        Ok(request)
    }

    fn with_authorization(&self, request: RequestBuilder) -> RequestBuilder {
        match self.user.token() {
            Some(token) => request.header(HEADER_AUTHORIZATION, token),
            None => request,
        }
    }

    async fn with_priority(&self, request: RequestBuilder, priority: Priority) -> Result<RequestBuilder> {
        if !priority.is_elevated() {
            return Ok(request);
        }
        let attrs = self.attributes.get(false).await?;
        Ok(match attrs.priority_header() {
            Some(header) => request.header(header, priority.0.to_string()),
            None => request,
        })
    }

    fn with_extra_headers(&self, request: RequestBuilder) -> RequestBuilder {
        self.extra_headers
            .iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }
}

fn unexpected(url: &Url, status: StatusCode, body: impl Into<String>) -> ClientError {
    ClientError::Protocol {
        url: url.to_string(),
        status: status.as_u16(),
        body: body.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GID_HEADER, MockQueue, PRIORITY_HEADER, Reply, UID_HEADER};
    use axum::http::{Method, StatusCode as AxumStatus};
    use eas_queue_core::{AttributeKey, JsonCodec, ProtobufCodec, WireFormat};
    use std::time::Duration;

    async fn client(mock: &MockQueue, mode: WatchMode) -> QueueClient {
        let config = QueueConfig::new(&mock.endpoint, "q")
            .with_token("secret")
            .with_user_id("alice")
            .with_extra_header("X-Trace", "on")
            .with_watch_mode(mode)
            .with_wire_format(WireFormat::Json);
        QueueClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn put_returns_index_and_request_id() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(200, "42").header(HEADER_REQUEST_ID, "r-1"));
        let client = client(&mock, WatchMode::Push).await;

        let (index, request_id) = client.put("hello", &Tags::new()).await.unwrap();
        assert_eq!((index, request_id.as_str()), (42, "r-1"));

        let recorded = mock.recorded();
        let put = &recorded[0];
        assert_eq!(put.method, Method::POST);
        assert_eq!(put.body, b"hello");
        assert_eq!(put.headers.get(UID_HEADER).unwrap(), "alice");
        assert_eq!(put.headers.get(GID_HEADER).unwrap(), "eas");
        assert_eq!(put.headers.get("authorization").unwrap(), "secret");
        assert_eq!(put.headers.get("x-trace").unwrap(), "on");
        assert!(put.headers.get(PRIORITY_HEADER).is_none());
        assert!(put.query.is_empty());
    }

    #[tokio::test]
    async fn put_error_carries_body() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(500, "disk full"));
        let client = client(&mock, WatchMode::Push).await;

        let err = client.put("hello", &Tags::new()).await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn put_with_priority_and_tags() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(200, "7"));
        let client = client(&mock, WatchMode::Push).await;

        let tags = Tags::new().with("shard", "a");
        let (index, request_id) = client
            .put_with_priority(b"x".to_vec(), &tags, Priority(3))
            .await
            .unwrap();
        assert_eq!(index, 7);
        assert_eq!(request_id, "");

        let put = &mock.recorded()[0];
        assert_eq!(put.headers.get(PRIORITY_HEADER).unwrap(), "3");
        assert_eq!(put.query.get("shard").map(String::as_str), Some("a"));
    }

    #[tokio::test]
    async fn put_with_no_content_has_no_index() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(204, "").header(HEADER_REQUEST_ID, "r-2"));
        let client = client(&mock, WatchMode::Push).await;
        assert!(matches!(
            client.put("x", &Tags::new()).await,
            Err(ClientError::InvalidIndex(body)) if body.is_empty()
        ));
    }

    #[tokio::test]
    async fn put_rejects_non_numeric_index() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(200, "not-a-number"));
        let client = client(&mock, WatchMode::Push).await;
        assert!(matches!(
            client.put("x", &Tags::new()).await,
            Err(ClientError::InvalidIndex(_))
        ));
    }

    #[tokio::test]
    async fn attributes_are_fetched_once_for_many_requests() {
        let mock = MockQueue::start().await;
        let client = client(&mock, WatchMode::Push).await;
        client.commit(&[1]).await.unwrap();
        client.delete(&[2]).await.unwrap();
        client.truncate(3).await.unwrap();
        assert_eq!(mock.attr_fetches(), 1);

        client.attributes().await.unwrap();
        assert_eq!(mock.attr_fetches(), 2);
    }

    #[tokio::test]
    async fn missing_identity_header_fails_requests() {
        let mock = MockQueue::start().await;
        *mock.state.attributes.lock().unwrap() =
            Attributes::new().with(AttributeKey::GroupIdentifyHeader, GID_HEADER);
        let client = client(&mock, WatchMode::Push).await;

        assert!(matches!(
            client.commit(&[1]).await,
            Err(ClientError::MalformedAttributes(_))
        ));
        assert!(matches!(
            client.watch(0, 10, false, false).await,
            Err(ClientError::MalformedAttributes(_))
        ));
        assert!(mock.recorded().is_empty());
    }

    #[tokio::test]
    async fn attribute_failure_is_retried_on_next_call() {
        let mock = MockQueue::start().await;
        *mock.state.attr_status.lock().unwrap() = AxumStatus::BAD_GATEWAY;
        let client = client(&mock, WatchMode::Push).await;

        let err = client.commit(&[1]).await.unwrap_err();
        assert_eq!(err.status(), Some(502));

        *mock.state.attr_status.lock().unwrap() = AxumStatus::OK;
        client.commit(&[1]).await.unwrap();
        assert_eq!(mock.attr_fetches(), 2);
    }

    #[tokio::test]
    async fn sync_operations_build_expected_queries() {
        let mock = MockQueue::start().await;
        let client = client(&mock, WatchMode::Push).await;

        client.commit(&[1, 2]).await.unwrap();
        client
            .negative(NegativeCode(500), "bad input", &[3])
            .await
            .unwrap();
        client.delete(&[4, 5]).await.unwrap();
        client.truncate(6).await.unwrap();
        client.end(true).await.unwrap();
        client.end(false).await.unwrap();

        let recorded = mock.recorded();
        let summary: Vec<_> = recorded
            .iter()
            .map(|r| {
                let mut query: Vec<_> = r
                    .query
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                query.sort();
                (r.method.clone(), query.join("&"))
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Method::PUT, "_indexes_=1,2".to_string()),
                (Method::PUT, "_indexes_=3&_negative_=true".to_string()),
                (Method::DELETE, "_indexes_=4,5".to_string()),
                (Method::DELETE, "_index_=6&_trunc_=true".to_string()),
                (Method::POST, "_eos_=true&_force_=true".to_string()),
                (Method::POST, "_eos_=true".to_string()),
            ]
        );

        let negative = &recorded[1];
        assert_eq!(
            negative.headers.get("content-type").unwrap(),
            "application/x-www-form-urlencoded"
        );
        let form = String::from_utf8(negative.body.clone()).unwrap();
        assert_eq!(form, "_reason_=bad+input&_code_=500");
        assert_eq!(negative.headers.get("x-trace").unwrap(), "on");
    }

    #[tokio::test]
    async fn sync_operation_errors_carry_body() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(404, "no such index"));
        let client = client(&mock, WatchMode::Push).await;
        let err = client.commit(&[9]).await.unwrap_err();
        assert!(err.to_string().contains("no such index"));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn get_decodes_frames() {
        let mock = MockQueue::start().await;
        let frames = vec![Frame::new(1, "a"), Frame::new(2, "b")];
        mock.reply(Reply::new(200, JsonCodec.encode_list(&frames).unwrap()));
        let client = client(&mock, WatchMode::Push).await;

        let tags = Tags::new().with("shard", "a");
        let got = client
            .get(1, 2, Duration::from_secs(2), false, &tags)
            .await
            .unwrap();
        assert_eq!(got, frames);

        let request = &mock.recorded()[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.headers.get("accept").unwrap(), "application/json");
        let query = &request.query;
        assert_eq!(query["_index_"], "1");
        assert_eq!(query["_length_"], "2");
        assert_eq!(query["_timeout_"], "2000ms");
        assert_eq!(query["_raw_"], "false");
        assert_eq!(query["_auto_delete_"], "false");
        assert_eq!(query["shard"], "a");
    }

    #[tokio::test]
    async fn get_by_request_id_filters_by_tag() {
        let mock = MockQueue::start().await;
        mock.reply(Reply::new(200, "[]"));
        let client = client(&mock, WatchMode::Push).await;
        assert!(client.get_by_request_id("r-9").await.unwrap().is_empty());

        let query = &mock.recorded()[0].query;
        assert_eq!(query["requestId"], "r-9");
        assert_eq!(query["_length_"], "1");
        assert_eq!(query["_auto_delete_"], "true");
    }

    #[tokio::test]
    async fn get_rejects_reserved_tags() {
        let mock = MockQueue::start().await;
        let client = client(&mock, WatchMode::Push).await;
        let tags = Tags::new().with("_index_", "1");
        assert!(matches!(
            client.get(0, 1, Duration::ZERO, false, &tags).await,
            Err(ClientError::InvalidTags(_))
        ));
        assert!(matches!(
            client.watch_by_tag(0, 1, false, false, &tags).await,
            Err(ClientError::InvalidTags(_))
        ));
    }

    #[tokio::test]
    async fn push_watch_streams_frames_with_identity() {
        let mock = MockQueue::start().await;
        let frames = vec![Frame::new(1, "a"), Frame::index_only(2)];
        *mock.state.watch_frames.lock().unwrap() = frames.clone();
        let client = client(&mock, WatchMode::Push).await;

        let mut watcher = client
            .watch_by_tag(5, 10, false, true, &Tags::new().with("shard", "a"))
            .await
            .unwrap();
        assert_eq!(watcher.mode(), WatchMode::Push);
        for frame in frames {
            let got = tokio::time::timeout(Duration::from_secs(2), watcher.recv())
                .await
                .unwrap();
            assert_eq!(got, Some(frame));
        }

        let headers = mock.state.watch_headers.lock().unwrap()[0].clone();
        assert_eq!(headers.get(UID_HEADER).unwrap(), "alice");
        assert_eq!(headers.get(GID_HEADER).unwrap(), "eas");
        assert_eq!(headers.get("authorization").unwrap(), "secret");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
        // Push watches always refresh the attributes.
        assert_eq!(mock.attr_fetches(), 1);

        watcher.close();
        let end = tokio::time::timeout(Duration::from_secs(2), watcher.recv())
            .await
            .unwrap();
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn pull_watch_ends_with_body() {
        let mock = MockQueue::start().await;
        let frames = vec![Frame::new(1, "a"), Frame::new(2, "b"), Frame::new(3, "c")];
        *mock.state.watch_frames.lock().unwrap() = frames.clone();
        let client = client(&mock, WatchMode::Pull).await;

        let watcher = client.watch(0, 3, false, false).await.unwrap();
        assert_eq!(watcher.mode(), WatchMode::Pull);
        let got: Vec<Frame> = tokio::time::timeout(
            Duration::from_secs(2),
            futures_util::StreamExt::collect(watcher.into_stream()),
        )
        .await
        .unwrap();
        assert_eq!(got, frames);

        let headers = mock.state.watch_headers.lock().unwrap()[0].clone();
        assert_eq!(headers.get(UID_HEADER).unwrap(), "alice");
    }

    #[tokio::test]
    async fn pull_watch_refused_is_an_error() {
        let mock = MockQueue::start().await;
        *mock.state.watch_status.lock().unwrap() = AxumStatus::FORBIDDEN;
        let client = client(&mock, WatchMode::Pull).await;

        let err = client.watch(0, 3, false, false).await.err().unwrap();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("watch refused"));
    }

    #[tokio::test]
    async fn protobuf_is_the_default_encoding() {
        let mock = MockQueue::start().await;
        let frames = vec![
            Frame::new(1, "a").with_tags(Tags::new().with("shard", "a")),
            Frame::new(2, "b"),
        ];
        *mock.state.watch_frames.lock().unwrap() = frames.clone();
        mock.reply(Reply::new(200, ProtobufCodec.encode_list(&frames).unwrap()));
        let config = QueueConfig::new(&mock.endpoint, "q")
            .with_user_id("alice")
            .with_watch_mode(WatchMode::Pull);
        let client = QueueClient::new(config).unwrap();

        assert_eq!(client.get_by_index(1).await.unwrap(), frames);
        let get = &mock.recorded()[0];
        assert_eq!(get.headers.get("accept").unwrap(), eas_queue_core::CONTENT_TYPE_PROTOBUF);
        assert_eq!(get.headers.get(UID_HEADER).unwrap(), "alice");

        let watcher = client.watch(0, 2, false, false).await.unwrap();
        let got: Vec<Frame> = tokio::time::timeout(
            Duration::from_secs(2),
            futures_util::StreamExt::collect(watcher.into_stream()),
        )
        .await
        .unwrap();
        assert_eq!(got, frames);
    }

    #[tokio::test]
    async fn watch_fails_when_server_unreachable() {
        for mode in [WatchMode::Push, WatchMode::Pull] {
            let config = QueueConfig::new("http://127.0.0.1:1", "q").with_watch_mode(mode);
            let client = QueueClient::new(config).unwrap();
            let err = client.watch(0, 1, false, false).await.err().unwrap();
            assert!(matches!(err, ClientError::Attributes(_)), "{mode:?}: {err}");
        }
    }
}
