//! Fetch clients for the seed store.
//!
//! Every request returns a [`PendingFetch`] handle. The UI loop polls the handle
//! with [`PendingFetch::try_take`]; dropping or cancelling it aborts the request.

use std::future::Future;
use std::io;
use std::time::Duration;

use seed_proto::{
    decode_response, encode_request, read_frame_async, write_frame_async, FrameError,
    InvalidSeedReport, ReferenceData, ReportAck, SeedDetailsRequest, SeedRecord, StoreRequest,
    StoreResponse,
};
use seed_store::SeedStore;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::AbortHandle;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),
    #[error("wire codec failed: {0}")]
    Codec(#[from] bincode::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("server closed the connection without answering")]
    Closed,
    #[error("no response within {0:?}")]
    TimedOut(Duration),
    #[error("seed {0} was not found")]
    NotFound(SeedDetailsRequest),
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected {0} response")]
    UnexpectedResponse(&'static str),
    #[error("request was cancelled")]
    Cancelled,
}

/// Handle to an in-flight fetch.
#[derive(Debug)]
pub struct PendingFetch<T> {
    receiver: oneshot::Receiver<Result<T, ClientError>>,
    abort: Option<AbortHandle>,
    settled: bool,
}

impl<T: Send + 'static> PendingFetch<T> {
    pub fn spawn<F>(runtime: &Handle, future: F) -> Self
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let task = runtime.spawn(async move {
            let _ = sender.send(future.await);
        });
        Self {
            receiver,
            abort: Some(task.abort_handle()),
            settled: false,
        }
    }
}

impl<T> PendingFetch<T> {
    /// A fetch that has already completed.
    pub fn ready(result: Result<T, ClientError>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self {
            receiver,
            abort: None,
            settled: false,
        }
    }

    /// Take the outcome if it has arrived. Yields `Some` at most once.
    pub fn try_take(&mut self) -> Option<Result<T, ClientError>> {
        if self.settled {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(result) => {
                self.settled = true;
                self.abort = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.settled = true;
                self.abort = None;
                Some(Err(ClientError::Cancelled))
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Abort the request. A later `try_take` reports nothing.
    pub fn cancel(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        self.receiver.close();
        self.settled = true;
    }

    /// Wait for the outcome.
    pub async fn wait(mut self) -> Result<T, ClientError> {
        if self.settled {
            return Err(ClientError::Cancelled);
        }
        let outcome = (&mut self.receiver).await;
        self.settled = true;
        self.abort = None;
        outcome.unwrap_or(Err(ClientError::Cancelled))
    }
}

impl<T> Drop for PendingFetch<T> {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }
}

/// Data-access collaborator of the seed browser.
pub trait SeedClient {
    fn fetch_seed(&self, request: SeedDetailsRequest) -> PendingFetch<SeedRecord>;
    fn fetch_reference_data(&self) -> PendingFetch<ReferenceData>;
    fn report_invalid_seed(&self, report: InvalidSeedReport) -> PendingFetch<ReportAck>;
}

impl<C: SeedClient + ?Sized> SeedClient for Box<C> {
    fn fetch_seed(&self, request: SeedDetailsRequest) -> PendingFetch<SeedRecord> {
        (**self).fetch_seed(request)
    }

    fn fetch_reference_data(&self) -> PendingFetch<ReferenceData> {
        (**self).fetch_reference_data()
    }

    fn report_invalid_seed(&self, report: InvalidSeedReport) -> PendingFetch<ReportAck> {
        (**self).report_invalid_seed(report)
    }
}

fn expect_seed(response: StoreResponse) -> Result<SeedRecord, ClientError> {
    match response {
        StoreResponse::Seed(seed) => Ok(seed),
        StoreResponse::NotFound(request) => Err(ClientError::NotFound(request)),
        StoreResponse::Rejected(reason) => Err(ClientError::Rejected(reason)),
        StoreResponse::ReferenceData(_) => Err(ClientError::UnexpectedResponse("reference data")),
        StoreResponse::ReportAccepted(_) => Err(ClientError::UnexpectedResponse("report")),
    }
}

fn expect_reference(response: StoreResponse) -> Result<ReferenceData, ClientError> {
    match response {
        StoreResponse::ReferenceData(reference) => Ok(reference),
        StoreResponse::Rejected(reason) => Err(ClientError::Rejected(reason)),
        StoreResponse::Seed(_) => Err(ClientError::UnexpectedResponse("seed")),
        StoreResponse::NotFound(_) => Err(ClientError::UnexpectedResponse("not found")),
        StoreResponse::ReportAccepted(_) => Err(ClientError::UnexpectedResponse("report")),
    }
}

fn expect_ack(response: StoreResponse) -> Result<ReportAck, ClientError> {
    match response {
        StoreResponse::ReportAccepted(ack) => Ok(ack),
        StoreResponse::Rejected(reason) => Err(ClientError::Rejected(reason)),
        StoreResponse::NotFound(request) => Err(ClientError::NotFound(request)),
        StoreResponse::Seed(_) => Err(ClientError::UnexpectedResponse("seed")),
        StoreResponse::ReferenceData(_) => Err(ClientError::UnexpectedResponse("reference data")),
    }
}

/// Client for a remote `seed_server`.
#[derive(Debug, Clone)]
pub struct TcpSeedClient {
    endpoint: String,
    runtime: Handle,
    timeout: Duration,
}

impl TcpSeedClient {
    pub fn new(endpoint: impl Into<String>, runtime: Handle, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            runtime,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call<T, F>(&self, request: StoreRequest, expect: F) -> PendingFetch<T>
    where
        T: Send + 'static,
        F: FnOnce(StoreResponse) -> Result<T, ClientError> + Send + 'static,
    {
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        PendingFetch::spawn(&self.runtime, async move {
            let response = roundtrip(&endpoint, &request, timeout).await?;
            expect(response)
        })
    }
}

impl SeedClient for TcpSeedClient {
    fn fetch_seed(&self, request: SeedDetailsRequest) -> PendingFetch<SeedRecord> {
        self.call(StoreRequest::GetSeed(request), expect_seed)
    }

    fn fetch_reference_data(&self) -> PendingFetch<ReferenceData> {
        self.call(StoreRequest::GetReferenceData, expect_reference)
    }

    fn report_invalid_seed(&self, report: InvalidSeedReport) -> PendingFetch<ReportAck> {
        self.call(StoreRequest::ReportInvalidSeed(report), expect_ack)
    }
}

async fn roundtrip(
    endpoint: &str,
    request: &StoreRequest,
    timeout: Duration,
) -> Result<StoreResponse, ClientError> {
    tokio::time::timeout(timeout, exchange(endpoint, request))
        .await
        .map_err(|_| ClientError::TimedOut(timeout))?
}

async fn exchange(endpoint: &str, request: &StoreRequest) -> Result<StoreResponse, ClientError> {
    let mut stream = TcpStream::connect(endpoint).await?;
    stream.set_nodelay(true)?;
    write_frame_async(&mut stream, &encode_request(request)?).await?;
    let body = read_frame_async(&mut stream).await?.ok_or(ClientError::Closed)?;
    trace!(endpoint, bytes = body.len(), "store.response");
    Ok(decode_response(&body)?)
}

/// Client answering from an in-process store; every fetch is ready immediately.
#[derive(Debug, Clone)]
pub struct LocalSeedClient {
    store: SeedStore,
}

impl LocalSeedClient {
    pub fn new(store: SeedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SeedStore {
        &self.store
    }
}

impl SeedClient for LocalSeedClient {
    fn fetch_seed(&self, request: SeedDetailsRequest) -> PendingFetch<SeedRecord> {
        PendingFetch::ready(expect_seed(
            self.store.handle_request(&StoreRequest::GetSeed(request)),
        ))
    }

    fn fetch_reference_data(&self) -> PendingFetch<ReferenceData> {
        PendingFetch::ready(expect_reference(
            self.store.handle_request(&StoreRequest::GetReferenceData),
        ))
    }

    fn report_invalid_seed(&self, report: InvalidSeedReport) -> PendingFetch<ReportAck> {
        PendingFetch::ready(expect_ack(
            self.store
                .handle_request(&StoreRequest::ReportInvalidSeed(report)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_store::SeedLibrary;

    fn local() -> LocalSeedClient {
        LocalSeedClient::new(SeedStore::from_library(SeedLibrary::builtin(), 3))
    }

    #[test]
    fn ready_fetch_yields_once() {
        let mut fetch = PendingFetch::ready(Ok(5u32));
        assert!(matches!(fetch.try_take(), Some(Ok(5))));
        assert!(fetch.is_settled());
        assert!(fetch.try_take().is_none());
    }

    #[test]
    fn local_client_maps_store_outcomes() {
        let client = local();
        let mut found = client.fetch_seed(SeedDetailsRequest::new("123", "4"));
        assert!(matches!(found.try_take(), Some(Ok(seed)) if seed.seed_number == 123));

        let mut missing = client.fetch_seed(SeedDetailsRequest::new("8", "8"));
        assert!(matches!(missing.try_take(), Some(Err(ClientError::NotFound(_)))));

        let mut reference = client.fetch_reference_data();
        assert!(matches!(reference.try_take(), Some(Ok(data)) if !data.elements.is_empty()));
    }

    #[test]
    fn local_report_is_acknowledged() {
        let client = local();
        let mut ack = client.report_invalid_seed(InvalidSeedReport {
            seed_number: 123,
            game_version: 4,
        });
        match ack.try_take() {
            Some(Ok(ack)) => {
                assert_eq!(ack.report_count, 1);
                assert!(!ack.flagged);
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_fetch_never_reports() {
        let runtime = Handle::current();
        let mut fetch = PendingFetch::spawn(&runtime, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ClientError>(1u8)
        });
        assert!(fetch.try_take().is_none());
        fetch.cancel();
        assert!(fetch.is_settled());
        assert!(fetch.try_take().is_none());
    }

    #[tokio::test]
    async fn spawned_fetch_completes() {
        let runtime = Handle::current();
        let fetch = PendingFetch::spawn(&runtime, async { Ok::<_, ClientError>("done") });
        assert_eq!(fetch.wait().await.expect("completed"), "done");
    }

    #[tokio::test]
    async fn unreachable_server_fails_fast() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = TcpSeedClient::new(addr.to_string(), Handle::current(), Duration::from_secs(2));
        let outcome = client.fetch_reference_data().wait().await;
        assert!(matches!(
            outcome,
            Err(ClientError::Io(_)) | Err(ClientError::TimedOut(_))
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let _accept = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = TcpSeedClient::new(addr.to_string(), Handle::current(), Duration::from_millis(100));
        let outcome = client.fetch_seed(SeedDetailsRequest::new("1", "1")).wait().await;
        assert!(matches!(outcome, Err(ClientError::TimedOut(_))));
    }

    #[tokio::test]
    async fn exchange_speaks_the_shared_frame_format() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let body = read_frame_async(&mut socket).await.expect("read").expect("request");
            assert_eq!(
                seed_proto::decode_request(&body).expect("decode"),
                StoreRequest::GetReferenceData
            );
            let reply = seed_proto::encode_response(&StoreResponse::Rejected("busy".to_string()))
                .expect("encode");
            write_frame_async(&mut socket, &reply).await.expect("write");
        });

        let client = TcpSeedClient::new(addr.to_string(), Handle::current(), Duration::from_secs(2));
        let outcome = client.fetch_reference_data().wait().await;
        assert!(matches!(outcome, Err(ClientError::Rejected(reason)) if reason == "busy"));
    }

    #[tokio::test]
    async fn hang_up_without_reply_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let _ = read_frame_async(&mut socket).await;
        });

        let client = TcpSeedClient::new(addr.to_string(), Handle::current(), Duration::from_secs(2));
        let outcome = client.fetch_seed(SeedDetailsRequest::new("1", "1")).wait().await;
        assert!(matches!(
            outcome,
            Err(ClientError::Closed) | Err(ClientError::Frame(_))
        ));
    }
}
