//! Single-operation dispatch loop
//!
//! The store's contract assumes exactly one operation in flight at a time,
//! so the dispatcher is an actor: it owns the service, receives requests
//! over an mpsc channel, and answers each on its oneshot before taking the
//! next. Readiness is surfaced on a watch channel so the host can gate
//! traffic on the announcement (which a handoff start suppresses).

use super::SlotService;
use crate::error::{Error, Result};
use crate::transfer::{TransferSink, TransferSource};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// One operation, as delivered by the host
pub enum Request {
    Open,
    Close,
    Write {
        len: usize,
        source: Box<dyn TransferSource + Send>,
    },
    Read {
        cap: usize,
        sink: Box<dyn TransferSink + Send>,
    },
    Control(u32),
}

/// The outcome of a dispatched operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Open/close acknowledgment.
    Done,
    /// Bytes written or produced.
    Count(usize),
    /// Control-code result.
    Code(u32),
}

struct Envelope {
    request: Request,
    reply_to: oneshot::Sender<Result<Reply>>,
}

/// Cloneable request handle onto a running dispatcher
#[derive(Clone)]
pub struct Handle {
    tx: mpsc::Sender<Envelope>,
}

impl Handle {
    async fn call(&self, request: Request) -> Result<Reply> {
        let (reply_to, reply) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply_to })
            .await
            .map_err(|_| Error::ServiceStopped)?;
        reply.await.map_err(|_| Error::ServiceStopped)?
    }

    pub async fn open(&self) -> Result<()> {
        self.call(Request::Open).await.map(|_| ())
    }

    pub async fn close(&self) -> Result<()> {
        self.call(Request::Close).await.map(|_| ())
    }

    /// Write `len` payload bytes pulled from `source` into the current slot
    pub async fn write(
        &self,
        source: impl TransferSource + Send + 'static,
        len: usize,
    ) -> Result<usize> {
        match self
            .call(Request::Write {
                len,
                source: Box::new(source),
            })
            .await?
        {
            Reply::Count(count) => Ok(count),
            _ => unreachable!("write replies with a count"),
        }
    }

    /// Read the current slot into `sink` with destination capacity `cap`
    pub async fn read(
        &self,
        sink: impl TransferSink + Send + 'static,
        cap: usize,
    ) -> Result<usize> {
        match self
            .call(Request::Read {
                cap,
                sink: Box::new(sink),
            })
            .await?
        {
            Reply::Count(count) => Ok(count),
            _ => unreachable!("read replies with a count"),
        }
    }

    /// Send a control code
    pub async fn control(&self, code: u32) -> Result<u32> {
        match self.call(Request::Control(code)).await? {
            Reply::Code(code) => Ok(code),
            _ => unreachable!("control replies with a code"),
        }
    }
}

/// Actor that serves one request at a time against an owned service
pub struct Dispatcher {
    service: SlotService,
    requests: mpsc::Receiver<Envelope>,
    ready: watch::Sender<bool>,
}

impl Dispatcher {
    /// Wrap a started service.
    ///
    /// Returns the dispatcher, a request handle, and the readiness watch
    /// (initially `false`; flipped when the service announces).
    pub fn new(service: SlotService) -> (Self, Handle, watch::Receiver<bool>) {
        let (tx, requests) = mpsc::channel(16);
        let (ready, ready_rx) = watch::channel(false);
        (
            Self {
                service,
                requests,
                ready,
            },
            Handle { tx },
            ready_rx,
        )
    }

    /// Serve requests until every handle is dropped, then hand the service
    /// back so the host can run shutdown work (e.g. a handoff save).
    pub async fn run(mut self) -> SlotService {
        if self.service.announces_ready() {
            let _ = self.ready.send(true);
            info!("slot service ready");
        }
        while let Some(envelope) = self.requests.recv().await {
            let result = self.handle(envelope.request);
            // A caller that gave up on its reply is not an error.
            let _ = envelope.reply_to.send(result);
        }
        debug!("dispatch loop drained; returning service to host");
        self.service
    }

    fn handle(&mut self, request: Request) -> Result<Reply> {
        match request {
            Request::Open => self.service.open().map(|_| Reply::Done),
            Request::Close => self.service.close().map(|_| Reply::Done),
            Request::Write { len, mut source } => {
                self.service.write(source.as_mut(), len).map(Reply::Count)
            }
            Request::Read { cap, mut sink } => {
                self.service.read(sink.as_mut(), cap).map(Reply::Count)
            }
            Request::Control(code) => self.service.control(code).map(Reply::Code),
        }
    }
}
