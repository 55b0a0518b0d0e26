//! The client side of the syscall protocol.
//!
//! An [`Os`] is handed to every running [`Program`](crate::Program). It owns
//! the two channel ends connecting the program to its process:
//!
//! ```text
//!                 outbox (requests, fire-and-forget)
//!   Program ── Os ──────────────────────────────────►  dispatcher
//!                 ◄──────────────────────────────────
//!          pump     inbox (responses, events)
//! ```
//!
//! The pump task routes every inbound envelope:
//!
//! - `response` ─► the pending call with the same id
//! - `Std:in` from a child someone is awaiting ─► that awaiter
//! - any other hook key ─► the registered subscription, or a short backlog
//!   until one registers
//!
//! When the inbox closes (the process was ended or killed) every pending
//! call fails with "Process has ended" and every subscription yields `None`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use psos_identity::Identity;
use psos_ipc::{
    Envelope, ErrorPayload, HookKey, MessageType, Pid, ProcessInfo, StartRequest, StdInMessage,
    Syscall,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{Fs, ProcessApi, Std};
use crate::error::ProcessError;
use crate::subscription::Subscription;

/// Events kept per hook key while nothing is subscribed.
const BACKLOG_LIMIT: usize = 64;

type Reply = oneshot::Sender<Result<Value, ErrorPayload>>;
type OutputReply = oneshot::Sender<Result<StdInMessage, ErrorPayload>>;

enum Pending {
    Call(Reply),
    /// `Process.start` whose child's first output is wanted
    StartAndAwait(OutputReply),
}

#[derive(Default)]
struct State {
    pending: HashMap<String, Pending>,
    hooks: HashMap<HookKey, mpsc::UnboundedSender<Value>>,
    backlog: HashMap<HookKey, VecDeque<Value>>,
    awaiting: HashMap<Pid, OutputReply>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

struct Inner {
    info: ProcessInfo,
    outbox: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

/// Syscall proxy bound to one process.
#[derive(Clone)]
pub struct Os {
    inner: Arc<Inner>,
}

impl Os {
    /// Connect a program to its process and start routing `inbox`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(
        info: ProcessInfo,
        outbox: mpsc::UnboundedSender<Envelope>,
        inbox: mpsc::UnboundedReceiver<Envelope>,
        timeout: Option<Duration>,
    ) -> Self {
        let shared = Arc::new(Shared::default());
        tokio::spawn(pump(info.id, Arc::clone(&shared), inbox));
        Self {
            inner: Arc::new(Inner {
                info,
                outbox,
                shared,
                timeout,
            }),
        }
    }

    pub fn pid(&self) -> Pid {
        self.inner.info.id
    }

    /// Snapshot taken when the process started. Use
    /// [`ProcessApi::self_info`] for a fresh one.
    pub fn info(&self) -> &ProcessInfo {
        &self.inner.info
    }

    pub fn params(&self) -> &[String] {
        &self.inner.info.params
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.info.identity
    }

    pub fn fs(&self) -> Fs<'_> {
        Fs::new(self)
    }

    pub fn process(&self) -> ProcessApi<'_> {
        ProcessApi::new(self)
    }

    pub fn std(&self) -> Std<'_> {
        Std::new(self)
    }

    // ========== Requests ==========

    /// Issue a raw request and wait for its reply.
    pub async fn request(&self, kind: MessageType, data: Value) -> Result<Value, ErrorPayload> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.register(&id, Pending::Call(tx))?;
        self.send(Envelope::request(kind.clone(), data, id.clone()), Some(&id))?;

        let received = match self.inner.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.inner.shared.lock().pending.remove(&id);
                    warn!("[os] {} request {} timed out after {:?}", kind, id, limit);
                    return Err(ProcessError::Timeout {
                        request: kind.to_string(),
                    }
                    .into());
                }
            },
            None => rx.await,
        };
        received.unwrap_or_else(|_| Err(ProcessError::Ended.into()))
    }

    /// Issue a syscall and wait for its reply.
    pub async fn call(&self, call: Syscall) -> Result<Value, ErrorPayload> {
        self.request(call.message_type(), call.payload()).await
    }

    /// [`call`](Self::call), decoding the reply as `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, call: Syscall) -> Result<T, ErrorPayload> {
        decode(self.call(call).await?)
    }

    /// Send a syscall without waiting for a reply.
    pub fn notify(&self, call: Syscall) -> Result<(), ErrorPayload> {
        self.send(call.into_envelope(None), None)
    }

    /// Start `exec` as a child and resolve with the first `Std:in` it sends
    /// back.
    ///
    /// Fails if the start fails or the child ends before writing anything.
    /// Not subject to the request timeout.
    pub async fn start_and_await_output(
        &self,
        exec: &str,
        params: Vec<String>,
    ) -> Result<StdInMessage, ErrorPayload> {
        let call = Syscall::ProcessStart(StartRequest {
            exec: exec.to_string(),
            params,
        });
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.register(&id, Pending::StartAndAwait(tx))?;
        self.send(call.into_envelope(Some(id.clone())), Some(&id))?;
        rx.await
            .unwrap_or_else(|_| Err(ProcessError::Ended.into()))
    }

    /// Report how the program body finished so the process can be ended.
    pub fn finish(&self, outcome: Result<(), ErrorPayload>) {
        let call = match outcome {
            Ok(()) => Syscall::ProcessEnd,
            Err(err) => Syscall::ProcessCrash(Value::from(err.into_parts())),
        };
        if self.notify(call).is_err() {
            debug!("[os] process {} already ended", self.pid());
        }
    }

    fn register(&self, id: &str, pending: Pending) -> Result<(), ErrorPayload> {
        let mut state = self.inner.shared.lock();
        if state.closed {
            return Err(ProcessError::Ended.into());
        }
        state.pending.insert(id.to_string(), pending);
        Ok(())
    }

    fn send(&self, envelope: Envelope, id: Option<&str>) -> Result<(), ErrorPayload> {
        if self.inner.outbox.send(envelope).is_err() {
            if let Some(id) = id {
                self.inner.shared.lock().pending.remove(id);
            }
            return Err(ProcessError::Ended.into());
        }
        Ok(())
    }

    // ========== Hooks ==========

    /// Register the handler for `key`, replacing any previous one.
    ///
    /// Events that arrived while nothing was registered are delivered first.
    pub fn subscribe<T: DeserializeOwned>(&self, key: HookKey) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.shared.lock();
        if !state.closed {
            for value in state.backlog.remove(&key).unwrap_or_default() {
                let _ = tx.send(value);
            }
            state.hooks.insert(key, tx);
        }
        Subscription::new(key, rx)
    }

    /// `Std:in` events.
    pub fn std_in(&self) -> Subscription<StdInMessage> {
        self.subscribe(HookKey::StdIn)
    }

    /// `Process:end` events; each carries the PID of a child that died.
    pub fn child_ends(&self) -> Subscription<Pid> {
        self.subscribe(HookKey::ProcessEnd)
    }

    /// `Process:self` events; each carries a refreshed snapshot.
    pub fn self_updates(&self) -> Subscription<ProcessInfo> {
        self.subscribe(HookKey::ProcessSelf)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ErrorPayload> {
    serde_json::from_value(value)
        .map_err(|e| ProcessError::MalformedResponse(e.to_string()).into())
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, pid: Pid, envelope: Envelope) {
        if envelope.is_response() {
            self.resolve(pid, envelope);
            return;
        }

        let Some(key) = HookKey::from_message_type(&envelope.kind) else {
            warn!("[os] process {} dropping unexpected {}", pid, envelope.kind);
            return;
        };

        match key {
            HookKey::StdIn if self.intercept_output(&envelope.data) => return,
            HookKey::ProcessEnd => self.fail_awaiter(&envelope.data),
            _ => {}
        }
        self.fire(pid, key, envelope.data);
    }

    fn resolve(&self, pid: Pid, envelope: Envelope) {
        let Some(id) = envelope.id.clone() else {
            warn!("[os] process {} got a response without id", pid);
            return;
        };

        let pending = self.lock().pending.remove(&id);
        match pending {
            None => debug!("[os] process {} late response {}", pid, id),
            Some(Pending::Call(tx)) => {
                let _ = tx.send(envelope.into_result());
            }
            Some(Pending::StartAndAwait(tx)) => {
                match envelope.into_result().and_then(decode::<ProcessInfo>) {
                    Ok(child) => {
                        self.lock().awaiting.insert(child.id, tx);
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err));
                    }
                }
            }
        }
    }

    /// Hand `Std:in` from an awaited child to its awaiter.
    fn intercept_output(&self, data: &Value) -> bool {
        let Ok(msg) = serde_json::from_value::<StdInMessage>(data.clone()) else {
            return false;
        };
        let Some(from) = msg.from.pid() else {
            return false;
        };

        let awaiter = self.lock().awaiting.remove(&from);
        match awaiter {
            Some(tx) => {
                let _ = tx.send(Ok(msg));
                true
            }
            None => false,
        }
    }

    /// An awaited child died before writing anything.
    fn fail_awaiter(&self, data: &Value) {
        let Some(child) = data.as_u64().and_then(|p| Pid::try_from(p).ok()) else {
            return;
        };
        if let Some(tx) = self.lock().awaiting.remove(&child) {
            let err = ErrorPayload::process("Process ended without output")
                .with_context(child.to_string());
            let _ = tx.send(Err(err));
        }
    }

    fn fire(&self, pid: Pid, key: HookKey, data: Value) {
        let mut state = self.lock();
        let undelivered = match state.hooks.get(&key) {
            Some(tx) => match tx.send(data) {
                Ok(()) => return,
                Err(SendError(data)) => data,
            },
            None => data,
        };
        state.hooks.remove(&key);

        let backlog = state.backlog.entry(key).or_default();
        if backlog.len() >= BACKLOG_LIMIT {
            debug!("[os] process {} backlog full for {}, dropping oldest", pid, key);
            backlog.pop_front();
        }
        backlog.push_back(undelivered);
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.pending.clear();
        state.hooks.clear();
        state.backlog.clear();
        state.awaiting.clear();
    }
}

async fn pump(pid: Pid, shared: Arc<Shared>, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = inbox.recv().await {
        shared.deliver(pid, envelope);
    }
    shared.close();
    debug!("[os] process {} inbox closed", pid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use psos_ipc::Source;
    use serde_json::json;

    struct Harness {
        os: Os,
        to_program: mpsc::UnboundedSender<Envelope>,
        from_program: mpsc::UnboundedReceiver<Envelope>,
    }

    fn harness(timeout: Option<Duration>) -> Harness {
        let info = ProcessInfo {
            id: 1,
            exec: "/bin/test".into(),
            params: vec!["a".into()],
            identity: Identity::user("guest").unwrap(),
            parent_id: None,
            children: Default::default(),
            dead: false,
        };
        let (outbox, from_program) = mpsc::unbounded_channel();
        let (to_program, inbox) = mpsc::unbounded_channel();
        Harness {
            os: Os::attach(info, outbox, inbox, timeout),
            to_program,
            from_program,
        }
    }

    fn child_info(id: Pid) -> Value {
        json!({
            "id": id,
            "exec": "/bin/child",
            "params": [],
            "identity": {"user": "guest", "working_dir": "/home/guest"},
            "parent_id": 1,
        })
    }

    #[tokio::test]
    async fn test_call_resolves_matching_response() {
        let mut h = harness(None);
        let os = h.os.clone();
        let call = tokio::spawn(async move { os.fs().read("/etc/motd").await });

        let request = h.from_program.recv().await.unwrap();
        assert_eq!(request.kind, MessageType::new("FS", "read"));
        assert_eq!(request.data, json!("/etc/motd"));
        let id = request.id.unwrap();

        h.to_program
            .send(Envelope::response(id, Ok(json!("hello"))))
            .unwrap();
        assert_eq!(call.await.unwrap().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_error_response_rejects() {
        let mut h = harness(None);
        let os = h.os.clone();
        let call = tokio::spawn(async move { os.fs().mkdir("/x").await });

        let id = h.from_program.recv().await.unwrap().id.unwrap();
        h.to_program
            .send(Envelope::response(id, Err(ErrorPayload::permissions("Denied -w-").with_context("/"))))
            .unwrap();
        let err = call.await.unwrap().unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let mut h = harness(Some(Duration::from_millis(20)));
        let err = h.os.process().list().await.unwrap_err();
        assert_eq!(err.category(), "Process Error");
        assert_eq!(err.detail(), "Request timed out");

        // the late reply is ignored
        let id = h.from_program.recv().await.unwrap().id.unwrap();
        h.to_program.send(Envelope::response(id, Ok(json!([])))).unwrap();
        assert!(h.os.inner.shared.lock().pending.is_empty());
    }

    #[tokio::test]
    async fn test_closed_inbox_fails_pending_calls() {
        let Harness {
            os,
            to_program,
            mut from_program,
        } = harness(None);
        let caller = os.clone();
        let call = tokio::spawn(async move { caller.process().self_info().await });

        from_program.recv().await.unwrap();
        drop(to_program);

        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.detail(), "Process has ended");
    }

    #[tokio::test]
    async fn test_hook_replacement() {
        let h = harness(None);
        let mut first = h.os.std_in();
        let mut second = h.os.std_in();
        assert!(first.next().await.is_none());

        h.to_program
            .send(Envelope::notify(
                HookKey::StdIn.message_type(),
                json!({"from": "user", "data": "ls"}),
            ))
            .unwrap();
        let msg = second.next().await.unwrap();
        assert_eq!(msg.from, Source::Name("user".into()));
        assert_eq!(msg.text(), "ls");
    }

    #[tokio::test]
    async fn test_events_before_subscribe_are_kept() {
        let h = harness(None);
        h.to_program
            .send(Envelope::notify(HookKey::ProcessEnd.message_type(), json!(5)))
            .unwrap();
        tokio::task::yield_now().await;

        let mut ends = h.os.child_ends();
        assert_eq!(ends.next().await, Some(5));
    }

    #[tokio::test]
    async fn test_start_and_await_intercepts_child_output() {
        let mut h = harness(None);
        let mut std_in = h.os.std_in();
        let os = h.os.clone();
        let awaited =
            tokio::spawn(async move { os.start_and_await_output("child", vec![]).await });

        let start = h.from_program.recv().await.unwrap();
        assert_eq!(start.kind, MessageType::new("Process", "start"));
        h.to_program
            .send(Envelope::response(start.id.unwrap(), Ok(child_info(2))))
            .unwrap();
        h.to_program
            .send(Envelope::notify(
                HookKey::StdIn.message_type(),
                json!({"from": 2, "data": "42"}),
            ))
            .unwrap();
        h.to_program
            .send(Envelope::notify(
                HookKey::StdIn.message_type(),
                json!({"from": 2, "data": "more"}),
            ))
            .unwrap();

        let first = awaited.await.unwrap().unwrap();
        assert_eq!(first.from, Source::Pid(2));
        assert_eq!(first.data, json!("42"));

        // later output falls through to the application handler
        assert_eq!(std_in.next().await.unwrap().data, json!("more"));
    }

    #[tokio::test]
    async fn test_start_and_await_child_ends_silently() {
        let mut h = harness(None);
        let os = h.os.clone();
        let awaited =
            tokio::spawn(async move { os.start_and_await_output("child", vec![]).await });

        let start = h.from_program.recv().await.unwrap();
        h.to_program
            .send(Envelope::response(start.id.unwrap(), Ok(child_info(3))))
            .unwrap();
        h.to_program
            .send(Envelope::notify(HookKey::ProcessEnd.message_type(), json!(3)))
            .unwrap();

        let err = awaited.await.unwrap().unwrap_err();
        assert_eq!(err.context(), ["3".to_string()]);
    }

    #[tokio::test]
    async fn test_finish_reports_crash() {
        let mut h = harness(None);
        h.os.finish(Err(ErrorPayload::fs("bad")));
        let sent = h.from_program.recv().await.unwrap();
        assert_eq!(sent.kind, MessageType::new("Process", "crash"));
        assert_eq!(sent.data, json!(["FS Error", "bad"]));
        assert!(sent.id.is_none());
    }
}
