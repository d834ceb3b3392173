// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Host-thread dispatch bridge.
//!
//! The document may only be touched from the thread that owns the host loop. [`HostLoop`]
//! spawns that thread; [`Dispatcher`] is the explicit handle callers use to run closures on it.
//! Calls from any other thread are posted and awaited. A call made on the host thread can only
//! come from inside a running job, which would wait on itself, so it fails with
//! [`DispatchError::Reentrant`].

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::model::Document;

pub type SharedDocument = Arc<Mutex<Document>>;

type HostJob = Box<dyn FnOnce(&mut Document) + Send + 'static>;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

pub fn shared_document(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Locks the document, recovering from a poisoned lock left by a panicking job.
pub fn lock_document(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(
        "dispatcher is not initialized; start the host loop and initialize the dispatcher first"
    )]
    NotInitialized,
    #[error("dispatcher is already initialized")]
    AlreadyInitialized,
    #[error("host loop has stopped")]
    HostLoopStopped,
    #[error("host job cannot wait on another host job")]
    Reentrant,
    #[error("host job panicked: {0}")]
    Panicked(String),
}

enum HostMessage {
    Run(HostJob),
    Ping(mpsc::SyncSender<ThreadId>),
    Stop,
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_owned()
}

fn run_guarded<T, F>(f: F, document: &mut Document) -> Result<T, DispatchError>
where
    F: FnOnce(&mut Document) -> T,
{
    catch_unwind(AssertUnwindSafe(|| f(document)))
        .map_err(|payload| DispatchError::Panicked(panic_message(payload)))
}

/// Handle to a running host loop. Only [`HostLoop::spawn`] creates one, so a context always
/// belongs to a real host thread.
#[derive(Clone)]
pub struct HostContext {
    sender: mpsc::Sender<HostMessage>,
    thread_id: ThreadId,
    document: SharedDocument,
}

impl HostContext {
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn post(&self, job: HostJob) -> Result<(), DispatchError> {
        self.sender.send(HostMessage::Run(job)).map_err(|_| DispatchError::HostLoopStopped)
    }

    fn ping(&self) -> Result<ThreadId, DispatchError> {
        let (reply, answer) = mpsc::sync_channel(1);
        self.sender.send(HostMessage::Ping(reply)).map_err(|_| DispatchError::HostLoopStopped)?;
        answer.recv_timeout(PING_TIMEOUT).map_err(|_| DispatchError::HostLoopStopped)
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").field("thread_id", &self.thread_id).finish_non_exhaustive()
    }
}

/// Dedicated thread that owns document access. Jobs run in FIFO posting order.
pub struct HostLoop {
    context: HostContext,
    handle: Option<JoinHandle<()>>,
}

impl HostLoop {
    pub fn spawn(document: SharedDocument) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let loop_document = Arc::clone(&document);
        let handle = thread::Builder::new()
            .name("nvx-host".to_owned())
            .spawn(move || run_host_loop(&receiver, &loop_document))?;
        let thread_id = handle.thread().id();
        Ok(Self { context: HostContext { sender, thread_id, document }, handle: Some(handle) })
    }

    pub fn context(&self) -> HostContext {
        self.context.clone()
    }

    pub fn document(&self) -> SharedDocument {
        Arc::clone(&self.context.document)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.context.sender.send(HostMessage::Stop).is_err() {
            tracing::debug!("host loop already gone");
        }
        if handle.join().is_err() {
            tracing::error!("host loop thread panicked");
        }
    }
}

impl Drop for HostLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_host_loop(receiver: &mpsc::Receiver<HostMessage>, document: &SharedDocument) {
    tracing::debug!("host loop started");
    while let Ok(message) = receiver.recv() {
        match message {
            HostMessage::Run(job) => {
                let mut guard = lock_document(document);
                job(&mut guard);
            }
            HostMessage::Ping(reply) => {
                if reply.send(thread::current().id()).is_err() {
                    tracing::debug!("ping reply dropped");
                }
            }
            HostMessage::Stop => break,
        }
    }
    tracing::debug!("host loop stopped");
}

#[derive(Debug, Default)]
enum DispatcherState {
    #[default]
    Uninitialized,
    Ready(HostContext),
    ShutDown,
}

/// Explicit, clonable handle to the captured host context.
///
/// Every call before [`Dispatcher::initialize`] (or after [`Dispatcher::shutdown`]) fails with
/// [`DispatchError::NotInitialized`].
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    state: Arc<RwLock<DispatcherState>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures `context`, after checking that its host loop answers.
    pub fn initialize(&self, context: HostContext) -> Result<(), DispatchError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, DispatcherState::Ready(_)) {
            return Err(DispatchError::AlreadyInitialized);
        }
        let answered_from = context.ping()?;
        if answered_from != context.thread_id {
            return Err(DispatchError::HostLoopStopped);
        }
        tracing::info!(thread = ?context.thread_id, "dispatcher initialized");
        *state = DispatcherState::Ready(context);
        Ok(())
    }

    /// Releases the captured context. Returns whether one was held.
    pub fn shutdown(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let was_ready = matches!(*state, DispatcherState::Ready(_));
        *state = DispatcherState::ShutDown;
        was_ready
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(PoisonError::into_inner),
            DispatcherState::Ready(_)
        )
    }

    pub fn is_host_thread(&self) -> bool {
        self.context().map(|context| context.is_current_thread()).unwrap_or(false)
    }

    fn context(&self) -> Result<HostContext, DispatchError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            DispatcherState::Ready(context) => Ok(context.clone()),
            DispatcherState::Uninitialized | DispatcherState::ShutDown => {
                Err(DispatchError::NotInitialized)
            }
        }
    }

    /// Runs `f` on the host thread and awaits its result.
    pub async fn invoke<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Document) -> T + Send + 'static,
    {
        let context = self.context()?;
        if context.is_current_thread() {
            return Err(DispatchError::Reentrant);
        }
        let (sender, receiver) = oneshot::channel();
        context.post(Box::new(move |document: &mut Document| {
            if sender.send(run_guarded(f, document)).is_err() {
                tracing::debug!("host job result dropped by caller");
            }
        }))?;
        receiver.await.map_err(|_| DispatchError::HostLoopStopped)?
    }

    /// Blocking variant of [`Dispatcher::invoke`] for callers outside an async runtime.
    pub fn invoke_blocking<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Document) -> T + Send + 'static,
    {
        let context = self.context()?;
        if context.is_current_thread() {
            return Err(DispatchError::Reentrant);
        }
        let (sender, receiver) = mpsc::sync_channel(1);
        context.post(Box::new(move |document: &mut Document| {
            if sender.send(run_guarded(f, document)).is_err() {
                tracing::debug!("host job result dropped by caller");
            }
        }))?;
        receiver.recv().map_err(|_| DispatchError::HostLoopStopped)?
    }
}

#[cfg(test)]
mod tests;
