// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Backend selection.
//!
//! A [`DocumentBackend`] executes document jobs. [`UiBackend`] prefers the host thread and
//! falls back per call to direct access; [`DirectBackend`] locks the document from a blocking
//! worker. [`BackendSlot`] picks one of them lazily, exactly once.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::dispatch::{lock_document, DispatchError, Dispatcher, SharedDocument};
use crate::model::Document;

/// A document job. Shared so a failed host-thread attempt can be replayed on the direct path.
pub type DocumentJob = Arc<dyn Fn(&mut Document) + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("direct document access failed: {0}")]
    Direct(String),
    #[error("document job finished without a result")]
    MissingResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ui,
    Direct,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait DocumentBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn execute(&self, job: DocumentJob) -> Result<(), BackendError>;
}

/// A job result together with the document revision it was computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<T> {
    pub value: T,
    pub revision: u64,
}

/// Runs `f` through `backend` and hands back its value.
pub async fn call<T, F>(backend: &dyn DocumentBackend, f: F) -> Result<Observed<T>, BackendError>
where
    T: Send + 'static,
    F: Fn(&mut Document) -> T + Send + Sync + 'static,
{
    let slot: Arc<Mutex<Option<Observed<T>>>> = Arc::new(Mutex::new(None));
    let writer = Arc::clone(&slot);
    let job: DocumentJob = Arc::new(move |document: &mut Document| {
        let value = f(document);
        let revision = document.revision();
        *writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(Observed { value, revision });
    });
    backend.execute(job).await?;
    let observed = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    observed.ok_or(BackendError::MissingResult)
}

/// Talks to the document directly from a blocking worker thread.
#[derive(Clone)]
pub struct DirectBackend {
    document: SharedDocument,
}

impl DirectBackend {
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl DocumentBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    async fn execute(&self, job: DocumentJob) -> Result<(), BackendError> {
        let document = Arc::clone(&self.document);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_document(&document);
            job(&mut guard);
        })
        .await
        .map_err(|err| BackendError::Direct(err.to_string()))
    }
}

/// Prefers the host thread; any dispatch failure is logged and the job replayed directly.
pub struct UiBackend {
    dispatcher: Dispatcher,
    direct: DirectBackend,
}

impl UiBackend {
    pub fn try_new(dispatcher: Dispatcher, document: SharedDocument) -> Result<Self, BackendError> {
        if !dispatcher.is_initialized() {
            return Err(DispatchError::NotInitialized.into());
        }
        Ok(Self { dispatcher, direct: DirectBackend::new(document) })
    }

    pub fn is_available(&self) -> bool {
        self.dispatcher.is_initialized()
    }
}

#[async_trait]
impl DocumentBackend for UiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ui
    }

    async fn execute(&self, job: DocumentJob) -> Result<(), BackendError> {
        if self.dispatcher.is_initialized() {
            let host_job = Arc::clone(&job);
            match self.dispatcher.invoke(move |document| host_job(document)).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        "host-thread call failed, retrying with direct access"
                    );
                }
            }
        } else {
            tracing::warn!("dispatcher no longer initialized, using direct access");
        }
        self.direct.execute(job).await
    }
}

/// Holds the process-wide backend, selected on first use.
pub struct BackendSlot {
    dispatcher: Dispatcher,
    document: SharedDocument,
    selected: OnceLock<Arc<dyn DocumentBackend>>,
}

impl BackendSlot {
    pub fn new(dispatcher: Dispatcher, document: SharedDocument) -> Self {
        Self { dispatcher, document, selected: OnceLock::new() }
    }

    pub fn get(&self) -> Arc<dyn DocumentBackend> {
        Arc::clone(self.selected.get_or_init(|| self.select()))
    }

    pub fn selected_kind(&self) -> Option<BackendKind> {
        self.selected.get().map(|backend| backend.kind())
    }

    fn select(&self) -> Arc<dyn DocumentBackend> {
        match UiBackend::try_new(self.dispatcher.clone(), Arc::clone(&self.document)) {
            Ok(backend) if backend.is_available() => {
                tracing::info!(backend = %BackendKind::Ui, "document backend selected");
                Arc::new(backend)
            }
            Ok(_) => {
                tracing::warn!(
                    backend = %BackendKind::Direct,
                    "host thread unavailable, document backend selected"
                );
                Arc::new(DirectBackend::new(Arc::clone(&self.document)))
            }
            Err(err) => {
                tracing::warn!(
                    backend = %BackendKind::Direct,
                    error = %err,
                    "document backend selected"
                );
                Arc::new(DirectBackend::new(Arc::clone(&self.document)))
            }
        }
    }
}

impl fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSlot")
            .field("selected", &self.selected_kind())
            .finish_non_exhaustive()
    }
}
