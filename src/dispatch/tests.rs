// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use pretty_assertions::assert_eq;

use super::*;
use crate::model::fixtures::demo_document;

fn ready() -> (HostLoop, Dispatcher) {
    let host = HostLoop::spawn(shared_document(demo_document())).expect("spawn host loop");
    let dispatcher = Dispatcher::new();
    dispatcher.initialize(host.context()).expect("initialize dispatcher");
    (host, dispatcher)
}

#[tokio::test]
async fn invoke_before_initialize_fails_fast() {
    let dispatcher = Dispatcher::new();
    assert!(!dispatcher.is_initialized());
    let err = dispatcher.invoke(|document| document.revision()).await.unwrap_err();
    assert_eq!(err, DispatchError::NotInitialized);
    assert_eq!(
        dispatcher.invoke_blocking(|document| document.revision()).unwrap_err(),
        DispatchError::NotInitialized
    );
}

#[tokio::test]
async fn runs_jobs_on_the_host_thread() {
    let (host, dispatcher) = ready();
    let thread = dispatcher.invoke(|_| std::thread::current().id()).await.expect("invoke");
    assert_eq!(thread, host.context().thread_id());
    assert_ne!(thread, std::thread::current().id());

    let observer = dispatcher.clone();
    assert!(dispatcher.invoke(move |_| observer.is_host_thread()).await.expect("invoke"));
    assert!(!dispatcher.is_host_thread());
}

#[tokio::test]
async fn mutations_are_visible_to_later_jobs() {
    let (host, dispatcher) = ready();
    let before = dispatcher.invoke(|document| document.revision()).await.expect("revision");
    dispatcher.invoke(|document| document.clear_selection()).await.expect("clear");
    let after = dispatcher.invoke(|document| document.revision()).await.expect("revision");
    assert!(after > before);
    assert_eq!(lock_document(&host.document()).revision(), after);
}

#[test]
fn second_initialize_is_rejected() {
    let (host, dispatcher) = ready();
    assert_eq!(
        dispatcher.initialize(host.context()).unwrap_err(),
        DispatchError::AlreadyInitialized
    );
}

#[tokio::test]
async fn panics_cross_the_hop_as_errors() {
    let (_host, dispatcher) = ready();
    let err = dispatcher.invoke(|_| -> u64 { panic!("boom") }).await.unwrap_err();
    assert_eq!(err, DispatchError::Panicked("boom".to_owned()));

    let revision = dispatcher.invoke(|document| document.revision()).await;
    assert!(revision.is_ok(), "host loop survives a panicking job");
}

#[test]
fn blocking_invoke_from_a_plain_thread() {
    let (_host, dispatcher) = ready();
    let worker = std::thread::spawn(move || {
        dispatcher.invoke_blocking(|document| document.title().to_owned())
    });
    let title = worker.join().expect("worker").expect("invoke");
    assert_eq!(title, "Demo Project");
}

#[test]
fn nested_invoke_on_the_host_thread_is_reentrant() {
    let (_host, dispatcher) = ready();
    let inner = dispatcher.clone();
    let nested = dispatcher
        .invoke_blocking(move |_| inner.invoke_blocking(|document| document.revision()))
        .expect("outer invoke");
    assert_eq!(nested, Err(DispatchError::Reentrant));
}

#[tokio::test]
async fn async_invoke_from_inside_a_job_is_reentrant() {
    let (_host, dispatcher) = ready();
    let inner = dispatcher.clone();
    let nested = dispatcher
        .invoke(move |_| futures::executor::block_on(inner.invoke(|document| document.revision())))
        .await
        .expect("outer invoke");
    assert_eq!(nested, Err(DispatchError::Reentrant));

    let revision = dispatcher.invoke(|document| document.revision()).await;
    assert!(revision.is_ok(), "host loop keeps serving after a reentrant call");
}

#[tokio::test]
async fn stopped_loop_reports_stopped() {
    let (host, dispatcher) = ready();
    host.stop();
    let err = dispatcher.invoke(|document| document.revision()).await.unwrap_err();
    assert_eq!(err, DispatchError::HostLoopStopped);
}

#[test]
fn initialize_rejects_a_dead_loop() {
    let host = HostLoop::spawn(shared_document(demo_document())).expect("spawn host loop");
    let context = host.context();
    host.stop();
    assert_eq!(Dispatcher::new().initialize(context).unwrap_err(), DispatchError::HostLoopStopped);
}

#[tokio::test]
async fn shutdown_returns_to_not_initialized() {
    let (_host, dispatcher) = ready();
    assert!(dispatcher.shutdown());
    assert!(!dispatcher.shutdown());
    let err = dispatcher.invoke(|document| document.revision()).await.unwrap_err();
    assert_eq!(err, DispatchError::NotInitialized);
}
