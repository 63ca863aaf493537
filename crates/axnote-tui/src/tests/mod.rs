//! Headless integration tests: a real state manager and kernel manager
//! driven over their channels, with the execution service mocked at the
//! HTTP boundary.

use std::sync::Arc;
use std::time::Duration;

use axnote_core::{Cell, Document, FocusTarget, OutputState};
use httpmock::prelude::*;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::app_state::{AppState, LifecycleOp, StateCommand, state_manager};
use crate::event_bus::{EventBus, EventBusCaps};
use crate::executor::kernel_manager;

struct Harness {
    state: Arc<AppState>,
    cmd_tx: mpsc::Sender<StateCommand>,
    event_bus: Arc<EventBus>,
}

fn spawn_harness(server: &MockServer) -> Harness {
    let client = axnote_kernel::KernelClient::new(Url::parse(&server.url("/api")).unwrap());
    let event_bus = Arc::new(EventBus::new(EventBusCaps::default()));
    let state = Arc::new(AppState::new());
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (kernel_tx, kernel_rx) = mpsc::channel(16);
    tokio::spawn(state_manager(
        Arc::clone(&state),
        cmd_rx,
        kernel_tx,
        Arc::clone(&event_bus),
    ));
    tokio::spawn(kernel_manager(
        kernel_rx,
        Arc::clone(&state),
        cmd_tx.clone(),
        client,
    ));
    Harness {
        state,
        cmd_tx,
        event_bus,
    }
}

async fn load_cells(harness: &Harness, cells: Vec<Cell>) {
    harness
        .state
        .notebook
        .write()
        .await
        .load(Document::from_cells(cells), "test.ipynb");
}

async fn execute_and_wait(harness: &Harness, index: usize) {
    let (done_tx, done_rx) = oneshot::channel();
    harness
        .cmd_tx
        .send(StateCommand::ExecuteCell {
            index,
            done: Some(done_tx),
        })
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("execution should complete")
        .unwrap();
}

/// Polling helper for operations with no completion acknowledgement.
macro_rules! wait_until {
    ($cond:expr) => {{
        let mut settled = false;
        for _ in 0..100 {
            if $cond {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(settled, "condition not reached in time: {}", stringify!($cond));
    }};
}

#[tokio::test]
async fn executing_a_code_cell_renders_the_reply_fragments() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(POST).path("/api/execute");
        then.status(200).json_body(serde_json::json!({
            "status": "ok",
            "output": [
                { "type": "stream", "text": "a" },
                { "type": "execute_result", "text": "b" },
            ],
        }));
    });

    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("print('ab')")]).await;
    execute_and_wait(&harness, 0).await;

    let session = harness.state.notebook.read().await;
    let cell = session.document.get(0).unwrap();
    assert_eq!(cell.output, OutputState::Rendered { text: "ab".into() });
    assert!(!cell.is_busy());
}

#[tokio::test]
async fn execution_failures_land_in_the_cell_as_errors() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(POST).path("/api/execute");
        then.status(200).json_body(serde_json::json!({
            "status": "error",
            "error": { "ename": "ValueError", "evalue": "bad" },
        }));
    });

    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("boom()")]).await;
    execute_and_wait(&harness, 0).await;

    let session = harness.state.notebook.read().await;
    let cell = session.document.get(0).unwrap();
    assert!(cell.output.is_error());
    assert_eq!(cell.output.text(), "ValueError: bad");
    assert!(!cell.is_busy());
}

#[tokio::test]
async fn unreachable_service_is_contained_at_cell_granularity() {
    // No mock server at all; port 1 refuses connections.
    let client = axnote_kernel::KernelClient::new(Url::parse("http://127.0.0.1:1/api").unwrap());
    let event_bus = Arc::new(EventBus::new(EventBusCaps::default()));
    let state = Arc::new(AppState::new());
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (kernel_tx, kernel_rx) = mpsc::channel(16);
    tokio::spawn(state_manager(
        Arc::clone(&state),
        cmd_rx,
        kernel_tx,
        Arc::clone(&event_bus),
    ));
    tokio::spawn(kernel_manager(
        kernel_rx,
        Arc::clone(&state),
        cmd_tx.clone(),
        client,
    ));
    let harness = Harness {
        state,
        cmd_tx,
        event_bus,
    };

    load_cells(&harness, vec![Cell::code("1 + 1")]).await;
    execute_and_wait(&harness, 0).await;

    let session = harness.state.notebook.read().await;
    let cell = session.document.get(0).unwrap();
    assert!(cell.output.is_error());
    assert!(!cell.is_busy());
}

#[tokio::test]
async fn executing_an_empty_cell_is_a_no_op() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/execute");
        then.status(200)
            .json_body(serde_json::json!({ "status": "ok", "output": [] }));
    });

    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("   \n  ")]).await;
    execute_and_wait(&harness, 0).await;

    assert_eq!(mock.hits(), 0);
    let session = harness.state.notebook.read().await;
    assert!(session.document.get(0).unwrap().output.is_empty());
}

#[tokio::test]
async fn a_busy_cell_cannot_be_retriggered() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/execute");
        then.status(200)
            .json_body(serde_json::json!({ "status": "ok", "output": [] }));
    });

    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("work()")]).await;
    // Simulate an in-flight request by hand.
    harness
        .state
        .notebook
        .write()
        .await
        .begin_run(0, uuid::Uuid::new_v4());

    execute_and_wait(&harness, 0).await;
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn prose_execution_renders_locally_and_focuses_the_output() {
    let server = MockServer::start();
    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::prose("# Title\r\n\r\n\r\nBody  ")]).await;
    harness.state.notebook.write().await.enter_edit(0);

    execute_and_wait(&harness, 0).await;

    let session = harness.state.notebook.read().await;
    let cell = session.document.get(0).unwrap();
    assert_eq!(
        cell.output,
        OutputState::Rendered {
            text: "Title\n\nBody".into()
        }
    );
    assert!(!cell.is_editing());
    assert_eq!(session.focus(), FocusTarget::output(0));
}

#[tokio::test]
async fn run_all_executes_in_order_and_continues_past_failures() {
    let server = MockServer::start();
    let _ok_one = server.mock(|when, then| {
        when.method(POST)
            .path("/api/execute")
            .json_body(serde_json::json!({ "code": "one" }));
        then.status(200).json_body(serde_json::json!({
            "status": "ok",
            "output": [{ "type": "stream", "text": "1" }],
        }));
    });
    let _fail = server.mock(|when, then| {
        when.method(POST)
            .path("/api/execute")
            .json_body(serde_json::json!({ "code": "boom" }));
        then.status(200).json_body(serde_json::json!({
            "status": "error",
            "error": { "ename": "RuntimeError", "evalue": "boom" },
        }));
    });
    let _ok_three = server.mock(|when, then| {
        when.method(POST)
            .path("/api/execute")
            .json_body(serde_json::json!({ "code": "three" }));
        then.status(200).json_body(serde_json::json!({
            "status": "ok",
            "output": [{ "type": "stream", "text": "3" }],
        }));
    });

    let harness = spawn_harness(&server);
    load_cells(
        &harness,
        vec![Cell::code("one"), Cell::code("boom"), Cell::code("three")],
    )
    .await;
    harness.cmd_tx.send(StateCommand::RunAll).await.unwrap();

    wait_until!({
        let session = harness.state.notebook.read().await;
        session
            .document
            .iter()
            .all(|cell| !cell.output.is_empty() && !cell.is_busy())
    });

    let session = harness.state.notebook.read().await;
    assert_eq!(
        session.document.get(0).unwrap().output,
        OutputState::Rendered { text: "1".into() }
    );
    assert_eq!(
        session.document.get(1).unwrap().output.text(),
        "RuntimeError: boom"
    );
    // The failure in the middle did not stop the sweep.
    assert_eq!(
        session.document.get(2).unwrap().output,
        OutputState::Rendered { text: "3".into() }
    );
}

#[tokio::test]
async fn restart_clears_outputs_and_marks_the_kernel_alive() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(POST).path("/api/restart");
        then.status(200)
            .json_body(serde_json::json!({ "status": "ok" }));
    });

    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("x"), Cell::prose("y")]).await;
    {
        let mut session = harness.state.notebook.write().await;
        for cell in session.document.iter_mut() {
            cell.output = OutputState::Rendered {
                text: "stale".into(),
            };
        }
    }

    harness
        .cmd_tx
        .send(StateCommand::Kernel {
            op: LifecycleOp::Restart,
        })
        .await
        .unwrap();

    wait_until!({
        let session = harness.state.notebook.read().await;
        let system = harness.state.system.read().await;
        session.document.iter().all(|cell| cell.output.is_empty())
            && system.kernel_alive
            && !system.lifecycle_busy
    });
}

#[tokio::test]
async fn failed_lifecycle_calls_surface_as_error_events() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(POST).path("/api/start");
        then.status(200)
            .json_body(serde_json::json!({ "status": "no interpreter" }));
    });

    let harness = spawn_harness(&server);
    let mut errors = harness.event_bus.subscribe_errors();
    harness
        .cmd_tx
        .send(StateCommand::Kernel {
            op: LifecycleOp::Start,
        })
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("error event should arrive")
        .unwrap();
    assert!(event.message.contains("start"));
    assert!(!harness.state.system.read().await.lifecycle_busy);
}

#[tokio::test]
async fn loading_a_notebook_renders_prose_and_focuses_the_first_cell() {
    let server = MockServer::start();
    let harness = spawn_harness(&server);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loaded.ipynb");
    let json = serde_json::json!({
        "cells": [
            { "cell_type": "code", "source": ["print(1)\n", "print(2)"], "metadata": {} },
            { "cell_type": "code", "source": [], "metadata": {} },
            { "cell_type": "markdown", "source": ["# Hello"], "metadata": {} },
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    std::fs::write(&path, json.to_string()).unwrap();

    harness
        .cmd_tx
        .send(StateCommand::OpenNotebook { path: path.clone() })
        .await
        .unwrap();

    wait_until!(harness.state.notebook.read().await.name == "loaded.ipynb");

    let session = harness.state.notebook.read().await;
    assert_eq!(session.document.len(), 3);
    assert_eq!(
        session.document.get(2).unwrap().output,
        OutputState::Rendered {
            text: "Hello".into()
        }
    );
    assert_eq!(session.focus(), FocusTarget::output(0));
    assert_eq!(session.document.editing_index(), None);
    assert_eq!(
        harness.state.system.read().await.notebook_path.as_deref(),
        Some(path.as_path())
    );
}

#[tokio::test]
async fn a_malformed_notebook_leaves_the_live_document_untouched() {
    let server = MockServer::start();
    let harness = spawn_harness(&server);
    load_cells(&harness, vec![Cell::code("keep me")]).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ipynb");
    std::fs::write(&path, "{definitely not json").unwrap();

    let mut errors = harness.event_bus.subscribe_errors();
    harness
        .cmd_tx
        .send(StateCommand::OpenNotebook { path })
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("error event should arrive")
        .unwrap();
    assert!(event.message.contains("open failed"));

    let session = harness.state.notebook.read().await;
    assert_eq!(session.document.len(), 1);
    assert_eq!(session.document.get(0).unwrap().source, "keep me");
}
