// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nvx CLI entrypoint.
//!
//! By default this serves JSON-RPC at `http://<host>:<port>/rpc` and MCP over streamable HTTP at
//! `/mcp`, backed by a host thread that owns the document.
//!
//! Use `--mcp` to serve MCP over stdio instead (intended for tool integrations).

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nvx::backend::BackendSlot;
use nvx::config::ServerConfig;
use nvx::dispatch::{shared_document, Dispatcher, HostLoop};
use nvx::mcp::NvxMcp;
use nvx::model::Document;
use nvx::rpc::manifest::MCP_PATH;
use nvx::rpc::{build_router, http, HandlerContext, Manifest, RpcRouter};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:
  {program} [--document <scene.json>] [--port <port>] [--manifest-out <path>]
  {program} --demo [--port <port>] [--manifest-out <path>]
  {program} [--document <scene.json> | --demo] --mcp

HTTP mode (default) serves `/rpc`, `/health`, `/manifest` and MCP at `/mcp`.
--port overrides NVX_PORT (0 = ephemeral).
--mcp serves MCP over stdio and cannot be combined with --port.

Without --document the built-in demo document is loaded.
Environment: NVX_HOST, NVX_PORT, NVX_REQUEST_TIMEOUT_MS, NVX_MANIFEST_PATH, RUST_LOG."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    mcp: bool,
    demo: bool,
    document: Option<PathBuf>,
    port: Option<u16>,
    manifest_out: Option<PathBuf>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--demo" => {
                if options.demo {
                    return Err(());
                }
                options.demo = true;
            }
            "--document" => {
                if options.document.is_some() {
                    return Err(());
                }
                options.document = Some(PathBuf::from(args.next().ok_or(())?));
            }
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.port = Some(raw.parse().map_err(|_| ())?);
            }
            "--manifest-out" => {
                if options.manifest_out.is_some() {
                    return Err(());
                }
                options.manifest_out = Some(PathBuf::from(args.next().ok_or(())?));
            }
            _ => return Err(()),
        }
    }

    if options.demo && options.document.is_some() {
        return Err(());
    }

    if options.mcp && options.port.is_some() {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_document(options: &CliOptions) -> Result<Document, Box<dyn Error>> {
    match options.document.as_deref() {
        Some(path) => Ok(nvx::store::load_document(path)?),
        None => {
            tracing::info!("no --document given, loading the demo document");
            Ok(nvx::model::fixtures::demo_document())
        }
    }
}

fn write_manifest(
    router: &RpcRouter,
    base_url: &str,
    path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if let Some(path) = path {
        Manifest::from_router(router, base_url).write_to(path)?;
    }
    Ok(())
}

async fn serve_http(
    router: Arc<RpcRouter>,
    config: &ServerConfig,
    manifest_out: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let local = listener.local_addr()?;
    let base_url = format!("http://{local}");
    write_manifest(&router, &base_url, manifest_out)?;

    let mcp_config =
        StreamableHttpServerConfig { stateful_mode: true, ..StreamableHttpServerConfig::default() };
    let shutdown_token = mcp_config.cancellation_token.clone();

    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = {
        let mcp = NvxMcp::new(Arc::clone(&router));
        StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, mcp_config)
    };

    let app = http::with_cors(http::routes(router, &base_url).nest_service(MCP_PATH, mcp_service));
    tracing::info!(%base_url, "serving rpc and mcp");

    let server_shutdown = shutdown_token.clone();
    let signal = tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
            return;
        }
        tracing::info!("shutdown requested");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
        })
        .await?;
    signal.abort();
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "nvx".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();

        let mut config = ServerConfig::from_env()?;
        if let Some(port) = options.port {
            config.port = port;
        }
        let manifest_out = options.manifest_out.clone().or_else(|| config.manifest_path.clone());

        let host = HostLoop::spawn(shared_document(load_document(&options)?))?;
        let dispatcher = Dispatcher::new();
        dispatcher.initialize(host.context())?;

        let backends = Arc::new(BackendSlot::new(dispatcher.clone(), host.document()));
        let context = HandlerContext::new(backends, config.request_timeout);
        let router = Arc::new(build_router(config.server_version.clone(), &context));

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let served = if options.mcp {
            runtime.block_on(async {
                write_manifest(&router, &config.base_url(), manifest_out.as_deref())?;
                NvxMcp::new(router).serve_stdio().await?;
                Ok::<(), Box<dyn Error>>(())
            })
        } else {
            runtime.block_on(serve_http(router, &config, manifest_out.as_deref()))
        };

        dispatcher.shutdown();
        host.stop();
        served
    })();

    if let Err(err) = result {
        eprintln!("nvx: {err}");
        std::process::exit(1);
    }
}
