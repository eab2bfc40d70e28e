//! Wallet mediator server.
//!
//! Run with: cargo run -p wallet-server
//!
//! Requester pages connect to `ws://localhost:3000/rpc`, the approver UI to
//! `ws://localhost:3000/approver`. Open http://localhost:3000 for a test page
//! that plays both roles.

use std::sync::Arc;

use axum::{Router, response::Html, routing::get};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wallet_mediator_core::{DecisionBus, MediatorConfig};
use wallet_mediator_pipeline::{Collaborators, Mediator, storage::MemoryStore};
use wallet_mediator_transport::{ApproverSurface, SocketContexts, WsState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = MediatorConfig::from_env()?;
    tracing::info!(
        timeout = ?config.decision_timeout,
        bus_capacity = config.bus_capacity,
        "Loaded configuration"
    );

    let store = Arc::new(MemoryStore::new());
    let bus = DecisionBus::new(config.bus_capacity);
    let contexts = Arc::new(SocketContexts::new());
    let surface = Arc::new(ApproverSurface::new(store.clone()));

    let collaborators = Collaborators::with_store(store, surface.clone(), contexts.clone());
    let addr = config.bind_addr;
    let mediator = Arc::new(Mediator::new(collaborators, bus.clone(), config));

    let state = WsState {
        mediator,
        contexts,
        surface,
        bus,
    };

    let app = Router::new()
        .route("/", get(index_handler))
        .merge(create_router(state))
        .layer(CorsLayer::permissive());

    tracing::info!("Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Wallet Mediator</title>
    <style>
        body { font-family: monospace; margin: 2em; background: #1e1e1e; color: #d4d4d4; }
        section { margin-bottom: 2em; }
        button { margin-right: 0.5em; }
        pre { background: #111; padding: 1em; min-height: 6em; white-space: pre-wrap; }
    </style>
</head>
<body>
    <section>
        <h3>Requester</h3>
        <button onclick="call('zond_requestAccounts', [])">zond_requestAccounts</button>
        <button onclick="call('personal_sign', [account, '0x6869'])">personal_sign</button>
        <button onclick="call('zond_chainId', [])">zond_chainId</button>
        <pre id="requester"></pre>
    </section>
    <section>
        <h3>Approver</h3>
        <button onclick="decide(true)">Approve</button>
        <button onclick="decide(false)">Reject</button>
        <pre id="approver"></pre>
    </section>
    <script>
        const base = `ws://${location.host}`;
        const rpc = new WebSocket(`${base}/rpc`);
        const approver = new WebSocket(`${base}/approver`);
        const log = (id, line) => document.getElementById(id).textContent += line + '\n';
        let nextId = 1;
        let account = 'Z20000000000000000000000000000000000000aa';
        let pending = null;

        rpc.onopen = () => rpc.send(JSON.stringify({ type: 'hello', url: location.href }));
        rpc.onmessage = (e) => {
            const msg = JSON.parse(e.data);
            if (msg.type === 'context_call') {
                const result = msg.message.data.method === 'zond_chainId' ? '0x1' : null;
                rpc.send(JSON.stringify({ type: 'context_reply', id: msg.id, result }));
                return;
            }
            log('requester', e.data);
        };

        approver.onmessage = (e) => {
            pending = JSON.parse(e.data).request || null;
            log('approver', e.data);
        };

        function call(method, params) {
            rpc.send(JSON.stringify({ type: 'request', id: nextId++, method, params }));
        }

        function decide(approved) {
            if (!pending) return;
            const response = {
                zond_requestAccounts: { accounts: [account] },
                zond_sendTransaction: { transactionHash: '0x' + '00'.repeat(32) },
            }[pending.method] || { signature: '0x' + 'ab'.repeat(65) };
            approver.send(JSON.stringify({
                action: 'DAPP_RESPONSE',
                method: pending.method,
                requestId: pending.requestId,
                hasApproved: approved,
                response,
            }));
            pending = null;
        }
    </script>
</body>
</html>
"#;
