//! inpage-bridge: drives the wallet provider bridge over stdin/stdout.
//!
//! Every stdin line is a JSON-RPC request, a host push (`{"push": ..}`) or a
//! host answer to an envelope (`{"hostResponse": ..}`). Responses and, when no
//! signer key is configured, outbound envelopes are written to stdout one JSON
//! document per line. Logs go to stderr.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use inpage_bridge_adapters::{BridgeAdapterConfig, ChannelHost, HttpRpcAdapter, LocalSignerHost};
use inpage_bridge_core::{
    HostPush, JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, OutboundEnvelope, Provider,
    ProviderEventKind,
};

type BridgeProvider = Provider<HttpRpcAdapter>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Push {
        push: HostPush,
    },
    HostResponse {
        #[serde(rename = "hostResponse")]
        host_response: HostAnswer,
    },
    Request(JsonRpcRequest),
}

#[derive(Debug, Deserialize)]
struct HostAnswer {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Serialize)]
struct EnvelopeLine<'a> {
    envelope: &'a OutboundEnvelope,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = BridgeAdapterConfig::from_env()?;
    let signer = cfg
        .signer_key
        .as_deref()
        .map(LocalSignerHost::from_key)
        .transpose()?;

    let mut provider_config = cfg.provider_config();
    if provider_config.address.is_empty() {
        if let Some(signer) = &signer {
            provider_config.address = signer.address().to_owned();
        }
    }

    let (host, inbox) = ChannelHost::new();
    let rpc = HttpRpcAdapter::with_config(&cfg)?;
    let provider = Provider::with_options(provider_config, host, rpc, cfg.provider_options())?;
    log_events(&provider);

    tracing::info!(
        chain_id = %provider.chain_id(),
        address = %provider.address(),
        rpc_url = %provider.rpc_url(),
        local_signer = signer.is_some(),
        "Starting inpage-bridge"
    );

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let host_task = match signer {
        Some(signer) => {
            let served = provider.clone();
            tokio::spawn(async move { signer.serve(served, inbox).await })
        }
        None => tokio::spawn(forward_envelopes(inbox, out_tx.clone())),
    };

    let mut requests = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        handle_line(&provider, &line, &out_tx, &mut requests);
    }

    // stdin closed: give in-flight calls one rpc timeout to finish.
    let drained = tokio::time::timeout(cfg.rpc_timeout(), async {
        while requests.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            abandoned = requests.len(),
            pending_host = provider.pending_requests(),
            "stdin closed with calls still in flight"
        );
        requests.abort_all();
    }

    host_task.abort();
    drop(out_tx);
    match tokio::time::timeout(Duration::from_secs(5), writer).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!("stdout writer did not finish"),
    }
    Ok(())
}

fn handle_line(
    provider: &BridgeProvider,
    line: &str,
    out: &mpsc::UnboundedSender<String>,
    requests: &mut JoinSet<()>,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<InputLine>(line) {
        Ok(InputLine::Request(request)) => {
            let provider = provider.clone();
            let out = out.clone();
            requests.spawn(async move {
                let id = request.id.clone().unwrap_or(Value::Null);
                let response = match provider.request(request).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::failure(id, &e),
                };
                emit(&out, &response);
            });
        }
        Ok(InputLine::Push { push }) => match provider.receive_config_change(push) {
            Ok(events) => tracing::debug!(events = events.len(), "host push applied"),
            Err(e) => tracing::warn!(error = %e, "host push rejected"),
        },
        Ok(InputLine::HostResponse { host_response }) => {
            let HostAnswer { id, result, error } = host_response;
            let matched = match error {
                Some(error) => provider.send_error(id, error),
                None => provider.send_response(id, result.unwrap_or(Value::Null)),
            };
            if !matched {
                tracing::warn!(id, "host response matched no pending request");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "unparseable input line");
            emit(
                out,
                &JsonRpcResponse {
                    id: Value::Null,
                    jsonrpc: "2.0".to_owned(),
                    result: None,
                    error: Some(JsonRpcErrorObject {
                        code: -32700,
                        message: format!("parse error: {e}"),
                        data: None,
                    }),
                },
            );
        }
    }
}

async fn forward_envelopes(
    mut inbox: mpsc::UnboundedReceiver<OutboundEnvelope>,
    out: mpsc::UnboundedSender<String>,
) {
    while let Some(envelope) = inbox.recv().await {
        emit(&out, &EnvelopeLine { envelope: &envelope });
    }
}

fn emit<T: Serialize>(out: &mpsc::UnboundedSender<String>, value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            if out.send(line).is_err() {
                tracing::warn!("stdout writer closed; dropping output line");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to encode output line"),
    }
}

fn log_events(provider: &BridgeProvider) {
    for kind in [
        ProviderEventKind::AccountsChanged,
        ProviderEventKind::ChainChanged,
        ProviderEventKind::Connect,
        ProviderEventKind::Disconnect,
    ] {
        provider.on(kind, move |payload| {
            tracing::info!(event = kind.as_str(), %payload, "provider event");
        });
    }
}
