//! `ProxyHttp` implementation: request routing, balancing, and header
//! transforms, grounded on the teacher's `router-core/src/app/gateway.rs`
//! shape and on `original_source/server/handle.go`'s `ProxyHandle.serve` /
//! `proxyPass` for the routing semantics themselves.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use log::{error, info};
use pingora::prelude::HttpPeer;
use pingora::proxy::{ProxyHttp, Session};

use crate::config::When;
use crate::pages;
use crate::proxy::domain::{ProxyDomain, ProxyHandles};
use crate::variable::VariableStore;

/// Per-request state threaded through the `ProxyHttp` callbacks.
pub struct GatewayCtx {
    store: VariableStore,
    start: Instant,
    matched: Option<MatchedRule>,
    had_error: bool,
}

struct MatchedRule {
    domain: Arc<ProxyDomain>,
    rule_index: usize,
    upstream_host: String,
    upstream_path: String,
    upstream_tls: bool,
}

impl Default for GatewayCtx {
    fn default() -> Self {
        GatewayCtx {
            store: VariableStore::new(),
            start: Instant::now(),
            matched: None,
            had_error: false,
        }
    }
}

/// One gateway instance per listening app (per port), holding the current
/// routing table behind a lock so a reload can swap it atomically without
/// tearing down the listener itself. Cloning a `GatewayApp` shares the same
/// lock and table — pingora takes ownership of the instance handed to
/// `http_proxy_service`, so `main.rs` keeps a clone of its own to drive
/// reloads against the same live state.
#[derive(Clone)]
pub struct GatewayApp {
    handles: Arc<RwLock<Arc<ProxyHandles>>>,
}

impl GatewayApp {
    pub fn new(handles: Arc<ProxyHandles>) -> Self {
        GatewayApp {
            handles: Arc::new(RwLock::new(handles)),
        }
    }

    /// Swap in a freshly-built routing table, used by the reload coordinator.
    pub fn replace_handles(&self, handles: Arc<ProxyHandles>) -> Arc<ProxyHandles> {
        let mut guard = self.handles.write().unwrap();
        std::mem::replace(&mut *guard, handles)
    }

    fn current(&self) -> Arc<ProxyHandles> {
        self.handles.read().unwrap().clone()
    }
}

#[async_trait]
impl ProxyHttp for GatewayApp {
    type CTX = GatewayCtx;

    fn new_ctx(&self) -> Self::CTX {
        GatewayCtx::default()
    }

    /// Routing and balancing happen here rather than in `upstream_peer`, so
    /// a no-match or a balance failure can write a final response directly
    /// and short-circuit before pingora ever tries to open an upstream
    /// connection.
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> pingora::Result<bool> {
        let handles = self.current();

        let host_header = session
            .req_header()
            .headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let request_uri = session
            .req_header()
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        populate_request_vars(&ctx.store, session, &host_header, &request_uri);

        let Some(domain) = handles.lookup(&host_header) else {
            ctx.had_error = true;
            ctx.store.set("error_message", format!("no domain configured for host {host_header:?}"));
            session.write_response_header(Box::new(pages::not_found())).await?;
            return Ok(true);
        };

        let mut matched_index = None;
        for (i, rule) in domain.rules.iter().enumerate() {
            let req_header = session.req_header();
            let header_lookup = |name: &str| {
                req_header
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string())
            };
            match rule.matches(&ctx.store, &request_uri, header_lookup) {
                Ok(true) => {
                    matched_index = Some(i);
                    break;
                }
                Ok(false) => continue,
                Err(err) => {
                    error!("rule filter error on {host_header}: {err}");
                    continue;
                }
            }
        }

        let Some(rule_index) = matched_index else {
            ctx.had_error = true;
            ctx.store.set("error_message", format!("no rule matched {request_uri:?} on {host_header:?}"));
            session.write_response_header(Box::new(pages::not_found())).await?;
            return Ok(true);
        };

        let target = match crate::target::Target::resolve(
            &domain.rules[rule_index].target_template,
            &ctx.store,
            &domain.registry,
        ) {
            Ok(target) => target,
            Err(err) => {
                error!("balance failed for {host_header}: {err}");
                ctx.had_error = true;
                ctx.store.set("error_message", err.to_string());
                ctx.store.set("status", "500");
                session.write_response_header(Box::new(pages::internal_error())).await?;
                return Ok(true);
            }
        };

        ctx.store.set("real_host", target.host.clone());
        ctx.matched = Some(MatchedRule {
            domain,
            rule_index,
            upstream_host: target.host,
            upstream_path: target.path,
            upstream_tls: target.scheme.eq_ignore_ascii_case("https"),
        });

        Ok(false)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<Box<HttpPeer>> {
        let matched = ctx
            .matched
            .as_ref()
            .expect("request_filter always sets `matched` before returning Ok(false)");
        let sni = if matched.upstream_tls { matched.upstream_host.clone() } else { String::new() };
        Ok(Box::new(HttpPeer::new(matched.upstream_host.clone(), matched.upstream_tls, sni)))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut pingora::http::RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<()> {
        let Some(matched) = &ctx.matched else {
            return Ok(());
        };

        if let Ok(path_and_query) =
            http::uri::PathAndQuery::from_maybe_shared(matched.upstream_path.clone().into_bytes())
        {
            let mut parts = upstream_request.uri.clone().into_parts();
            parts.path_and_query = Some(path_and_query);
            if let Ok(new_uri) = http::Uri::from_parts(parts) {
                upstream_request.set_uri(new_uri);
            }
        }

        let rule = &matched.domain.rules[matched.rule_index];
        for transform in &rule.transforms {
            transform.apply(
                When::Request,
                &ctx.store,
                |name| upstream_request.headers.get(name).and_then(|v| v.to_str().ok()).map(String::from),
                |name, value| {
                    let _ = upstream_request.append_header(name.to_string(), value.to_string());
                },
                |name, value| {
                    let _ = upstream_request.insert_header(name.to_string(), value.to_string());
                },
                |name| {
                    upstream_request.remove_header(name);
                },
            );
        }
        Ok(())
    }

    async fn upstream_response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut pingora::http::ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<()> {
        let Some(matched) = &ctx.matched else {
            return Ok(());
        };
        ctx.store.set("status", upstream_response.status.as_u16().to_string());

        let rule = &matched.domain.rules[matched.rule_index];
        for transform in &rule.transforms {
            transform.apply(
                When::Response,
                &ctx.store,
                |name| upstream_response.headers.get(name).and_then(|v| v.to_str().ok()).map(String::from),
                |name, value| {
                    let _ = upstream_response.append_header(name.to_string(), value.to_string());
                },
                |name, value| {
                    let _ = upstream_response.insert_header(name.to_string(), value.to_string());
                },
                |name| {
                    upstream_response.remove_header(name);
                },
            );
        }
        Ok(())
    }

    async fn logging(&self, session: &mut Session, e: Option<&pingora::Error>, ctx: &mut Self::CTX) {
        let status = session.response_written().map_or(0, |resp| resp.status.as_u16());
        ctx.store.set("status", status.to_string());
        ctx.store.set("latency_ms", ctx.start.elapsed().as_millis().to_string());
        ctx.store.set("request_end", chrono::Local::now().to_rfc3339());

        if let Some(err) = e {
            ctx.had_error = true;
            ctx.store.set("error_message", err.to_string());
        }

        if let Some(matched) = &ctx.matched {
            let handles = self.current();
            let variables = ctx.store.snapshot();
            matched.domain.access_log.log(&handles.logfmts, &variables);
            if ctx.had_error {
                matched.domain.error_log.log(&handles.logfmts, &variables);
            }
        }

        if let Some(err) = e {
            info!("request completed with error: {err}");
        }
    }
}

fn populate_request_vars(store: &VariableStore, session: &Session, host_header: &str, request_uri: &str) {
    let req = session.req_header();
    store.set("request_start", chrono::Local::now().to_rfc3339());
    store.set("host", host_header.to_string());
    store.set("method", req.method.as_str().to_string());
    store.set("uri_path", req.uri.path().to_string());
    store.set("uri_query", req.uri.query().unwrap_or("").to_string());
    store.set("request_uri", request_uri.to_string());
    if let Some(remote) = session.client_addr() {
        store.set("remote_ip", remote.to_string());
    }
    let x_forward_for = req
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    store.set("x_forward_for", x_forward_for.to_string());
    for (name, value) in req.headers.iter() {
        if let Ok(value_str) = value.to_str() {
            store.set(format!("header_{}", name.as_str()), value_str.to_string());
        }
    }
}
