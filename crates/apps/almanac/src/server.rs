//! HTTP server
//!
//! A fixed pool of worker threads pulls requests off one `tiny_http`
//! listener, converts them to [`HttpRequest`] and hands them to the
//! router.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};
use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::app::App;
use crate::http::{HttpRequest, Method, Reply};
use crate::routes;

/// Largest form body we read
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Serve until every worker exits
pub fn serve(app: Arc<App>) -> Result<()> {
    let bind = app.settings.bind.clone();
    let server = Server::http(bind.as_str())
        .map_err(|e| anyhow!("Failed to bind HTTP server on {}: {}", bind, e))?;
    let server = Arc::new(server);

    let workers = app.settings.workers.max(1);
    info!("[HTTP] Listening on {} with {} worker(s)", bind, workers);

    let handles = (0..workers)
        .map(|i| {
            let server = Arc::clone(&server);
            let app = Arc::clone(&app);
            thread::Builder::new()
                .name(format!("http-worker-{}", i))
                .spawn(move || worker(&server, &app))
                .context("Failed to spawn HTTP worker")
        })
        .collect::<Result<Vec<_>>>()?;

    for handle in handles {
        if handle.join().is_err() {
            error!("[HTTP] A worker thread panicked");
        }
    }
    Ok(())
}

fn worker(server: &Server, app: &App) {
    for request in server.incoming_requests() {
        serve_one(app, request);
    }
}

fn serve_one(app: &App, mut request: Request) {
    let target = request.url().to_string();

    let req = match to_http_request(&mut request) {
        Ok(req) => req,
        Err(e) => {
            warn!("[HTTP] Unreadable request for {}: {:#}", target, e);
            if let Err(e) = request.respond(Response::empty(StatusCode(400))) {
                debug!("[HTTP] Failed to respond: {}", e);
            }
            return;
        }
    };

    let reply = routes::handle(app, &req);
    debug!("[HTTP] {:?} {} -> {}", req.method, target, reply.status);

    if let Err(e) = request.respond(to_response(reply)) {
        warn!("[HTTP] Failed to respond to {}: {}", target, e);
    }
}

fn to_http_request(request: &mut Request) -> Result<HttpRequest> {
    let method = match request.method() {
        tiny_http::Method::Get => Method::Get,
        tiny_http::Method::Post => Method::Post,
        _ => Method::Other,
    };

    let mut req = HttpRequest::new(method, request.url());
    for header in request.headers() {
        let name = header.field.to_string();
        let value = header.value.as_str();
        if header.field.equiv("Cookie") {
            req = req.with_cookie_header(value);
        }
        req = req.with_header(&name, value);
    }

    if method == Method::Post {
        let mut body = String::new();
        Read::take(request.as_reader(), MAX_BODY_BYTES)
            .read_to_string(&mut body)
            .context("Failed to read request body")?;
        req = req.with_form_body(&body);
    }

    Ok(req)
}

fn to_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let headers = reply
        .headers
        .iter()
        .filter_map(|(name, value)| match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => Some(header),
            Err(()) => {
                warn!("[HTTP] Dropping invalid header {}", name);
                None
            }
        })
        .collect();

    let body = reply.body.into_bytes();
    let len = body.len();
    Response::new(StatusCode(reply.status), headers, Cursor::new(body), Some(len), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_response_keeps_status_and_headers() {
        let reply = Reply::html(404, "<p>gone</p>".to_string()).with_etag("abc");
        let response = to_response(reply);
        assert_eq!(response.status_code(), StatusCode(404));
        assert!(response.headers().iter().any(|h| h.field.equiv("ETag")));
        assert!(response.headers().iter().any(|h| h.field.equiv("Content-Type")));
    }
}
