/// HTTP host for the dashboard page and update clicks
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::app::AppHandle;
use crate::error::HandleError;
use crate::render::render_page;

#[derive(Debug, PartialEq, Eq)]
enum Route {
    Page,
    Sensors,
    Update(i64),
    BadId,
    NotFound,
}

fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (Method::Get, "/") => Route::Page,
        (Method::Get, "/api/sensors") => Route::Sensors,
        (Method::Post, path) => match path
            .strip_prefix("/sensors/")
            .and_then(|rest| rest.strip_suffix("/update"))
        {
            Some(id) => id.parse().map(Route::Update).unwrap_or(Route::BadId),
            None => Route::NotFound,
        },
        _ => Route::NotFound,
    }
}

fn header(name: &str, value: &str) -> io::Result<Header> {
    Header::from_bytes(name, value)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid response header"))
}

fn serve_status(request: Request, status: u16) -> io::Result<()> {
    let status = StatusCode(status);
    request.respond(Response::from_string(status.default_reason_phrase()).with_status_code(status))
}

fn serve_page(request: Request, handle: &AppHandle) -> io::Result<()> {
    let page = render_page(&handle.current_container());
    let content_type = header("Content-Type", "text/html; charset=utf-8")?;
    request.respond(Response::from_string(page).with_header(content_type))
}

fn serve_sensors(request: Request, handle: &AppHandle) -> io::Result<()> {
    let records = match handle.snapshot_blocking() {
        Ok(records) => records,
        Err(e) => {
            error!("Could not read sensors: {}", e);
            return serve_status(request, 503);
        }
    };

    let json = match serde_json::to_string(&records) {
        Ok(json) => json,
        Err(e) => {
            error!("Could not convert sensors to JSON: {}", e);
            return serve_status(request, 500);
        }
    };

    let content_type = header("Content-Type", "application/json; charset=utf-8")?;
    request.respond(Response::from_string(json).with_header(content_type))
}

fn serve_update(request: Request, handle: &AppHandle, id: i64) -> io::Result<()> {
    match handle.update_blocking(id) {
        Ok(()) => {}
        // Already logged by the context; the page just shows unchanged state
        Err(HandleError::NotFound(e)) => debug!("Ignoring update: {}", e),
        Err(e @ HandleError::Closed) => {
            error!("Could not update sensor {}: {}", id, e);
            return serve_status(request, 503);
        }
    }

    // Post/redirect/get so the browser never stays on the action URL
    let location = header("Location", "/")?;
    request.respond(Response::empty(StatusCode(303)).with_header(location))
}

fn serve_request(request: Request, handle: &AppHandle) -> io::Result<()> {
    info!(
        "Received request: method {:?}, url {:?}",
        request.method(),
        request.url()
    );

    match route(request.method(), request.url()) {
        Route::Page => serve_page(request, handle),
        Route::Sensors => serve_sensors(request, handle),
        Route::Update(id) => serve_update(request, handle, id),
        Route::BadId => serve_status(request, 400),
        Route::NotFound => serve_status(request, 404),
    }
}

pub fn bind(address: SocketAddr) -> Result<Arc<Server>, Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::http(address)?;
    info!("Listening at http://{}/", address);
    Ok(Arc::new(server))
}

/// Serve requests until [`Server::unblock`] is called.
pub fn serve(server: &Server, handle: AppHandle) {
    for request in server.incoming_requests() {
        if let Err(e) = serve_request(request, &handle) {
            // Keep serving
            error!("Could not serve the response: {}", e);
        }
    }
    warn!("HTTP server stopped accepting requests");
}
