//! Local web dashboard. Runs the `plex-info` reports in-process and hands
//! their text to the browser. Requests are served one at a time.

use crate::cli::InfoCli;
use crate::core::MetadataSource;
use crate::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const INDEX_HTML: &str = include_str!("index.html");

/// Longest a single report may run before the request gets a 408.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(300);

const MAX_BODY: u64 = 16 * 1024;

#[derive(Clone)]
pub struct Dashboard {
    source: Arc<dyn MetadataSource>,
    gate: Arc<Mutex<()>>,
    timeout: Duration,
}

/// Report flags as sent by the page, either as a JSON body or a query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    pub library: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub list_missing: bool,
    pub quality: bool,
    pub stats: bool,
    pub health: bool,
    pub system: bool,
    pub verbose: bool,
}

impl RunRequest {
    /// The equivalent `plex-info` command line.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["plex-info".to_string()];
        if let Some(library) = self.library.as_deref().filter(|l| !l.is_empty()) {
            args.push("--library".to_string());
            args.push(library.to_string());
        }
        for (enabled, flag) in [
            (self.list_missing, "--list-missing"),
            (self.quality, "--quality"),
            (self.stats, "--stats"),
            (self.health, "--health"),
            (self.system, "--system"),
            (self.verbose, "--verbose"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }
        if let Some(kind) = self.media_type.as_deref().filter(|t| !t.is_empty()) {
            args.push("--type".to_string());
            args.push(kind.to_string());
        }
        args
    }
}

#[derive(Debug, Serialize)]
struct RunResponse {
    success: bool,
    output: String,
    command: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug, Serialize)]
struct LibrariesResponse {
    success: bool,
    libraries: Vec<String>,
}

/// Why a report run did not produce output.
#[derive(Debug)]
enum RunFailure {
    Usage(String),
    Timeout,
    Failed(String),
}

impl RunFailure {
    fn status(&self) -> StatusCode {
        match self {
            RunFailure::Usage(_) => StatusCode::BAD_REQUEST,
            RunFailure::Timeout => StatusCode::REQUEST_TIMEOUT,
            RunFailure::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            RunFailure::Usage(msg) | RunFailure::Failed(msg) => msg.clone(),
            RunFailure::Timeout => "Command timeout (5 minutes)".to_string(),
        }
    }
}

impl Dashboard {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            gate: Arc::new(Mutex::new(())),
            timeout: RUN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, request: &RunRequest) -> std::result::Result<String, RunFailure> {
        let cli = InfoCli::try_parse_from(request.args())
            .map_err(|e| RunFailure::Usage(e.render().to_string()))?;

        let _guard = self.gate.lock().await;
        match tokio::time::timeout(self.timeout, cli.render(self.source.as_ref())).await {
            Ok(Ok(rendered)) => Ok(rendered.text),
            Ok(Err(e)) => Err(RunFailure::Failed(e.to_string())),
            Err(_) => Err(RunFailure::Timeout),
        }
    }

    async fn library_titles(&self) -> Result<Vec<String>> {
        let _guard = self.gate.lock().await;
        let libraries = self.source.libraries().await?;
        Ok(libraries.into_iter().map(|l| l.title).collect())
    }
}

pub fn routes(
    dashboard: Dashboard,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let with_dashboard = warp::any().map(move || dashboard.clone());

    let index = warp::path::end()
        .or(warp::path!("index.html"))
        .unify()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML).into_response());

    let libraries = warp::path!("api" / "libraries")
        .and(warp::get())
        .and(with_dashboard.clone())
        .and_then(list_libraries);

    let run = warp::path!("api" / "run")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY))
        .and(warp::body::bytes())
        .and(with_dashboard.clone())
        .and_then(run_report);

    let report = warp::path!("report")
        .and(warp::get())
        .and(warp::query::<RunRequest>())
        .and(with_dashboard)
        .and_then(html_report);

    index.or(libraries).unify().or(run).unify().or(report).unify()
}

async fn list_libraries(dashboard: Dashboard) -> std::result::Result<Response, Infallible> {
    match dashboard.library_titles().await {
        Ok(libraries) => Ok(warp::reply::json(&LibrariesResponse {
            success: true,
            libraries,
        })
        .into_response()),
        Err(e) => {
            error!("Failed to list libraries: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn run_report(
    body: Bytes,
    dashboard: Dashboard,
) -> std::result::Result<Response, Infallible> {
    let request: RunRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid JSON".to_string()));
        }
    };

    let command = request.args().join(" ");
    info!("Running command: {}", command);

    match dashboard.run(&request).await {
        Ok(output) => Ok(warp::reply::json(&RunResponse {
            success: true,
            output,
            command,
        })
        .into_response()),
        Err(failure) => {
            warn!("Command '{}' failed: {}", command, failure.message());
            Ok(error_reply(failure.status(), failure.message()))
        }
    }
}

async fn html_report(
    request: RunRequest,
    dashboard: Dashboard,
) -> std::result::Result<Response, Infallible> {
    let (status, title, body) = match dashboard.run(&request).await {
        Ok(output) => (StatusCode::OK, "Plex Report", output),
        Err(failure) => (failure.status(), "Report Failed", failure.message()),
    };

    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n<pre>{}</pre>\n</body>\n</html>\n",
        title,
        html_escape::encode_text(&body)
    );
    Ok(warp::reply::with_status(warp::reply::html(page), status).into_response())
}

fn error_reply(status: StatusCode, error: String) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            success: false,
            error,
        }),
        status,
    )
    .into_response()
}

pub async fn serve(dashboard: Dashboard, addr: SocketAddr) -> anyhow::Result<()> {
    let routes = routes(dashboard).with(warp::trace::request());
    let (bound, server) = warp::serve(routes)
        .try_bind_ephemeral(addr)
        .map_err(|e| {
            anyhow::anyhow!(
                "Could not listen on {} (is the port already in use?): {}",
                addr,
                e
            )
        })?;

    info!("Dashboard running at http://{}", bound);
    server.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_args() {
        let request = RunRequest {
            library: Some("TV Shows".to_string()),
            media_type: Some("episode".to_string()),
            list_missing: true,
            verbose: true,
            ..Default::default()
        };
        assert_eq!(
            request.args(),
            vec![
                "plex-info",
                "--library",
                "TV Shows",
                "--list-missing",
                "--verbose",
                "--type",
                "episode",
            ]
        );
        assert_eq!(RunRequest::default().args(), vec!["plex-info"]);
    }

    #[test]
    fn test_request_from_json() {
        let request: RunRequest =
            serde_json::from_str(r#"{"library": "Movies", "quality": true, "type": ""}"#).unwrap();
        assert_eq!(request.args(), vec!["plex-info", "--library", "Movies", "--quality"]);
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(RunFailure::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(RunFailure::Usage(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RunFailure::Failed(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
