//! weft demo server - a small wiki built from composable handlers.
//!
//! `weft serve` starts the server, `weft routes` prints its route table.

use std::io;
use std::process::ExitCode;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weft::{
    auth::{basic_auth_user, credentials_match, require_basic_auth},
    cache,
    config::{Cli, Command, ServeConfig},
    fatal::{self, catch},
    handler::{boxed, handler_fn, BoxHandler, Handler, Outcome},
    json::{self, JsonErrorHandler},
    logging::{log_requests, request_id, request_ids},
    mux::{exact, exact_path, require_method, DirMux, IntArg, StringArg},
    parse,
    redirect::{require_trailing_slash, RedirectHandler},
    render::{handle_with, DefaultErrorHandler, ErrorHandler},
    request::Request,
    response::ResponseWriter,
    routes::print_routes,
    server,
    session::{self, with_store, CookieStore, Session},
    ErrorClass, Symbol,
};

/// Session namespace used by the demo.
const SESSION: &str = "weft";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Routes => run_routes(),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let secret = match &config.session_secret {
        Some(secret) => secret.clone().into_bytes(),
        None => {
            warn!("No session secret configured; sessions will not survive a restart");
            rand::thread_rng().gen::<[u8; 32]>().to_vec()
        }
    };

    info!("Configuration:");
    info!("  Errors: {}", if config.json_errors { "json" } else { "text" });
    info!("  Body limit: {} bytes", config.body_limit);
    if let Some(origins) = &config.cors_origins {
        info!("  CORS origins: {}", origins.join(", "));
    }

    let handler = app(secret, config.json_errors);

    let addr = config.bind_address();
    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("  Try: curl http://{}/wiki/home", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server::serve(listener, handler, config.to_server_config()).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "weft=debug,tower_http=debug"
    } else {
        "weft=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Routes Command
// =============================================================================

fn run_routes() -> ExitCode {
    let handler = app(b"route table only".to_vec(), false);
    let stdout = io::stdout();
    match print_routes(&mut stdout.lock(), &handler) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Application
// =============================================================================

/// Build the demo handler tree.
fn app(secret: Vec<u8>, json_errors: bool) -> BoxHandler {
    let page = StringArg::new();
    let item = IntArg::new();

    let wiki = page.shift_opt(
        exact(handler_fn(move |w, r| view_page(w, r, page))),
        RedirectHandler::new("/wiki/home"),
    );
    let items = require_trailing_slash(item.shift(exact(handler_fn(move |w, r| {
        show_item(w, r, item)
    }))));
    let visits = DirMux::new()
        .route("", exact(Visits))
        .route("forget", require_method(http::Method::POST, exact_path(Forget)));
    let admin = require_basic_auth(
        exact(handler_fn(admin_page)),
        "weft admin",
        |user, password| user == "admin" && credentials_match(password, "weft"),
    );

    let mux = DirMux::new()
        .route("", exact(handler_fn(index)))
        .route("wiki", wiki)
        .route("items", items)
        .route("visits", visits)
        .route("admin", admin)
        .route("slow", exact(Slow))
        .route("old", RedirectHandler::new("/"));

    let errors: Box<dyn ErrorHandler> = if json_errors {
        Box::new(JsonErrorHandler)
    } else {
        Box::new(DefaultErrorHandler)
    };
    let tree = with_store(CookieStore::new(secret), cache::register(catch(mux)));
    boxed(log_requests(request_ids(handle_with(errors, tree))))
}

fn write_text(w: &mut dyn ResponseWriter, body: &str) -> Outcome {
    w.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    w.write_all(body.as_bytes()).map_err(fatal::error)
}

fn index(w: &mut dyn ResponseWriter, r: &Request) -> Outcome {
    let id = request_id(r.context()).unwrap_or_default();
    write_text(
        w,
        &format!(
            "weft demo (request {})\n\n/wiki/<page>\n/items/<id>/\n/visits\n/admin\n/slow\n",
            id
        ),
    )
}

fn view_page(w: &mut dyn ResponseWriter, r: &Request, page: StringArg) -> Outcome {
    let name = page.must_get(r.context())?;
    if name.starts_with('_') {
        return Err(ErrorClass::Forbidden.new(format!("page {:?} is private", name)).into());
    }
    let shout = parse::opt_bool(r.query_param("shout").as_deref(), false);
    let title = if shout { name.to_uppercase() } else { name };
    write_text(w, &format!("# {}\n\nThis page is empty.\n", title))
}

#[derive(Serialize)]
struct Item {
    id: i64,
    name: String,
}

fn show_item(w: &mut dyn ResponseWriter, r: &Request, item: IntArg) -> Outcome {
    let id = item.must_get(r.context())?;
    if id < 0 {
        return Err(fatal::redirect(format!("/items/{}/", id.unsigned_abs())));
    }
    if id == 0 {
        return Err(ErrorClass::NotFound.new("item 0 does not exist").into());
    }
    json::render(
        w,
        r,
        &Item {
            id,
            name: format!("item-{}", id),
        },
    );
    Ok(())
}

fn admin_page(w: &mut dyn ResponseWriter, r: &Request) -> Outcome {
    let user = basic_auth_user(r.context()).unwrap_or("anonymous");
    write_text(w, &format!("welcome, {}\n", user))
}

/// Counts visits in the cookie session.
struct Visits;

#[async_trait]
impl Handler for Visits {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let session = session::load(&r, SESSION).await.map_err(fatal::error)?;
        let count = visit_count(&r, &session);
        session.save(r.context(), w).await.map_err(fatal::error)?;
        write_text(w, &format!("visits: {}\n", count))
    }
}

fn visits_key() -> Symbol {
    static KEY: OnceLock<Symbol> = OnceLock::new();
    *KEY.get_or_init(Symbol::new)
}

/// Bump the visit counter once per request.
fn visit_count(r: &Request, session: &Session) -> i64 {
    if let Some(count) = cache::get::<i64>(r.context(), visits_key()) {
        return *count;
    }
    let count = session
        .get("visits")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        + 1;
    session.set("visits", count);
    cache::set(r.context(), visits_key(), count);
    count
}

/// Clears the demo session.
struct Forget;

#[async_trait]
impl Handler for Forget {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        let session = session::load(&r, SESSION).await.map_err(fatal::error)?;
        session
            .clear(r.context(), w)
            .await
            .map_err(fatal::error)?;
        write_text(w, "forgotten\n")
    }
}

/// Takes a while; stops early if the client disconnects.
struct Slow;

#[async_trait]
impl Handler for Slow {
    async fn serve(&self, w: &mut dyn ResponseWriter, r: Request) -> Outcome {
        tokio::select! {
            _ = r.context().cancelled() => {
                info!(uri = %r.uri(), "client went away");
                Ok(())
            }
            _ = tokio::time::sleep(Duration::from_secs(3)) => write_text(w, "done\n"),
        }
    }
}
