//! Route introspection of composed trees.
//!
//! Tests verify:
//! - Argument binders appear as placeholders in route paths
//! - Wrappers pass routes through or annotate them
//! - The printed route table format

use weft::auth::require_basic_auth;
use weft::fatal::catch;
use weft::logging::{log_requests, request_ids};
use weft::mux::{exact, DirMux, HostMux, IntArg, StringArg};
use weft::redirect::{require_host, RedirectHandler};
use weft::render::handle_with;
use weft::routes::{collect, print_routes, ALL_METHODS, ALL_PATHS};
use weft::session::{with_store, CookieStore};
use weft::DefaultErrorHandler;

use super::test_utils::{text, TEST_SECRET};

#[test]
fn test_wiki_route_is_single_placeholder() {
    let page = StringArg::new();
    let app = DirMux::new().route("wiki", page.shift(exact(text("page"))));

    let routes = collect(&app);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].method, "GET");
    assert_eq!(routes[0].path, "/wiki/<string>");
    assert!(routes[0].annotations.is_empty());
}

#[test]
fn test_wrappers_are_transparent() {
    let id = IntArg::new();
    let tree = DirMux::new().route("items", id.shift(exact(text("item"))));
    let wrapped = log_requests(request_ids(handle_with(
        DefaultErrorHandler,
        with_store(CookieStore::new(TEST_SECRET.to_vec()), catch(tree.clone())),
    )));

    assert_eq!(collect(&wrapped), collect(&tree));
    assert_eq!(collect(&tree)[0].path, "/items/<int>");
}

#[test]
fn test_print_route_table() {
    let app = HostMux::new().route(
        "wiki.example",
        DirMux::new()
            .route("", exact(text("index")))
            .route("old", RedirectHandler::new("/"))
            .route(
                "admin",
                require_basic_auth(exact(text("admin")), "staff", |_, _| true),
            ),
    );

    let mut out = Vec::new();
    print_routes(&mut out, &app).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!(
            "GET\twiki.example/\n\
             GET\twiki.example/admin\n \
             Auth: basic realm=\"staff\"\n\
             {all}\twiki.example/old{paths}\n \
             Redirect: /\n",
            all = ALL_METHODS,
            paths = ALL_PATHS,
        )
    );
}

#[test]
fn test_require_host_annotates_redirect() {
    let app = require_host("wiki.example", exact(text("index")));
    let routes = collect(&app);

    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].annotation("Host"), Some("*"));
    assert_eq!(routes[0].annotation("Redirect"), Some("//wiki.example"));
    assert_eq!(routes[1].annotation("Host"), Some("wiki.example"));
    assert_eq!(routes[1].path, "/");
}
