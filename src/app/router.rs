//! Router module
//!
//! Owns the route table, middleware chain, before-init registry, not-found
//! handler and shared environment, and dispatches each request through them:
//! method check, route resolution, before-init, handler, middleware, write.

use hyper::{Method, StatusCode, Uri};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::before::{BeforeRegistry, Done};
use super::env::Environment;
use super::middleware::{MiddlewareChain, Next};
use crate::config::Config;
use crate::http::{build_405_response, HttpResponse, Params, Request, Response};
use crate::logger;
use crate::routing::{find_route, namespace_of, normalize_path, RouteTable};

/// A route handler: `(request, response)`. It must eventually call
/// `response.send*`, otherwise the request stays open until the connection
/// times out.
pub type Handler = Arc<dyn Fn(Arc<Request>, Response) + Send + Sync>;

/// One path or a list of paths sharing a handler
pub trait RoutePaths {
    fn into_paths(self) -> Vec<String>;
}

impl RoutePaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl RoutePaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl RoutePaths for &[&str] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl<const N: usize> RoutePaths for [&str; N] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl RoutePaths for Vec<&str> {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl RoutePaths for Vec<String> {
    fn into_paths(self) -> Vec<String> {
        self
    }
}

/// Default not-found handler
fn default_not_found(_request: Arc<Request>, response: Response) {
    response.send_with_status(
        StatusCode::NOT_FOUND,
        serde_json::json!({ "error": true, "message": "404 Not Found" }),
    );
}

/// Request router and dispatcher
pub struct Router {
    routes: RouteTable<Handler>,
    middleware: MiddlewareChain,
    before: BeforeRegistry,
    not_found: Handler,
    env: Environment,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            routes: RouteTable::new(),
            middleware: MiddlewareChain::new(),
            before: BeforeRegistry::new(),
            not_found: Arc::new(default_not_found),
            env: Environment::new(),
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET handler for one or more paths
    pub fn get<P, F>(&mut self, paths: P, handler: F) -> &mut Self
    where
        P: RoutePaths,
        F: Fn(Arc<Request>, Response) + Send + Sync + 'static,
    {
        self.add_routes(paths.into_paths(), Arc::new(handler));
        self
    }

    /// Append a middleware to the global chain
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Arc<Request>, Response, Next) + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Replace the not-found handler
    pub fn not_found<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<Request>, Response) + Send + Sync + 'static,
    {
        self.not_found = Arc::new(handler);
        self
    }

    /// Register a sub-application under `base`.
    ///
    /// Its routes are prefixed with `base` and its `before` hook is keyed by
    /// the first segment of `base`.
    pub fn register<F>(&mut self, base: &str, init: F) -> &mut Self
    where
        F: FnOnce(&mut Module<'_>),
    {
        let mut module = Module {
            router: &mut *self,
            base: base.to_string(),
        };
        init(&mut module);
        self
    }

    pub fn expose(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.env.expose(key, value);
    }

    /// Handle to the shared environment
    pub fn env(&self) -> Environment {
        self.env.clone()
    }

    pub fn routes(&self) -> &RouteTable<Handler> {
        &self.routes
    }

    /// Bind to loopback and serve until the process exits
    pub async fn listen(self, config: Config) -> crate::Result<()> {
        crate::server::listen(Arc::new(self), config).await
    }

    /// Dispatch one request.
    ///
    /// Non-GET methods get a bare 405 without touching middleware or hooks.
    /// Otherwise the request is matched (falling back to the not-found
    /// handler), passed through its namespace's before hook and handed to the
    /// handler.
    ///
    /// # Arguments
    ///
    /// * `method` - Request method
    /// * `uri` - Request target; its path is matched and its query parsed
    /// * `charset` - Charset appended to the `Content-Type` header
    ///
    /// # Returns
    ///
    /// The finalized response, once the handler has sent and every middleware
    /// has advanced. If the response is dropped unsent the future never
    /// completes; the connection timeout is what ends such a request.
    pub async fn dispatch(&self, method: &Method, uri: &Uri, charset: &str) -> HttpResponse {
        if *method != Method::GET {
            logger::log_warning(&format!("Method not allowed: {method} {}", uri.path()));
            return build_405_response(charset);
        }

        let request = Request::from_uri(method.clone(), uri);
        let (handler, params) = match find_route(request.path(), &self.routes) {
            Some(matched) => (Arc::clone(matched.handler), matched.params),
            None => (Arc::clone(&self.not_found), Params::new()),
        };

        let request = Arc::new(request.with_params(params));
        let path = request.path().to_string();
        let (response, receiver) =
            Response::new(Arc::clone(&request), self.middleware.clone(), charset);

        self.before
            .run(&path, Box::new(move || handler(request, response)));

        match receiver.await {
            Ok(response) => response,
            Err(_) => {
                logger::log_warning(&format!(
                    "Response for {path} was dropped unsent, leaving request open"
                ));
                std::future::pending().await
            }
        }
    }

    fn add_routes(&mut self, paths: Vec<String>, handler: Handler) {
        for path in paths {
            if self.routes.insert(&path, Arc::clone(&handler)) {
                logger::log_warning(&format!(
                    "Route {} registered twice, keeping the latest handler",
                    normalize_path(&path)
                ));
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("middleware", &self.middleware)
            .field("before", &self.before)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Registration handle for a sub-application mounted at a base path
pub struct Module<'r> {
    router: &'r mut Router,
    base: String,
}

impl Module<'_> {
    /// Register a GET handler; each path is appended to the module base
    pub fn get<P, F>(&mut self, paths: P, handler: F) -> &mut Self
    where
        P: RoutePaths,
        F: Fn(Arc<Request>, Response) + Send + Sync + 'static,
    {
        let paths = paths
            .into_paths()
            .into_iter()
            .map(|path| format!("{}{path}", self.base))
            .collect();
        self.router.add_routes(paths, Arc::new(handler));
        self
    }

    /// Register the one-shot init hook for this module's namespace
    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(Done) + Send + 'static,
    {
        let base = normalize_path(&self.base);
        match namespace_of(&base) {
            Some(namespace) => self.router.before.register(namespace, Box::new(hook)),
            None => logger::log_warning(&format!(
                "Module at '{}' has no namespace, before hook ignored",
                self.base
            )),
        }
        self
    }

    pub fn expose(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.router.env.expose(key, value);
    }

    /// Handle to the shared environment, for use inside handlers
    pub fn env(&self) -> Environment {
        self.router.env.clone()
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    async fn get(router: &Router, uri: &str) -> HttpResponse {
        let uri: Uri = uri.parse().unwrap();
        router.dispatch(&Method::GET, &uri, "utf-8").await
    }

    async fn body_text(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let router = Router::new();
        let response = get(&router, "/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            r#"{"error":true,"message":"404 Not Found"}"#
        );
    }

    #[tokio::test]
    async fn test_custom_not_found() {
        let mut router = Router::new();
        router.not_found(|_req: Arc<Request>, res: Response| {
            res.send_with_status(StatusCode::NOT_FOUND, "My NotFound");
        });

        let response = get(&router, "/notFound").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "My NotFound");
    }

    #[tokio::test]
    async fn test_non_get_is_rejected_before_anything_runs() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();

        let counter = Arc::clone(&ran);
        router.use_middleware(move |_req: Arc<Request>, _res: Response, next: Next| {
            counter.fetch_add(1, Ordering::SeqCst);
            next.run();
        });
        let counter = Arc::clone(&ran);
        router.register("api", move |app: &mut Module<'_>| {
            app.before(move |done: Done| {
                counter.fetch_add(1, Ordering::SeqCst);
                done.run();
            });
            app.get("/items", |_req: Arc<Request>, res: Response| res.send("items"));
        });

        let uri: Uri = "/api/items".parse().unwrap();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let response = router.dispatch(&method, &uri, "utf-8").await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert!(body_text(response).await.is_empty());
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_module_routes_and_params() {
        let mut router = Router::new();
        router.register("route1", |app: &mut Module<'_>| {
            app.get("/", |_req: Arc<Request>, res: Response| {
                res.send(json!({ "route": "route1", "path": "/" }));
            });
            app.get("/sub1", |_req: Arc<Request>, res: Response| {
                res.send(json!({ "route": "route1", "path": "/sub1" }));
            });
        });
        router.register("blog", |app: &mut Module<'_>| {
            app.get("/post/:id", |req: Arc<Request>, res: Response| {
                res.send(json!({ "id": req.param("id") }));
            });
        });

        let response = get(&router, "/route1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"route":"route1","path":"/"}"#);

        let response = get(&router, "/route1/sub1").await;
        assert_eq!(body_text(response).await, r#"{"route":"route1","path":"/sub1"}"#);

        let response = get(&router, "/blog/post/42").await;
        assert_eq!(body_text(response).await, r#"{"id":"42"}"#);

        assert_eq!(get(&router, "/blog/post/").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get(&router, "/blog/post/42/extra").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_multiple_paths_share_handler() {
        let mut router = Router::new();
        router.get(["/", "/index.htm", "/index.html"], |_req: Arc<Request>, res: Response| {
            res.send("home");
        });

        for uri in ["/", "/index.htm", "/index.html"] {
            assert_eq!(body_text(get(&router, uri).await).await, "home");
        }
        assert_eq!(router.routes().len(), 3);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut router = Router::new();
        router.get("/dup", |_req: Arc<Request>, res: Response| res.send("first"));
        router.get("/dup/", |_req: Arc<Request>, res: Response| res.send("second"));

        for _ in 0..2 {
            assert_eq!(body_text(get(&router, "/dup").await).await, "second");
        }
    }

    #[tokio::test]
    async fn test_jsonp_callback() {
        let mut router = Router::new();
        router.get("/data", |_req: Arc<Request>, res: Response| res.send(json!({ "a": 1 })));

        let response = get(&router, "/data").await;
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(body_text(response).await, r#"{"a":1}"#);

        let response = get(&router, "/data?callback=foo").await;
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/javascript; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "window.foo && foo({\"a\":1});");
    }

    #[tokio::test]
    async fn test_not_found_goes_through_jsonp_and_middleware() {
        let mut router = Router::new();
        router.use_middleware(|_req: Arc<Request>, res: Response, next: Next| {
            res.insert_header(
                HeaderName::from_static("x-powered-by"),
                HeaderValue::from_static("route99"),
            );
            next.run();
        });

        let response = get(&router, "/client?callback=cb").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-powered-by"], "route99");
        assert_eq!(
            body_text(response).await,
            r#"window.cb && cb({"error":true,"message":"404 Not Found"});"#
        );
    }

    #[tokio::test]
    async fn test_middleware_order_per_request() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            router.use_middleware(move |_req: Arc<Request>, _res: Response, next: Next| {
                log.lock().unwrap().push(name);
                next.run();
            });
        }
        router.get("/", |_req: Arc<Request>, res: Response| res.send("ok"));

        get(&router, "/").await;
        get(&router, "/").await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_middleware_can_change_status() {
        let mut router = Router::new();
        router.use_middleware(|_req: Arc<Request>, res: Response, next: Next| {
            if res.status() == StatusCode::OK {
                res.set_status(StatusCode::ACCEPTED);
            }
            next.run();
        });
        router.get("/", |_req: Arc<Request>, res: Response| res.send("ok"));

        assert_eq!(get(&router, "/").await.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_middleware_without_next_stalls() {
        let mut router = Router::new();
        router.use_middleware(|_req: Arc<Request>, _res: Response, _next: Next| {});
        router.get("/", |_req: Arc<Request>, res: Response| res.send("never"));

        let result = tokio::time::timeout(Duration::from_millis(50), get(&router, "/")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handler_without_send_stalls() {
        let mut router = Router::new();
        router.get("/silent", |_req: Arc<Request>, _res: Response| {});

        let result = tokio::time::timeout(Duration::from_millis(50), get(&router, "/silent")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handler_can_send_later() {
        let mut router = Router::new();
        router.get("/slow", |_req: Arc<Request>, res: Response| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                res.send("late");
            });
        });

        assert_eq!(body_text(get(&router, "/slow").await).await, "late");
    }

    #[tokio::test]
    async fn test_before_hook_runs_once() {
        let executed = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let counter = Arc::clone(&executed);
        router.register("route3", move |app: &mut Module<'_>| {
            app.before(move |done: Done| {
                counter.fetch_add(1, Ordering::SeqCst);
                done.run();
            });
            app.get("/visits", |_req: Arc<Request>, res: Response| res.send("ok"));
        });

        for _ in 0..3 {
            let response = get(&router, "/route3/visits").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, "ok");
        }
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_before_hook_completes_before_concurrent_handlers() {
        let ready = Arc::new(AtomicUsize::new(0));
        let executed = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();

        let flag = Arc::clone(&ready);
        let counter = Arc::clone(&executed);
        let seen = Arc::clone(&ready);
        router.register("db", move |app: &mut Module<'_>| {
            app.before(move |done: Done| {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    flag.store(1, Ordering::SeqCst);
                    done.run();
                });
            });
            app.get("/query", move |_req: Arc<Request>, res: Response| {
                res.send(seen.load(Ordering::SeqCst));
            });
        });

        let (a, b, c) = tokio::join!(
            get(&router, "/db/query"),
            get(&router, "/db/query"),
            get(&router, "/db/query"),
        );
        for response in [a, b, c] {
            assert_eq!(body_text(response).await, "1");
        }
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_done_run_from_runtime_task_allows_tokio_in_handler() {
        let mut router = Router::new();
        router.register("blog", |app: &mut Module<'_>| {
            let env = app.env();
            app.before(move |done: Done| {
                tokio::spawn(async move {
                    let posts = tokio::task::spawn_blocking(|| json!([{ "id": 1 }]))
                        .await
                        .unwrap();
                    env.expose("posts", posts);
                    done.run();
                });
            });

            let env = app.env();
            app.get("/posts", move |_req: Arc<Request>, res: Response| {
                let env = env.clone();
                tokio::spawn(async move {
                    res.send(env.get("posts").unwrap_or_default());
                });
            });
        });

        let response = tokio::time::timeout(Duration::from_secs(1), get(&router, "/blog/posts"))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, r#"[{"id":1}]"#);
    }

    #[tokio::test]
    async fn test_abandoned_before_hook_does_not_block_namespace() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let counter = Arc::clone(&calls);
        router.register("jobs", move |app: &mut Module<'_>| {
            app.before(move |done: Done| {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(done);
            });
            app.get("/list", |_req: Arc<Request>, res: Response| res.send("jobs"));
        });

        let first = tokio::time::timeout(Duration::from_millis(50), get(&router, "/jobs/list")).await;
        assert!(first.is_err());

        let response = get(&router, "/jobs/list").await;
        assert_eq!(body_text(response).await, "jobs");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_before_hook_runs_for_unmatched_path_in_namespace() {
        let executed = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let counter = Arc::clone(&executed);
        router.register("shop", move |app: &mut Module<'_>| {
            app.before(move |done: Done| {
                counter.fetch_add(1, Ordering::SeqCst);
                done.run();
            });
        });

        let response = get(&router, "/shop/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expose_is_shared_and_last_write_wins() {
        let mut router = Router::new();
        router.register("route2", |app: &mut Module<'_>| {
            app.expose("foo", "bar");

            let env = app.env();
            app.get("/myExpose", move |_req: Arc<Request>, res: Response| {
                res.send(env.get("foo").unwrap_or(Value::Null));
                env.expose("foo", "many bars");
            });

            let env = app.env();
            app.get("/myNewExpose", move |_req: Arc<Request>, res: Response| {
                res.send(env.get("foo").unwrap_or(Value::Null));
            });
        });

        assert_eq!(body_text(get(&router, "/route2/myExpose").await).await, "bar");
        assert_eq!(
            body_text(get(&router, "/route2/myNewExpose").await).await,
            "many bars"
        );
        assert_eq!(router.env().get("foo"), Some(json!("many bars")));
    }

    #[tokio::test]
    async fn test_query_params_reach_handler() {
        let mut router = Router::new();
        router.get("/search", |req: Arc<Request>, res: Response| {
            res.send(json!({ "q": req.query_param("q"), "page": req.query_param("page") }));
        });

        let response = get(&router, "/search?q=rust+lang&page=1&page=2").await;
        assert_eq!(body_text(response).await, r#"{"q":"rust lang","page":"2"}"#);
    }
}
