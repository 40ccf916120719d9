use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use route99::{logger, Config, Done, Next, Request, Response, Router};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file path as first argument
    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    // Handlers and hooks run on the connection's task, one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(build_router().listen(cfg))?;
    Ok(())
}

fn build_router() -> Router {
    let mut router = Router::new();

    router.use_middleware(|_req: Arc<Request>, res: Response, next: Next| {
        res.insert_header(
            HeaderName::from_static("x-powered-by"),
            HeaderValue::from_static("route99"),
        );
        next.run();
    });

    router.get("/", |_req: Arc<Request>, res: Response| {
        res.send(json!({ "name": "route99", "version": env!("CARGO_PKG_VERSION") }));
    });

    router.register("/blog", |blog| {
        let env = blog.env();

        blog.before(move |done: Done| {
            // Load off the runtime, then resume the waiting requests on it
            tokio::spawn(async move {
                match tokio::task::spawn_blocking(load_posts).await {
                    Ok(posts) => {
                        env.expose("posts", posts);
                        done.run();
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to load blog posts: {e}"));
                    }
                }
            });
        });

        let env = blog.env();
        blog.get(["/", "/posts"], move |_req: Arc<Request>, res: Response| {
            res.send(env.get("posts").unwrap_or_else(|| json!([])));
        });

        let env = blog.env();
        blog.get("/post/:id", move |req: Arc<Request>, res: Response| {
            let post = req
                .param("id")
                .and_then(|id| id.parse::<u64>().ok())
                .and_then(|id| {
                    env.get("posts")?
                        .as_array()?
                        .iter()
                        .find(|post| post["id"] == id)
                        .cloned()
                });

            match post {
                Some(post) => res.send(post),
                None => res.send_with_status(
                    StatusCode::NOT_FOUND,
                    json!({ "error": true, "message": "post not found" }),
                ),
            }
        });
    });

    router
}

/// Stands in for a slow backing store
fn load_posts() -> Value {
    std::thread::sleep(Duration::from_millis(50));
    json!([
        { "id": 1, "title": "Hello" },
        { "id": 2, "title": "Routing" },
    ])
}
