//! Send one request through the cache manager.

use anyhow::{Context as _, Result};
use http::Method;
use offline_cache::{CacheManager, CacheStorage, Intercept};
use offline_fetch::{Destination, Fetcher, Request};
use serde::Serialize;

use super::FetchArgs;
use crate::context::Context;
use crate::output::{format_bytes, preview, status_badge};

#[derive(Serialize)]
struct FetchSummary {
    url: String,
    class: String,
    intercepted: bool,
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    body_bytes: usize,
    body: String,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let request = build_request(&args, ctx)?;

    let storage = ctx.cache_storage()?;
    let manager = CacheManager::new(&ctx.config, storage, ctx.fetcher()?);

    let static_cache = &manager.names().static_cache;
    if args.reinstall || needs_install(manager.storage(), static_cache).await? {
        let spinner = ctx.output.spinner("Caching shell assets...");
        let report = manager.install().await;
        spinner.finish_and_clear();
        if report.is_complete() {
            ctx.output
                .debug(&format!("Cached {} shell assets", report.cached.len()));
        } else {
            ctx.output.warn(&format!(
                "Shell assets not cached: {}",
                report.failed.join(", ")
            ));
        }
    } else {
        ctx.output
            .debug(&format!("Static cache '{}' present, skipping install", static_cache));
    }

    let class = manager.classifier().classify(&request);
    ctx.output.debug(&format!("{} classified as {}", request.url, class));

    let (response, intercepted) = match manager.handle(&request).await {
        Intercept::Respond(response) => (response, true),
        Intercept::Passthrough => {
            let response = manager
                .fetcher()
                .fetch(&request)
                .await
                .with_context(|| format!("Failed to fetch {}", request.url))?;
            (response, false)
        }
    };
    manager.settle().await;

    let body = response.text();
    let summary = FetchSummary {
        url: request.url.to_string(),
        class: class.to_string(),
        intercepted,
        status: response.status.as_u16(),
        status_text: response.status_text().to_string(),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body_bytes: response.body.len(),
        body: body.clone().into_owned(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    ctx.output.header(&format!("{} {}", request.method, summary.url));
    ctx.output.kv("Class", &summary.class);
    ctx.output.kv(
        "Status",
        &status_badge(response.status, &summary.status_text),
    );
    if !intercepted {
        ctx.output.kv("Cache", "bypassed");
    }
    for (name, value) in &summary.headers {
        ctx.output.kv(name, value);
    }
    ctx.output
        .kv("Body", &format_bytes(summary.body_bytes as u64));
    if !body.is_empty() {
        println!("\n{}", preview(&body, args.preview));
    }

    Ok(())
}

/// Whether the static cache still has to be provisioned. A cache left empty
/// by a failed install counts as missing.
async fn needs_install<S: CacheStorage>(storage: &S, static_cache: &str) -> Result<bool> {
    let keys = storage
        .keys(static_cache)
        .await
        .context("Failed to inspect cache storage")?;
    Ok(keys.is_empty())
}

/// Build the request described by the arguments. Relative URLs resolve
/// against the configured origin.
fn build_request(args: &FetchArgs, ctx: &Context) -> Result<Request> {
    let url = ctx
        .config
        .origin
        .join(&args.url)
        .with_context(|| format!("Invalid URL: {}", args.url))?;
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", args.method))?;

    let request = if args.image {
        Request::image(url.as_str())?
    } else if args.navigate {
        Request::navigate(url.as_str())?
    } else {
        let request = Request::get(url.as_str())?;
        match args.destination.as_deref() {
            Some(destination) => request.with_destination(Destination::parse(destination)),
            None => request,
        }
    };

    Ok(request.with_method(method))
}
