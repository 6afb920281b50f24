//! Drives the descriptor and routing endpoints through the transport
//! structs, the way a host HTTP server would.

mod actions;

use std::sync::Arc;

use ext_direct::{
    ApiConfig, CacheSettings, DirectConfig, DirectRequest, FileStore, MemorySessionStore, Router,
    TOKEN1_COOKIE, UploadedFile,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cache_dir = std::env::temp_dir().join("ext-direct-demo-cache");
    let router = Router::new(
        Arc::new(actions::build_registry()),
        Arc::new(FileStore::new(&cache_dir)?),
        Arc::new(MemorySessionStore::new()),
        DirectConfig::new()
            .with_api(
                ApiConfig::new()
                    .with_url("http://localhost:8081/router")
                    .with_id("demo")
                    .with_namespace("Demo.remote"),
            )
            .with_cache(
                CacheSettings::new()
                    .with_key("demo")
                    .with_ttl(std::time::Duration::from_secs(60)),
            ),
    )?;

    // 1. The client fetches the API descriptor and receives the token pair.
    let publish = router.api(&DirectRequest::default()).await?;
    println!("--- descriptor publish ({}) ---", publish.content_type);
    println!("{}\n", publish.body);

    let token1 = publish
        .cookies
        .first()
        .map(|c| c.value.clone())
        .unwrap_or_default();

    // 2. A batched JSON call, echoing the token cookie.
    let batch = DirectRequest::json(
        r#"[
            {"type":"rpc","action":"Calculator","method":"add","data":[1,2],"tid":1},
            {"type":"rpc","action":"Calculator","method":"div","data":[10,4],"tid":2},
            {"type":"rpc","action":"Calculator","method":"div","data":[1,0],"tid":3}
        ]"#,
    )
    .with_cookie(TOKEN1_COOKIE, token1);

    let response = router.route(&batch).await?;
    println!("--- batched calls ({}) ---", response.content_type);
    println!("{}\n", response.body);

    // 3. A multipart form submission with an avatar upload.
    let form = DirectRequest::multipart([
        ("extAction", "Profile"),
        ("extMethod", "update"),
        ("extTID", "4"),
        ("extType", "rpc"),
        ("extUpload", "true"),
        ("name", "Alice"),
    ])
    .with_upload(UploadedFile::new(
        "avatar",
        "alice.png",
        "image/png",
        vec![0u8; 1024],
    ));

    let response = router.route(&form).await?;
    println!("--- form upload ({}) ---", response.content_type);
    println!("{}", response.body);

    Ok(())
}
