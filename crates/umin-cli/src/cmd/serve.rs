use anyhow::Context;
use std::path::Path;
use umin_core::config::Config;

pub fn run(root: &Path, port: u16, open: bool) -> anyhow::Result<()> {
    // Fail fast with a CLI-style message before binding anything.
    Config::load(root).context("failed to load config")?;

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual = listener.local_addr()?.port();
        println!("umin admin: http://localhost:{actual}");
        umin_server::serve_on(root_buf, listener, open).await
    })
}
