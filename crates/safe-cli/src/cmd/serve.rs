use std::path::Path;

pub fn run(config_path: Option<&Path>, port: u16, no_open: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    super::warn_missing_keys(&config);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(safe_server::serve(config, port, !no_open))
}
