use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::db::Store;
use crate::services::export;

pub async fn cmd_export_members(config: &Config, path: &Path) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let members = store.list_members().await?;
    let csv = export::members_to_csv(&members);

    if path == Path::new("-") {
        std::io::stdout().write_all(csv.as_bytes())?;
        return Ok(());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, csv).await?;

    println!("✓ Exported {} members to {}", members.len(), path.display());
    Ok(())
}
