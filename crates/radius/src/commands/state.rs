use colored::Colorize;
use radius_config::WorkspaceConfig;
use radius_providers::{ResourceStatus, StateManager};

fn status_label(status: &ResourceStatus) -> colored::ColoredString {
    match status {
        ResourceStatus::Succeeded => status.to_string().green(),
        ResourceStatus::Failed => status.to_string().red(),
        ResourceStatus::Provisioning => status.to_string().yellow(),
        ResourceStatus::Unknown => status.to_string().dimmed(),
    }
}

pub async fn handle_list(workspace: &WorkspaceConfig) -> anyhow::Result<()> {
    let manager = StateManager::new(&workspace.state_dir);
    let state = manager.load().await?;

    if state.resources.is_empty() {
        println!(
            "{}",
            format!("No resources in {}", manager.state_path().display()).yellow()
        );
        return Ok(());
    }

    println!("{} resources:", state.resources.len());
    for resource in state.resources.values() {
        println!(
            "  {} {} [{}]",
            resource.resource_type.cyan(),
            resource.id,
            status_label(&resource.status)
        );
    }

    Ok(())
}

pub async fn handle_show(workspace: &WorkspaceConfig, id: &str) -> anyhow::Result<()> {
    let state = StateManager::new(&workspace.state_dir).load().await?;

    match state.get(id) {
        Some(resource) => {
            println!("{}", serde_json::to_string_pretty(resource)?);
            Ok(())
        }
        None => anyhow::bail!("resource not found in state: {}", id),
    }
}

pub async fn handle_rm(workspace: &WorkspaceConfig, id: &str) -> anyhow::Result<()> {
    let manager = StateManager::new(&workspace.state_dir);
    let lock = manager.acquire_lock().await?;

    let mut state = manager.load().await?;
    if state.remove(id).is_none() {
        lock.release().await?;
        anyhow::bail!("resource not found in state: {}", id);
    }
    manager.save(&state).await?;
    lock.release().await?;

    println!("{} Removed {}", "✓".green().bold(), id);
    Ok(())
}
