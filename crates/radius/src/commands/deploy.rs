use anyhow::Context;
use colored::Colorize;
use radius_armtemplate::{
    DeploymentDriver, DeploymentEvent, ErrorKind, NestedDeploymentProvider, ResourceGroup,
    TemplateOptions,
};
use radius_config::WorkspaceConfig;
use radius_providers::registry::{AZURE, DEPLOYMENT, KUBERNETES, RADIUS};
use radius_providers::{LocalProvider, ProviderRegistry};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Providers backed by the local state store
fn local_registry(workspace: &WorkspaceConfig, cancel: &CancellationToken) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for key in [AZURE, KUBERNETES, RADIUS] {
        registry.register(key, Arc::new(LocalProvider::new(key, &workspace.state_dir)));
    }

    let nested = NestedDeploymentProvider::new(registry.clone())
        .with_resource_group(ResourceGroup::named(&workspace.resource_group))
        .with_cancellation(cancel.clone());
    registry.with(DEPLOYMENT, Arc::new(nested))
}

fn print_event(event: &DeploymentEvent) {
    match event {
        DeploymentEvent::Started {
            resource_type,
            name,
            ..
        } => {
            println!("  {} {} {}", "→".blue(), resource_type.cyan(), name);
        }
        DeploymentEvent::Succeeded {
            resource_type,
            name,
            provider,
            ..
        } => {
            println!(
                "  {} {} {} ({})",
                "✓".green().bold(),
                resource_type.cyan(),
                name,
                provider
            );
        }
        DeploymentEvent::Failed {
            resource_type,
            name,
            error,
            ..
        } => {
            println!("  {} {} {}", "✗".red().bold(), resource_type.cyan(), name);
            println!("    {}", error.red());
        }
    }
}

pub async fn handle(
    template: &Path,
    options: TemplateOptions,
    workspace: &WorkspaceConfig,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read template {}", template.display()))?;

    println!(
        "{} {} into {}/{}",
        "Deploying".blue(),
        template.display().to_string().cyan(),
        workspace.subscription_id,
        workspace.resource_group
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling after the current resource...".yellow());
            ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let driver = DeploymentDriver::new(local_registry(workspace, &cancel))
        .with_cancellation(cancel)
        .with_events(tx);
    let result = driver.deploy(&content, options).await;

    // closes the event channel so the printer drains and exits
    drop(driver);
    printer.await?;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Deployment failed".red().bold());
            eprintln!("  {}", e);
            if e.kind() == ErrorKind::ProviderRouting {
                eprintln!();
                eprintln!("No provider is configured for this resource type");
            }
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "{}",
        format!("✓ Deployed {} resources", result.resources.len())
            .green()
            .bold()
    );

    if !result.outputs.is_empty() {
        println!("Outputs:");
        for (name, output) in &result.outputs {
            println!(
                "  {} ({}): {}",
                name.cyan(),
                output.output_type,
                serde_json::to_string(&output.value)?
            );
        }
    }

    Ok(())
}
