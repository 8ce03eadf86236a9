use anyhow::Context;
use colored::Colorize;
use radius_armtemplate::TemplateOptions;
use radius_providers::resolve_identity;
use std::path::Path;

pub fn handle(template: &Path, options: &TemplateOptions, json: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read template {}", template.display()))?;

    let resources = match radius_armtemplate::eval(&content, options) {
        Ok(resources) => resources,
        Err(e) => {
            eprintln!("{}", "✗ Template evaluation failed".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resources)?);
        return Ok(());
    }

    println!(
        "{} {} resources in deployment order",
        "✓".green().bold(),
        resources.len()
    );
    for (i, resource) in resources.iter().enumerate() {
        let provider = resolve_identity(resource.import.as_deref(), &resource.resource_type);
        println!(
            "  {}. {} {} ({}, {})",
            i + 1,
            resource.resource_type.cyan(),
            resource.name.bold(),
            resource.api_version,
            provider
        );
        println!("     {}", resource.id.dimmed());
        for dependency in &resource.depends_on {
            println!("     ↳ {}", dependency);
        }
    }

    Ok(())
}
