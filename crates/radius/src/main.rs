mod commands;
mod parameters;

use clap::{Args, Parser, Subcommand};
use radius_armtemplate::TemplateOptions;
use radius_config::WorkspaceConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rad")]
#[command(about = "Deploy ARM templates to Radius providers", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding local deployment state
    #[arg(long, global = true, env = "RAD_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Template input shared by `eval` and `deploy`
#[derive(Args)]
struct TemplateArgs {
    /// Template file (ARM JSON, e.g. compiled from Bicep)
    template: PathBuf,

    /// Parameter file, either a full ARM parameter document or a bare map
    #[arg(long, value_name = "FILE")]
    parameters: Option<PathBuf>,

    /// Single parameter, overrides the parameter file
    #[arg(short = 'p', long = "parameter", value_name = "NAME=VALUE")]
    parameter: Vec<String>,

    /// Target subscription ID
    #[arg(long, env = "RAD_SUBSCRIPTION")]
    subscription: Option<String>,

    /// Target resource group
    #[arg(short = 'g', long, env = "RAD_RESOURCE_GROUP")]
    resource_group: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a template and print its resources in deployment order
    Eval {
        #[command(flatten)]
        template: TemplateArgs,
        /// Print the extracted resources as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deploy a template
    Deploy {
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Inspect local deployment state
    #[command(subcommand)]
    State(StateCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List deployed resources
    List,
    /// Show one deployed resource
    Show {
        /// Resource ID
        id: String,
    },
    /// Forget a deployed resource
    Rm {
        /// Resource ID
        id: String,
    },
}

impl TemplateArgs {
    /// Workspace file values, overridden by flags and environment
    fn workspace(&self, state_dir: Option<PathBuf>) -> anyhow::Result<WorkspaceConfig> {
        let config = radius_config::load_workspace_config()?;
        Ok(config.with_overrides(
            self.subscription.clone(),
            self.resource_group.clone(),
            state_dir,
        ))
    }

    fn options(&self, workspace: &WorkspaceConfig) -> anyhow::Result<TemplateOptions> {
        let parameters = parameters::load(self.parameters.as_deref(), &self.parameter)?;
        Ok(
            TemplateOptions::new(&workspace.subscription_id, &workspace.resource_group)
                .with_parameters(parameters),
        )
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("rad {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Eval { template, json } => {
            let workspace = template.workspace(cli.state_dir)?;
            let options = template.options(&workspace)?;
            commands::eval::handle(&template.template, &options, json)?;
        }
        Commands::Deploy { template } => {
            let workspace = template.workspace(cli.state_dir)?;
            let options = template.options(&workspace)?;
            commands::deploy::handle(&template.template, options, &workspace).await?;
        }
        Commands::State(state_cmd) => {
            let workspace =
                radius_config::load_workspace_config()?.with_overrides(None, None, cli.state_dir);
            match state_cmd {
                StateCommands::List => commands::state::handle_list(&workspace).await?,
                StateCommands::Show { id } => commands::state::handle_show(&workspace, &id).await?,
                StateCommands::Rm { id } => commands::state::handle_rm(&workspace, &id).await?,
            }
        }
    }

    Ok(())
}
