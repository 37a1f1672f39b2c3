//! Print the registered function table.

use std::sync::Arc;

use clap::Args;

use mkedev_tools::{RecordingMap, SampleData, StaticZoning, ToolDeps, builtin_registry};

#[derive(Args)]
pub struct ToolsCommand {
    /// Output the function declarations as JSON
    #[arg(long)]
    pub json: bool,
}

impl ToolsCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        let registry = builtin_registry(ToolDeps {
            map: Arc::new(RecordingMap::new()),
            data: Arc::new(SampleData::new()),
            zoning: Arc::new(StaticZoning),
        });

        if self.json {
            let declarations = registry.declarations();
            println!("{}", serde_json::to_string_pretty(&declarations)?);
            return Ok(());
        }

        for name in registry.names() {
            let spec = registry.get(name).expect("registered name");
            println!("{:<32} {}", spec.name, spec.description);
        }
        Ok(())
    }
}
