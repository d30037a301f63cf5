//! Dump schema of the REST API server.

use std::{
    fs::File,
    io::{self, Write},
};

use utoipa::OpenApi as _;

use crate::server::run::openapi::ApiDoc;

/// Command line arguments for `server schema` sub command.
#[derive(clap::Parser, Debug, Clone)]
#[command(author, version, about = "Dump REST API schema", long_about = None)]
pub struct Args {
    /// Path to the output file.  Use stdout if missing.
    #[arg(long)]
    pub output_file: Option<String>,
}

impl Args {
    /// Get writeable output file or stdout.
    fn get_output(&self) -> Result<Box<dyn Write>, io::Error> {
        match self.output_file {
            Some(ref path) => File::create(path).map(|f| Box::new(f) as Box<dyn Write>),
            None => Ok(Box::new(io::stdout())),
        }
    }
}

/// Main entry point for `server schema` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let schema_yaml = ApiDoc::openapi()
        .to_yaml()
        .map_err(|e| anyhow::anyhow!("Failed to convert OpenAPI to YAML: {}", e))?;
    let mut output = args
        .get_output()
        .map_err(|e| anyhow::anyhow!("Failed to open output file: {}", e))?;
    write!(output, "{}", &schema_yaml)
        .map_err(|e| anyhow::anyhow!("Failed to write output: {}", e))?;

    tracing::info!("All done. Have a nice day!");
    Ok(())
}

#[cfg(test)]
mod test {
    use temp_testdir::TempDir;

    #[test]
    fn schema_to_file() -> Result<(), anyhow::Error> {
        let temp = TempDir::default();
        let path = temp.join("openapi.yaml");
        let args = super::Args {
            output_file: Some(path.to_string_lossy().to_string()),
        };
        super::run(&crate::common::Args::default(), &args)?;

        let yaml = std::fs::read_to_string(&path)?;
        assert!(yaml.starts_with("openapi: 3."));
        assert!(yaml.contains("/mappings/{id}/comments:"));
        assert!(yaml.contains("operationId: jobsGet"));
        Ok(())
    }
}
