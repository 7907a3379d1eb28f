mod config;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use config::Cli;
use pg2rs::{generate, GenerateOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let resolved = match cli.resolve() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    initialize_logging(resolved.verbose, resolved.quiet);

    match run(&resolved) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn initialize_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn run(resolved: &config::ResolvedOptions) -> Result<()> {
    let functions_source = std::fs::read_to_string(&resolved.functions_file)
        .with_context(|| format!("reading functions file `{}`", resolved.functions_file))?;

    let schema_source = resolved
        .schema_file
        .as_deref()
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("reading schema file `{path}`"))
        })
        .transpose()?;

    let options = GenerateOptions {
        permissive: resolved.permissive,
        omit_helpers: resolved.no_helpers,
    };

    let outcome = generate(
        &functions_source,
        &resolved.functions_file,
        schema_source.as_deref(),
        resolved.schema_file.as_deref(),
        &options,
    )
    .context("generating client code")?;

    for warning in &outcome.warnings {
        tracing::warn!("{warning}");
    }

    std::fs::write(&resolved.output_file, &outcome.code)
        .with_context(|| format!("writing output file `{}`", resolved.output_file))?;

    tracing::info!(
        "wrote {} ({} warning(s))",
        resolved.output_file,
        outcome.warnings.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn run_reads_functions_file_and_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let functions_path = dir.path().join("functions.sql");
        let output_path = dir.path().join("out.rs");

        let mut f = std::fs::File::create(&functions_path).unwrap();
        writeln!(f, "-- Say hello.\nCREATE FUNCTION say_hello() RETURNS TEXT AS $$ SELECT 'hi' $$ LANGUAGE sql;").unwrap();
        drop(f);

        let resolved = config::ResolvedOptions {
            functions_file: functions_path.to_string_lossy().into_owned(),
            schema_file: None,
            output_file: output_path.to_string_lossy().into_owned(),
            permissive: false,
            no_helpers: false,
            verbose: false,
            quiet: true,
        };

        run(&resolved).unwrap();

        let written = std::fs::read_to_string(&output_path).unwrap();
        assert!(written.contains("pub async fn say_hello"));
    }

    #[test]
    fn run_reports_missing_functions_file() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = config::ResolvedOptions {
            functions_file: dir
                .path()
                .join("does_not_exist.sql")
                .to_string_lossy()
                .into_owned(),
            schema_file: None,
            output_file: dir.path().join("out.rs").to_string_lossy().into_owned(),
            permissive: false,
            no_helpers: false,
            verbose: false,
            quiet: true,
        };

        let err = run(&resolved).unwrap_err();
        assert!(format!("{err:#}").contains("reading functions file"));
    }
}
