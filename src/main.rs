use std::io::Write;

use clap::Parser;
use console::Term;
use miette::IntoDiagnostic;
use tracing::error;

use cli::{Cli, Commands, OutputFormat};
use vmdist::config::{Config, Git};
use vmdist::tasks::BuildReport;

mod cli;

fn main() {
    let cli = Cli::parse();
    // Init the logger
    tracing_subscriber::fmt::fmt()
        .with_max_level(cli.verbose)
        .with_target(false)
        .without_time()
        .with_ansi(console::colors_enabled_stderr())
        .init();

    // Control how errors are formatted by setting the miette hook
    miette::set_hook(Box::new(move |_| {
        let graphical_theme = if console::colors_enabled_stderr() {
            miette::GraphicalTheme::unicode()
        } else {
            miette::GraphicalTheme::unicode_nocolor()
        };
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(graphical_theme)
                .build(),
        )
    }))
    .expect("failed to initialize error handler");

    let main_result = real_main(&cli);

    let _ = main_result.map_err(|e| {
        error!("{:?}", e);
        std::process::exit(-1);
    });
}

fn real_main(cli: &Cli) -> Result<(), miette::Report> {
    let config = Config::resolve(cli.config_args(), &Config::capture_env(), &Git)?;
    let mut out = Term::stdout();
    match &cli.command {
        Commands::CreateArchive(_) => {
            let path = vmdist::do_create_archive(&config)?;
            writeln!(out, "{path}").into_diagnostic()?;
        }
        Commands::BuildRpm(_) => {
            let report = vmdist::do_build_rpm(&config)?;
            print_report(&mut out, cli.output_format, &report).into_diagnostic()?;
        }
        Commands::BuildDeb(_) => {
            let report = vmdist::do_build_deb(&config)?;
            print_report(&mut out, cli.output_format, &report).into_diagnostic()?;
        }
        Commands::UpdateVersions(_) => {
            let updated = vmdist::do_update_versions(&config)?;
            for path in updated {
                writeln!(out, "{path}").into_diagnostic()?;
            }
        }
    }
    Ok(())
}

fn print_report(
    out: &mut Term,
    format: OutputFormat,
    report: &BuildReport,
) -> Result<(), std::io::Error> {
    match format {
        OutputFormat::Human => {
            writeln!(out, "built {} packages:", report.family)?;
            for target in &report.targets {
                writeln!(out, "  {} ({})", target.id, target.state)?;
            }
        }
        OutputFormat::Json => {
            let string = serde_json::to_string_pretty(report).expect("report is serializable");
            writeln!(out, "{string}")?;
        }
    }
    Ok(())
}
