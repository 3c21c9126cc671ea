use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use snafu::{ResultExt, Snafu};

use crate::cli::{Command, Opts};

mod cli;
mod commands;
mod logging;

const APP_NAME: &str = "rdr-config";
const LOG_ENV: &str = "RDR_CONFIG_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to create output file {path:?}"))]
    CreateOutput { source: io::Error, path: PathBuf },

    #[snafu(display("failed to flush output"))]
    FlushOutput { source: io::Error },

    #[snafu(display("failed to render the resolved clusters"))]
    Render { source: commands::Error },

    #[snafu(display("validation failed"))]
    Validate { source: commands::Error },

    #[snafu(display("failed to generate the fallback install configs"))]
    GenerateFallback { source: commands::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitializeLoggingSnafu)?;

    match opts.command {
        Command::Render(args) => {
            let mut out: Box<dyn Write> = match &args.output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).context(CreateOutputSnafu { path })?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            commands::render(&args, &mut out).context(RenderSnafu)?;
            out.flush().context(FlushOutputSnafu)
        }
        Command::Validate(args) => {
            commands::validate_clusters(&args, io::stdout().lock()).context(ValidateSnafu)
        }
        Command::GenerateFallback(args) => {
            let written = commands::generate_fallback(&args).context(GenerateFallbackSnafu)?;
            tracing::info!(
                count = written.len(),
                out_dir = %args.out_dir.display(),
                "regenerated fallbacks"
            );
            Ok(())
        }
    }
}
