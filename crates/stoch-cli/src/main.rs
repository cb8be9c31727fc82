//! Command-line interface for the stoch model front end.

use clap::{Parser, Subcommand};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use stoch::{RationalFunction, SparseModel};
use stoch_build::{BuildOptions, ModelValue};
use stoch_syntax::pretty_print;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI error with source context for pretty printing.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read file: {message}")]
    Io { message: String },

    #[error("parse error: {message}")]
    #[diagnostic(code(stoch::parse_error))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<Arc<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("property error: {message}")]
    #[diagnostic(code(stoch::property_error))]
    Property {
        message: String,
        #[source_code]
        src: NamedSource<Arc<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("build error: {message}")]
    Build { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl CliError {
    fn from_parse_error(e: stoch_syntax::ParseError, source: Arc<String>, filename: &str) -> Self {
        let span = e.span();
        CliError::Parse {
            message: e.to_string(),
            src: NamedSource::new(filename, source),
            span: (span.start, span.len()).into(),
        }
    }

    fn from_property_error(e: stoch_logic::PropertyError, text: &str) -> Self {
        let span = e.span();
        CliError::Property {
            message: e.to_string(),
            src: NamedSource::new("<properties>", Arc::new(text.to_string())),
            span: (span.start.min(text.len()), span.len().min(text.len())).into(),
        }
    }
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "stoch", version)]
#[command(about = "PRISM program and property front end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a PRISM file and show a program summary
    Parse {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Reprint the program in canonical form
        #[arg(long)]
        pretty: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse properties against a PRISM file
    Props {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Properties, separated by `;` or newlines
        #[arg(value_name = "PROPS")]
        properties: String,
    },

    /// Build the explicit-state model of a PRISM file
    Build {
        /// Input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Properties to build for (restricts the labels kept)
        #[arg(short, long, value_name = "PROP")]
        prop: Vec<String>,

        /// Constant assignments (name=value)
        #[arg(short, long, value_name = "CONST=VALUE")]
        constant: Vec<String>,

        /// Build with the parametric engine (rational functions)
        #[arg(long)]
        parametric: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let filter = if matches!(
        &cli.command,
        Commands::Parse { verbose: true, .. } | Commands::Build { verbose: true, .. }
    ) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Parse {
            file,
            pretty,
            verbose,
        } => cmd_parse(&file, pretty, verbose),
        Commands::Props { file, properties } => cmd_props(&file, &properties),
        Commands::Build {
            file,
            prop,
            constant,
            parametric,
            verbose: _,
        } => cmd_build(&file, &prop, &constant, parametric),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}

fn read_program(file: &PathBuf) -> CliResult<(stoch::Program, Arc<String>, String)> {
    let filename = file.display().to_string();
    let source = Arc::new(fs::read_to_string(file).map_err(|e| CliError::Io {
        message: e.to_string(),
    })?);
    let program = stoch_syntax::parse(&source)
        .map_err(|e| CliError::from_parse_error(e, source.clone(), &filename))?;
    Ok((program, source, filename))
}

fn cmd_parse(file: &PathBuf, pretty: bool, verbose: bool) -> CliResult<()> {
    let (program, _, _) = read_program(file)?;

    if pretty {
        print!("{}", pretty_print(&program));
        return Ok(());
    }
    if verbose {
        println!("{program:#?}");
        return Ok(());
    }

    println!("{}", program.model_type().keyword());
    println!("  {} modules", program.nr_modules());
    for module in &program.modules {
        println!(
            "    module {} ({} variables, {} commands)",
            module.name.name,
            module.vars.len(),
            module.commands.len()
        );
    }
    if !program.constants.is_empty() {
        println!("  {} constants", program.constants.len());
        for c in &program.constants {
            let status = if c.value.is_some() { "" } else { " (undefined)" };
            println!("    const {} {}{status}", c.ty, c.name.name);
        }
    }
    if !program.labels.is_empty() {
        println!("  {} labels", program.labels.len());
        for l in &program.labels {
            println!("    label \"{}\"", l.name);
        }
    }
    if !program.rewards.is_empty() {
        println!("  {} reward structures", program.rewards.len());
    }
    println!("parse: ok");
    Ok(())
}

fn cmd_props(file: &PathBuf, properties: &str) -> CliResult<()> {
    let (program, _, _) = read_program(file)?;
    let parsed = stoch_logic::parse_properties(properties, &program)
        .map_err(|e| CliError::from_property_error(e, properties))?;
    for property in &parsed {
        println!("{property}");
    }
    println!("{} properties: ok", parsed.len());
    Ok(())
}

fn cmd_build(
    file: &PathBuf,
    props: &[String],
    constants: &[String],
    parametric: bool,
) -> CliResult<()> {
    let (program, _, _) = read_program(file)?;

    let mut properties = Vec::new();
    for text in props {
        properties.extend(
            stoch_logic::parse_properties(text, &program)
                .map_err(|e| CliError::from_property_error(e, text))?,
        );
    }

    let options = BuildOptions {
        constant_overrides: parse_constant_overrides(constants)?,
    };

    info!("building model...");
    if parametric {
        let model = stoch_build::build::<RationalFunction>(&program, &properties, &options)
            .map_err(|e| CliError::Build {
                message: e.to_string(),
            })?;
        report(&model, true);
    } else {
        let model = stoch_build::build::<f64>(&program, &properties, &options).map_err(|e| {
            CliError::Build {
                message: e.to_string(),
            }
        })?;
        report(&model, false);
    }
    Ok(())
}

fn parse_constant_overrides(raw: &[String]) -> CliResult<Vec<(String, String)>> {
    raw.iter()
        .map(|assignment| {
            assignment
                .split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| CliError::Other {
                    message: format!("invalid constant assignment `{assignment}`, expected NAME=VALUE"),
                })
        })
        .collect()
}

fn report<T: ModelValue>(model: &SparseModel<T>, parametric: bool) {
    println!("model type:  {}", model.model_type());
    println!("states:      {}", model.nr_states());
    if model.nr_choices() != model.nr_states() {
        println!("choices:     {}", model.nr_choices());
    }
    println!("transitions: {}", model.nr_transitions());
    println!("parametric:  {parametric}");
    let labeling = model.labeling();
    for name in labeling.label_names() {
        if let Ok(bits) = labeling.states_with_label(name) {
            println!("label \"{name}\": {} states", bits.count());
        }
    }
    for name in model.reward_models().keys() {
        let shown = if name.is_empty() { "(default)" } else { name };
        println!("reward model \"{shown}\"");
    }
}
