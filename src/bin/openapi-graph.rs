//! OpenAPI Graph CLI
//!
//! Command-line interface for inspecting OpenAPI/Swagger documents: lint
//! them, list their endpoints, dump the structure graph, and explain
//! resolver failures.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use openapi_graph::{
    classify, lint, load_document_auto, render_document, Config, Diagnostic, FileStatus,
    Pipeline, PipelineOutput, SchemaGraph, Severity, SpecDocument, SpecFormat, Toggle,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-graph")]
#[command(about = "Lint OpenAPI documents and derive their endpoint graph")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the operations of a document
    Endpoints {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Output the full parse result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint document files (syntax, version fields, info, paths)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print the node/edge graph as JSON
    Graph {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Expand a container node (repeatable, applied in order)
        #[arg(long = "expand", value_name = "NODE_ID")]
        expand: Vec<String>,

        /// Expand every container
        #[arg(long, conflicts_with = "expand")]
        expand_all: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the document with local $ref pointers inlined
    Resolve {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },

    /// Classify a resolver/validator error message
    Explain {
        /// The raw error message
        message: String,

        /// Output the diagnosis as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = Config::load(cli.config.as_deref())
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
        .and_then(|config| match cli.command {
            Commands::Endpoints { source, json } => run_endpoints(&source, json, &config),
            Commands::Lint {
                path,
                format,
                strict,
                quiet,
            } => run_lint(&path, &format, strict, quiet),
            Commands::Graph {
                source,
                expand,
                expand_all,
                pretty,
            } => run_graph(&source, &expand, expand_all, pretty, &config),
            Commands::Resolve {
                source,
                output,
                yaml,
            } => run_resolve(&source, output, yaml, &config),
            Commands::Explain { message, json } => run_explain(&message, json),
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load a source and run one parse cycle over it.
fn process_source(source: &str, config: &Config) -> Result<PipelineOutput, u8> {
    // Blocking HTTP must happen before entering the runtime.
    let value = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let format = SpecFormat::from_extension(source).unwrap_or(SpecFormat::Json);
    let name = Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    let doc = SpecDocument::new(source, name, value, format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| {
            eprintln!("Error starting runtime: {}", e);
            3u8
        })?;

    let pipeline = Pipeline::local(config.pipeline.clone());
    runtime.block_on(pipeline.process(&doc)).ok_or_else(|| {
        eprintln!("Error: parse cycle was superseded");
        2u8
    })
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let color = match diag.severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
        };
        eprintln!("{}{}\x1b[0m", color, diag);
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, u8> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

fn run_endpoints(source: &str, json: bool, config: &Config) -> Result<(), u8> {
    let output = process_source(source, config)?;

    if json {
        println!("{}", to_json(&output, true)?);
    } else {
        print_diagnostics(&output.diagnostics);
        println!(
            "{} {} ({})",
            output.api.title, output.api.version, output.spec_version_label
        );
        for endpoint in &output.endpoints {
            let summary = if endpoint.summary.is_empty() {
                String::new()
            } else {
                format!("  {}", endpoint.summary)
            };
            println!(
                "  {:<7} {} [{}]{}",
                endpoint.method, endpoint.path, endpoint.id, summary
            );
        }
    }

    if output.failure.is_some() {
        Err(2)
    } else {
        Ok(())
    }
}

fn run_graph(
    source: &str,
    expand: &[String],
    expand_all: bool,
    pretty: bool,
    config: &Config,
) -> Result<(), u8> {
    let output = process_source(source, config)?;
    print_diagnostics(&output.diagnostics);
    if let Some(failure) = &output.failure {
        eprintln!("Error: {}", failure);
        return Err(2);
    }

    let mut graph: SchemaGraph = output.graph(config.layout.clone());
    if expand_all {
        graph.expand_all();
    }
    for id in expand {
        if graph.is_expanded(id) {
            continue;
        }
        if graph.toggle(id) == Toggle::NotExpandable {
            eprintln!("Warning: node is not expandable: {}", id);
        }
    }

    let value = serde_json::json!({
        "nodes": graph.nodes(),
        "edges": graph.edges(),
        "expansion": graph.expansion_state(),
    });
    println!("{}", to_json(&value, pretty)?);
    Ok(())
}

fn run_resolve(
    source: &str,
    output: Option<PathBuf>,
    yaml: bool,
    config: &Config,
) -> Result<(), u8> {
    let result = process_source(source, config)?;
    let Some(resolved) = &result.resolved else {
        match &result.failure {
            Some(failure) => eprintln!("Error: {}", failure),
            None => print_diagnostics(&result.diagnostics),
        }
        return Err(2);
    };

    let format = if yaml {
        SpecFormat::Yaml
    } else {
        SpecFormat::Json
    };
    let rendered = render_document(resolved, format);

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered.trim_end());
        }
    }

    Ok(())
}

fn run_explain(message: &str, json: bool) -> Result<(), u8> {
    let diagnosis = classify(message);
    if json {
        println!("{}", to_json(&diagnosis, false)?);
    } else {
        println!("[{}] {}", diagnosis.category, diagnosis.title);
        println!("{}", diagnosis.explanation);
    }
    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let result = lint(path, strict);

    if format == "json" {
        println!("{}", to_json(&result, true)?);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                if !quiet || diag.severity == Severity::Error {
                    println!("    {}{}\x1b[0m", color, diag);
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
