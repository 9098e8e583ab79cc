//! outline-graph CLI - document title and outline recovery tool

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use outline_graph::features::{features_file_name, write_csv};
use outline_graph::hierarchy::TitleSource;
use outline_graph::pipeline::list_inputs;
use outline_graph::render::{self, JsonFormat};
use outline_graph::{
    DeepLevelPolicy, ExtractorRegistry, FeatureExtractor, GraphBuilder, IndentationReference,
    IngestOptions, NumberingPatterns, PageGraph, Pipeline, PipelineOptions,
};

#[derive(Parser)]
#[command(name = "outline-graph")]
#[command(version)]
#[command(about = "Recover document titles and H1-H3 outlines from layout", long_about = None)]
struct Cli {
    /// Directory holding heading_model.txt, feature_names.json and labels.json
    #[arg(long, global = true, env = "OUTLINE_GRAPH_MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    /// Neighbours per block in the page graphs
    #[arg(short = 'k', long, global = true, default_value = "4")]
    neighbors: usize,

    /// Which below-neighbour indentation is measured against
    #[arg(long, global = true, value_enum, default_value = "last-below")]
    indentation: Indentation,

    /// What to do with unnumbered headings below the third font tier
    #[arg(long, global = true, value_enum, default_value = "collapse")]
    deep_levels: DeepLevels,

    /// Keep blocks with at least this many characters
    #[arg(long, global = true, default_value = "1")]
    min_chars: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover the outline of one document
    Outline {
        /// Input document (PDF or JSON block dump)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Recover outlines for every document in a directory
    Batch {
        /// Input directory
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Output directory for <name>_outline.json files
        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,

        /// Process documents one at a time
        #[arg(long)]
        sequential: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Export the per-block feature table as CSV for labelling
    Features {
        /// Input document, or a directory of documents
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Output CSV file (stdout if not specified). For a directory input,
        /// the directory receiving `<name>_blocks_unlabeled.csv` files
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the proximity graph of each page
    Graph {
        /// Input document (PDF or JSON block dump)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// List every edge
        #[arg(long)]
        edges: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Indentation {
    /// Last neighbour below the block
    LastBelow,
    /// Nearest neighbour below the block
    NearestBelow,
    /// Last neighbour in adjacency order
    LastNeighbor,
}

impl From<Indentation> for IndentationReference {
    fn from(value: Indentation) -> Self {
        match value {
            Indentation::LastBelow => IndentationReference::LastBelow,
            Indentation::NearestBelow => IndentationReference::NearestBelow,
            Indentation::LastNeighbor => IndentationReference::LastNeighbor,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DeepLevels {
    /// Report them as H3
    Collapse,
    /// Leave them out of the outline
    Drop,
}

impl From<DeepLevels> for DeepLevelPolicy {
    fn from(value: DeepLevels) -> Self {
        match value {
            DeepLevels::Collapse => DeepLevelPolicy::Collapse,
            DeepLevels::Drop => DeepLevelPolicy::Drop,
        }
    }
}

impl Cli {
    fn ingest_options(&self) -> IngestOptions {
        IngestOptions::new().with_min_text_length(self.min_chars)
    }

    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::new()
            .with_neighbors(self.neighbors)
            .with_indentation(self.indentation.into())
            .with_deep_levels(self.deep_levels.into())
            .with_ingest(self.ingest_options())
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Outline {
            input,
            output,
            compact,
        } => cmd_outline(&cli, input, output.as_deref(), *compact),
        Commands::Batch {
            input,
            output,
            sequential,
            compact,
        } => cmd_batch(&cli, input, output, *sequential, *compact),
        Commands::Features { input, output } => cmd_features(&cli, input, output.as_deref()),
        Commands::Graph { input, edges } => cmd_graph(&cli, input, *edges),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn cmd_outline(
    cli: &Cli,
    input: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::from_model_dir(&cli.model_dir, cli.pipeline_options())?;
    let report = pipeline.process_file(input)?;

    if !report.alignment.is_exact() {
        eprintln!(
            "{} {} missing, {} dropped, {} non-finite feature values",
            "Warning:".yellow(),
            report.alignment.missing.len(),
            report.alignment.dropped.len(),
            report.alignment.non_finite
        );
    }
    if report.title_source == TitleSource::LargestFont {
        eprintln!("{} no title predicted, used largest font", "Note:".yellow());
    }

    let json = render::to_json(&report.outline, json_format(compact))?;

    if let Some(path) = output {
        fs::write(path, format!("{}\n", json))?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_batch(
    cli: &Cli,
    input: &Path,
    output: &Path,
    sequential: bool,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = cli
        .pipeline_options()
        .with_parallel(!sequential)
        .with_json_format(json_format(compact));
    let pipeline = Pipeline::from_model_dir(&cli.model_dir, options)?;

    let inputs = list_inputs(input, pipeline.registry())?;
    if inputs.is_empty() {
        println!("{} {}", "No documents found in".yellow(), input.display());
        return Ok(());
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = pipeline.process_batch(&inputs, output, |path, _| {
        if let Some(name) = path.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    })?;
    pb.finish_with_message("Done!");

    println!("\n{}", "Outlines written:".green().bold());
    for done in &report.succeeded {
        println!(
            "  {} {} ({} headings)",
            "├─".dimmed(),
            done.output.display(),
            done.headings
        );
    }

    if !report.failed.is_empty() {
        println!("\n{}", "Failed:".red().bold());
        for failure in &report.failed {
            println!(
                "  {} {}: {}",
                "├─".dimmed(),
                failure.input.display(),
                failure.error
            );
        }
    }

    println!(
        "\n{} {} of {} documents",
        "Processed".green().bold(),
        report.succeeded.len(),
        report.total()
    );

    Ok(())
}

fn cmd_features(
    cli: &Cli,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ExtractorRegistry::with_defaults();

    if input.is_dir() {
        return cmd_features_dir(cli, &registry, input, output.unwrap_or(input));
    }

    if let Some(path) = output {
        let rows = export_features(cli, &registry, input, fs::File::create(path)?)?;
        println!("{} {} rows to {}", "Saved".green(), rows, path.display());
    } else {
        export_features(cli, &registry, input, io::stdout().lock())?;
    }

    Ok(())
}

fn cmd_features_dir(
    cli: &Cli,
    registry: &ExtractorRegistry,
    input: &Path,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = list_inputs(input, registry)?;
    if inputs.is_empty() {
        println!("{} {}", "No documents found in".yellow(), input.display());
        return Ok(());
    }
    fs::create_dir_all(out_dir)?;

    let mut exported = 0usize;
    for path in &inputs {
        let out_path = out_dir.join(features_file_name(path));
        let result = fs::File::create(&out_path)
            .map_err(outline_graph::Error::from)
            .and_then(|file| export_features(cli, registry, path, file));
        match result {
            Ok(rows) => {
                exported += 1;
                println!("{} {} ({} rows)", "Exported".green(), out_path.display(), rows);
            }
            Err(e) => {
                let _ = fs::remove_file(&out_path);
                println!("{} {}: {}", "Failed".red(), path.display(), e);
            }
        }
    }

    println!(
        "\n{} {} of {} documents",
        "Exported".green().bold(),
        exported,
        inputs.len()
    );
    Ok(())
}

/// Write the feature table of one document and return its row count.
fn export_features<W: io::Write>(
    cli: &Cli,
    registry: &ExtractorRegistry,
    input: &Path,
    writer: W,
) -> outline_graph::Result<usize> {
    let pages = registry.extract(input, &cli.ingest_options())?;

    let builder = GraphBuilder::new(cli.neighbors);
    let graphs: Vec<PageGraph<'_>> = pages.iter().map(|p| builder.build(&p.blocks)).collect();
    let extractor = FeatureExtractor::new(NumberingPatterns::default(), cli.indentation.into());
    let frame = extractor.extract(&graphs, true);

    write_csv(&frame, &pages, writer)?;
    Ok(frame.len())
}

fn cmd_graph(cli: &Cli, input: &Path, edges: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pages = ExtractorRegistry::with_defaults().extract(input, &cli.ingest_options())?;
    let builder = GraphBuilder::new(cli.neighbors);

    println!("{}", "Page Graphs".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Neighbours".bold(), builder.k());
    println!();

    for page in &pages {
        let graph = builder.build(&page.blocks);
        println!(
            "{} {}: {} nodes, {} edges",
            "Page".bold(),
            page.number,
            graph.node_count(),
            graph.edge_count()
        );

        if edges {
            for (a, b) in graph.edges() {
                println!(
                    "  {} {} -- {} ({:.1})",
                    "├─".dimmed(),
                    a,
                    b,
                    graph.distance(a, b)
                );
            }
        }
    }

    Ok(())
}

fn cmd_version() {
    println!(
        "{} {}",
        "outline-graph".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("Document title and outline recovery tool");
    println!();
    println!("License: MIT");
}
