use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use rtl_callgraph::config::collect_name_lists;
use rtl_callgraph::logging::init_tracing;
use rtl_callgraph::{render, selection, CallGraph, OutputFormat, SelectionOptions};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rtl-callgraph",
    about = "Generate a call graph from GCC RTL dumps (compile with -fdump-rtl-expand)"
)]
struct Opt {
    /// RTL dump files, e.g. foo.c.192r.expand
    #[structopt(parse(from_os_str), required = true)]
    inputs: Vec<PathBuf>,

    /// Functions to leave out, with all their edges (comma-separated, repeatable)
    #[structopt(long, number_of_values = 1)]
    omit: Vec<String>,

    /// Show only these functions and what they call or reference
    #[structopt(long, number_of_values = 1)]
    callees: Vec<String>,

    /// Show only these functions and what calls or references them
    #[structopt(long, number_of_values = 1)]
    callers: Vec<String>,

    /// Include functions that are called but not defined in the dumps
    #[structopt(long)]
    include_external: bool,

    /// Group functions into one cluster per source file
    #[structopt(long)]
    cluster_by_file: bool,

    /// Replace edges into functions with at least N callers by one summary node
    #[structopt(long, value_name = "N")]
    summarize_callers: Option<NonZeroUsize>,

    /// Output format (dot or json)
    #[structopt(short, long, default_value = "dot")]
    format: OutputFormat,

    /// Output file
    #[structopt(parse(from_os_str), short, long)]
    output: Option<PathBuf>,

    /// Log filter progress to stderr
    #[structopt(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_tracing(opt.verbose);

    let options = SelectionOptions {
        omit: collect_name_lists(&opt.omit),
        callees: collect_name_lists(&opt.callees),
        callers: collect_name_lists(&opt.callers),
        include_external: opt.include_external,
        cluster_by_file: opt.cluster_by_file,
        summarize_callers: opt.summarize_callers,
    };

    let mut graph = CallGraph::from_dumps(&opt.inputs).context("Failed to build call graph")?;
    let selected = selection::apply(&mut graph, &options);
    let output = render(&graph, &selected, &options, opt.format)
        .context("Failed to render call graph")?;

    // Write to file or stdout
    if let Some(output_path) = opt.output {
        fs::write(&output_path, output)
            .with_context(|| format!("Failed to write to file: {:?}", output_path))?;
    } else {
        print!("{}", output);
    }

    Ok(())
}
