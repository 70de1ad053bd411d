use super::CliError;
use super::logging::{LOG_FILE_EXTENSION, LoggingOptions, init_logging};
use anyhow::Context;
use gapfarm_core::common::FarmLayout;
use gapfarm_core::common::paths::DEFAULT_WORKSPACE_DIR_NAME;
use gapfarm_core::domain::{FarmError, InitMode};
use gapfarm_core::modules::discovery::{SelectionRequest, parse_selectors};
use gapfarm_core::modules::gwinp::{GwInp, available_params, parse_assignment};
use gapfarm_core::modules::{
    FarmConfig, SearchPathLocator, SystemInvoker, preview_cases, render_human_summary,
    render_preview, run_farm,
};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Version of the GAP code, e.g. 2e for gap2e.x
    #[arg(value_name = "GAP_VERSION")]
    gap_version: String,

    /// Test cases to include by ordinal, category, or name (default: all)
    #[arg(short = 'i', long, num_args = 1.., value_name = "CASE")]
    include: Option<Vec<String>>,

    /// Test cases to exclude; exclusion wins over inclusion
    #[arg(short = 'x', long, num_args = 1.., value_name = "CASE")]
    exclude: Vec<String>,

    /// Predefined set of test cases, e.g. JiangH16
    #[arg(short = 's', long, value_name = "SET")]
    preset: Option<String>,

    /// Requested number of processes for the compute run
    #[arg(short = 'n', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    nprocs: Option<u32>,

    /// Initialize SCF and GAP inputs
    #[arg(long)]
    init: bool,

    /// Only initialize GAP inputs on top of a finished SCF
    #[arg(long, conflicts_with = "init")]
    init_gap: bool,

    /// Dry run: prepare directories but launch no process
    #[arg(long)]
    dry: bool,

    /// Preview names of test cases to be run and exit
    #[arg(short = 'p', long)]
    preview: bool,

    /// Suffix of the compute executable, e.g. ir4o in gap2e-mpi-ir4o.x
    #[arg(long = "gf", value_name = "SUFFIX")]
    gap_suffix: Option<String>,

    /// Workspace root, relative to the farm root
    #[arg(short = 'd', long, default_value = DEFAULT_WORKSPACE_DIR_NAME)]
    workspace: PathBuf,

    /// Farm root holding init/, struct_files/ and inputs/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Name of the log file, without extension
    #[arg(short = 'l', long, default_value = "gaptest")]
    logname: String,

    /// Debug logging
    #[arg(short = 'D', long)]
    debug: bool,

    /// Append to the log file instead of truncating it
    #[arg(short = 'a', long)]
    append: bool,

    /// Run cases whose workspace already exists
    #[arg(long = "force")]
    force_restart: bool,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl RunArgs {
    fn init_mode(&self) -> InitMode {
        if self.init {
            InitMode::Full
        } else if self.init_gap {
            InitMode::GapOnly
        } else {
            InitMode::Disabled
        }
    }
}

#[derive(clap::Args)]
pub(super) struct GwinpArgs {
    /// Path to the gw.inp file
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Parameter assignment; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    assignments: Vec<String>,

    /// Write the patched file here instead of in place
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the current value of every tunable parameter
    #[arg(long)]
    list: bool,

    /// Debug logging
    #[arg(short = 'D', long)]
    debug: bool,
}

pub(super) fn run_farm_command(args: RunArgs) -> Result<i32, CliError> {
    let root = std::path::absolute(&args.root)
        .with_context(|| format!("failed to resolve farm root '{}'", args.root.display()))?;
    init_logging(&LoggingOptions {
        debug: args.debug,
        // preview leaves the filesystem untouched
        file: (!args.preview).then(|| root.join(format!("{}.{LOG_FILE_EXTENSION}", args.logname))),
        append: args.append,
    })?;

    let config = farm_config(&args, root);
    if args.preview {
        let cases = preview_cases(&config)?;
        println!("{}", render_preview(&cases));
        return Ok(0);
    }

    let report = run_farm(&config, &SystemInvoker, &SearchPathLocator::from_env())?;
    println!("{}", render_human_summary(&report));
    if let Some(report_path) = &config.report_path {
        println!("JSON report: {}", report_path.display());
    }

    if report.passed { Ok(0) } else { Ok(1) }
}

fn farm_config(args: &RunArgs, root: PathBuf) -> FarmConfig {
    let layout = FarmLayout::new(root).with_workspace(&args.workspace);
    let mut config = FarmConfig::new(layout, args.gap_version.clone());
    config.gap_suffix = args.gap_suffix.clone();
    config.nprocs = args.nprocs.map(|count| count as usize);
    config.dry = args.dry;
    config.force_restart = args.force_restart;
    config.init_mode = args.init_mode();
    config.selection = SelectionRequest {
        include: args.include.as_ref().map(parse_selectors),
        exclude: parse_selectors(&args.exclude),
        preset: args.preset.clone(),
    };
    config.report_path = args.report.clone();
    config
}

pub(super) fn run_gwinp_command(args: GwinpArgs) -> Result<i32, CliError> {
    if args.assignments.is_empty() && !args.list {
        return Err(CliError::Usage(
            "nothing to do: pass --set KEY=VALUE or --list".to_string(),
        ));
    }
    let assignments = args
        .assignments
        .iter()
        .map(|token| {
            parse_assignment(token).ok_or_else(|| {
                CliError::Usage(format!("expected KEY=VALUE, got '{}'", token))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    init_logging(&LoggingOptions {
        debug: args.debug,
        ..LoggingOptions::default()
    })?;

    let gwinp = GwInp::load(&args.path).map_err(FarmError::from)?;
    if args.list {
        for key in available_params() {
            let value = gwinp.get(key).map_err(FarmError::from)?;
            let marker = if gwinp.line_of(key).is_some() { "" } else { " (default)" };
            println!("{:>10} = {}{}", key, value, marker);
        }
    }
    if assignments.is_empty() {
        return Ok(0);
    }

    let output = args.output.as_ref().unwrap_or(&args.path);
    gwinp
        .write_modified(&assignments, output)
        .map_err(FarmError::from)?;
    println!(
        "patched {} parameter(s) into {}",
        assignments.len(),
        output.display()
    );
    Ok(0)
}
