// ===================================================================
// FILE: main.rs
//
// DESC: Driver for the tail recursion elimination pass. Runs the pass
//       over the sample corpus, shows the IR before and after, and
//       executes both versions in the interpreter.
// ===================================================================

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use serde_json::{Value, json};
use tre_host_abi::RuntimeValue;
use tre_ir::{Program, verify_function};
use tre_opt::{EliminationStats, PassOptions, TailRecursionElimination};
use tre_programs::{DEFAULT_MAX_DEPTH, Run, Sample};
use tre_vm::VMError;

#[derive(Parser)]
#[command(
    name = "trec",
    version = "0.1.0",
    about = "Eliminates tail recursion in the bundled sample programs"
)]
struct Cli {
    /// Samples to process (all of them if omitted)
    samples: Vec<String>,

    /// Don't introduce accumulators for near-tail calls
    #[arg(long)]
    no_accumulate: bool,

    /// Don't follow a jump from the call's block to a returning block
    #[arg(long)]
    no_cross_jumps: bool,

    /// Print the pass's decisions to stderr
    #[arg(long)]
    trace: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Call depth at which the interpreter reports a stack overflow
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// List the available samples and exit
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn options(&self) -> PassOptions {
        PassOptions {
            accumulate: !self.no_accumulate,
            cross_jumps: !self.no_cross_jumps,
        }
    }
}

/// One sample, transformed and run both ways
struct Report {
    sample: Sample,
    optimized: Program,
    stats: EliminationStats,
    before: Run,
    after: Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if cli.list {
        for sample in tre_programs::corpus() {
            println!("{:<14} {}", sample.name.bold(), sample.description);
        }
        return Ok(());
    }

    let pass = TailRecursionElimination::new(cli.options());
    let mut reports = Vec::new();
    for sample in select_samples(&cli.samples)? {
        let report = process(&pass, sample, cli.max_depth)?;
        if !cli.json {
            print_report(&report);
        }
        reports.push(report);
    }

    if cli.json {
        let options = cli.options();
        let document = json!({
            "options": {
                "accumulate": options.accumulate,
                "cross_jumps": options.cross_jumps,
            },
            "max_depth": cli.max_depth,
            "samples": reports.iter().map(report_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    }

    Ok(())
}

fn select_samples(names: &[String]) -> Result<Vec<Sample>, Box<dyn Error>> {
    if names.is_empty() {
        return Ok(tre_programs::corpus());
    }
    names
        .iter()
        .map(|name| {
            tre_programs::sample(name)
                .ok_or_else(|| format!("unknown sample '{}' (see --list)", name).into())
        })
        .collect()
}

fn process(pass: &TailRecursionElimination, sample: Sample, max_depth: usize) -> Result<Report, Box<dyn Error>> {
    let mut optimized = sample.program.clone();
    let func = optimized
        .function_mut(sample.name)
        .ok_or_else(|| format!("sample '{}' has no function of that name", sample.name))?;
    let stats = pass.run_on_function_with_stats(func);
    verify_function(func)?;

    let before = tre_programs::run_with_depth(&sample.program, sample.name, &sample.inputs, max_depth);
    let after = tre_programs::run_with_depth(&optimized, sample.name, &sample.inputs, max_depth);
    Ok(Report {
        sample,
        optimized,
        stats,
        before,
        after,
    })
}

fn describe(result: &Result<RuntimeValue, VMError>) -> String {
    match result {
        Ok(RuntimeValue::I32(v)) => v.to_string(),
        Ok(RuntimeValue::I64(v)) => v.to_string(),
        Ok(RuntimeValue::Ptr(p)) => format!("0x{:x}", p),
        Ok(RuntimeValue::Void) => "void".to_string(),
        Err(err) => format!("error: {}", err),
    }
}

fn print_run(label: &str, run: &Run) {
    let result = describe(&run.result);
    let result = if run.result.is_ok() {
        result.normal()
    } else {
        result.red()
    };
    println!("{} {} (call depth {})", label.bold(), result, run.peak_depth);
    if !run.output.is_empty() {
        println!("  output: {:?}", run.output);
    }
}

fn print_report(report: &Report) {
    let stats = &report.stats;
    println!("{} {}", "==>".cyan().bold(), report.sample.name.bold());
    println!("{}", report.sample.description.dimmed());

    println!("{}", "--- before ---".yellow());
    println!("{}", report.sample.program);

    if stats.changed() {
        let accumulator = stats
            .accumulator
            .map(|op| format!(", accumulating with {}", op))
            .unwrap_or_default();
        let heading = format!(
            "--- after: {} call(s) eliminated{} ---",
            stats.eliminated, accumulator
        );
        println!("{}", heading.green());
        println!("{}", report.optimized);
    } else {
        println!("{}", "--- unchanged ---".dimmed());
    }

    print_run("before:", &report.before);
    print_run("after: ", &report.after);

    let agrees = report.before.result == report.after.result && report.before.output == report.after.output;
    if report.before.result.is_ok() && !agrees {
        println!("{}", "results differ!".red().bold());
    }
    println!();
}

fn run_json(run: &Run) -> Value {
    json!({
        "ok": run.result.is_ok(),
        "result": describe(&run.result),
        "output": run.output,
        "peak_depth": run.peak_depth,
    })
}

fn report_json(report: &Report) -> Value {
    let stats = &report.stats;
    json!({
        "name": report.sample.name,
        "changed": stats.changed(),
        "eliminated": stats.eliminated,
        "accumulator": stats.accumulator.map(|op| op.mnemonic()),
        "before": run_json(&report.before),
        "after": run_json(&report.after),
        "ir": stats.changed().then(|| report.optimized.to_string()),
    })
}
