use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use java_rewriter::ast::NodeVariant;
use java_rewriter::config::{
    apply_transforms, check_expectations, load_from_path, project_builder, ApplicationError,
    TransformResult,
};
use java_rewriter::oracle::{run_once, InterpreterOracle};
use java_rewriter::printer::{print, print_method_header};
use java_rewriter::query::{NamedElementFilter, TypeFilter};
use java_rewriter::sg::{PatternMatch, PatternMatcher};
use java_rewriter::{Project, WriteOutcome};
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "java-rewriter")]
#[command(about = "Parse, transform and pretty-print Java sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a transformation script
    Apply {
        /// Path to the TOML transformation script
        #[arg(short, long)]
        config: PathBuf,

        /// Dry run - show what would change without writing output
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of printed units
        #[arg(short, long)]
        diff: bool,

        /// Skip the script's [[expect]] checks
        #[arg(long)]
        no_verify: bool,
    },

    /// Pretty-print sources, to a directory or to stdout
    Print {
        /// Java files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source classpath directories (indexed, never printed)
        #[arg(long)]
        classpath: Vec<PathBuf>,

        /// Do not cross-check printed text against the tree-sitter grammar
        #[arg(long)]
        no_validate: bool,
    },

    /// List elements of one kind
    Query {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Node variant, e.g. Method, Field, Binary
        #[arg(short, long)]
        kind: String,

        /// Only elements with this simple name
        #[arg(long)]
        name: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print a class standalone and invoke a no-arg method on it
    Run {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Simple or qualified class name
        #[arg(short, long)]
        class: String,

        /// Method to invoke
        #[arg(short, long)]
        method: String,

        #[arg(long)]
        classpath: Vec<PathBuf>,
    },

    /// Structural search with an ast-grep pattern
    Search {
        file: PathBuf,

        /// Pattern such as '$A + $B' or 'System.out.println($MSG)'
        #[arg(short, long, required_unless_present = "kind")]
        pattern: Option<String>,

        /// Only search inside methods with this name
        #[arg(long)]
        method: Option<String>,

        /// List tree-sitter nodes of this kind instead, e.g. catch_clause
        #[arg(short, long, conflicts_with = "method")]
        kind: Option<String>,

        /// With --kind: keep nodes whose FIELD contains a --pattern match
        #[arg(long, requires_all = ["kind", "pattern"])]
        field: Option<String>,

        /// Fail unless the pattern matches exactly once
        #[arg(long, conflicts_with_all = ["kind", "method"])]
        unique: bool,

        /// Print nothing; exit 1 when there is no match
        #[arg(short, long, conflicts_with = "unique")]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            config,
            dry_run,
            diff,
            no_verify,
        } => cmd_apply(&config, dry_run, diff, no_verify),

        Commands::Print {
            inputs,
            output,
            classpath,
            no_validate,
        } => cmd_print(&inputs, output, &classpath, !no_validate),

        Commands::Query {
            inputs,
            kind,
            name,
            json,
        } => cmd_query(&inputs, &kind, name.as_deref(), json),

        Commands::Run {
            inputs,
            class,
            method,
            classpath,
        } => cmd_run(&inputs, &classpath, &class, &method),

        Commands::Search {
            file,
            pattern,
            method,
            kind,
            field,
            unique,
            quiet,
        } => cmd_search(
            &file,
            &SearchQuery {
                pattern: pattern.as_deref(),
                method: method.as_deref(),
                kind: kind.as_deref(),
                field: field.as_deref(),
                unique,
            },
            quiet,
        ),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "java_rewriter=debug",
        _ => "java_rewriter=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_project(
    inputs: &[PathBuf],
    classpath: &[PathBuf],
    output: Option<&Path>,
    validate: bool,
) -> Result<Project> {
    let mut builder = Project::builder().validate_output(validate);
    if let Some(output) = output {
        builder = builder.output_dir(output);
    }
    for input in inputs {
        builder = builder.input(input);
    }
    for dir in classpath {
        builder = builder.source_classpath(dir);
    }
    builder.build().context("failed to load sources")
}

/// Helper: Show unified diff between original and transformed text
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (transformed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{sign}");
    }
}

fn report_outcome(outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Written { path, bytes } => {
            println!("{} wrote {} ({bytes} bytes)", "✓".green(), path.display())
        }
        WriteOutcome::Unchanged { path } => {
            println!("{} unchanged {}", "⊙".yellow(), path.display())
        }
    }
}

fn cmd_apply(config: &Path, dry_run: bool, show_diff: bool, no_verify: bool) -> Result<()> {
    let script = load_from_path(config)?;
    let base_dir = config.parent().unwrap_or(Path::new("."));
    let mut project = project_builder(&script, base_dir)
        .build()
        .with_context(|| format!("failed to load inputs of {}", config.display()))?;

    if !script.meta.name.is_empty() {
        println!("Script: {}", script.meta.name);
    }
    println!(
        "Loaded {} input unit(s) from {}",
        project.input_units().count(),
        config.display()
    );
    if dry_run {
        println!("{}", "  [DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let before: HashMap<PathBuf, String> = if show_diff {
        project
            .printed_units()
            .into_iter()
            .map(|unit| (unit.relative_path, unit.text))
            .collect()
    } else {
        HashMap::new()
    };

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_partial = 0;
    let mut total_failed = 0;

    for (transform_id, result) in apply_transforms(&script, &mut project) {
        match result {
            Ok(TransformResult::Applied { changes }) => {
                println!("{} {transform_id}: {changes} change(s)", "✓".green());
                total_applied += 1;
            }
            Ok(TransformResult::AlreadyApplied) => {
                println!("{} {transform_id}: Already applied", "⊙".yellow());
                total_already_applied += 1;
            }
            Ok(TransformResult::Partial { changes, skipped }) => {
                println!(
                    "{} {transform_id}: {changes} change(s), {} skipped",
                    "⊘".cyan(),
                    skipped.len()
                );
                for skip in &skipped {
                    let name = skip.name.as_deref().unwrap_or("<unnamed>");
                    println!("  - {} {name}: {}", skip.variant, skip.reason.dimmed());
                }
                total_partial += 1;
            }
            Err(e) => {
                eprintln!("{} {transform_id}: Error - {e}", "✗".red());
                if let ApplicationError::Query(query) = &e {
                    eprintln!("  {}", "CONFLICT: target not found".red());
                    eprintln!("  {query}");
                }
                total_failed += 1;
            }
        }
    }

    if show_diff {
        for unit in project.printed_units() {
            let original = before.get(&unit.relative_path).map_or("", String::as_str);
            if original != unit.text {
                display_diff(&unit.relative_path, original, &unit.text);
            }
        }
    }

    if !dry_run {
        if project.output_dir().is_some() {
            println!();
            for outcome in project.pretty_print()? {
                report_outcome(&outcome);
            }
        } else {
            println!(
                "{}",
                "No output_dir in [meta]; printed units were not written".yellow()
            );
        }
    }

    let mut expectations_failed = 0;
    if !no_verify && !script.expect.is_empty() {
        println!();
        println!("{}", "Expectations:".bold());
        for outcome in check_expectations(&script, &project, &InterpreterOracle) {
            match &outcome.failure {
                None => println!("{} {}.{}()", "✓".green(), outcome.class, outcome.method),
                Some(reason) => {
                    eprintln!(
                        "{} {}.{}(): {reason}",
                        "✗".red(),
                        outcome.class,
                        outcome.method
                    );
                    expectations_failed += 1;
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{total_applied}").green());
    println!(
        "  {} already applied",
        format!("{total_already_applied}").yellow()
    );
    println!("  {} partial", format!("{total_partial}").cyan());
    println!("  {} failed", format!("{total_failed}").red());
    if !no_verify && !script.expect.is_empty() {
        println!(
            "  {} expectation(s) failed",
            format!("{expectations_failed}").red()
        );
    }

    if total_failed > 0 || expectations_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_print(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    classpath: &[PathBuf],
    validate: bool,
) -> Result<()> {
    let project = build_project(inputs, classpath, output.as_deref(), validate)?;

    if output.is_none() {
        for unit in project.printed_units() {
            if validate {
                java_rewriter::check_java(&unit.text)
                    .with_context(|| format!("printed {} is not valid Java", unit.unit))?;
            }
            print!("{}", unit.text);
        }
        return Ok(());
    }

    for outcome in project.pretty_print()? {
        report_outcome(&outcome);
    }
    Ok(())
}

fn cmd_query(inputs: &[PathBuf], kind: &str, name: Option<&str>, json: bool) -> Result<()> {
    let variant = NodeVariant::from_name(kind).with_context(|| {
        let known: Vec<&str> = NodeVariant::ALL.iter().map(|v| v.name()).collect();
        format!("unknown node kind '{kind}' (expected one of: {})", known.join(", "))
    })?;
    let project = build_project(inputs, &[], None, false)?;
    let ast = project.ast();

    let mut rows = Vec::new();
    for unit in project.input_units() {
        let found: Vec<_> = match name {
            Some(name) => ast
                .elements(unit.root, NamedElementFilter::new(variant, name))
                .collect(),
            None => ast.elements(unit.root, TypeFilter(variant)).collect(),
        };
        for node in found {
            let text = match variant {
                NodeVariant::Method => print_method_header(ast, node),
                _ => print(ast, node),
            };
            let summary = text.lines().next().unwrap_or_default().trim().to_string();
            rows.push((
                ast.position(node).to_string(),
                ast.simple_name(node).map(str::to_string),
                ast.qualified_name(node),
                summary,
            ));
        }
    }

    if json {
        let items: Vec<serde_json::Value> = rows
            .iter()
            .map(|(position, name, qualified, text)| {
                serde_json::json!({
                    "kind": variant.name(),
                    "position": position,
                    "name": name,
                    "qualified_name": qualified,
                    "text": text,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (position, _, _, text) in &rows {
            println!("{} {}", position.dimmed(), text);
        }
        println!("{} {} element(s)", rows.len(), variant);
    }
    Ok(())
}

fn cmd_run(inputs: &[PathBuf], classpath: &[PathBuf], class: &str, method: &str) -> Result<()> {
    let project = build_project(inputs, classpath, None, false)?;
    let ty = project.get_type(class)?;
    let qualified = project
        .ast()
        .qualified_name(ty)
        .unwrap_or_else(|| class.to_string());
    let source = project.standalone_source(ty);

    let (value, output) = run_once(&InterpreterOracle, &qualified, &source, method)
        .with_context(|| format!("{qualified}.{method}() failed"))?;
    print!("{output}");
    println!("{} {value}", "=>".green());
    Ok(())
}

struct SearchQuery<'a> {
    pattern: Option<&'a str>,
    method: Option<&'a str>,
    kind: Option<&'a str>,
    field: Option<&'a str>,
    unique: bool,
}

impl SearchQuery<'_> {
    fn run(&self, matcher: &PatternMatcher) -> Result<Vec<PatternMatch>> {
        if let Some(kind) = self.kind {
            if self.pattern.is_some() && self.field.is_none() {
                bail!("--pattern with --kind needs --field");
            }
            return Ok(matcher.find_by_kind_with_field(kind, self.field.zip(self.pattern))?);
        }
        let Some(pattern) = self.pattern else {
            bail!("--pattern is required without --kind");
        };
        if self.unique {
            return Ok(vec![matcher.find_unique(pattern)?]);
        }
        Ok(match self.method {
            Some(method) => matcher.find_in_method(pattern, method)?,
            None => matcher.find_all(pattern)?,
        })
    }

    /// Pattern searches over the whole file stop at the first match.
    fn any(&self, matcher: &PatternMatcher) -> Result<bool> {
        match (self.pattern, self.kind, self.method) {
            (Some(pattern), None, None) => Ok(matcher.has_match(pattern)?),
            _ => Ok(!self.run(matcher)?.is_empty()),
        }
    }
}

fn cmd_search(file: &Path, query: &SearchQuery<'_>, quiet: bool) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let matcher = PatternMatcher::new(&source);

    if quiet {
        if !query.any(&matcher)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let matches = query.run(&matcher)?;
    for m in &matches {
        println!("{}:{}: {}", file.display(), m.line, m.text);
        let mut captures: Vec<_> = m.captures.iter().collect();
        captures.sort();
        for (name, text) in captures {
            match m.find_capture_span(name) {
                Some((start, end)) => {
                    println!("  {} = {} [{start}..{end}]", format!("${name}").cyan(), text)
                }
                None => println!("  {} = {}", format!("${name}").cyan(), text),
            }
        }
    }
    println!("{} match(es)", matches.len());
    Ok(())
}
