//! my-ora: rewrite MySQL-flavored SQL for Oracle
//!
//! # Usage
//!
//! ```bash
//! # Show the rewritten SQL and bind order
//! my-ora "SELECT * FROM users LIMIT ? OFFSET ?" --bind 10,20
//!
//! # Show every pipeline stage
//! my-ora explain "SELECT CONCAT(first, ' ', last) FROM users"
//!
//! # Hand the result to another tool
//! my-ora "SELECT * FROM users WHERE id = ?" --bind 7 --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use myora::prelude::*;
use myora::rules::{self, FunctionAction, FunctionRule};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "my-ora")]
#[command(version)]
#[command(about = "Rewrite MySQL-flavored SQL into Oracle SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    my-ora 'SELECT IFNULL(name, \"-\") FROM users'
    my-ora 'SELECT * FROM users LIMIT ? OFFSET ?' --bind 10,20
    my-ora explain 'CREATE TABLE t (id INT AUTO_INCREMENT) ENGINE=InnoDB'")]
struct Cli {
    /// The query to rewrite
    query: Option<String>,

    /// Positional arguments, in the order the original query expects them
    #[arg(short, long, value_delimiter = ',')]
    bind: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Config file (defaults to $CONFIG_DIR/my-ora/config.toml)
    #[arg(short, long, env = "MYORA_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the output of every rewrite stage
    Explain {
        /// The query to explain
        query: String,
    },
    /// Show the rewrite rules
    Rules,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ShimConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ShimConfig::discover().context("failed to load config")?,
    };
    init_tracing(&config, cli.verbose);

    match &cli.command {
        Some(Commands::Explain { query }) => explain_query(query),
        Some(Commands::Rules) => show_rules(),
        None => match &cli.query {
            Some(query) => rewrite_query(query, &cli)?,
            None => {
                println!("{}", "my-ora: MySQL-flavored SQL on Oracle".cyan().bold());
                println!();
                println!("Usage: my-ora <QUERY> [OPTIONS]");
                println!();
                println!("Try: my-ora --help");
            }
        },
    }

    Ok(())
}

fn init_tracing(config: &ShimConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match (&config.log_filter, verbose) {
            (Some(filter), _) => filter.as_str(),
            (None, true) => "myora=debug",
            (None, false) => "warn",
        };
        EnvFilter::new(directive)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    sql: &'a str,
    bindings: Vec<Binding<'a>>,
}

fn rewrite_query(query: &str, cli: &Cli) -> Result<()> {
    let args: Vec<Value> = cli.bind.iter().map(|b| parse_binding(b)).collect();
    let raw = raw_with_rewriter(query, args);

    match cli.format {
        OutputFormat::Json => {
            let output = JsonOutput {
                sql: &raw.sql,
                bindings: raw.bindings(),
            };
            let text = serde_json::to_string_pretty(&output).context("failed to encode output")?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            if cli.verbose {
                println!("{} {}", "Input:".dimmed(), query.yellow());
            }
            println!("{}", "Rewritten SQL:".green().bold());
            println!("{}", raw.sql.white());

            if !raw.args.is_empty() {
                println!();
                println!("{}", "Bindings (bind order):".cyan());
                for binding in raw.bindings() {
                    let marker = binding.marker.unwrap_or("(unused)");
                    println!(
                        "  #{} {} = {}",
                        binding.position,
                        marker.dimmed(),
                        binding.value.to_string().yellow()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Number, boolean, `null`, or text.
fn parse_binding(binding: &str) -> Value {
    if let Ok(n) = binding.parse::<i64>() {
        Value::Int(n)
    } else if let Ok(f) = binding.parse::<f64>() {
        Value::Float(f)
    } else {
        match binding {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" | "NULL" => Value::Null,
            _ => Value::from(binding),
        }
    }
}

fn explain_query(query: &str) {
    println!("{}", "my-ora Rewrite Explanation".cyan().bold());
    println!();
    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!();

    let mut previous = query.to_string();
    for (name, sql) in myora::rewrite::explain(query) {
        if sql == previous {
            println!("  {} {}", "·".dimmed(), name.dimmed());
        } else {
            println!("  {} {}", "•".green(), name.cyan());
            println!("      {}", sql.white());
        }
        previous = sql;
    }

    println!();
    match ReorderPlan::analyze(query) {
        Some(plan) => {
            println!("{}", "Argument Reordering:".green().bold());
            for (limit, offset) in plan.swaps() {
                println!(
                    "  swap arguments {} and {}",
                    (limit + 1).to_string().yellow(),
                    (offset + 1).to_string().yellow()
                );
            }
        }
        None => println!("{}", "No argument reordering needed.".dimmed()),
    }

    println!();
    println!("{}", "Rewritten SQL:".green().bold());
    println!("  {}", previous.white());
}

fn show_rules() {
    println!("{}", "my-ora Rewrite Rules".cyan().bold());
    println!();

    println!("{}", "Schema tokens".white().bold());
    println!("{}", "─".repeat(60).dimmed());
    for rule in rules::SCHEMA_TOKENS {
        println!("  {:20} {}", rule.word.yellow(), rule.replacement.white());
    }
    println!();

    print_function_rules("Functions", rules::FUNCTION_RULES);
    print_function_rules("Timestamps", rules::TIMESTAMP_RULES);

    println!("{}", "Table options (removed)".white().bold());
    println!("{}", "─".repeat(60).dimmed());
    for option in rules::TABLE_OPTIONS {
        let mut form = option.keywords.join(" ");
        if option.defaultable {
            form = format!("[DEFAULT] {}", form);
        }
        let eq = if option.requires_eq { " = …" } else { " [=] …" };
        println!("  {}{}", form.yellow(), eq.dimmed());
    }
    println!();

    println!("{}", "Row limiting".white().bold());
    println!("{}", "─".repeat(60).dimmed());
    let clauses = [
        ("LIMIT a OFFSET b", "OFFSET b ROWS FETCH NEXT a ROWS ONLY"),
        ("OFFSET a LIMIT b", "OFFSET a ROWS FETCH NEXT b ROWS ONLY"),
        ("LIMIT a, b", "OFFSET a ROWS FETCH NEXT b ROWS ONLY"),
        ("LIMIT a", "FETCH NEXT a ROWS ONLY"),
    ];
    for (mysql, oracle) in clauses {
        println!("  {:20} {}", mysql.yellow(), oracle.white());
    }
}

fn print_function_rules(title: &str, table: &[FunctionRule]) {
    println!("{}", title.white().bold());
    println!("{}", "─".repeat(60).dimmed());
    for rule in table {
        let (from, to) = match rule.action {
            FunctionAction::Rename(to) => (format!("{}(…)", rule.name), format!("{}(…)", to)),
            FunctionAction::Nullary(to) => (format!("{}()", rule.name), to.to_string()),
            FunctionAction::Infix {
                op, parenthesize, ..
            } => {
                let joined = format!("a{}b", op);
                let to = if parenthesize {
                    format!("({})", joined)
                } else {
                    joined
                };
                (format!("{}(a, b)", rule.name), to)
            }
        };
        println!("  {:20} {}", from.yellow(), to.white());
    }
    println!();
}
