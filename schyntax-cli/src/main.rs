use clap::Parser;
use jiff::civil::DateTime;
use schyntax::Schedule;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schyntax", about = "Evaluate schyntax schedule expressions", version)]
struct Cli {
    /// Schedule expression (e.g., "dow(mon..fri), hour(9), min(0)")
    expression: Option<String>,

    /// Find the latest matching time at or before the reference instead of the next one
    #[arg(short, long)]
    previous: bool,

    /// Reference time (ISO 8601 civil datetime, e.g. 2026-02-06T12:00:00). Defaults to now in UTC.
    #[arg(long)]
    from: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Validate expression without computing
    #[arg(long)]
    check: bool,

    /// Show compiled groups as JSON
    #[arg(long)]
    parse: bool,

    /// Print the canonical form of the expression
    #[arg(long)]
    canonical: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let expression = match cli.expression {
        Some(ref expr) => expr.as_str(),
        None => {
            eprintln!("error: no expression provided");
            process::exit(2);
        }
    };

    let schedule = match Schedule::parse(expression) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };

    if cli.check {
        println!("\u{2713} valid");
        process::exit(0);
    }

    if cli.parse {
        match serde_json::to_string_pretty(&schedule) {
            Ok(json) => {
                println!("{json}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    }

    if cli.canonical {
        println!("{schedule}");
        process::exit(0);
    }

    let reference: DateTime = match cli.from {
        Some(ref from_str) => match from_str.parse() {
            Ok(dt) => dt,
            Err(e) => {
                eprintln!("error: invalid --from datetime: {e}");
                process::exit(1);
            }
        },
        None => jiff::Zoned::now()
            .with_time_zone(jiff::tz::TimeZone::UTC)
            .datetime(),
    };
    tracing::debug!(%reference, previous = cli.previous, "evaluating schedule");

    let (direction, result) = if cli.previous {
        ("previous", schedule.previous_from(reference))
    } else {
        ("next", schedule.next_from(reference))
    };

    let found = match result {
        Ok(dt) => dt,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };

    if cli.json {
        let out = serde_json::json!({
            "expression": schedule.source(),
            "reference": reference.to_string(),
            (direction): found.to_string(),
        });
        println!("{out}");
    } else {
        println!("{found}");
    }
}
