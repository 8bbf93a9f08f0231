//! Cardiolens CLI
//!
//! Command-line front end for the cardio backend:
//! - Browse dataset statistics, charts and correlations
//! - Export the dataset as CSV
//! - Run risk predictions, once or live from stdin edits

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use cardiolens::analysis::{correlation_from_description, split_by_outcome, CountTotals, TrendLine};
use cardiolens::client::{ClientError, ClientResult};
use cardiolens::controller::{FormController, FormKind, FormSnapshot, Outcome, Phase};
use cardiolens::dashboard::{export_csv_to_path, DEFAULT_FILE_NAME};
use cardiolens::model::{ChartData, CountRow, Dataset, DatasetStatistics, ParseError, RangeSummary};
use cardiolens::validation::ValidationErrors;
use cardiolens::{AppContext, ChartMetric, CholesterolLevel, Config, Draft, Field, Theme};

#[derive(Parser)]
#[command(name = "cardiolens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cardiovascular risk explorer")]
#[command(long_about = "Cardiolens browses the cardio dataset served by the backend\nand runs cardiovascular risk predictions, once or live as you edit.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend URL (overrides config and CARDIOLENS_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

/// Prediction form fields; omitted fields keep the form defaults
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Age in years
    #[arg(long)]
    pub age: Option<f64>,
    /// Systolic pressure (mmHg)
    #[arg(long)]
    pub ap_hi: Option<f64>,
    /// Diastolic pressure (mmHg)
    #[arg(long)]
    pub ap_lo: Option<f64>,
    /// Cholesterol level (1 normal, 2 above normal, 3 well above normal)
    #[arg(long)]
    pub cholesterol: Option<f64>,
    /// Physically active (1) or not (0)
    #[arg(long)]
    pub active: Option<f64>,
}

impl FieldArgs {
    fn apply(&self, draft: &mut Draft) {
        let values = [
            (Field::Age, self.age),
            (Field::Systolic, self.ap_hi),
            (Field::Diastolic, self.ap_lo),
            (Field::Cholesterol, self.cholesterol),
            (Field::Active, self.active),
        ];
        for (field, value) in values {
            if value.is_some() {
                draft.set(field, value);
            }
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show dataset statistics
    Stats,

    /// List every chart served by the backend
    Charts,

    /// Show one chart
    Chart {
        /// Chart name (age, gender, blood-pressure, blood-pressure-correlation,
        /// bmi-age, cholesterol, glucose, physical-activity, smoking, alcohol,
        /// risk-factors-radar)
        metric: String,
    },

    /// Show the strongest correlations with cardiovascular disease
    Correlation {
        /// Number of features to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Also show the coefficient between two features
        #[arg(long, num_args = 2, value_names = ["A", "B"])]
        between: Option<Vec<String>>,
    },

    /// Browse or export the raw dataset
    Dataset {
        /// Write the dataset as CSV (default file: heart-ia-dataset.csv)
        #[arg(short, long, num_args = 0..=1, default_missing_value = DEFAULT_FILE_NAME)]
        output: Option<PathBuf>,
        /// Rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Load every dashboard section at once
    Overview,

    /// Predict risk from age, blood pressure, cholesterol and activity
    Predict {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Predict risk by sending the raw feature vector
    PredictAdvanced {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Realtime prediction driven by `field=value` lines on stdin
    Watch {
        /// Use the advanced form
        #[arg(long)]
        advanced: bool,
    },

    /// Show or change the light/dark theme preference
    Theme {
        /// New theme (light, dark)
        value: Option<String>,
        /// Flip the current theme
        #[arg(long, conflicts_with = "value")]
        toggle: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_config(output.as_deref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    cardiolens::logging::init(&config.logging)?;

    let ctx = AppContext::new(config)?;
    let json = cli.format == "json";
    let outcome = run(&ctx, cli.command, json).await;
    ctx.shutdown();
    outcome
}

async fn run(ctx: &AppContext, command: Commands, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cardio = ctx.cardio();

    match command {
        Commands::Stats => {
            let stats = or_exit(ctx, cardio.statistics().await);
            if json {
                print_json(&stats)?;
            } else {
                print_statistics(&stats);
            }
        }

        Commands::Charts => {
            let charts = or_exit(ctx, cardio.charts().await);
            if json {
                print_json(&charts)?;
            } else if charts.is_empty() {
                println!("No charts available.");
            } else {
                println!("{:<45} {:<10} {}", "Title", "Type", "Rows");
                println!("{}", "-".repeat(62));
                for chart in &charts {
                    println!("{:<45} {:<10} {}", chart.title, chart.chart_type, chart.data.len());
                }
            }
        }

        Commands::Chart { metric } => {
            let metric: ChartMetric = metric.parse()?;
            if json {
                let chart = or_exit(ctx, cardio.chart(metric).await);
                print_json(&chart)?;
            } else {
                print_chart(ctx, metric).await;
            }
        }

        Commands::Correlation { top, between } => {
            let analysis = or_exit(ctx, cardio.correlation().await);
            if !analysis.is_consistent() {
                tracing::warn!("Correlation matrix does not match the feature list");
            }

            let strongest = analysis.strongest(top);
            if json {
                print_json(&strongest)?;
            } else {
                println!("{:<20} {:>12}", "Feature", "Correlation");
                println!("{}", "-".repeat(33));
                for entry in strongest {
                    println!("{:<20} {:>12.3}", entry.feature, entry.correlation);
                }
            }

            if let Some([a, b]) = between.as_deref() {
                match analysis.coefficient(a, b) {
                    Some(r) if json => print_json(&json!({"a": a, "b": b, "correlation": r}))?,
                    Some(r) => println!("\n{} ~ {}: {:.3}", a, b, r),
                    None => {
                        eprintln!("Unknown feature pair: {} / {}", a, b);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Dataset { output, limit } => {
            let dataset = or_exit(ctx, cardio.dataset().await);
            if dataset.is_empty() {
                println!("No data available.");
                return Ok(());
            }

            match output {
                Some(path) => {
                    let rows = export_csv_to_path(&dataset, &path)?;
                    println!("Exported {} rows to {:?}", rows, path);
                }
                None if json => print_json(&dataset)?,
                None => print_dataset(&dataset, limit),
            }
        }

        Commands::Overview => {
            let overview = ctx.dashboard().load_overview().await;

            if json {
                let charts: serde_json::Map<String, Value> = overview
                    .charts
                    .iter()
                    .map(|(metric, chart)| (metric.slug().to_string(), section(chart)))
                    .collect();
                print_json(&json!({
                    "statistics": section(&overview.statistics),
                    "correlation": section(&overview.correlation),
                    "charts": charts,
                }))?;
            } else {
                match &overview.statistics {
                    Ok(stats) => print_statistics(stats),
                    Err(e) => println!("Statistics: {}", e),
                }
                println!();
                match &overview.correlation {
                    Ok(analysis) => println!("Correlation: {} features", analysis.feature_names.len()),
                    Err(e) => println!("Correlation: {}", e),
                }
                println!();
                println!("Charts:");
                for (metric, chart) in &overview.charts {
                    match chart {
                        Ok(chart) => println!("  {:<28} {} rows", metric.slug(), chart.data.len()),
                        Err(e) => println!("  {:<28} {}", metric.slug(), e),
                    }
                }
            }

            if overview.failures() > 0 {
                std::process::exit(1);
            }
        }

        Commands::Predict { fields } => {
            predict_once(ctx.simplified_form(), &fields, json).await?;
        }

        Commands::PredictAdvanced { fields } => {
            predict_once(ctx.advanced_form(), &fields, json).await?;
        }

        Commands::Watch { advanced } => {
            let window = ctx.config().prediction.debounce_window();
            if advanced {
                watch(ctx.advanced_form(), window, json).await?;
            } else {
                watch(ctx.simplified_form(), window, json).await?;
            }
        }

        Commands::Theme { value, toggle } => {
            let store = ctx.theme();
            let theme = if toggle {
                store.toggle()?
            } else if let Some(value) = value {
                let theme: Theme = value.parse()?;
                store.save(theme)?;
                theme
            } else {
                store.load()?
            };
            println!("{}", theme);
        }

        Commands::Config { output } => write_config(output.as_deref())?,
    }

    Ok(())
}

/// Print a backend failure and exit
fn or_exit<T>(ctx: &AppContext, result: ClientResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, ClientError::Unavailable(_) | ClientError::Timeout) {
                eprintln!();
                eprintln!("Make sure the cardio backend is reachable at {}", ctx.base_url());
            }
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn section<T: Serialize>(result: &ClientResult<T>) -> Value {
    match result {
        Ok(value) => serde_json::to_value(value).unwrap_or(Value::Null),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn write_config(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = cardiolens::config::generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

fn print_statistics(stats: &DatasetStatistics) {
    println!("Total records: {}", stats.total_records);
    let rate = stats
        .positive_rate()
        .map(|r| format!(" ({:.1}%)", r * 100.0))
        .unwrap_or_default();
    println!("With disease:  {}{}", stats.cardio_positive, rate);
    println!("Healthy:       {}", stats.cardio_negative);
    println!();

    println!("{:<12} {:>8} {:>8} {:>8} {:>8}", "", "Min", "Max", "Mean", "Median");
    println!("{}", "-".repeat(48));
    let rows: [(&str, &RangeSummary); 4] = [
        ("Age", &stats.age_range),
        ("BMI", &stats.bmi_range),
        ("Systolic", &stats.blood_pressure_range.systolic),
        ("Diastolic", &stats.blood_pressure_range.diastolic),
    ];
    for (label, r) in rows {
        println!(
            "{:<12} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            label, r.min, r.max, r.mean, r.median
        );
    }
}

fn print_chart_header<T>(chart: &ChartData<T>) {
    println!("{}", chart.title);
    if !chart.description.is_empty() {
        println!("{}", chart.description);
    }
    println!();
}

async fn print_chart(ctx: &AppContext, metric: ChartMetric) {
    let cardio = ctx.cardio();

    if metric.is_count_chart() {
        let chart = or_exit(ctx, cardio.count_chart(metric).await);
        print_chart_header(&chart);
        print_count_rows(&chart.x_label, &chart.data);
        return;
    }

    match metric {
        ChartMetric::BloodPressureCorrelation => {
            let chart = or_exit(ctx, cardio.blood_pressure_correlation().await);
            print_chart_header(&chart);

            let (sick, healthy) = split_by_outcome(&chart.data);
            println!("Points: {} with disease, {} healthy", sick.len(), healthy.len());

            let all: Vec<(f64, f64)> = sick.iter().chain(healthy.iter()).copied().collect();
            match TrendLine::fit(&all) {
                Some(line) => {
                    println!("Trend:  ap_lo = {:.3} * ap_hi + {:.2}", line.slope, line.intercept);
                    if let Some([start, end]) = line.segment(&all) {
                        println!(
                            "        from ({:.0}, {:.1}) to ({:.0}, {:.1})",
                            start.0, start.1, end.0, end.1
                        );
                    }
                }
                None => println!("Trend:  not enough spread to fit a line"),
            }
            if let Some(r) = correlation_from_description(&chart.description) {
                println!("Reported correlation: {:.2}", r);
            }
        }
        ChartMetric::RiskFactorsRadar => {
            let chart = or_exit(ctx, cardio.risk_factors().await);
            print_chart_header(&chart);
            for point in &chart.data {
                println!("{:<30} {:>8.2}", point.factor, point.value);
            }
        }
        _ => {
            let chart = or_exit(ctx, cardio.chart(metric).await);
            print_chart_header(&chart);
            if chart.is_empty() {
                println!("No data.");
            }
            for row in &chart.data {
                let cells: Vec<String> = row
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, display_value(v)))
                    .collect();
                println!("{}", cells.join("  "));
            }
        }
    }
}

fn print_count_rows(x_label: &str, rows: &[CountRow]) {
    if rows.is_empty() {
        println!("No data.");
        return;
    }

    println!("{:<20} {:>12} {:>12}", x_label, "Sick", "Healthy");
    println!("{}", "-".repeat(46));
    for row in rows {
        let category: Vec<String> = row.category.values().map(display_value).collect();
        println!(
            "{:<20} {:>12} {:>12}",
            category.join(", "),
            row.num_sick_people,
            row.num_healthy_people
        );
    }

    let totals = CountTotals::from_rows(rows);
    println!("{}", "-".repeat(46));
    println!("{:<20} {:>12} {:>12}", "Total", totals.sick, totals.healthy);
    if let Some(rate) = totals.sick_rate() {
        println!("Sick share: {:.1}%", rate * 100.0);
    }
}

fn print_dataset(dataset: &Dataset, limit: usize) {
    let columns = dataset.columns();
    let header: Vec<String> = columns.iter().map(|c| format!("{:>8}", c)).collect();
    println!("{}", header.join(" "));
    println!("{}", "-".repeat(columns.len() * 9));

    for record in dataset.data.iter().take(limit) {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| format!("{:>8}", record.get(c).map(display_value).unwrap_or_default()))
            .collect();
        println!("{}", cells.join(" "));
    }

    println!();
    println!(
        "Showing {} of {} records",
        dataset.data.len().min(limit),
        dataset.total_records
    );
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn predict_once<F: FormKind>(
    form: FormController<F>,
    fields: &FieldArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    form.update(|draft| fields.apply(draft));
    form.submit();
    form.settle().await;

    let snap = form.snapshot();
    if !snap.field_errors.is_empty() {
        eprintln!("Invalid input:");
        for line in field_messages(&snap.field_errors) {
            eprintln!("  {}", line);
        }
        std::process::exit(1);
    }
    if let Some(error) = &snap.error {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }

    print_prediction(&snap, json)?;
    Ok(())
}

/// One labelled line per rejected field
fn field_messages(errors: &ValidationErrors) -> Vec<String> {
    Field::ALL
        .iter()
        .filter_map(|f| errors.message_for(*f).map(|m| format!("{}: {}", f.label(), m)))
        .collect()
}

fn describe_input(draft: &Draft) -> String {
    let value = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    let cholesterol = draft
        .cholesterol
        .and_then(|c| CholesterolLevel::try_from(c as u8).ok())
        .map_or_else(|| value(draft.cholesterol), |c| c.label().to_string());
    format!(
        "age {}, {}/{} mmHg, cholesterol {}, active {}",
        value(draft.age),
        value(draft.ap_hi),
        value(draft.ap_lo),
        cholesterol,
        value(draft.active)
    )
}

fn print_prediction(snap: &FormSnapshot, json: bool) -> Result<(), serde_json::Error> {
    let Some(result) = snap.result else {
        println!("No prediction yet.");
        return Ok(());
    };

    if json {
        return print_json(&json!({
            "probability": result.probability,
            "prediction": result.predicted_class,
            "risk_band": result.risk_band(),
            "settled_at": snap.settled_at,
        }));
    }

    println!("{}", result.headline());
    println!("Probability: {}% ({})", result.percentage(), result.risk_band());
    println!("{}", result.advice());
    println!("Input: {}", describe_input(&snap.draft));
    if let Some(at) = snap.settled_at {
        println!("Computed at {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum WatchCommand {
    Set(Field, Option<f64>),
    Submit,
    Realtime(bool),
    Reset,
    Quit,
}

fn parse_command(line: &str) -> Result<WatchCommand, String> {
    let line = line.trim();
    match line {
        "submit" => return Ok(WatchCommand::Submit),
        "realtime" => return Ok(WatchCommand::Realtime(true)),
        "manual" => return Ok(WatchCommand::Realtime(false)),
        "reset" => return Ok(WatchCommand::Reset),
        "quit" | "exit" => return Ok(WatchCommand::Quit),
        _ => {}
    }

    let (name, value) = line
        .split_once('=')
        .ok_or_else(|| format!("Expected field=value, got: {}", line))?;
    let field: Field = name.parse().map_err(|e: ParseError| e.to_string())?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(WatchCommand::Set(field, None));
    }
    let value: f64 = value
        .parse()
        .map_err(|_| format!("Not a number: {}", value))?;
    Ok(WatchCommand::Set(field, Some(value)))
}

fn describe(snap: &FormSnapshot) -> Option<String> {
    match &snap.phase {
        Phase::AwaitingResponse => Some("predicting...".to_string()),
        Phase::Settled(Outcome::Success(r)) => Some(format!(
            "{}% ({}) {}",
            r.percentage(),
            r.risk_band(),
            r.headline()
        )),
        Phase::Settled(Outcome::Failure(message)) => Some(format!("error: {}", message)),
        Phase::Idle if snap.field_errors.is_incomplete_only() => Some("waiting for input".to_string()),
        Phase::Idle if !snap.field_errors.is_empty() => {
            Some(format!("invalid: {}", field_messages(&snap.field_errors).join("; ")))
        }
        Phase::Idle | Phase::Validating => None,
    }
}

/// JSON line for a newly settled result, once per settlement
fn settled_json(snap: &FormSnapshot, last: &mut Option<DateTime<Utc>>) -> Option<Value> {
    let (Phase::Settled(_), Some(r), Some(at)) = (&snap.phase, snap.result, snap.settled_at) else {
        return None;
    };
    if *last == Some(at) {
        return None;
    }
    *last = Some(at);
    Some(json!({
        "probability": r.probability,
        "prediction": r.predicted_class,
        "settled_at": at,
    }))
}

async fn watch<F: FormKind>(
    form: FormController<F>,
    window: Duration,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = form.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        let mut last_settled = None;
        while rx.changed().await.is_ok() {
            let snap = rx.borrow_and_update().clone();
            if json {
                if let Some(value) = settled_json(&snap, &mut last_settled) {
                    println!("{}", value);
                }
                continue;
            }
            let line = describe(&snap);
            if line.is_some() && line != last {
                if let Some(text) = &line {
                    println!("{}", text);
                }
                last = line;
            }
        }
    });

    form.set_realtime(true);
    eprintln!("Realtime mode. Enter field=value (age, ap_hi, ap_lo, cholesterol, active),");
    eprintln!("or one of: submit, manual, realtime, reset, quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(WatchCommand::Quit) => break,
            Ok(WatchCommand::Set(field, value)) => form.set_field(field, value),
            Ok(WatchCommand::Submit) => form.submit(),
            Ok(WatchCommand::Realtime(on)) => form.set_realtime(on),
            Ok(WatchCommand::Reset) => form.reset(),
            Err(e) => eprintln!("{}", e),
        }
    }

    // Let a pending edit fire before leaving
    tokio::time::sleep(window).await;
    form.settle().await;
    tokio::task::yield_now().await;

    form.shutdown();
    printer.abort();
    Ok(())
}
