use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use prompteval_core::{
    BatchResult, BooleanMatch, CsvMatch, EvalError, EvaluationMethodFields, ExactMatch, ExactValue,
    ExecutionMode, Message, ModelSettings, RangeMatch, TrialParams, ValueType,
    DEFAULT_EVALUATOR_PROMPT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_NUM_RUNS, MAX_NUM_RUNS,
};
use prompteval_llm::{BackendConfig, OpenAiBackend};
use prompteval_pipeline::{BatchRunner, BatchSummary};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prompteval")]
#[command(about = "Generate with one model, judge with another, repeat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of generate-then-evaluate trials
    Run(RunArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExactType {
    Number,
    Boolean,
    #[value(name = "string")]
    Text,
}

impl From<ExactType> for ValueType {
    fn from(t: ExactType) -> Self {
        match t {
            ExactType::Number => ValueType::Number,
            ExactType::Boolean => ValueType::Boolean,
            ExactType::Text => ValueType::String,
        }
    }
}

fn parse_temperature(s: &str) -> std::result::Result<f32, String> {
    let t: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !(0.0..=1.0).contains(&t) {
        return Err("temperature must be between 0 and 1".to_string());
    }
    Ok(t)
}

#[derive(Args, Debug)]
struct RunArgs {
    /// System prompt for the generation model
    #[arg(short, long)]
    prompt: String,

    /// System prompt for the judge model
    #[arg(long, default_value = DEFAULT_EVALUATOR_PROMPT)]
    evaluator_prompt: String,

    /// Prior conversation as a JSON array of {role, content}
    #[arg(long)]
    messages: Option<String>,

    /// Generation model
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Judge model
    #[arg(long, default_value = DEFAULT_MODEL)]
    evaluation_model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    evaluation_max_tokens: u32,

    #[arg(short, long, default_value = "0.0", value_parser = parse_temperature)]
    temperature: f32,

    #[arg(long, default_value = "0.0", value_parser = parse_temperature)]
    evaluation_temperature: f32,

    /// Number of trials (values below 1 run once, at most 100)
    #[arg(short, long, default_value_t = DEFAULT_NUM_RUNS)]
    runs: u32,

    /// Run all trials concurrently instead of one after another
    #[arg(long)]
    parallel: bool,

    /// Judge output must equal this text
    #[arg(long)]
    exact_match: Option<String>,

    #[arg(long, value_enum, default_value = "string")]
    exact_match_type: ExactType,

    #[arg(long)]
    range_min: Option<f64>,

    #[arg(long)]
    range_max: Option<f64>,

    /// Comma-separated values that must all appear in the judge output
    #[arg(long)]
    csv_match: Option<String>,

    #[arg(long)]
    csv_case_sensitive: bool,

    /// Judge output must equal this text, ignoring case
    #[arg(long)]
    boolean_match: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// HTTP timeout for each model call
    #[arg(long, env = "LLM_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,
}

impl RunArgs {
    fn evaluation_fields(&self) -> EvaluationMethodFields {
        let range = match (self.range_min, self.range_max) {
            (None, None) => None,
            (min, max) => Some(RangeMatch {
                min: min.unwrap_or(0.0),
                max: max.unwrap_or(0.0),
            }),
        };

        EvaluationMethodFields {
            exact_match: self.exact_match.clone().map(|value| ExactMatch {
                value: ExactValue::Text(value),
                value_type: self.exact_match_type.into(),
            }),
            range,
            csv_match: self.csv_match.as_ref().map(|values| CsvMatch {
                expected_values: values.split(',').map(|v| v.trim().to_string()).collect(),
                case_sensitive: self.csv_case_sensitive,
            }),
            boolean_match: self.boolean_match.clone().map(|expected_value| BooleanMatch {
                expected_value,
            }),
        }
    }

    fn trial_params(&self) -> std::result::Result<TrialParams, EvalError> {
        if self.prompt.trim().is_empty() {
            return Err(EvalError::Config("Please provide a prompt.".into()));
        }

        let messages: Vec<Message> = match &self.messages {
            Some(raw) => serde_json::from_str(raw)?,
            None => Vec::new(),
        };

        Ok(TrialParams::new(&self.prompt, &self.evaluator_prompt)
            .with_generation(ModelSettings {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            })
            .with_evaluation(ModelSettings {
                model: self.evaluation_model.clone(),
                max_tokens: self.evaluation_max_tokens,
                temperature: self.evaluation_temperature,
            })
            .with_messages(messages)
            .with_evaluation_method(self.evaluation_fields().resolve()))
    }

    fn num_runs(&self) -> std::result::Result<u32, EvalError> {
        if self.runs > MAX_NUM_RUNS {
            return Err(EvalError::Config(format!("--runs must be at most {MAX_NUM_RUNS}")));
        }
        Ok(self.runs.max(1))
    }

    fn backend_config(&self) -> std::result::Result<BackendConfig, EvalError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EvalError::Config("Please provide an API key (--api-key or OPENAI_API_KEY)".into())
            })?;

        Ok(BackendConfig::new(api_key)
            .with_api_base(self.api_base.clone())
            .with_timeout_secs(self.timeout_secs))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await?,
    }

    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    // Everything is validated before the first model call.
    let backend = OpenAiBackend::new(&args.backend_config()?)?;
    let params = args.trial_params()?;
    let num_runs = args.num_runs()?;
    let mode = ExecutionMode::from_parallel_flag(args.parallel);

    if args.output == OutputFormat::Table {
        println!();
        println!("Running evaluation...");
        println!("  Model:       {}", params.generation.model);
        println!("  Judge:       {}", params.evaluation.model);
        println!("  Runs:        {} ({:?})", num_runs, mode);
        println!();
    }

    let runner = BatchRunner::new(Arc::new(backend));
    let batch = runner.run_batch(params, num_runs, mode).await;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batch)?),
        OutputFormat::Table => print_table(&batch),
    }

    if let BatchResult::Error { error } = batch {
        bail!(error);
    }

    Ok(())
}

fn print_table(batch: &BatchResult) {
    let BatchResult::Results { results } = batch else {
        return;
    };

    for (i, result) in results.iter().enumerate() {
        println!("Run {}", i + 1);
        println!("{:-<40}", "");
        println!("  Generated:   {}", result.generated_text);
        println!("  Evaluation:  {}", result.evaluation_text);
        println!("  Score:       {}", result.score);
        println!(
            "  Meets expectation: {}",
            if result.meet_expectation { "Yes" } else { "No" }
        );
        println!();
    }

    let summary = BatchSummary::from_results(results);
    println!("Summary:");
    println!("{:-<40}", "");
    println!("  Passed:      {}/{}", summary.passed, summary.runs);
    println!("  Pass rate:   {:.0}%", summary.pass_rate * 100.0);
    println!("  Avg score:   {:.2}", summary.average_score);
    println!();
}
