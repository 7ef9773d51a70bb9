use video_insights::config::AppConfig;
use video_insights::context::AppContext;
use video_insights::observability::init_tracing;
use video_insights::sql::{extract_sql, repair_numeric_literals, score_complexity, validate_structure};
use video_insights::strategy::GenerationStrategy;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "video-insights")]
#[command(about = "Answer analytics questions about videos with generated SQL")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
struct GenerationArgs {
    /// Prompting strategy (defaults to PIPELINE_STRATEGY or direct)
    #[arg(long, value_enum)]
    strategy: Option<GenerationStrategy>,

    /// Skip the semantic re-validation of complex statements
    #[arg(long)]
    no_semantic_check: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate SQL for a question and execute it
    Ask {
        /// The question in natural language
        question: String,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Generate SQL for a question without executing it
    Sql {
        /// The question in natural language
        question: String,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Execute a read-only SQL statement and print the scalar result
    Exec {
        /// SELECT statement to run
        sql: String,
    },
    /// Run extraction, repair, validation and scoring on model output offline
    Inspect {
        /// Raw model output
        text: String,

        /// Question the output answers (used for the identifier check)
        #[arg(long, default_value = "")]
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    let args = Args::parse();

    match args.command {
        Commands::Ask { question, generation } => run_ask(question, generation, true).await,
        Commands::Sql { question, generation } => run_ask(question, generation, false).await,
        Commands::Exec { sql } => run_exec(sql).await,
        Commands::Inspect { text, question } => {
            inspect(&text, &question);
            Ok(())
        }
    }
}

fn load_context(generation: Option<&GenerationArgs>) -> Result<AppContext> {
    let mut config = AppConfig::from_env()?;
    if let Some(generation) = generation {
        if let Some(strategy) = generation.strategy {
            config.pipeline.strategy = strategy;
        }
        if generation.no_semantic_check {
            config.pipeline.semantic_check = false;
        }
    }
    Ok(AppContext::init(config)?)
}

async fn run_ask(question: String, generation: GenerationArgs, execute: bool) -> Result<()> {
    let context = load_context(Some(&generation))?;

    let outcome = async {
        let generated = context.pipeline().run(&question).await?;
        println!("SQL: {}", generated.sql());
        if execute {
            let executor = context.executor().await?;
            let value = executor.execute_scalar(generated.sql()).await?;
            println!("{}", value);
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    context.shutdown().await;
    outcome
}

async fn run_exec(sql: String) -> Result<()> {
    let context = load_context(None)?;

    let outcome = async {
        let executor = context.executor().await?;
        let value = executor.execute_scalar(&sql).await?;
        println!("{}", value);
        Ok::<_, anyhow::Error>(())
    }
    .await;

    context.shutdown().await;
    outcome
}

fn inspect(text: &str, question: &str) {
    let Some(extracted) = extract_sql(text, question) else {
        println!("No SQL statement found");
        return;
    };
    let repaired = repair_numeric_literals(&extracted);
    let check = validate_structure(&repaired);
    let complexity = score_complexity(&repaired);

    println!("Extracted:  {}", extracted);
    if repaired != extracted {
        println!("Repaired:   {}", repaired);
    }
    println!(
        "Structure:  {}",
        if check.is_valid { "valid".to_string() } else { format!("invalid ({})", check.reason) }
    );
    println!(
        "Complexity: {} (score {}, signals {:?})",
        if complexity.is_complex() { "complex" } else { "simple" },
        complexity.score,
        complexity.signals
    );
}
