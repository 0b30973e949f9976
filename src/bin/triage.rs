//! triage CLI: run the server, or drive batches and dedup from the shell.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use triage_rs::config::Config;
use triage_rs::db::Db;
use triage_rs::engine::{BatchCoordinator, ClassifyOperation, DedupService};
use triage_rs::llm::{Classifier, GroupingService, LlmClassifier, LlmGroupingService, anthropic_client};
use triage_rs::model::{BatchRequest, ItemId, ProgressStatus};
use triage_rs::progress::ChannelSink;
use triage_rs::server::{self, AppState};
use triage_rs::store::ItemStore;
use triage_rs::taxonomy::Taxonomy;
use triage_rs::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "triage", about = "Email triage: batch classification and task dedup")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Classify items, printing progress as it happens
    Classify {
        /// Item IDs, processed in the given order
        #[arg(required = true)]
        ids: Vec<String>,
        /// Context applied to every item
        #[arg(long)]
        context: Option<String>,
    },
    /// Find and merge duplicate tasks
    Dedup {
        /// Category to deduplicate
        #[arg(required_unless_present = "all")]
        category: Option<String>,
        /// Deduplicate every category
        #[arg(long, conflicts_with = "category")]
        all: bool,
    },
    /// Item store operations
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List items
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Maximum items to show
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show one item
    Show { id: String },
}

/// Everything the commands need, wired once.
struct Services {
    db: Arc<Db>,
    coordinator: Arc<BatchCoordinator>,
    dedup: Arc<DedupService>,
}

impl Services {
    async fn build(config: &Config) -> anyhow::Result<Self> {
        let db = Db::connect(config.database_url.expose_secret()).await?;
        db.migrate().await?;
        let db = Arc::new(db);
        let store: Arc<dyn ItemStore> = db.clone();

        let taxonomy = Taxonomy::load_or_default(config.taxonomy_path.as_deref())?;
        let client = anthropic_client(&config.anthropic_api_key)
            .map_err(|e| anyhow::anyhow!("failed to create Anthropic client: {e}"))?;
        let classifier: Arc<dyn Classifier> =
            Arc::new(LlmClassifier::new(&client, &config.model, taxonomy));
        let grouping: Arc<dyn GroupingService> =
            Arc::new(LlmGroupingService::new(&client, &config.model));

        let operation = Arc::new(ClassifyOperation::new(Arc::clone(&store), classifier));
        Ok(Self {
            db,
            coordinator: Arc::new(BatchCoordinator::new(operation)),
            dedup: Arc::new(DedupService::new(store, grouping)),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "triage".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let services = Services::build(&config).await?;

    match cli.command {
        Command::Serve => cmd_serve(&config, services).await,
        Command::Classify { ids, context } => cmd_classify(&services, ids, context).await,
        Command::Dedup { category, all } => cmd_dedup(&services, category, all).await,
        Command::Items { action } => match action {
            ItemsAction::List { category, limit } => {
                cmd_items_list(&services.db, category, limit).await
            }
            ItemsAction::Show { id } => cmd_items_show(&services.db, id).await,
        },
    }
}

async fn cmd_serve(config: &Config, services: Services) -> anyhow::Result<()> {
    let state = AppState {
        coordinator: services.coordinator,
        dedup: services.dedup,
    };
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
    };
    server::serve(config.bind_addr, state, shutdown).await?;
    Ok(())
}

async fn cmd_classify(
    services: &Services,
    ids: Vec<String>,
    context: Option<String>,
) -> anyhow::Result<()> {
    let mut request = BatchRequest::new(ids);
    request.context = context;

    let (mut sink, mut rx) = ChannelSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let item = event
                .item_id
                .as_ref()
                .map(|id| format!(" {id}"))
                .unwrap_or_default();
            match event.status {
                ProgressStatus::Error => println!(
                    "[{:>5.1}%] {}/{} error{item}: {}",
                    event.progress_percent,
                    event.current,
                    event.total,
                    event.error.as_deref().unwrap_or("-")
                ),
                status => println!(
                    "[{:>5.1}%] {}/{} {status}{item}",
                    event.progress_percent, event.current, event.total
                ),
            }
        }
    });

    let outcome = services.coordinator.run(&request, &mut sink).await?;
    drop(sink);
    printer.await?;

    println!("{}", serde_json::to_string_pretty(outcome.result())?);
    Ok(())
}

async fn cmd_dedup(services: &Services, category: Option<String>, all: bool) -> anyhow::Result<()> {
    let output = if all {
        serde_json::to_string_pretty(&services.dedup.deduplicate_all().await?)?
    } else {
        let category = category.ok_or_else(|| anyhow::anyhow!("category is required"))?;
        serde_json::to_string_pretty(&services.dedup.deduplicate_category(&category).await?)?
    };
    println!("{output}");
    Ok(())
}

async fn cmd_items_list(db: &Db, category: Option<String>, limit: i64) -> anyhow::Result<()> {
    let items = db.list_items(category.as_deref(), limit).await?;

    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    println!("{:<24}  {:<12}  {:<16}  TITLE", "ID", "CATEGORY", "CREATED");
    println!("{}", "-".repeat(90));
    for item in &items {
        let title: String = item.display_content().chars().take(40).collect();
        println!(
            "{:<24}  {:<12}  {:<16}  {}",
            item.id,
            item.category,
            item.created_at.format("%Y-%m-%d %H:%M"),
            title
        );
    }
    println!("\n{} item(s)", items.len());
    Ok(())
}

async fn cmd_items_show(db: &Db, id: String) -> anyhow::Result<()> {
    let item = db.get(&ItemId::from(id)).await?;

    println!("ID:          {}", item.id);
    println!("Title:       {}", item.title);
    println!("Summary:     {}", item.summary.as_deref().unwrap_or("-"));
    println!("Category:    {}", item.category);
    println!("Linked:      {}", item.linked_record_id.as_deref().unwrap_or("-"));
    println!("Created:     {}", item.created_at);
    println!("---");
    println!("{}", item.description);
    Ok(())
}
