//! `hydra chat`: Ask the support agent, once or interactively.

use std::sync::Arc;

use hydra_agent::SupportAgent;
use hydra_config::AppConfig;
use hydra_core::catalog::{OrderStore, ProductCatalog, ProfileStore};
use hydra_core::event::EventBus;
use hydra_core::provider::Provider;
use hydra_core::response::StructuredResponse;
use hydra_core::store::{ConversationId, ConversationStore};
use hydra_core::tool::CallerContext;
use hydra_store::{InMemoryStore, SqliteStore, StaticKnowledge, seed_demo_data};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    user_id: Option<String>,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    HYDRA_API_KEY  = 'sk-...'");
        eprintln!("    OPENAI_API_KEY = 'sk-...'");
        eprintln!("    OPENROUTER_API_KEY = 'sk-or-v1-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = hydra_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let caller = match user_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => CallerContext::authenticated(id),
        None => CallerContext::anonymous(),
    };

    match config.store.backend.as_str() {
        "memory" => {
            let store = Arc::new(InMemoryStore::new());
            seed_demo_data(store.as_ref(), false).await?;
            session(&config, provider, store, caller, message, conversation).await
        }
        "sqlite" => {
            let store = Arc::new(SqliteStore::open(&config.store.database_path()).await?);
            session(&config, provider, store, caller, message, conversation).await
        }
        other => Err(format!("Unknown store backend `{other}`").into()),
    }
}

async fn session<S>(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    store: Arc<S>,
    caller: CallerContext,
    message: Option<String>,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: ConversationStore + ProductCatalog + OrderStore + ProfileStore + 'static,
{
    let event_bus = Arc::new(EventBus::default());
    let agent = SupportAgent::from_config(config, provider, store.clone(), Arc::new(StaticKnowledge), event_bus);

    let conversation_id = match conversation {
        Some(id) => {
            let id = ConversationId::from(id.as_str());
            if !store.conversation_exists(&id).await? {
                return Err(format!("Conversation {id} not found").into());
            }
            id
        }
        None => store.create_conversation(caller.user_id()).await?,
    };

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let result = agent.process(&conversation_id, msg.trim(), &caller).await;
        eprint!("\r              \r");
        return match result {
            Ok(outcome) => {
                println!("{}", render(&outcome.response));
                Ok(())
            }
            Err(e) => {
                tracing::debug!(class = e.class().as_str(), "Run failed: {e}");
                Err(e.user_message().into())
            }
        };
    }

    println!();
    println!("  Hydra Support: Interactive Mode");
    println!();
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", agent.model());
    println!("  Store:         {}", store.name());
    println!("  Conversation:  {conversation_id}");
    match caller.user_id() {
        Some(user) => println!("  Signed in as:  {user}"),
        None => println!("  Signed in as:  (anonymous)"),
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }
        if text.is_empty() {
            prompt()?;
            continue;
        }

        eprint!("  ...");
        match agent.process(&conversation_id, text, &caller).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for line in render(&outcome.response).lines() {
                    println!("  Hydra > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                tracing::debug!(class = e.class().as_str(), "Run failed: {e}");
                eprintln!("  [Error] {}", e.user_message());
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}

/// Plain-text rendering of a response for the terminal.
pub fn render(response: &StructuredResponse) -> String {
    match response {
        StructuredResponse::Answer { response, embeddings } => {
            let mut out = response.clone();
            for e in embeddings {
                out.push_str(&format!("\n  [{}] {}", e.kind, e.id));
            }
            out
        }
        StructuredResponse::Ambiguity {
            response,
            id_array,
            resource_type,
        } => {
            let mut out = response.clone();
            for (i, id) in id_array.iter().enumerate() {
                out.push_str(&format!("\n  {}. {resource_type} {id}", i + 1));
            }
            out
        }
    }
}
