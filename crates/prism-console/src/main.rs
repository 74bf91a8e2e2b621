use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use prism_bedrock::prompt::DEFAULT_SYSTEM_PROMPT;
use prism_bedrock::{BedrockChatClient, BedrockImageClient};
use prism_chat::{Conversation, SessionPersistence};
use prism_console::aws::build_aws_config;
use prism_console::config::{config_info, config_path, load_or_init};
use prism_console::repl;
use prism_console::storage::open_store;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let path = config_path()?;
    let config = load_or_init(&path)?;
    let sdk_config = build_aws_config(&config.region, &config.credentials).await;
    let store = open_store(&config, &sdk_config)?;

    let persistence = SessionPersistence::new(store)
        .with_delay(Duration::from_millis(config.save_debounce_ms))
        .with_title_max_chars(config.title_max_chars);

    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let chat = BedrockChatClient::new(&sdk_config, &config.chat_model_id, system_prompt);
    let images = BedrockImageClient::new(&sdk_config, &config.image_model_id);

    let conversation = Conversation::new(
        config.user_key.clone(),
        Arc::new(chat),
        Arc::new(images),
        persistence,
    );
    if conversation.resume().await {
        info!(session_id = %conversation.store().session_id(), "resumed session");
    }

    repl::run(&conversation, &config_info(&path, &config)).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("PRISM_LOG_JSON").is_ok_and(|v| v == "1") {
        builder.json().init();
    } else {
        builder.init();
    }
}
