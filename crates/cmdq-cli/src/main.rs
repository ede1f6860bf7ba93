use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use cmdq_core::{
    CommandContext, CommandError, CommandPriority, CommandQueue, CommandStamp, DbCommand,
    DispatchConfig, EnvelopeQueue, Locale, RequesterId, Submission, WorkerGroup,
};

/// Toy table standing in for a real database connection.
type Table = Arc<Mutex<HashMap<String, Character>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Character {
    name: String,
    level: u32,
}

#[derive(Debug)]
struct StoreCharacter {
    table: Table,
    character: Character,
    stamp: CommandStamp,
}

#[async_trait]
impl DbCommand for StoreCharacter {
    fn set_submitted_at(&mut self, at: DateTime<Utc>) {
        self.stamp.set(at);
    }

    fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.stamp.get()
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<serde_json::Value, CommandError> {
        tracing::info!(
            name = %self.character.name,
            priority = %ctx.priority,
            requester = %ctx.requester,
            "storing character"
        );
        let mut table = self.table.lock().await;
        table.insert(self.character.name.clone(), self.character.clone());
        Ok(serde_json::json!({ "stored": self.character.name }))
    }
}

#[derive(Debug)]
struct LoadCharacter {
    table: Table,
    name: String,
    stamp: CommandStamp,
}

#[async_trait]
impl DbCommand for LoadCharacter {
    fn set_submitted_at(&mut self, at: DateTime<Utc>) {
        self.stamp.set(at);
    }

    fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.stamp.get()
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<serde_json::Value, CommandError> {
        tracing::info!(name = %self.name, locale = %ctx.locale, "loading character");
        let table = self.table.lock().await;
        let character = table
            .get(&self.name)
            .ok_or_else(|| CommandError::new(format!("no character named {}", self.name)))?;
        serde_json::to_value(character).map_err(|e| CommandError::new(e.to_string()))
    }
}

fn load_config() -> Result<DispatchConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(DispatchConfig::from_path(path)?),
        None => Ok(DispatchConfig::new(Locale::new("en")?)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = load_config()?;
    let queue = Arc::new(CommandQueue::with_system_clock(&config));
    let table: Table = Arc::new(Mutex::new(HashMap::new()));

    // (A) queue work before any worker runs, so the dispatch order is visible
    for (name, level, priority) in [
        ("bran", 3, CommandPriority::BACKGROUND),
        ("ayla", 12, CommandPriority::LOW),
        ("cole", 7, CommandPriority::HIGH),
    ] {
        let command_id = queue
            .enqueue(
                StoreCharacter {
                    table: table.clone(),
                    character: Character {
                        name: name.to_string(),
                        level,
                    },
                    stamp: CommandStamp::default(),
                },
                priority,
            )
            .await?;
        println!("enqueued store {name}: {command_id} ({priority})");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    // (B) a lookup whose result we wait for; it runs after every store ahead of it
    let submitted = queue
        .submit(
            LoadCharacter {
                table: table.clone(),
                name: "ayla".to_string(),
                stamp: CommandStamp::default(),
            },
            Submission::new()
                .priority(CommandPriority::BACKGROUND)
                .requester(RequesterId::new("demo"))
                .locale(config.default_locale.clone())
                .await_result(),
        )
        .await?;

    let missing = queue
        .enqueue_and_await_result(
            LoadCharacter {
                table: table.clone(),
                name: "dorn".to_string(),
                stamp: CommandStamp::default(),
            },
            CommandPriority::BACKGROUND,
        )
        .await?;

    // (C) start workers
    let workers = WorkerGroup::spawn(config.workers, queue.clone(), queue.clock());

    if let Some(handle) = submitted.handle {
        let outcome = handle.wait().await;
        println!("load ayla -> {:?}: {:?}", outcome.kind, outcome.value);
    }
    let outcome = missing.wait().await;
    println!("load dorn -> {:?}: {:?}", outcome.kind, outcome.reason);

    // (D) let anything left finish, then report
    workers.drain_and_join().await;
    println!("counts: {:?}", queue.counts().await);
    Ok(())
}
