use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tokio::fs;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agent_core::ToolExecutor;
use marketscout_cli::{Orchestrator, SessionRegistry, StatusBus, StatusEvent};
use marketscout_core_types::SessionId;
use marketscout_event_bus::to_mpsc;

use crate::cli::context::CliContext;
use crate::cli::output::{print_value, OutputFormat};

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Message to send
    #[arg(long, short, conflicts_with = "message_file")]
    pub message: Option<String>,

    /// Read the message from a file
    #[arg(long, conflicts_with = "message")]
    pub message_file: Option<PathBuf>,

    /// Session identifier (a fresh one is generated when omitted)
    #[arg(long)]
    pub session: Option<String>,

    /// Override the turn budget for this request
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Hide tool status lines while the request runs
    #[arg(long)]
    pub quiet: bool,
}

pub async fn cmd_chat(args: ChatArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let message = if let Some(message) = args.message.clone() {
        message
    } else if let Some(path) = args.message_file.as_ref() {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read message file: {}", path.display()))?
    } else {
        return Err(anyhow!("Either --message or --message-file must be provided"));
    };

    let mut engine = ctx.config().engine.clone();
    if let Some(turns) = args.max_turns {
        engine = engine.max_turns(turns);
    }
    let tools: Arc<dyn ToolExecutor> = Arc::new(ctx.dispatcher()?);
    let bus = StatusBus::new(ctx.config().status_capacity);
    let orchestrator = Orchestrator::new(
        ctx.llm()?,
        tools,
        engine,
        Arc::new(SessionRegistry::new()),
        bus.clone(),
    );

    let printer =
        (!args.quiet).then(|| spawn_status_printer(bus.clone(), ctx.config().status_capacity));

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping at the next suspension point");
            stop.cancel();
        }
    });

    let session = args
        .session
        .as_deref()
        .map(SessionId::from)
        .unwrap_or_default();
    info!(session = %session, "sending message");
    let reply = orchestrator.handle_message(&session, &message, &cancel).await;

    // Dropping the last bus handles closes the channel; the printer drains
    // what is queued and then exits.
    drop(orchestrator);
    drop(bus);
    if let Some(printer) = printer {
        if let Err(err) = printer.await {
            warn!(error = %err, "status printer stopped early");
        }
    }
    let reply = reply?;
    match output {
        OutputFormat::Human => println!("{}", reply.text),
        other => print_value(other, &reply)?,
    }
    Ok(())
}

/// Prints tool status lines to stderr until the bus closes. Resolves to the
/// number of lines printed.
fn spawn_status_printer(bus: Arc<StatusBus>, capacity: usize) -> JoinHandle<usize> {
    let mut events = to_mpsc(bus, capacity);
    tokio::spawn(async move {
        let mut printed = 0;
        while let Some(event) = events.recv().await {
            if let Some(line) = status_line(&event) {
                eprintln!("{line}");
                printed += 1;
            }
        }
        printed
    })
}

fn status_line(event: &StatusEvent) -> Option<String> {
    let line = match event {
        StatusEvent::ToolCall { name, args, .. } => format!("-> {name} {args}"),
        StatusEvent::ToolProgress {
            name,
            current,
            total,
            target,
            ..
        } => format!("   {name} [{}/{total}] {target}", current + 1),
        StatusEvent::ToolResult {
            name,
            success,
            error,
            ..
        } => match error {
            Some(kind) => format!("<- {name} ({kind})"),
            None if *success => format!("<- {name} ok"),
            None => format!("<- {name} failed"),
        },
        StatusEvent::ResponseComplete { .. } | StatusEvent::ResponseError { .. } => return None,
    };
    Some(line)
}
