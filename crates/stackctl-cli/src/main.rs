mod cli;
mod prompt;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use stackctl_core::{
    AttachRequest, BackupController, Config, LaunchOutcome, RestoreRequest, ScheduleRequest,
    Settlement, TaskKind,
};

use cli::{Cli, Commands};
use prompt::TerminalPrompter;
use render::ConsoleObserver;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // No config or stack needed just to print a template
    if matches!(cli.command, Commands::Config) {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    let stack_id = cli
        .stack
        .clone()
        .or_else(|| config.backup.stack_id.clone())
        .ok_or_else(|| eyre!("no stack selected; pass --stack or set backup.stack_id"))?;
    tracing::info!(stack = %stack_id, api = %config.api.base_url, "using stack");

    let observer = Arc::new(ConsoleObserver::new());
    let mut controller = BackupController::from_config(&config, &stack_id, observer.clone());
    let prompter = TerminalPrompter::new(cli.yes, &stack_id);

    match cli.command {
        Commands::Config => {}
        Commands::Status => {
            controller.refresh().await?;
            render::print_status(&stack_id, &controller.view());
        }
        Commands::Checkpoints => {
            controller.refresh().await?;
            render::print_checkpoints(controller.view().checkpoints());
        }
        Commands::Snapshot => {
            let outcome = controller.launch_snapshot(&prompter).await?;
            follow(&mut controller, &observer, TaskKind::Snapshot, outcome).await?;
        }
        Commands::Restore {
            recovery_point_id,
            attach,
        } => {
            let request = RestoreRequest::new(recovery_point_id, attach);
            let outcome = controller.launch_restore(request, &prompter).await?;
            follow(&mut controller, &observer, TaskKind::Restore, outcome).await?;
            if let Some(prefill) = controller.take_attach_prefill() {
                render::print_attach_hint(&prefill);
            }
        }
        Commands::Attach {
            efs_id,
            pvc,
            sts,
            no_fs_backup,
            download,
        } => {
            controller.begin_attach_session();
            if let Some(path) = download {
                let bytes = controller.download_local_backup(&path).await?;
                println!("Saved local backup to {} ({bytes} bytes)", path.display());
            }
            let request = AttachRequest {
                efs_id,
                pvcs: pvc,
                stss: sts,
                backup_pv_pvc: !no_fs_backup,
            };
            let outcome = controller.launch_attach(request, &prompter).await?;
            follow(&mut controller, &observer, TaskKind::Attach, outcome).await?;
        }
        Commands::Schedule { daily, keep } => {
            controller
                .configure_schedule(&ScheduleRequest::new(daily.as_str(), keep))
                .await?;
            println!("Backup schedule updated: daily at {daily}, keeping {keep} days.");
            if let Some(next) = controller.view().status().and_then(|s| s.next_backup_at) {
                println!("Next backup: {}", render::format_time(&next));
            }
        }
        Commands::Export { output } => {
            let output = output.unwrap_or_else(|| default_export_path(&stack_id));
            let bytes = controller.download_local_backup(&output).await?;
            println!("Saved local backup to {} ({bytes} bytes)", output.display());
        }
    }

    Ok(())
}

/// Waits for the launched task to settle, or for Ctrl-C to stop watching.
async fn follow(
    controller: &mut BackupController,
    observer: &ConsoleObserver,
    kind: TaskKind,
    outcome: LaunchOutcome,
) -> Result<()> {
    if outcome == LaunchOutcome::Cancelled {
        println!("{kind} cancelled; nothing was sent.");
        return Ok(());
    }

    enum Wait {
        Settled(Option<Settlement>),
        Interrupted,
    }

    let wait = tokio::select! {
        settled = controller.next_event() => Wait::Settled(settled),
        _ = tokio::signal::ctrl_c() => Wait::Interrupted,
    };

    match wait {
        Wait::Settled(Some(Settlement::Failed { error, .. })) => {
            Err(eyre!("{kind} failed: {error}"))
        }
        Wait::Settled(_) => {
            if let Some(warning) = controller.sync_warning() {
                render::print_sync_warning(warning);
            }
            Ok(())
        }
        Wait::Interrupted => {
            controller.close_progress(kind);
            observer.stop_spinner();
            println!("Stopped watching the {kind}; the job keeps running on the server.");
            Ok(())
        }
    }
}

fn default_export_path(stack_id: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("{stack_id}-pv-pvc-{stamp}.tar.gz"))
}
