//! Standalone runner for the background jobs, for deployments that set
//! `SCHEDULER_ENABLED=false` on the API processes.

use clap::{Arg, Command, builder::PossibleValuesParser};
use retreat_backend::{
    config::Config, db::build_pool, init_tracing, providers::Providers, scheduler::Scheduler,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("worker")
        .about("Runs the retreat background jobs")
        .arg(
            Arg::new("job")
                .short('j')
                .long("job")
                .value_name("JOB")
                .help("Which job to run")
                .value_parser(PossibleValuesParser::new(["all", "day-of", "reminders"]))
                .default_value("all"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run the selected job a single time and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config = Config::from_env()?;
    init_tracing(&config);

    let db = build_pool(&config.database())?;
    let scheduler = Scheduler::new(db, Providers::from_config(&config), config.app_base_url());

    let job = matches
        .get_one::<String>("job")
        .map(String::as_str)
        .unwrap_or("all");

    if matches.get_flag("once") {
        if matches!(job, "all" | "day-of") {
            let sent = scheduler.send_day_of_sms().await?;
            tracing::info!(sent, "day-of sms run finished");
        }
        if matches!(job, "all" | "reminders") {
            let sent = scheduler.send_reminders().await?;
            tracing::info!(sent, "reminder run finished");
        }
        return Ok(());
    }

    // 常驻模式：两个任务都按计划运行
    if job != "all" {
        tracing::warn!(job, "--job only applies with --once; starting every job");
    }
    let handles = scheduler.spawn();
    tokio::signal::ctrl_c().await?;
    tracing::info!("worker shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
