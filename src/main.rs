use clap::Parser;
use court_pay::core::cancellation::request_cancellation;
use court_pay::core::confirmation::{record_gateway_failure, GatewayFailure};
use court_pay::core::ConfigProvider;
use court_pay::domain::model::{CancellationReason, RedirectParams, Subject};
use court_pay::utils::error::ErrorSeverity;
use court_pay::utils::{logger, validation::Validate};
use court_pay::{
    CliConfig, Command, LocalStorage, Navigation, PageLoad, PaymentConfirmationFlow, Result,
    ReqwestBackend, ResultPages, RefundStatusPoller, Route, TomlConfig,
};
use std::sync::Arc;

fn print_navigation(navigation: &Navigation) {
    if let Some(toast) = &navigation.toast {
        println!("💬 {}", toast);
    }
    println!("➡️  {}", navigation.route);
}

async fn follow_refund<C: ConfigProvider>(
    config: &C,
    backend: ReqwestBackend,
    subject: Subject,
    refund_id: &str,
) -> Result<()> {
    let handle = RefundStatusPoller::new(Arc::new(backend), refund_id, config.refund_poll()).spawn();
    let mut updates = handle.subscribe();

    tokio::select! {
        _ = updates.wait_for(|state| state.is_terminal()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping refund poll");
            handle.cancel();
        }
    }

    let report = handle.join().await;
    tracing::info!(
        "Refund {} ended as {:?} after {} checks",
        refund_id,
        report.state,
        report.fetches
    );
    if let Some(navigation) = report.navigation(subject) {
        print_navigation(&navigation);
    }
    Ok(())
}

async fn execute<C: ConfigProvider>(config: &C, command: Command) -> Result<()> {
    let storage = LocalStorage::new(config.handoff_dir().to_string());

    match command {
        Command::Confirm {
            subject,
            query,
            order_id,
            payment_key,
            amount,
        } => {
            let mut params = query
                .as_deref()
                .map(RedirectParams::from_query)
                .unwrap_or_default();
            // 個別旗標優先於查詢字串
            params.order_id = order_id.or(params.order_id);
            params.payment_key = payment_key.or(params.payment_key);
            params.amount = amount.or(params.amount);

            let backend = ReqwestBackend::from_config(config)?;
            let flow = PaymentConfirmationFlow::new(backend, storage, subject, params);
            let report = flow.run().await?;
            tracing::info!("Confirmation finished in state {}", report.state);
            print_navigation(&report.navigation);
        }
        Command::GatewayFail { subject, query } => {
            let navigation =
                record_gateway_failure(storage, subject, &GatewayFailure::from_query(&query)).await?;
            print_navigation(&navigation);
        }
        Command::Cancel {
            subject,
            reason,
            detail,
            no_follow,
        } => {
            let reason = CancellationReason::parse(&reason, detail.as_deref())?;
            let backend = ReqwestBackend::from_config(config)?;
            let navigation = request_cancellation(&backend, subject, &reason).await?;
            print_navigation(&navigation);

            if let Route::CancellationProcessing { refund_id, .. } = &navigation.route {
                if !no_follow {
                    follow_refund(config, backend, subject, refund_id).await?;
                }
            }
        }
        Command::RefundStatus { subject, refund_id } => {
            let backend = ReqwestBackend::from_config(config)?;
            follow_refund(config, backend, subject, &refund_id).await?;
        }
        Command::ShowResult { subject, order_id } => {
            let pages = ResultPages::new(storage, config.handoff_max_age());
            match (subject, order_id) {
                (Some(subject), Some(order_id)) => match pages.success_page(subject, &order_id).await? {
                    PageLoad::Render(outcome) => {
                        println!("{}", serde_json::to_string_pretty(&outcome)?)
                    }
                    PageLoad::Redirect(route) => print_navigation(&Navigation::to(route)),
                },
                _ => match pages.failure_page().await? {
                    PageLoad::Render(view) => {
                        println!("{}", serde_json::to_string_pretty(&view.record)?);
                        println!("🔁 Retry from {}", view.retry);
                    }
                    PageLoad::Redirect(route) => print_navigation(&Navigation::to(route)),
                },
            }
        }
    }

    Ok(())
}

async fn run(cli: CliConfig) -> Result<()> {
    match &cli.config {
        Some(path) => {
            let config = TomlConfig::from_file(path)?;
            config.validate()?;
            tracing::debug!("Loaded configuration from {}", path);
            execute(&config, cli.command).await
        }
        None => {
            cli.validate()?;
            let command = cli.command.clone();
            execute(&cli, command).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting court-pay CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ court-pay failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}
