use crate::cli::ServeArgs;
use crate::infra::{build_contact_service, check_relay, AppState};
use crate::routes::with_contact_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use contact_relay::config::AppConfig;
use contact_relay::contacts::{ContactNotifier, MailIdentity, SmtpMailTransport};
use contact_relay::error::AppError;
use contact_relay::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    info!(
        account = %config.mail.account,
        recipient = %config.mail.recipient,
        secret_len = config.mail.secret_len(),
        "mail configuration loaded"
    );

    let contact_service = build_contact_service(&config)?;

    // Relay check runs in the background; the listener binds regardless of its result.
    let verifier = contact_service.clone();
    let mail = config.mail.clone();
    tokio::spawn(async move {
        check_relay(&*verifier, &mail).await;
    });

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_contact_routes(contact_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "contact relay ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Verify the relay connection and credentials without starting the server.
pub(crate) async fn check_mail() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let transport = Arc::new(SmtpMailTransport::from_config(&config.mail)?);
    let notifier = ContactNotifier::new(transport, MailIdentity::from(&config.mail));

    notifier.verify().await?;
    println!(
        "SMTP relay {}:{} accepted credentials for {}",
        config.mail.smtp_host, config.mail.smtp_port, config.mail.account
    );
    Ok(())
}
