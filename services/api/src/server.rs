use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_refi::config::AppConfig;
use credit_refi::error::AppError;
use credit_refi::refinance::{AuthMode, RefinanceService};
use credit_refi::telemetry;
use credit_refi::upstream::{
    BankApiClient, CatalogResolver, ExternalBankClient, LiveCatalogGateway, LiveLoanGateway,
    SampleCatalogGateway, SampleLoanGateway,
};
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // The upstream strategy is fixed once per process: either every gateway
    // is live, or every gateway is the static sample provider.
    let app = if config.use_sample_data {
        info!("sample-data mode enabled; all upstream calls are substituted");
        let service = Arc::new(RefinanceService::new(
            Arc::new(SampleLoanGateway),
            Arc::new(SampleCatalogGateway),
            AuthMode::OptionalForSampleData,
        ));
        with_service_routes(service)
    } else {
        let bank_api = BankApiClient::new(&config.bank_api)?;
        let external =
            ExternalBankClient::new(config.external_banks.clone(), config.external_bank_timeout)?;
        let resolver = CatalogResolver::new(&config.catalog, config.bank_api.timeout)?;

        let mut loans = LiveLoanGateway::new(bank_api, external);
        if config.use_sample_external_banks {
            info!("partner-bank fan-out substituted with sample loans");
            loans = loans.with_sample_external_loans();
        }

        let service = Arc::new(RefinanceService::new(
            Arc::new(loans),
            Arc::new(LiveCatalogGateway::new(resolver)),
            AuthMode::Required,
        ));
        with_service_routes(service)
    };

    let app = app.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        external_banks = config.external_banks.len(),
        sample_data = config.use_sample_data,
        "refinance engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
