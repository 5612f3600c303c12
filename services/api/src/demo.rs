use clap::Args;
use credit_refi::error::AppError;
use credit_refi::refinance::{ApplicationRequest, AuthMode, RefinanceService};
use credit_refi::upstream::{SampleCatalogGateway, SampleLoanGateway};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Submit an application for this agreement id instead of the first
    /// external loan with an offer.
    #[arg(long)]
    pub(crate) agreement_id: Option<String>,
    /// Skip the application-submission portion of the demo.
    #[arg(long)]
    pub(crate) skip_application: bool,
}

/// End-to-end walkthrough over the sample gateways: suggestions first,
/// then one resolved application. Exercises the same engine paths as the
/// HTTP service.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = RefinanceService::new(
        Arc::new(SampleLoanGateway),
        Arc::new(SampleCatalogGateway),
        AuthMode::OptionalForSampleData,
    );

    println!("Refinance engine demo (sample data)\n");

    let suggestions = service.suggestions(None).await?;
    println!(
        "Obligations: {} total, {} from partner banks, {} catalog products considered",
        suggestions.meta.total,
        suggestions.meta.external_sources,
        suggestions.meta.bank_products_considered
    );

    for entry in &suggestions.data {
        let loan = &entry.obligation;
        match &entry.refinance_offer {
            Some(offer) => println!(
                "  {} [{}] {:.2} at {:.2}% -> {} at {:.2}%, monthly {:.2}, savings {:.2}",
                loan.id,
                loan.source_bank,
                loan.principal,
                loan.interest_rate.unwrap_or_default(),
                offer.product_name,
                offer.suggested_rate,
                offer.monthly_payment,
                offer.savings
            ),
            None => println!(
                "  {} [{}] {:.2} - no refinance offer (internal or no eligible product)",
                loan.id, loan.source_bank, loan.principal
            ),
        }
    }

    if args.skip_application {
        return Ok(());
    }

    let target = args.agreement_id.or_else(|| {
        suggestions
            .data
            .iter()
            .find(|entry| entry.refinance_offer.is_some())
            .map(|entry| entry.obligation.id.clone())
    });

    let Some(agreement_id) = target else {
        println!("\nNo refinanceable obligation in the sample set; skipping application.");
        return Ok(());
    };

    println!("\nSubmitting refinance application for {agreement_id}");
    let submitted = service
        .submit_application(
            None,
            ApplicationRequest {
                agreement_id: Some(agreement_id),
                comment: Some("demo run".to_string()),
                ..ApplicationRequest::default()
            },
        )
        .await?;

    println!(
        "  -> {} product {} for {:.2} over {} months",
        submitted.status,
        submitted.meta.product_id,
        submitted.meta.amount,
        submitted.meta.term_months
    );
    println!(
        "  agreement: {}",
        serde_json::to_string_pretty(&submitted.data.agreement).unwrap_or_default()
    );

    Ok(())
}
