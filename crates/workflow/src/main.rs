//! Local workflow sandbox.
//!
//! Boots the full workflow stack against the in-memory store (or
//! PostgreSQL when `DATABASE_URL` is set) and drives one scripted
//! submit→approve round as a smoke check.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewlink_core::identity::Identity;
use crewlink_core::types::DocId;
use crewlink_store::{DocumentStore, MemoryStore, PgDocumentStore, StoreConfig};
use crewlink_workflow::applications::{PortfolioSnapshot, SubmitJobApplication};
use crewlink_workflow::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewlink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StoreConfig::from_env();

    let store: Arc<dyn DocumentStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgDocumentStore::connect(&url).await?;
            tracing::info!("Using PostgreSQL document store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let session = Session::new(store, &config);
    session.restore_persisted();

    let employer = Identity::new(DocId::new_v4(), "Avery");
    let applicant = Identity::new(DocId::new_v4(), "Sam");

    let feed_sub = session.feed.subscribe(employer.user_id).await?;
    let jobs_sub = session.jobs.subscribe_for_reviewer(employer.user_id).await?;

    let application_id = session
        .jobs
        .submit(SubmitJobApplication {
            job_id: DocId::new_v4(),
            job_title: "Backend Engineer".to_string(),
            employer_id: employer.user_id,
            applicant,
            cover_letter: "I build storage engines.".to_string(),
            portfolio: PortfolioSnapshot::default(),
        })
        .await?;
    tracing::info!(%application_id, "Application submitted");

    // Let the live snapshots land in the mirrors.
    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!(
        cached = session.jobs.applications().len(),
        unread = session.feed.unread_count(),
        "Reviewer state after submission"
    );

    let outcome = session
        .jobs
        .approve(application_id, employer.user_id)
        .await?;
    tracing::info!(?outcome, "Application reviewed");

    feed_sub.unsubscribe();
    jobs_sub.unsubscribe();
    Ok(())
}
