use anyhow::{Context, Result, anyhow};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::context::DashboardContext;
use super::views::{PredictForm, format_price, render_page};
use crate::config::PipelineSettings;
use crate::models::{FeatureRow, ReviewsBucket};
use crate::storage::{load_artifact, read_cleaned_listings};

#[derive(Clone)]
struct AppState {
    ctx: Arc<DashboardContext>,
    preview_rows: usize,
}

pub fn router(ctx: Arc<DashboardContext>, preview_rows: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", get(index))
        .route("/healthz", get(healthz))
        .with_state(AppState { ctx, preview_rows })
}

/// Load both resources once and serve the dashboard until shutdown
pub async fn serve(settings: &PipelineSettings) -> Result<()> {
    let ctx = Arc::new(DashboardContext::load(&settings.paths));
    let app = router(ctx, settings.dashboard.preview_rows);

    let addr: SocketAddr = settings
        .dashboard
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", settings.dashboard.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("🌐 Dashboard listening on http://{}", addr);
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

async fn index(
    State(state): State<AppState>,
    query: Result<Query<PredictForm>, QueryRejection>,
) -> Html<String> {
    match query {
        Ok(Query(form)) => Html(render_page(&state.ctx, &form, None, state.preview_rows)),
        Err(rejection) => {
            let message = rejection.body_text();
            warn!("Unreadable prediction input: {}", message);
            Html(render_page(
                &state.ctx,
                &PredictForm::default(),
                Some(&message),
                state.preview_rows,
            ))
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

fn describe_file(label: &str, path: &Path) -> Result<String> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| anyhow!("{} file not found: {}", label, path.display()))?;
    Ok(format!("{} found: {} (size={})", label, path.display(), metadata.len()))
}

/// Headless check: both files exist and load, and the model prices a fixed
/// sample. Progress lines go to `out`; the first failure is returned.
pub fn run_cli_check(settings: &PipelineSettings, out: &mut impl Write) -> Result<()> {
    let data_path = &settings.paths.clean_csv;
    let model_path = &settings.paths.model_artifact;

    writeln!(out, "{}", describe_file("Data", data_path)?)?;
    writeln!(out, "{}", describe_file("Model", model_path)?)?;

    let listings = read_cleaned_listings(data_path).context("could not load data")?;
    let artifact = load_artifact(model_path).context("could not load model")?;
    info!("Loaded {} rows and {} model", listings.len(), artifact.model_name);

    let sample = FeatureRow::new("cli-sample", 4.0, 100, 30, false, false, ReviewsBucket::Low, 1)?;
    let estimate = artifact.predict(&sample).context("Prediction failed")?;
    writeln!(out, "Predicted price: {}", format_price("Rs ", estimate))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::models::CleanedListing;
    use crate::storage::{ARTIFACT_FORMAT_VERSION, ModelArtifact};
    use crate::training::{CandidateReport, EstimatorSpec, PricePipeline, RegressionMetrics};
    use chrono::Utc;
    use uuid::Uuid;

    fn empty_context() -> DashboardContext {
        DashboardContext {
            data: Err(ResourceError::missing("data", Path::new("data/clean.csv"))),
            model: Err(ResourceError::missing("model", Path::new("models/model.json.gz"))),
        }
    }

    fn listing(i: usize) -> CleanedListing {
        let name = format!("Laptop {}", i);
        let rating = 3.0 + (i % 20) as f64 * 0.1;
        let reviews_count = (i * 37) as i64;
        CleanedListing {
            name_len: name.chars().count() as i64,
            product_name: name,
            price: 30000 + (rating * 5000.0) as i64,
            rating,
            reviews_count,
            source: "Flipkart".to_string(),
            query: "laptop".to_string(),
            page: 1,
            has_pro: 0,
            has_ultra: 0,
            reviews_bucket: ReviewsBucket::from_count(reviews_count),
        }
    }

    fn trained_context() -> DashboardContext {
        let listings: Vec<CleanedListing> = (0..24).map(listing).collect();
        let rows: Vec<FeatureRow> = listings.iter().map(|l| FeatureRow::try_from(l).unwrap()).collect();
        let targets: Vec<f64> = listings.iter().map(|l| l.price as f64).collect();

        let spec = EstimatorSpec::Ridge { alpha: 1.0 };
        let pipeline = PricePipeline::fit(&rows, &targets, &spec, 42).unwrap();
        let metrics = RegressionMetrics { mae: 1.0, rmse: 1.0, r2: 0.99 };
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            model_name: "ridge".to_string(),
            metrics,
            candidates: vec![CandidateReport {
                name: "ridge".to_string(),
                params: spec,
                cv_r2: 0.95,
                metrics,
            }],
            pipeline,
        };

        DashboardContext {
            data: Ok(listings),
            model: Ok(artifact),
        }
    }

    /// Serve on an ephemeral port and return its base URL
    async fn spawn_server(ctx: DashboardContext) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(ctx), 5)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn get_page(url: String) -> (u16, String) {
        let response = wreq::Client::new().get(url).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_healthz() {
        let base = spawn_server(empty_context()).await;
        let (status, _) = get_page(format!("{}/healthz", base)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_index_shows_diagnostics() {
        let base = spawn_server(empty_context()).await;
        let (status, html) = get_page(format!("{}/predict?rating=3.5&reviews_bucket=high", base)).await;

        assert_eq!(status, 200);
        assert!(html.contains("data file not found"));
        assert!(!html.contains("Dataset preview"));
    }

    #[tokio::test]
    async fn test_predict_renders_estimate() {
        let base = spawn_server(trained_context()).await;
        let (status, html) = get_page(format!(
            "{}/predict?rating=4.2&reviews_count=150&name_len=30&has_pro=1&reviews_bucket=low",
            base
        ))
        .await;

        assert_eq!(status, 200);
        assert!(html.contains("Predicted price:</strong> ₹"));
        assert!(!html.contains("Prediction failed"));
    }

    #[tokio::test]
    async fn test_empty_numeric_field_is_reported_on_page() {
        let base = spawn_server(trained_context()).await;
        let (status, html) = get_page(format!(
            "{}/predict?rating=4.0&reviews_count=&name_len=30&reviews_bucket=low",
            base
        ))
        .await;

        assert_eq!(status, 200);
        assert!(html.contains("Dataset preview"));
        assert!(html.contains("<form"));
        assert!(html.contains("Prediction failed: "));
        assert!(!html.contains("Predicted price:"));
    }

    #[test]
    fn test_cli_check_fails_on_missing_data() {
        let mut settings = PipelineSettings::default();
        let root = std::env::temp_dir().join(format!("price-insights-{}", Uuid::new_v4()));
        settings.paths.clean_csv = root.join("clean.csv");
        settings.paths.model_artifact = root.join("model.json.gz");

        let mut out = Vec::new();
        let err = run_cli_check(&settings, &mut out).unwrap_err();
        assert!(err.to_string().starts_with("Data file not found"));
        assert!(out.is_empty());
    }
}
