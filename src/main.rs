use std::path::Path;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use pneumo_report::config::{Cli, Command, Config};
use pneumo_report::handlers::{self, AppState};
use pneumo_report::inference::{InferenceEngine, OnnxClassifier};
use pneumo_report::models::PatientRecord;
use pneumo_report::report::{generate_report, ReportDocument};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "pneumo_report=debug,actix_web=debug"
    } else {
        "pneumo_report=info,actix_web=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(model) = &cli.model {
        config.model.path = model.clone();
    }

    let classifier = OnnxClassifier::load(&config.model).map_err(|e| {
        error!(error = %e, "Cannot start without a model");
        e
    })?;
    let engine = InferenceEngine::new(Box::new(classifier), config.model.input);

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            serve(engine, config).await
        }
        Command::Classify {
            image,
            name,
            age,
            sex,
            address,
            date,
            out_dir,
        } => {
            let patient = PatientRecord {
                name,
                age,
                sex,
                address,
                diagnosis_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            };
            classify_to_file(&engine, &config, &image, &patient, &out_dir)
        }
    }
}

async fn serve(engine: InferenceEngine, config: Config) -> anyhow::Result<()> {
    let listen = config.server.listen.clone();
    let state = web::Data::new(AppState::new(engine, config));

    info!("Server running at http://{listen}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&listen)
    .with_context(|| format!("failed to bind {listen}"))?
    .run()
    .await?;

    Ok(())
}

fn classify_to_file(
    engine: &InferenceEngine,
    config: &Config,
    image: &Path,
    patient: &PatientRecord,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    let result = engine.classify(&bytes)?;

    println!("Prediction: {}", result.label);
    println!("Confidence: {}", result.confidence_percent());
    for line in ReportDocument::build(patient, &result).recommendations() {
        println!("{line}");
    }

    // The classification stands even if the report cannot be written.
    let pdf = match generate_report(patient, &result, &config.report) {
        Ok(pdf) => pdf,
        Err(e) => {
            error!(error = %e, "Report rendering failed");
            return Err(e.into());
        }
    };
    let path = out_dir.join(patient.report_filename());
    std::fs::write(&path, pdf).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Report written");

    Ok(())
}
