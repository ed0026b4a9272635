use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lesion_review::annotate::annotated_file_name;
use lesion_review::auth::SessionRegistry;
use lesion_review::config::{Cli, Command, DetectorArgs, PredictArgs, ServeArgs};
use lesion_review::http::{app, state::HttpState};
use lesion_review::service::{Detector, ReviewService, Upload};
use lesion_review::store::PredictionStore;
use lesion_review::summary::summarize;
use lesion_review::yolo::{load_class_names, YoloDetector};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let store = Arc::new(PredictionStore::new(cli.log_path));

    match cli.command {
        Command::Serve(args) => serve(args, store).await,
        Command::Predict(args) => predict(args, store),
        Command::Summary => {
            let counts = summarize(&store.read_all()?);
            if counts.is_empty() {
                println!("no predictions in {}", store.path().display());
            }
            for c in counts {
                println!("{}\t{}", c.name, c.count);
            }
            Ok(())
        }
        Command::Clear => {
            store.clear()?;
            println!("cleared {}", store.path().display());
            Ok(())
        }
    }
}

fn build_detector(args: &DetectorArgs) -> Result<Arc<dyn Detector>> {
    let names = match &args.class_names {
        Some(path) => load_class_names(path)?,
        None => BTreeMap::new(),
    };
    let detector = YoloDetector::new(&args.model, names, args.params())?;
    Ok(Arc::new(detector))
}

async fn serve(args: ServeArgs, store: Arc<PredictionStore>) -> Result<()> {
    tracing::info!("starting lesion review server");

    // 1. Load the model once; handlers share it
    let detector = build_detector(&args.detector)?;

    // 2. Wire service and session state
    let state = HttpState {
        review: ReviewService::new(detector, store.clone()),
        sessions: Arc::new(SessionRegistry::new()),
        credentials_path: args.credentials.clone(),
    };
    let router = app(state, &args.static_dir);

    // 3. Serve
    tracing::info!("prediction log: {}", store.path().display());
    tracing::info!("credentials: {}", args.credentials.display());
    tracing::info!("listening on http://{}", args.bind);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn predict(args: PredictArgs, store: Arc<PredictionStore>) -> Result<()> {
    let detector = build_detector(&args.detector)?;
    let review = ReviewService::new(detector, store);

    let mut uploads = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        uploads.push(Upload { name, bytes });
    }

    let report = review.predict(&uploads)?;

    for err in &report.errors {
        eprintln!("error: {}", err.error);
    }
    for p in &report.predictions {
        println!("== {}", p.image_name);
        match &p.message {
            Some(msg) => println!("{msg}"),
            None => {
                println!("image_name\tname\tconfidence");
                for row in &p.rows {
                    println!("{}\t{}\t{:.4}", row.image_name, row.name, row.confidence);
                }
            }
        }
        if let Some(dir) = &args.annotated_dir {
            std::fs::create_dir_all(dir)?;
            let out = dir.join(annotated_file_name(&p.image_name));
            p.annotated
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
        }
    }
    println!("saved {} rows to {}", report.saved_rows, report.log_path);

    Ok(())
}
