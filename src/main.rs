use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use grader::{
    DockerSubstrate, Evaluator, GraderConfig, HttpArtifactStore, Language, Submission, TomlCatalog,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("grader=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(exercise_id), Some(language), Some(source_path)) =
        (args.next(), args.next(), args.next())
    else {
        anyhow::bail!("usage: grader <exercise-id> <language> <source-file>");
    };

    let language: Language = language.parse()?;
    let source = std::fs::read_to_string(&source_path)
        .with_context(|| format!("Failed to read submission source {}", source_path))?;

    let catalog_path =
        std::env::var("EXERCISES_CONFIG").unwrap_or_else(|_| "./files/exercises.toml".into());
    let catalog = TomlCatalog::from_file(&catalog_path)?;
    info!("Loaded exercise catalog from {}", catalog_path);

    let config = GraderConfig::from_env();
    let substrate = DockerSubstrate::connect().await?;
    let artifacts = HttpArtifactStore::new(&config);

    let evaluator = Evaluator::new(
        Arc::new(catalog),
        Arc::new(substrate),
        Arc::new(artifacts),
        config,
    );

    let submission = Submission::new(exercise_id, language, source);
    let result = evaluator.evaluate(&submission).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
