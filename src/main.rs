#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = survey_ocr::run_worker().await {
        eprintln!("survey-ocr fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
