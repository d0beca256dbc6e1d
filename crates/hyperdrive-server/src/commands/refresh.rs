use anyhow::Result;
use hyperdrive::Gallery;

/// Reconcile once and print the asset list as JSON on stdout.
pub async fn run(gallery: &Gallery) -> Result<()> {
    let report = gallery.refresh().await?;

    for failure in report.failures() {
        eprintln!("warning: {failure}");
    }

    println!("{}", serde_json::to_string_pretty(&report.assets)?);
    Ok(())
}
