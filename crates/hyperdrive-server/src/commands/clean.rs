use anyhow::Result;
use hyperdrive::Gallery;

/// Prune once and print what was removed.
pub async fn run(gallery: &Gallery) -> Result<()> {
    let report = gallery.clean().await?;

    for (name, reason) in &report.failures {
        eprintln!("warning: could not remove {name}: {reason}");
    }

    for name in report.deleted_names() {
        println!("removed {name}");
    }
    println!(
        "Cleaned up {} files ({} kept).",
        report.deleted.len(),
        report.kept
    );
    Ok(())
}
