use crate::state::AppState;

pub async fn cmd_reconcile(state: &AppState, dry_run: bool) -> anyhow::Result<()> {
    let report = state.reconciler.run(dry_run).await?;

    println!("Reconciliation{}", if dry_run { " (dry run)" } else { "" });
    println!("{:-<60}", "");
    println!("Orphaned sources:      {}", report.orphaned_sources);
    println!("Orphaned collections:  {}", report.orphaned_collections);
    println!("Duplicate sources:     {}", report.duplicate_sources);
    println!("Duplicate collections: {}", report.duplicate_collections);
    println!("Duplicate media:       {} (not removed)", report.duplicate_media);

    if !dry_run {
        println!();
        println!("Deleted: {} | Failed: {}", report.deleted, report.failed);
    }
    Ok(())
}
