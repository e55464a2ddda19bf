use crate::state::AppState;

pub async fn cmd_remove(state: &AppState, source_id: &str) -> anyhow::Result<()> {
    if state.collections.remove_from_collection(source_id).await {
        println!("✓ Removed source {source_id} from your collection");
    } else {
        println!("Source {source_id} is not in your collection.");
        println!("Use 'dramatracker list' to see your collection.");
    }
    Ok(())
}

pub async fn cmd_remove_entry(state: &AppState, collection_id: &str) -> anyhow::Result<()> {
    if state.collections.remove_by_collection_id(collection_id).await {
        println!("✓ Removed entry {collection_id}");
    } else {
        println!("Collection entry {collection_id} could not be removed.");
    }
    Ok(())
}
