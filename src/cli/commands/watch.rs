use crate::domain::MediaId;
use crate::state::AppState;

pub async fn cmd_watch(state: &AppState, media_id: &str, watched: bool) -> anyhow::Result<()> {
    let user_id = state.require_user().await?;
    let media_id = MediaId::new(media_id);

    if state
        .collections
        .set_watch_status(&user_id, &media_id, watched)
        .await
    {
        let label = if watched { "watched" } else { "unwatched" };
        println!("✓ Marked {media_id} as {label}");
    } else {
        println!("Media {media_id} is not in your collection.");
    }
    Ok(())
}
