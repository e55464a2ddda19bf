//! Collection listing command handlers

use crate::domain::MediaId;
use crate::state::AppState;

pub async fn cmd_list(state: &AppState) -> anyhow::Result<()> {
    let user_id = state.require_user().await?;
    let entries = state.collections.list_user_collections(&user_id).await?;

    if entries.is_empty() {
        println!("Your collection is empty.");
        println!();
        println!("Add titles with: dramatracker add --file result.json");
        return Ok(());
    }

    println!("Collection ({} total)", entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        let media_id = MediaId::new(entry.record.media_id.clone());
        let title = match state.collections.get_media(&media_id).await {
            Ok(Some(media)) => format!("{} ({})", media.title_zh, media.release_date),
            Ok(None) => "<missing media>".to_string(),
            Err(e) => format!("<error: {e}>"),
        };
        let indicator = if entry.record.watch_status { "✓" } else { "•" };

        println!("{indicator} {title}");
        println!(
            "  Entry: {} | Media: {} | Added: {}",
            entry.id, entry.record.media_id, entry.record.added_time
        );
    }

    println!();
    println!("Legend: ✓ Watched | • Not watched");

    Ok(())
}

pub async fn cmd_media(state: &AppState, media_id: &str) -> anyhow::Result<()> {
    let Some(media) = state.collections.get_media(&MediaId::new(media_id)).await? else {
        println!("Media {media_id} not found.");
        return Ok(());
    };

    println!("Media Info");
    println!("{:-<60}", "");
    println!("Title:    {}", media.title_zh);
    if !media.title_origin.is_empty() {
        println!("Original: {}", media.title_origin);
    }
    println!("Type:     {}", media.media_type);
    println!("Released: {}", media.release_date);
    if let Some(duration) = &media.duration {
        println!("Duration: {duration}");
    }

    let ratings = [
        ("Douban", media.rating_douban),
        ("IMDb", media.rating_imdb),
        ("Bangumi", media.rating_bangumi),
    ];
    for (label, rating) in ratings {
        if let Some(rating) = rating {
            println!("{label:<8}  {rating:.1}");
        }
    }

    if let Some(summary) = &media.summary {
        println!();
        println!("{summary}");
    }

    Ok(())
}

pub async fn cmd_collected(state: &AppState, source_id: &str) -> anyhow::Result<()> {
    if state.collections.is_source_collected(source_id).await? {
        println!("✓ Source {source_id} is collected");
    } else {
        println!("Source {source_id} is not collected");
    }
    Ok(())
}
