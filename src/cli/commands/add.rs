//! Add-to-collection command handler

use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::cli::AddArgs;
use crate::models::SearchResult;
use crate::state::AppState;

/// Builds a search result from the flag form of `add`.
pub fn search_result_from_args(args: &AddArgs) -> anyhow::Result<SearchResult> {
    let (Some(source_id), Some(title), Some(release_date)) =
        (&args.source_id, &args.title, &args.release_date)
    else {
        anyhow::bail!("--source-id, --title and --release-date are required without --file");
    };

    let mut result = SearchResult::new(&args.source_type, source_id, title, release_date);
    result.media_type.clone_from(&args.media_type);
    if let Some(url) = &args.source_url {
        result.source_url.clone_from(url);
    }
    if let Some(original) = &args.title_original {
        result.title_original.clone_from(original);
    }
    if let Some(poster) = &args.poster_url {
        result.poster_url.clone_from(poster);
    }
    if let Some(rating) = args.rating_douban {
        result.rating_douban = rating;
    }
    if let Some(rating) = args.rating_imdb {
        result.rating_imdb = rating;
    }
    if let Some(rating) = args.rating_bangumi {
        result.rating_bangumi = rating;
    }
    result.duration.clone_from(&args.duration);
    result.summary.clone_from(&args.summary);
    result.staff.clone_from(&args.staff);

    Ok(result)
}

fn read_search_result(path: &Path) -> anyhow::Result<SearchResult> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse search result: {}", path.display()))
}

pub async fn cmd_add(state: &AppState, args: &AddArgs) -> anyhow::Result<()> {
    let result = match &args.file {
        Some(path) => read_search_result(path)?,
        None => search_result_from_args(args)?,
    };

    let user_id = state.require_user().await?;
    let outcome = state
        .collections
        .try_add_to_collection(&result, &user_id)
        .await?;

    let year = result.display_year().unwrap_or("?");
    if outcome.collection_created {
        println!("✓ Added: {} ({year})", result.title_zh);
    } else {
        println!("Already in your collection: {} ({year})", result.title_zh);
    }
    println!("  Media ID: {}", outcome.media_id);

    Ok(())
}
