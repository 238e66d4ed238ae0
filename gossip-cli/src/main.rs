use std::time::Duration;

use anyhow::{Context, Result};
use api_client::{ApiClient, ApiConfig};
use clap::{Parser, Subcommand};
use gossip_feed::{
    FeedController, FeedSource, FeedState, FetchCompletion, GossipApi, Post, PostCache,
    ReactionCompletion, ReactionKind, ReactionState, to_sixty_words,
};
use serde_json::json;

/// Read the gossip feed and react to posts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Gossip server to talk to
    #[arg(long, env = "GOSSIP_BASE_URL", default_value = api_client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "GOSSIP_TIMEOUT_MS", default_value_t = 15_000)]
    timeout_ms: u64,

    /// Posts per page
    #[arg(long, env = "GOSSIP_PAGE_SIZE", default_value_t = gossip_feed::DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// How many first-page posts the in-memory cache holds for this run
    #[arg(long, env = "GOSSIP_CACHE_SIZE", default_value_t = 5)]
    cache_size: usize,

    /// Print JSON instead of cards
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up
    Health,

    /// Print the feed
    Feed {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// React to a post (like, dislike or support)
    React {
        post_id: String,
        reaction: ReactionKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = ApiConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from_millis(args.timeout_ms),
        ..ApiConfig::default()
    };
    let api = GossipApi::new(ApiClient::new(config));
    let cache = PostCache::with_size(args.cache_size).shared();

    match args.command {
        Command::Health => {
            let health = api
                .health_check()
                .await
                .with_context(|| format!("Health check against {} failed", args.base_url))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                let status = if health.ok { "up" } else { "down" };
                println!("{} is {status}", health.service);
            }
        }
        Command::Feed { pages } => {
            let controller = FeedController::new(api, cache, args.page_size);
            load_first_page(&controller).await;

            for _ in 1..pages {
                match controller.load_more().await {
                    Some(FetchCompletion::Applied) => {}
                    Some(_) => {
                        eprintln!("Couldn't load more posts");
                        break;
                    }
                    None => break,
                }
            }

            let state = controller.state();
            if args.json {
                print_json(&state)?;
            } else {
                for post in state.posts() {
                    print_card(post, state.reaction(&post.id));
                }
                if state.has_more() {
                    println!("(more posts available, use --pages)");
                }
            }
        }
        Command::React { post_id, reaction } => {
            let controller = FeedController::new(api, cache, args.page_size);
            load_first_page(&controller).await;
            if controller.state().post(&post_id).is_none() {
                log::warn!("Post {post_id} is not on the first page");
            }

            match controller.react(&post_id, reaction).await {
                ReactionCompletion::Confirmed => println!("{} {reaction} sent", reaction.emoji()),
                ReactionCompletion::Declined => println!("The server didn't apply the reaction"),
                ReactionCompletion::ToggledLocally => {
                    println!("Server unreachable, {reaction} toggled locally only")
                }
                ReactionCompletion::Stale => {}
            }

            let state = controller.state();
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "post": state.post(&post_id),
                        "reaction": state.reaction(&post_id),
                    }))?
                );
            } else if let Some(post) = state.post(&post_id) {
                print_card(post, state.reaction(&post_id));
            }
        }
    }

    Ok(())
}

async fn load_first_page<S: FeedSource>(controller: &FeedController<S>) {
    if controller.load_first_page().await == Some(FetchCompletion::Failed) {
        let state = controller.state();
        eprintln!(
            "Couldn't load the feed ({}), showing what we have",
            state.error().unwrap_or("unknown error")
        );
    }
}

fn print_json(state: &FeedState) -> Result<()> {
    let output = json!({
        "posts": state.posts(),
        "reactions": state.reactions(),
        "page": state.cursor().page,
        "has_more": state.has_more(),
        "error": state.error(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_card(post: &Post, reaction: Option<&ReactionState>) {
    let state = reaction.copied().unwrap_or_else(|| ReactionState::from_post(post));

    println!("#{} {}", post.id, post.title);
    if !post.date.is_empty() {
        println!("   {}", post.date);
    }
    if let Some(image) = &post.image_uri {
        println!("   [image] {image}");
    } else if let Some(video) = &post.video_uri {
        println!("   [video] {video}");
    }
    println!("   {}", to_sixty_words(&post.body));

    let reactions = ReactionKind::ALL
        .iter()
        .map(|kind| {
            let marker = if state.active == Some(*kind) { "*" } else { "" };
            format!("{marker}{} {}", kind.emoji(), state.counts.get(*kind))
        })
        .collect::<Vec<_>>()
        .join("   ");
    println!("   {reactions}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cache_size_help_describes_a_single_run() {
        let command = Args::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "cache_size")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("in-memory"));
        assert!(!help.contains("next start"));
    }

    #[test]
    fn test_parse_react() {
        let args =
            Args::try_parse_from(["gossip", "--cache-size", "3", "react", "7", "support"]).unwrap();
        assert_eq!(args.cache_size, 3);
        assert!(matches!(
            args.command,
            Command::React { ref post_id, reaction: ReactionKind::Support } if post_id == "7"
        ));
    }
}
