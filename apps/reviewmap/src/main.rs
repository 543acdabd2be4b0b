use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{
    markers, CredentialStore, DateNormalizer, DeleteOutcome, DraftField, FileCredentialStore,
    HttpReviewStore, LocalFile, MapScene, MapService, MissingPlaceSearch, ReviewMapEngine,
    UserPrompt, WriteAction,
};
use shared::domain::{Coordinate, PlaceCandidate, Rating, ReviewId, UserId, UserProfile};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(name = "reviewmap", about = "Keep a map of the places you reviewed")]
struct Args {
    /// Overrides `api_base_url` from settings.
    #[arg(long)]
    api_base_url: Option<String>,
    /// Overrides `profile_path` from settings.
    #[arg(long)]
    profile: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stores the profile used for later commands.
    SetProfile {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        username: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Lists your reviews.
    Reviews,
    /// Lists one marker per reviewed spot.
    Markers,
    Create(CreateArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    Logout {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    #[arg(long)]
    place_id: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    x: String,
    #[arg(long, allow_hyphen_values = true)]
    y: String,
    #[command(flatten)]
    draft: DraftArgs,
}

#[derive(ClapArgs, Debug, Default)]
struct DraftArgs {
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    rating: Option<u8>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    menu: Option<String>,
    #[arg(long)]
    price: Option<String>,
    /// `YYYY-MM-DD`
    #[arg(long)]
    visit_date: Option<String>,
    #[arg(long)]
    photo: Option<PathBuf>,
}

/// Stands in for the map widget: scenes and camera moves are logged.
struct LoggedMap;

impl MapService for LoggedMap {
    fn center(&self) -> Option<Coordinate> {
        None
    }

    fn pan_to(&self, coordinate: &Coordinate) {
        debug!(%coordinate, "pan map");
    }

    fn recenter(&self, coordinate: &Coordinate, zoom_level: u8) {
        debug!(%coordinate, zoom_level, "recenter map");
    }

    fn render(&self, scene: &MapScene<'_>) {
        debug!(
            review_markers = scene.review_markers.len(),
            search_markers = scene.search_markers.len(),
            overlay = scene.overlay.is_some(),
            "map scene"
        );
    }
}

struct TerminalPrompt {
    assume_yes: bool,
}

impl UserPrompt for TerminalPrompt {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{message} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(api_base_url) = &args.api_base_url {
        settings.api_base_url = config::normalize_api_base_url(api_base_url);
    }
    if let Some(profile) = &args.profile {
        settings.profile_path = profile.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
    debug!(api_base_url = %settings.api_base_url, profile = %settings.profile_path.display(), "settings loaded");

    let credentials = Arc::new(FileCredentialStore::new(&settings.profile_path));
    if let Command::SetProfile {
        id,
        username,
        nickname,
        token,
    } = args.command
    {
        let profile = UserProfile {
            id: UserId(id),
            nickname: nickname.unwrap_or_else(|| username.clone()),
            username,
            token,
        };
        credentials.save_profile(&profile)?;
        info!(username = %profile.username, path = %credentials.path().display(), "profile stored");
        return Ok(());
    }

    let assume_yes = matches!(
        args.command,
        Command::Delete { yes: true, .. } | Command::Logout { yes: true }
    );
    let profile = match credentials.load_profile() {
        Ok(profile) => profile,
        Err(err) => {
            warn!(error = %err, "stored profile unreadable; starting signed out");
            None
        }
    };
    let token = profile.as_ref().and_then(|profile| profile.token.clone());
    let mut engine = build_engine(&settings, credentials, token, assume_yes)?;
    if engine.start_with_profile(profile).await.is_none() {
        bail!("no stored profile; run `reviewmap set-profile` first");
    }

    match args.command {
        Command::SetProfile { .. } => {}
        Command::Reviews => print_reviews(&engine),
        Command::Markers => print_markers(&engine),
        Command::Create(create) => {
            let candidate = PlaceCandidate {
                id: create.place_id,
                name: create.name,
                address: create.address,
                road_address: None,
                coordinate: Coordinate::new(create.x, create.y),
                phone: None,
                place_url: None,
                category: create.category,
            };
            engine.open_create(candidate)?;
            submit_draft(&mut engine, create.draft).await?;
        }
        Command::Edit { id, draft } => {
            engine.open_edit(ReviewId(id))?;
            submit_draft(&mut engine, draft).await?;
        }
        Command::Delete { id, .. } => match engine.delete_review(ReviewId(id)).await? {
            DeleteOutcome::Deleted => println!("deleted review {id}"),
            DeleteOutcome::Declined => println!("kept review {id}"),
        },
        Command::Logout { .. } => {
            if engine.logout() {
                println!("logged out");
            }
        }
    }

    Ok(())
}

fn build_engine(
    settings: &config::Settings,
    credentials: Arc<FileCredentialStore>,
    token: Option<String>,
    assume_yes: bool,
) -> Result<ReviewMapEngine> {
    let store = Arc::new(HttpReviewStore::new(&settings.api_base_url)?.with_bearer_token(token));
    Ok(ReviewMapEngine::new_with_dependencies(
        store.clone(),
        store,
        Arc::new(MissingPlaceSearch),
        Arc::new(LoggedMap),
        credentials,
        Arc::new(TerminalPrompt { assume_yes }),
        DateNormalizer::local(),
    ))
}

async fn submit_draft(engine: &mut ReviewMapEngine, draft: DraftArgs) -> Result<()> {
    if let Some(stars) = draft.rating {
        let rating = Rating::new(stars).ok_or_else(|| {
            anyhow!("rating must be between {} and {}", Rating::MIN, Rating::MAX)
        })?;
        engine.set_field(DraftField::Rating(rating))?;
    }
    if let Some(content) = draft.content {
        engine.set_field(DraftField::Content(content))?;
    }
    if let Some(menu) = draft.menu {
        engine.set_field(DraftField::Menu(menu))?;
    }
    if let Some(price) = draft.price {
        engine.set_field(DraftField::Price(price))?;
    }
    if let Some(visit_date) = draft.visit_date {
        engine.set_field(DraftField::VisitDate(visit_date))?;
    }
    if let Some(path) = draft.photo {
        engine.attach_local_file(read_photo(&path).await?)?;
    }

    let outcome = engine.submit_form().await?;
    match (outcome.action, outcome.review_id) {
        (WriteAction::Create, Some(review_id)) => println!("created review {review_id}"),
        (WriteAction::Create, None) => println!("created review"),
        (_, Some(review_id)) => println!("updated review {review_id}"),
        (_, None) => println!("updated review"),
    }
    Ok(())
}

async fn read_photo(path: &Path) -> Result<LocalFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read photo '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("photo")
        .to_string();
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(LocalFile {
        file_name,
        mime_type,
        bytes,
    })
}

fn print_reviews(engine: &ReviewMapEngine) {
    for review in engine.cache().iter() {
        println!(
            "{}\t{}\t{}/5\t{}\t{}\t{}",
            review.id,
            review.visit_date_label(),
            review.rating,
            review.name,
            review.menu,
            review.price
        );
    }
}

fn print_markers(engine: &ReviewMapEngine) {
    for group in markers::groups(engine.cache()) {
        let representative = group.representative();
        println!(
            "{}\t{} review(s)\t{}",
            group.key,
            group.len(),
            representative.name
        );
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
