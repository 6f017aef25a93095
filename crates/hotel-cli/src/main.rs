//! Hotel CLI - database administration
//!
//! Usage:
//!   hotel migrate
//!   hotel seed
//!   hotel create-user --email <email> --password <password> \
//!       --first-name <name> --last-name <name> [--admin]
//!
//! All commands read `DATABASE_URL` (and the other server settings) from the
//! environment.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hotel_api::auth::models::SEEDED_ROLES;
use hotel_api::auth::{
    ApiUserDto, AuthManager, CredentialStore, PasswordConfig, PgCredentialStore, ADMIN_ROLE,
};
use hotel_api::telemetry::init_tracing;
use hotel_core::postgres::connect;
use hotel_core::{AppConfig, Country, GenericRepository, PgCountriesRepository, SystemClock};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

#[derive(Parser)]
#[command(name = "hotel")]
#[command(about = "Hotel listing API administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Insert the default roles and reference countries if missing
    Seed,
    /// Register an account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Also grant the Administrator role
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);

    let cli = Cli::parse();

    if config.database.url.is_none() {
        bail!("DATABASE_URL must be set");
    }
    let pool = connect(&config.database)
        .await
        .context("connecting to the database")?;

    match cli.command {
        Commands::Migrate => migrate(&pool).await,
        Commands::Seed => seed(&pool).await,
        Commands::CreateUser {
            email,
            password,
            first_name,
            last_name,
            admin,
        } => {
            let dto = ApiUserDto {
                first_name,
                last_name,
                email,
                password,
            };
            create_user(&config, pool, dto, admin).await
        }
    }
}

async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("running migrations")?;
    info!("Migrations applied");
    Ok(())
}

async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    PgCredentialStore::new(pool.clone(), PasswordConfig::default())
        .ensure_roles(&SEEDED_ROLES)
        .await?;

    let countries = PgCountriesRepository::new(pool.clone());
    let existing = countries.get_all().await?;

    let mut added = 0;
    for country in Country::reference_data() {
        if existing.iter().any(|c| c.name == country.name) {
            continue;
        }
        let saved = countries.add(country).await?;
        info!(country_id = saved.id, name = %saved.name, "Seeded country");
        added += 1;
    }

    info!(added, "Seed complete");
    Ok(())
}

async fn create_user(
    config: &AppConfig,
    pool: PgPool,
    dto: ApiUserDto,
    admin: bool,
) -> anyhow::Result<()> {
    if let Err(errors) = dto.validate() {
        bail!("invalid user: {errors}");
    }

    let store = Arc::new(PgCredentialStore::new(pool, PasswordConfig::default()));
    let manager = AuthManager::from_settings(store.clone(), &config.jwt, Arc::new(SystemClock))?;

    let errors = manager.register(&dto).await?;
    if !errors.is_empty() {
        let details = errors
            .iter()
            .map(|e| e.description.as_str())
            .collect::<Vec<_>>()
            .join("\n  ");
        bail!("registration rejected:\n  {details}");
    }

    let user = store
        .find_by_email(&dto.email)
        .await?
        .context("registered user not found")?;

    if admin {
        let role_errors = store.add_to_role(&user, ADMIN_ROLE).await?;
        if let Some(error) = role_errors.first() {
            bail!("could not grant {ADMIN_ROLE}: {}", error.description);
        }
    }

    println!("Created user {} ({})", user.email, user.id);
    Ok(())
}
