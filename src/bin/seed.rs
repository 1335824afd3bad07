use anyhow::Context;
use starter_backend::{
    auth::hash_password,
    config::Config,
    db,
    error::AppError,
    settings::{SettingsRepository, SettingsService},
    user::{NewUser, Role, UserRepository},
};

const SEED_USERS: &[(&str, &str, &str, Role)] = &[
    ("admin@example.com", "admin123", "Admin", Role::Admin),
    ("user@example.com", "user1234", "Demo User", Role::User),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let pool = db::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db::migrate(&pool).await.context("failed to run migrations")?;

    let users = UserRepository::new(pool.clone());
    for (email, password, name, role) in SEED_USERS {
        let new_user = NewUser::new(
            email.to_string(),
            hash_password(password)?,
            Some(name.to_string()),
            *role,
        );
        match users.create(&new_user).await {
            Ok(user) => tracing::info!(email, role = user.role.as_str(), "Seeded user"),
            Err(AppError::UserExists) => tracing::info!(email, "User already exists, skipping"),
            Err(err) => return Err(err.into()),
        }
    }

    let inserted = SettingsService::new(SettingsRepository::new(pool))
        .seed_defaults()
        .await?;
    tracing::info!(inserted, "Seeding complete");

    Ok(())
}
