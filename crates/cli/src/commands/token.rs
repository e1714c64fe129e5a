//! Development bearer tokens.

use marketplace_api::config::ApiConfig;
use marketplace_api::db::users::UserRepository;
use marketplace_api::services::auth::TokenSigner;
use marketplace_core::Email;

/// Print a token for an existing user, signed with the server's secret.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the email is unknown,
/// or signing fails.
pub async fn issue(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ApiConfig::from_env()?;
    let email = Email::parse(email)?;

    let pool = marketplace_api::db::create_pool(&config.database_url).await?;
    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| format!("No user with email: {email}"))?;

    let signer = TokenSigner::new(config.token_secret, config.token_ttl_hours);
    let token = signer.issue(&user.identity())?;

    tracing::info!(
        user_id = %user.id,
        role = %user.role,
        ttl_hours = config.token_ttl_hours,
        "Token issued"
    );

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    Ok(())
}
