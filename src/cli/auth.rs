//! Authentication command implementations

use colored::Colorize;

use tunnelsync::Result;
use tunnelsync::client::models::{AuthProvider, UserInfo};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::{self, json};

fn provider_name(provider: AuthProvider) -> &'static str {
    match provider {
        AuthProvider::Microsoft => "Microsoft",
        AuthProvider::GitHub => "GitHub",
    }
}

/// Run the login command
pub async fn login(opts: &GlobalOptions, github: bool, device_code: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let provider = if github {
        AuthProvider::GitHub
    } else {
        AuthProvider::Microsoft
    };

    if ctx.format == OutputFormat::Table {
        println!("Signing in with {}...", provider_name(provider));
    }
    let out = ctx.service.login(provider, device_code).await?;
    output::print_message(ctx.format, &out)
}

/// Run the logout command
pub async fn logout(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.logout().await?;
    output::print_message(ctx.format, &out)
}

/// Run the whoami command
pub async fn whoami(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let user = ctx.service.verify_session().await?;

    match ctx.format {
        OutputFormat::Table => print_user(&user),
        OutputFormat::Json => println!("{}", json::format_json(&user)?),
    }
    Ok(())
}

pub(crate) fn print_user(user: &UserInfo) {
    println!(
        "{} Logged in as {} using {}",
        "✓".green(),
        user.display_name().bold(),
        provider_name(user.provider)
    );
    if let Some(email) = &user.email {
        println!("  Email: {}", email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(provider_name(AuthProvider::GitHub), "GitHub");
        assert_eq!(provider_name(AuthProvider::Microsoft), "Microsoft");
    }
}
