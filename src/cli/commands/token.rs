use anyhow::Context;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::auth::{Claims, JwtSettings};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a bearer token with the configured JWT_SECRET")]
    Issue {
        #[arg(long, default_value = "admin", help = "Subject claim")]
        subject: String,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Verify a token and print its claims")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config::config().security;
    let settings = JwtSettings::new(&security.jwt_secret);

    match cmd {
        TokenCommands::Issue { subject, hours } => {
            let claims = Claims::new(subject, hours.unwrap_or(security.jwt_expiry_hours));
            let token = settings.generate(&claims).context("failed to sign token")?;

            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "token": token, "subject": claims.sub, "exp": claims.exp })
                ),
                OutputFormat::Text => println!("{}", token),
            }
            Ok(())
        }
        TokenCommands::Verify { token } => {
            let claims = settings.validate(&token)?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&claims)?),
                OutputFormat::Text => {
                    let expires = Utc
                        .timestamp_opt(claims.exp, 0)
                        .single()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| claims.exp.to_string());
                    println!("subject: {}", claims.sub);
                    println!("expires: {}", expires);
                }
            }
            Ok(())
        }
    }
}
