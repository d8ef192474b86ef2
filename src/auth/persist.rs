use chrono::NaiveDateTime;
use std::path::Path;

use super::token::AccessToken;
use crate::data::DataResult;

const SEPARATOR_WIDTH: usize = 60;

/// Human-readable token record written after a successful exchange
pub fn render_token_file(token: &AccessToken, generated_at: NaiveDateTime) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    format!(
        "Access Token (Generated at {})\n{}\n{}\n{}\nExpires: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        separator,
        token.token,
        separator,
        token.expiry
    )
}

/// Overwrite `path` with the token record
pub fn write_token_file(
    path: &Path,
    token: &AccessToken,
    generated_at: NaiveDateTime,
) -> DataResult<()> {
    std::fs::write(path, render_token_file(token, generated_at))?;
    tracing::info!(path = %path.display(), "Access token saved");
    Ok(())
}
