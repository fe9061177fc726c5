use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub max_output_tokens: u32,
    pub model_timeout: Duration,
    pub spreadsheet_id: Option<String>,
    pub sheets_access_token: Option<String>,
    pub master_sheet_name: String,
    pub sheets_timeout: Duration,
    pub max_upload_bytes: usize,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = non_empty("OPENAI_API_KEY").ok_or("OPENAI_API_KEY must be set")?;

        let openai_model =
            non_empty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let openai_base_url = non_empty("OPENAI_BASE_URL")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let max_output_tokens = non_empty("OPENAI_MAX_OUTPUT_TOKENS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096);
        let model_timeout = Duration::from_secs(
            non_empty("MODEL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        );

        let spreadsheet_id = non_empty("GOOGLE_SHEETS_SPREADSHEET_ID");
        let sheets_access_token = non_empty("GOOGLE_SHEETS_ACCESS_TOKEN");
        let master_sheet_name =
            non_empty("GOOGLE_SHEETS_TAB_NAME").unwrap_or_else(|| "DamageReports".to_string());
        let sheets_timeout = Duration::from_secs(
            non_empty("SHEETS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        );

        let max_upload_mb: usize = non_empty("MAX_UPLOAD_MB")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let host = non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = non_empty("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        Ok(Self {
            openai_api_key,
            openai_model,
            openai_base_url,
            max_output_tokens,
            model_timeout,
            spreadsheet_id,
            sheets_access_token,
            master_sheet_name,
            sheets_timeout,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            host,
            port,
        })
    }

    /// True when both the spreadsheet id and a Sheets access token are configured.
    pub fn sheets_enabled(&self) -> bool {
        self.spreadsheet_id.is_some() && self.sheets_access_token.is_some()
    }
}
