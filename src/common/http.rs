use std::time::Duration;

use reqwest::{Client, Error};

use crate::configs::HttpConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub struct HttpClient;

impl HttpClient {
  pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
  }

  pub fn with_config(config: &HttpConfig) -> Result<Client, Error> {
    Client::builder()
      .user_agent(
        config
          .user_agent
          .clone()
          .unwrap_or_else(Self::default_user_agent),
      )
      .timeout(Duration::from_secs(config.timeout_secs))
      .cookie_store(true)
      .gzip(true)
      .build()
  }
}
