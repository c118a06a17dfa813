use murmur_common::model::{auth::AuthToken, page::DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};

pub const ENV_PREFIX: &str = "MURMUR_";

/// Settings read from `MURMUR_*` variables.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub api_base_url: String,
    pub api_token: AuthToken,
    pub user_id: Option<u64>,
    #[serde(default = "default_page_size")]
    pub page_size: NonZeroU32,
    pub request_timeout_secs: Option<NonZeroU64>,
}

fn default_page_size() -> NonZeroU32 {
    DEFAULT_PAGE_SIZE
}

impl Env {
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }
}
