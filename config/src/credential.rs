use eyre::{
    bail,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const ACCESS_ID_ENV: &str = "ALIYUN_ACCESS_ID";
pub const ACCESS_SECRET_ENV: &str = "ALIYUN_ACCESS_SECRET";
pub const REGION_ENV: &str = "ALIYUN_REGION";

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
    #[serde(default)]
    pub region_id: String,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        region_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region_id: region_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() || self.access_key_secret.trim().is_empty() {
            bail!("Credential is not fully configured: set credential.access_key_id and credential.access_key_secret or {ACCESS_ID_ENV} and {ACCESS_SECRET_ENV}");
        }
        if self.region_id.trim().is_empty() {
            bail!("Credential is not fully configured: set credential.region_id or {REGION_ENV}");
        }
        Ok(())
    }
}

// The secret never ends up in logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region_id", &self.region_id)
            .finish()
    }
}
