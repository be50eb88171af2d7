use super::{
    RpcRequest,
    RpcTransport,
    Signer,
};
use crate::error::ApiError;
use aliyun_exporter_config::{
    Credential,
    HttpConfig,
};
use futures::future::BoxFuture;
use reqwest::Client;
use url::Url;

/// Sends signed RPC requests over HTTPS.
pub struct HttpTransport {
    client: Client,
    signer: Signer,
}

impl HttpTransport {
    pub fn new(credential: &Credential, http: &HttpConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            signer: Signer::new(credential),
        })
    }

    async fn send(&self, request: &RpcRequest) -> Result<String, ApiError> {
        let mut url = Url::parse(&format!("https://{}/", request.endpoint))?;
        url.set_query(Some(&self.signer.signed_query(request)));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(action = request.action, %status, "Alibaba Cloud API rejected request");
            return Err(ApiError::Status { status, body });
        }

        Ok(body)
    }
}

impl RpcTransport for HttpTransport {
    fn call<'a>(&'a self, request: &'a RpcRequest) -> BoxFuture<'a, Result<String, ApiError>> {
        Box::pin(self.send(request))
    }
}
