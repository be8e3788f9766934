//! One-shot API calls from the command line.

use anyhow::{bail, Context};
use gatehouse_config_and_utils::Paths;
use gatehouse_ipc::{ApiClient, ApiRequest};
use gatehouse_protocol_types::{payload, CallerToken};

/// Arguments of `gatehouse call`.
pub struct CallArgs {
    pub action: String,
    pub targets: Vec<String>,
    /// Address targets with the multi-target scheme even if there is one.
    pub multi: bool,
    pub caller_package: Option<String>,
    pub token_package: Option<String>,
    pub token_uid: Option<i64>,
}

impl CallArgs {
    fn into_request(self) -> ApiRequest {
        let payload = match self.targets.as_slice() {
            [] => None,
            [target] if !self.multi => Some(payload::single(target)),
            targets => Some(payload::multi(targets)),
        };

        let mut request = ApiRequest::new(&self.action, payload);
        if let Some(package) = &self.caller_package {
            request = request.with_caller_package(package);
        }
        if let Some(package) = &self.token_package {
            request = request.with_caller_id(CallerToken::new(package, self.token_uid.unwrap_or(-1)));
        }
        request
    }
}

/// Send one request and print the outcome. A failed request is an error.
pub async fn call(paths: &Paths, args: CallArgs) -> anyhow::Result<()> {
    let request = args.into_request();
    let client = ApiClient::new(paths.api_socket_file());
    let response = client
        .call(&request)
        .await
        .context("Failed to reach the controller")?;

    match response.diagnostic {
        None => {
            println!("ok");
            Ok(())
        }
        Some(diagnostic) => bail!("{}", diagnostic),
    }
}
