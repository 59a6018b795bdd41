use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::Response;
use serde::de::DeserializeOwned;
use std::str::FromStr;

pub trait ResponseExt {
    fn custom_error_for_status(self) -> anyhow::Result<Response>;
    fn json_annotated<T: DeserializeOwned>(self) -> anyhow::Result<T>;
}

impl ResponseExt for Response {
    /// Turn a non-success status into an error carrying the body the server
    /// sent back, plus a hint for the statuses caused by the configuration.
    fn custom_error_for_status(self) -> anyhow::Result<Response> {
        match self.error_for_status_ref() {
            Ok(_) => Ok(self),
            Err(err) => {
                let hint = status_hint(self.status());
                let body = self.text()?;
                let err = Err(err).context(format!("Body: {body:?}"));
                match hint {
                    Some(hint) => err.context(hint),
                    None => err,
                }
            }
        }
    }

    /// Load the response as JSON. On failure the error shows the body,
    /// pretty-printed when it is JSON of an unexpected shape.
    fn json_annotated<T: DeserializeOwned>(self) -> anyhow::Result<T> {
        let text = self.text()?;

        serde_json::from_str::<T>(&text).with_context(|| {
            let body_content = serde_json::Value::from_str(&text)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or(text);

            format!(
                "Cannot deserialize type `{}` from the following response body:\n{body_content}",
                std::any::type_name::<T>(),
            )
        })
    }
}

fn status_hint(status: StatusCode) -> Option<&'static str> {
    match status {
        StatusCode::UNAUTHORIZED => Some("check `bitbucket_user` and `bitbucket_password`"),
        StatusCode::FORBIDDEN => {
            Some("the configured user needs admin permission on the project's repositories")
        }
        StatusCode::NOT_FOUND => Some("check `bitbucket_project` and that the repository exists"),
        _ => None,
    }
}
