use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, ref_work, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

pub const USERS_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_users",
    help: "test the users api ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct User {
    user_id: i64,
}

/// Users endpoints; the account needs the admin role.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersProbe;

#[async_trait]
impl Probe for UsersProbe {
    fn name(&self) -> &'static str {
        "users"
    }

    fn help(&self) -> &'static str {
        "Collect the users api work, user have admin role"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&USERS_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let endpoint = "/users?page_size=1";
        let users: Vec<User> = fetch_json(client, endpoint).await?;
        let uid = match users.as_slice() {
            [only] if only.user_id != 0 => only.user_id,
            _ => return Err(ProbeError::missing(endpoint, "user_id")),
        };
        ref_work(sink, &USERS_REF_WORK, "/users");

        let endpoint = format!("/users/{uid}");
        let user: User = fetch_json(client, &endpoint).await?;
        if user.user_id == 0 {
            return Err(ProbeError::missing(endpoint, "user_id"));
        }
        ref_work(sink, &USERS_REF_WORK, "/users/{user_id}");

        let endpoint = "/users/current";
        let current: User = fetch_json(client, endpoint).await?;
        if current.user_id == 0 {
            return Err(ProbeError::missing(endpoint, "user_id"));
        }
        ref_work(sink, &USERS_REF_WORK, endpoint);

        Ok(())
    }
}
