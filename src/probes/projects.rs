//! Projects and repositories endpoints
//!
//! Walks the project API starting from the first listed project. Each working
//! endpoint is reported as it succeeds; the walk stops at the first failure.

use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, ref_work, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

pub const PROJECTS_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_projects",
    help: "test the projects api ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

pub const REPOS_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_repos",
    help: "test the repos api ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Project {
    project_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metadata {
    public: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Member {
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Repository {
    name: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectsProbe;

#[async_trait]
impl Probe for ProjectsProbe {
    fn name(&self) -> &'static str {
        "projects"
    }

    fn help(&self) -> &'static str {
        "Collect the projects and repos api work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&PROJECTS_REF_WORK, &REPOS_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let id = projects(client, sink).await?;
        project_logs(client, sink, id).await?;
        project_metadata(client, sink, id).await?;
        project_members(client, sink, id).await?;
        repositories(client, sink, id).await?;
        top_repositories(client, sink).await
    }
}

async fn projects(client: &dyn Transport, sink: &SampleSink) -> Result<i64, ProbeError> {
    let endpoint = "/projects?page_size=1";
    let listed: Vec<Project> = fetch_json(client, endpoint).await?;
    let id = match listed.as_slice() {
        [only] if only.project_id != 0 => only.project_id,
        _ => return Err(ProbeError::missing(endpoint, "project_id")),
    };
    ref_work(sink, &PROJECTS_REF_WORK, "/projects");

    let endpoint = format!("/projects/{id}");
    let project: Project = fetch_json(client, &endpoint).await?;
    if project.project_id == 0 {
        return Err(ProbeError::missing(endpoint, "project_id"));
    }
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}");

    Ok(id)
}

async fn project_logs(client: &dyn Transport, sink: &SampleSink, id: i64) -> Result<(), ProbeError> {
    let endpoint = format!("/projects/{id}/logs?page_size=1");
    let logs: Vec<Project> = fetch_json(client, &endpoint).await?;
    match logs.as_slice() {
        [only] if only.project_id != 0 => {}
        _ => return Err(ProbeError::missing(endpoint, "project_id")),
    }
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}/logs");
    Ok(())
}

async fn project_metadata(
    client: &dyn Transport,
    sink: &SampleSink,
    id: i64,
) -> Result<(), ProbeError> {
    let endpoint = format!("/projects/{id}/metadatas");
    let metadata: Metadata = fetch_json(client, &endpoint).await?;
    if metadata.public.is_empty() {
        return Err(ProbeError::missing(endpoint, "public"));
    }
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}/metadatas");

    let endpoint = format!("/projects/{id}/metadatas/public");
    let metadata: Metadata = fetch_json(client, &endpoint).await?;
    if metadata.public.is_empty() {
        return Err(ProbeError::missing(endpoint, "public"));
    }
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}/metadatas/{meta_name}");
    Ok(())
}

async fn project_members(
    client: &dyn Transport,
    sink: &SampleSink,
    id: i64,
) -> Result<(), ProbeError> {
    // the endpoint ignores paging and returns every member
    let endpoint = format!("/projects/{id}/members");
    let members: Vec<Member> = fetch_json(client, &endpoint).await?;
    let member_id = match members.first() {
        Some(first) if first.id != 0 => first.id,
        _ => return Err(ProbeError::missing(endpoint, "id")),
    };
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}/members");

    // some versions (e.g. v1.8.1) answer 403 here
    let endpoint = format!("/projects/{id}/members/{member_id}");
    let member: Member = fetch_json(client, &endpoint).await?;
    if member.id == 0 {
        return Err(ProbeError::missing(endpoint, "id"));
    }
    ref_work(sink, &PROJECTS_REF_WORK, "/projects/{project_id}/members/{mid}");
    Ok(())
}

fn single_named(repos: &[Repository], endpoint: &str) -> Result<(), ProbeError> {
    match repos {
        [only] if !only.name.is_empty() => Ok(()),
        _ => Err(ProbeError::missing(endpoint, "name")),
    }
}

async fn repositories(client: &dyn Transport, sink: &SampleSink, id: i64) -> Result<(), ProbeError> {
    let endpoint = format!("/repositories?project_id={id}&page_size=1");
    let repos: Vec<Repository> = fetch_json(client, &endpoint).await?;
    single_named(&repos, &endpoint)?;
    ref_work(sink, &REPOS_REF_WORK, "/repositories");
    Ok(())
}

async fn top_repositories(client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
    let endpoint = "/repositories/top?count=1";
    let repos: Vec<Repository> = fetch_json(client, endpoint).await?;
    single_named(&repos, endpoint)?;
    ref_work(sink, &REPOS_REF_WORK, "/repositories/top");
    Ok(())
}
